mod cli;
mod config;
mod errors;
mod generation;
mod jobs;
mod llm_client;
mod models;
mod notify;
mod pipeline;
mod retry;
mod state;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command, ManualArgs, ScrapeArgs};
use crate::config::Config;
use crate::errors::AppError;
use crate::jobs::source::{ApifyJobSource, ScraperInput};
use crate::llm_client::LlmClient;
use crate::notify::format::failure_message;
use crate::notify::telegram::TelegramSink;
use crate::retry::RetryPolicy;
use crate::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Scrape(ScrapeArgs::default()));

    // Load configuration first; nothing runs with a bad config
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Command::Scrape(args) = &command {
        if let Err(e) = args.apply(&mut config) {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    }

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Upwork scout v{}", env!("CARGO_PKG_VERSION"));

    let state = match build_state(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    run(&state, &command).await
}

/// Error boundary for one command: any failure is logged, reported to the
/// chat on a best-effort basis, and turned into a non-zero exit code.
async fn run(state: &AppState, command: &Command) -> ExitCode {
    let result = match command {
        Command::Scrape(_) => scrape(state).await,
        Command::Manual(args) => manual(state, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {e}");
            if let Err(send_err) = state.sink.send(&failure_message(&e.to_string())).await {
                error!("Could not deliver failure notice: {send_err}");
            }
            ExitCode::FAILURE
        }
    }
}

fn build_state(config: Config) -> anyhow::Result<AppState> {
    let retry = RetryPolicy::linear(llm_client::MAX_ATTEMPTS, config.retry_delay);
    let mut llm = LlmClient::new(config.anthropic_api_key.clone(), retry)
        .context("Failed to build Anthropic client")?;
    if let Some(url) = &config.anthropic_api_url {
        llm = llm.with_api_url(url.clone());
    }
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let mut sink = TelegramSink::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    )
    .context("Failed to build Telegram client")?;
    if let Some(url) = &config.telegram_api_url {
        sink = sink.with_api_url(url.clone());
    }

    Ok(AppState {
        llm: Arc::new(llm),
        sink: Arc::new(sink),
        config,
    })
}

async fn scrape(state: &AppState) -> Result<(), AppError> {
    let config = &state.config;
    let token = config.require_apify_token()?;

    let input = ScraperInput::new(&config.search_urls, &config.proxy_country);
    let mut source =
        ApifyJobSource::new(token.to_string(), config.apify_actor_id.clone(), input)?;
    if let Some(url) = &config.apify_api_url {
        source = source.with_base_url(url.clone());
    }

    info!(
        batch_size = config.batch_size,
        max_age_minutes = config.max_job_age_minutes,
        "Starting scrape run"
    );
    let outcome = pipeline::run_scrape(state, &source, chrono::Utc::now()).await?;
    info!(
        "Run complete: {} scraped, {} eligible, {} messages sent",
        outcome.stats.scraped, outcome.stats.eligible, outcome.report.flushes
    );
    Ok(())
}

async fn manual(state: &AppState, args: &ManualArgs) -> Result<(), AppError> {
    let description = args.load_description()?;
    let outcome = pipeline::run_manual(state, &args.title, &description).await?;
    info!(
        "Manual job processed (proposal generated: {}, flowchart: {})",
        outcome.proposal.is_generated(),
        outcome.flowchart.is_some()
    );
    Ok(())
}
