use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "scout")]
#[command(about = "Upwork job scout: proposals and flowcharts delivered to Telegram")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape recent jobs and send a proposal for each (default)
    Scrape(ScrapeArgs),

    /// Generate a proposal for one job entered by hand
    Manual(ManualArgs),
}

#[derive(Debug, Default, Args)]
pub struct ScrapeArgs {
    /// Jobs per Telegram message (overrides BATCH_SIZE)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Oldest job to keep, in minutes (overrides MAX_JOB_AGE_MINUTES)
    #[arg(long)]
    pub max_age_minutes: Option<i64>,
}

impl ScrapeArgs {
    /// Applies the flag overrides on top of the environment config.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 {
                bail!("--batch-size must be at least 1");
            }
            config.batch_size = batch_size;
        }
        if let Some(minutes) = self.max_age_minutes {
            if minutes < 0 || chrono::Duration::try_minutes(minutes).is_none() {
                bail!("--max-age-minutes must be a non-negative number of minutes in range");
            }
            config.max_job_age_minutes = minutes;
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct ManualArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long, conflicts_with = "description_file", required_unless_present = "description_file")]
    pub description: Option<String>,

    /// Read the job description from a file
    #[arg(long)]
    pub description_file: Option<PathBuf>,
}

impl ManualArgs {
    pub fn load_description(&self) -> Result<String> {
        let description = match (&self.description, &self.description_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read description file {}", path.display()))?,
            (None, None) => bail!("A job description is required"),
        };

        let description = description.trim();
        if description.is_empty() {
            bail!("Job description is empty");
        }
        Ok(description.to_string())
    }
}
