use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Actor that scrapes Upwork search result pages.
const DEFAULT_APIFY_ACTOR_ID: &str = "Cvx9keeu3XbxwYF6J";

/// Search pages scraped when `SEARCH_URLS` is not set.
const DEFAULT_SEARCH_URLS: &[&str] = &[
    "https://www.upwork.com/nx/search/jobs/?amount=1000-4999,5000-&category2_uid=531770282580668419,531770282580668418&client_hires=1-9,10-&contractor_tier=2,3&hourly_rate=35-&location=Americas,Europe&per_page=50&proposals=0-4,5-9,10-14&sort=recency&t=0,1",
    "https://www.upwork.com/nx/search/jobs/?amount=1000-4999,5000-&category2_uid=531770282580668419,531770282580668418&client_hires=1-9,10-&contractor_tier=2,3&hourly_rate=35-&location=Americas,Europe&per_page=50&proposals=0-4,5-9,10-14&q=ai&sort=recency&t=0,1",
    "https://www.upwork.com/nx/search/jobs/?amount=1000-4999,5000-&category2_uid=531770282580668419,531770282580668418&client_hires=1-9,10-&contractor_tier=2,3&hourly_rate=40-&location=Americas,Europe&per_page=50&proposals=0-4,5-9,10-14&q=ai%20app%20developer&sort=recency&t=0,1",
];

/// Run configuration loaded once at startup from environment variables.
/// Fails fast when a required credential is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub anthropic_api_url: Option<String>,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: Option<String>,
    /// Only the scrape command needs Apify; see [`Config::require_apify_token`].
    pub apify_token: Option<String>,
    pub apify_api_url: Option<String>,
    pub apify_actor_id: String,
    pub search_urls: Vec<String>,
    pub proxy_country: String,
    pub retry_delay: Duration,
    pub batch_size: usize,
    pub max_job_age_minutes: i64,
    pub send_delay: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let anthropic_api_key = get("ANTHROPIC_API_KEY")
            .or_else(|| get("CLAUDE_API_KEY"))
            .context("Required environment variable 'ANTHROPIC_API_KEY' (or 'CLAUDE_API_KEY') is not set")?;

        let search_urls = match get("SEARCH_URLS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_SEARCH_URLS.iter().map(|url| url.to_string()).collect(),
        };

        let batch_size = parse_or(&get, "BATCH_SIZE", 1usize)?;
        if batch_size == 0 {
            bail!("BATCH_SIZE must be at least 1");
        }

        let max_job_age_minutes = parse_or(&get, "MAX_JOB_AGE_MINUTES", 60i64)?;
        if max_job_age_minutes < 0 || chrono::Duration::try_minutes(max_job_age_minutes).is_none() {
            bail!("MAX_JOB_AGE_MINUTES must be a non-negative number of minutes in range");
        }

        Ok(Config {
            anthropic_api_key,
            anthropic_api_url: get("ANTHROPIC_API_URL"),
            telegram_bot_token: require(&get, "TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: require(&get, "TELEGRAM_CHAT_ID")?,
            telegram_api_url: get("TELEGRAM_API_URL"),
            apify_token: get("APIFY_TOKEN"),
            apify_api_url: get("APIFY_API_URL"),
            apify_actor_id: get("APIFY_ACTOR_ID")
                .unwrap_or_else(|| DEFAULT_APIFY_ACTOR_ID.to_string()),
            search_urls,
            proxy_country: get("PROXY_COUNTRY").unwrap_or_else(|| "US".to_string()),
            retry_delay: Duration::from_secs(parse_or(&get, "RETRY_DELAY_SECS", 5u64)?),
            batch_size,
            max_job_age_minutes,
            send_delay: Duration::from_millis(parse_or(&get, "SEND_DELAY_MS", 2000u64)?),
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// The scrape command cannot run without an Apify token.
    pub fn require_apify_token(&self) -> Result<&str> {
        self.apify_token
            .as_deref()
            .context("Required environment variable 'APIFY_TOKEN' is not set")
    }
}

fn require<F>(get: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
