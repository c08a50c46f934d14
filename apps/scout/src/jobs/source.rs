//! Job source — runs the Upwork scraper actor on Apify and reads back its dataset.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::job::JobRecord;

const APIFY_API_URL: &str = "https://api.apify.com/v2";
/// Seconds the API holds a run-status request open while the run is still going.
const WAIT_FOR_FINISH_SECS: u32 = 60;
/// Per-request timeout; must outlast a held-open status request.
const REQUEST_TIMEOUT_SECS: u64 = 90;
/// Status polls before a run that never finishes is given up on (about 30 minutes).
const DEFAULT_MAX_POLLS: u32 = 30;

#[derive(Debug, Error)]
pub enum JobSourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Apify API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Apify run {run_id} ended with status {status}")]
    RunFailed { run_id: String, status: String },

    #[error("Apify run {run_id} still {status} after {polls} status checks")]
    RunTimedOut {
        run_id: String,
        status: String,
        polls: u32,
    },
}

/// Produces the raw job listings for one run.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>, JobSourceError>;
}

/// Input for the Upwork scraper actor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperInput {
    pub start_urls: Vec<StartUrl>,
    pub remove_duplicates: bool,
    pub filter_last_24_hours: bool,
    pub proxy_country_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

impl ScraperInput {
    pub fn new(search_urls: &[String], proxy_country: &str) -> Self {
        Self {
            start_urls: search_urls
                .iter()
                .map(|url| StartUrl { url: url.clone() })
                .collect(),
            remove_duplicates: true,
            filter_last_24_hours: true,
            proxy_country_code: proxy_country.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
    pub id: String,
    pub status: String,
    pub default_dataset_id: String,
}

pub struct ApifyJobSource {
    client: reqwest::Client,
    token: String,
    actor_id: String,
    base_url: String,
    input: ScraperInput,
    max_polls: u32,
}

impl ApifyJobSource {
    pub fn new(
        token: String,
        actor_id: String,
        input: ScraperInput,
    ) -> Result<Self, JobSourceError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            token,
            actor_id,
            base_url: APIFY_API_URL.to_string(),
            input,
            max_polls: DEFAULT_MAX_POLLS,
        })
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Starts an actor run. Returns immediately with run metadata.
    pub async fn start_run(&self) -> Result<RunData, JobSourceError> {
        let url = format!("{}/acts/{}/runs", self.base_url, self.actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&self.input)
            .send()
            .await?;

        let resp = error_for_status(resp).await?;
        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Polls until the run reaches a terminal status, at most `max_polls` times.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData, JobSourceError> {
        let mut last_status = String::from("UNKNOWN");
        for poll in 1..=self.max_polls {
            let url = format!(
                "{}/actor-runs/{}?waitForFinish={}",
                self.base_url, run_id, WAIT_FOR_FINISH_SECS
            );
            let resp = self.client.get(&url).bearer_auth(&self.token).send().await?;

            let resp = error_for_status(resp).await?;
            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(JobSourceError::RunFailed {
                        run_id: run_id.to_string(),
                        status: api_resp.data.status,
                    });
                }
                status => {
                    debug!(run_id, status, poll, "Run still in progress");
                    last_status = api_resp.data.status;
                }
            }
        }

        Err(JobSourceError::RunTimedOut {
            run_id: run_id.to_string(),
            status: last_status,
            polls: self.max_polls,
        })
    }

    /// Fetches every item of a dataset in stored order.
    pub async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<JobRecord>, JobSourceError> {
        let url = format!(
            "{}/datasets/{}/items?format=json&clean=true",
            self.base_url, dataset_id
        );
        let resp = self.client.get(&url).bearer_auth(&self.token).send().await?;

        let resp = error_for_status(resp).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl JobSource for ApifyJobSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>, JobSourceError> {
        info!(
            actor_id = %self.actor_id,
            start_urls = self.input.start_urls.len(),
            "Starting Upwork scraper"
        );

        let run = self.start_run().await?;
        info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Scraping complete, fetching results"
        );

        let jobs = self.dataset_items(&completed.default_dataset_id).await?;
        info!(count = jobs.len(), "Fetched job listings from Apify");
        Ok(jobs)
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, JobSourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(JobSourceError::Api {
        status: status.as_u16(),
        message: body,
    })
}
