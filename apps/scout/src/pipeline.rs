//! Run orchestration — source, filter, generate, dispatch.
//!
//! Strictly sequential: each job gets its flowchart, then its proposal, then
//! goes to the dispatcher before the next job starts.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::flowchart::{FlowchartArtifact, FlowchartGenerator};
use crate::generation::proposal::{GeneratedProposal, ProposalGenerator, ProposalRequest};
use crate::jobs::filter::{EligibleJob, FilterStats, JobFilter};
use crate::jobs::recency::RecencyPolicy;
use crate::jobs::source::JobSource;
use crate::models::job::JobRecord;
use crate::notify::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::notify::format::{manual_message, no_jobs_message, STARTUP_MESSAGE};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub stats: FilterStats,
    pub report: DispatchReport,
}

/// Output of a manual submission, for the caller's logs.
#[derive(Debug, Clone)]
pub struct ManualOutcome {
    pub proposal: GeneratedProposal,
    pub flowchart: Option<FlowchartArtifact>,
}

/// One full scrape run. Only a job source failure aborts it; generation
/// failures degrade per job and sink failures are logged.
pub async fn run_scrape(
    state: &AppState,
    source: &dyn JobSource,
    now: DateTime<Utc>,
) -> Result<ScrapeOutcome, AppError> {
    let config = &state.config;

    if let Err(e) = state.sink.send(STARTUP_MESSAGE).await {
        warn!("Startup announcement failed, continuing: {e}");
    }

    let records = source.fetch_jobs().await?;

    let filter = JobFilter::new(RecencyPolicy::from_minutes(config.max_job_age_minutes));
    let (jobs, stats) = filter.filter(records, now);

    if jobs.is_empty() {
        info!("No eligible jobs, ending run early");
        let message = no_jobs_message(&stats, config.max_job_age_minutes);
        if let Err(e) = state.sink.send(&message).await {
            warn!("Failed to send no-jobs notice: {e}");
        }
        return Ok(ScrapeOutcome {
            stats,
            report: DispatchReport::default(),
        });
    }

    let flowcharts = FlowchartGenerator::new(state.llm.as_ref());
    let proposals = ProposalGenerator::new(state.llm.as_ref());
    let mut dispatcher =
        NotificationDispatcher::new(state.sink.as_ref(), config.batch_size, config.send_delay);

    let total = jobs.len();
    for (index, job) in jobs.iter().enumerate() {
        info!("Processing job {}/{}: {}", index + 1, total, job.record.title);

        let flowchart = flowcharts
            .generate(&job.record.title, &job.record.description, &job.skills)
            .await;

        let proposal = proposals
            .generate(ProposalRequest {
                title: &job.record.title,
                description: &job.record.description,
                skills: &job.skills,
                budget: job.record.budget.as_deref(),
                flowchart_url: flowchart.as_ref().map(|f| f.share_url.as_str()),
            })
            .await;

        dispatcher
            .dispatch(job, &proposal, flowchart.as_ref())
            .await;
    }

    let report = dispatcher.finish(&stats).await;
    Ok(ScrapeOutcome { stats, report })
}

/// Processes one hand-entered job and delivers it in a single message.
/// Unlike a scrape run, a delivery failure here is the caller's error.
pub async fn run_manual(
    state: &AppState,
    title: &str,
    description: &str,
) -> Result<ManualOutcome, AppError> {
    let job = EligibleJob::from_record(JobRecord {
        title: title.to_string(),
        description: description.to_string(),
        skills: Vec::new(),
        budget: None,
        payment_type: String::new(),
        published: String::new(),
        link: String::new(),
    });
    info!("Manual job '{}' with skills {:?}", job.record.title, job.skills);

    let flowchart = FlowchartGenerator::new(state.llm.as_ref())
        .generate(&job.record.title, &job.record.description, &job.skills)
        .await;

    let proposal = ProposalGenerator::new(state.llm.as_ref())
        .generate(ProposalRequest {
            title: &job.record.title,
            description: &job.record.description,
            skills: &job.skills,
            budget: None,
            flowchart_url: flowchart.as_ref().map(|f| f.share_url.as_str()),
        })
        .await;

    let message = manual_message(&job.record.title, &proposal, flowchart.as_ref());
    state.sink.send(&message).await?;
    info!("Manual job delivered");

    Ok(ManualOutcome {
        proposal,
        flowchart,
    })
}
