//! Message text for the operator chat. Telegram HTML mode: every piece of
//! scraped or generated text is escaped before it is embedded.

use crate::generation::flowchart::FlowchartArtifact;
use crate::generation::proposal::GeneratedProposal;
use crate::jobs::filter::{EligibleJob, FilterStats};

pub const STARTUP_MESSAGE: &str = "🔄 Upwork scraper starting...";

/// Telegram rejects message text longer than this.
pub const MESSAGE_CHAR_LIMIT: usize = 4096;
/// Room kept for the batch header and separators.
const BATCH_HEADER_ALLOWANCE: usize = 64;

/// Characters left for job blocks in one batch message.
pub fn batch_char_budget() -> usize {
    MESSAGE_CHAR_LIMIT - BATCH_HEADER_ALLOWANCE
}

/// Escapes text for Telegram's HTML parse mode (also safe inside quoted attributes).
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn flowchart_line(flowchart: Option<&FlowchartArtifact>) -> String {
    match flowchart {
        Some(artifact) => format!(
            "<a href=\"{}\">Open the custom flowchart</a>",
            escape_html(&artifact.share_url)
        ),
        None => "Not available".to_string(),
    }
}

/// One job's block inside a batch message.
pub fn job_block(
    job: &EligibleJob,
    proposal: &GeneratedProposal,
    flowchart: Option<&FlowchartArtifact>,
) -> String {
    let record = &job.record;
    format!(
        "<b>🔹 {title}</b>\n\
         💰 {budget} - {payment}\n\
         📝 {description}\n\
         🗓️ {published}\n\
         🔗 <a href=\"{link}\">View Job</a>\n\n\
         <b>📝 PROPOSAL:</b>\n{proposal}\n\n\
         <b>📊 FLOWCHART:</b>\n{flowchart}",
        title = escape_html(&record.title),
        budget = escape_html(record.budget_display()),
        payment = escape_html(&record.payment_type),
        description = escape_html(&job.display_description),
        published = escape_html(if record.published.is_empty() {
            "N/A"
        } else {
            record.published.as_str()
        }),
        link = escape_html(&record.link),
        proposal = escape_html(&proposal.body),
        flowchart = flowchart_line(flowchart),
    )
}

/// A flushed batch. `number` is the running job count at flush time; `None`
/// marks the end-of-run flush.
pub fn batch_message(entries: &[String], number: Option<usize>) -> String {
    let header = match number {
        Some(n) => format!("<b>📋 UPWORK JOB LISTING #{n}</b>"),
        None => "<b>📋 UPWORK JOB LISTING (Final)</b>".to_string(),
    };
    format!("{header}\n\n{}", entries.join("\n\n"))
}

pub fn summary_message(stats: &FilterStats, degraded: usize) -> String {
    let mut message = format!(
        "✅ Scraping complete! Found {} job listings matching your criteria ({} scraped). \
         Full proposals have been sent separately.",
        stats.eligible, stats.scraped
    );
    if degraded > 0 {
        message.push_str(&format!(
            " {degraded} proposal(s) could not be generated; see the placeholders above."
        ));
    }
    message
}

pub fn no_jobs_message(stats: &FilterStats, max_age_minutes: i64) -> String {
    if stats.scraped == 0 {
        "⚠️ Upwork scraper ran but found no new job listings".to_string()
    } else {
        format!(
            "⚠️ Upwork scraper found {} job listings but none were posted within the last {} minutes",
            stats.scraped, max_age_minutes
        )
    }
}

pub fn manual_message(
    title: &str,
    proposal: &GeneratedProposal,
    flowchart: Option<&FlowchartArtifact>,
) -> String {
    format!(
        "<b>📋 MANUAL JOB PROCESSING</b>\n\n\
         <b>🔹 {title}</b>\n\n\
         <b>📝 PROPOSAL:</b>\n{proposal}\n\n\
         <b>📊 FLOWCHART:</b>\n{flowchart}",
        title = escape_html(title),
        proposal = escape_html(&proposal.body),
        flowchart = flowchart_line(flowchart),
    )
}

pub fn failure_message(error: &str) -> String {
    format!("❌ Upwork scraper run failed: {}", escape_html(error))
}
