//! Notification dispatcher — batches job messages and delivers them to the sink.
//!
//! The batch is flushed whenever it reaches the threshold, early when the next
//! job would push the message over Telegram's length limit, and once more at the
//! end of the stream. `finish` consumes the dispatcher, so the end-of-stream
//! flush cannot happen twice. A failed send is logged and the run moves on.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::generation::flowchart::FlowchartArtifact;
use crate::generation::proposal::GeneratedProposal;
use crate::jobs::filter::{EligibleJob, FilterStats};
use crate::notify::format::{batch_char_budget, batch_message, job_block, summary_message};
use crate::notify::MessageSink;

/// Formatted job blocks waiting to be sent together.
#[derive(Debug)]
pub struct DispatchBatch {
    entries: Vec<String>,
    threshold: usize,
    char_budget: usize,
    chars: usize,
}

impl DispatchBatch {
    pub fn new(threshold: usize) -> Self {
        Self::with_char_budget(threshold, batch_char_budget())
    }

    pub fn with_char_budget(threshold: usize, char_budget: usize) -> Self {
        Self {
            entries: Vec::new(),
            threshold: threshold.max(1),
            char_budget,
            chars: 0,
        }
    }

    /// Whether `entry` can join the batch without going over the character
    /// budget. An empty batch accepts anything.
    pub fn fits(&self, entry: &str) -> bool {
        self.entries.is_empty() || self.chars + 2 + entry.chars().count() <= self.char_budget
    }

    /// Adds an entry; returns true once the batch is due for a flush.
    pub fn push(&mut self, entry: String) -> bool {
        if !self.entries.is_empty() {
            self.chars += 2; // "\n\n" separator
        }
        self.chars += entry.chars().count();
        self.entries.push(entry);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.threshold
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the batch, handing back its entries in push order.
    pub fn take(&mut self) -> Vec<String> {
        self.chars = 0;
        std::mem::take(&mut self.entries)
    }
}

/// What happened during dispatch, for logs and the summary message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub jobs: usize,
    pub flushes: usize,
    pub failed_flushes: usize,
    pub degraded_proposals: usize,
}

pub struct NotificationDispatcher<'a> {
    sink: &'a dyn MessageSink,
    batch: DispatchBatch,
    send_delay: Duration,
    report: DispatchReport,
}

impl<'a> NotificationDispatcher<'a> {
    pub fn new(sink: &'a dyn MessageSink, batch_size: usize, send_delay: Duration) -> Self {
        Self {
            sink,
            batch: DispatchBatch::new(batch_size),
            send_delay,
            report: DispatchReport::default(),
        }
    }

    /// Queues one job with its generated artifacts, flushing if the batch is full.
    pub async fn dispatch(
        &mut self,
        job: &EligibleJob,
        proposal: &GeneratedProposal,
        flowchart: Option<&FlowchartArtifact>,
    ) {
        let block = job_block(job, proposal, flowchart);
        if !self.batch.fits(&block) {
            let message = batch_message(&self.batch.take(), Some(self.report.jobs));
            self.flush(&message, &format!("job #{} (length limit)", self.report.jobs))
                .await;
            tokio::time::sleep(self.send_delay).await;
        }

        self.report.jobs += 1;
        if !proposal.is_generated() {
            self.report.degraded_proposals += 1;
        }

        if self.batch.push(block) {
            let message = batch_message(&self.batch.take(), Some(self.report.jobs));
            self.flush(&message, &format!("job #{}", self.report.jobs))
                .await;
            // Stay under the chat's message rate limit.
            tokio::time::sleep(self.send_delay).await;
        }
    }

    /// Flushes what is left, then sends the run summary.
    pub async fn finish(mut self, stats: &FilterStats) -> DispatchReport {
        if !self.batch.is_empty() {
            let message = batch_message(&self.batch.take(), None);
            self.flush(&message, "final job details").await;
        }

        let summary = summary_message(stats, self.report.degraded_proposals);
        if let Err(e) = self.sink.send(&summary).await {
            error!("Failed to send run summary: {e}");
        }

        info!(
            "Dispatched {} jobs in {} messages ({} failed)",
            self.report.jobs, self.report.flushes, self.report.failed_flushes
        );
        self.report
    }

    async fn flush(&mut self, message: &str, what: &str) {
        self.report.flushes += 1;
        match self.sink.send(message).await {
            Ok(()) => info!("Sent {what}"),
            Err(e) => {
                self.report.failed_flushes += 1;
                error!(
                    "Failed to send {what} ({} chars): {e}",
                    message.chars().count()
                );
            }
        }
    }
}
