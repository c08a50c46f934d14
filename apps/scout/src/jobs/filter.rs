//! Job filter — turns raw scraped records into the ordered list of jobs worth a
//! proposal: recency check, skill list, display copy of the description.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::jobs::recency::{Freshness, RecencyPolicy};
use crate::models::job::{JobRecord, MAX_SKILLS};

/// Descriptions longer than this are cut for display.
pub const DISPLAY_DESCRIPTION_LIMIT: usize = 250;
const ELLIPSIS: &str = "...";

/// Known skill labels, scanned in this order against the description.
pub const SKILL_VOCABULARY: &[&str] = &[
    "Python",
    "JavaScript",
    "React",
    "Node.js",
    "Django",
    "Machine Learning",
    "AI",
    "Data Analysis",
    "AWS",
    "Docker",
    "API",
    "Database",
    "SQL",
    "Full Stack",
    "Frontend",
    "Backend",
    "DevOps",
    "TensorFlow",
    "PyTorch",
];

/// A record that passed the filter, ready for generation and dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleJob {
    pub record: JobRecord,
    pub skills: Vec<String>,
    /// Truncated copy for messages. Generators always get `record.description`.
    pub display_description: String,
}

impl EligibleJob {
    /// Builds an eligible job without a recency check (manual submissions).
    pub fn from_record(record: JobRecord) -> Self {
        let skills = if record.skills.is_empty() {
            extract_skills(&record.description)
        } else {
            record.skills.iter().take(MAX_SKILLS).cloned().collect()
        };
        let display_description = truncate_for_display(&record.description);

        Self {
            record,
            skills,
            display_description,
        }
    }
}

/// Counts kept alongside the filtered jobs for the end-of-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub scraped: usize,
    pub eligible: usize,
    pub stale: usize,
    pub unknown_age: usize,
}

pub struct JobFilter {
    policy: RecencyPolicy,
}

impl JobFilter {
    pub fn new(policy: RecencyPolicy) -> Self {
        Self { policy }
    }

    /// Keeps fresh records in scraper order. Skipped records are logged, never retried.
    pub fn filter(
        &self,
        records: Vec<JobRecord>,
        now: DateTime<Utc>,
    ) -> (Vec<EligibleJob>, FilterStats) {
        let mut stats = FilterStats {
            scraped: records.len(),
            ..FilterStats::default()
        };

        let eligible: Vec<EligibleJob> = records
            .into_iter()
            .filter(|record| match self.policy.classify(&record.published, now) {
                Freshness::Fresh(age) => {
                    debug!("'{}' is fresh ({} min old)", record.title, age.num_minutes());
                    true
                }
                Freshness::Stale(age) => {
                    info!(
                        "Skipping '{}': posted {} min ago, older than {} min",
                        record.title,
                        age.num_minutes(),
                        self.policy.max_age.num_minutes()
                    );
                    stats.stale += 1;
                    false
                }
                Freshness::Unknown => {
                    info!(
                        "Skipping '{}': unreadable posted date '{}'",
                        record.title, record.published
                    );
                    stats.unknown_age += 1;
                    false
                }
            })
            .map(EligibleJob::from_record)
            .collect();

        stats.eligible = eligible.len();
        info!(
            "{} of {} scraped jobs are eligible ({} stale, {} undated)",
            stats.eligible, stats.scraped, stats.stale, stats.unknown_age
        );
        (eligible, stats)
    }
}

/// Vocabulary labels found in the lower-cased description, first `MAX_SKILLS`
/// in vocabulary order. A heuristic, not a relevance ranking.
pub fn extract_skills(description: &str) -> Vec<String> {
    let lower = description.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .filter(|skill| lower.contains(&skill.to_lowercase()))
        .take(MAX_SKILLS)
        .map(|skill| skill.to_string())
        .collect()
}

/// Cuts to 247 characters plus "..." when over the display limit.
pub fn truncate_for_display(description: &str) -> String {
    if description.chars().count() <= DISPLAY_DESCRIPTION_LIMIT {
        return description.to_string();
    }
    let kept: String = description
        .chars()
        .take(DISPLAY_DESCRIPTION_LIMIT - ELLIPSIS.len())
        .collect();
    format!("{kept}{ELLIPSIS}")
}
