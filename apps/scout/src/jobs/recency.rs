//! Recency — turns the listing's "posted" text into an age and decides freshness.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

static RE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+|an?|one)\s+(second|sec|minute|min|hour|hr|day|week|month|year)s?\b")
        .unwrap()
});

/// Single eligibility rule for every run: a job is fresh when its parsed age
/// is at most `max_age`. Jobs whose age cannot be read are never fresh.
#[derive(Debug, Clone, Copy)]
pub struct RecencyPolicy {
    pub max_age: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh(Duration),
    Stale(Duration),
    Unknown,
}

impl RecencyPolicy {
    pub fn from_minutes(minutes: i64) -> Self {
        Self {
            max_age: Duration::minutes(minutes),
        }
    }

    pub fn classify(&self, published: &str, now: DateTime<Utc>) -> Freshness {
        match parse_age(published, now) {
            Some(age) if age <= self.max_age => Freshness::Fresh(age),
            Some(age) => Freshness::Stale(age),
            None => Freshness::Unknown,
        }
    }
}

/// Age of a listing from texts like "35 minutes ago", "an hour ago",
/// "yesterday", "just now", or an RFC 3339 timestamp.
pub fn parse_age(published: &str, now: DateTime<Utc>) -> Option<Duration> {
    let text = published.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some((now - ts.with_timezone(&Utc)).max(Duration::zero()));
    }

    let lower = text.to_lowercase();
    if lower.contains("just now") || lower == "now" || lower.contains("moments ago") {
        return Some(Duration::zero());
    }
    if lower.contains("yesterday") {
        return Some(Duration::days(1));
    }
    if lower.contains("last week") {
        return Some(Duration::weeks(1));
    }

    let caps = RE_RELATIVE.captures(&lower)?;
    let amount: i64 = match &caps[1] {
        "a" | "an" | "one" => 1,
        digits => digits.parse().ok()?,
    };

    // Absurd amounts count as unreadable rather than overflowing.
    match &caps[2] {
        "second" | "sec" => Duration::try_seconds(amount),
        "minute" | "min" => Duration::try_minutes(amount),
        "hour" | "hr" => Duration::try_hours(amount),
        "day" => Duration::try_days(amount),
        "week" => Duration::try_weeks(amount),
        "month" => amount.checked_mul(30).and_then(Duration::try_days),
        "year" => amount.checked_mul(365).and_then(Duration::try_days),
        _ => None,
    }
}
