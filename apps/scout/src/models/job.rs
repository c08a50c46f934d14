use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Skills kept per job, scraped or extracted.
pub const MAX_SKILLS: usize = 3;

/// One job listing as produced by the scraper. Immutable once received.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawJobRecord")]
pub struct JobRecord {
    pub title: String,
    pub description: String,
    /// Labels the scraper attached to the listing, at most `MAX_SKILLS`.
    pub skills: Vec<String>,
    pub budget: Option<String>,
    pub payment_type: String,
    /// Recency as shown on the listing, e.g. "2 hours ago".
    pub published: String,
    pub link: String,
}

/// Dataset item shape. Skills arrive either as flattened `skills/0`,
/// `skills/1`, … keys or as a `skills` array, depending on the export format.
#[derive(Debug, Deserialize)]
struct RawJobRecord {
    title: Option<String>,
    #[serde(rename = "shortBio")]
    short_bio: Option<String>,
    description: Option<String>,
    skills: Option<Value>,
    budget: Option<Value>,
    #[serde(rename = "paymentType")]
    payment_type: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    link: Option<String>,
    url: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

impl From<RawJobRecord> for JobRecord {
    fn from(raw: RawJobRecord) -> Self {
        let flattened_skills = (0..MAX_SKILLS).filter_map(|i| {
            raw.extra
                .get(&format!("skills/{i}"))
                .and_then(value_to_text)
        });

        let skills: Vec<String> = match raw.skills {
            Some(Value::Array(ref items)) => items
                .iter()
                .filter_map(value_to_text)
                .take(MAX_SKILLS)
                .collect(),
            _ => flattened_skills.collect(),
        };

        JobRecord {
            title: non_empty(raw.title).unwrap_or_else(|| "No title".to_string()),
            description: non_empty(raw.short_bio)
                .or_else(|| non_empty(raw.description))
                .unwrap_or_else(|| "No description".to_string()),
            skills,
            budget: raw.budget.as_ref().and_then(value_to_text),
            payment_type: raw.payment_type.unwrap_or_default(),
            published: raw.published_date.unwrap_or_default(),
            link: raw.link.or(raw.url).unwrap_or_default(),
        }
    }
}

impl JobRecord {
    pub fn budget_display(&self) -> &str {
        self.budget.as_deref().unwrap_or("N/A")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_flattened_dataset_item_deserializes() {
        let record: JobRecord = serde_json::from_value(json!({
            "title": "AI Chatbot for Support",
            "shortBio": "Build a support chatbot with Python",
            "skills/0": "Python",
            "skills/1": "OpenAI API",
            "skills/2": "",
            "skills/3": "Ignored",
            "budget": "$3,000",
            "paymentType": "Fixed-price",
            "publishedDate": "25 minutes ago",
            "link": "https://www.upwork.com/jobs/~01abc"
        }))
        .unwrap();

        assert_eq!(record.title, "AI Chatbot for Support");
        assert_eq!(record.description, "Build a support chatbot with Python");
        assert_eq!(record.skills, vec!["Python", "OpenAI API"]);
        assert_eq!(record.budget.as_deref(), Some("$3,000"));
        assert_eq!(record.payment_type, "Fixed-price");
        assert_eq!(record.published, "25 minutes ago");
        assert_eq!(record.link, "https://www.upwork.com/jobs/~01abc");
    }

    #[test]
    fn test_skills_array_is_capped() {
        let record: JobRecord = serde_json::from_value(json!({
            "title": "x",
            "skills": ["A", "B", "C", "D"]
        }))
        .unwrap();
        assert_eq!(record.skills, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let record: JobRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.title, "No title");
        assert_eq!(record.description, "No description");
        assert!(record.skills.is_empty());
        assert_eq!(record.budget_display(), "N/A");
        assert!(record.published.is_empty());
    }

    #[test]
    fn test_numeric_budget_and_description_fallback() {
        let record: JobRecord = serde_json::from_value(json!({
            "description": "Long form description",
            "budget": 1500,
            "url": "https://example.com/job"
        }))
        .unwrap();
        assert_eq!(record.description, "Long form description");
        assert_eq!(record.budget.as_deref(), Some("1500"));
        assert_eq!(record.link, "https://example.com/job");
    }
}
