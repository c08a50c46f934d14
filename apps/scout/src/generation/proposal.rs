//! Proposal generation — sales copy for one job listing.
//!
//! Never fails: when the model cannot be reached the proposal body is a short
//! explanation of what went wrong, so the job still reaches the operator.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::{info, warn};

use crate::generation::prompts::{
    COMPANY_NAME, FLOWCHART_SECTION_TEMPLATE, GREETING, PROPOSAL_MAX_TOKENS,
    PROPOSAL_PROMPT_TEMPLATE, RESERVED_WORDS,
};
use crate::llm_client::prompts::{
    fill_template, render_skills, HUMAN_VOICE_INSTRUCTION, NOT_SPECIFIED,
};
use crate::llm_client::{LlmError, TextGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Generated,
    ApiError,
    ExhaustedRetries,
    TransportError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProposal {
    pub body: String,
    pub status: ProposalStatus,
}

impl GeneratedProposal {
    fn failed(error: &LlmError) -> Self {
        let (status, body) = match error {
            LlmError::Exhausted { .. } | LlmError::Overloaded { .. } => (
                ProposalStatus::ExhaustedRetries,
                "Could not generate proposal after multiple attempts. Claude API may be experiencing high traffic.".to_string(),
            ),
            LlmError::Api { .. } => (
                ProposalStatus::ApiError,
                "Unable to generate proposal due to API error. Please check logs.".to_string(),
            ),
            LlmError::Transport(e) => (
                ProposalStatus::TransportError,
                format!("Error calling Claude API: {e}"),
            ),
        };
        Self { body, status }
    }

    pub fn is_generated(&self) -> bool {
        self.status == ProposalStatus::Generated
    }
}

/// Everything the proposal prompt needs to know about a job.
#[derive(Debug, Clone, Copy)]
pub struct ProposalRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub skills: &'a [String],
    pub budget: Option<&'a str>,
    pub flowchart_url: Option<&'a str>,
}

pub struct ProposalGenerator<'a> {
    llm: &'a dyn TextGenerator,
}

impl<'a> ProposalGenerator<'a> {
    pub fn new(llm: &'a dyn TextGenerator) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, request: ProposalRequest<'_>) -> GeneratedProposal {
        info!("Generating proposal for: {}", request.title);

        let prompt = build_proposal_prompt(&request);
        match self.llm.complete(&prompt, PROPOSAL_MAX_TOKENS).await {
            Ok(text) => {
                info!("Successfully generated proposal");
                GeneratedProposal {
                    body: enforce_house_style(&text),
                    status: ProposalStatus::Generated,
                }
            }
            Err(e) => {
                warn!("Proposal generation failed for '{}': {e}", request.title);
                GeneratedProposal::failed(&e)
            }
        }
    }
}

pub fn build_proposal_prompt(request: &ProposalRequest<'_>) -> String {
    let flowchart_section = request
        .flowchart_url
        .map(|url| fill_template(FLOWCHART_SECTION_TEMPLATE, &[("flowchart_url", url)]))
        .unwrap_or_default();

    let budget = request
        .budget
        .filter(|b| !b.trim().is_empty())
        .unwrap_or(NOT_SPECIFIED);

    fill_template(
        PROPOSAL_PROMPT_TEMPLATE,
        &[
            ("title", request.title),
            ("skills", &render_skills(request.skills)),
            ("budget", budget),
            ("flowchart_section", &flowchart_section),
            ("company", COMPANY_NAME),
            ("greeting", GREETING),
            ("human_voice", HUMAN_VOICE_INSTRUCTION),
            ("description", request.description),
        ],
    )
}

static RE_RESERVED: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = RESERVED_WORDS
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternatives})\b"))
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// A salutation the model opened with instead of the house greeting.
static RE_SALUTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:hey|hi|hello)(?:\s+there)?\s*[!,.]\s*").unwrap());

/// Guarantees the greeting opener and removes reserved words the model let slip.
pub fn enforce_house_style(text: &str) -> String {
    let body = RE_RESERVED
        .replace_all(text.trim(), "area of expertise")
        .into_owned();

    if body.starts_with(GREETING) {
        return body;
    }

    let rest = match RE_SALUTATION.find(&body) {
        Some(salutation) => &body[salutation.end()..],
        None => body.as_str(),
    };
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) => format!("{GREETING} {}{}", first.to_uppercase(), chars.as_str()),
        None => GREETING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct ScriptedLlm {
        reply: Mutex<Option<Result<String, LlmError>>>,
        prompt: Mutex<Option<String>>,
    }

    impl ScriptedLlm {
        fn new(reply: Result<String, LlmError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedLlm {
        async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
            *self.prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply
                .lock()
                .unwrap()
                .take()
                .expect("complete called more than once")
        }
    }

    fn skills() -> Vec<String> {
        vec!["Python".to_string(), "AWS".to_string()]
    }

    fn request<'a>(skills: &'a [String], flowchart_url: Option<&'a str>) -> ProposalRequest<'a> {
        ProposalRequest {
            title: "Data Pipeline on AWS",
            description: "We need a Python developer with AWS and Docker experience",
            skills,
            budget: Some("$2,000"),
            flowchart_url,
        }
    }

    #[test]
    fn test_prompt_carries_hard_rules() {
        let skills = skills();
        let prompt = build_proposal_prompt(&request(&skills, None));
        assert!(prompt.contains("Start the proposal with \"Hey!\""));
        assert!(prompt.contains("Do not mention the timeline or how much money"));
        assert!(prompt.contains("Do not include any names of people"));
        assert!(prompt.contains("Do not say we have directly done the same project before"));
        assert!(prompt.contains("team of skilled developers"));
        assert!(prompt.contains("exactly 3 paragraphs"));
        assert!(prompt.contains("Budget: $2,000"));
        assert!(prompt.contains("Required Skills: Python, AWS"));
    }

    #[test]
    fn test_prompt_never_contains_reserved_words() {
        let skills = skills();
        for url in [None, Some("https://mermaid.live/edit#base64:abc")] {
            let prompt = build_proposal_prompt(&request(&skills, url)).to_lowercase();
            for word in RESERVED_WORDS {
                assert!(!prompt.contains(word), "prompt leaked reserved word {word}");
            }
        }
    }

    #[test]
    fn test_flowchart_mentioned_only_when_url_present() {
        let skills = skills();
        let without = build_proposal_prompt(&request(&skills, None));
        assert!(!without.contains("flowchart"));

        let url = "https://mermaid.live/edit#base64:abc";
        let with = build_proposal_prompt(&request(&skills, Some(url)));
        assert!(with.contains(url));
        assert!(with.contains("customized flowchart"));
    }

    #[test]
    fn test_missing_budget_and_skills_render_not_specified() {
        let prompt = build_proposal_prompt(&ProposalRequest {
            title: "Bot",
            description: "Build a bot",
            skills: &[],
            budget: None,
            flowchart_url: None,
        });
        assert!(prompt.contains("Budget: Not specified"));
        assert!(prompt.contains("Required Skills: Not specified"));
    }

    #[test]
    fn test_house_style_prepends_greeting() {
        assert_eq!(
            enforce_house_style("Thanks for posting this."),
            "Hey! Thanks for posting this."
        );
        assert_eq!(enforce_house_style("  Hey! Already there.\n"), "Hey! Already there.");
    }

    #[test]
    fn test_house_style_replaces_other_salutations() {
        assert_eq!(
            enforce_house_style("Hey there! We can help."),
            "Hey! We can help."
        );
        assert_eq!(enforce_house_style("Hi, thanks for posting."), "Hey! Thanks for posting.");
        assert_eq!(enforce_house_style("hello! Glad to apply."), "Hey! Glad to apply.");
        assert_eq!(
            enforce_house_style("Highly experienced team here."),
            "Hey! Highly experienced team here."
        );
    }

    #[test]
    fn test_house_style_scrubs_reserved_words_case_insensitively() {
        let out = enforce_house_style("Hey! This is right in our Wheelhouse and WHEELHOUSE.");
        for word in RESERVED_WORDS {
            assert!(!out.to_lowercase().contains(word));
        }
        assert!(out.starts_with(GREETING));
    }

    #[tokio::test]
    async fn test_generated_proposal_always_starts_with_greeting() {
        let llm = ScriptedLlm::new(Ok("We can build this with a wheelhouse of tools.".to_string()));
        let skills = skills();
        let proposal = ProposalGenerator::new(&llm)
            .generate(request(&skills, None))
            .await;

        assert!(proposal.is_generated());
        assert!(proposal.body.starts_with(GREETING));
        assert!(!proposal.body.to_lowercase().contains("wheelhouse"));
    }

    #[tokio::test]
    async fn test_full_description_reaches_prompt() {
        let description = "x".repeat(300);
        let llm = ScriptedLlm::new(Ok("Hey! ok".to_string()));
        ProposalGenerator::new(&llm)
            .generate(ProposalRequest {
                title: "Long",
                description: &description,
                skills: &[],
                budget: None,
                flowchart_url: None,
            })
            .await;

        let prompt = llm.prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains(&description));
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_placeholder() {
        let llm = ScriptedLlm::new(Err(LlmError::Exhausted { attempts: 3 }));
        let skills = skills();
        let proposal = ProposalGenerator::new(&llm)
            .generate(request(&skills, None))
            .await;

        assert_eq!(proposal.status, ProposalStatus::ExhaustedRetries);
        assert!(proposal.body.contains("after multiple attempts"));
    }

    #[tokio::test]
    async fn test_api_error_yields_placeholder() {
        let llm = ScriptedLlm::new(Err(LlmError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        }));
        let skills = skills();
        let proposal = ProposalGenerator::new(&llm)
            .generate(request(&skills, None))
            .await;

        assert_eq!(proposal.status, ProposalStatus::ApiError);
        assert!(proposal.body.contains("API error"));
    }
}
