//! Flowchart generation — asks the model for a Mermaid diagram of our delivery
//! approach and turns it into a Mermaid Live link the client can open.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::generation::prompts::{FLOWCHART_MAX_TOKENS, FLOWCHART_PROMPT_TEMPLATE};
use crate::llm_client::prompts::{fill_template, render_skills, ARTIFACT_ONLY_INSTRUCTION};
use crate::llm_client::TextGenerator;

/// Viewer prefix; the base64 state follows the `#base64:` fragment marker.
pub const MERMAID_LIVE_PREFIX: &str = "https://mermaid.live/edit#base64:";

/// A generated diagram and the link that renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowchartArtifact {
    pub diagram: String,
    pub share_url: String,
}

/// Editor state understood by Mermaid Live.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MermaidLiveState {
    pub code: String,
    pub mermaid: MermaidRenderOptions,
    pub update_editor: bool,
    pub auto_sync: bool,
    pub update_diagram: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MermaidRenderOptions {
    pub theme: String,
}

pub struct FlowchartGenerator<'a> {
    llm: &'a dyn TextGenerator,
}

impl<'a> FlowchartGenerator<'a> {
    pub fn new(llm: &'a dyn TextGenerator) -> Self {
        Self { llm }
    }

    /// Returns `None` when generation fails for any reason; a missing
    /// flowchart never stops the job from being dispatched.
    pub async fn generate(
        &self,
        title: &str,
        description: &str,
        skills: &[String],
    ) -> Option<FlowchartArtifact> {
        info!("Generating custom flowchart for: {title}");

        let prompt = build_flowchart_prompt(title, description, skills);
        let raw = match self.llm.complete(&prompt, FLOWCHART_MAX_TOKENS).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Flowchart generation failed for '{title}': {e}");
                return None;
            }
        };

        let diagram = strip_code_fences(&raw);
        if diagram.is_empty() {
            warn!("Flowchart for '{title}' was empty after cleanup");
            return None;
        }

        let share_url = match mermaid_live_url(diagram) {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to encode flowchart for '{title}': {e}");
                return None;
            }
        };

        info!("Successfully generated custom Mermaid flowchart");
        Some(FlowchartArtifact {
            diagram: diagram.to_string(),
            share_url,
        })
    }
}

pub fn build_flowchart_prompt(title: &str, description: &str, skills: &[String]) -> String {
    fill_template(
        FLOWCHART_PROMPT_TEMPLATE,
        &[
            ("title", title),
            ("skills", &render_skills(skills)),
            ("artifact_only", ARTIFACT_ONLY_INSTRUCTION),
            ("description", description),
        ],
    )
}

/// Strips a surrounding ```` ```mermaid ```` / ```` ``` ```` fence pair, or
/// either half on its own, and trims whitespace.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag, if any, up to the end of the opening line.
        text = match rest.find('\n') {
            Some(newline) if !rest[..newline].trim().contains(' ') => &rest[newline + 1..],
            Some(_) => rest,
            None => rest.strip_prefix("mermaid").unwrap_or(rest),
        };
        text = text.trim();
    }

    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim();
    }

    text
}

/// Encodes the diagram as Mermaid Live editor state in a shareable URL.
pub fn mermaid_live_url(diagram: &str) -> Result<String, serde_json::Error> {
    let state = MermaidLiveState {
        code: diagram.to_string(),
        mermaid: MermaidRenderOptions {
            theme: "default".to_string(),
        },
        update_editor: true,
        auto_sync: true,
        update_diagram: true,
    };

    let json = serde_json::to_string(&state)?;
    Ok(format!("{MERMAID_LIVE_PREFIX}{}", STANDARD.encode(json.as_bytes())))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::LlmError;

    const DIAGRAM: &str = "flowchart TD\n    A[Start] --> B[Build]\n    B --> C[Ship]";

    struct ScriptedLlm {
        reply: Mutex<Option<Result<String, LlmError>>>,
        prompts: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedLlm {
        fn new(reply: Result<String, LlmError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedLlm {
        async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_tokens));
            self.reply
                .lock()
                .unwrap()
                .take()
                .expect("complete called more than once")
        }
    }

    fn decode_state(url: &str) -> MermaidLiveState {
        let payload = url.strip_prefix(MERMAID_LIVE_PREFIX).unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_strip_fences_with_mermaid_tag() {
        let raw = format!("```mermaid\n{DIAGRAM}\n```");
        assert_eq!(strip_code_fences(&raw), DIAGRAM);
    }

    #[test]
    fn test_strip_fences_bare() {
        let raw = format!("```\n{DIAGRAM}\n```\n");
        assert_eq!(strip_code_fences(&raw), DIAGRAM);
    }

    #[test]
    fn test_strip_fences_none_present() {
        let raw = format!("\n\n{DIAGRAM}  \n");
        assert_eq!(strip_code_fences(&raw), DIAGRAM);
    }

    #[test]
    fn test_strip_fences_trailing_only() {
        let raw = format!("{DIAGRAM}\n```");
        assert_eq!(strip_code_fences(&raw), DIAGRAM);
    }

    #[test]
    fn test_share_url_round_trips_diagram() {
        let diagram = "flowchart TD\n    A[\"Données\"] --> B{Ready?}\n    B -->|yes| C[Ship 🚀]";
        let url = mermaid_live_url(diagram).unwrap();
        assert!(url.starts_with(MERMAID_LIVE_PREFIX));

        let state = decode_state(&url);
        assert_eq!(state.code, diagram);
        assert_eq!(state.mermaid.theme, "default");
        assert!(state.update_editor && state.auto_sync && state.update_diagram);
    }

    #[test]
    fn test_state_uses_camel_case_keys() {
        let url = mermaid_live_url("flowchart TD").unwrap();
        let payload = url.strip_prefix(MERMAID_LIVE_PREFIX).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(payload).unwrap()).unwrap();
        assert_eq!(json["updateEditor"], true);
        assert_eq!(json["autoSync"], true);
        assert_eq!(json["updateDiagram"], true);
    }

    #[test]
    fn test_prompt_contains_job_details() {
        let skills = vec!["Python".to_string(), "AWS".to_string()];
        let prompt = build_flowchart_prompt("ETL Pipeline", "Move data nightly", &skills);
        assert!(prompt.contains("Job Title: ETL Pipeline"));
        assert!(prompt.contains("Required Skills: Python, AWS"));
        assert!(prompt.contains("Move data nightly"));
        assert!(prompt.contains("8-12 steps"));
        assert!(prompt.contains("flowchart TD"));
        assert!(prompt.contains("ONLY return"));
    }

    #[tokio::test]
    async fn test_generate_cleans_and_encodes() {
        let llm = ScriptedLlm::new(Ok(format!("```mermaid\n{DIAGRAM}\n```")));
        let generator = FlowchartGenerator::new(&llm);

        let artifact = generator
            .generate("Dashboard", "Build a dashboard", &[])
            .await
            .unwrap();

        assert_eq!(artifact.diagram, DIAGRAM);
        assert_eq!(decode_state(&artifact.share_url).code, DIAGRAM);
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts[0].1, FLOWCHART_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_generate_returns_none_on_exhausted_retries() {
        let llm = ScriptedLlm::new(Err(LlmError::Exhausted { attempts: 3 }));
        let generator = FlowchartGenerator::new(&llm);
        assert!(generator.generate("Dashboard", "desc", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_generate_returns_none_on_api_error() {
        let llm = ScriptedLlm::new(Err(LlmError::Api {
            status: 400,
            message: "bad".to_string(),
        }));
        let generator = FlowchartGenerator::new(&llm);
        assert!(generator.generate("Dashboard", "desc", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_generate_returns_none_for_empty_fence() {
        let llm = ScriptedLlm::new(Ok("```mermaid\n```".to_string()));
        let generator = FlowchartGenerator::new(&llm);
        assert!(generator.generate("Dashboard", "desc", &[]).await.is_none());
    }
}
