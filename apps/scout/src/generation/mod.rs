// Proposal and flowchart generation.
// All LLM calls go through llm_client — nothing here talks to the API directly.

pub mod flowchart;
pub mod prompts;
pub mod proposal;
