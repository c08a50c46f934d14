// Shared prompt fragments and prompt-building utilities.
// Each generator defines its own templates in generation/prompts.rs.

/// Rendered in place of any job attribute the listing left empty.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Appended to prompts whose answer is parsed by code rather than read by a person.
pub const ARTIFACT_ONLY_INSTRUCTION: &str = "\
    ONLY return the requested code, nothing else. \
    No explanations, no introductions, no additional text.";

/// Keeps sales copy sounding like a person wrote it.
pub const HUMAN_VOICE_INSTRUCTION: &str = "\
    This should look as if a human is writing this, not AI. \
    Don't use any heavy formatting: no headings, bullet lists or bold text.";

/// Comma-separated skill list, or `NOT_SPECIFIED` when there are none.
pub fn render_skills(skills: &[String]) -> String {
    if skills.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        skills.join(", ")
    }
}

/// Fills `{key}` placeholders in a template. Unknown placeholders are left in place.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}
