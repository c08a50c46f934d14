// All LLM prompt templates for proposal and flowchart generation.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Every proposal opens with this greeting.
pub const GREETING: &str = "Hey!";

/// Marketing words that must never appear in a sent proposal. They are scrubbed
/// from model output and deliberately kept out of the prompt text.
pub const RESERVED_WORDS: &[&str] = &["wheelhouse"];

/// Company the proposals are written on behalf of.
pub const COMPANY_NAME: &str = "tmplogic";

pub const PROPOSAL_MAX_TOKENS: u32 = 1000;
pub const FLOWCHART_MAX_TOKENS: u32 = 1500;

/// Proposal prompt template.
/// Replace: {title}, {skills}, {budget}, {flowchart_section}, {company},
///          {greeting}, {human_voice}, {description}
pub const PROPOSAL_PROMPT_TEMPLATE: &str = r#"Job Title: {title}

Required Skills: {skills}

Budget: {budget}

{flowchart_section}

I am trying to win jobs on Upwork as a co-founder of {company}, a small custom AI, automation and software company. Write a properly structured proposal for the job listing above.

The proposal has exactly 3 paragraphs:

1. A short, simple introduction of {company} and why we are confident we can deliver this project given our related skills.

2. A conversational response to this specific listing. Suggest smart routes to take when building the project and reassure the client that we understand how to complete and deliver it. Do not repeat that the project is a good fit for us, and avoid stock phrases like "right up our alley" or "perfect fit". It does not have to be long to get the point across.

3. A closing paragraph of only 2-3 sentences about scheduling an introductory call and potentially working on the project together.

{human_voice}

HARD RULES:
- Start the proposal with "{greeting}"
- Do not mention the timeline or how much money
- Do not include any names of people
- Do not say we have directly done the same project before
- Let them know that a team of skilled developers will work on the project

Job Description:
{description}"#;

/// Added to the proposal prompt only when a flowchart link exists.
/// Replace: {flowchart_url}
pub const FLOWCHART_SECTION_TEMPLATE: &str = "\
I have also created a custom project implementation flowchart for this job, which can be viewed at: {flowchart_url}

In the closing paragraph, mention that we went ahead and made them this customized flowchart showing our implementation approach for their project, and encourage them to take a look.";

/// Flowchart prompt template.
/// Replace: {title}, {skills}, {artifact_only}, {description}
pub const FLOWCHART_PROMPT_TEMPLATE: &str = r#"Create a professional Mermaid.js flowchart diagram showing our implementation approach for this job:

Job Title: {title}

Required Skills: {skills}

The flowchart should:
1. Include 8-12 steps that are specifically tailored to this project
2. Use industry terminology relevant to this job
3. Show a logical progression from project initiation to completion
4. Include decision points if applicable to this type of project
5. Use subgraphs to organize the phases of the project
6. Include professional styling with colors that enhance readability

Use Mermaid.js flowchart TD (top-down) syntax. Here is an example of the format:

flowchart TD
    subgraph Phase1[Project Initiation]
        A[Start] --> B[Requirements Gathering]
        B --> C[Technical Assessment]
    end

    subgraph Phase2[Development]
        C --> D[Architecture Design]
        D --> E[Implementation]
        E --> F[Unit Testing]
    end

    subgraph Phase3[Quality Assurance]
        F --> G[Integration Testing]
        G --> H[User Acceptance]
    end

    subgraph Phase4[Deployment]
        H --> I[Production Release]
        I --> J[Maintenance Plan]
    end

    style Phase1 fill:#e1f5fe,stroke:#01579b,stroke-width:2px
    style Phase2 fill:#e8f5e9,stroke:#2e7d32,stroke-width:2px
    style Phase3 fill:#fff8e1,stroke:#ff8f00,stroke-width:2px
    style Phase4 fill:#f3e5f5,stroke:#7b1fa2,stroke-width:2px

That is only a generic example. Your flowchart must be customized to the specific requirements, technologies and processes of this job posting.

{artifact_only}

Job Description:
{description}"#;
