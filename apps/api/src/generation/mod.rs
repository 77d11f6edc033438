// Two-stage generation workflow: titles from a keyword, then outlines from
// the selected title. All model calls go through llm_client::TextGenerator.

pub mod handlers;
pub mod outline;
pub mod prompts;
pub mod titles;
