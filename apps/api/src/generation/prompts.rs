// Prompt templates for the two generation stages.
// The client treats prompts as opaque text; all wording lives here.

/// Title stage. Replace `{keywords}` before sending.
pub const TITLE_PROMPT_TEMPLATE: &str = "\
Generate 15 SEO-optimized title variations for content about {keywords}.
Make them catchy, keyword-rich, and under 60 characters.
Include power words and emotional triggers.
Format as a numbered list:";

/// Outline stage. Replace `{title}` and `{keywords}` before sending.
pub const OUTLINE_PROMPT_TEMPLATE: &str = r#"Create a detailed content outline for "{title}" using "{keywords}" as focus keyword.
Generate exactly 10 main headlines with supporting points.
Format as:

1. [Engaging Main Headline]
   - Supporting point
   - Key detail

2. [Another Headline with {keywords} integration]
   - Important aspect
   - Critical information

Continue this pattern for all 10 headlines.
Each headline must have exactly 2 supporting points.
Make headlines SEO-friendly and engaging."#;

pub fn title_prompt(keywords: &str) -> String {
    TITLE_PROMPT_TEMPLATE.replace("{keywords}", keywords)
}

pub fn outline_prompt(title: &str, keywords: &str) -> String {
    OUTLINE_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{keywords}", keywords)
}
