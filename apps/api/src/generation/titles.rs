//! Title Generation — keyword in, up to 15 editable title candidates out.
//!
//! The model answers in free text. Only numbered lines (`12. Some title`) count;
//! preamble, epilogue and anything else is dropped without complaint, and fewer
//! than 15 matches is still a success.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};

use crate::generation::prompts::title_prompt;
use crate::llm_client::TextGenerator;
use crate::models::workflow::{SharedWorkflow, Ticket};

pub const MAX_TITLES: usize = 15;

/// What a title generation request ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum TitleRun {
    /// Blank keyword: nothing was sent and the board is unchanged.
    Skipped,
    Generated { count: usize },
    Failed { notice: String },
    /// A newer request started while this one was in flight; its result was dropped.
    Superseded,
}

/// Returns the text after a leading `<digits>.` marker, or `None` if the line
/// is not a numbered list item.
pub fn strip_list_marker(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix('.').map(str::trim_start)
}

/// Keeps numbered lines in order, strips their markers, caps at `MAX_TITLES`.
pub fn parse_titles(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(strip_list_marker)
        .take(MAX_TITLES)
        .map(str::to_string)
        .collect()
}

/// Runs the title stage for `keyword` and renders the result into the board.
///
/// Never returns an error: upstream failures become the board notice. The call
/// and the write-back run in a spawned task, so the board leaves its loading
/// state even if the caller is dropped or the generator panics.
pub async fn generate_titles(
    workflow: &SharedWorkflow,
    llm: &Arc<dyn TextGenerator>,
    keyword: &str,
) -> TitleRun {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return TitleRun::Skipped;
    }

    let ticket = {
        let mut state = workflow.lock().await;
        state.set_keyword(keyword);
        state.begin_titles()
    };

    info!("Generating titles for keyword {:?}", keyword);
    let task = tokio::spawn(fill_titles(
        Arc::clone(workflow),
        Arc::clone(llm),
        ticket,
        title_prompt(keyword),
    ));

    task.await.unwrap_or_else(|e| {
        warn!("Title generation task failed: {e}");
        TitleRun::Failed {
            notice: format!("Error: {e}. Please try again later."),
        }
    })
}

async fn fill_titles(
    workflow: SharedWorkflow,
    llm: Arc<dyn TextGenerator>,
    ticket: Ticket,
    prompt: String,
) -> TitleRun {
    let result = AssertUnwindSafe(llm.generate(&prompt)).catch_unwind().await;

    let mut state = workflow.lock().await;
    let error = match result {
        Ok(Ok(raw)) => {
            let titles = parse_titles(&raw);
            let count = titles.len();
            if !state.commit_titles(ticket, titles) {
                return TitleRun::Superseded;
            }
            info!("Title generation produced {} candidates", count);
            return TitleRun::Generated { count };
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => "generation aborted unexpectedly".to_string(),
    };

    warn!("Title generation failed: {error}");
    let notice = format!("Error: {error}. Please try again later.");
    if !state.fail_titles(ticket, notice.clone()) {
        return TitleRun::Superseded;
    }
    TitleRun::Failed { notice }
}
