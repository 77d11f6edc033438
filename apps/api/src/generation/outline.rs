//! Outline Generation — one structured outline per slot, keyed by the
//! selected title and the keyword.
//!
//! Flow per slot: validate → mark loading → LLM call → format (or `Error: ...`)
//! → clear loading. Each slot runs as its own spawned task so the write-back
//! happens even if the caller goes away.
//!
//! Batch runs go through a bounded dispatcher. Concurrency 1 is the strict
//! sequential contract: slot i+1 is not requested before slot i has finished.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use futures::{stream, FutureExt, StreamExt};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::generation::prompts::outline_prompt;
use crate::generation::titles::strip_list_marker;
use crate::llm_client::TextGenerator;
use crate::models::workflow::{SharedWorkflow, Ticket};

pub const MISSING_INPUT_MESSAGE: &str = "Please select a title and ensure keywords are entered";

/// What happened to one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotOutcome {
    Filled,
    Failed(String),
    /// Preconditions no longer held when the slot's turn came; nothing was
    /// requested and the slot keeps its previous text.
    Skipped(String),
    /// A newer request for the same slot owns it now; this result was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotReport {
    pub index: usize,
    pub outcome: SlotOutcome,
}

fn is_headline(line: &str) -> bool {
    strip_list_marker(line).is_some()
}

/// Normalises raw model output into the outline layout.
///
/// - leading whitespace is stripped from every line
/// - runs of blank lines collapse to a single blank line
/// - every headline (`<digits>.`) after the first line gets one blank line before it
/// - leading and trailing blank lines are dropped
///
/// Idempotent: `format_outline(&format_outline(x)) == format_outline(x)`.
pub fn format_outline(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for line in raw.lines().map(str::trim_start) {
        let after_text = lines.last().is_some_and(|prev| !prev.is_empty());

        if line.is_empty() {
            if after_text {
                lines.push("");
            }
            continue;
        }

        if is_headline(line) && after_text {
            lines.push("");
        }
        lines.push(line);
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

/// Checks preconditions and claims the slot. Returns the ticket and the prompt
/// built from the current title/keyword.
async fn claim_slot(workflow: &SharedWorkflow, index: usize) -> Result<(Ticket, String), AppError> {
    let mut state = workflow.lock().await;
    state.check_slot(index)?;

    let (Some(title), Some(keyword)) = (state.selected_title(), state.keyword()) else {
        return Err(AppError::Validation(MISSING_INPUT_MESSAGE.to_string()));
    };
    let prompt = outline_prompt(title, keyword);

    let ticket = state.begin_outline(index)?;
    Ok((ticket, prompt))
}

/// Calls the model for a claimed slot and writes the result back.
/// The loading flag is cleared on every path, including a panicking generator.
async fn fill_slot(
    workflow: SharedWorkflow,
    llm: Arc<dyn TextGenerator>,
    index: usize,
    ticket: Ticket,
    prompt: String,
) -> SlotReport {
    debug!("Requesting outline for slot {}", index);

    let result = AssertUnwindSafe(llm.generate(&prompt)).catch_unwind().await;

    let (text, outcome) = match result {
        Ok(Ok(raw)) => (format_outline(&raw), SlotOutcome::Filled),
        Ok(Err(e)) => {
            warn!("Outline generation failed for slot {}: {e}", index);
            let message = format!("Error: {e}");
            (message.clone(), SlotOutcome::Failed(message))
        }
        Err(_) => {
            warn!("Outline generator panicked for slot {}", index);
            let message = "Error: generation aborted unexpectedly".to_string();
            (message.clone(), SlotOutcome::Failed(message))
        }
    };

    let committed = workflow.lock().await.finish_outline(index, ticket, text);
    let outcome = if committed {
        outcome
    } else {
        debug!("Dropping stale outline result for slot {}", index);
        SlotOutcome::Superseded
    };

    SlotReport { index, outcome }
}

async fn run_slot(
    workflow: &SharedWorkflow,
    llm: &Arc<dyn TextGenerator>,
    index: usize,
) -> Result<SlotReport, AppError> {
    let (ticket, prompt) = claim_slot(workflow, index).await?;
    let task = tokio::spawn(fill_slot(
        Arc::clone(workflow),
        Arc::clone(llm),
        index,
        ticket,
        prompt,
    ));
    task.await
        .map_err(|e| AppError::Internal(anyhow!("outline task for slot {index} failed: {e}")))
}

/// Generates (or regenerates) a single slot.
///
/// Missing title/keyword is a validation error and no call is made.
/// Upstream failures are written into the slot as `Error: ...` text.
pub async fn generate_single_outline(
    workflow: &SharedWorkflow,
    llm: &Arc<dyn TextGenerator>,
    index: usize,
) -> Result<SlotReport, AppError> {
    let report = run_slot(workflow, llm, index).await?;
    info!("Outline slot {} finished: {:?}", report.index, report.outcome);
    Ok(report)
}

/// Generates every slot in index order with at most `concurrency` calls in flight.
///
/// Preconditions are checked once up front. After that every slot gets its own
/// independent outcome: one failure never stops the rest of the batch.
pub async fn generate_all_outlines(
    workflow: &SharedWorkflow,
    llm: &Arc<dyn TextGenerator>,
    concurrency: usize,
) -> Result<Vec<SlotReport>, AppError> {
    let slot_count = {
        let state = workflow.lock().await;
        if state.selected_title().is_none() || state.keyword().is_none() {
            return Err(AppError::Validation(MISSING_INPUT_MESSAGE.to_string()));
        }
        state.slot_count()
    };

    info!(
        "Generating {} outlines (concurrency {})",
        slot_count, concurrency
    );

    let workflow = Arc::clone(workflow);
    let llm = Arc::clone(llm);
    let concurrency = concurrency.max(1);

    // Detached so the batch finishes even if the request that started it is dropped.
    let batch = tokio::spawn(async move {
        stream::iter(0..slot_count)
            .map(|index| {
                let workflow = Arc::clone(&workflow);
                let llm = Arc::clone(&llm);
                async move {
                    match run_slot(&workflow, &llm, index).await {
                        Ok(report) => report,
                        Err(e) => {
                            warn!("Skipping outline slot {}: {e}", index);
                            SlotReport {
                                index,
                                outcome: SlotOutcome::Skipped(e.to_string()),
                            }
                        }
                    }
                }
            })
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await
    });

    let reports = batch
        .await
        .map_err(|e| AppError::Internal(anyhow!("outline batch failed: {e}")))?;

    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, SlotOutcome::Failed(_)))
        .count();
    let skipped = reports
        .iter()
        .filter(|r| matches!(r.outcome, SlotOutcome::Skipped(_)))
        .count();
    info!(
        "Outline batch finished: {} slots, {} failed, {} skipped",
        reports.len(),
        failed,
        skipped
    );

    Ok(reports)
}
