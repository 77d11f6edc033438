//! Axum route handlers for the title/outline workflow.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::outline::{generate_all_outlines, generate_single_outline, SlotOutcome};
use crate::generation::titles::{generate_titles, TitleRun};
use crate::models::workflow::{
    OutlineSlot, SelectedTitle, TitleBoard, TitleCandidate, WorkflowError, WorkflowState,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct KeywordRequest {
    pub keyword: String,
}

#[derive(Debug, Serialize)]
pub struct KeywordResponse {
    pub keyword: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateTitlesResponse {
    /// "generated" | "skipped" | "failed" | "superseded"
    pub status: &'static str,
    pub titles: TitleBoard,
}

#[derive(Debug, Deserialize)]
pub struct EditTitleRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EditTitleResponse {
    pub title: TitleCandidate,
    pub selected: Option<SelectedTitle>,
}

#[derive(Debug, Serialize)]
pub struct OutlinesResponse {
    pub slots: Vec<OutlineSlot>,
    /// Slots now showing `Error:` text.
    pub failed: usize,
    /// Slots left untouched because title/keyword vanished mid-batch.
    pub skipped: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/workflow
pub async fn handle_get_workflow(State(state): State<AppState>) -> Json<WorkflowState> {
    Json(state.workflow.lock().await.clone())
}

/// PUT /api/v1/workflow/keyword
///
/// Mirrors typing into the keyword field without triggering title generation.
pub async fn handle_set_keyword(
    State(state): State<AppState>,
    Json(request): Json<KeywordRequest>,
) -> Json<KeywordResponse> {
    let mut workflow = state.workflow.lock().await;
    workflow.set_keyword(&request.keyword);
    Json(KeywordResponse {
        keyword: workflow.keyword.clone(),
    })
}

/// POST /api/v1/titles/generate
///
/// Blank keywords are a silent no-op. Upstream failures come back as a 200 with
/// the board notice set, the same way the page would render them.
pub async fn handle_generate_titles(
    State(state): State<AppState>,
    Json(request): Json<KeywordRequest>,
) -> Json<GenerateTitlesResponse> {
    let run = generate_titles(&state.workflow, &state.llm, &request.keyword).await;

    let status = match run {
        TitleRun::Skipped => "skipped",
        TitleRun::Generated { .. } => "generated",
        TitleRun::Failed { .. } => "failed",
        TitleRun::Superseded => "superseded",
    };

    let titles = state.workflow.lock().await.titles.clone();
    Json(GenerateTitlesResponse { status, titles })
}

/// POST /api/v1/titles/:id/select
pub async fn handle_select_title(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SelectedTitle>, AppError> {
    let mut workflow = state.workflow.lock().await;
    let selected = workflow.select_title(id)?.clone();
    Ok(Json(selected))
}

/// PATCH /api/v1/titles/:id
///
/// In-place edit. The char count is recomputed and SelectedTitle follows when
/// this candidate is the selected one.
pub async fn handle_edit_title(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditTitleRequest>,
) -> Result<Json<EditTitleResponse>, AppError> {
    let mut workflow = state.workflow.lock().await;
    let title = workflow.edit_title(id, request.text)?.clone();
    Ok(Json(EditTitleResponse {
        title,
        selected: workflow.selected.clone(),
    }))
}

/// POST /api/v1/outlines/generate
///
/// Backs both "generate all" and "regenerate all".
pub async fn handle_generate_all_outlines(
    State(state): State<AppState>,
) -> Result<Json<OutlinesResponse>, AppError> {
    let reports =
        generate_all_outlines(&state.workflow, &state.llm, state.config.outline_concurrency)
            .await?;

    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, SlotOutcome::Failed(_)))
        .count();
    let skipped = reports
        .iter()
        .filter(|r| matches!(r.outcome, SlotOutcome::Skipped(_)))
        .count();
    let slots = state.workflow.lock().await.slots.clone();

    Ok(Json(OutlinesResponse {
        slots,
        failed,
        skipped,
    }))
}

/// POST /api/v1/outlines/:slot/generate
pub async fn handle_generate_outline(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
) -> Result<Json<OutlineSlot>, AppError> {
    generate_single_outline(&state.workflow, &state.llm, slot).await?;
    let workflow = state.workflow.lock().await;
    let outline = workflow
        .slots
        .get(slot)
        .cloned()
        .ok_or(WorkflowError::UnknownSlot {
            index: slot,
            count: workflow.slot_count(),
        })?;
    Ok(Json(outline))
}
