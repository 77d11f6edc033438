//! Page-level workflow state shared by the title and outline controllers.
//!
//! Owned by the service and passed to controllers explicitly. Every mutation
//! happens under the workflow lock; generation calls happen outside it, so each
//! region (title board, each outline slot) hands out a ticket when a request
//! starts and only the newest ticket may commit a result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

pub type SharedWorkflow = Arc<Mutex<WorkflowState>>;

#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Title {0} not found")]
    UnknownTitle(Uuid),

    #[error("Outline slot {index} does not exist ({count} slots available)")]
    UnknownSlot { index: usize, count: usize },
}

/// One AI-proposed title. `id` is assigned at creation and never changes,
/// so editing `text` can never collide with another candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleCandidate {
    pub id: Uuid,
    pub text: String,
    pub char_count: usize,
}

impl TitleCandidate {
    pub fn new(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            char_count: text.chars().count(),
            text,
        }
    }

    fn set_text(&mut self, text: String) {
        self.char_count = text.chars().count();
        self.text = text;
    }
}

/// Result region for title generation: candidates, or a notice, never both.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TitleBoard {
    pub candidates: Vec<TitleCandidate>,
    pub loading: bool,
    pub notice: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    ticket: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedTitle {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineSlot {
    pub index: usize,
    pub text: String,
    pub loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    ticket: u64,
}

impl OutlineSlot {
    fn new(index: usize) -> Self {
        Self {
            index,
            text: String::new(),
            loading: false,
            updated_at: None,
            ticket: 0,
        }
    }
}

/// Handle for one in-flight request. Only the newest one per region commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    pub keyword: String,
    pub titles: TitleBoard,
    pub selected: Option<SelectedTitle>,
    pub slots: Vec<OutlineSlot>,
}

impl WorkflowState {
    /// Creates the page state with a fixed number of empty outline slots.
    pub fn new(slot_count: usize) -> Self {
        Self {
            keyword: String::new(),
            titles: TitleBoard::default(),
            selected: None,
            slots: (0..slot_count).map(OutlineSlot::new).collect(),
        }
    }

    pub fn shared(slot_count: usize) -> SharedWorkflow {
        Arc::new(Mutex::new(Self::new(slot_count)))
    }

    pub fn set_keyword(&mut self, raw: &str) {
        self.keyword = raw.trim().to_string();
    }

    /// Current keyword, if one has been entered.
    pub fn keyword(&self) -> Option<&str> {
        Some(self.keyword.as_str()).filter(|k| !k.is_empty())
    }

    /// Current SelectedTitle text, if a non-empty one exists.
    pub fn selected_title(&self) -> Option<&str> {
        self.selected
            .as_ref()
            .map(|s| s.text.as_str())
            .filter(|t| !t.trim().is_empty())
    }

    // ── Title board ─────────────────────────────────────────────────────────

    /// Starts a title request. The board is emptied while it is in flight, so
    /// candidates from the previous run can no longer be selected or edited.
    /// SelectedTitle keeps its text.
    pub fn begin_titles(&mut self) -> Ticket {
        self.titles.ticket += 1;
        self.titles.loading = true;
        self.titles.candidates.clear();
        self.titles.notice = None;
        Ticket(self.titles.ticket)
    }

    /// Replaces the board with fresh candidates. Returns false for a stale ticket.
    pub fn commit_titles(&mut self, ticket: Ticket, titles: Vec<String>) -> bool {
        if ticket.0 != self.titles.ticket {
            return false;
        }
        self.titles.candidates = titles.into_iter().map(TitleCandidate::new).collect();
        self.titles.notice = None;
        self.titles.loading = false;
        self.titles.generated_at = Some(Utc::now());
        true
    }

    /// Replaces the board with a notice and no candidates. Returns false for a stale ticket.
    pub fn fail_titles(&mut self, ticket: Ticket, notice: String) -> bool {
        if ticket.0 != self.titles.ticket {
            return false;
        }
        self.titles.candidates.clear();
        self.titles.notice = Some(notice);
        self.titles.loading = false;
        self.titles.generated_at = Some(Utc::now());
        true
    }

    pub fn select_title(&mut self, id: Uuid) -> Result<&SelectedTitle, WorkflowError> {
        let candidate = self
            .titles
            .candidates
            .iter()
            .find(|c| c.id == id)
            .ok_or(WorkflowError::UnknownTitle(id))?;

        Ok(self.selected.insert(SelectedTitle {
            id,
            text: candidate.text.clone(),
        }))
    }

    /// Edits a candidate in place. SelectedTitle follows only when this
    /// candidate is the selected one.
    pub fn edit_title(&mut self, id: Uuid, text: String) -> Result<&TitleCandidate, WorkflowError> {
        let candidate = self
            .titles
            .candidates
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(WorkflowError::UnknownTitle(id))?;

        candidate.set_text(text);

        if let Some(selected) = self.selected.as_mut().filter(|s| s.id == id) {
            selected.text = candidate.text.clone();
        }

        Ok(candidate)
    }

    // ── Outline slots ───────────────────────────────────────────────────────

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn check_slot(&self, index: usize) -> Result<(), WorkflowError> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(WorkflowError::UnknownSlot {
                index,
                count: self.slots.len(),
            })
        }
    }

    pub fn begin_outline(&mut self, index: usize) -> Result<Ticket, WorkflowError> {
        self.check_slot(index)?;
        let slot = &mut self.slots[index];
        slot.ticket += 1;
        slot.loading = true;
        Ok(Ticket(slot.ticket))
    }

    /// Writes a result into a slot and clears its loading flag.
    /// A stale ticket leaves the slot untouched and returns false.
    pub fn finish_outline(&mut self, index: usize, ticket: Ticket, text: String) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if ticket.0 != slot.ticket {
            return false;
        }
        slot.text = text;
        slot.loading = false;
        slot.updated_at = Some(Utc::now());
        true
    }
}
