//! Global error slice: server and network failures visible to every view.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Failure;

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub id: Uuid,
    pub status: Option<u16>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<&Failure> for ErrorEntry {
    fn from(value: &Failure) -> Self {
        Self {
            id: value.id,
            status: value.status,
            message: value.message.clone(),
            occurred_at: value.occurred_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorState {
    pub entries: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorAction {
    Record(ErrorEntry),
    Dismiss(Uuid),
    Clear,
}

pub fn reduce(mut state: ErrorState, action: ErrorAction) -> ErrorState {
    match action {
        ErrorAction::Record(entry) => {
            // A failure is recorded once even if its action is reduced again.
            if !state.entries.iter().any(|existing| existing.id == entry.id) {
                state.entries.push(entry);
            }
        }
        ErrorAction::Dismiss(id) => state.entries.retain(|entry| entry.id != id),
        ErrorAction::Clear => state.entries.clear(),
    }
    state
}

pub mod selectors {
    use super::ErrorEntry;
    use crate::store::AppState;

    pub fn get_errors(state: &AppState) -> &[ErrorEntry] {
        &state.errors.entries
    }

    pub fn get_latest_error(state: &AppState) -> Option<&ErrorEntry> {
        state.errors.entries.last()
    }
}
