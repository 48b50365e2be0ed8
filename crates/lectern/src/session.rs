//! Caller-side text state.
//!
//! An [`ExtractionSession`] holds the text a reader is working with and
//! applies extraction results to it. Only the latest submission may change
//! the text, the change is all-or-nothing, and a failed extraction leaves
//! the previous text in place.

use crate::types::{ExtractionResult, ExtractionStatus};

/// Identifies one submission within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// What [`ExtractionSession::apply`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The text was replaced.
    Replaced,
    /// The extraction failed; the previous text was kept.
    KeptPrevious,
    /// A newer submission exists; the result was dropped.
    Stale,
    /// The result was cancelled; nothing changed.
    Cancelled,
}

#[derive(Debug, Default)]
pub struct ExtractionSession {
    text: String,
    latest: u64,
    processing: bool,
    last_error: Option<String>,
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Detail of the most recent failure or partial extraction, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Register a new submission. Any earlier ticket becomes stale.
    pub fn begin(&mut self) -> Ticket {
        self.latest += 1;
        self.processing = true;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }

    /// Apply the result of the submission identified by `ticket`.
    pub fn apply(&mut self, ticket: Ticket, result: &ExtractionResult) -> Applied {
        if !self.is_current(ticket) {
            tracing::debug!(ticket = ticket.0, latest = self.latest, "Dropping stale extraction result");
            return Applied::Stale;
        }

        self.processing = false;

        match result.status {
            ExtractionStatus::Cancelled => Applied::Cancelled,
            ExtractionStatus::Failed => {
                self.last_error = result.error_detail.clone();
                Applied::KeptPrevious
            }
            ExtractionStatus::Success | ExtractionStatus::Partial => {
                self.text = result.text.clone();
                self.last_error = result.error_detail.clone();
                Applied::Replaced
            }
        }
    }

    /// Replace the text directly, as when the reader types or clears it.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}
