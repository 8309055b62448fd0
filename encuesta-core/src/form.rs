//! Vote form state.
//!
//! The form is a plain value: callers feed it user edits and the outcome of
//! the submission, and read back what to show. The submit control is
//! disabled while a submission is in flight, so a second submit is refused
//! rather than queued.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::FeedbackResponse;
use crate::submission::{validate, SubmissionInput, SubmitError, ValidationError};

/// How long the thank-you state stays up before the form resets, unless
/// `form.confirmation_seconds` says otherwise.
pub const CONFIRMATION_DISPLAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FormStatus {
    Editing,
    Submitting,
    Submitted,
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("a submission is already in progress")]
    AlreadySubmitting,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteForm {
    input: SubmissionInput,
    status: FormStatus,
}

impl Default for VoteForm {
    fn default() -> Self {
        Self::new()
    }
}

impl VoteForm {
    pub fn new() -> Self {
        Self {
            input: SubmissionInput::default(),
            status: FormStatus::Editing,
        }
    }

    pub fn input(&self) -> &SubmissionInput {
        &self.input
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn set_group(&mut self, group: impl Into<String>) {
        self.input.group = group.into();
    }

    pub fn set_presentation_rating(&mut self, rating: u8) {
        self.input.presentation_rating = i64::from(rating);
    }

    pub fn set_proposal_rating(&mut self, rating: u8) {
        self.input.proposal_rating = i64::from(rating);
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.input.comment = comment.into();
    }

    /// Mirrors the enabled state of the submit button.
    pub fn can_submit(&self) -> bool {
        self.status != FormStatus::Submitting
            && self.input.presentation_rating > 0
            && self.input.proposal_rating > 0
    }

    /// Validate locally and move to `Submitting`. On a validation failure the
    /// form shows the message and nothing is handed out for sending.
    pub fn begin_submit(&mut self, now: DateTime<Utc>) -> Result<SubmissionInput, FormError> {
        if self.status == FormStatus::Submitting {
            return Err(FormError::AlreadySubmitting);
        }

        if let Err(e) = validate(&self.input, now) {
            self.status = FormStatus::Failed(e.user_message().to_string());
            return Err(e.into());
        }

        self.status = FormStatus::Submitting;
        Ok(self.input.clone())
    }

    /// Record the outcome. Fields are kept on failure so the respondent can
    /// send again.
    pub fn finish_submit(&mut self, outcome: &Result<FeedbackResponse, SubmitError>) {
        self.status = match outcome {
            Ok(_) => FormStatus::Submitted,
            Err(e) => FormStatus::Failed(e.user_message().to_string()),
        };
    }

    /// Clear every field once the confirmation has been shown.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
