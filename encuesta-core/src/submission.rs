//! Submission component: validates one vote and persists it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{FeedbackResponse, NewFeedbackResponse, Rating};
use crate::store::{ResponseStore, StoreError};

/// Shown for any persistence failure; backend detail stays in the logs.
pub const SUBMIT_FAILED_MESSAGE: &str =
    "Hubo un error al enviar tu respuesta. Por favor, intenta nuevamente.";

/// Raw form values. A rating of 0 means the respondent never picked a star.
///
/// Deserialization never rejects a field: `null`, a wrong type or an
/// out-of-range number all arrive as "unset" or as a value `validate`
/// refuses, so the caller always gets a `ValidationError` in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionInput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub group: String,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub presentation_rating: i64,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub proposal_rating: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub comment: String,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

// Fractions and numbers beyond i64 collapse to 0 (unset); other integers are
// kept so range checking happens in `validate`.
fn lenient_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        _ => 0,
    })
}

fn rating(value: i64) -> Option<Rating> {
    u8::try_from(value).ok().and_then(Rating::new)
}

/// User-correctable problems, reported in this priority order.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("group is required")]
    MissingGroup,

    #[error("presentation rating must be between 1 and 5")]
    MissingPresentationRating,

    #[error("proposal rating must be between 1 and 5")]
    MissingProposalRating,
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::MissingGroup => "Por favor, indica tu grupo",
            ValidationError::MissingPresentationRating => "Por favor, califica la presentación",
            ValidationError::MissingProposalRating => {
                "Por favor, califica la propuesta de licitación"
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingGroup => "missing_group",
            ValidationError::MissingPresentationRating => "missing_presentation_rating",
            ValidationError::MissingProposalRating => "missing_proposal_rating",
        }
    }
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

impl SubmitError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmitError::Validation(e) => e.user_message(),
            SubmitError::Persistence(_) => SUBMIT_FAILED_MESSAGE,
        }
    }
}

/// Check `input` and build the row to insert. Group first, then the
/// presentation rating, then the proposal rating; the comment is only
/// normalized.
pub fn validate(
    input: &SubmissionInput,
    now: DateTime<Utc>,
) -> Result<NewFeedbackResponse, ValidationError> {
    let group = input.group.trim();
    if group.is_empty() {
        return Err(ValidationError::MissingGroup);
    }

    let presentation_rating =
        rating(input.presentation_rating).ok_or(ValidationError::MissingPresentationRating)?;
    let proposal_rating =
        rating(input.proposal_rating).ok_or(ValidationError::MissingProposalRating)?;

    let comment = input.comment.trim();
    let improvement_comment = (!comment.is_empty()).then(|| comment.to_string());

    Ok(NewFeedbackResponse {
        group_label: group.to_string(),
        presentation_rating,
        proposal_rating,
        improvement_comment,
        created_at: now,
    })
}

/// Validates and persists votes against a response store.
#[derive(Clone)]
pub struct Submitter {
    store: Arc<dyn ResponseStore>,
}

impl Submitter {
    pub fn new(store: Arc<dyn ResponseStore>) -> Self {
        Self { store }
    }

    pub async fn submit(&self, input: SubmissionInput) -> Result<FeedbackResponse, SubmitError> {
        self.submit_at(input, Utc::now()).await
    }

    /// One insert attempt per call; nothing reaches the store unless
    /// validation passes.
    pub async fn submit_at(
        &self,
        input: SubmissionInput,
        now: DateTime<Utc>,
    ) -> Result<FeedbackResponse, SubmitError> {
        let new_response = match validate(&input, now) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(reason = e.code(), "Rejected submission");
                return Err(e.into());
            }
        };

        match self.store.insert(&new_response).await {
            Ok(stored) => {
                tracing::info!(
                    backend = self.store.name(),
                    group = %new_response.group_label,
                    "Submission stored"
                );
                Ok(stored)
            }
            Err(e) => {
                tracing::error!(backend = self.store.name(), error = %e, "Submission failed");
                Err(e.into())
            }
        }
    }
}
