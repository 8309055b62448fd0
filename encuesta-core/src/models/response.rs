use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::Rating;

/// One row of the `voting_responses` table as read back from the backend.
///
/// Every field is optional on the read side: rows written by other tools may
/// lack a group or carry a zero rating, and aggregation decides what to do
/// with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeedbackResponse {
    #[serde(default, deserialize_with = "opaque_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "grupo", default)]
    pub group_label: Option<String>,
    #[serde(rename = "que_les_parecio", default)]
    pub presentation_rating: Option<i64>,
    #[serde(rename = "opinion_licitacion", default)]
    pub proposal_rating: Option<i64>,
    #[serde(rename = "que_mejorar", default)]
    pub improvement_comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A validated submission, ready for `ResponseStore::insert`. It has no `id`;
/// the backend assigns one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFeedbackResponse {
    #[serde(rename = "grupo")]
    pub group_label: String,
    #[serde(rename = "que_les_parecio")]
    pub presentation_rating: Rating,
    #[serde(rename = "opinion_licitacion")]
    pub proposal_rating: Rating,
    #[serde(rename = "que_mejorar", skip_serializing_if = "Option::is_none")]
    pub improvement_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewFeedbackResponse {
    /// The row as it looks once stored under `id`.
    pub fn into_stored(self, id: String) -> FeedbackResponse {
        FeedbackResponse {
            id: Some(id),
            group_label: Some(self.group_label),
            presentation_rating: Some(i64::from(self.presentation_rating.get())),
            proposal_rating: Some(i64::from(self.proposal_rating.get())),
            improvement_comment: self.improvement_comment,
            created_at: Some(self.created_at),
        }
    }
}

// Backends hand out either uuid strings or bigint keys.
fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unsupported id value: {}",
            other
        ))),
    }
}
