//! Aggregation over loaded responses: group selector, per-field averages.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::models::FeedbackResponse;
use crate::store::{ResponseStore, StoreError};

/// Selector value meaning "no group filter".
pub const ALL_GROUPS: &str = "all";

/// Load every response in backend order (most recent first). The order is
/// kept as returned.
pub async fn load_all(store: &dyn ResponseStore) -> Result<Vec<FeedbackResponse>, StoreError> {
    match store.select().await {
        Ok(rows) => {
            tracing::info!(backend = store.name(), count = rows.len(), "Loaded responses");
            Ok(rows)
        }
        Err(e) => {
            tracing::error!(backend = store.name(), error = %e, "Failed to load responses");
            Err(e)
        }
    }
}

/// Distinct non-empty group labels, in first-seen order.
pub fn groups_present(records: &[FeedbackResponse]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.group_label.as_deref())
        .filter(|g| !g.is_empty())
        .filter(|g| seen.insert(*g))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupFilter {
    #[default]
    All,
    Group(String),
}

impl GroupFilter {
    /// `None` and `"all"` select everything; anything else is an exact label.
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector {
            None | Some(ALL_GROUPS) => GroupFilter::All,
            Some(group) => GroupFilter::Group(group.to_string()),
        }
    }

    pub fn as_selector(&self) -> &str {
        match self {
            GroupFilter::All => ALL_GROUPS,
            GroupFilter::Group(g) => g,
        }
    }

    pub fn matches(&self, record: &FeedbackResponse) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Group(g) => record.group_label.as_deref() == Some(g.as_str()),
        }
    }
}

impl From<String> for GroupFilter {
    fn from(s: String) -> Self {
        GroupFilter::from_selector(Some(&s))
    }
}

impl From<GroupFilter> for String {
    fn from(f: GroupFilter) -> Self {
        f.as_selector().to_string()
    }
}

/// Case-sensitive exact match on the group label; `All` is the identity.
pub fn filter_by_group(records: &[FeedbackResponse], filter: &GroupFilter) -> Vec<FeedbackResponse> {
    records.iter().filter(|r| filter.matches(r)).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingField {
    Presentation,
    Proposal,
}

impl RatingField {
    pub fn value(self, record: &FeedbackResponse) -> Option<i64> {
        match self {
            RatingField::Presentation => record.presentation_rating,
            RatingField::Proposal => record.proposal_rating,
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            RatingField::Presentation => "¿Qué les pareció?",
            RatingField::Proposal => "Opinión Licitación",
        }
    }
}

/// Mean of the positive ratings of a field, kept in hundredths.
///
/// Displays as `0` when there is nothing to average and with exactly two
/// fractional digits otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Average {
    NoData,
    Value { hundredths: u64 },
}

impl Average {
    /// Whole stars lit on the dashboard, rounding halves up.
    pub fn stars(self) -> u8 {
        match self {
            Average::NoData => 0,
            Average::Value { hundredths } => (hundredths.saturating_add(50) / 100).min(5) as u8,
        }
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Average::NoData => write!(f, "0"),
            Average::Value { hundredths } => {
                write!(f, "{}.{:02}", hundredths / 100, hundredths % 100)
            }
        }
    }
}

// The dashboard has always received a bare 0 or a two-decimal string.
impl Serialize for Average {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Average::NoData => serializer.serialize_u8(0),
            Average::Value { .. } => serializer.collect_str(self),
        }
    }
}

/// Arithmetic mean of `field` over records where it is positive, rounded
/// half-up to two decimals.
///
/// Rows are read as stored, so a value can be arbitrarily large; the sum is
/// kept in `u128` and a mean too large for `u64` hundredths saturates.
pub fn average(records: &[FeedbackResponse], field: RatingField) -> Average {
    let (sum, count) = records
        .iter()
        .filter_map(|r| field.value(r))
        .filter(|v| *v > 0)
        .fold((0u128, 0u128), |(sum, count), v| (sum + v as u128, count + 1));

    if count == 0 {
        return Average::NoData;
    }

    let hundredths = (sum * 200 + count) / (2 * count);
    Average::Value {
        hundredths: u64::try_from(hundredths).unwrap_or(u64::MAX),
    }
}
