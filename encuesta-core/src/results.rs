//! Results page: load state plus the pure (records, filter) → view pipeline.
//!
//! `Loading → Loaded | LoadError`; a refresh or retry goes back to `Loading`,
//! and changing the filter re-derives the view without reloading.

use serde::Serialize;

use crate::aggregate::{average, filter_by_group, groups_present, Average, GroupFilter, RatingField};
use crate::export::{export_delimited, format_timestamp, ExportOptions};
use crate::models::FeedbackResponse;
use crate::store::StoreError;

pub const LOAD_FAILED_MESSAGE: &str =
    "Hubo un error al cargar las respuestas. Por favor, intenta nuevamente.";

const NO_GROUP: &str = "Sin grupo";
const NO_DATE: &str = "Fecha no disponible";

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Loaded(Vec<FeedbackResponse>),
    LoadError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsPage {
    state: LoadState,
    filter: GroupFilter,
}

impl Default for ResultsPage {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsPage {
    pub fn new() -> Self {
        Self {
            state: LoadState::Loading,
            filter: GroupFilter::All,
        }
    }

    pub fn with_filter(filter: GroupFilter) -> Self {
        Self {
            state: LoadState::Loading,
            filter,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn filter(&self) -> &GroupFilter {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Manual refresh, or retry after an error.
    pub fn refresh(&mut self) {
        self.state = LoadState::Loading;
    }

    pub fn finish_load(&mut self, outcome: Result<Vec<FeedbackResponse>, StoreError>) {
        self.state = match outcome {
            Ok(records) => LoadState::Loaded(records),
            Err(e) => {
                tracing::error!(error = %e, "Error loading responses");
                LoadState::LoadError(LOAD_FAILED_MESSAGE.to_string())
            }
        };
    }

    pub fn set_filter(&mut self, filter: GroupFilter) {
        self.filter = filter;
    }

    /// Derived view; `None` unless the page is `Loaded`.
    pub fn view(&self, options: &ExportOptions) -> Option<ResultsView> {
        match &self.state {
            LoadState::Loaded(records) => Some(ResultsView::build(records, &self.filter, options)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub id: Option<String>,
    pub group: String,
    pub date: String,
    pub presentation_rating: Option<i64>,
    pub proposal_rating: Option<i64>,
    pub comment: Option<String>,
}

impl ResponseView {
    fn from_record(record: &FeedbackResponse, options: &ExportOptions) -> Self {
        Self {
            id: record.id.clone(),
            group: record
                .group_label
                .clone()
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| NO_GROUP.to_string()),
            date: record
                .created_at
                .as_ref()
                .map(|t| format_timestamp(t, options.offset))
                .unwrap_or_else(|| NO_DATE.to_string()),
            presentation_rating: record.presentation_rating,
            proposal_rating: record.proposal_rating,
            comment: record.improvement_comment.clone().filter(|c| !c.is_empty()),
        }
    }
}

/// Everything the dashboard shows for one (records, filter) pair.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub filter: GroupFilter,
    pub total: usize,
    pub groups: Vec<String>,
    pub presentation_average: Average,
    pub presentation_stars: u8,
    pub proposal_average: Average,
    pub proposal_stars: u8,
    pub responses: Vec<ResponseView>,
    #[serde(skip)]
    pub export: String,
}

impl ResultsView {
    /// Groups come from the unfiltered set so the selector keeps every option.
    pub fn build(records: &[FeedbackResponse], filter: &GroupFilter, options: &ExportOptions) -> Self {
        let filtered = filter_by_group(records, filter);
        let presentation_average = average(&filtered, RatingField::Presentation);
        let proposal_average = average(&filtered, RatingField::Proposal);

        Self {
            filter: filter.clone(),
            total: filtered.len(),
            groups: groups_present(records),
            presentation_average,
            presentation_stars: presentation_average.stars(),
            proposal_average,
            proposal_stars: proposal_average.stars(),
            responses: filtered
                .iter()
                .map(|r| ResponseView::from_record(r, options))
                .collect(),
            export: export_delimited(&filtered, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(group: Option<&str>, presentation: i64, proposal: i64) -> FeedbackResponse {
        FeedbackResponse {
            id: Some(format!("{}-{}", presentation, proposal)),
            group_label: group.map(str::to_string),
            presentation_rating: Some(presentation),
            proposal_rating: Some(proposal),
            improvement_comment: None,
            created_at: Some(Utc.with_ymd_and_hms(2025, 11, 17, 10, 0, 0).unwrap()),
        }
    }

    fn sample() -> Vec<FeedbackResponse> {
        vec![
            record(Some("Grupo 1"), 5, 4),
            record(Some("Grupo 2"), 3, 2),
            record(None, 4, 4),
            record(Some("Grupo 1"), 3, 0),
        ]
    }

    #[test]
    fn test_starts_loading_without_view() {
        let page = ResultsPage::new();
        assert!(page.is_loading());
        assert!(page.view(&ExportOptions::default()).is_none());
    }

    #[test]
    fn test_load_error_then_retry() {
        let mut page = ResultsPage::new();
        page.finish_load(Err(StoreError::EmptyInsertResponse));
        assert_eq!(
            page.state(),
            &LoadState::LoadError(LOAD_FAILED_MESSAGE.to_string())
        );
        assert!(page.view(&ExportOptions::default()).is_none());

        page.refresh();
        assert!(page.is_loading());
        page.finish_load(Ok(sample()));
        assert!(matches!(page.state(), LoadState::Loaded(rows) if rows.len() == 4));
    }

    #[test]
    fn test_unfiltered_view() {
        let mut page = ResultsPage::new();
        page.finish_load(Ok(sample()));
        let view = page.view(&ExportOptions::default()).unwrap();

        assert_eq!(view.total, 4);
        assert_eq!(view.groups, vec!["Grupo 1", "Grupo 2"]);
        assert_eq!(view.presentation_average.to_string(), "3.75");
        assert_eq!(view.presentation_stars, 4);
        // the zero proposal rating is left out: (4 + 2 + 4) / 3
        assert_eq!(view.proposal_average.to_string(), "3.33");
        assert_eq!(view.responses[2].group, "Sin grupo");
        assert_eq!(view.responses[0].date, "17/11/2025, 10:00:00");
        assert_eq!(view.export.lines().count(), 5);
    }

    #[test]
    fn test_filter_keeps_loaded_and_narrows_view() {
        let mut page = ResultsPage::new();
        page.finish_load(Ok(sample()));
        page.set_filter(GroupFilter::Group("Grupo 1".to_string()));
        assert!(matches!(page.state(), LoadState::Loaded(_)));

        let view = page.view(&ExportOptions::default()).unwrap();
        assert_eq!(view.total, 2);
        assert_eq!(view.groups.len(), 2, "Selector still lists every group");
        assert_eq!(view.presentation_average.to_string(), "4.00");
        assert_eq!(view.proposal_average.to_string(), "4.00");
        assert_eq!(view.export.lines().count(), 3);
    }

    #[test]
    fn test_view_serializes_for_dashboard() {
        let view = ResultsView::build(&[], &GroupFilter::All, &ExportOptions::default());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["filter"], "all");
        assert_eq!(json["total"], 0);
        assert_eq!(json["presentation_average"], 0);
        assert!(json.get("export").is_none());
        assert!(json["responses"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_date_placeholder() {
        let mut r = record(Some("Grupo 1"), 1, 1);
        r.created_at = None;
        let view = ResultsView::build(&[r], &GroupFilter::All, &ExportOptions::default());
        assert_eq!(view.responses[0].date, "Fecha no disponible");
    }
}
