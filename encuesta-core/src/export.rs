//! CSV export of the (filtered) response list.
//!
//! Layout: one header row, one row per response, every cell wrapped in double
//! quotes, cells separated by `,` and rows by `\n`. Dates use the es-ES
//! locale rendering shown on the dashboard (`d/M/yyyy, H:mm:ss`).

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Deserialize;

use crate::aggregate::RatingField;
use crate::config::ExportConfig;
use crate::models::FeedbackResponse;

pub const EXPORT_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

pub const EXPORT_HEADERS: [&str; 5] = [
    "Grupo",
    "¿Qué les pareció?",
    "Opinión Licitación",
    "¿Qué mejorar?",
    "Fecha",
];

const LOCALE_TIMESTAMP: &str = "%-d/%-m/%Y, %-H:%M:%S";

/// How quotes inside a cell are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// Cell text is wrapped as-is; an embedded `"` ends up unbalanced.
    #[default]
    Verbatim,
    /// Embedded `"` are doubled.
    Escaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub offset: FixedOffset,
    pub quote_style: QuoteStyle,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            offset: utc(),
            quote_style: QuoteStyle::Verbatim,
        }
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(
                minutes = config.utc_offset_minutes,
                "Invalid export.utc_offset_minutes, rendering dates in UTC"
            );
            utc()
        });
        Self {
            offset,
            quote_style: config.quote_style,
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Locale rendering of a timestamp, e.g. `17/11/2025, 15:05:09`.
pub fn format_timestamp(created_at: &DateTime<Utc>, offset: FixedOffset) -> String {
    created_at
        .with_timezone(&offset)
        .format(LOCALE_TIMESTAMP)
        .to_string()
}

fn quote(cell: &str, style: QuoteStyle) -> String {
    match style {
        QuoteStyle::Verbatim => format!("\"{}\"", cell),
        QuoteStyle::Escaped => format!("\"{}\"", cell.replace('"', "\"\"")),
    }
}

fn row_cells(record: &FeedbackResponse, options: &ExportOptions) -> [String; 5] {
    let rating = |field: RatingField| field.value(record).map(|v| v.to_string()).unwrap_or_default();
    [
        record.group_label.clone().unwrap_or_default(),
        rating(RatingField::Presentation),
        rating(RatingField::Proposal),
        record.improvement_comment.clone().unwrap_or_default(),
        record
            .created_at
            .as_ref()
            .map(|t| format_timestamp(t, options.offset))
            .unwrap_or_default(),
    ]
}

/// Render `records` in the order given.
pub fn export_delimited(records: &[FeedbackResponse], options: &ExportOptions) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(EXPORT_HEADERS.join(","));

    for record in records {
        let cells: Vec<String> = row_cells(record, options)
            .iter()
            .map(|cell| quote(cell, options.quote_style))
            .collect();
        lines.push(cells.join(","));
    }

    lines.join("\n")
}

/// `respuestas_<YYYY-MM-DD>.csv` for the given UTC date.
pub fn export_filename(today: NaiveDate) -> String {
    format!("respuestas_{}.csv", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(
        group: Option<&str>,
        presentation: Option<i64>,
        proposal: Option<i64>,
        comment: Option<&str>,
        created_at: Option<DateTime<Utc>>,
    ) -> FeedbackResponse {
        FeedbackResponse {
            id: None,
            group_label: group.map(str::to_string),
            presentation_rating: presentation,
            proposal_rating: proposal,
            improvement_comment: comment.map(str::to_string),
            created_at,
        }
    }

    fn at(h: u32, m: u32, s: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 11, 7, h, m, s).unwrap())
    }

    #[test]
    fn test_header_only_for_empty_list() {
        let csv = export_delimited(&[], &ExportOptions::default());
        assert_eq!(csv, "Grupo,¿Qué les pareció?,Opinión Licitación,¿Qué mejorar?,Fecha");
    }

    #[test]
    fn test_rows_are_quoted_in_given_order() {
        let records = vec![
            record(Some("Grupo 2"), Some(5), Some(4), Some("Nada"), at(9, 5, 3)),
            record(Some("Grupo 1"), Some(3), Some(2), None, at(8, 0, 0)),
        ];
        let csv = export_delimited(&records, &ExportOptions::default());
        let lines: Vec<&str> = csv.split('\n').collect();

        assert_eq!(lines.len(), records.len() + 1);
        assert_eq!(lines[1], r#""Grupo 2","5","4","Nada","7/11/2025, 9:05:03""#);
        assert_eq!(lines[2], r#""Grupo 1","3","2","","7/11/2025, 8:00:00""#);

        for line in &lines[1..] {
            assert!(line.starts_with('"') && line.ends_with('"'));
            // the locale date itself contains ", " so split on the quoted separator
            assert_eq!(line.split("\",\"").count(), 5);
        }
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let records = vec![record(None, None, Some(0), None, None)];
        let csv = export_delimited(&records, &ExportOptions::default());
        assert_eq!(csv.lines().nth(1), Some(r#""","","0","","""#));
    }

    #[test]
    fn test_dates_use_configured_offset() {
        let options = ExportOptions::from(&ExportConfig {
            utc_offset_minutes: 60,
            quote_style: QuoteStyle::Verbatim,
        });
        let ts = Utc.with_ymd_and_hms(2025, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(format_timestamp(&ts, options.offset), "1/1/2026, 0:30:00");
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let options = ExportOptions::from(&ExportConfig {
            utc_offset_minutes: 100_000,
            quote_style: QuoteStyle::Verbatim,
        });
        assert_eq!(options.offset, utc());
    }

    #[test]
    fn test_embedded_quotes_verbatim_vs_escaped() {
        let records = vec![record(Some("G"), Some(1), Some(1), Some(r#"dijo "hola""#), None)];

        let verbatim = export_delimited(&records, &ExportOptions::default());
        assert!(verbatim.ends_with(r#","dijo "hola"","""#));

        let escaped = export_delimited(
            &records,
            &ExportOptions {
                quote_style: QuoteStyle::Escaped,
                ..ExportOptions::default()
            },
        );
        assert!(escaped.ends_with(r#","dijo ""hola""","""#));
    }

    #[test]
    fn test_filename_uses_iso_date() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 17).unwrap();
        assert_eq!(export_filename(day), "respuestas_2025-11-17.csv");
    }
}
