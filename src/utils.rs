//! Helpers for date partitions, storage keys and log output.

use chrono::{Local, NaiveDate};
use tracing::instrument;

/// File name of the published top-N report inside its date partition.
pub const REPORT_FILE_NAME: &str = "weekly_filtered_top20.tsv";

/// Today's date in local time; computed once per run and used for every key.
#[instrument]
pub fn run_date() -> NaiveDate {
    let date = Local::now().date_naive();
    tracing::debug!(%date, "Computed run date");
    date
}

/// Blob key of the raw JSON copy: `articles/original/<date>/<id>.json`.
pub fn original_key(date: NaiveDate, article_id: &str) -> String {
    format!("articles/original/{}/{}.json", date.format("%Y-%m-%d"), article_id)
}

/// Blob key of the report: `articles/processed/<date>/weekly_filtered_top20.tsv`.
pub fn report_key(date: NaiveDate) -> String {
    format!(
        "articles/processed/{}/{}",
        date.format("%Y-%m-%d"),
        REPORT_FILE_NAME
    )
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a character boundary at or below `max` bytes with
/// `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_key() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        assert_eq!(
            original_key(date, "c686397e4a0f4f11683d"),
            "articles/original/2025-05-06/c686397e4a0f4f11683d.json"
        );
    }

    #[test]
    fn test_report_key() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(
            report_key(date),
            "articles/processed/2025-12-01/weekly_filtered_top20.tsv"
        );
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "あ" is three bytes; cutting at 4 must back off to 3.
        let result = truncate_for_log("ああああ", 4);
        assert_eq!(result, "あ…(+9 bytes)");
    }
}
