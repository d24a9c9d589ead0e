use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::dataset::StudentDataset;
use crate::error::{AnalyticsError, Result};
use crate::models::{format_date, DateRange, QuestionResult, SearchOutput, SearchSummary};

/// Filters for [`search`]. Text filters are case-insensitive substring
/// matches so partial ids and class labels still hit.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub student_id: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub subject: Option<String>,
    pub student_class: Option<String>,
    pub limit: Option<usize>,
}

impl SearchCriteria {
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if to < from {
                return Err(AnalyticsError::InvalidRange {
                    from: format_date(from),
                    to: format_date(to),
                });
            }
        }
        Ok(())
    }

    pub fn matches(&self, row: &QuestionResult) -> bool {
        if let Some(needle) = non_blank(&self.student_id) {
            if !contains_ignore_case(&row.student_id, needle) {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if row.test_date < from {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if row.test_date > to {
                return false;
            }
        }
        if let Some(needle) = non_blank(&self.subject) {
            if !contains_ignore_case(&row.subject, needle) {
                return false;
            }
        }
        if let Some(needle) = non_blank(&self.student_class) {
            match row.student_class.as_deref() {
                Some(class) if contains_ignore_case(class, needle) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Parses a `YYYY-MM-DD` argument coming from a tool call or the CLI.
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AnalyticsError::InvalidDate(raw.to_string()))
}

pub fn search(dataset: &StudentDataset, criteria: &SearchCriteria) -> Result<SearchOutput> {
    criteria.validate()?;
    let rows = dataset.load()?;

    let mut results: Vec<QuestionResult> = rows
        .iter()
        .filter(|row| criteria.matches(row))
        .cloned()
        .collect();

    if let Some(limit) = criteria.limit.filter(|limit| *limit > 0) {
        results.truncate(limit);
    }

    let summary = summarize(&results);
    debug!(
        total = summary.total_results,
        students = summary.unique_students,
        "student search finished"
    );

    Ok(SearchOutput {
        success: true,
        summary,
        results,
        error: None,
    })
}

pub fn summarize(results: &[QuestionResult]) -> SearchSummary {
    let students: HashSet<&str> = results.iter().map(|row| row.student_id.as_str()).collect();

    let mut subjects: Vec<String> = Vec::new();
    for row in results {
        if !subjects.iter().any(|subject| subject == &row.subject) {
            subjects.push(row.subject.clone());
        }
    }

    let date_range = DateRange {
        from: results.iter().map(|row| row.test_date).min().map(format_date),
        to: results.iter().map(|row| row.test_date).max().map(format_date),
    };

    SearchSummary {
        total_results: results.len(),
        unique_students: students.len(),
        date_range,
        subjects,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_row;

    fn dataset() -> StudentDataset {
        let mut other_class = sample_row(4, "20250002", "Lý", (2025, 6, 20), "Quang học", "Thông hiểu");
        other_class.student_class = Some("12B3".to_string());
        let mut no_class = sample_row(5, "20250003", "Anh", (2025, 7, 2), "Nghe", "Nhận biết");
        no_class.student_class = None;

        StudentDataset::from_records(vec![
            sample_row(1, "20250001", "Toán", (2025, 7, 1), "Hàm số", "Nhận biết"),
            sample_row(2, "20250001", "Toán", (2025, 7, 8), "Logarit", "Vận dụng cao"),
            sample_row(3, "20250001", "Hóa", (2025, 7, 3), "Polymer", "Thông hiểu"),
            other_class,
            no_class,
        ])
    }

    #[test]
    fn student_id_is_a_partial_match() {
        let output = search(
            &dataset(),
            &SearchCriteria {
                student_id: Some("0001".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(output.success);
        assert_eq!(output.summary.total_results, 3);
        assert_eq!(output.summary.unique_students, 1);
        assert_eq!(output.summary.subjects, vec!["Toán", "Hóa"]);
        assert_eq!(output.summary.date_range.from.as_deref(), Some("2025-07-01"));
        assert_eq!(output.summary.date_range.to.as_deref(), Some("2025-07-08"));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let output = search(
            &dataset(),
            &SearchCriteria {
                from_date: Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
                to_date: Some(NaiveDate::from_ymd_opt(2025, 7, 3).unwrap()),
                ..Default::default()
            },
        )
        .unwrap();

        let ids: Vec<u64> = output.results.iter().map(|row| row.result_id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn subject_and_class_ignore_case() {
        let output = search(
            &dataset(),
            &SearchCriteria {
                subject: Some("lý".to_string()),
                student_class: Some("b3".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(output.summary.total_results, 1);
        assert_eq!(output.results[0].result_id, 4);
    }

    #[test]
    fn rows_without_class_never_match_class_filter() {
        let output = search(
            &dataset(),
            &SearchCriteria {
                student_id: Some("20250003".to_string()),
                student_class: Some("12".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(output.summary.total_results, 0);
    }

    #[test]
    fn limit_applies_after_filtering() {
        let output = search(
            &dataset(),
            &SearchCriteria {
                student_id: Some("20250001".to_string()),
                limit: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        let ids: Vec<u64> = output.results.iter().map(|row| row.result_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(output.summary.total_results, 2);
        assert_eq!(output.summary.subjects, vec!["Toán"]);
    }

    #[test]
    fn empty_result_has_null_date_range() {
        let output = search(
            &dataset(),
            &SearchCriteria {
                student_id: Some("nobody".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(output.success);
        assert_eq!(output.summary.date_range, DateRange::default());
        assert!(output.summary.subjects.is_empty());
    }

    #[test]
    fn inverted_range_is_rejected_before_loading() {
        // An unloadable dataset proves no scan happened.
        let unloadable = StudentDataset::new("/missing/results.csv");
        let criteria = SearchCriteria {
            from_date: Some(NaiveDate::from_ymd_opt(2025, 7, 8).unwrap()),
            to_date: Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
            ..Default::default()
        };

        let err = search(&unloadable, &criteria).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidRange { .. }));
        assert!(!unloadable.is_loaded());
    }

    #[test]
    fn parse_date_arg_rejects_other_formats() {
        assert!(parse_date_arg("2025-07-01").is_ok());
        assert!(matches!(
            parse_date_arg("01/07/2025"),
            Err(AnalyticsError::InvalidDate(_))
        ));
    }
}
