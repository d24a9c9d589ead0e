//! Latest and second-latest sitting per subject, and single-level views of
//! the latest sitting.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dataset::StudentDataset;
use crate::error::{AnalyticsError, Result};
use crate::models::{
    format_date, LevelBreakdown, LevelReport, LevelSubjectDetail, QuestionResult, SubjectSummary,
    TestSummary,
};
use crate::stats::wrong_topic_counts;

pub const ALL_STUDENTS: &str = "all_students";

/// Which sitting of each subject to summarize, counting back from the most
/// recent distinct test date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    Latest,
    SecondLatest,
}

impl Recency {
    fn offset(self) -> usize {
        match self {
            Recency::Latest => 0,
            Recency::SecondLatest => 1,
        }
    }
}

pub fn latest_summary(dataset: &StudentDataset, student_id: Option<&str>) -> Result<TestSummary> {
    summarize_sittings(dataset, student_id, Recency::Latest)
}

/// Like [`latest_summary`] but one sitting back. Subjects with a single
/// distinct test date are left out entirely.
pub fn second_latest_summary(
    dataset: &StudentDataset,
    student_id: Option<&str>,
) -> Result<TestSummary> {
    summarize_sittings(dataset, student_id, Recency::SecondLatest)
}

pub fn summarize_sittings(
    dataset: &StudentDataset,
    student_id: Option<&str>,
    recency: Recency,
) -> Result<TestSummary> {
    // A blank id means no student filter.
    let student_id = student_id.filter(|id| !id.trim().is_empty());
    let rows = dataset.load()?;
    let label = student_id.unwrap_or(ALL_STUDENTS);

    match build_summary(rows, student_id, recency) {
        Ok(summary) => Ok(summary),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            warn!(student_id = label, ?recency, error = %err, "test summary unavailable");
            Ok(TestSummary {
                success: false,
                student_id: label.to_string(),
                error: Some(err.to_string()),
                ..Default::default()
            })
        }
    }
}

fn build_summary(
    rows: &[QuestionResult],
    student_id: Option<&str>,
    recency: Recency,
) -> Result<TestSummary> {
    let population: Vec<&QuestionResult> = match student_id {
        Some(id) => rows.iter().filter(|row| row.student_id == id).collect(),
        None => rows.iter().collect(),
    };
    if let Some(id) = student_id {
        if population.is_empty() {
            return Err(AnalyticsError::NotFound(id.to_string()));
        }
    }

    let mut by_subject: BTreeMap<&str, Vec<&QuestionResult>> = BTreeMap::new();
    for row in population.iter().copied() {
        by_subject.entry(row.subject.as_str()).or_default().push(row);
    }

    let mut subjects = BTreeMap::new();
    for (subject, subject_rows) in by_subject {
        let Some(date) = sitting_date(&subject_rows, recency) else {
            debug!(subject, ?recency, "not enough sittings, skipping subject");
            continue;
        };
        let sitting = subject_rows.iter().copied().filter(|row| row.test_date == date);
        subjects.insert(
            subject.to_string(),
            SubjectSummary {
                latest_test_date: format_date(date),
                level_breakdown: level_breakdown(sitting),
            },
        );
    }

    let unique_students: HashSet<&str> =
        population.iter().map(|row| row.student_id.as_str()).collect();

    Ok(TestSummary {
        success: true,
        student_id: student_id.unwrap_or(ALL_STUDENTS).to_string(),
        unique_students: unique_students.len(),
        subjects,
        error: None,
    })
}

/// The distinct test date `recency` steps back from the newest one.
fn sitting_date(rows: &[&QuestionResult], recency: Recency) -> Option<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = rows.iter().map(|row| row.test_date).collect();
    dates.into_iter().rev().nth(recency.offset())
}

/// Wrong answers grouped by level, then topic.
pub fn level_breakdown<'a>(
    rows: impl IntoIterator<Item = &'a QuestionResult>,
) -> BTreeMap<String, LevelBreakdown> {
    let mut by_level: BTreeMap<String, Vec<&QuestionResult>> = BTreeMap::new();
    for row in rows.into_iter().filter(|row| row.is_wrong()) {
        by_level.entry(row.level.clone()).or_default().push(row);
    }

    by_level
        .into_iter()
        .map(|(level, rows)| {
            let wrong_topics = wrong_topic_counts(rows);
            let total_wrong_questions = wrong_topics.values().sum();
            (
                level,
                LevelBreakdown {
                    total_wrong_questions,
                    wrong_topics,
                },
            )
        })
        .collect()
}

/// One cognitive level across the student's latest sitting of every subject.
/// Subjects where the level has no wrong answers are omitted.
pub fn level_analysis(
    dataset: &StudentDataset,
    student_id: &str,
    level: &str,
) -> Result<LevelReport> {
    let latest = latest_summary(dataset, Some(student_id))?;
    if !latest.success {
        return Ok(LevelReport {
            success: false,
            student_id: latest.student_id,
            level: level.to_string(),
            error: latest.error,
            ..Default::default()
        });
    }

    let subjects: BTreeMap<String, LevelSubjectDetail> = latest
        .subjects
        .into_iter()
        .filter_map(|(subject, mut summary)| {
            let breakdown = summary.level_breakdown.remove(level)?;
            Some((
                subject,
                LevelSubjectDetail {
                    latest_test_date: summary.latest_test_date,
                    total_wrong_questions: breakdown.total_wrong_questions,
                    wrong_topics: breakdown.wrong_topics,
                },
            ))
        })
        .collect();
    let total_wrong_questions_in_level = subjects
        .values()
        .map(|detail| detail.total_wrong_questions)
        .sum();

    Ok(LevelReport {
        success: true,
        student_id: latest.student_id,
        level: level.to_string(),
        subjects,
        total_wrong_questions_in_level,
        error: None,
    })
}
