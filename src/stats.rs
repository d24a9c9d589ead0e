use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::dataset::StudentDataset;
use crate::error::{AnalyticsError, Result};
use crate::models::{
    format_date, position, OverallStats, Performance, QuestionResult, StudentStats, LEVELS,
};

/// Statistics for one student, matched exactly on `student_id`.
///
/// Only a loader failure is returned as `Err`. An unknown student, or any
/// fault while aggregating, comes back as `success == false`.
pub fn student_stats(dataset: &StudentDataset, student_id: &str) -> Result<StudentStats> {
    let rows = dataset.load()?;
    let student_rows: Vec<&QuestionResult> = rows
        .iter()
        .filter(|row| row.student_id == student_id)
        .collect();

    match aggregate(student_id, &student_rows) {
        Ok(stats) => Ok(stats),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            warn!(student_id, error = %err, "student stats unavailable");
            Ok(failed(student_id, err))
        }
    }
}

fn aggregate(student_id: &str, rows: &[&QuestionResult]) -> Result<StudentStats> {
    let first = rows
        .first()
        .ok_or_else(|| AnalyticsError::NotFound(student_id.to_string()))?;

    let mut by_subject: BTreeMap<String, Vec<&QuestionResult>> = BTreeMap::new();
    let mut by_level: BTreeMap<String, Vec<&QuestionResult>> = BTreeMap::new();
    for row in rows.iter().copied() {
        by_subject.entry(row.subject.clone()).or_default().push(row);
        by_level.entry(row.level.clone()).or_default().push(row);
    }

    let subject_performance: BTreeMap<String, Performance> = by_subject
        .into_iter()
        .map(|(subject, rows)| (subject, performance(&rows)))
        .collect();
    let level_performance: BTreeMap<String, Performance> = by_level
        .into_iter()
        .map(|(level, rows)| (level, performance(&rows)))
        .collect();

    let total_questions = rows.len();
    let total_wrong_questions = rows.iter().filter(|row| row.is_wrong()).count();
    let correct_answers = total_questions - total_wrong_questions;

    let overall = OverallStats {
        total_questions,
        correct_answers,
        total_wrong_questions,
        accuracy_percentage: percentage(correct_answers, total_questions),
        avg_time_seconds: average_time(rows),
        subjects_with_errors: with_errors(&subject_performance),
        levels_with_errors: in_level_order(with_errors(&level_performance)),
    };

    let test_dates: BTreeSet<_> = rows.iter().map(|row| row.test_date).collect();

    Ok(StudentStats {
        success: true,
        student_id: student_id.to_string(),
        student_class: first.student_class.clone().unwrap_or_default(),
        student_ability: first.student_ability.clone().unwrap_or_default(),
        overall,
        subject_performance,
        level_performance,
        test_dates: test_dates.into_iter().map(format_date).collect(),
        error: None,
    })
}

fn failed(student_id: &str, err: AnalyticsError) -> StudentStats {
    StudentStats {
        success: false,
        student_id: student_id.to_string(),
        error: Some(err.to_string()),
        ..Default::default()
    }
}

/// Wrong-answer breakdown of `rows`. Topics appear only with at least one
/// wrong answer.
pub(crate) fn performance(rows: &[&QuestionResult]) -> Performance {
    let total_questions = rows.len();
    let wrong_topics = wrong_topic_counts(rows.iter().copied());
    let total_wrong_questions = wrong_topics.values().sum();

    Performance {
        total_questions,
        total_wrong_questions,
        accuracy: percentage(total_questions - total_wrong_questions, total_questions),
        avg_time_seconds: average_time(rows),
        wrong_topics,
    }
}

pub(crate) fn wrong_topic_counts<'a>(
    rows: impl IntoIterator<Item = &'a QuestionResult>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in rows.into_iter().filter(|row| row.is_wrong()) {
        *counts.entry(row.topic.clone()).or_insert(0) += 1;
    }
    counts
}

fn with_errors(performance: &BTreeMap<String, Performance>) -> Vec<String> {
    performance
        .iter()
        .filter(|(_, performance)| performance.total_wrong_questions > 0)
        .map(|(key, _)| key.clone())
        .collect()
}

/// Easiest level first; levels outside `LEVELS` keep their name order at the end.
fn in_level_order(mut levels: Vec<String>) -> Vec<String> {
    levels.sort_by_key(|level| position(&LEVELS, level));
    levels
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn average_time(rows: &[&QuestionResult]) -> Option<f64> {
    let times: Vec<u32> = rows.iter().filter_map(|row| row.time_taken_seconds).collect();
    if times.is_empty() {
        return None;
    }
    Some(times.iter().map(|time| *time as f64).sum::<f64>() / times.len() as f64)
}
