use chrono::NaiveDate;

use crate::models::QuestionResult;

/// A wrong answer in class 12A1 with the given coordinates.
pub(crate) fn sample_row(
    result_id: u64,
    student_id: &str,
    subject: &str,
    date: (i32, u32, u32),
    topic: &str,
    level: &str,
) -> QuestionResult {
    QuestionResult {
        result_id,
        student_id: student_id.to_string(),
        student_class: Some("12A1".to_string()),
        subject: subject.to_string(),
        test_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        test_number: Some(1),
        question_number: Some(result_id as u32),
        topic: topic.to_string(),
        level: level.to_string(),
        is_correct: false,
        time_taken_seconds: Some(60),
        student_ability: Some("khá".to_string()),
    }
}

pub(crate) fn correct_row(
    result_id: u64,
    student_id: &str,
    subject: &str,
    date: (i32, u32, u32),
    topic: &str,
    level: &str,
) -> QuestionResult {
    QuestionResult {
        is_correct: true,
        ..sample_row(result_id, student_id, subject, date, topic, level)
    }
}
