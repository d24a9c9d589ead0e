use std::fmt::Write;

use crate::models::TestSummary;
use crate::ranking;

const WEAKEST_SUBJECTS_SHOWN: usize = 3;

pub fn build_report(latest: &TestSummary, previous: &TestSummary) -> String {
    let ranked = ranking::rank_weak_subjects(latest);

    let mut output = String::new();

    let _ = writeln!(output, "# Latest Test Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} students in scope)",
        latest.student_id, latest.unique_students
    );

    if !latest.success {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "No test data available: {}",
            latest.error.as_deref().unwrap_or("unknown error")
        );
        return output;
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weakest Subjects");

    let weak: Vec<_> = ranked
        .iter()
        .filter(|subject| subject.total_wrong_questions > 0)
        .take(WEAKEST_SUBJECTS_SHOWN)
        .collect();
    if weak.is_empty() {
        let _ = writeln!(output, "No wrong answers in the latest tests.");
    } else {
        for (rank, subject) in weak.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. **{}** - {} wrong answers (test on {})",
                rank + 1,
                subject.subject,
                subject.total_wrong_questions,
                subject.test_date
            );
            if let Some((topic, count)) = &subject.weakest_topic {
                let _ = writeln!(output, "   - Weakest topic: {} ({} wrong answers)", topic, count);
            }
            if let Some((level, count)) = &subject.weakest_level {
                let _ = writeln!(output, "   - Cognitive level to improve: {} ({})", level, count);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Test by Subject");
    for (subject, sitting) in &latest.subjects {
        let _ = writeln!(
            output,
            "- {} on {}: {} wrong answers",
            subject,
            sitting.latest_test_date,
            sitting.total_wrong_questions()
        );
        for (level, breakdown) in &sitting.level_breakdown {
            let _ = writeln!(
                output,
                "  - {}: {}",
                level, breakdown.total_wrong_questions
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Change Since Previous Test");

    if previous.subjects.is_empty() {
        let _ = writeln!(output, "No subject has an earlier test to compare against.");
    } else {
        for (subject, earlier) in &previous.subjects {
            let Some(current) = latest.subjects.get(subject) else {
                continue;
            };
            let now = current.total_wrong_questions() as i64;
            let before = earlier.total_wrong_questions() as i64;
            let _ = writeln!(
                output,
                "- {}: {} -> {} wrong answers ({:+}) between {} and {}",
                subject,
                before,
                now,
                now - before,
                earlier.latest_test_date,
                current.latest_test_date
            );
        }
    }

    output
}
