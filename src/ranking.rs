use std::collections::BTreeMap;

use crate::models::{position, topics_for, TestSummary, WeakSubject, LEVELS};

/// Ranks the subjects of a sitting summary from weakest to strongest.
pub fn rank_weak_subjects(summary: &TestSummary) -> Vec<WeakSubject> {
    let mut ranked: Vec<WeakSubject> = summary
        .subjects
        .iter()
        .map(|(subject, sitting)| {
            let mut topics: BTreeMap<&str, usize> = BTreeMap::new();
            let mut levels: BTreeMap<&str, usize> = BTreeMap::new();
            for (level, breakdown) in &sitting.level_breakdown {
                *levels.entry(level.as_str()).or_insert(0) += breakdown.total_wrong_questions;
                for (topic, count) in &breakdown.wrong_topics {
                    *topics.entry(topic.as_str()).or_insert(0) += count;
                }
            }

            let order = topics_for(subject);
            WeakSubject {
                subject: subject.clone(),
                test_date: sitting.latest_test_date.clone(),
                total_wrong_questions: sitting.total_wrong_questions(),
                weakest_topic: heaviest(&topics, |topic| position(order, topic)),
                weakest_level: heaviest(&levels, |level| position(&LEVELS, level)),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_wrong_questions
            .cmp(&a.total_wrong_questions)
            .then_with(|| a.subject.cmp(&b.subject))
    });
    ranked
}

/// Entry with the highest count. Ties go to the lowest `rank`, then name.
fn heaviest(
    counts: &BTreeMap<&str, usize>,
    rank: impl Fn(&str) -> usize,
) -> Option<(String, usize)> {
    counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .min_by(|(a_name, a_count), (b_name, b_count)| {
            b_count
                .cmp(a_count)
                .then_with(|| rank(a_name).cmp(&rank(b_name)))
                .then_with(|| a_name.cmp(b_name))
        })
        .map(|(name, count)| (name.to_string(), *count))
}
