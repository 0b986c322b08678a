use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    analysis::{
        AggregateMetrics, Readiness, TopicBreakdown, TopicTrend, TrendDirection, WeaknessLevel,
    },
    attempt::AttemptRecord,
};

use super::trend::{compare_halves, TREND_MIN_SAMPLES};

/// Neutral placeholder returned when there is no history at all.
pub const EMPTY_AVG_SCORE_PCT: f64 = 75.0;
pub const DEFAULT_TIME_EFFICIENCY: f64 = 0.5;
pub const DEFAULT_CONSISTENCY: f64 = 0.5;

pub const STRENGTH_THRESHOLD: f64 = 80.0;
pub const WEAKNESS_THRESHOLD: f64 = 60.0;

pub fn aggregate(records: &[AttemptRecord]) -> AggregateMetrics {
    let percentages: Vec<f64> = records.iter().map(AttemptRecord::score_pct).collect();

    let topic_scores = group_means(records, |record| record.topic.as_str());
    let difficulty_scores = group_means(records, |record| record.difficulty.as_str());

    let strengths: BTreeSet<String> = topic_scores
        .iter()
        .filter(|(_, pct)| **pct >= STRENGTH_THRESHOLD)
        .map(|(topic, _)| topic.clone())
        .collect();
    let weaknesses: BTreeSet<String> = topic_scores
        .iter()
        .filter(|(_, pct)| **pct < WEAKNESS_THRESHOLD)
        .map(|(topic, _)| topic.clone())
        .collect();

    let variance = population_variance(&percentages);

    AggregateMetrics {
        avg_score_pct: pooled_score_pct(records),
        topic_scores,
        difficulty_scores,
        variance,
        time_efficiency: time_efficiency(records),
        consistency: if records.is_empty() {
            DEFAULT_CONSISTENCY
        } else {
            consistency_score(variance)
        },
        strengths,
        weaknesses,
        total_attempts: records.len(),
        total_time_spent: records.iter().map(|record| record.time_spent).sum(),
    }
}

/// `100 × Σscore / Σtotal_questions`, or the neutral default for no data.
pub fn pooled_score_pct(records: &[AttemptRecord]) -> f64 {
    let total_questions: u64 = records.iter().map(|r| r.total_questions.max(1) as u64).sum();
    if total_questions == 0 {
        return EMPTY_AVG_SCORE_PCT;
    }
    let total_score: u64 = records
        .iter()
        .map(|r| r.score.min(r.total_questions) as u64)
        .sum();
    100.0 * total_score as f64 / total_questions as f64
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean of squared deviations; 0 with fewer than two samples.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let Some(avg) = mean(values) else {
        return 0.0;
    };
    values.iter().map(|value| (value - avg).powi(2)).sum::<f64>() / values.len() as f64
}

/// Mean seconds-per-question over the records that carry timing.
pub fn time_efficiency(records: &[AttemptRecord]) -> f64 {
    let paces: Vec<f64> = records
        .iter()
        .filter(|r| r.time_spent > 0)
        .map(|r| r.time_spent as f64 / r.total_questions.max(1) as f64)
        .collect();
    mean(&paces).map_or(DEFAULT_TIME_EFFICIENCY, efficiency_for_pace)
}

pub fn efficiency_for_pace(seconds_per_question: f64) -> f64 {
    if seconds_per_question < 30.0 {
        0.9
    } else if seconds_per_question < 60.0 {
        0.7
    } else if seconds_per_question < 120.0 {
        0.5
    } else {
        0.3
    }
}

pub fn consistency_score(variance: f64) -> f64 {
    if variance < 100.0 {
        0.9
    } else if variance < 400.0 {
        0.7
    } else if variance < 900.0 {
        0.5
    } else {
        0.3
    }
}

pub fn weakness_level(avg_score: f64) -> WeaknessLevel {
    if avg_score < WEAKNESS_THRESHOLD {
        WeaknessLevel::High
    } else if avg_score < STRENGTH_THRESHOLD {
        WeaknessLevel::Medium
    } else {
        WeaknessLevel::Low
    }
}

/// Per-topic detail, weakest topics first.
pub fn topic_breakdown(records: &[AttemptRecord]) -> Vec<TopicBreakdown> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.topic.as_str())
            .or_default()
            .push(record.score_pct());
    }

    let mut breakdown: Vec<(f64, TopicBreakdown)> = groups
        .into_iter()
        .filter_map(|(topic, scores)| {
            let avg = mean(&scores)?;
            let improvement_trend = if scores.len() < 2 {
                TopicTrend::InsufficientData
            } else if scores.len() < TREND_MIN_SAMPLES {
                TopicTrend::Stable
            } else {
                match compare_halves(&scores) {
                    TrendDirection::Improving => TopicTrend::Improving,
                    TrendDirection::Declining => TopicTrend::Declining,
                    TrendDirection::Stable => TopicTrend::Stable,
                }
            };
            Some((
                avg,
                TopicBreakdown {
                    topic: topic.to_string(),
                    avg_score: avg.round() as u32,
                    weakness_level: weakness_level(avg),
                    improvement_trend,
                    data_points: scores.len(),
                },
            ))
        })
        .collect();

    breakdown.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    breakdown.into_iter().map(|(_, entry)| entry).collect()
}

pub fn progression_readiness(metrics: &AggregateMetrics) -> Readiness {
    let (Some(easy), Some(medium)) = (
        metrics.difficulty_scores.get("easy"),
        metrics.difficulty_scores.get("medium"),
    ) else {
        return Readiness::Low;
    };

    if *easy >= 85.0 && *medium >= 75.0 {
        Readiness::High
    } else if *easy >= 80.0 && *medium >= 70.0 {
        Readiness::Medium
    } else {
        Readiness::Low
    }
}

fn group_means<'a, F>(records: &'a [AttemptRecord], key: F) -> BTreeMap<String, f64>
where
    F: Fn(&'a AttemptRecord) -> &'a str,
{
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record.score_pct());
    }
    groups
        .into_iter()
        .filter_map(|(label, scores)| mean(&scores).map(|avg| (label.to_string(), avg)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::RecordSource;

    fn attempt(topic: &str, difficulty: &str, score: u32, total: u32, time: u64) -> AttemptRecord {
        AttemptRecord {
            user_id: "u1".into(),
            topic: topic.into(),
            difficulty: difficulty.into(),
            score,
            total_questions: total,
            time_spent: time,
            created_at: None,
            source: RecordSource::Performance,
        }
    }

    #[test]
    fn test_empty_input_returns_defaults() {
        let metrics = aggregate(&[]);
        assert_eq!(metrics.avg_score_pct, 75.0);
        assert_eq!(metrics.variance, 0.0);
        assert_eq!(metrics.time_efficiency, 0.5);
        assert_eq!(metrics.consistency, 0.5);
        assert!(metrics.topic_scores.is_empty());
        assert!(metrics.strengths.is_empty());
        assert!(metrics.weaknesses.is_empty());
        assert!(!metrics.has_data());
    }

    #[test]
    fn test_mixed_history_average_is_developing() {
        let records = vec![
            attempt("math", "medium", 9, 10, 0),
            attempt("math", "medium", 8, 10, 0),
            attempt("math", "medium", 2, 10, 0),
        ];
        let metrics = aggregate(&records);

        assert_eq!(metrics.avg_score_pct.round(), 63.0);
        assert!(metrics.weaknesses.is_empty());
        assert!(metrics.strengths.is_empty());
        assert_eq!(metrics.developing_topics(), vec!["math".to_string()]);
    }

    #[test]
    fn test_group_scores_use_mean_of_record_percentages() {
        // 1/2 = 50% and 9/10 = 90%: record mean is 70, pooled would be 83.3
        let records = vec![
            attempt("physics", "hard", 1, 2, 0),
            attempt("physics", "hard", 9, 10, 0),
        ];
        let metrics = aggregate(&records);

        assert!((metrics.topic_scores["physics"] - 70.0).abs() < 1e-9);
        assert!((metrics.difficulty_scores["hard"] - 70.0).abs() < 1e-9);
        assert!((metrics.avg_score_pct - 100.0 * 10.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_every_group_appears_once() {
        let records = vec![
            attempt("math", "easy", 5, 5, 0),
            attempt("history", "hard", 1, 5, 0),
            attempt("math", "hard", 4, 5, 0),
        ];
        let metrics = aggregate(&records);

        assert_eq!(metrics.topic_scores.len(), 2);
        assert_eq!(metrics.difficulty_scores.len(), 2);
        assert!(metrics.strengths.contains("math"));
        assert!(metrics.weaknesses.contains("history"));
    }

    #[test]
    fn test_population_variance() {
        assert_eq!(population_variance(&[50.0]), 0.0);
        assert!((population_variance(&[40.0, 60.0]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_efficiency_steps() {
        assert_eq!(time_efficiency(&[attempt("a", "easy", 1, 10, 200)]), 0.9);
        assert_eq!(time_efficiency(&[attempt("a", "easy", 1, 10, 450)]), 0.7);
        assert_eq!(time_efficiency(&[attempt("a", "easy", 1, 10, 900)]), 0.5);
        assert_eq!(time_efficiency(&[attempt("a", "easy", 1, 10, 1200)]), 0.3);
        assert_eq!(time_efficiency(&[attempt("a", "easy", 1, 10, 0)]), 0.5);
    }

    #[test]
    fn test_time_efficiency_skips_untimed_records() {
        let records = vec![
            attempt("a", "easy", 5, 10, 600),
            attempt("a", "easy", 5, 10, 0),
        ];
        // 60 s/question from the timed record alone
        assert_eq!(time_efficiency(&records), 0.5);
    }

    #[test]
    fn test_time_efficiency_averages_per_record_pace() {
        let records = vec![
            attempt("a", "easy", 5, 10, 100),
            attempt("b", "easy", 1, 2, 200),
        ];
        // 10 and 100 s/question average to 55
        assert_eq!(time_efficiency(&records), 0.7);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let records = vec![
            attempt("math", "easy", 3, 4, 100),
            attempt("art", "medium", 1, 4, 60),
        ];
        assert_eq!(aggregate(&records), aggregate(&records));
    }

    #[test]
    fn test_topic_breakdown_orders_weakest_first() {
        let records = vec![
            attempt("math", "easy", 9, 10, 0),
            attempt("history", "easy", 3, 10, 0),
            attempt("history", "easy", 4, 10, 0),
        ];
        let breakdown = topic_breakdown(&records);

        assert_eq!(breakdown[0].topic, "history");
        assert_eq!(breakdown[0].weakness_level, WeaknessLevel::High);
        assert_eq!(breakdown[0].improvement_trend, TopicTrend::Stable);
        assert_eq!(breakdown[1].improvement_trend, TopicTrend::InsufficientData);
    }

    #[test]
    fn test_progression_readiness_bands() {
        let high = aggregate(&[
            attempt("a", "easy", 9, 10, 0),
            attempt("a", "medium", 8, 10, 0),
        ]);
        assert_eq!(progression_readiness(&high), Readiness::High);

        let medium = aggregate(&[
            attempt("a", "easy", 8, 10, 0),
            attempt("a", "medium", 7, 10, 0),
        ]);
        assert_eq!(progression_readiness(&medium), Readiness::Medium);

        let only_hard = aggregate(&[attempt("a", "hard", 10, 10, 0)]);
        assert_eq!(progression_readiness(&only_hard), Readiness::Low);
    }
}
