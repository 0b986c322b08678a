use std::collections::BTreeMap;

use crate::models::{
    analysis::{AggregateMetrics, Readiness, TrendDirection},
    attempt::{AttemptRecord, Difficulty},
    prediction::{DifficultyOutlook, OverallPrediction, PerformancePrediction, TopicPrediction},
};

use super::aggregator::{self, mean, EMPTY_AVG_SCORE_PCT};
use super::trend::analyze_trend;

/// Only the most recent attempts feed the overall forecast.
pub const PREDICTION_WINDOW: usize = 10;

const MASTERY_THRESHOLD: f64 = 75.0;

/// Statistical forecast. Records must be ordered most recent first.
pub fn predict_performance(
    user_id: &str,
    records: &[AttemptRecord],
    time_horizon_days: u32,
) -> PerformancePrediction {
    let metrics = aggregator::aggregate(records);

    PerformancePrediction {
        user_id: user_id.to_string(),
        overall: predict_overall(records, time_horizon_days),
        topics: predict_topics(records),
        difficulty: difficulty_outlook(&metrics),
    }
}

pub fn predict_overall(records: &[AttemptRecord], time_horizon_days: u32) -> OverallPrediction {
    let recent = &records[..records.len().min(PREDICTION_WINDOW)];
    let scores: Vec<f64> = recent.iter().map(AttemptRecord::score_pct).collect();

    let Some(current) = mean(&scores) else {
        return OverallPrediction {
            current_avg_score: EMPTY_AVG_SCORE_PCT as u32,
            predicted_score: (EMPTY_AVG_SCORE_PCT + 5.0) as u32,
            improvement: 5,
            trend: TrendDirection::Stable,
            confidence: 0.5,
            success_probability: 0.8,
            time_horizon_days,
        };
    };

    let n = scores.len() as f64;
    let trend = analyze_trend(recent).direction;
    let improvement = match trend {
        TrendDirection::Improving => (2.0 * n).min(15.0),
        TrendDirection::Declining => -n.min(10.0),
        TrendDirection::Stable => 5.0,
    };

    OverallPrediction {
        current_avg_score: current.round() as u32,
        predicted_score: (current + improvement).clamp(0.0, 100.0).round() as u32,
        improvement: improvement.round() as i32,
        trend,
        confidence: 0.7,
        success_probability: if improvement > 0.0 { 0.8 } else { 0.6 },
        time_horizon_days,
    }
}

/// Per-topic forecasts for topics with at least two data points.
pub fn predict_topics(records: &[AttemptRecord]) -> Vec<TopicPrediction> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.topic.as_str())
            .or_default()
            .push(record.score_pct());
    }

    groups
        .into_iter()
        .filter(|(_, scores)| scores.len() >= 2)
        .filter_map(|(topic, scores)| {
            let current = mean(&scores)?;
            let n = scores.len() as f64;
            let newest = scores.first()?;
            let oldest = scores.last()?;

            let (trend, improvement) = if newest > oldest {
                (TrendDirection::Improving, (1.5 * n).min(10.0))
            } else {
                (TrendDirection::Declining, -(0.5 * n).min(5.0))
            };

            Some(TopicPrediction {
                topic: topic.to_string(),
                current_score: current.round() as u32,
                predicted_score: (current + improvement).clamp(0.0, 100.0).round() as u32,
                improvement: improvement.round() as i32,
                trend,
                data_points: scores.len(),
            })
        })
        .collect()
}

pub fn difficulty_outlook(metrics: &AggregateMetrics) -> DifficultyOutlook {
    let readiness = aggregator::progression_readiness(metrics);
    let mastered = |level: Difficulty| {
        metrics
            .difficulty_scores
            .get(level.as_str())
            .is_some_and(|pct| *pct >= MASTERY_THRESHOLD)
    };

    let current_difficulty = if mastered(Difficulty::Hard) {
        Difficulty::Hard
    } else if readiness != Readiness::Low || mastered(Difficulty::Medium) {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    };

    DifficultyOutlook {
        current_difficulty,
        next_difficulty: current_difficulty.next(),
        readiness,
    }
}
