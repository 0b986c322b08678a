use crate::models::{
    analysis::{Pattern, PatternFrequency, PatternKind, TrendDirection, TrendResult},
    attempt::AttemptRecord,
};

use super::aggregator::{mean, population_variance, WEAKNESS_THRESHOLD};

pub const TREND_MIN_SAMPLES: usize = 3;

/// Points the recent half must move by before a trend is reported.
pub const TREND_HYSTERESIS: f64 = 5.0;

pub const INCONSISTENT_VARIANCE: f64 = 400.0;

/// Records must be ordered most recent first.
pub fn analyze_trend(records: &[AttemptRecord]) -> TrendResult {
    analyze_trend_with(records, TREND_MIN_SAMPLES)
}

pub fn analyze_trend_with(records: &[AttemptRecord], min_samples: usize) -> TrendResult {
    let percentages: Vec<f64> = records.iter().map(AttemptRecord::score_pct).collect();

    let direction = if percentages.len() < min_samples.max(2) {
        TrendDirection::Stable
    } else {
        compare_halves(&percentages)
    };

    TrendResult {
        direction,
        patterns: detect_patterns(&percentages, direction),
    }
}

/// Compares the mean of the recent half against the older half.
///
/// `scores[..len / 2]` is the recent half; an odd middle element falls into
/// the older half.
pub fn compare_halves(scores: &[f64]) -> TrendDirection {
    let split = scores.len() / 2;
    let (recent, older) = scores.split_at(split);
    let (Some(recent_mean), Some(older_mean)) = (mean(recent), mean(older)) else {
        return TrendDirection::Stable;
    };

    if recent_mean > older_mean + TREND_HYSTERESIS {
        TrendDirection::Improving
    } else if recent_mean < older_mean - TREND_HYSTERESIS {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

fn detect_patterns(percentages: &[f64], direction: TrendDirection) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    if percentages.is_empty() {
        return patterns;
    }

    let low = percentages
        .iter()
        .filter(|pct| **pct < WEAKNESS_THRESHOLD)
        .count();
    if low * 2 > percentages.len() {
        patterns.push(Pattern {
            kind: PatternKind::ConsistentLowPerformance,
            frequency: PatternFrequency::High,
            description: format!(
                "{} of the last {} attempts scored below {}%",
                low,
                percentages.len(),
                WEAKNESS_THRESHOLD
            ),
        });
    }

    if direction == TrendDirection::Declining {
        patterns.push(Pattern {
            kind: PatternKind::DecliningPerformanceTrend,
            frequency: PatternFrequency::Medium,
            description: "Recent scores are lower than earlier ones".to_string(),
        });
    }

    let variance = population_variance(percentages);
    if variance > INCONSISTENT_VARIANCE {
        patterns.push(Pattern {
            kind: PatternKind::InconsistentPerformance,
            frequency: PatternFrequency::High,
            description: format!("Scores vary widely (variance {:.0})", variance),
        });
    }

    patterns
}
