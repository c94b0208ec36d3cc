//! Summary statistics over a finished batch.
//!
//! All score statistics use successful results only. With no successes every
//! score field is 0.0; nothing here can divide by zero.

use serde::{Deserialize, Serialize};

use crate::types::EvaluationResult;

/// Immutable snapshot of batch statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_samples: usize,
    pub successful_evaluations: usize,
    pub success_rate: f64,
    pub average_score: f64,
    pub median_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Sample standard deviation (n - 1); 0.0 below two scores
    pub std_dev: f64,
}

/// Compute [`Metrics`] for a result sequence.
pub fn aggregate(results: &[EvaluationResult]) -> Metrics {
    let scores = successful_scores(results);
    let total_samples = results.len();

    if scores.is_empty() {
        return Metrics {
            total_samples,
            ..Metrics::default()
        };
    }

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let std_dev = if scores.len() > 1 {
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    Metrics {
        total_samples,
        successful_evaluations: scores.len(),
        success_rate: scores.len() as f64 / total_samples as f64,
        average_score: mean,
        median_score: median(&scores),
        min_score: scores[0],
        max_score: scores[scores.len() - 1],
        std_dev,
    }
}

/// Counts of successful scores per quality band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBands {
    /// score >= 0.8
    pub excellent: usize,
    /// 0.6 <= score < 0.8
    pub good: usize,
    /// score < 0.6
    pub poor: usize,
}

impl ScoreBands {
    pub fn from_results(results: &[EvaluationResult]) -> Self {
        results
            .iter()
            .filter_map(EvaluationResult::successful_score)
            .fold(Self::default(), |mut bands, score| {
                if score >= 0.8 {
                    bands.excellent += 1;
                } else if score >= 0.6 {
                    bands.good += 1;
                } else {
                    bands.poor += 1;
                }
                bands
            })
    }
}

/// Linearly interpolated percentile (`p` in 0..=100) of successful scores.
pub fn percentile(results: &[EvaluationResult], p: f64) -> f64 {
    let scores = successful_scores(results);
    if scores.is_empty() {
        return 0.0;
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (scores.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    scores[lower] + (scores[upper] - scores[lower]) * weight
}

/// Successful scores, sorted ascending.
fn successful_scores(results: &[EvaluationResult]) -> Vec<f64> {
    let mut scores: Vec<f64> = results
        .iter()
        .filter_map(EvaluationResult::successful_score)
        .collect();
    scores.sort_by(f64::total_cmp);
    scores
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sample, TaskType};
    use proptest::prelude::*;

    fn ok(score: f64) -> EvaluationResult {
        EvaluationResult::scored(
            0,
            &Sample::without_reference("x"),
            TaskType::GrammarCorrection,
            "y".to_string(),
            score,
        )
    }

    fn failed() -> EvaluationResult {
        EvaluationResult::failed(
            0,
            &Sample::without_reference("x"),
            TaskType::GrammarCorrection,
            None,
            "Failed to get score",
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_results_all_zero() {
        let metrics = aggregate(&[]);
        assert_eq!(metrics, Metrics::default());
        assert_eq!(metrics.success_rate, 0.0);
    }

    #[test]
    fn test_all_failed_degrades_to_zero() {
        let metrics = aggregate(&[failed(), failed()]);
        assert_eq!(metrics.total_samples, 2);
        assert_eq!(metrics.successful_evaluations, 0);
        assert_eq!(metrics.average_score, 0.0);
        assert_eq!(metrics.std_dev, 0.0);
    }

    #[test]
    fn test_statistics() {
        let results = vec![ok(1.0), ok(0.5), failed(), ok(0.9), ok(0.6)];
        let metrics = aggregate(&results);

        assert_eq!(metrics.total_samples, 5);
        assert_eq!(metrics.successful_evaluations, 4);
        assert!(close(metrics.success_rate, 0.8));
        assert!(close(metrics.average_score, 0.75));
        assert!(close(metrics.median_score, 0.75));
        assert!(close(metrics.min_score, 0.5));
        assert!(close(metrics.max_score, 1.0));
        // deviations: .25 -.25 .15 -.15 -> sum sq = .17, / 3
        assert!(close(metrics.std_dev, (0.17_f64 / 3.0).sqrt()));
    }

    #[test]
    fn test_single_score_has_zero_std_dev() {
        let metrics = aggregate(&[ok(0.7)]);
        assert_eq!(metrics.std_dev, 0.0);
        assert!(close(metrics.median_score, 0.7));
    }

    #[test]
    fn test_score_bands() {
        let bands = ScoreBands::from_results(&[ok(0.95), ok(0.8), ok(0.7), ok(0.2), failed()]);
        assert_eq!(
            bands,
            ScoreBands {
                excellent: 2,
                good: 1,
                poor: 1
            }
        );
    }

    #[test]
    fn test_percentile_interpolates() {
        let results = vec![ok(0.0), ok(0.5), ok(1.0)];
        assert!(close(percentile(&results, 50.0), 0.5));
        assert!(close(percentile(&results, 25.0), 0.25));
        assert!(close(percentile(&results, 100.0), 1.0));
        assert_eq!(percentile(&[failed()], 90.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_metrics_within_bounds(scores in proptest::collection::vec(0.0f64..=1.0, 0..40), failures in 0usize..5) {
            let mut results: Vec<_> = scores.iter().map(|s| ok(*s)).collect();
            results.extend((0..failures).map(|_| failed()));
            let metrics = aggregate(&results);

            prop_assert_eq!(metrics.total_samples, scores.len() + failures);
            prop_assert!(metrics.success_rate >= 0.0 && metrics.success_rate <= 1.0);
            prop_assert!(metrics.min_score <= metrics.median_score + 1e-12);
            prop_assert!(metrics.median_score <= metrics.max_score + 1e-12);
            prop_assert!(metrics.average_score >= 0.0 && metrics.average_score <= 1.0 + 1e-12);
        }
    }
}
