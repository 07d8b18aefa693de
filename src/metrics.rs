use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data::PotencyClass;
use crate::errors::PipelineError;

/// Summary statistics of one numeric column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1); NaN for a single value.
    pub std: f64,
    /// Smallest value.
    pub min: f64,
    /// First quartile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q75: f64,
    /// Largest value.
    pub max: f64,
}

/// Count, mean, spread and quartiles of `values`. `None` when empty.
///
/// Quartiles interpolate linearly between the closest ranks.
pub fn describe(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = sorted.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };
    Some(Summary {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Class distribution of a labeled table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassBalance {
    /// Rows across all classes.
    pub total: usize,
    /// Number of classes counted.
    pub classes: usize,
    /// Rows in the smallest class.
    pub min: usize,
    /// Rows in the largest class.
    pub max: usize,
    /// Share of the largest class.
    pub max_share: f64,
    /// Share of the smallest class.
    pub min_share: f64,
    /// `max / min`; infinite when a listed class has no rows.
    pub ratio: f64,
    /// Per-class counts, largest first.
    pub per_class: Vec<ClassShare>,
}

/// Per-class share of a labeled table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassShare {
    /// Class.
    pub class: PotencyClass,
    /// Rows in the class.
    pub count: usize,
    /// `count / total`.
    pub share: f64,
}

/// Balance metrics from per-class counts, largest class first.
pub fn class_balance(counts: &IndexMap<PotencyClass, usize>) -> Option<ClassBalance> {
    let min = counts.values().copied().min()?;
    let max = counts.values().copied().max()?;
    let total: usize = counts.values().sum();
    let share = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let mut per_class: Vec<ClassShare> = counts
        .iter()
        .map(|(class, count)| ClassShare {
            class: *class,
            count: *count,
            share: share(*count),
        })
        .collect();
    per_class.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.class.as_str().cmp(b.class.as_str()))
    });
    Some(ClassBalance {
        total,
        classes: counts.len(),
        min,
        max,
        max_share: share(max),
        min_share: share(min),
        ratio: if min == 0 {
            f64::INFINITY
        } else {
            max as f64 / min as f64
        },
        per_class,
    })
}

/// Regression quality of externally produced predictions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionScores {
    /// Mean squared error.
    pub mse: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination; NaN when observations have no spread.
    pub r2: f64,
}

/// Score `predicted` against `observed`, pairwise.
pub fn regression_scores(
    observed: &[f64],
    predicted: &[f64],
) -> Result<RegressionScores, PipelineError> {
    if observed.len() != predicted.len() {
        return Err(PipelineError::DegenerateInput(format!(
            "{} observed value(s) but {} prediction(s)",
            observed.len(),
            predicted.len()
        )));
    }
    if observed.is_empty() {
        return Err(PipelineError::DegenerateInput(
            "no predictions to score".to_string(),
        ));
    }
    let n = observed.len() as f64;
    let mut se_sum = 0.0;
    let mut ae_sum = 0.0;
    for (y, y_hat) in observed.iter().zip(predicted) {
        let err = y_hat - y;
        se_sum += err * err;
        ae_sum += err.abs();
    }
    let mse = se_sum / n;

    let y_mean = observed.iter().sum::<f64>() / n;
    let ss_tot: f64 = observed.iter().map(|y| (y - y_mean) * (y - y_mean)).sum();
    let r2 = if ss_tot == 0.0 || !ss_tot.is_finite() {
        f64::NAN
    } else {
        1.0 - se_sum / ss_tot
    };

    Ok(RegressionScores {
        mse,
        rmse: mse.sqrt(),
        mae: ae_sum / n,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_matches_linear_quartiles() {
        let summary = describe(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!(summary.count, 5);
        assert!((summary.mean - 3.0).abs() < 1e-12);
        assert!((summary.std - 2.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.q25, 2.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.q75, 4.0);
        assert_eq!(summary.max, 5.0);

        let even = describe(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((even.q25 - 1.75).abs() < 1e-12);
        assert!((even.median - 2.5).abs() < 1e-12);

        assert!(describe(&[7.0]).unwrap().std.is_nan());
        assert_eq!(describe(&[]), None);
    }

    #[test]
    fn class_balance_reports_imbalance() {
        let mut counts = IndexMap::new();
        counts.insert(PotencyClass::Inactive, 2);
        counts.insert(PotencyClass::Active, 6);
        let balance = class_balance(&counts).unwrap();
        assert_eq!(balance.total, 8);
        assert_eq!(balance.classes, 2);
        assert!((balance.max_share - 0.75).abs() < 1e-12);
        assert!((balance.ratio - 3.0).abs() < 1e-12);
        assert_eq!(balance.per_class[0].class, PotencyClass::Active);
        assert_eq!(balance.per_class[1].count, 2);
        assert_eq!(class_balance(&IndexMap::new()), None);
    }

    #[test]
    fn regression_scores_for_known_errors() {
        let observed = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.0, 2.0, 3.0, 6.0];
        let scores = regression_scores(&observed, &predicted).unwrap();
        assert!((scores.mse - 1.0).abs() < 1e-12);
        assert!((scores.rmse - 1.0).abs() < 1e-12);
        assert!((scores.mae - 0.5).abs() < 1e-12);
        assert!((scores.r2 - (1.0 - 4.0 / 5.0)).abs() < 1e-12);

        let perfect = regression_scores(&observed, &observed).unwrap();
        assert_eq!(perfect.r2, 1.0);
        assert!(regression_scores(&[2.0, 2.0], &[2.0, 2.0]).unwrap().r2.is_nan());
    }

    #[test]
    fn regression_scores_reject_mismatched_lengths() {
        let err = regression_scores(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput(msg) if msg.contains("prediction")));
        assert!(regression_scores(&[], &[]).is_err());
    }
}
