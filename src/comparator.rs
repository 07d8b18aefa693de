//! Two-group rank-sum comparison (Mann-Whitney U).
//!
//! Each call is independent: it takes two samples and returns a summary, with
//! no state carried between descriptors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::constants::columns::LOG_POTENCY;
use crate::constants::comparator::{
    DIFFERENT_DISTRIBUTION, EXACT_MAX_SMALLER_GROUP, MIN_GROUP_SIZE, SAME_DISTRIBUTION,
};
use crate::data::PotencyClass;
use crate::descriptors::DescriptorMatrix;
use crate::errors::PipelineError;
use crate::types::DescriptorName;

/// How the p-value was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankSumMethod {
    /// Exact null distribution of U (small samples, no ties).
    Exact,
    /// Normal approximation with tie and continuity correction.
    Asymptotic,
}

/// Raw test output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankSumTest {
    /// U statistic of the first sample.
    pub statistic: f64,
    /// Two-sided p-value in `[0, 1]`.
    pub p_value: f64,
    /// Which null distribution produced `p_value`.
    pub method: RankSumMethod,
}

/// Outcome of the hypothesis test at a given significance level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// `p > alpha`.
    #[serde(rename = "Same distribution (fail to reject H0)")]
    SameDistribution,
    /// `p <= alpha`.
    #[serde(rename = "Different distribution (reject H0)")]
    DifferentDistribution,
}

impl Verdict {
    /// `p > alpha` fails to reject; `p <= alpha` rejects.
    pub fn at(p_value: f64, alpha: f64) -> Self {
        if p_value > alpha {
            Verdict::SameDistribution
        } else {
            Verdict::DifferentDistribution
        }
    }

    /// Human-readable verdict, as written to comparison tables.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::SameDistribution => SAME_DISTRIBUTION,
            Verdict::DifferentDistribution => DIFFERENT_DISTRIBUTION,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-row summary of one descriptor comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Compared column (`pIC50` or a descriptor name).
    #[serde(rename = "Descriptor")]
    pub descriptor: DescriptorName,
    /// U statistic of the active group.
    #[serde(rename = "Statistics")]
    pub statistic: f64,
    /// Two-sided p-value.
    #[serde(rename = "p")]
    pub p_value: f64,
    /// Significance level the verdict was taken at.
    pub alpha: f64,
    /// Verdict at `alpha`.
    #[serde(rename = "Interpretation")]
    pub interpretation: Verdict,
}

/// Mann-Whitney U test of `x` against `y`, two-sided.
///
/// Both samples need at least two finite observations.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<RankSumTest, PipelineError> {
    for (name, sample) in [("first", x), ("second", y)] {
        if sample.len() < MIN_GROUP_SIZE {
            return Err(PipelineError::DegenerateInput(format!(
                "{name} sample has {} observation(s), need at least {MIN_GROUP_SIZE}",
                sample.len()
            )));
        }
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::DegenerateInput(format!(
                "{name} sample contains non-finite values"
            )));
        }
    }

    let n1 = x.len();
    let n2 = y.len();
    let pooled: Vec<f64> = x.iter().chain(y.iter()).copied().collect();
    let (ranks, tie_term) = ranks_average_ties(&pooled);
    let rank_sum_x: f64 = ranks[..n1].iter().sum();
    let u1 = rank_sum_x - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u_max = u1.max(u2);

    let exact = n1.min(n2) <= EXACT_MAX_SMALLER_GROUP && tie_term == 0.0;
    let (p_value, method) = if exact {
        (exact_p_value(u_max, n1, n2), RankSumMethod::Exact)
    } else {
        (
            asymptotic_p_value(u_max, n1, n2, tie_term),
            RankSumMethod::Asymptotic,
        )
    };

    Ok(RankSumTest {
        statistic: u1,
        p_value: p_value.clamp(0.0, 1.0),
        method,
    })
}

/// Run the test and interpret it at `alpha`.
pub fn compare(
    descriptor: &str,
    first: &[f64],
    second: &[f64],
    alpha: f64,
) -> Result<ComparisonSummary, PipelineError> {
    let test = mann_whitney_u(first, second)?;
    Ok(ComparisonSummary {
        descriptor: descriptor.to_string(),
        statistic: test.statistic,
        p_value: test.p_value,
        alpha,
        interpretation: Verdict::at(test.p_value, alpha),
    })
}

/// Compare active against inactive rows for each named column.
///
/// `pIC50` selects the label column; any other name selects a feature
/// column. Each entry is computed on its own, so one failing column does not
/// affect the others.
pub fn compare_descriptors(
    matrix: &DescriptorMatrix,
    names: &[DescriptorName],
    alpha: f64,
) -> Vec<(DescriptorName, Result<ComparisonSummary, PipelineError>)> {
    names
        .iter()
        .map(|name| {
            let result = class_groups(matrix, name)
                .and_then(|(active, inactive)| compare(name, &active, &inactive, alpha));
            (name.clone(), result)
        })
        .collect()
}

fn class_groups(
    matrix: &DescriptorMatrix,
    name: &str,
) -> Result<(Vec<f64>, Vec<f64>), PipelineError> {
    let values = if name == LOG_POTENCY {
        matrix.labels()
    } else {
        matrix.column_by_name(name).ok_or_else(|| {
            PipelineError::Configuration(format!("unknown descriptor column '{name}'"))
        })?
    };
    let mut active = Vec::new();
    let mut inactive = Vec::new();
    for (row, value) in matrix.rows.iter().zip(values) {
        match row.potency_class {
            PotencyClass::Active => active.push(value),
            PotencyClass::Inactive => inactive.push(value),
            PotencyClass::Intermediate => {}
        }
    }
    Ok((active, inactive))
}

/// Average ranks (1-based) with ties sharing their mean rank, plus the tie
/// correction term `sum(t^3 - t)` over tie groups.
fn ranks_average_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let start = i;
        let value = values[order[i]];
        i += 1;
        while i < n && values[order[i]] == value {
            i += 1;
        }
        let avg_rank = (start + 1 + i) as f64 / 2.0;
        for &idx in &order[start..i] {
            ranks[idx] = avg_rank;
        }
        let t = (i - start) as f64;
        tie_term += t * t * t - t;
    }
    (ranks, tie_term)
}

/// `2 * P(U >= u)` under the exact null distribution.
fn exact_p_value(u: f64, n1: usize, n2: usize) -> f64 {
    let counts = u_distribution(n1, n2);
    let total: f64 = counts.iter().sum();
    let k = u.round() as usize;
    let upper: f64 = counts.iter().skip(k).sum();
    (2.0 * upper / total).min(1.0)
}

/// Number of orderings giving each U value for sample sizes `m`, `n`.
///
/// Uses `c(i, j, u) = c(i - 1, j, u - j) + c(i, j - 1, u)`, walking `j` over
/// the larger sample and keeping one distribution per size of the smaller.
fn u_distribution(m: usize, n: usize) -> Vec<f64> {
    let (small, large) = if m <= n { (m, n) } else { (n, m) };
    // dists[i] holds the distribution for sizes (i, j) at the current j
    let mut dists: Vec<Vec<f64>> = vec![vec![1.0]; small + 1];
    for j in 1..=large {
        for i in 1..=small {
            let mut next = vec![0.0; i * j + 1];
            for (u, &count) in dists[i].iter().enumerate() {
                next[u] += count;
            }
            for (u, &count) in dists[i - 1].iter().enumerate() {
                next[u + j] += count;
            }
            dists[i] = next;
        }
    }
    dists.swap_remove(small)
}

fn asymptotic_p_value(u: f64, n1: usize, n2: usize, tie_term: f64) -> f64 {
    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let n = n1f + n2f;
    let mean = n1f * n2f / 2.0;
    let variance = n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if !(variance > 0.0) {
        return 1.0;
    }
    let z = (u - mean - 0.5) / variance.sqrt();
    2.0 * normal_sf(z)
}

/// Upper tail of the standard normal, `1 - Φ(z)`.
fn normal_sf(z: f64) -> f64 {
    let x = z / std::f64::consts::SQRT_2;
    if x >= 0.0 {
        0.5 * erfc_non_negative(x)
    } else {
        1.0 - 0.5 * erfc_non_negative(-x)
    }
}

/// Complementary error function for `x >= 0` (Abramowitz & Stegun 7.1.26).
fn erfc_non_negative(x: f64) -> f64 {
    let t = 1.0 / 0.327_591_1_f64.mul_add(x, 1.0);
    let poly = 1.061_405_429_f64
        .mul_add(t, -1.453_152_027)
        .mul_add(t, 1.421_413_741)
        .mul_add(t, -0.284_496_736)
        .mul_add(t, 0.254_829_592);
    poly * t * (-x * x).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::MatrixRow;

    #[test]
    fn identical_samples_give_p_one() {
        let sample = [1.0, 2.0, 3.0, 4.0, 5.0];
        let test = mann_whitney_u(&sample, &sample).unwrap();
        assert!((test.p_value - 1.0).abs() < 1e-12);
        assert_eq!(test.statistic, 12.5);
        assert_eq!(test.method, RankSumMethod::Asymptotic);

        let summary = compare("MW", &sample, &sample, 0.05).unwrap();
        assert_eq!(summary.interpretation, Verdict::SameDistribution);
    }

    #[test]
    fn separated_small_samples_use_exact_distribution() {
        let low = [1.0, 2.0, 3.0, 4.0, 5.0];
        let high = [10.0, 11.0, 12.0, 13.0, 14.0];
        let test = mann_whitney_u(&low, &high).unwrap();
        assert_eq!(test.method, RankSumMethod::Exact);
        assert_eq!(test.statistic, 0.0);
        // 2 / C(10, 5)
        assert!((test.p_value - 2.0 / 252.0).abs() < 1e-12);
        assert_eq!(Verdict::at(test.p_value, 0.05), Verdict::DifferentDistribution);
    }

    #[test]
    fn separated_large_samples_reject_with_normal_approximation() {
        let low: Vec<f64> = (0..20).map(|v| v as f64).collect();
        let high: Vec<f64> = (100..120).map(|v| v as f64).collect();
        let summary = compare("pIC50", &high, &low, 0.05).unwrap();
        assert_eq!(summary.statistic, 400.0);
        assert!(summary.p_value < 1e-6);
        assert_eq!(summary.interpretation, Verdict::DifferentDistribution);
        assert_eq!(summary.interpretation.as_str(), DIFFERENT_DISTRIBUTION);
    }

    #[test]
    fn exact_distribution_counts_sum_to_binomial() {
        let counts = u_distribution(3, 4);
        assert_eq!(counts.len(), 13);
        assert_eq!(counts.iter().sum::<f64>(), 35.0);
        assert_eq!(counts[0], 1.0);
        assert_eq!(counts[12], 1.0);
    }

    #[test]
    fn one_small_group_is_enough_for_the_exact_distribution() {
        let low = [1.0, 2.0, 3.0];
        let high: Vec<f64> = (10..40).map(|v| v as f64).collect();
        let test = mann_whitney_u(&low, &high).unwrap();
        assert_eq!(test.method, RankSumMethod::Exact);
        assert_eq!(test.statistic, 0.0);
        // 2 / C(33, 3)
        assert!((test.p_value - 2.0 / 5456.0).abs() < 1e-12);

        let wide: Vec<f64> = (0..9).map(|v| v as f64).collect();
        let test = mann_whitney_u(&wide, &high).unwrap();
        assert_eq!(test.method, RankSumMethod::Asymptotic);
    }

    #[test]
    fn exact_distribution_is_symmetric_in_sample_sizes() {
        assert_eq!(u_distribution(2, 5), u_distribution(5, 2));
        assert_eq!(u_distribution(0, 4), vec![1.0]);
    }

    #[test]
    fn ranks_average_over_ties() {
        let (ranks, tie_term) = ranks_average_ties(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(tie_term, 6.0);
    }

    #[test]
    fn too_few_observations_is_degenerate() {
        let err = mann_whitney_u(&[1.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput(msg) if msg.contains("first sample")));
        let err = mann_whitney_u(&[1.0, 2.0], &[f64::NAN, 2.0]).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput(msg) if msg.contains("non-finite")));
    }

    #[test]
    fn normal_tail_is_close_to_reference_values() {
        assert!((normal_sf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_sf(1.959_964) - 0.025).abs() < 1e-6);
        assert!((normal_sf(-1.959_964) - 0.975).abs() < 1e-6);
    }

    #[test]
    fn compare_descriptors_runs_each_column_independently() {
        let mut rows = Vec::new();
        for idx in 0..6 {
            let class = if idx < 3 {
                PotencyClass::Active
            } else {
                PotencyClass::Inactive
            };
            rows.push(MatrixRow {
                compound_id: format!("C{idx}"),
                potency_class: class,
                features: vec![idx as f64, 1.0],
                label: 10.0 - idx as f64,
            });
        }
        rows.push(MatrixRow {
            compound_id: "M".into(),
            potency_class: PotencyClass::Intermediate,
            features: vec![100.0, 1.0],
            label: 5.5,
        });
        let matrix = DescriptorMatrix {
            feature_names: vec!["rank".into(), "flat".into()],
            rows,
        };
        let names: Vec<DescriptorName> =
            vec!["pIC50".into(), "rank".into(), "flat".into(), "missing".into()];
        let results = compare_descriptors(&matrix, &names, 0.05);
        assert_eq!(results.len(), 4);

        let pic50 = results[0].1.as_ref().unwrap();
        assert_eq!(pic50.statistic, 9.0);
        let rank = results[1].1.as_ref().unwrap();
        assert_eq!(rank.statistic, 0.0);
        let flat = results[2].1.as_ref().unwrap();
        assert_eq!(flat.p_value, 1.0);
        assert_eq!(flat.interpretation, Verdict::SameDistribution);
        assert!(matches!(results[3].1, Err(PipelineError::Configuration(_))));
    }
}
