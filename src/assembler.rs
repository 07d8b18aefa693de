//! Dataset assembler: low-variance column removal and the seeded train/test split.

use crate::descriptors::DescriptorMatrix;
use crate::errors::PipelineError;
use crate::splits::{SplitAssignment, SplitLabel, SplitRatios, partition_indices};
use crate::types::DescriptorName;

/// Population variance (ddof 0). `None` for an empty column.
pub fn population_variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    Some(values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n)
}

/// Remove every feature column whose variance is below `threshold`.
///
/// Returns the reduced matrix and the removed column names. Removing every
/// column is a `DegenerateInput` error.
pub fn variance_filter(
    matrix: &DescriptorMatrix,
    threshold: f64,
) -> Result<(DescriptorMatrix, Vec<DescriptorName>), PipelineError> {
    if matrix.is_empty() {
        return Err(PipelineError::DegenerateInput(
            "variance filter received no rows".to_string(),
        ));
    }
    let mut keep = Vec::with_capacity(matrix.feature_names.len());
    let mut removed = Vec::new();
    for (idx, name) in matrix.feature_names.iter().enumerate() {
        let variance = population_variance(&matrix.column(idx)).unwrap_or(0.0);
        if variance < threshold {
            removed.push(name.clone());
        } else {
            keep.push(idx);
        }
    }
    if keep.is_empty() {
        return Err(PipelineError::DegenerateInput(format!(
            "all {} descriptor column(s) fall below variance threshold {threshold}",
            matrix.feature_names.len()
        )));
    }
    Ok((matrix.select_columns(&keep), removed))
}

/// Two row-disjoint partitions sharing one column schema.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainTestSplit {
    /// Training rows.
    pub train: DescriptorMatrix,
    /// Held-out rows.
    pub test: DescriptorMatrix,
}

impl TrainTestSplit {
    /// Partition by label.
    pub fn partition(&self, label: SplitLabel) -> &DescriptorMatrix {
        match label {
            SplitLabel::Train => &self.train,
            SplitLabel::Test => &self.test,
        }
    }
}

/// Split rows into train/test partitions with a seeded shuffle.
///
/// Every input row lands in exactly one partition; the same seed reproduces
/// the same split.
pub fn train_test_split(
    matrix: &DescriptorMatrix,
    ratios: SplitRatios,
    seed: u64,
) -> Result<TrainTestSplit, PipelineError> {
    let SplitAssignment { train, test } = partition_indices(matrix.len(), ratios, seed)?;
    let take = |indices: &[usize]| DescriptorMatrix {
        feature_names: matrix.feature_names.clone(),
        rows: indices.iter().map(|&idx| matrix.rows[idx].clone()).collect(),
    };
    Ok(TrainTestSplit {
        train: take(&train),
        test: take(&test),
    })
}

/// Output of [`assemble`].
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledDataset {
    /// Matrix after low-variance columns were removed.
    pub matrix: DescriptorMatrix,
    /// Columns dropped by the variance filter, in original order.
    pub removed_columns: Vec<DescriptorName>,
    /// Seeded row partitions of `matrix`.
    pub split: TrainTestSplit,
}

/// Variance filter followed by the train/test split.
pub fn assemble(
    matrix: &DescriptorMatrix,
    variance_threshold: f64,
    ratios: SplitRatios,
    seed: u64,
) -> Result<AssembledDataset, PipelineError> {
    let (filtered, removed_columns) = variance_filter(matrix, variance_threshold)?;
    let split = train_test_split(&filtered, ratios, seed)?;
    Ok(AssembledDataset {
        matrix: filtered,
        removed_columns,
        split,
    })
}
