use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::assembler::{DEFAULT_TEST_RATIO, DEFAULT_TRAIN_RATIO, RATIO_EPSILON};
use crate::errors::PipelineError;

/// Logical dataset partitions handed to the external trainer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitLabel {
    /// Training split.
    Train,
    /// Test split.
    Test,
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitLabel::Train => f.write_str("train"),
            SplitLabel::Test => f.write_str("test"),
        }
    }
}

/// Ratio configuration for train/test assignment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    /// Fraction assigned to train.
    pub train: f64,
    /// Fraction assigned to test.
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: DEFAULT_TRAIN_RATIO,
            test: DEFAULT_TEST_RATIO,
        }
    }
}

impl SplitRatios {
    /// Build ratios from a test fraction.
    pub fn with_test_fraction(test: f64) -> Result<Self, PipelineError> {
        Self {
            train: 1.0 - test,
            test,
        }
        .normalized()
    }

    /// Validate that ratios are non-negative and sum to `1.0` (within epsilon).
    pub fn normalized(self) -> Result<Self, PipelineError> {
        if self.train < 0.0 || self.test < 0.0 {
            return Err(PipelineError::Configuration(
                "split ratios must be non-negative".to_string(),
            ));
        }
        let sum = self.train + self.test;
        if (sum - 1.0).abs() > RATIO_EPSILON {
            return Err(PipelineError::Configuration(
                "split ratios must sum to 1.0".to_string(),
            ));
        }
        Ok(self)
    }

    /// Number of rows assigned to test for `total` rows.
    pub fn test_count(self, total: usize) -> usize {
        let raw = total as f64 * self.test - RATIO_EPSILON;
        (raw.max(0.0).ceil() as usize).min(total)
    }
}

/// Row indices assigned to each partition, in shuffled order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitAssignment {
    /// Training row indices.
    pub train: Vec<usize>,
    /// Test row indices.
    pub test: Vec<usize>,
}

impl SplitAssignment {
    /// Indices for one partition.
    pub fn indices(&self, label: SplitLabel) -> &[usize] {
        match label {
            SplitLabel::Train => &self.train,
            SplitLabel::Test => &self.test,
        }
    }
}

/// Shuffle `0..total` with `seed` and cut it into train/test partitions.
///
/// Every index lands in exactly one partition. The same `(total, ratios, seed)`
/// always produces the same assignment.
pub fn partition_indices(
    total: usize,
    ratios: SplitRatios,
    seed: u64,
) -> Result<SplitAssignment, PipelineError> {
    let ratios = ratios.normalized()?;
    if total == 0 {
        return Err(PipelineError::DegenerateInput(
            "cannot split an empty table".to_string(),
        ));
    }
    let test_count = ratios.test_count(total);
    let train_count = total - test_count;
    if (ratios.train > 0.0 && train_count == 0) || (ratios.test > 0.0 && test_count == 0) {
        return Err(PipelineError::DegenerateInput(format!(
            "{total} row(s) cannot fill a train/test split of {:.2}/{:.2}",
            ratios.train, ratios.test
        )));
    }

    let mut order: Vec<usize> = (0..total).collect();
    let mut rng = DeterministicRng::new(seed);
    order.shuffle(&mut rng);
    let train = order.split_off(test_count);
    Ok(SplitAssignment { train, test: order })
}

#[derive(Debug, Clone)]
/// Small deterministic RNG (SplitMix64) so shuffles are stable across platforms and releases.
pub(crate) struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let value = self.next_u64_internal();
            let bytes = value.to_le_bytes();
            let remaining = dest.len() - offset;
            let copy_len = remaining.min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}
