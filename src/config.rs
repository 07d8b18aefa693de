use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::assembler::{DEFAULT_SEED, DEFAULT_VARIANCE_THRESHOLD};
use crate::constants::checkpoints::DEFAULT_TARGET_NAME;
use crate::constants::comparator::DEFAULT_ALPHA;
use crate::constants::labeling::{ACTIVE_MAX_NM, INACTIVE_MIN_NM, POTENCY_CAP_NM};
use crate::errors::PipelineError;
use crate::source::TargetQuery;
use crate::splits::SplitRatios;
use crate::types::DescriptorName;

/// Potency thresholds (nanomolar) used by the labeler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Values at or below this are `active`.
    pub active_max_nm: f64,
    /// Values at or above this are `inactive`.
    pub inactive_min_nm: f64,
    /// Values above this are capped before the log transform.
    pub potency_cap_nm: f64,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            active_max_nm: ACTIVE_MAX_NM,
            inactive_min_nm: INACTIVE_MIN_NM,
            potency_cap_nm: POTENCY_CAP_NM,
        }
    }
}

impl LabelingConfig {
    /// Reject threshold orderings that would make classes overlap.
    pub fn validated(self) -> Result<Self, PipelineError> {
        if !(self.active_max_nm.is_finite() && self.inactive_min_nm.is_finite()) {
            return Err(PipelineError::Configuration(
                "labeling thresholds must be finite".to_string(),
            ));
        }
        if self.active_max_nm >= self.inactive_min_nm {
            return Err(PipelineError::Configuration(format!(
                "active threshold {} must be below inactive threshold {}",
                self.active_max_nm, self.inactive_min_nm
            )));
        }
        if !(self.potency_cap_nm > 0.0) {
            return Err(PipelineError::Configuration(
                "potency cap must be positive".to_string(),
            ));
        }
        Ok(self)
    }
}

/// What a stage does with a record that violates its contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordPolicy {
    /// Drop the record and keep going.
    #[default]
    Skip,
    /// Abort the stage with the record's error.
    Fail,
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Prefix used for checkpoint file names.
    pub target_name: String,
    /// Query handed to the bioactivity source.
    pub query: TargetQuery,
    /// Labeler thresholds.
    pub labeling: LabelingConfig,
    /// Handling of null potency/structure before the cleaner boundary.
    pub missing_data: RecordPolicy,
    /// Handling of zero, negative, or non-finite potency at the log transform.
    pub invalid_potency: RecordPolicy,
    /// Descriptor columns with variance below this are removed.
    pub variance_threshold: f64,
    /// Train/test partition ratios.
    pub split: SplitRatios,
    /// Seed controlling the train/test shuffle.
    pub seed: u64,
    /// Significance level for class comparisons.
    pub alpha: f64,
    /// Columns compared between active and inactive rows; empty compares
    /// `pIC50` and every descriptor column.
    pub comparison_descriptors: Vec<DescriptorName>,
    /// Directory receiving checkpoints and the run report.
    pub output_dir: PathBuf,
    /// Persist every stage table, not only the model-ready partitions.
    pub write_checkpoints: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_string(),
            query: TargetQuery::default(),
            labeling: LabelingConfig::default(),
            missing_data: RecordPolicy::Skip,
            invalid_potency: RecordPolicy::Fail,
            variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
            split: SplitRatios::default(),
            seed: DEFAULT_SEED,
            alpha: DEFAULT_ALPHA,
            comparison_descriptors: Vec::new(),
            output_dir: PathBuf::from("."),
            write_checkpoints: true,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON configuration file; absent fields keep their defaults.
    pub fn from_json_path(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.labeling.validated()?;
        self.split.normalized()?;
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(PipelineError::Configuration(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.variance_threshold >= 0.0) {
            return Err(PipelineError::Configuration(
                "variance threshold must be non-negative".to_string(),
            ));
        }
        if self.target_name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "target name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
