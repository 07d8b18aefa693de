//! Labeler stage: potency classes and log-scale potency.
//!
//! Classes are a pure function of the raw potency in nanomolar:
//! `<= active_max_nm` is active, `>= inactive_min_nm` is inactive, anything
//! strictly between is intermediate. The log transform caps the value at
//! `potency_cap_nm`, converts nanomolar to molar, and takes `-log10`.

use indexmap::IndexMap;

use crate::config::{LabelingConfig, RecordPolicy};
use crate::constants::labeling::NANOMOLAR_TO_MOLAR;
use crate::data::{CuratedRecord, LabeledRecord, PotencyClass};
use crate::errors::PipelineError;
use crate::types::CompoundId;

/// Bucket a nanomolar potency into its class.
pub fn classify(potency_nm: f64, config: &LabelingConfig) -> PotencyClass {
    if potency_nm >= config.inactive_min_nm {
        PotencyClass::Inactive
    } else if potency_nm <= config.active_max_nm {
        PotencyClass::Active
    } else {
        PotencyClass::Intermediate
    }
}

/// Cap a nanomolar potency at `cap`. Values above are capped, never dropped.
pub fn clamp_potency(potency_nm: f64, cap: f64) -> f64 {
    if potency_nm > cap { cap } else { potency_nm }
}

/// `-log10(clamped_nm * 1e-9)`.
///
/// Zero, negative, and non-finite inputs have no defined log potency and are
/// reported as `Domain` errors.
pub fn log_potency(
    compound_id: &str,
    potency_nm: f64,
    config: &LabelingConfig,
) -> Result<f64, PipelineError> {
    if !potency_nm.is_finite() || potency_nm <= 0.0 {
        return Err(PipelineError::Domain {
            compound_id: compound_id.to_string(),
            value: potency_nm,
        });
    }
    let molar = clamp_potency(potency_nm, config.potency_cap_nm) * NANOMOLAR_TO_MOLAR;
    Ok(-molar.log10())
}

/// Result of one labeler pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelOutcome {
    /// Labeled records in input order.
    pub records: Vec<LabeledRecord>,
    /// Records skipped because their potency is outside the log domain.
    pub rejected: Vec<(CompoundId, f64)>,
}

/// Label every curated record.
///
/// Under [`RecordPolicy::Fail`] the first out-of-domain potency aborts with
/// `Domain`; under [`RecordPolicy::Skip`] it is collected in `rejected`.
pub fn label(
    records: &[CuratedRecord],
    config: &LabelingConfig,
    policy: RecordPolicy,
) -> Result<LabelOutcome, PipelineError> {
    let mut outcome = LabelOutcome {
        records: Vec::with_capacity(records.len()),
        rejected: Vec::new(),
    };
    for record in records {
        let log_value = match log_potency(&record.compound_id, record.potency_value, config) {
            Ok(value) => value,
            Err(err) if policy == RecordPolicy::Skip => {
                if let PipelineError::Domain { compound_id, value } = err {
                    outcome.rejected.push((compound_id, value));
                }
                continue;
            }
            Err(err) => return Err(err),
        };
        outcome.records.push(LabeledRecord {
            compound_id: record.compound_id.clone(),
            structure: record.structure.clone(),
            potency_value: record.potency_value,
            potency_class: classify(record.potency_value, config),
            log_potency: log_value,
        });
    }
    Ok(outcome)
}

/// Drop `intermediate` rows, keeping active and inactive in input order.
pub fn two_class(records: &[LabeledRecord]) -> Vec<LabeledRecord> {
    records
        .iter()
        .filter(|record| record.potency_class != PotencyClass::Intermediate)
        .cloned()
        .collect()
}

/// Count records per class, in first-seen order.
pub fn class_counts(records: &[LabeledRecord]) -> IndexMap<PotencyClass, usize> {
    let mut counts = IndexMap::new();
    for record in records {
        *counts.entry(record.potency_class).or_insert(0) += 1;
    }
    counts
}
