use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::labeling::{CLASS_ACTIVE, CLASS_INACTIVE, CLASS_INTERMEDIATE};

pub use crate::types::{ColumnName, CompoundId, Structure};

/// Raw assay measurement as materialized by a bioactivity source.
///
/// `structure` and `potency_value` are nullable until the cleaner runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompoundRecord {
    /// External compound identifier.
    pub compound_id: CompoundId,
    /// Structure string, possibly multi-fragment.
    pub structure: Option<Structure>,
    /// Raw potency in nanomolar.
    pub potency_value: Option<f64>,
    /// Remaining assay columns, in source order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<ColumnName, String>,
}

impl CompoundRecord {
    /// Build a record without assay metadata.
    pub fn new(
        compound_id: impl Into<CompoundId>,
        structure: Option<&str>,
        potency_value: Option<f64>,
    ) -> Self {
        Self {
            compound_id: compound_id.into(),
            structure: structure.map(str::to_string),
            potency_value,
            metadata: IndexMap::new(),
        }
    }

    /// First required field that is null, if any.
    pub fn missing_field(&self) -> Option<MissingField> {
        if self.potency_value.is_none() {
            Some(MissingField::PotencyValue)
        } else if self.structure.is_none() {
            Some(MissingField::Structure)
        } else {
            None
        }
    }
}

/// Record that passed the cleaner: every required field is present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CuratedRecord {
    /// Source identifier (ChEMBL id).
    pub compound_id: CompoundId,
    /// Structure string; canonical after the canonicalizer.
    pub structure: Structure,
    /// Potency in nM.
    pub potency_value: f64,
}

impl From<CuratedRecord> for CompoundRecord {
    fn from(record: CuratedRecord) -> Self {
        Self {
            compound_id: record.compound_id,
            structure: Some(record.structure),
            potency_value: Some(record.potency_value),
            metadata: IndexMap::new(),
        }
    }
}

/// Curated record enriched with its potency class and log-scale potency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    /// Source identifier (ChEMBL id).
    pub compound_id: CompoundId,
    /// Canonical structure string.
    pub structure: Structure,
    /// Potency in nM as measured, before capping.
    pub potency_value: f64,
    /// Class from the potency thresholds.
    pub potency_class: PotencyClass,
    /// `-log10(molar potency)` after capping.
    pub log_potency: f64,
}

/// Bioactivity bucket derived from the potency value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PotencyClass {
    /// Potency at or below the active threshold.
    Active,
    /// Potency at or above the inactive threshold.
    Inactive,
    /// Between the two thresholds.
    Intermediate,
}

impl PotencyClass {
    /// Wire label used in delimited-text tables.
    pub fn as_str(self) -> &'static str {
        match self {
            PotencyClass::Active => CLASS_ACTIVE,
            PotencyClass::Inactive => CLASS_INACTIVE,
            PotencyClass::Intermediate => CLASS_INTERMEDIATE,
        }
    }

    /// Parse a wire label.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            CLASS_ACTIVE => Some(PotencyClass::Active),
            CLASS_INACTIVE => Some(PotencyClass::Inactive),
            CLASS_INTERMEDIATE => Some(PotencyClass::Intermediate),
            _ => None,
        }
    }
}

impl fmt::Display for PotencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Required field that may be null before the cleaner boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingField {
    /// `standard_value` was empty.
    PotencyValue,
    /// `canonical_smiles` was empty.
    Structure,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::PotencyValue => f.write_str("potency_value"),
            MissingField::Structure => f.write_str("structure"),
        }
    }
}
