//! Bioactivity source interfaces.
//!
//! A source returns raw assay measurements for one target. Transport, paging,
//! and authentication belong to the implementation; the pipeline only sees
//! `CompoundRecord`s, nullable fields included.

use serde::{Deserialize, Serialize};

use crate::constants::columns::{RAW_STANDARD_TYPE, RAW_TARGET_ID};
use crate::constants::source::{DEFAULT_STANDARD_TYPE, IN_MEMORY_SOURCE_ID};
use crate::data::CompoundRecord;
use crate::errors::PipelineError;
use crate::types::{CollaboratorId, TargetId};

/// Source implementation modules.
pub mod csv_dump;

pub use csv_dump::CsvDumpSource;

/// Which measurements a source should return.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetQuery {
    /// Target identifier; `None` keeps every target in the source.
    pub target_id: Option<TargetId>,
    /// Measurement type to keep (for example `IC50`).
    pub standard_type: String,
}

impl Default for TargetQuery {
    fn default() -> Self {
        Self {
            target_id: None,
            standard_type: DEFAULT_STANDARD_TYPE.to_string(),
        }
    }
}

impl TargetQuery {
    /// IC50 rows for `target_id`.
    pub fn for_target(target_id: impl Into<TargetId>) -> Self {
        Self {
            target_id: Some(target_id.into()),
            ..Self::default()
        }
    }

    /// True if the record's assay metadata agrees with this query.
    ///
    /// A record without a `standard_type` or `target_chembl_id` column is
    /// treated as already filtered on that axis.
    pub fn matches(&self, record: &CompoundRecord) -> bool {
        let type_ok = record
            .metadata
            .get(RAW_STANDARD_TYPE)
            .is_none_or(|value| value.trim() == self.standard_type);
        let target_ok = match &self.target_id {
            Some(target) => record
                .metadata
                .get(RAW_TARGET_ID)
                .is_none_or(|value| value.trim() == target),
            None => true,
        };
        type_ok && target_ok
    }
}

/// Fetcher collaborator.
///
/// For a fixed backend state and query, `fetch` should return the same records
/// in the same order.
pub trait BioactivitySource: Send + Sync {
    /// Stable collaborator identifier used in logs and errors.
    fn id(&self) -> &str;
    /// Return every measurement matching `query`.
    fn fetch(&self, query: &TargetQuery) -> Result<Vec<CompoundRecord>, PipelineError>;
}

/// Source over records already held in memory.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    id: CollaboratorId,
    records: Vec<CompoundRecord>,
}

impl InMemorySource {
    /// Source serving `records`.
    pub fn new(records: Vec<CompoundRecord>) -> Self {
        Self {
            id: IN_MEMORY_SOURCE_ID.to_string(),
            records,
        }
    }

    /// Override the collaborator id.
    pub fn with_id(mut self, id: impl Into<CollaboratorId>) -> Self {
        self.id = id.into();
        self
    }
}

impl BioactivitySource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch(&self, query: &TargetQuery) -> Result<Vec<CompoundRecord>, PipelineError> {
        Ok(self
            .records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }
}
