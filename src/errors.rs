use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::MissingField;
use crate::types::{CollaboratorId, CompoundId};

/// Error type for stage contracts, table IO, and external collaborator failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required field was null where the policy is `fail`.
    #[error("compound '{compound_id}' is missing {field} at stage '{stage}'")]
    MissingData {
        /// Offending record.
        compound_id: CompoundId,
        /// Field that was null.
        field: MissingField,
        /// Stage that found the null.
        stage: &'static str,
    },
    /// Labeled ids and descriptor ids do not match one to one.
    #[error(
        "join mismatch: {} labeled id(s) without descriptors {:?}, {} descriptor id(s) without labels {:?}",
        missing_descriptors.len(),
        missing_descriptors,
        missing_labels.len(),
        missing_labels
    )]
    JoinMismatch {
        /// Labeled compounds with no descriptor row.
        missing_descriptors: Vec<CompoundId>,
        /// Descriptor rows with no labeled compound.
        missing_labels: Vec<CompoundId>,
    },
    /// An id appears twice in a keyed table.
    #[error("{table} contains compound '{compound_id}' more than once")]
    DuplicateKey {
        /// Table holding the repeated id.
        table: &'static str,
        /// Repeated id.
        compound_id: CompoundId,
    },
    /// A descriptor row does not match the column count.
    #[error("row '{compound_id}' has {found} value(s), expected {expected}")]
    RowWidth {
        /// Offending row.
        compound_id: CompoundId,
        /// Column count of the table.
        expected: usize,
        /// Values in the row.
        found: usize,
    },
    /// Input too small or too uniform for the stage.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
    /// Potency with no log value (zero, negative, or non-finite).
    #[error("potency {value} of compound '{compound_id}' is outside the log-transform domain")]
    Domain {
        /// Offending record.
        compound_id: CompoundId,
        /// Rejected potency.
        value: f64,
    },
    /// A table is missing columns or holds unparseable values.
    #[error("table '{}' does not match its schema: {details}", path.display())]
    Schema {
        /// Table that failed to parse.
        path: PathBuf,
        /// What did not match.
        details: String,
    },
    /// An external source or engine failed.
    #[error("collaborator '{collaborator}' is unavailable: {reason}")]
    CollaboratorUnavailable {
        /// Source or engine id.
        collaborator: CollaboratorId,
        /// Failure detail.
        reason: String,
    },
    /// Invalid configuration or arguments.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Delimited-text error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
