use std::path::PathBuf;
use tracing::debug;

use crate::constants::source::CSV_DUMP_SOURCE_ID;
use crate::data::CompoundRecord;
use crate::errors::PipelineError;
use crate::source::{BioactivitySource, TargetQuery};
use crate::transport::fs::read_raw_dump;
use crate::types::CollaboratorId;

/// Source backed by a bioactivity export on disk.
///
/// The file is read on every `fetch`, so edits between runs are picked up.
#[derive(Clone, Debug)]
pub struct CsvDumpSource {
    id: CollaboratorId,
    path: PathBuf,
}

impl CsvDumpSource {
    /// Source reading the dump at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: CSV_DUMP_SOURCE_ID.to_string(),
            path: path.into(),
        }
    }

    /// Override the collaborator id.
    pub fn with_id(mut self, id: impl Into<CollaboratorId>) -> Self {
        self.id = id.into();
        self
    }
}

impl BioactivitySource for CsvDumpSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch(&self, query: &TargetQuery) -> Result<Vec<CompoundRecord>, PipelineError> {
        if !self.path.is_file() {
            return Err(PipelineError::CollaboratorUnavailable {
                collaborator: self.id.clone(),
                reason: format!("{} does not exist", self.path.display()),
            });
        }
        let rows = read_raw_dump(&self.path)?;
        let total = rows.len();
        let records: Vec<CompoundRecord> =
            rows.into_iter().filter(|row| query.matches(row)).collect();
        debug!(
            source = %self.id,
            path = %self.path.display(),
            total,
            kept = records.len(),
            standard_type = %query.standard_type,
            "read bioactivity dump"
        );
        Ok(records)
    }
}
