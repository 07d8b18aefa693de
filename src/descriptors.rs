//! Descriptor tables, the external descriptor-engine interface, and the join
//! that aligns descriptors with labeled records.

use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::constants::checkpoints::{DESCRIPTOR_INPUT, DESCRIPTOR_OUTPUT};
use crate::data::{LabeledRecord, PotencyClass};
use crate::errors::PipelineError;
use crate::transport::fs::{read_descriptor_table, write_descriptor_input};
use crate::types::{CollaboratorId, CompoundId, DescriptorName};

/// Per-compound numeric descriptor vectors keyed by compound id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescriptorTable {
    names: Vec<DescriptorName>,
    rows: IndexMap<CompoundId, Vec<f64>>,
}

impl DescriptorTable {
    /// Empty table with the given column names.
    pub fn new(names: Vec<DescriptorName>) -> Result<Self, PipelineError> {
        let mut seen = IndexSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::Configuration(format!(
                    "duplicate descriptor column '{name}'"
                )));
            }
        }
        Ok(Self {
            names,
            rows: IndexMap::new(),
        })
    }

    /// Add one compound's descriptor vector.
    ///
    /// Each compound id may appear once; vectors must match the column count.
    pub fn insert(
        &mut self,
        compound_id: impl Into<CompoundId>,
        values: Vec<f64>,
    ) -> Result<(), PipelineError> {
        let compound_id = compound_id.into();
        if values.len() != self.names.len() {
            return Err(PipelineError::RowWidth {
                compound_id,
                expected: self.names.len(),
                found: values.len(),
            });
        }
        if self.rows.contains_key(&compound_id) {
            return Err(PipelineError::DuplicateKey {
                table: "descriptor table",
                compound_id,
            });
        }
        self.rows.insert(compound_id, values);
        Ok(())
    }

    /// Descriptor column names.
    pub fn names(&self) -> &[DescriptorName] {
        &self.names
    }

    /// Descriptor vector for `compound_id`.
    pub fn get(&self, compound_id: &str) -> Option<&[f64]> {
        self.rows.get(compound_id).map(Vec::as_slice)
    }

    /// Compound ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &CompoundId> {
        self.rows.keys()
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = (&CompoundId, &[f64])> {
        self.rows.iter().map(|(id, values)| (id, values.as_slice()))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of the joined matrix: features plus the regression label.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixRow {
    /// Compound the row belongs to.
    pub compound_id: CompoundId,
    /// Class carried over from the labeled table.
    pub potency_class: PotencyClass,
    /// Descriptor values in `feature_names` order.
    pub features: Vec<f64>,
    /// Log-scale potency (`pIC50`).
    pub label: f64,
}

/// Row-aligned join of descriptors and labels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescriptorMatrix {
    /// Column names, one per feature.
    pub feature_names: Vec<DescriptorName>,
    /// Rows in labeled-table order.
    pub rows: Vec<MatrixRow>,
}

impl DescriptorMatrix {
    /// Matrix with no feature columns, carrying only classes and labels.
    pub fn labels_only(labeled: &[LabeledRecord]) -> Self {
        Self {
            feature_names: Vec::new(),
            rows: labeled
                .iter()
                .map(|record| MatrixRow {
                    compound_id: record.compound_id.clone(),
                    potency_class: record.potency_class,
                    features: Vec::new(),
                    label: record.log_potency,
                })
                .collect(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of feature column `idx` across all rows.
    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row.features[idx]).collect()
    }

    /// Values of the named feature column.
    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.feature_names.iter().position(|n| n == name)?;
        Some(self.column(idx))
    }

    /// Label column.
    pub fn labels(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.label).collect()
    }

    /// Rows whose class is active or inactive.
    pub fn two_class(&self) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| row.potency_class != PotencyClass::Intermediate)
                .cloned()
                .collect(),
        }
    }

    /// Keep only the feature columns at `keep` (ascending indices).
    pub fn select_columns(&self, keep: &[usize]) -> Self {
        Self {
            feature_names: keep.iter().map(|&idx| self.feature_names[idx].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| MatrixRow {
                    compound_id: row.compound_id.clone(),
                    potency_class: row.potency_class,
                    features: keep.iter().map(|&idx| row.features[idx]).collect(),
                    label: row.label,
                })
                .collect(),
        }
    }
}

/// Join descriptors onto labeled records by exact compound id.
///
/// Output rows follow `labeled` order. Any id present on only one side is a
/// `JoinMismatch` listing every unmatched id; the join never drops rows.
pub fn join(
    labeled: &[LabeledRecord],
    descriptors: &DescriptorTable,
) -> Result<DescriptorMatrix, PipelineError> {
    let mut labeled_ids: IndexSet<&str> = IndexSet::with_capacity(labeled.len());
    for record in labeled {
        if !labeled_ids.insert(record.compound_id.as_str()) {
            return Err(PipelineError::DuplicateKey {
                table: "labeled table",
                compound_id: record.compound_id.clone(),
            });
        }
    }

    let missing_descriptors: Vec<CompoundId> = labeled
        .iter()
        .filter(|record| descriptors.get(&record.compound_id).is_none())
        .map(|record| record.compound_id.clone())
        .collect();
    let missing_labels: Vec<CompoundId> = descriptors
        .ids()
        .filter(|id| !labeled_ids.contains(id.as_str()))
        .cloned()
        .collect();
    if !missing_descriptors.is_empty() || !missing_labels.is_empty() {
        return Err(PipelineError::JoinMismatch {
            missing_descriptors,
            missing_labels,
        });
    }

    let mut rows = Vec::with_capacity(labeled.len());
    for record in labeled {
        let features = descriptors
            .get(&record.compound_id)
            .map(<[f64]>::to_vec)
            .unwrap_or_default();
        rows.push(MatrixRow {
            compound_id: record.compound_id.clone(),
            potency_class: record.potency_class,
            features,
            label: record.log_potency,
        });
    }
    Ok(DescriptorMatrix {
        feature_names: descriptors.names().to_vec(),
        rows,
    })
}

/// External descriptor generator.
///
/// Implementations receive the labeled compounds and return one descriptor
/// vector per compound id. How descriptors are computed is opaque here.
pub trait DescriptorEngine {
    /// Stable collaborator identifier used in logs and errors.
    fn id(&self) -> &str;
    /// Compute descriptors for `records`.
    fn compute(&self, records: &[LabeledRecord]) -> Result<DescriptorTable, PipelineError>;
}

/// Descriptor engine backed by a table computed ahead of time.
#[derive(Clone, Debug)]
pub struct PrecomputedDescriptors {
    path: PathBuf,
}

impl PrecomputedDescriptors {
    /// Engine reading the descriptor table at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DescriptorEngine for PrecomputedDescriptors {
    fn id(&self) -> &str {
        "precomputed"
    }

    fn compute(&self, records: &[LabeledRecord]) -> Result<DescriptorTable, PipelineError> {
        let table = read_descriptor_table(&self.path)?;
        debug!(
            path = %self.path.display(),
            compounds = records.len(),
            rows = table.len(),
            "loaded precomputed descriptors"
        );
        Ok(table)
    }
}

/// Descriptor engine that runs an external program over a structure file.
///
/// The engine writes `molecule.smi` (structure TAB id, no header) into
/// `work_dir`, runs `program` there, and reads the delimited table the
/// program leaves at `output_file`. The arguments `{input}` and `{output}`
/// are replaced with the respective paths.
#[derive(Clone, Debug)]
pub struct CommandDescriptorEngine {
    id: CollaboratorId,
    program: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
    output_file: PathBuf,
}

impl CommandDescriptorEngine {
    /// Engine running `program` inside `work_dir`, with no arguments.
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let id = program
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("descriptor_command")
            .to_string();
        Self {
            id,
            program,
            args: Vec::new(),
            work_dir: work_dir.into(),
            output_file: PathBuf::from(DESCRIPTOR_OUTPUT),
        }
    }

    /// Arguments passed to the program.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Output table location, relative to the working directory unless absolute.
    pub fn with_output_file(mut self, output_file: impl Into<PathBuf>) -> Self {
        self.output_file = output_file.into();
        self
    }

    /// Absolute `(work_dir, input, output)`; the program runs inside
    /// `work_dir`, so relative paths would resolve twice.
    fn resolve_paths(&self) -> std::io::Result<(PathBuf, PathBuf, PathBuf)> {
        let work_dir = std::path::absolute(&self.work_dir)?;
        let input = work_dir.join(DESCRIPTOR_INPUT);
        let output = work_dir.join(&self.output_file);
        Ok((work_dir, input, output))
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }

    fn unavailable(&self, reason: String) -> PipelineError {
        PipelineError::CollaboratorUnavailable {
            collaborator: self.id.clone(),
            reason,
        }
    }
}

impl DescriptorEngine for CommandDescriptorEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn compute(&self, records: &[LabeledRecord]) -> Result<DescriptorTable, PipelineError> {
        std::fs::create_dir_all(&self.work_dir)?;
        let (work_dir, input, output) = self.resolve_paths()?;
        match std::fs::remove_file(&output) {
            Ok(()) => debug!(path = %output.display(), "removed stale descriptor output"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        write_descriptor_input(&input, records)?;
        info!(
            engine = %self.id,
            program = %self.program.display(),
            compounds = records.len(),
            "running descriptor engine"
        );

        let result = Command::new(&self.program)
            .args(self.expand_args(&input, &output))
            .current_dir(&work_dir)
            .output()
            .map_err(|err| self.unavailable(format!("failed to execute: {err}")))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(self.unavailable(format!(
                "exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(self.unavailable(format!(
                "expected output table {} was not written",
                output.display()
            )));
        }
        read_descriptor_table(&output)
    }
}
