use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::canonical::longest_fragment;
use crate::comparator::ComparisonSummary;
use crate::constants::checkpoints::COMPARISON_PREFIX;
use crate::constants::columns::{
    DESCRIPTOR_COMPOUND_ID, DESCRIPTOR_NAME_ID, LOG_POTENCY, RAW_COMPOUND_ID, RAW_POTENCY,
    RAW_STRUCTURE,
};
use crate::data::{CompoundRecord, CuratedRecord, LabeledRecord, MissingField, PotencyClass};
use crate::descriptors::{DescriptorMatrix, DescriptorTable};
use crate::errors::PipelineError;
use crate::types::CompoundId;

/// Stage that reports nulls found while reading a checkpoint.
pub const CHECKPOINT_STAGE: &str = "checkpoint";

/// `<dir>/<target>_<suffix>`.
pub fn checkpoint_path(dir: &Path, target: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{target}_{suffix}"))
}

/// `<dir>/mannwhitneyu_<descriptor>.csv`.
///
/// Characters outside `[A-Za-z0-9._-]` in the descriptor name become `_`, so
/// column headers such as `MW/HBD` or `../x` stay inside `dir`.
pub fn comparison_path(dir: &Path, descriptor: &str) -> PathBuf {
    let file_stem: String = descriptor
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{COMPARISON_PREFIX}{file_stem}.csv"))
}

/// Curated table row.
#[derive(Debug, Serialize, Deserialize)]
struct CuratedRow {
    #[serde(rename = "molecule_chembl_id")]
    compound_id: CompoundId,
    #[serde(rename = "canonical_smiles")]
    structure: Option<String>,
    #[serde(rename = "standard_value")]
    potency_value: Option<f64>,
}

/// Labeled table row (3-class and 2-class checkpoints).
#[derive(Debug, Serialize, Deserialize)]
struct LabeledRow {
    #[serde(rename = "molecule_chembl_id")]
    compound_id: CompoundId,
    #[serde(rename = "canonical_smiles")]
    structure: String,
    #[serde(rename = "standard_value")]
    potency_value: f64,
    #[serde(rename = "class")]
    potency_class: PotencyClass,
    #[serde(rename = "pIC50")]
    log_potency: f64,
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    observed: f64,
    predicted: f64,
}

fn create_writer(path: &Path) -> Result<csv::Writer<fs::File>, PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(csv::Writer::from_path(path)?)
}

fn schema(path: &Path, details: impl Into<String>) -> PipelineError {
    PipelineError::Schema {
        path: path.to_path_buf(),
        details: details.into(),
    }
}

fn column_index(path: &Path, headers: &csv::StringRecord, name: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| schema(path, format!("missing required column '{name}'")))
}

fn parse_number(path: &Path, column: &str, row: usize, raw: &str) -> Result<f64, PipelineError> {
    raw.trim().parse::<f64>().map_err(|_| {
        schema(
            path,
            format!("row {row}: column '{column}' holds non-numeric value '{raw}'"),
        )
    })
}

fn non_empty(raw: &str) -> Option<&str> {
    if raw.trim().is_empty() { None } else { Some(raw) }
}

/// Read a raw bioactivity dump.
///
/// The id, structure, and potency columns are required; empty structure or
/// potency cells become nulls for the cleaner to handle. Every other column
/// is kept as ordered metadata.
pub fn read_raw_dump(path: &Path) -> Result<Vec<CompoundRecord>, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let id_idx = column_index(path, &headers, RAW_COMPOUND_ID)?;
    let structure_idx = column_index(path, &headers, RAW_STRUCTURE)?;
    let potency_idx = column_index(path, &headers, RAW_POTENCY)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let fields = result?;
        let compound_id = fields
            .get(id_idx)
            .and_then(non_empty)
            .ok_or_else(|| schema(path, format!("row {row}: empty '{RAW_COMPOUND_ID}'")))?;
        let potency_value = match fields.get(potency_idx).and_then(non_empty) {
            Some(raw) => Some(parse_number(path, RAW_POTENCY, row, raw)?),
            None => None,
        };
        let mut record = CompoundRecord::new(
            compound_id,
            fields.get(structure_idx).and_then(non_empty),
            potency_value,
        );
        for (idx, (header, value)) in headers.iter().zip(fields.iter()).enumerate() {
            if idx != id_idx && idx != structure_idx && idx != potency_idx {
                record.metadata.insert(header.to_string(), value.to_string());
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Write records in raw dump layout; nulls become empty cells.
pub fn write_raw_dump(path: &Path, records: &[CompoundRecord]) -> Result<(), PipelineError> {
    let metadata_columns: IndexSet<&str> = records
        .iter()
        .flat_map(|record| record.metadata.keys().map(String::as_str))
        .collect();
    let mut writer = create_writer(path)?;
    let mut header = vec![RAW_COMPOUND_ID, RAW_STRUCTURE, RAW_POTENCY];
    header.extend(metadata_columns.iter().copied());
    writer.write_record(&header)?;
    for record in records {
        let mut row = vec![
            record.compound_id.clone(),
            record.structure.clone().unwrap_or_default(),
            record.potency_value.map(|v| v.to_string()).unwrap_or_default(),
        ];
        row.extend(
            metadata_columns
                .iter()
                .map(|column| record.metadata.get(*column).cloned().unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the curated table (`molecule_chembl_id`, `canonical_smiles`, `standard_value`).
pub fn write_curated(path: &Path, records: &[CuratedRecord]) -> Result<(), PipelineError> {
    let mut writer = create_writer(path)?;
    for record in records {
        writer.serialize(CuratedRow {
            compound_id: record.compound_id.clone(),
            structure: Some(record.structure.clone()),
            potency_value: Some(record.potency_value),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a curated checkpoint. A null required field is `MissingData`.
pub fn read_curated(path: &Path) -> Result<Vec<CuratedRecord>, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize::<CuratedRow>() {
        let row = result.map_err(|err| schema(path, err.to_string()))?;
        let Some(potency_value) = row.potency_value else {
            return Err(PipelineError::MissingData {
                compound_id: row.compound_id,
                field: MissingField::PotencyValue,
                stage: CHECKPOINT_STAGE,
            });
        };
        let Some(structure) = row.structure.filter(|s| !s.is_empty()) else {
            return Err(PipelineError::MissingData {
                compound_id: row.compound_id,
                field: MissingField::Structure,
                stage: CHECKPOINT_STAGE,
            });
        };
        records.push(CuratedRecord {
            compound_id: row.compound_id,
            structure,
            potency_value,
        });
    }
    Ok(records)
}

/// Write a labeled table with `class` and `pIC50` columns.
pub fn write_labeled(path: &Path, records: &[LabeledRecord]) -> Result<(), PipelineError> {
    let mut writer = create_writer(path)?;
    for record in records {
        writer.serialize(LabeledRow {
            compound_id: record.compound_id.clone(),
            structure: record.structure.clone(),
            potency_value: record.potency_value,
            potency_class: record.potency_class,
            log_potency: record.log_potency,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a 3-class or 2-class labeled table.
pub fn read_labeled(path: &Path) -> Result<Vec<LabeledRecord>, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize::<LabeledRow>() {
        let row = result.map_err(|err| schema(path, err.to_string()))?;
        records.push(LabeledRecord {
            compound_id: row.compound_id,
            structure: row.structure,
            potency_value: row.potency_value,
            potency_class: row.potency_class,
            log_potency: row.log_potency,
        });
    }
    Ok(records)
}

/// Write the descriptor-engine input: `structure<TAB>compound_id`, no header,
/// using the longest fragment of each structure.
pub fn write_descriptor_input(path: &Path, records: &[LabeledRecord]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)?;
    for record in records {
        writer.write_record([longest_fragment(&record.structure), record.compound_id.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a descriptor table keyed by `Name` or `compound_id`.
///
/// Every other column must hold a number in every row.
pub fn read_descriptor_table(path: &Path) -> Result<DescriptorTable, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let id_idx = headers
        .iter()
        .position(|h| h == DESCRIPTOR_NAME_ID)
        .or_else(|| headers.iter().position(|h| h == DESCRIPTOR_COMPOUND_ID))
        .ok_or_else(|| {
            schema(
                path,
                format!("missing id column '{DESCRIPTOR_NAME_ID}' or '{DESCRIPTOR_COMPOUND_ID}'"),
            )
        })?;
    let columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != id_idx)
        .collect();
    let mut table =
        DescriptorTable::new(columns.iter().map(|(_, name)| name.to_string()).collect())?;

    for (row, result) in reader.records().enumerate() {
        let fields = result?;
        let compound_id = fields
            .get(id_idx)
            .and_then(non_empty)
            .ok_or_else(|| schema(path, format!("row {row}: empty compound id")))?;
        let mut values = Vec::with_capacity(columns.len());
        for (idx, name) in &columns {
            let raw = fields.get(*idx).unwrap_or_default();
            values.push(parse_number(path, name, row, raw)?);
        }
        table.insert(compound_id, values)?;
    }
    Ok(table)
}

/// Write a model-ready matrix: feature columns followed by `pIC50`.
pub fn write_model_matrix(path: &Path, matrix: &DescriptorMatrix) -> Result<(), PipelineError> {
    let mut writer = create_writer(path)?;
    let mut header: Vec<&str> = matrix.feature_names.iter().map(String::as_str).collect();
    header.push(LOG_POTENCY);
    writer.write_record(&header)?;
    for row in &matrix.rows {
        let mut cells: Vec<String> = row.features.iter().map(f64::to_string).collect();
        cells.push(row.label.to_string());
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one comparison summary as a single-row table.
pub fn write_comparison(path: &Path, summary: &ComparisonSummary) -> Result<(), PipelineError> {
    let mut writer = create_writer(path)?;
    writer.serialize(summary)?;
    writer.flush()?;
    Ok(())
}

/// Read a single-row comparison table.
pub fn read_comparison(path: &Path) -> Result<ComparisonSummary, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<ComparisonSummary>()
        .next()
        .ok_or_else(|| schema(path, "comparison table has no rows"))?
        .map_err(|err| schema(path, err.to_string()))
}

/// Read `observed,predicted` pairs returned by an external trainer.
pub fn read_prediction_pairs(path: &Path) -> Result<(Vec<f64>, Vec<f64>), PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut observed = Vec::new();
    let mut predicted = Vec::new();
    for result in reader.deserialize::<PredictionRow>() {
        let row = result.map_err(|err| schema(path, err.to_string()))?;
        observed.push(row.observed);
        predicted.push(row.predicted);
    }
    Ok((observed, predicted))
}

/// Pretty-printed JSON document.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
