//! Stage orchestration.
//!
//! Fetch → clean → canonicalize → label → descriptors → join → compare →
//! assemble. Each stage consumes the previous stage's output by value or
//! reference; no stage sees data it was not handed. Stage tables are
//! persisted as checkpoints under `output_dir`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::assembler::assemble;
use crate::canonical::canonicalize;
use crate::cleaner::clean;
use crate::comparator::{ComparisonSummary, compare_descriptors};
use crate::config::PipelineConfig;
use crate::constants::checkpoints::{
    CURATED, MODEL_MATRIX, PREPROCESSED, RAW, REPORT, TEST, THREE_CLASS, TRAIN, TWO_CLASS,
};
use crate::constants::columns::LOG_POTENCY;
use crate::data::MissingField;
use crate::descriptors::{DescriptorEngine, DescriptorMatrix, join};
use crate::errors::PipelineError;
use crate::labeler::{class_counts, label, two_class};
use crate::metrics::{ClassBalance, Summary, class_balance, describe};
use crate::source::BioactivitySource;
use crate::transport::fs::{
    checkpoint_path, comparison_path, write_comparison, write_curated, write_labeled,
    write_model_matrix, write_raw_dump, write_report,
};
use crate::types::{CollaboratorId, CompoundId, DescriptorName};

/// Row counts after each stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    /// Records returned by the source.
    pub fetched: usize,
    /// Records kept by the cleaner.
    pub cleaned: usize,
    /// Rows in the 3-class table.
    pub labeled: usize,
    /// Rows in the 2-class table.
    pub two_class: usize,
    /// Rows in the joined descriptor matrix.
    pub joined: usize,
    /// Descriptor columns left after the variance filter.
    pub features_kept: usize,
    /// Training rows.
    pub train: usize,
    /// Test rows.
    pub test: usize,
}

/// A comparison that could not be computed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedComparison {
    /// Column that was requested.
    pub descriptor: DescriptorName,
    /// Error message.
    pub reason: String,
}

/// Summary of one pipeline run, persisted as `<target>_report.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Target name used as the file prefix.
    pub target_name: String,
    /// Id of the bioactivity source.
    pub source: CollaboratorId,
    /// Id of the descriptor engine.
    pub descriptor_engine: CollaboratorId,
    /// Run start (UTC).
    pub started_at: DateTime<Utc>,
    /// Run end (UTC).
    pub finished_at: DateTime<Utc>,
    /// Row counts per stage.
    pub counts: StageCounts,
    /// Records dropped for a null field, with the field.
    pub dropped_missing: Vec<(CompoundId, MissingField)>,
    /// Records dropped as repeated structures.
    pub dropped_duplicates: usize,
    /// Records whose potency had no log value (skip policy only).
    pub rejected_potency: Vec<(CompoundId, f64)>,
    /// Columns dropped by the variance filter.
    pub removed_columns: Vec<DescriptorName>,
    /// Class distribution of the 2-class table.
    pub class_balance: Option<ClassBalance>,
    /// `pIC50` statistics of the 3-class table.
    pub log_potency_summary: Option<Summary>,
    /// Comparisons that completed.
    pub comparisons: Vec<ComparisonSummary>,
    /// Comparisons that were skipped.
    pub skipped_comparisons: Vec<SkippedComparison>,
    /// Every file written during the run, in write order.
    pub outputs: Vec<PathBuf>,
}

/// Runs the stages in order with one configuration.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate `config` and build a pipeline.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Validated configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn stage_path(&self, suffix: &str) -> PathBuf {
        checkpoint_path(&self.config.output_dir, &self.config.target_name, suffix)
    }

    /// Execute every stage and write the run report.
    ///
    /// Any stage error aborts the run; per-descriptor comparison failures are
    /// recorded in the report instead.
    pub fn run(
        &self,
        source: &dyn BioactivitySource,
        engine: &dyn DescriptorEngine,
    ) -> Result<PipelineReport, PipelineError> {
        let started_at = Utc::now();
        let config = &self.config;
        fs::create_dir_all(&config.output_dir)?;
        let checkpoints = config.write_checkpoints;
        let mut outputs = Vec::new();
        let mut counts = StageCounts::default();

        let raw = source.fetch(&config.query)?;
        counts.fetched = raw.len();
        info!(source = source.id(), records = raw.len(), "fetched bioactivity data");
        if checkpoints {
            let path = self.stage_path(RAW);
            write_raw_dump(&path, &raw)?;
            outputs.push(path);
        }

        let cleaned = clean(&raw, config.missing_data)?;
        info!(
            kept = cleaned.records.len(),
            dropped_missing = cleaned.dropped_missing.len(),
            dropped_duplicates = cleaned.dropped_duplicates,
            "cleaned records"
        );
        if checkpoints {
            let path = self.stage_path(PREPROCESSED);
            write_curated(&path, &cleaned.records)?;
            outputs.push(path);
        }

        let curated = canonicalize(cleaned.records);
        counts.cleaned = curated.len();
        if checkpoints {
            let path = self.stage_path(CURATED);
            write_curated(&path, &curated)?;
            outputs.push(path);
        }

        let labeled = label(&curated, &config.labeling, config.invalid_potency)?;
        if !labeled.rejected.is_empty() {
            warn!(
                rejected = labeled.rejected.len(),
                "skipped records outside the log-potency domain"
            );
        }
        let three_class = labeled.records;
        counts.labeled = three_class.len();
        let log_potency_summary =
            describe(&three_class.iter().map(|r| r.log_potency).collect::<Vec<_>>());
        if checkpoints {
            let path = self.stage_path(THREE_CLASS);
            write_labeled(&path, &three_class)?;
            outputs.push(path);
        }

        let binary = two_class(&three_class);
        counts.two_class = binary.len();
        let balance = class_balance(&class_counts(&binary));
        info!(
            labeled = three_class.len(),
            two_class = binary.len(),
            "labeled records"
        );
        if checkpoints {
            let path = self.stage_path(TWO_CLASS);
            write_labeled(&path, &binary)?;
            outputs.push(path);
        }

        let descriptors = engine.compute(&three_class)?;
        info!(
            engine = engine.id(),
            compounds = descriptors.len(),
            columns = descriptors.names().len(),
            "computed descriptors"
        );
        let matrix = join(&three_class, &descriptors)?;
        counts.joined = matrix.len();

        let (comparisons, skipped_comparisons) =
            self.compare_classes(&matrix.two_class(), &mut outputs);

        let dataset = assemble(&matrix, config.variance_threshold, config.split, config.seed)?;
        counts.features_kept = dataset.matrix.feature_names.len();
        counts.train = dataset.split.train.len();
        counts.test = dataset.split.test.len();
        info!(
            removed_columns = dataset.removed_columns.len(),
            kept_columns = counts.features_kept,
            train = counts.train,
            test = counts.test,
            "assembled model dataset"
        );
        for (suffix, table) in [
            (MODEL_MATRIX, &dataset.matrix),
            (TRAIN, &dataset.split.train),
            (TEST, &dataset.split.test),
        ] {
            let path = self.stage_path(suffix);
            write_model_matrix(&path, table)?;
            outputs.push(path);
        }

        let report_path = self.stage_path(REPORT);
        outputs.push(report_path.clone());
        let report = PipelineReport {
            target_name: config.target_name.clone(),
            source: source.id().to_string(),
            descriptor_engine: engine.id().to_string(),
            started_at,
            finished_at: Utc::now(),
            counts,
            dropped_missing: cleaned.dropped_missing,
            dropped_duplicates: cleaned.dropped_duplicates,
            rejected_potency: labeled.rejected,
            removed_columns: dataset.removed_columns,
            class_balance: balance,
            log_potency_summary,
            comparisons,
            skipped_comparisons,
            outputs,
        };
        write_report(&report_path, &report)?;
        info!(path = %report_path.display(), "wrote run report");
        Ok(report)
    }

    /// Active-versus-inactive comparison for each configured column.
    fn compare_classes(
        &self,
        matrix: &DescriptorMatrix,
        outputs: &mut Vec<PathBuf>,
    ) -> (Vec<ComparisonSummary>, Vec<SkippedComparison>) {
        let names = if self.config.comparison_descriptors.is_empty() {
            std::iter::once(LOG_POTENCY.to_string())
                .chain(matrix.feature_names.iter().cloned())
                .collect()
        } else {
            self.config.comparison_descriptors.clone()
        };

        let mut comparisons = Vec::new();
        let mut skipped = Vec::new();
        for (descriptor, result) in compare_descriptors(matrix, &names, self.config.alpha) {
            match result {
                Ok(summary) => {
                    let path = comparison_path(&self.config.output_dir, &descriptor);
                    if let Err(err) = write_comparison(&path, &summary) {
                        warn!(descriptor = %descriptor, error = %err, "skipping comparison");
                        skipped.push(SkippedComparison {
                            descriptor,
                            reason: err.to_string(),
                        });
                        continue;
                    }
                    debug!(
                        descriptor = %descriptor,
                        statistic = summary.statistic,
                        p = summary.p_value,
                        verdict = %summary.interpretation,
                        "compared classes"
                    );
                    outputs.push(path);
                    comparisons.push(summary);
                }
                Err(err) => {
                    warn!(descriptor = %descriptor, error = %err, "skipping comparison");
                    skipped.push(SkippedComparison {
                        descriptor,
                        reason: err.to_string(),
                    });
                }
            }
        }
        info!(
            compared = comparisons.len(),
            skipped = skipped.len(),
            "compared active and inactive classes"
        );
        (comparisons, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::columns::{RAW_STANDARD_TYPE, RAW_TARGET_ID};
    use crate::data::{CompoundRecord, LabeledRecord, PotencyClass};
    use crate::descriptors::DescriptorTable;
    use crate::source::InMemorySource;
    use tempfile::tempdir;

    struct IndexDescriptors;

    impl DescriptorEngine for IndexDescriptors {
        fn id(&self) -> &str {
            "index"
        }

        fn compute(&self, records: &[LabeledRecord]) -> Result<DescriptorTable, PipelineError> {
            let mut table = DescriptorTable::new(vec!["potency_rank".into(), "flat".into()])?;
            for (idx, record) in records.iter().enumerate() {
                let rank = if record.potency_class == PotencyClass::Active {
                    idx as f64
                } else {
                    100.0 + idx as f64
                };
                table.insert(record.compound_id.clone(), vec![rank, 1.0])?;
            }
            Ok(table)
        }
    }

    fn fixture() -> Vec<CompoundRecord> {
        let mut records = Vec::new();
        for idx in 0..6 {
            records.push(CompoundRecord::new(
                format!("ACT{idx}"),
                Some(&format!("C{}N.Cl", "C".repeat(idx))),
                Some(10.0 + idx as f64),
            ));
            records.push(CompoundRecord::new(
                format!("INA{idx}"),
                Some(&format!("O{}O", "C".repeat(idx))),
                Some(20_000.0 + idx as f64),
            ));
        }
        records.push(CompoundRecord::new("MID", Some("CCS"), Some(5_000.0)));
        records.push(CompoundRecord::new("NULL", None, Some(5.0)));
        records.push(CompoundRecord::new("DUP", Some("CN.Cl"), Some(1.0)));
        let mut other = CompoundRecord::new("KI", Some("CCCl"), Some(3.0));
        other
            .metadata
            .insert(RAW_STANDARD_TYPE.to_string(), "Ki".to_string());
        other
            .metadata
            .insert(RAW_TARGET_ID.to_string(), "CHEMBL220".to_string());
        records.push(other);
        records
    }

    #[test]
    fn run_threads_stage_outputs_and_writes_checkpoints() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            target_name: "ache".into(),
            output_dir: temp.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let report = pipeline
            .run(&InMemorySource::new(fixture()), &IndexDescriptors)
            .unwrap();

        assert_eq!(report.counts.fetched, 15);
        assert_eq!(report.dropped_missing, vec![("NULL".to_string(), MissingField::Structure)]);
        assert_eq!(report.dropped_duplicates, 1);
        assert_eq!(report.counts.labeled, 13);
        assert_eq!(report.counts.two_class, 12);
        assert_eq!(report.counts.joined, 13);
        assert_eq!(report.removed_columns, vec!["flat"]);
        assert_eq!(report.counts.train + report.counts.test, 13);
        assert_eq!(report.counts.test, 3);

        let compared: Vec<&str> = report.comparisons.iter().map(|c| c.descriptor.as_str()).collect();
        assert_eq!(compared, vec!["pIC50", "potency_rank", "flat"]);
        assert!(report.skipped_comparisons.is_empty());

        for suffix in [RAW, PREPROCESSED, CURATED, THREE_CLASS, TWO_CLASS, MODEL_MATRIX, TRAIN, TEST, REPORT] {
            assert!(temp.path().join(format!("ache_{suffix}")).is_file(), "{suffix}");
        }
        assert!(temp.path().join("mannwhitneyu_pIC50.csv").is_file());
        assert_eq!(report.outputs.last(), Some(&temp.path().join("ache_report.json")));
    }

    #[test]
    fn unknown_comparison_columns_are_skipped_not_fatal() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: temp.path().to_path_buf(),
            write_checkpoints: false,
            comparison_descriptors: vec!["pIC50".into(), "nonexistent".into()],
            ..PipelineConfig::default()
        };
        let report = Pipeline::new(config)
            .unwrap()
            .run(&InMemorySource::new(fixture()), &IndexDescriptors)
            .unwrap();
        assert_eq!(report.comparisons.len(), 1);
        assert_eq!(report.skipped_comparisons[0].descriptor, "nonexistent");
        assert!(!temp.path().join("target_01_bioactivity_data_raw.csv").exists());
        assert!(temp.path().join("target_07_train.csv").is_file());
    }

    struct SlashedNameDescriptors;

    impl DescriptorEngine for SlashedNameDescriptors {
        fn id(&self) -> &str {
            "slashed"
        }

        fn compute(&self, records: &[LabeledRecord]) -> Result<DescriptorTable, PipelineError> {
            let mut table = DescriptorTable::new(vec!["MW/HBD".into()])?;
            for (idx, record) in records.iter().enumerate() {
                table.insert(record.compound_id.clone(), vec![idx as f64])?;
            }
            Ok(table)
        }
    }

    #[test]
    fn path_characters_in_descriptor_names_do_not_abort_the_run() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: temp.path().to_path_buf(),
            write_checkpoints: false,
            ..PipelineConfig::default()
        };
        let report = Pipeline::new(config)
            .unwrap()
            .run(&InMemorySource::new(fixture()), &SlashedNameDescriptors)
            .unwrap();
        let compared: Vec<&str> = report.comparisons.iter().map(|c| c.descriptor.as_str()).collect();
        assert_eq!(compared, vec!["pIC50", "MW/HBD"]);
        assert!(report.skipped_comparisons.is_empty());
        assert!(temp.path().join("mannwhitneyu_MW_HBD.csv").is_file());
    }
}
