#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners shared by the binaries.
pub mod apps;
/// Variance filtering and the train/test split.
pub mod assembler;
/// Longest-fragment structure canonicalization.
pub mod canonical;
/// Completeness and duplicate filtering of raw records.
pub mod cleaner;
/// Two-group Mann-Whitney U comparator.
pub mod comparator;
/// Pipeline configuration types.
pub mod config;
/// Centralized thresholds, column names, and checkpoint names.
pub mod constants;
/// Stage record types.
pub mod data;
/// Descriptor tables, descriptor engines, and the descriptor join.
pub mod descriptors;
/// Potency classes and log-scale potency.
pub mod labeler;
/// Summary statistics, class balance, and regression scores.
pub mod metrics;
/// Stage orchestration and the run report.
pub mod pipeline;
/// Bioactivity source traits and built-in sources.
pub mod source;
/// Split ratios and seeded index partitioning.
pub mod splits;
/// Table IO (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{LabelingConfig, PipelineConfig, RecordPolicy};
pub use data::{CompoundRecord, CuratedRecord, LabeledRecord, MissingField, PotencyClass};
pub use descriptors::{
    CommandDescriptorEngine, DescriptorEngine, DescriptorMatrix, DescriptorTable, MatrixRow,
    PrecomputedDescriptors,
};
pub use errors::PipelineError;
pub use pipeline::{Pipeline, PipelineReport};
pub use source::{BioactivitySource, CsvDumpSource, InMemorySource, TargetQuery};
pub use splits::{SplitLabel, SplitRatios};
pub use types::{CollaboratorId, ColumnName, CompoundId, DescriptorName, Structure, TargetId};
