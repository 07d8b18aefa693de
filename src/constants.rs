/// Constants used by the potency labeler.
pub mod labeling {
    /// Potency at or below this value (nM) is labeled `active`.
    pub const ACTIVE_MAX_NM: f64 = 1_000.0;
    /// Potency at or above this value (nM) is labeled `inactive`.
    pub const INACTIVE_MIN_NM: f64 = 10_000.0;
    /// Potency values are capped to this value (nM) before the log transform.
    pub const POTENCY_CAP_NM: f64 = 100_000_000.0;
    /// Nanomolar to molar conversion factor.
    pub const NANOMOLAR_TO_MOLAR: f64 = 1e-9;
    /// Wire label for active compounds.
    pub const CLASS_ACTIVE: &str = "active";
    /// Wire label for inactive compounds.
    pub const CLASS_INACTIVE: &str = "inactive";
    /// Wire label for intermediate compounds.
    pub const CLASS_INTERMEDIATE: &str = "intermediate";
}

/// Constants used by structure canonicalization.
pub mod structure {
    /// Delimiter separating disconnected fragments in a structure string.
    pub const FRAGMENT_DELIMITER: char = '.';
}

/// Column names for the delimited-text stage tables.
pub mod columns {
    /// Raw dump column holding the compound identifier.
    pub const RAW_COMPOUND_ID: &str = "molecule_chembl_id";
    /// Raw dump column holding the structure string.
    pub const RAW_STRUCTURE: &str = "canonical_smiles";
    /// Raw dump column holding the potency value (nM).
    pub const RAW_POTENCY: &str = "standard_value";
    /// Raw dump column holding the measurement type (for example `IC50`).
    pub const RAW_STANDARD_TYPE: &str = "standard_type";
    /// Raw dump column holding the target identifier.
    pub const RAW_TARGET_ID: &str = "target_chembl_id";
    /// Labeled-table column holding the log-scale potency; also the model label.
    pub const LOG_POTENCY: &str = "pIC50";
    /// Descriptor-engine output id column (PaDEL convention).
    pub const DESCRIPTOR_NAME_ID: &str = "Name";
    /// Alternative descriptor-table id column.
    pub const DESCRIPTOR_COMPOUND_ID: &str = "compound_id";
}

/// Constants used by the dataset assembler.
pub mod assembler {
    /// Default variance threshold: variance of a Bernoulli(0.8) indicator.
    pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 0.8 * (1.0 - 0.8);
    /// Default fraction of rows assigned to the train partition.
    pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;
    /// Default fraction of rows assigned to the test partition.
    pub const DEFAULT_TEST_RATIO: f64 = 0.2;
    /// Default seed for the train/test shuffle.
    pub const DEFAULT_SEED: u64 = 42;
    /// Tolerance used when validating that split ratios sum to one.
    pub const RATIO_EPSILON: f64 = 1e-6;
}

/// Constants used by the two-group statistical comparator.
pub mod comparator {
    /// Default significance level.
    pub const DEFAULT_ALPHA: f64 = 0.05;
    /// Minimum observations required in each group.
    pub const MIN_GROUP_SIZE: usize = 2;
    /// Largest size of the smaller group that still uses the exact null distribution.
    pub const EXACT_MAX_SMALLER_GROUP: usize = 8;
    /// Interpretation reported when the null hypothesis is not rejected.
    pub const SAME_DISTRIBUTION: &str = "Same distribution (fail to reject H0)";
    /// Interpretation reported when the null hypothesis is rejected.
    pub const DIFFERENT_DISTRIBUTION: &str = "Different distribution (reject H0)";
}

/// Checkpoint file naming for persisted stage tables.
pub mod checkpoints {
    /// Suffix of the raw bioactivity dump.
    pub const RAW: &str = "01_bioactivity_data_raw.csv";
    /// Suffix of the cleaned and deduplicated table.
    pub const PREPROCESSED: &str = "02_bioactivity_data_preprocessed.csv";
    /// Suffix of the curated table (id, canonical structure, potency).
    pub const CURATED: &str = "03_bioactivity_data_curated.csv";
    /// Suffix of the 3-class labeled table.
    pub const THREE_CLASS: &str = "04_bioactivity_data_3class_pIC50.csv";
    /// Suffix of the 2-class labeled table.
    pub const TWO_CLASS: &str = "05_bioactivity_data_2class_pIC50.csv";
    /// Suffix of the model-ready matrix.
    pub const MODEL_MATRIX: &str = "06_bioactivity_data_3class_pIC50_fp.csv";
    /// Suffix of the train partition.
    pub const TRAIN: &str = "07_train.csv";
    /// Suffix of the test partition.
    pub const TEST: &str = "08_test.csv";
    /// Suffix of the JSON run report.
    pub const REPORT: &str = "report.json";
    /// Prefix of per-descriptor comparison summaries.
    pub const COMPARISON_PREFIX: &str = "mannwhitneyu_";
    /// Descriptor-engine input file (structure TAB id, no header).
    pub const DESCRIPTOR_INPUT: &str = "molecule.smi";
    /// Default descriptor-engine output file.
    pub const DESCRIPTOR_OUTPUT: &str = "descriptor_output.csv";
    /// Default file name prefix when no target name is configured.
    pub const DEFAULT_TARGET_NAME: &str = "target";
}

/// Constants used by source collaborators.
pub mod source {
    /// Default measurement type kept by the fetcher.
    pub const DEFAULT_STANDARD_TYPE: &str = "IC50";
    /// Collaborator id of the CSV dump source.
    pub const CSV_DUMP_SOURCE_ID: &str = "bioactivity_dump";
    /// Collaborator id of the in-memory source.
    pub const IN_MEMORY_SOURCE_ID: &str = "in_memory";
}
