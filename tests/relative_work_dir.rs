//! Runs from a changed working directory, so it lives in its own test binary.
#![cfg(unix)]

use std::env;
use std::fs;

use tempfile::tempdir;

use potency::{CommandDescriptorEngine, DescriptorEngine, LabeledRecord, PotencyClass};

fn record(id: &str, structure: &str) -> LabeledRecord {
    LabeledRecord {
        compound_id: id.to_string(),
        structure: structure.to_string(),
        potency_value: 100.0,
        potency_class: PotencyClass::Active,
        log_potency: 7.0,
    }
}

#[test]
fn command_engine_runs_with_relative_work_dir() {
    let temp = tempdir().unwrap();
    env::set_current_dir(temp.path()).unwrap();

    let script = "awk -F'\\t' 'BEGIN { print \"Name,length\" } \
                  { print $2 \",\" length($1) }' {input} > {output}";
    let engine = CommandDescriptorEngine::new("sh", "out").with_args(["-c", script]);
    let table = engine
        .compute(&[record("A", "CCO"), record("B", "CCCCN")])
        .unwrap();

    assert_eq!(table.names(), ["length".to_string()]);
    assert_eq!(table.get("A"), Some(&[3.0][..]));
    assert_eq!(table.get("B"), Some(&[5.0][..]));
    assert!(fs::metadata(temp.path().join("out").join("molecule.smi")).is_ok());
    assert!(!temp.path().join("out").join("out").exists());
}
