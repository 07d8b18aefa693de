use std::collections::HashSet;

use potency::assembler::train_test_split;
use potency::canonical::longest_fragment;
use potency::cleaner::clean;
use potency::comparator::{Verdict, compare};
use potency::descriptors::join;
use potency::labeler::{classify, label, log_potency};
use potency::{
    CompoundRecord, CuratedRecord, DescriptorMatrix, DescriptorTable, LabelingConfig,
    LabeledRecord, MatrixRow, PipelineError, PotencyClass, RecordPolicy, SplitRatios,
};

fn raw(id: &str, structure: Option<&str>, potency: Option<f64>) -> CompoundRecord {
    CompoundRecord::new(id, structure, potency)
}

fn labeled(id: &str, potency: f64) -> LabeledRecord {
    let config = LabelingConfig::default();
    LabeledRecord {
        compound_id: id.to_string(),
        structure: "CCO".to_string(),
        potency_value: potency,
        potency_class: classify(potency, &config),
        log_potency: log_potency(id, potency, &config).unwrap(),
    }
}

#[test]
fn class_is_a_pure_function_of_potency() {
    let config = LabelingConfig::default();
    let cases = [
        (0.1, PotencyClass::Active),
        (1_000.0, PotencyClass::Active),
        (1_000.0001, PotencyClass::Intermediate),
        (5_000.0, PotencyClass::Intermediate),
        (9_999.9999, PotencyClass::Intermediate),
        (10_000.0, PotencyClass::Inactive),
        (1e9, PotencyClass::Inactive),
    ];
    for (value, expected) in cases {
        assert_eq!(classify(value, &config), expected, "potency {value}");
        assert_eq!(classify(value, &config), classify(value, &config));
    }
}

#[test]
fn potency_above_cap_is_clamped_not_dropped() {
    let config = LabelingConfig::default();
    let records = vec![CuratedRecord {
        compound_id: "HUGE".into(),
        structure: "CCCC".into(),
        potency_value: 2e8,
    }];
    let outcome = label(&records, &config, RecordPolicy::Fail).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert!((outcome.records[0].log_potency - 1.0).abs() < 1e-12);
    assert_eq!(outcome.records[0].potency_value, 2e8);
}

#[test]
fn cleaner_is_idempotent_and_first_occurrence_wins() {
    let input = vec![
        raw("A", Some("CCO"), Some(10.0)),
        raw("B", Some("CCO"), Some(20.0)),
        raw("C", Some("CCN"), Some(30.0)),
        raw("D", None, Some(40.0)),
        raw("E", Some("CCC"), None),
    ];
    let once = clean(&input, RecordPolicy::Skip).unwrap();
    let kept: Vec<(&str, &str)> = once
        .records
        .iter()
        .map(|r| (r.compound_id.as_str(), r.structure.as_str()))
        .collect();
    assert_eq!(kept, vec![("A", "CCO"), ("C", "CCN")]);

    let as_raw: Vec<CompoundRecord> = once.records.iter().cloned().map(Into::into).collect();
    let twice = clean(&as_raw, RecordPolicy::Skip).unwrap();
    assert_eq!(twice.records, once.records);
    assert!(twice.dropped_missing.is_empty());
    assert_eq!(twice.dropped_duplicates, 0);

    assert!(clean(&[], RecordPolicy::Fail).unwrap().records.is_empty());
}

#[test]
fn canonical_structure_is_longest_fragment() {
    assert_eq!(longest_fragment("CCO.CC"), "CCO");
    assert_eq!(longest_fragment("C.CC.CCC"), "CCC");
    assert_eq!(longest_fragment(""), "");
    assert_eq!(longest_fragment("CC.OO"), "CC");
}

#[test]
fn join_requires_exactly_one_descriptor_row_per_label() {
    let records = vec![labeled("A", 10.0), labeled("B", 50_000.0)];
    let mut table = DescriptorTable::new(vec!["MW".into()]).unwrap();
    table.insert("A", vec![46.07]).unwrap();

    let err = join(&records, &table).unwrap_err();
    assert!(matches!(
        &err,
        PipelineError::JoinMismatch { missing_descriptors, missing_labels }
            if missing_descriptors == &vec!["B".to_string()] && missing_labels.is_empty()
    ));
    assert!(err.to_string().contains("\"B\""));

    table.insert("B", vec![60.1]).unwrap();
    let matrix = join(&records, &table).unwrap();
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix.rows[1].potency_class, PotencyClass::Inactive);

    assert!(matches!(
        table.insert("B", vec![61.0]),
        Err(PipelineError::DuplicateKey { .. })
    ));
}

#[test]
fn split_is_exhaustive_exclusive_and_seeded() {
    let matrix = DescriptorMatrix {
        feature_names: vec!["x".into()],
        rows: (0..57)
            .map(|idx| MatrixRow {
                compound_id: format!("C{idx}"),
                potency_class: PotencyClass::Active,
                features: vec![idx as f64],
                label: idx as f64 / 10.0,
            })
            .collect(),
    };
    let ids = |m: &DescriptorMatrix| -> Vec<String> {
        m.rows.iter().map(|r| r.compound_id.clone()).collect()
    };

    let first = train_test_split(&matrix, SplitRatios::default(), 7).unwrap();
    let train: HashSet<String> = ids(&first.train).into_iter().collect();
    let test: HashSet<String> = ids(&first.test).into_iter().collect();
    assert_eq!(first.train.len() + first.test.len(), 57);
    assert!(train.is_disjoint(&test));
    assert_eq!(train.union(&test).count(), 57);
    assert_eq!(first.train.feature_names, first.test.feature_names);

    let again = train_test_split(&matrix, SplitRatios::default(), 7).unwrap();
    assert_eq!(ids(&again.test), ids(&first.test));

    let other = train_test_split(&matrix, SplitRatios::default(), 8).unwrap();
    assert_ne!(ids(&other.test), ids(&first.test));
}

#[test]
fn comparator_verdicts_follow_overlap() {
    let sample: Vec<f64> = (0..30).map(|v| (v % 7) as f64).collect();
    let same = compare("MW", &sample, &sample, 0.05).unwrap();
    assert!(same.p_value > 0.99);
    assert_eq!(same.interpretation, Verdict::SameDistribution);

    let low: Vec<f64> = (0..15).map(|v| v as f64).collect();
    let high: Vec<f64> = (0..15).map(|v| 100.0 + v as f64).collect();
    let different = compare("MW", &low, &high, 0.05).unwrap();
    assert_eq!(different.interpretation, Verdict::DifferentDistribution);
    assert_eq!(different.descriptor, "MW");
    assert_eq!(different.alpha, 0.05);

    assert!(matches!(
        compare("MW", &[1.0], &high, 0.05),
        Err(PipelineError::DegenerateInput(_))
    ));
}
