//! Cleaner stage: drop incomplete records and deduplicate by structure.

use std::collections::HashSet;

use crate::config::RecordPolicy;
use crate::data::{CompoundRecord, CuratedRecord, MissingField};
use crate::errors::PipelineError;
use crate::types::CompoundId;

/// Stage name reported in `MissingData` errors.
pub const STAGE: &str = "cleaner";

/// Result of one cleaner pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CleanOutcome {
    /// Surviving records in input order.
    pub records: Vec<CuratedRecord>,
    /// Records dropped for a null required field.
    pub dropped_missing: Vec<(CompoundId, MissingField)>,
    /// Records dropped because an earlier record had the same structure.
    pub dropped_duplicates: usize,
}

/// Drop records with a null potency or structure, then keep the first record
/// for each distinct structure string.
///
/// Input order is preserved. Under [`RecordPolicy::Fail`] the first record
/// with a null field aborts the pass with `MissingData`.
pub fn clean(
    records: &[CompoundRecord],
    policy: RecordPolicy,
) -> Result<CleanOutcome, PipelineError> {
    let mut outcome = CleanOutcome::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());

    for record in records {
        let (Some(structure), Some(potency_value)) =
            (record.structure.as_deref(), record.potency_value)
        else {
            let field = record
                .missing_field()
                .unwrap_or(MissingField::PotencyValue);
            if policy == RecordPolicy::Fail {
                return Err(PipelineError::MissingData {
                    compound_id: record.compound_id.clone(),
                    field,
                    stage: STAGE,
                });
            }
            outcome
                .dropped_missing
                .push((record.compound_id.clone(), field));
            continue;
        };

        if !seen.insert(structure) {
            outcome.dropped_duplicates += 1;
            continue;
        }
        outcome.records.push(CuratedRecord {
            compound_id: record.compound_id.clone(),
            structure: structure.to_string(),
            potency_value,
        });
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, structure: Option<&str>, potency: Option<f64>) -> CompoundRecord {
        CompoundRecord::new(id, structure, potency)
    }

    #[test]
    fn first_occurrence_wins_on_duplicate_structures() {
        let input = vec![
            record("A", Some("CCO"), Some(10.0)),
            record("B", Some("CCO"), Some(20.0)),
            record("C", Some("CCN"), Some(30.0)),
        ];
        let outcome = clean(&input, RecordPolicy::Skip).unwrap();
        let kept: Vec<(&str, &str)> = outcome
            .records
            .iter()
            .map(|r| (r.compound_id.as_str(), r.structure.as_str()))
            .collect();
        assert_eq!(kept, vec![("A", "CCO"), ("C", "CCN")]);
        assert_eq!(outcome.dropped_duplicates, 1);
        assert!(outcome.dropped_missing.is_empty());
    }

    #[test]
    fn nulls_are_dropped_before_deduplication() {
        let input = vec![
            record("A", Some("CCO"), None),
            record("B", None, Some(5.0)),
            record("C", Some("CCO"), Some(7.0)),
        ];
        let outcome = clean(&input, RecordPolicy::Skip).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].compound_id, "C");
        assert_eq!(
            outcome.dropped_missing,
            vec![
                ("A".to_string(), MissingField::PotencyValue),
                ("B".to_string(), MissingField::Structure),
            ]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let outcome = clean(&[], RecordPolicy::Fail).unwrap();
        assert_eq!(outcome, CleanOutcome::default());
    }

    #[test]
    fn fail_policy_reports_the_offending_record() {
        let input = vec![
            record("A", Some("CCO"), Some(1.0)),
            record("B", None, Some(2.0)),
        ];
        let err = clean(&input, RecordPolicy::Fail).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingData { compound_id, field: MissingField::Structure, stage }
                if compound_id == "B" && stage == STAGE
        ));
    }

    #[test]
    fn cleaning_twice_is_the_same_as_once() {
        let input = vec![
            record("A", Some("CCO"), Some(10.0)),
            record("B", Some("CCO"), Some(20.0)),
            record("C", None, Some(30.0)),
            record("D", Some("c1ccccc1"), Some(40.0)),
        ];
        let once = clean(&input, RecordPolicy::Skip).unwrap().records;
        let again_input: Vec<CompoundRecord> = once.iter().cloned().map(Into::into).collect();
        let twice = clean(&again_input, RecordPolicy::Skip).unwrap().records;
        assert_eq!(once, twice);
    }
}
