//! Structure canonicalization: keep the longest disconnected fragment.
//!
//! Salts and counter-ions are written as extra `.`-separated fragments; the
//! parent compound is taken to be the longest one.

use crate::constants::structure::FRAGMENT_DELIMITER;
use crate::data::CuratedRecord;

/// Longest `.`-delimited fragment of `structure` by character count.
///
/// Ties go to the first fragment. Total over all strings: `""` yields `""`.
pub fn longest_fragment(structure: &str) -> &str {
    let mut best = "";
    let mut best_len = 0usize;
    for (idx, fragment) in structure.split(FRAGMENT_DELIMITER).enumerate() {
        let len = fragment.chars().count();
        if idx == 0 || len > best_len {
            best = fragment;
            best_len = len;
        }
    }
    best
}

/// Replace each record's structure with its longest fragment.
pub fn canonicalize(records: Vec<CuratedRecord>) -> Vec<CuratedRecord> {
    records
        .into_iter()
        .map(|mut record| {
            let canonical = longest_fragment(&record.structure);
            if canonical.len() != record.structure.len() {
                record.structure = canonical.to_string();
            }
            record
        })
        .collect()
}
