use std::collections::{BTreeSet, HashMap};

use crate::data::Record;

fn identity_key(record: &Record, field: &str) -> Option<String> {
    let value = record.get(field).filter(|value| !value.is_blank())?;
    Some(value.as_display().trim().to_lowercase())
}

/// Names (trimmed, lower-cased) that appear on more than one record. Blank
/// names are not counted.
pub fn find_duplicates(records: &[Record], field: &str) -> BTreeSet<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in records.iter().filter_map(|record| identity_key(record, field)) {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, _)| key)
        .collect()
}

pub fn is_duplicate(record: &Record, field: &str, duplicates: &BTreeSet<String>) -> bool {
    identity_key(record, field).is_some_and(|key| duplicates.contains(&key))
}
