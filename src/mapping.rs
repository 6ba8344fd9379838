//! Field Mapper: fuzzy suggestion of observed-to-canonical key mappings and
//! the rename pass that turns raw records into mapped records.

use std::collections::HashSet;

use log::debug;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{data::Record, error::ImportError, registry::Registry};

/// Observed field name -> canonical field key, in observed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    entries: Vec<(String, String)>,
}

/// A canonical key that more than one observed column resolves to.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MappingConflict {
    pub canonical: String,
    pub observed: Vec<String>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, observed: impl Into<String>, canonical: impl Into<String>) {
        let observed = observed.into();
        let canonical = canonical.into();
        match self.entries.iter_mut().find(|(k, _)| *k == observed) {
            Some((_, existing)) => *existing = canonical,
            None => self.entries.push((observed, canonical)),
        }
    }

    pub fn get(&self, observed: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == observed)
            .map(|(_, v)| v.as_str())
    }

    /// Key an observed field ends up under after the rename pass.
    pub fn resolve<'a>(&'a self, observed: &'a str) -> &'a str {
        self.get(observed).unwrap_or(observed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut mapping = FieldMapping::new();
        for (observed, canonical) in iter {
            mapping.insert(observed, canonical);
        }
        mapping
    }
}

impl Serialize for FieldMapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (observed, canonical) in &self.entries {
            map.serialize_entry(observed, canonical)?;
        }
        map.end()
    }
}

/// Lower-cases and strips `_`, ` ` and `-` so `Eye Color`, `eye_color` and
/// `eye-color` compare equal.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .collect()
}

fn fuzzy_match(observed: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    observed == candidate || observed.contains(candidate) || candidate.contains(observed)
}

/// Distinct keys across all records, in first-seen order.
pub fn detect_fields(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key) {
                fields.push(key.to_string());
            }
        }
    }
    fields
}

/// Proposes a canonical key for each observed key. The first registry field
/// whose normalized key or label equals, contains, or is contained in the
/// normalized observed key wins. Observed keys with no match are left out.
pub fn suggest_mapping(observed: &[String], registry: &Registry) -> FieldMapping {
    let mut mapping = FieldMapping::new();
    for key in observed {
        let normalized = normalize_key(key);
        if normalized.is_empty() {
            continue;
        }
        let matched = registry.fields().iter().find(|field| {
            fuzzy_match(&normalized, &normalize_key(&field.key))
                || fuzzy_match(&normalized, &normalize_key(&field.label))
        });
        if let Some(field) = matched {
            debug!("Suggesting '{key}' -> '{}'", field.key);
            mapping.insert(key.as_str(), field.key.as_str());
        }
    }
    mapping
}

/// Renames keys present in `mapping`, leaving every other key as is.
///
/// When two observed keys resolve to the same canonical key the later one
/// overwrites the earlier value. [`mapping_conflicts`] reports those cases.
pub fn apply_mapping(records: &[Record], mapping: &FieldMapping) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            record
                .iter()
                .map(|(key, value)| (mapping.resolve(key).to_string(), value.clone()))
                .collect::<Record>()
        })
        .collect()
}

/// Canonical keys targeted by more than one observed key, including keys
/// that pass through unmapped under a name another column is mapped to.
pub fn mapping_conflicts(observed: &[String], mapping: &FieldMapping) -> Vec<MappingConflict> {
    let mut conflicts: Vec<MappingConflict> = Vec::new();
    for key in observed {
        let target = mapping.resolve(key);
        match conflicts.iter_mut().find(|c| c.canonical == target) {
            Some(conflict) => conflict.observed.push(key.clone()),
            None => conflicts.push(MappingConflict {
                canonical: target.to_string(),
                observed: vec![key.clone()],
            }),
        }
    }
    conflicts.retain(|conflict| conflict.observed.len() > 1);
    conflicts
}

/// Parses an operator-supplied mapping: a JSON object of observed key to
/// canonical key. Every target must exist in the registry. An empty target
/// leaves that observed key unmapped.
pub fn parse_mapping_payload(text: &str, registry: &Registry) -> Result<FieldMapping, ImportError> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)
        .map_err(|err| ImportError::InvalidMappingPayload(err.to_string()))?;
    let mut mapping = FieldMapping::new();
    for (observed, target) in object {
        let canonical = target.as_str().ok_or_else(|| {
            ImportError::InvalidMappingPayload(format!(
                "target for '{observed}' must be a string, found {target}"
            ))
        })?;
        let canonical = canonical.trim();
        if canonical.is_empty() {
            continue;
        }
        if !registry.contains(canonical) {
            return Err(ImportError::InvalidMappingPayload(format!(
                "'{observed}' maps to unknown field '{canonical}'"
            )));
        }
        mapping.insert(observed, canonical);
    }
    Ok(mapping)
}
