//! Transformer: mapped record -> typed canonical record.
//!
//! Transformation is total. Every registry field gets a value, falling back
//! to the descriptor default (or an empty/absent value) whenever the input
//! cannot be coerced. It runs independently of validation, so a record the
//! validator rejects still shows what would be stored.

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    data::{FieldValue, Record},
    registry::{FieldDescriptor, FieldKind, OutOfRangePolicy, Registry},
};

const TRUTHY_TOKENS: &[&str] = &["true", "1", "yes", "y"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Flag(bool),
    List(Vec<String>),
    Nested(Option<Record>),
}

/// Typed record in registry field order, ready to hand to a data store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRecord {
    fields: Vec<(String, CanonicalValue)>,
}

impl CanonicalRecord {
    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(CanonicalValue::Text(text)) => text.as_deref(),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(CanonicalValue::Integer(value)) => *value,
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(CanonicalValue::Flag(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.get(key) {
            Some(CanonicalValue::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn nested(&self, key: &str) -> Option<&Record> {
        match self.get(key) {
            Some(CanonicalValue::Nested(value)) => value.as_ref(),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonicalValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

pub fn transform(record: &Record, registry: &Registry) -> CanonicalRecord {
    let fields = registry
        .fields()
        .iter()
        .map(|field| {
            let value = record.get(&field.key).filter(|value| !value.is_blank());
            (field.key.clone(), transform_field(field, value))
        })
        .collect();
    CanonicalRecord { fields }
}

pub fn transform_field(field: &FieldDescriptor, value: Option<&FieldValue>) -> CanonicalValue {
    match field.kind {
        FieldKind::String => {
            CanonicalValue::Text(value.or_else(|| default_value(field)).map(text_value))
        }
        FieldKind::Enum => CanonicalValue::Text(enum_value(field, value)),
        FieldKind::Number => CanonicalValue::Integer(integer_value(field, value)),
        FieldKind::Boolean => {
            CanonicalValue::Flag(value.or_else(|| default_value(field)).is_some_and(parse_bool))
        }
        FieldKind::Array => CanonicalValue::List(value.map(list_value).unwrap_or_default()),
        FieldKind::Object => CanonicalValue::Nested(value.map(nested_value)),
    }
}

/// Descriptor default standing in for an absent or blank value.
fn default_value(field: &FieldDescriptor) -> Option<&FieldValue> {
    field.default.as_ref().filter(|default| !default.is_blank())
}

fn text_value(value: &FieldValue) -> String {
    match value {
        FieldValue::String(text) => text.trim().to_string(),
        other => other.as_display(),
    }
}

fn enum_value(field: &FieldDescriptor, value: Option<&FieldValue>) -> Option<String> {
    value
        .and_then(|value| field.enum_option(&value.as_display()))
        .or_else(|| {
            field
                .default
                .as_ref()
                .and_then(|default| field.enum_option(&default.as_display()))
        })
        .map(str::to_string)
}

/// Numeric reading of a cell: numbers as is, strings parsed after trimming.
pub fn numeric_value(value: &FieldValue) -> Option<f64> {
    let number = match value {
        FieldValue::Number(n) => *n,
        FieldValue::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn integer_value(field: &FieldDescriptor, value: Option<&FieldValue>) -> Option<i64> {
    let fallback = field
        .default
        .as_ref()
        .and_then(numeric_value)
        .map(|n| n.trunc() as i64);
    let Some(number) = value.and_then(numeric_value) else {
        return fallback;
    };
    let parsed = number.trunc() as i64;
    if field.in_range(number) {
        return Some(parsed);
    }
    match field.out_of_range.unwrap_or_default() {
        OutOfRangePolicy::PassThrough => Some(parsed),
        OutOfRangePolicy::Clamp => {
            let lower = field.min.unwrap_or(i64::MIN);
            let upper = field.max.unwrap_or(i64::MAX);
            Some(parsed.clamp(lower, upper))
        }
        OutOfRangePolicy::Default => fallback,
    }
}

/// `true`, `1`, `yes` and `y` (any case) are true; every other string is
/// false. Non-zero numbers are true; lists and objects are false.
pub fn parse_bool(value: &FieldValue) -> bool {
    match value {
        FieldValue::Bool(flag) => *flag,
        FieldValue::String(text) => {
            let lowered = text.trim().to_ascii_lowercase();
            TRUTHY_TOKENS.contains(&lowered.as_str())
        }
        FieldValue::Number(n) => *n != 0.0,
        FieldValue::Null | FieldValue::Sequence(_) | FieldValue::Mapping(_) => false,
    }
}

fn list_item(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        FieldValue::String(text) => Some(text.clone()),
        other => Some(other.as_display()),
    }
}

/// Strict reading of text as a JSON list. `None` when the text is not one.
pub fn parse_list_literal(text: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<serde_json::Value>(text.trim()).ok()? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .map(FieldValue::from)
                .filter_map(|item| list_item(&item))
                .collect(),
        ),
        _ => None,
    }
}

/// Comma-separated fallback: pieces trimmed, empty pieces dropped.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn list_value(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::Sequence(items) => items.iter().filter_map(list_item).collect(),
        FieldValue::String(text) => parse_list_literal(text).unwrap_or_else(|| split_list(text)),
        other => list_item(other).into_iter().collect(),
    }
}

fn nested_value(value: &FieldValue) -> Record {
    match value {
        FieldValue::Mapping(record) => record.clone(),
        FieldValue::String(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(map)) => Record::from(map),
            _ => describe(value.clone()),
        },
        other => describe(other.clone()),
    }
}

fn describe(value: FieldValue) -> Record {
    let mut record = Record::new();
    record.insert("description", value);
    record
}
