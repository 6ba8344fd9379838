//! Per-record validation against the registry.
//!
//! Errors make a record unimportable; warnings flag values the transformer
//! will coerce or replace. Keys the registry does not know are ignored.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::{FieldValue, Record},
    registry::{FieldDescriptor, FieldKind, Registry},
    transform::{numeric_value, parse_list_literal},
};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

pub fn validate(record: &Record, registry: &Registry) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for field in registry.fields() {
        let value = record.get(&field.key).filter(|value| !value.is_blank());
        let Some(value) = value else {
            if field.required {
                errors.push(format!("{} is required", field.label));
            }
            continue;
        };
        if let Some(warning) = check_value(field, value) {
            warnings.push(warning);
        }
    }

    ValidationResult::from_findings(errors, warnings)
}

fn check_value(field: &FieldDescriptor, value: &FieldValue) -> Option<String> {
    match field.kind {
        FieldKind::Number => {
            let acceptable = numeric_value(value).is_some_and(|number| field.in_range(number));
            (!acceptable).then(|| format!("{} should be {}", field.label, describe_number(field)))
        }
        FieldKind::Enum => {
            let known = match value {
                FieldValue::String(text) => field.enum_option(text).is_some(),
                _ => false,
            };
            (!known).then(|| {
                let options = field.enum_options.iter().flatten().join(", ");
                format!("{} should be one of: {options}", field.label)
            })
        }
        FieldKind::Array => match value {
            FieldValue::String(text) if parse_list_literal(text).is_none() => Some(format!(
                "{} should be a JSON list or comma-separated text",
                field.label
            )),
            _ => None,
        },
        FieldKind::String => (!value.is_scalar())
            .then(|| format!("{} should be text, not a list or object", field.label)),
        FieldKind::Object | FieldKind::Boolean => None,
    }
}

fn describe_number(field: &FieldDescriptor) -> String {
    match (field.min, field.max) {
        (Some(min), Some(max)) => format!("a number between {min} and {max}"),
        (Some(min), None) => format!("a number of at least {min}"),
        (None, Some(max)) => format!("a number of at most {max}"),
        (None, None) => "a number".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn missing_or_blank_name_is_an_error() {
        let registry = Registry::builtin();
        for candidate in [record(&[]), record(&[("name", FieldValue::from("   "))])] {
            let result = validate(&candidate, &registry);
            assert!(!result.is_valid);
            assert_eq!(result.errors, vec!["Name is required".to_string()]);
        }
    }

    #[test]
    fn importance_level_outside_range_or_non_numeric_warns() {
        let registry = Registry::builtin();
        for raw in ["15", "0", "high", "10.5"] {
            let result = validate(
                &record(&[
                    ("name", FieldValue::from("Ari")),
                    ("importance_level", FieldValue::from(raw)),
                ]),
                &registry,
            );
            assert!(result.is_valid, "{raw}");
            assert_eq!(
                result.warnings,
                vec!["Importance Level should be a number between 1 and 10".to_string()],
                "{raw}"
            );
        }
        let ok = validate(
            &record(&[
                ("name", FieldValue::from("Ari")),
                ("importance_level", FieldValue::Number(10.0)),
            ]),
            &registry,
        );
        assert!(ok.warnings.is_empty());
    }

    #[test]
    fn unknown_status_warns_but_case_is_ignored() {
        let registry = Registry::builtin();
        let result = validate(
            &record(&[
                ("name", FieldValue::from("Ari")),
                ("status", FieldValue::from("retired")),
            ]),
            &registry,
        );
        assert_eq!(
            result.warnings,
            vec!["Status should be one of: active, inactive, deceased, unknown".to_string()]
        );

        let ok = validate(
            &record(&[
                ("name", FieldValue::from("Ari")),
                ("status", FieldValue::from("Deceased")),
            ]),
            &registry,
        );
        assert!(ok.warnings.is_empty());
    }

    #[test]
    fn array_text_that_is_not_a_json_list_is_advisory() {
        let registry = Registry::builtin();
        let result = validate(
            &record(&[
                ("name", FieldValue::from("Ari")),
                ("aliases", FieldValue::from("Red, The Fox")),
                ("skills", FieldValue::from(r#"["archery"]"#)),
                ("tags", FieldValue::Sequence(vec![FieldValue::from("x")])),
            ]),
            &registry,
        );
        assert!(result.is_valid);
        assert_eq!(
            result.warnings,
            vec!["Aliases should be a JSON list or comma-separated text".to_string()]
        );
    }

    #[test]
    fn structured_names_are_blank_when_empty_and_flagged_otherwise() {
        let registry = Registry::builtin();
        for empty in [FieldValue::Sequence(Vec::new()), FieldValue::Mapping(Record::new())] {
            let result = validate(&record(&[("name", empty)]), &registry);
            assert_eq!(result.errors, vec!["Name is required".to_string()]);
        }

        let listed = validate(
            &record(&[("name", FieldValue::Sequence(vec![FieldValue::from("Ari")]))]),
            &registry,
        );
        assert!(listed.is_valid);
        assert_eq!(
            listed.warnings,
            vec!["Name should be text, not a list or object".to_string()]
        );
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let registry = Registry::builtin();
        let result = validate(
            &record(&[
                ("name", FieldValue::from("Ari")),
                ("favourite_food", FieldValue::from("soup")),
            ]),
            &registry,
        );
        assert_eq!(result, ValidationResult::from_findings(Vec::new(), Vec::new()));
    }
}
