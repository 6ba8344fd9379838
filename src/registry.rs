//! Canonical Schema Registry.
//!
//! The registry is the single description of the target record shape. The
//! field mapper, validator and transformer all read it instead of carrying
//! their own lists of field names. The built-in character schema ships as
//! YAML embedded in the binary; operators can point `--registry` at their
//! own file with the same layout.

use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use heck::ToTitleCase;
use serde::{Deserialize, Serialize};

use crate::data::FieldValue;

const BUILTIN_REGISTRY: &str = include_str!("registry.yaml");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Array,
    Object,
    Number,
    Boolean,
    Enum,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Enum => "enum",
        }
    }
}

/// What the transformer does with a number that parses but falls outside
/// the descriptor's `min`/`max` bounds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    #[default]
    PassThrough,
    Clamp,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_range: Option<OutOfRangePolicy>,
}

impl FieldDescriptor {
    pub fn new(key: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            label: key.to_title_case(),
            required: false,
            kind,
            enum_options: None,
            default: None,
            min: None,
            max: None,
            out_of_range: None,
        }
    }

    pub fn in_range(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min as f64)
            && self.max.is_none_or(|max| value <= max as f64)
    }

    /// Case-insensitive lookup returning the registry's own spelling.
    pub fn enum_option(&self, candidate: &str) -> Option<&str> {
        let candidate = candidate.trim();
        self.enum_options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|option| option.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registry {
    fields: Vec<FieldDescriptor>,
}

impl Registry {
    /// The character schema embedded at build time.
    pub fn builtin() -> Self {
        Self::from_yaml_str(BUILTIN_REGISTRY).expect("embedded registry.yaml is valid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening registry file {path:?}"))?;
        let reader = BufReader::new(file);
        let registry: Registry =
            serde_yaml::from_reader(reader).context("Parsing registry YAML")?;
        registry.finalize()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let registry: Registry = serde_yaml::from_str(text).context("Parsing registry YAML")?;
        registry.finalize()
    }

    pub fn from_fields(fields: Vec<FieldDescriptor>) -> Result<Self> {
        Registry { fields }.finalize()
    }

    fn finalize(mut self) -> Result<Self> {
        for field in &mut self.fields {
            if field.label.trim().is_empty() {
                field.label = field.key.to_title_case();
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.fields.is_empty(), "Registry must define at least one field");
        let mut seen = HashSet::new();
        for field in &self.fields {
            ensure!(!field.key.trim().is_empty(), "Registry field keys cannot be empty");
            ensure!(
                seen.insert(field.key.as_str()),
                "Registry field '{}' is defined more than once",
                field.key
            );
            if field.kind == FieldKind::Enum {
                let options = field.enum_options.as_deref().unwrap_or_default();
                ensure!(
                    !options.is_empty(),
                    "Enum field '{}' must list at least one option",
                    field.key
                );
                if let Some(default) = &field.default {
                    let text = default.as_display();
                    ensure!(
                        field.enum_option(&text).is_some(),
                        "Enum field '{}' default '{}' is not one of its options",
                        field.key,
                        text
                    );
                }
            }
            if let (Some(min), Some(max)) = (field.min, field.max) {
                ensure!(
                    min <= max,
                    "Field '{}' has min ({min}) greater than max ({max})",
                    field.key
                );
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    pub fn fields_of_kind(&self, kind: FieldKind) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(move |field| field.kind == kind)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.required)
    }

    /// Field used to identify a record for duplicate detection: the first
    /// required field, or the first field when nothing is required.
    pub fn identity_field(&self) -> &FieldDescriptor {
        self.required_fields()
            .next()
            .unwrap_or_else(|| &self.fields[0])
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
