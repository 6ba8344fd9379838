//! Fatal, whole-batch import failures.
//!
//! Anything in here aborts an import before a single row is looked at. Row
//! level problems never surface through this type; they travel inside
//! [`crate::validate::ValidationResult`] instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported upload format (name: {name:?}, media type: {media_type:?})")]
    UnsupportedFormat {
        name: Option<String>,
        media_type: Option<String>,
    },
    #[error("Upload contains no data rows")]
    EmptyPayload,
    #[error("Upload could not be parsed: {0}")]
    MalformedPayload(String),
    #[error("Field mapping could not be parsed: {0}")]
    InvalidMappingPayload(String),
}

impl ImportError {
    /// Stable machine-readable code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::UnsupportedFormat { .. } => "UnsupportedFormat",
            ImportError::EmptyPayload => "EmptyPayload",
            ImportError::MalformedPayload(_) => "MalformedPayload",
            ImportError::InvalidMappingPayload(_) => "InvalidMappingPayload",
        }
    }
}
