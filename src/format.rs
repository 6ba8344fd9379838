//! Upload format detection and parsing into raw records.
//!
//! Two encodings are accepted:
//!
//! - **Delimited text** (`.csv`, `.tsv`, `text/csv`, ...): the first line is
//!   the header row and every following line becomes one record keyed by
//!   header position. Quoted fields may contain the delimiter; every field is
//!   trimmed after quote removal. Short rows fill the missing trailing cells
//!   with null.
//! - **Structured list** (`.json`, `application/json`): either a list of
//!   objects or a single object. Elements that are not objects are skipped and
//!   reported, they do not fail the batch.
//!
//! The parser knows nothing about the canonical schema.

use encoding_rs::Encoding;
use log::{debug, warn};
use serde::Serialize;

use crate::{
    data::{FieldValue, Record},
    error::ImportError,
    io_utils,
};

pub const MEDIA_TYPE_CSV: &str = "text/csv";
pub const MEDIA_TYPE_TSV: &str = "text/tab-separated-values";
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Raw upload as handed over by the transport adapter.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: Option<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            media_type,
            bytes,
        }
    }

    pub fn named(file_name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: Some(file_name.to_string()),
            media_type: None,
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Delimited { delimiter: u8 },
    StructuredList,
}

/// A structured-list element that was not an object.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedEntry {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ParsedUpload {
    pub format: UploadFormat,
    pub records: Vec<Record>,
    /// Position of each record in the upload, parallel to `records`. Data
    /// rows for delimited text, list elements for structured lists.
    pub positions: Vec<usize>,
    pub skipped: Vec<SkippedEntry>,
}

fn format_for_media_type(media_type: &str) -> Option<UploadFormat> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        MEDIA_TYPE_CSV | "application/csv" | "text/comma-separated-values" => {
            Some(UploadFormat::Delimited {
                delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            })
        }
        MEDIA_TYPE_TSV => Some(UploadFormat::Delimited {
            delimiter: io_utils::DEFAULT_TSV_DELIMITER,
        }),
        MEDIA_TYPE_JSON | "text/json" => Some(UploadFormat::StructuredList),
        _ => None,
    }
}

fn format_for_file_name(name: &str) -> Option<UploadFormat> {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.trim())?;
    if extension.eq_ignore_ascii_case("csv") {
        Some(UploadFormat::Delimited {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
        })
    } else if extension.eq_ignore_ascii_case("tsv") {
        Some(UploadFormat::Delimited {
            delimiter: io_utils::DEFAULT_TSV_DELIMITER,
        })
    } else if extension.eq_ignore_ascii_case("json") {
        Some(UploadFormat::StructuredList)
    } else {
        None
    }
}

/// Resolves the upload format from the declared media type, falling back to
/// the file name extension. Never looks at the content.
pub fn detect_format(
    file_name: Option<&str>,
    media_type: Option<&str>,
) -> Result<UploadFormat, ImportError> {
    media_type
        .and_then(format_for_media_type)
        .or_else(|| file_name.and_then(format_for_file_name))
        .ok_or_else(|| ImportError::UnsupportedFormat {
            name: file_name.map(str::to_string),
            media_type: media_type.map(str::to_string),
        })
}

pub fn parse_upload(
    upload: &Upload,
    encoding: &'static Encoding,
) -> Result<ParsedUpload, ImportError> {
    let format = detect_format(upload.file_name.as_deref(), upload.media_type.as_deref())?;
    let text = io_utils::decode_bytes(&upload.bytes, encoding)
        .map_err(|err| ImportError::MalformedPayload(err.to_string()))?;
    if text.trim().is_empty() {
        return Err(ImportError::EmptyPayload);
    }

    let (rows, skipped) = match format {
        UploadFormat::Delimited { delimiter } => (
            parse_delimited(&text, delimiter)?
                .into_iter()
                .enumerate()
                .collect::<Vec<_>>(),
            Vec::new(),
        ),
        UploadFormat::StructuredList => parse_structured_list(&text)?,
    };
    let (positions, records): (Vec<usize>, Vec<Record>) = rows.into_iter().unzip();
    for entry in &skipped {
        warn!("Skipping list element {}: {}", entry.index, entry.reason);
    }
    if records.is_empty() {
        return Err(ImportError::EmptyPayload);
    }
    debug!("Parsed {} record(s) as {:?}", records.len(), format);
    Ok(ParsedUpload {
        format,
        records,
        positions,
        skipped,
    })
}

pub fn parse_delimited(text: &str, delimiter: u8) -> Result<Vec<Record>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| ImportError::MalformedPayload(format!("Reading header row: {err}")))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(|err| {
            ImportError::MalformedPayload(format!("Reading line {}: {err}", idx + 2))
        })?;
        let mut record = Record::with_capacity(headers.len());
        for (pos, header) in headers.iter().enumerate() {
            let value = row
                .get(pos)
                .map(FieldValue::string)
                .unwrap_or(FieldValue::Null);
            record.insert(header.as_str(), value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Objects in a JSON list, each paired with its element index, plus the
/// elements that were not objects.
pub fn parse_structured_list(
    text: &str,
) -> Result<(Vec<(usize, Record)>, Vec<SkippedEntry>), ImportError> {
    let document: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| ImportError::MalformedPayload(err.to_string()))?;
    match document {
        serde_json::Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            let mut skipped = Vec::new();
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    serde_json::Value::Object(map) => records.push((index, Record::from(map))),
                    other => skipped.push(SkippedEntry {
                        index,
                        reason: format!("expected an object but found {}", json_kind(&other)),
                    }),
                }
            }
            Ok((records, skipped))
        }
        serde_json::Value::Object(map) => Ok((vec![(0, Record::from(map))], Vec::new())),
        other => Err(ImportError::MalformedPayload(format!(
            "expected a list of objects or a single object but found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
