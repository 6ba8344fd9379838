//! Preview assembly: parse, map, validate, transform and summarize one upload.
//!
//! Statistics cover every parsed row; the rich per-row preview is limited
//! to the first few rows to keep responses small. Row indexes are 0-based
//! positions in the upload and stay stable across stages.

use std::collections::BTreeSet;

use anyhow::Result;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use serde::Serialize;

use crate::{
    cli::PreviewArgs,
    data::Record,
    duplicates::find_duplicates,
    error::ImportError,
    format::{SkippedEntry, Upload, parse_upload},
    io_utils,
    mapping::{
        FieldMapping, MappingConflict, apply_mapping, detect_fields, mapping_conflicts,
        parse_mapping_payload, suggest_mapping,
    },
    registry::{FieldDescriptor, Registry},
    table,
    transform::{CanonicalRecord, transform},
    validate::{ValidationResult, validate},
};

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub duplicate_names: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    pub row_index: usize,
    pub raw_data: Record,
    pub validation: ValidationResult,
    pub transformed: CanonicalRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub detected_fields: Vec<String>,
    pub database_fields: Vec<FieldDescriptor>,
    pub suggested_mapping: FieldMapping,
    pub applied_mapping: FieldMapping,
    pub mapping_conflicts: Vec<MappingConflict>,
    pub skipped_entries: Vec<SkippedEntry>,
    pub preview_data: Vec<PreviewRow>,
    pub stats: ImportSummary,
    pub total_rows: usize,
}

/// An upload parsed and mapped, ready for preview or commit.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub detected_fields: Vec<String>,
    pub suggested_mapping: FieldMapping,
    pub applied_mapping: FieldMapping,
    pub skipped_entries: Vec<SkippedEntry>,
    pub records: Vec<Record>,
    /// Upload position of each record, parallel to `records`.
    pub positions: Vec<usize>,
}

impl PreparedImport {
    pub fn mapping_conflicts(&self) -> Vec<MappingConflict> {
        mapping_conflicts(&self.detected_fields, &self.applied_mapping)
    }

    /// Records paired with their row index in the upload.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.positions.iter().copied().zip(&self.records)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreviewOptions {
    pub preview_rows: usize,
    pub encoding: &'static Encoding,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
            encoding: UTF_8,
        }
    }
}

/// Parses the upload and applies the operator mapping when one is given,
/// otherwise the suggested mapping.
pub fn prepare(
    upload: &Upload,
    mapping_payload: Option<&str>,
    registry: &Registry,
    encoding: &'static Encoding,
) -> Result<PreparedImport, ImportError> {
    let parsed = parse_upload(upload, encoding)?;
    let operator_mapping = mapping_payload
        .map(|payload| parse_mapping_payload(payload, registry))
        .transpose()?;

    let detected_fields = detect_fields(&parsed.records);
    let suggested_mapping = suggest_mapping(&detected_fields, registry);
    let applied_mapping = operator_mapping.unwrap_or_else(|| suggested_mapping.clone());
    debug!(
        "Detected {} field(s), applying {} mapping entr(ies)",
        detected_fields.len(),
        applied_mapping.len()
    );
    let records = apply_mapping(&parsed.records, &applied_mapping);

    Ok(PreparedImport {
        detected_fields,
        suggested_mapping,
        applied_mapping,
        skipped_entries: parsed.skipped,
        records,
        positions: parsed.positions,
    })
}

pub fn summarize(records: &[Record], registry: &Registry) -> ImportSummary {
    let total_rows = records.len();
    let valid_rows = records
        .iter()
        .filter(|record| validate(record, registry).is_valid)
        .count();
    ImportSummary {
        total_rows,
        valid_rows,
        invalid_rows: total_rows - valid_rows,
        duplicate_names: find_duplicates(records, &registry.identity_field().key),
    }
}

pub fn preview_rows(
    prepared: &PreparedImport,
    registry: &Registry,
    limit: usize,
) -> Vec<PreviewRow> {
    prepared
        .rows()
        .take(limit)
        .map(|(row_index, record)| PreviewRow {
            row_index,
            raw_data: record.clone(),
            validation: validate(record, registry),
            transformed: transform(record, registry),
        })
        .collect()
}

pub fn build_preview(
    prepared: PreparedImport,
    registry: &Registry,
    preview_limit: usize,
) -> ImportPreview {
    let stats = summarize(&prepared.records, registry);
    let preview_data = preview_rows(&prepared, registry, preview_limit);
    let mapping_conflicts = prepared.mapping_conflicts();
    ImportPreview {
        total_rows: stats.total_rows,
        detected_fields: prepared.detected_fields,
        database_fields: registry.fields().to_vec(),
        suggested_mapping: prepared.suggested_mapping,
        applied_mapping: prepared.applied_mapping,
        mapping_conflicts,
        skipped_entries: prepared.skipped_entries,
        preview_data,
        stats,
    }
}

pub fn preview_upload(
    upload: &Upload,
    mapping_payload: Option<&str>,
    registry: &Registry,
    options: &PreviewOptions,
) -> Result<ImportPreview, ImportError> {
    let prepared = prepare(upload, mapping_payload, registry, options.encoding)?;
    Ok(build_preview(prepared, registry, options.preview_rows))
}

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let registry = crate::load_registry(args.source.registry.as_deref())?;
    let encoding = io_utils::resolve_encoding(args.source.input_encoding.as_deref())?;
    let upload = io_utils::read_upload(&args.source.input, args.source.media_type.as_deref())?;
    let mapping = args
        .mapping
        .as_deref()
        .map(io_utils::read_inline_or_file)
        .transpose()?;
    let options = PreviewOptions {
        preview_rows: args.rows,
        encoding,
    };

    let preview = preview_upload(&upload, mapping.as_deref(), &registry, &options)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print!("{}", render_preview(&preview, &registry));
    }
    info!(
        "Previewed {} of {} row(s) from {:?}",
        preview.preview_data.len(),
        preview.total_rows,
        args.source.input
    );
    Ok(())
}

pub fn render_preview(preview: &ImportPreview, registry: &Registry) -> String {
    let identity = &registry.identity_field().key;
    let headers = ["row", identity.as_str(), "valid", "errors", "warnings"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = preview
        .preview_data
        .iter()
        .map(|row| {
            vec![
                (row.row_index + 1).to_string(),
                row.transformed.text(identity).unwrap_or_default().to_string(),
                if row.validation.is_valid { "yes" } else { "no" }.to_string(),
                row.validation.errors.join("; "),
                row.validation.warnings.join("; "),
            ]
        })
        .collect::<Vec<_>>();

    let mut output = table::render_table(&headers, &rows);
    let stats = &preview.stats;
    output.push_str(&format!(
        "\n{} row(s): {} valid, {} invalid\n",
        stats.total_rows, stats.valid_rows, stats.invalid_rows
    ));
    if !stats.duplicate_names.is_empty() {
        let names = stats.duplicate_names.iter().cloned().collect::<Vec<_>>();
        output.push_str(&format!("Duplicate names: {}\n", names.join(", ")));
    }
    for conflict in &preview.mapping_conflicts {
        output.push_str(&format!(
            "Mapping conflict: {} <- {}\n",
            conflict.canonical,
            conflict.observed.join(", ")
        ));
    }
    for skipped in &preview.skipped_entries {
        output.push_str(&format!(
            "Skipped entry {}: {}\n",
            skipped.index, skipped.reason
        ));
    }
    output
}
