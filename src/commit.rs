//! Commit path: select importable rows and hand them to a data store.

use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use log::info;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    cli::ImportArgs,
    duplicates::{find_duplicates, is_duplicate},
    format::Upload,
    io_utils,
    preview::{PreparedImport, prepare},
    registry::Registry,
    store::{CommitCandidate, DataStore, JsonLinesStore},
    transform::transform,
    validate::validate,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    pub row_index: usize,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CommitPlan {
    pub candidates: Vec<CommitCandidate>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub batch_id: Uuid,
    pub committed_at: DateTime<Utc>,
    pub source_digest: String,
    pub total_rows: usize,
    pub committed: Vec<usize>,
    pub rejected: Vec<RejectedRow>,
}

/// Keeps valid rows in upload order. With `skip_duplicates` every row whose
/// name is shared with another row is rejected as well.
pub fn plan_commit(
    prepared: &PreparedImport,
    registry: &Registry,
    skip_duplicates: bool,
) -> CommitPlan {
    let identity = &registry.identity_field().key;
    let duplicates = if skip_duplicates {
        find_duplicates(&prepared.records, identity)
    } else {
        Default::default()
    };

    let mut candidates = Vec::new();
    let mut rejected = Vec::new();
    for (row_index, record) in prepared.rows() {
        let validation = validate(record, registry);
        if !validation.is_valid {
            rejected.push(RejectedRow {
                row_index,
                reasons: validation.errors,
            });
        } else if is_duplicate(record, identity, &duplicates) {
            rejected.push(RejectedRow {
                row_index,
                reasons: vec![format!("Duplicate {identity}")],
            });
        } else {
            candidates.push(CommitCandidate {
                row_index,
                record: transform(record, registry),
            });
        }
    }
    CommitPlan {
        candidates,
        rejected,
    }
}

pub fn source_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn commit_upload(
    upload: &Upload,
    mapping_payload: Option<&str>,
    registry: &Registry,
    encoding: &'static Encoding,
    skip_duplicates: bool,
    store: &mut dyn DataStore,
) -> Result<CommitReport> {
    let prepared = prepare(upload, mapping_payload, registry, encoding)?;
    commit_prepared(
        &prepared,
        source_digest(&upload.bytes),
        registry,
        skip_duplicates,
        store,
    )
}

/// Commits an upload that already made it through parsing and mapping.
pub fn commit_prepared(
    prepared: &PreparedImport,
    source_digest: String,
    registry: &Registry,
    skip_duplicates: bool,
    store: &mut dyn DataStore,
) -> Result<CommitReport> {
    let plan = plan_commit(prepared, registry, skip_duplicates);
    let committed = store.commit(&plan.candidates)?;
    Ok(CommitReport {
        batch_id: Uuid::new_v4(),
        committed_at: Utc::now(),
        source_digest,
        total_rows: prepared.records.len(),
        committed,
        rejected: plan.rejected,
    })
}

pub fn execute(args: &ImportArgs) -> Result<()> {
    let registry = crate::load_registry(args.source.registry.as_deref())?;
    let encoding = io_utils::resolve_encoding(args.source.input_encoding.as_deref())?;
    let upload = io_utils::read_upload(&args.source.input, args.source.media_type.as_deref())?;
    let mapping = args
        .mapping
        .as_deref()
        .map(io_utils::read_inline_or_file)
        .transpose()?;

    // Fatal upload errors must surface before the output file is created.
    let prepared = prepare(&upload, mapping.as_deref(), &registry, encoding)?;
    let mut store = JsonLinesStore::open(args.output.as_deref())?;
    let report = commit_prepared(
        &prepared,
        source_digest(&upload.bytes),
        &registry,
        args.skip_duplicates,
        &mut store,
    )?;
    info!(
        "Batch {}: committed {} of {} row(s), rejected {}",
        report.batch_id,
        report.committed.len(),
        report.total_rows,
        report.rejected.len()
    );
    if let Some(path) = &args.report {
        let rendered = serde_json::to_string_pretty(&report)?;
        fs::write(path, rendered).with_context(|| format!("Writing report to {path:?}"))?;
    }
    Ok(())
}
