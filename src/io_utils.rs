//! Upload adapter I/O: reading uploads, decoding text, opening outputs.
//!
//! - **Uploads**: a path, or `-` for stdin, becomes an [`Upload`] carrying the
//!   file name, the declared media type and the raw bytes.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8 with
//!   BOM sniffing.
//! - **Outputs**: files are buffered; a missing path or `-` means stdout.

use std::{
    fs::{self, File},
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::format::Upload;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn read_upload(path: &Path, media_type: Option<&str>) -> Result<Upload> {
    let (file_name, bytes) = if is_dash(path) {
        let mut bytes = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading upload from stdin")?;
        (None, bytes)
    } else {
        let bytes = fs::read(path).with_context(|| format!("Opening input file {path:?}"))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        (name, bytes)
    };
    Ok(Upload::new(
        file_name,
        media_type.map(str::to_string),
        bytes,
    ))
}

/// `@path` reads the file at `path`; anything else is returned verbatim.
pub fn read_inline_or_file(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Reading mapping file {path:?}"))
        }
        None => Ok(value.to_string()),
    }
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    Ok(writer)
}
