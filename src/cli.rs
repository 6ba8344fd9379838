use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::preview::DEFAULT_PREVIEW_ROWS;

#[derive(Debug, Parser)]
#[command(author, version, about = "Import character rosters from CSV or JSON uploads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the canonical fields an upload can be mapped onto
    Fields(FieldsArgs),
    /// Suggest a mapping from the upload's columns to canonical fields
    Suggest(SuggestArgs),
    /// Validate and transform an upload without importing it
    Preview(PreviewArgs),
    /// Import valid rows into a JSON Lines data store
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Registry YAML file replacing the built-in character schema
    #[arg(long)]
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Upload to read (`-` reads stdin and requires --media-type)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Declared media type, e.g. text/csv or application/json
    #[arg(long = "media-type")]
    pub media_type: Option<String>,
    /// Character encoding of delimited uploads (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Registry YAML file replacing the built-in character schema
    #[arg(long)]
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Field mapping as a JSON object, or `@file` to read it from a file
    #[arg(long)]
    pub mapping: Option<String>,
    /// Number of rows to preview
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub rows: usize,
    /// Print the full preview response as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Destination JSON Lines file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Field mapping as a JSON object, or `@file` to read it from a file
    #[arg(long)]
    pub mapping: Option<String>,
    /// Reject every row whose name appears more than once
    #[arg(long = "skip-duplicates")]
    pub skip_duplicates: bool,
    /// Write the commit report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}
