pub mod cli;
pub mod commit;
pub mod data;
pub mod duplicates;
pub mod error;
pub mod format;
pub mod io_utils;
pub mod mapping;
pub mod preview;
pub mod registry;
pub mod store;
pub mod table;
pub mod transform;
pub mod validate;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    mapping::{detect_fields, suggest_mapping},
    registry::Registry,
};

pub use crate::error::ImportError;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("roster_import", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Fields(args) => handle_fields(&args),
        Commands::Suggest(args) => handle_suggest(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Import(args) => commit::execute(&args),
    }
}

pub(crate) fn load_registry(path: Option<&Path>) -> Result<Registry> {
    match path {
        Some(path) => {
            let registry = Registry::load(path)
                .with_context(|| format!("Loading registry from {path:?}"))?;
            debug!("Loaded {} field(s) from {path:?}", registry.fields().len());
            Ok(registry)
        }
        None => Ok(Registry::builtin()),
    }
}

fn handle_fields(args: &cli::FieldsArgs) -> Result<()> {
    let registry = load_registry(args.registry.as_deref())?;
    let headers = ["#", "key", "label", "kind", "required", "options"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = registry
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            vec![
                (idx + 1).to_string(),
                field.key.clone(),
                field.label.clone(),
                field.kind.as_str().to_string(),
                if field.required { "yes" } else { "" }.to_string(),
                field.enum_options.as_deref().unwrap_or_default().join(", "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!("Listed {} canonical field(s)", rows.len());
    Ok(())
}

fn handle_suggest(args: &cli::SuggestArgs) -> Result<()> {
    let registry = load_registry(args.source.registry.as_deref())?;
    let encoding = io_utils::resolve_encoding(args.source.input_encoding.as_deref())?;
    let upload = io_utils::read_upload(&args.source.input, args.source.media_type.as_deref())?;
    let parsed = format::parse_upload(&upload, encoding)?;
    let observed = detect_fields(&parsed.records);
    let mapping = suggest_mapping(&observed, &registry);

    let headers = vec!["observed".to_string(), "canonical".to_string()];
    let rows = observed
        .iter()
        .map(|key| vec![key.clone(), mapping.get(key).unwrap_or("").to_string()])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "Suggested {} mapping(s) for {} observed field(s) in {:?}",
        mapping.len(),
        observed.len(),
        args.source.input
    );
    Ok(())
}
