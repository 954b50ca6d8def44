//! Corpus load command.
//!
//! Builds the engine configuration from the CLI surface, wires a directory
//! corpus to the local table loader (or the in-memory one for dry runs),
//! and hands control to the orchestrator. Optionally writes the JSON load
//! report for machine consumption.

use std::fs::File;

use anyhow::{Context, Result};
use log::info;

use crate::cli::LoadArgs;
use crate::config::{self, EngineConfig, SchemaStrategy};
use crate::load::{BulkLoader, DelimitedFileLoader, LoadOrchestrator, MemoryLoader};
use crate::schema::UnifiedSchema;
use crate::source::DirSource;

pub fn execute(args: &LoadArgs) -> Result<()> {
    let fixed_columns = match &args.schema {
        Some(path) => Some(UnifiedSchema::load(path)?.columns),
        None => None,
    };
    let schema_strategy = if fixed_columns.is_some() {
        SchemaStrategy::Fixed
    } else {
        args.strategy
    };
    let engine_config = EngineConfig {
        target_table: args.table.clone(),
        sample_size: args.sample_size,
        candidate_encodings: config::candidate_encodings(&args.encodings)?,
        candidate_delimiters: config::candidate_delimiters(&args.delimiters),
        schema_strategy,
        fixed_columns,
        write_mode: args.write_mode,
        output_delimiter: args.output_delimiter,
        date_prefix: args.date_prefix.clone(),
        date_suffix: args.date_suffix.clone(),
        extensions: config::extensions(&args.extensions),
    };

    info!(
        "Loading corpus from {input:?} into table {table} ({mode:?})",
        input = args.input,
        table = engine_config.target_table,
        mode = engine_config.write_mode,
    );
    let source = DirSource::new(&args.input, &engine_config.extensions);
    let memory_loader;
    let file_loader;
    let loader: &dyn BulkLoader = if args.dry_run {
        memory_loader = MemoryLoader::new();
        &memory_loader
    } else {
        file_loader = DelimitedFileLoader::new(&args.output_dir, engine_config.output_delimiter);
        &file_loader
    };

    let mut orchestrator = LoadOrchestrator::new(engine_config, &source, loader);
    let report = orchestrator
        .run()
        .with_context(|| format!("Loading corpus from {:?}", args.input))?;

    if args.dry_run {
        info!("Dry run: no table writes were performed");
    }
    if let Some(path) = &args.report {
        let file =
            File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
        serde_json::to_writer_pretty(file, &report).context("Writing load report JSON")?;
        info!("Load report written to {path:?}");
    }
    Ok(())
}
