//! Single-file projection command.
//!
//! Projects one file into a unified schema (from YAML, or the file's own
//! header when none is given) and writes the delimited result to a file or
//! stdout. This is the per-file half of a load, without the warehouse.

use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::cli::ProjectArgs;
use crate::config::{self, EngineConfig};
use crate::project::RowProjector;
use crate::schema::UnifiedSchema;
use crate::source::{Provenance, SourceFile};

pub fn execute(args: &ProjectArgs) -> Result<()> {
    let engine_config = EngineConfig {
        candidate_encodings: config::candidate_encodings(&args.encodings)?,
        candidate_delimiters: config::candidate_delimiters(&args.delimiters),
        output_delimiter: args.output_delimiter,
        date_prefix: args.date_prefix.clone(),
        date_suffix: args.date_suffix.clone(),
        ..EngineConfig::default()
    };

    let name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Input path {:?} has no usable file name", args.input))?;
    let bytes = fs::read(&args.input).with_context(|| format!("Reading {:?}", args.input))?;
    let file = SourceFile::resolve(&name, &bytes, &engine_config)
        .with_context(|| format!("Resolving {:?}", args.input))?;

    let unified = match &args.schema {
        Some(path) => UnifiedSchema::load(path)?,
        None => UnifiedSchema::from_raw_headers(&file.raw_headers),
    };

    let provenance = Provenance::for_file(&name, &engine_config);
    let batch = RowProjector::new(&unified).project_file(&file, &provenance);
    if batch.row_count() == 0 {
        info!("{name}: no data rows, emitting header only");
    }
    let rendered = batch
        .to_delimited_bytes(engine_config.output_delimiter)
        .context("Serializing projected rows")?;

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered).with_context(|| format!("Writing {path:?}"))?;
            info!(
                "Projected {rows} row(s) across {columns} column(s) to {path:?}",
                rows = batch.row_count(),
                columns = batch.columns.len(),
            );
        }
        None => {
            io::stdout()
                .write_all(&rendered)
                .context("Writing projection to stdout")?;
        }
    }
    Ok(())
}
