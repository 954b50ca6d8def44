//! Schema detection command.
//!
//! Runs the configured schema strategy over a corpus directory and either
//! saves the unified schema as YAML or prints it, producing the artifact a
//! later `load --schema` consumes.

use anyhow::{Context, Result, bail};
use log::info;

use crate::cli::SchemaArgs;
use crate::config::{self, EngineConfig, SchemaStrategy};
use crate::schema;
use crate::source::DirSource;

pub fn execute(args: &SchemaArgs) -> Result<()> {
    if args.strategy == SchemaStrategy::Fixed {
        bail!("--strategy fixed has nothing to detect; pass the schema YAML to `load` instead");
    }
    let engine_config = EngineConfig {
        schema_strategy: args.strategy,
        sample_size: args.sample_size,
        extensions: config::extensions(&args.extensions),
        candidate_encodings: config::candidate_encodings(&args.encodings)?,
        candidate_delimiters: config::candidate_delimiters(&args.delimiters),
        ..EngineConfig::default()
    };

    let source = DirSource::new(&args.input, &engine_config.extensions);
    let unified = schema::resolve_schema(&source, &engine_config)
        .with_context(|| format!("Detecting schema from {:?}", args.input))?;

    match &args.output {
        Some(path) => {
            unified.save(path)?;
            info!(
                "Unified schema with {count} column(s) written to {path:?}",
                count = unified.len()
            );
        }
        None => {
            let rendered =
                serde_yaml::to_string(&unified).context("Serializing schema to YAML string")?;
            print!("{rendered}");
        }
    }
    Ok(())
}
