//! Single-file inspection.
//!
//! Resolves one file exactly as the engine would during a load and prints
//! what it found: encoding, delimiter, header position, the provenance date
//! token, and each raw header next to its normalized name.

use std::fs;

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::cli::SniffArgs;
use crate::columns::local_column_name;
use crate::config::{self, EngineConfig};
use crate::printable_delimiter;
use crate::source::{self, SourceFile};

pub fn execute(args: &SniffArgs) -> Result<()> {
    let engine_config = EngineConfig {
        candidate_encodings: config::candidate_encodings(&args.encodings)?,
        candidate_delimiters: config::candidate_delimiters(&args.delimiters),
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

    println!("file: {name}");
    println!("encoding: {}", file.encoding);
    println!(
        "delimiter: {} (quote aware: {})",
        printable_delimiter(file.dialect.delimiter),
        file.dialect.quote_aware
    );
    println!("header line: {}", file.header_index + 1);
    println!(
        "file_date: {:?}",
        source::file_date(&name, &engine_config.date_prefix, &engine_config.date_suffix)
    );
    println!("columns ({count}):", count = file.raw_headers.len());
    for (index, raw) in file.raw_headers.iter().enumerate() {
        println!(
            "  {index:>3}  {raw:?} -> {normalized}",
            normalized = local_column_name(raw, index)
        );
    }
    info!(
        "Sniffed {name}: {count} column(s)",
        count = file.raw_headers.len()
    );
    Ok(())
}
