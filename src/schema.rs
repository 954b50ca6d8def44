//! Unified schema construction and YAML persistence.
//!
//! The engine reconciles files with differing headers into one ordered
//! column list, fixed before any file is loaded and never recomputed. Three
//! strategies exist: merge a bounded sample of the corpus (the default),
//! adopt the first file's headers, or take a caller-supplied list. The
//! resulting [`UnifiedSchema`] can be saved to and loaded from YAML so a
//! detected schema can be pinned and reused as a fixed one.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::columns::{local_column_name, normalize_column};
use crate::config::{EngineConfig, SchemaStrategy};
use crate::error::EngineError;
use crate::source::{Discovery, SourceFile};

/// Metadata columns prepended to the unified columns in the target table.
pub const PROVENANCE_COLUMNS: [&str; 2] = ["source_file", "file_date"];

/// The frozen, ordered column list every file is projected into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedSchema {
    pub columns: Vec<String>,
}

impl UnifiedSchema {
    /// Schema taken from one file's raw headers in their own order, with a
    /// positional placeholder wherever normalization fails.
    pub fn from_raw_headers(raw_headers: &[String]) -> Self {
        UnifiedSchema {
            columns: raw_headers
                .iter()
                .enumerate()
                .map(|(index, raw)| local_column_name(raw, index))
                .unique()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column list of the provisioned table: provenance first, unified
    /// columns after, all text-typed.
    pub fn table_columns(&self) -> Vec<String> {
        PROVENANCE_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: UnifiedSchema =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        Ok(schema)
    }
}

/// Builds the schema the configured way. Every error out of this phase is
/// terminal for the batch: without a target schema nothing can be projected.
pub fn resolve_schema(
    source: &dyn Discovery,
    config: &EngineConfig,
) -> Result<UnifiedSchema, EngineError> {
    match config.schema_strategy {
        SchemaStrategy::UnifiedSample => unify_sample(source, config),
        SchemaStrategy::Autodetect => autodetect_first(source, config),
        SchemaStrategy::Fixed => fixed_columns(config),
    }
}

/// Merges normalized header names from at most `sample_size` files into a
/// sorted, deduplicated column list.
///
/// Files that fail decoding or sniffing are skipped with a warning; the
/// sample is whatever remains. Yielding zero valid names is
/// [`EngineError::SchemaDetection`]. The `BTreeSet` makes the result
/// independent of file iteration order and of each file's column order.
pub fn unify_sample(
    source: &dyn Discovery,
    config: &EngineConfig,
) -> Result<UnifiedSchema, EngineError> {
    let names = source.list()?;
    let mut merged: BTreeSet<String> = BTreeSet::new();
    let mut sampled = 0usize;
    for name in names.iter().take(config.sample_size) {
        let bytes = source.fetch(name)?;
        let file = match SourceFile::resolve(name, &bytes, config) {
            Ok(file) => file,
            Err(error) => {
                warn!("{name}: skipped during schema detection: {error}");
                continue;
            }
        };
        sampled += 1;
        merged.extend(file.raw_headers.iter().filter_map(|raw| normalize_column(raw)));
    }
    if merged.is_empty() {
        return Err(EngineError::SchemaDetection);
    }
    let unified = UnifiedSchema {
        columns: merged.into_iter().collect(),
    };
    info!(
        "unified schema: {count} column(s) from {sampled} sampled file(s)",
        count = unified.len(),
    );
    Ok(unified)
}

/// Adopts the first discoverable file's headers in their own order, with a
/// positional placeholder for every name that fails normalization.
fn autodetect_first(
    source: &dyn Discovery,
    config: &EngineConfig,
) -> Result<UnifiedSchema, EngineError> {
    let names = source.list()?;
    let first = names.first().ok_or(EngineError::SchemaDetection)?;
    let bytes = source.fetch(first)?;
    let file = SourceFile::resolve(first, &bytes, config)?;
    let unified = UnifiedSchema::from_raw_headers(&file.raw_headers);
    info!(
        "autodetected schema: {count} column(s) from {first}",
        count = unified.len(),
    );
    Ok(unified)
}

/// Validates a caller-supplied column list. Order is preserved, duplicates
/// collapse to their first occurrence, and any name the normalizer rejects
/// fails the whole list.
fn fixed_columns(config: &EngineConfig) -> Result<UnifiedSchema, EngineError> {
    let supplied = config
        .fixed_columns
        .as_deref()
        .ok_or(EngineError::SchemaDetection)?;
    let mut columns = Vec::with_capacity(supplied.len());
    for raw in supplied {
        match normalize_column(raw) {
            Some(name) => columns.push(name),
            None => {
                warn!("fixed schema: column name {raw:?} is not usable");
                return Err(EngineError::SchemaDetection);
            }
        }
    }
    let columns: Vec<String> = columns.into_iter().unique().collect();
    if columns.is_empty() {
        return Err(EngineError::SchemaDetection);
    }
    Ok(UnifiedSchema { columns })
}
