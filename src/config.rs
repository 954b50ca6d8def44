//! Engine configuration.
//!
//! One [`EngineConfig`] value is built at the CLI boundary and handed to the
//! orchestrator at construction; no module-level state exists. Encoding
//! labels are resolved to concrete encodings while the config is built, so
//! an unknown label fails at startup instead of mid-batch.

use clap::ValueEnum;
use encoding_rs::Encoding;

use crate::dialect::DEFAULT_CANDIDATE_DELIMITERS;
use crate::encoding;

/// Files examined for schema unification when the caller does not override.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// How the target schema is obtained before any file is loaded.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum SchemaStrategy {
    /// Merge normalized headers from a bounded sample of the corpus.
    UnifiedSample,
    /// Take the first file's headers as-is, placeholders for invalid names.
    Autodetect,
    /// Use a caller-supplied column list and touch no file up front.
    Fixed,
}

impl Default for SchemaStrategy {
    fn default() -> Self {
        SchemaStrategy::UnifiedSample
    }
}

/// Disposition of the target table before loading starts.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Create the table if absent and append to whatever it holds.
    Append,
    /// Clear the table and recreate it before the first submission.
    Replace,
}

impl Default for WriteMode {
    fn default() -> Self {
        WriteMode::Append
    }
}

/// Everything the engine is allowed to vary on, bundled as one value.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Identifier of the table every projected batch lands in.
    pub target_table: String,
    /// Upper bound on files read while unifying the schema.
    pub sample_size: usize,
    /// Candidate encodings, probed in order.
    pub candidate_encodings: Vec<&'static Encoding>,
    /// Candidate delimiters, scored in priority order.
    pub candidate_delimiters: Vec<u8>,
    pub schema_strategy: SchemaStrategy,
    /// Column list consulted only under [`SchemaStrategy::Fixed`].
    pub fixed_columns: Option<Vec<String>>,
    pub write_mode: WriteMode,
    /// Delimiter of the re-serialized unified batches.
    pub output_delimiter: u8,
    /// Literal token stripped from the filename front for `file_date`.
    pub date_prefix: String,
    /// Literal token stripped from the filename back for `file_date`.
    pub date_suffix: String,
    /// Extensions (without dot) a discovered corpus file may carry.
    pub extensions: Vec<String>,
}

impl EngineConfig {
    pub fn for_table(target_table: &str) -> Self {
        EngineConfig {
            target_table: target_table.to_string(),
            ..EngineConfig::default()
        }
    }
}

/// Resolves CLI encoding labels, falling back to the default candidate list
/// when none were given.
pub fn candidate_encodings(labels: &[String]) -> anyhow::Result<Vec<&'static Encoding>> {
    if labels.is_empty() {
        Ok(encoding::default_candidates())
    } else {
        encoding::resolve_candidates(labels)
    }
}

pub fn candidate_delimiters(overrides: &[u8]) -> Vec<u8> {
    if overrides.is_empty() {
        DEFAULT_CANDIDATE_DELIMITERS.to_vec()
    } else {
        overrides.to_vec()
    }
}

pub fn extensions(overrides: &[String]) -> Vec<String> {
    if overrides.is_empty() {
        EngineConfig::default().extensions
    } else {
        overrides.to_vec()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            target_table: String::from("unified_corpus"),
            sample_size: DEFAULT_SAMPLE_SIZE,
            candidate_encodings: encoding::default_candidates(),
            candidate_delimiters: DEFAULT_CANDIDATE_DELIMITERS.to_vec(),
            schema_strategy: SchemaStrategy::default(),
            fixed_columns: None,
            write_mode: WriteMode::default(),
            output_delimiter: b';',
            date_prefix: String::from("basica"),
            date_suffix: String::new(),
            extensions: vec![String::from("txt"), String::from("csv")],
        }
    }
}
