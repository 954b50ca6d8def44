use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{SchemaStrategy, WriteMode};

#[derive(Debug, Parser)]
#[command(author, version, about = "Reconcile heterogeneous delimited files into one schema", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect one file: encoding, delimiter, and normalized header
    Sniff(SniffArgs),
    /// Detect the unified schema from a corpus sample and save it as YAML
    Schema(SchemaArgs),
    /// Project one file into a schema and write the delimited result
    Project(ProjectArgs),
    /// Load a whole corpus into the target table
    Load(LoadArgs),
}

#[derive(Debug, Args)]
pub struct SniffArgs {
    /// Input file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Candidate encoding label, in priority order (repeatable)
    #[arg(long = "encoding", action = clap::ArgAction::Append)]
    pub encodings: Vec<String>,
    /// Candidate delimiter, in priority order (repeatable)
    #[arg(long = "delimiter", value_parser = parse_delimiter, action = clap::ArgAction::Append)]
    pub delimiters: Vec<u8>,
    /// Literal token stripped from the filename front for file_date
    #[arg(long = "date-prefix", default_value = "basica")]
    pub date_prefix: String,
    /// Literal token stripped from the filename back for file_date
    #[arg(long = "date-suffix", default_value = "")]
    pub date_suffix: String,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Directory holding the corpus files
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination schema YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Schema strategy to apply
    #[arg(long = "strategy", value_enum, default_value = "unified-sample")]
    pub strategy: SchemaStrategy,
    /// Number of files sampled for unification
    #[arg(long = "sample-size", default_value_t = crate::config::DEFAULT_SAMPLE_SIZE)]
    pub sample_size: usize,
    /// File extension admitted by discovery (repeatable)
    #[arg(long = "extension", action = clap::ArgAction::Append)]
    pub extensions: Vec<String>,
    /// Candidate encoding label, in priority order (repeatable)
    #[arg(long = "encoding", action = clap::ArgAction::Append)]
    pub encodings: Vec<String>,
    /// Candidate delimiter, in priority order (repeatable)
    #[arg(long = "delimiter", value_parser = parse_delimiter, action = clap::ArgAction::Append)]
    pub delimiters: Vec<u8>,
}

#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Input file to project
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Unified schema YAML to project into (the file's own header if omitted)
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter of the projected output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter, default_value = ";")]
    pub output_delimiter: u8,
    /// Literal token stripped from the filename front for file_date
    #[arg(long = "date-prefix", default_value = "basica")]
    pub date_prefix: String,
    /// Literal token stripped from the filename back for file_date
    #[arg(long = "date-suffix", default_value = "")]
    pub date_suffix: String,
    /// Candidate encoding label, in priority order (repeatable)
    #[arg(long = "encoding", action = clap::ArgAction::Append)]
    pub encodings: Vec<String>,
    /// Candidate delimiter, in priority order (repeatable)
    #[arg(long = "delimiter", value_parser = parse_delimiter, action = clap::ArgAction::Append)]
    pub delimiters: Vec<u8>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Directory holding the corpus files
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory the target table file lives in
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
    /// Name of the target table
    #[arg(short = 't', long = "table", default_value = "unified_corpus")]
    pub table: String,
    /// Append to or replace the target table
    #[arg(long = "write-mode", value_enum, default_value = "append")]
    pub write_mode: WriteMode,
    /// Schema strategy to apply
    #[arg(long = "strategy", value_enum, default_value = "unified-sample")]
    pub strategy: SchemaStrategy,
    /// Fixed schema YAML (implies --strategy fixed)
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,
    /// Number of files sampled for unification
    #[arg(long = "sample-size", default_value_t = crate::config::DEFAULT_SAMPLE_SIZE)]
    pub sample_size: usize,
    /// File extension admitted by discovery (repeatable)
    #[arg(long = "extension", action = clap::ArgAction::Append)]
    pub extensions: Vec<String>,
    /// Candidate encoding label, in priority order (repeatable)
    #[arg(long = "encoding", action = clap::ArgAction::Append)]
    pub encodings: Vec<String>,
    /// Candidate delimiter, in priority order (repeatable)
    #[arg(long = "delimiter", value_parser = parse_delimiter, action = clap::ArgAction::Append)]
    pub delimiters: Vec<u8>,
    /// Delimiter of the target table and submitted batches
    #[arg(long = "output-delimiter", value_parser = parse_delimiter, default_value = ";")]
    pub output_delimiter: u8,
    /// Literal token stripped from the filename front for file_date
    #[arg(long = "date-prefix", default_value = "basica")]
    pub date_prefix: String,
    /// Literal token stripped from the filename back for file_date
    #[arg(long = "date-suffix", default_value = "")]
    pub date_suffix: String,
    /// Write the JSON load report to this path
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
    /// Run the batch against an in-memory loader without writing the table
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
