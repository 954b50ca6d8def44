pub mod cli;
pub mod columns;
pub mod config;
pub mod dialect;
pub mod encoding;
pub mod error;
pub mod load;
pub mod load_cmd;
pub mod project;
pub mod project_cmd;
pub mod schema;
pub mod schema_cmd;
pub mod sniff;
pub mod source;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_unify", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sniff(args) => sniff::execute(&args),
        Commands::Schema(args) => schema_cmd::execute(&args),
        Commands::Project(args) => project_cmd::execute(&args),
        Commands::Load(args) => load_cmd::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
