//! Batch orchestration and bulk-load submission.
//!
//! The [`LoadOrchestrator`] drives one batch end to end: freeze the schema,
//! provision the target table, then walk the corpus projecting and
//! submitting file by file. Each file's outcome is independent; data-quality
//! problems skip that file and the batch continues, while transport faults
//! and an unusable schema abort the whole run. The warehouse side sits
//! behind the [`BulkLoader`] trait with a local delimited-file
//! implementation and an in-memory one for tests and dry runs.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{EngineConfig, WriteMode};
use crate::error::EngineError;
use crate::project::RowProjector;
use crate::schema;
use crate::source::{Discovery, Provenance, SourceFile};

/// One submission handed to the warehouse: serialized batch content plus
/// the tolerance flags the engine always passes through.
#[derive(Debug)]
pub struct LoadRequest<'a> {
    /// Ordered column schema the content aligns to.
    pub columns: &'a [String],
    /// Delimiter the content is serialized under.
    pub delimiter: u8,
    /// Header line plus data records.
    pub content: &'a [u8],
    /// Leading content lines the loader must not ingest as data.
    pub skip_leading_rows: usize,
    /// Drop trailing values beyond the column schema instead of rejecting.
    pub skip_unknown_columns: bool,
    /// Pad short records with empty values instead of rejecting.
    pub allow_ragged_rows: bool,
}

/// What the warehouse reports back for an accepted submission.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub job_id: Uuid,
    pub rows_loaded: u64,
    /// Row-level complaints that did not reject the submission.
    pub errors: Vec<String>,
}

/// Warehouse interface: provision the target table once, then accept one
/// submission per file. Rejections are [`EngineError::Load`] (file-local);
/// infrastructure faults are [`EngineError::Transport`] (batch-fatal).
pub trait BulkLoader: Send + Sync {
    fn provision(
        &self,
        table: &str,
        columns: &[String],
        mode: WriteMode,
    ) -> Result<(), EngineError>;

    fn submit(&self, table: &str, request: &LoadRequest<'_>) -> Result<LoadOutcome, EngineError>;
}

/// Realizes the target table as `<table>.csv` in a local directory.
///
/// Submissions are parsed under their own delimiter and appended
/// re-serialized under the table's delimiter, so the table file stays
/// uniform whatever each submission used.
pub struct DelimitedFileLoader {
    dir: PathBuf,
    delimiter: u8,
}

impl DelimitedFileLoader {
    pub fn new(dir: impl Into<PathBuf>, delimiter: u8) -> Self {
        DelimitedFileLoader {
            dir: dir.into(),
            delimiter,
        }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }

    fn write_header(&self, path: &Path, columns: &[String]) -> Result<(), EngineError> {
        let file = File::create(path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(file);
        writer.write_record(columns).map_err(io::Error::other)?;
        writer.flush()?;
        Ok(())
    }
}

impl BulkLoader for DelimitedFileLoader {
    fn provision(
        &self,
        table: &str,
        columns: &[String],
        mode: WriteMode,
    ) -> Result<(), EngineError> {
        let path = self.table_path(table);
        match mode {
            WriteMode::Append if path.exists() => {
                debug!("table {table} already provisioned at {path:?}");
                Ok(())
            }
            WriteMode::Append | WriteMode::Replace => {
                self.write_header(&path, columns)?;
                debug!("provisioned table {table} at {path:?} ({mode:?})");
                Ok(())
            }
        }
    }

    fn submit(&self, table: &str, request: &LoadRequest<'_>) -> Result<LoadOutcome, EngineError> {
        let path = self.table_path(table);
        if !path.exists() {
            return Err(EngineError::Load(format!("table {table} is not provisioned")));
        }
        let width = request.columns.len();
        let mut reader = ReaderBuilder::new()
            .delimiter(request.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(request.content);

        let out = OpenOptions::new().append(true).open(&path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(out);

        let mut rows_loaded = 0u64;
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(io::Error::other)?;
            if index < request.skip_leading_rows {
                continue;
            }
            let mut fields: Vec<String> =
                record.iter().map(str::to_string).collect();
            if fields.len() > width {
                if !request.skip_unknown_columns {
                    return Err(EngineError::Load(format!(
                        "record {index} has {got} fields, table has {width}",
                        got = fields.len(),
                    )));
                }
                fields.truncate(width);
            }
            if fields.len() < width {
                if !request.allow_ragged_rows {
                    return Err(EngineError::Load(format!(
                        "record {index} has {got} fields, table has {width}",
                        got = fields.len(),
                    )));
                }
                fields.resize(width, String::new());
            }
            writer.write_record(&fields).map_err(io::Error::other)?;
            rows_loaded += 1;
        }
        writer.flush()?;

        let job_id = Uuid::new_v4();
        debug!("job {job_id}: appended {rows_loaded} row(s) to {path:?}");
        Ok(LoadOutcome {
            job_id,
            rows_loaded,
            errors: Vec::new(),
        })
    }
}

/// Records provisions and submissions without touching disk. Backs tests
/// and the `--dry-run` load mode; can be told to reject every submission.
pub struct MemoryLoader {
    provisions: Mutex<Vec<(String, Vec<String>, WriteMode)>>,
    submissions: Mutex<Vec<(String, Vec<u8>)>>,
    reject_with: Option<String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader {
            provisions: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            reject_with: None,
        }
    }

    /// A loader that rejects every submission with the given reason.
    pub fn rejecting(reason: &str) -> Self {
        MemoryLoader {
            reject_with: Some(reason.to_string()),
            ..MemoryLoader::new()
        }
    }

    pub fn provisions(&self) -> Vec<(String, Vec<String>, WriteMode)> {
        self.provisions.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn submissions(&self) -> Vec<(String, Vec<u8>)> {
        self.submissions.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MemoryLoader {
    fn default() -> Self {
        MemoryLoader::new()
    }
}

impl BulkLoader for MemoryLoader {
    fn provision(
        &self,
        table: &str,
        columns: &[String],
        mode: WriteMode,
    ) -> Result<(), EngineError> {
        if let Ok(mut provisions) = self.provisions.lock() {
            provisions.push((table.to_string(), columns.to_vec(), mode));
        }
        Ok(())
    }

    fn submit(&self, table: &str, request: &LoadRequest<'_>) -> Result<LoadOutcome, EngineError> {
        if let Some(reason) = &self.reject_with {
            return Err(EngineError::Load(reason.clone()));
        }
        let data_lines = request
            .content
            .split(|&byte| byte == b'\n')
            .filter(|line| !line.is_empty())
            .count()
            .saturating_sub(request.skip_leading_rows);
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push((table.to_string(), request.content.to_vec()));
        }
        Ok(LoadOutcome {
            job_id: Uuid::new_v4(),
            rows_loaded: data_lines as u64,
            errors: Vec::new(),
        })
    }
}

/// Where the orchestrator currently is in its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    SchemaDetecting,
    TableProvisioning,
    Loading,
    Completed,
    Failed,
}

/// Per-file disposition inside a [`LoadReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Loaded { rows: u64, job_id: Uuid },
    NoOp,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Aggregate result of one batch, reported at completion and on abort.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub target_table: String,
    pub columns: Vec<String>,
    pub files: Vec<FileReport>,
    pub attempted: usize,
    pub succeeded: usize,
    pub total_rows: u64,
}

impl LoadReport {
    fn new(target_table: &str, columns: Vec<String>) -> Self {
        LoadReport {
            target_table: target_table.to_string(),
            columns,
            files: Vec::new(),
            attempted: 0,
            succeeded: 0,
            total_rows: 0,
        }
    }

    fn record(&mut self, file: &str, outcome: FileOutcome) {
        self.attempted += 1;
        if let FileOutcome::Loaded { rows, .. } = &outcome {
            self.succeeded += 1;
            self.total_rows += rows;
        }
        self.files.push(FileReport {
            file: file.to_string(),
            outcome,
        });
    }
}

/// Drives one batch: schema, table, then every file in listing order.
pub struct LoadOrchestrator<'a> {
    config: EngineConfig,
    source: &'a dyn Discovery,
    loader: &'a dyn BulkLoader,
    state: OrchestratorState,
}

impl<'a> LoadOrchestrator<'a> {
    pub fn new(
        config: EngineConfig,
        source: &'a dyn Discovery,
        loader: &'a dyn BulkLoader,
    ) -> Self {
        LoadOrchestrator {
            config,
            source,
            loader,
            state: OrchestratorState::Idle,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Runs the batch to completion or to the first batch-fatal error.
    ///
    /// A summary is logged on every exit path. The returned report exists
    /// only for completed batches; aborts surface the fatal error instead.
    pub fn run(&mut self) -> Result<LoadReport, EngineError> {
        self.state = OrchestratorState::SchemaDetecting;
        let unified = match schema::resolve_schema(self.source, &self.config) {
            Ok(unified) => unified,
            Err(error) => return Err(self.abort(None, error)),
        };

        self.state = OrchestratorState::TableProvisioning;
        let table_columns = unified.table_columns();
        let mut report = LoadReport::new(&self.config.target_table, table_columns.clone());
        if let Err(error) =
            self.loader
                .provision(&self.config.target_table, &table_columns, self.config.write_mode)
        {
            return Err(self.abort(Some(&report), error));
        }

        self.state = OrchestratorState::Loading;
        let names = match self.source.list() {
            Ok(names) => names,
            Err(error) => return Err(self.abort(Some(&report), error)),
        };
        let projector = RowProjector::new(&unified);
        for name in &names {
            match self.load_one(name, &projector, &table_columns) {
                Ok(outcome) => {
                    info!(
                        "{name}: loaded {rows} row(s) (job {job})",
                        rows = outcome.rows_loaded,
                        job = outcome.job_id,
                    );
                    report.record(
                        name,
                        FileOutcome::Loaded {
                            rows: outcome.rows_loaded,
                            job_id: outcome.job_id,
                        },
                    );
                }
                Err(error) if error.is_noop() => {
                    info!("{name}: no data rows, nothing to load");
                    report.record(name, FileOutcome::NoOp);
                }
                Err(error) if error.is_batch_fatal() => {
                    return Err(self.abort(Some(&report), error));
                }
                Err(error) => {
                    warn!("{name}: {error}");
                    report.record(
                        name,
                        FileOutcome::Failed {
                            error: error.to_string(),
                        },
                    );
                }
            }
        }

        self.state = OrchestratorState::Completed;
        log_summary(&report);
        Ok(report)
    }

    fn load_one(
        &self,
        name: &str,
        projector: &RowProjector<'_>,
        table_columns: &[String],
    ) -> Result<LoadOutcome, EngineError> {
        let bytes = self.source.fetch(name)?;
        let file = SourceFile::resolve(name, &bytes, &self.config)?;
        let provenance = Provenance::for_file(name, &self.config);
        let batch = projector.project_file(&file, &provenance);
        if batch.row_count() == 0 {
            return Err(EngineError::EmptyData);
        }
        let content = batch.to_delimited_bytes(self.config.output_delimiter)?;
        let request = LoadRequest {
            columns: table_columns,
            delimiter: self.config.output_delimiter,
            content: &content,
            skip_leading_rows: 1,
            skip_unknown_columns: true,
            allow_ragged_rows: true,
        };
        self.loader.submit(&self.config.target_table, &request)
    }

    fn abort(&mut self, report: Option<&LoadReport>, error: EngineError) -> EngineError {
        self.state = OrchestratorState::Failed;
        match report {
            Some(report) => log_summary(report),
            None => info!(
                "loaded 0/0 file(s), 0 row(s) into {table}",
                table = self.config.target_table
            ),
        }
        error
    }
}

fn log_summary(report: &LoadReport) {
    info!(
        "loaded {succeeded}/{attempted} file(s), {rows} row(s) into {table}",
        succeeded = report.succeeded,
        attempted = report.attempted,
        rows = report.total_rows,
        table = report.target_table,
    );
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::source::MemorySource;

    fn corpus() -> MemorySource {
        MemorySource::new()
            .with_file("basica2024-01.txt", b"nome;idade\nAna;30\nRui;41\n")
            .with_file("basica2024-02.txt", b"idade;cidade\n30;Rio\n")
    }

    // Serves the named file's first fetch and fails every later one. The
    // first fetch is the sampling one, so the loading-phase fetch faults.
    struct FlakySource {
        inner: MemorySource,
        fails_after_first: String,
        fetched: Mutex<usize>,
    }

    impl Discovery for FlakySource {
        fn list(&self) -> Result<Vec<String>, EngineError> {
            self.inner.list()
        }

        fn fetch(&self, name: &str) -> Result<Vec<u8>, EngineError> {
            if name == self.fails_after_first {
                let mut fetched = self.fetched.lock().expect("lock");
                *fetched += 1;
                if *fetched > 1 {
                    return Err(EngineError::Transport(io::Error::other(
                        "connection reset by peer",
                    )));
                }
            }
            self.inner.fetch(name)
        }
    }

    #[test]
    fn completes_and_aggregates_over_a_healthy_corpus() {
        let source = corpus();
        let loader = MemoryLoader::new();
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        let report = orchestrator.run().expect("run");

        assert_eq!(orchestrator.state(), OrchestratorState::Completed);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.total_rows, 3);
        assert_eq!(loader.submissions().len(), 2);
        let (table, columns, _) = &loader.provisions()[0];
        assert_eq!(table, "anac");
        assert_eq!(
            columns,
            &vec!["source_file", "file_date", "cidade", "idade", "nome"]
        );
    }

    #[test]
    fn submitted_content_is_projected_into_unified_order() {
        let source = corpus();
        let loader = MemoryLoader::new();
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        orchestrator.run().expect("run");

        let submissions = loader.submissions();
        let first = String::from_utf8(submissions[0].1.clone()).expect("utf-8");
        assert_eq!(
            first,
            "source_file;file_date;cidade;idade;nome\n\
             basica2024-01.txt;2024-01;;30;Ana\n\
             basica2024-01.txt;2024-01;;41;Rui\n"
        );
        let second = String::from_utf8(submissions[1].1.clone()).expect("utf-8");
        assert!(second.ends_with("basica2024-02.txt;2024-02;Rio;30;\n"));
    }

    #[test]
    fn unsniffable_file_is_recorded_and_batch_continues() {
        let source = corpus().with_file("bad.txt", b"lone_column\nvalue\n");
        let loader = MemoryLoader::new();
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        let report = orchestrator.run().expect("run");

        assert_eq!(orchestrator.state(), OrchestratorState::Completed);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert!(matches!(
            report.files[2].outcome,
            FileOutcome::Failed { .. }
        ));
    }

    #[test]
    fn data_free_file_is_a_no_op_not_a_failure() {
        let source = corpus().with_file("empty.txt", b"nome;idade\n\n");
        let loader = MemoryLoader::new();
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        let report = orchestrator.run().expect("run");

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.files[2].outcome, FileOutcome::NoOp);
        assert_eq!(loader.submissions().len(), 2);
    }

    #[test]
    fn rejected_submissions_fail_per_file_only() {
        let source = corpus();
        let loader = MemoryLoader::rejecting("quota exceeded");
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        let report = orchestrator.run().expect("run");

        assert_eq!(orchestrator.state(), OrchestratorState::Completed);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.attempted, 2);
        assert!(report.files.iter().all(|f| matches!(
            f.outcome,
            FileOutcome::Failed { .. }
        )));
    }

    #[test]
    fn undetectable_schema_aborts_before_provisioning() {
        let source = MemorySource::new().with_file("junk.txt", b"(%);123\nx;y\n");
        let loader = MemoryLoader::new();
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        let error = orchestrator.run().expect_err("fatal");

        assert!(matches!(error, EngineError::SchemaDetection));
        assert_eq!(orchestrator.state(), OrchestratorState::Failed);
        assert!(loader.provisions().is_empty());
        assert!(loader.submissions().is_empty());
    }

    #[test]
    fn provisioning_fault_aborts_before_any_submission() {
        let source = corpus();
        let dir = TempDir::new().expect("temp dir");
        let loader = DelimitedFileLoader::new(dir.path().join("missing"), b';');
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        let error = orchestrator.run().expect_err("fatal");

        assert!(matches!(error, EngineError::Transport(_)));
        assert_eq!(orchestrator.state(), OrchestratorState::Failed);
        assert!(!loader.table_path("anac").exists());
    }

    #[test]
    fn transport_fault_while_loading_aborts_and_keeps_prior_work() {
        let source = FlakySource {
            inner: corpus(),
            fails_after_first: String::from("basica2024-02.txt"),
            fetched: Mutex::new(0),
        };
        let loader = MemoryLoader::new();
        let mut orchestrator =
            LoadOrchestrator::new(EngineConfig::for_table("anac"), &source, &loader);
        let error = orchestrator.run().expect_err("fatal");

        assert!(matches!(error, EngineError::Transport(_)));
        assert_eq!(orchestrator.state(), OrchestratorState::Failed);
        // Sampling read both files, the first file loaded, then the abort.
        assert_eq!(loader.provisions().len(), 1);
        assert_eq!(loader.submissions().len(), 1);
    }

    #[test]
    fn delimited_file_loader_appends_and_replaces() {
        let dir = TempDir::new().expect("temp dir");
        let loader = DelimitedFileLoader::new(dir.path(), b';');
        let columns: Vec<String> = ["source_file", "file_date", "nome"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        loader
            .provision("anac", &columns, WriteMode::Replace)
            .expect("provision");
        let content = b"source_file;file_date;nome\na.txt;2024;Ana\n";
        let outcome = loader
            .submit(
                "anac",
                &LoadRequest {
                    columns: &columns,
                    delimiter: b';',
                    content,
                    skip_leading_rows: 1,
                    skip_unknown_columns: true,
                    allow_ragged_rows: true,
                },
            )
            .expect("submit");
        assert_eq!(outcome.rows_loaded, 1);

        // Append provisioning leaves the existing table alone.
        loader
            .provision("anac", &columns, WriteMode::Append)
            .expect("re-provision");
        let table = std::fs::read_to_string(loader.table_path("anac")).expect("read");
        assert_eq!(table, "source_file;file_date;nome\na.txt;2024;Ana\n");

        // Replace provisioning clears it back to the header.
        loader
            .provision("anac", &columns, WriteMode::Replace)
            .expect("replace");
        let table = std::fs::read_to_string(loader.table_path("anac")).expect("read");
        assert_eq!(table, "source_file;file_date;nome\n");
    }

    #[test]
    fn delimited_file_loader_normalizes_ragged_submissions() {
        let dir = TempDir::new().expect("temp dir");
        let loader = DelimitedFileLoader::new(dir.path(), b';');
        let columns: Vec<String> = ["a", "b", "c"].iter().map(|c| c.to_string()).collect();
        loader
            .provision("t", &columns, WriteMode::Replace)
            .expect("provision");

        let content = b"a;b;c\n1;2\n1;2;3;4\n";
        let outcome = loader
            .submit(
                "t",
                &LoadRequest {
                    columns: &columns,
                    delimiter: b';',
                    content,
                    skip_leading_rows: 1,
                    skip_unknown_columns: true,
                    allow_ragged_rows: true,
                },
            )
            .expect("submit");
        assert_eq!(outcome.rows_loaded, 2);
        let table = std::fs::read_to_string(loader.table_path("t")).expect("read");
        assert_eq!(table, "a;b;c\n1;2;\n1;2;3\n");
    }

    #[test]
    fn submitting_to_an_unprovisioned_table_is_a_load_error() {
        let dir = TempDir::new().expect("temp dir");
        let loader = DelimitedFileLoader::new(dir.path(), b';');
        let columns = vec![String::from("a")];
        let error = loader
            .submit(
                "missing",
                &LoadRequest {
                    columns: &columns,
                    delimiter: b';',
                    content: b"a\n1\n",
                    skip_leading_rows: 1,
                    skip_unknown_columns: true,
                    allow_ragged_rows: true,
                },
            )
            .expect_err("unprovisioned");
        assert!(matches!(error, EngineError::Load(_)));
        assert!(!error.is_batch_fatal());
    }
}
