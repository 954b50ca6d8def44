//! Error taxonomy for the reconciliation engine.
//!
//! Every fallible engine operation returns [`EngineError`]; the orchestrator
//! alone decides disposition through [`EngineError::is_batch_fatal`] and
//! [`EngineError::is_noop`]. Data-quality faults (undecodable bytes, missing
//! headers, undetectable delimiters, rejected submissions) are file-local:
//! the offending file is skipped and the batch continues. Infrastructure
//! faults (transport, authorization) and an empty detected schema abort the
//! whole batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No candidate encoding decoded the byte content without errors.
    #[error("no candidate encoding decoded the content (tried {tried:?})")]
    Decode { tried: Vec<String> },

    /// The file contains no non-blank, non-comment line to use as a header.
    #[error("no header line found")]
    NoHeader,

    /// No candidate delimiter split the header into at least two fields.
    #[error("no delimiter candidate produced more than one field")]
    Dialect,

    /// A header was found but the file projects to zero data rows.
    #[error("header present but no data rows")]
    EmptyData,

    /// The schema sample yielded no valid column names at all.
    #[error("schema sample produced no usable column names")]
    SchemaDetection,

    /// The bulk-load collaborator rejected a submission.
    #[error("bulk load rejected: {0}")]
    Load(String),

    /// Transport or authorization failure from a collaborator.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),
}

impl EngineError {
    /// True for faults that abort the batch rather than skipping one file.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::SchemaDetection | EngineError::Transport(_)
        )
    }

    /// True when the condition is recorded as a no-op, not a failure.
    pub fn is_noop(&self) -> bool {
        matches!(self, EngineError::EmptyData)
    }
}
