//! Candidate-list encoding resolution.
//!
//! Government corpora mix Latin-1, Windows-1252, and UTF-8 content without
//! declaring which; the resolver probes a fixed, ordered candidate list and
//! accepts the first encoding that decodes the full byte sequence without
//! errors. There is no detection heuristic and no retry, just a
//! deterministic probe, so the same bytes always resolve the same way.

use anyhow::{Result, anyhow};
use encoding_rs::Encoding;

use crate::error::EngineError;

/// Probe order used when the caller does not override candidates.
pub const DEFAULT_ENCODING_LABELS: &[&str] =
    &["latin1", "iso-8859-1", "utf-8", "windows-1252"];

/// A file's content decoded under the first candidate that accepted it.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub encoding: &'static Encoding,
    pub text: String,
}

impl DecodedText {
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Resolves a list of encoding labels into `encoding_rs` encodings.
///
/// Unknown labels are a configuration error, reported at the CLI boundary
/// before any file is touched.
pub fn resolve_candidates(labels: &[String]) -> Result<Vec<&'static Encoding>> {
    labels
        .iter()
        .map(|label| {
            Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| anyhow!("Unknown encoding '{label}'"))
        })
        .collect()
}

pub fn default_candidates() -> Vec<&'static Encoding> {
    DEFAULT_ENCODING_LABELS
        .iter()
        .map(|label| {
            Encoding::for_label(label.as_bytes()).expect("default encoding labels resolve")
        })
        .collect()
}

/// Returns the decoded text under the first candidate whose decode reports
/// no errors, or [`EngineError::Decode`] when every candidate fails.
pub fn resolve_text(
    bytes: &[u8],
    candidates: &[&'static Encoding],
) -> Result<DecodedText, EngineError> {
    for &encoding in candidates {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok(DecodedText {
                encoding,
                text: text.into_owned(),
            });
        }
    }
    Err(EngineError::Decode {
        tried: candidates.iter().map(|e| e.name().to_string()).collect(),
    })
}
