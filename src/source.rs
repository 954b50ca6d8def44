//! Source files and corpus discovery.
//!
//! A [`SourceFile`] is one corpus member after resolution: decoded text,
//! sniffed dialect, and raw header fields, each fixed exactly once. The
//! [`Discovery`] trait abstracts where the corpus lives; the engine only
//! sees an ordered sequence of names it can fetch bytes for.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::EngineConfig;
use crate::dialect::{self, Dialect};
use crate::encoding;
use crate::error::EngineError;

/// One corpus file with its per-file resolution done.
///
/// Encoding, dialect, and header are resolved in the constructor and never
/// re-evaluated afterwards.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub encoding: &'static str,
    pub text: String,
    pub dialect: Dialect,
    pub header_index: usize,
    pub raw_headers: Vec<String>,
}

impl SourceFile {
    /// Decodes the bytes, finds the header line, and sniffs the dialect.
    ///
    /// Any step failing yields the corresponding file-local error; the
    /// caller decides whether that skips the file or aborts the batch.
    pub fn resolve(name: &str, bytes: &[u8], config: &EngineConfig) -> Result<Self, EngineError> {
        let decoded = encoding::resolve_text(bytes, &config.candidate_encodings)?;
        let (header_index, header_line) =
            dialect::find_header_line(&decoded.text).ok_or(EngineError::NoHeader)?;
        let (file_dialect, raw_headers) =
            dialect::sniff_dialect(header_line, &config.candidate_delimiters)?;
        debug!(
            "{name}: encoding {encoding}, delimiter {delimiter:?}, {count} header fields",
            encoding = decoded.encoding_name(),
            delimiter = file_dialect.delimiter as char,
            count = raw_headers.len(),
        );
        Ok(SourceFile {
            name: name.to_string(),
            encoding: decoded.encoding_name(),
            text: decoded.text,
            dialect: file_dialect,
            header_index,
            raw_headers,
        })
    }

    /// Lines strictly after the header line, blank lines dropped. Comment
    /// lines in the data region are data.
    pub fn data_lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .lines()
            .skip(self.header_index + 1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// Metadata columns stamped onto every projected row of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_file: String,
    pub file_date: String,
}

impl Provenance {
    pub fn for_file(name: &str, config: &EngineConfig) -> Self {
        Provenance {
            source_file: name.to_string(),
            file_date: file_date(name, &config.date_prefix, &config.date_suffix),
        }
    }
}

/// Derives the `file_date` token from a filename: drop the extension, strip
/// the configured literal prefix and suffix, trim separator leftovers.
/// Filenames that do not follow the convention produce an empty token, not
/// an error.
pub fn file_date(name: &str, prefix: &str, suffix: &str) -> String {
    let base = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name);
    let mut token = base;
    if !prefix.is_empty() {
        token = token.strip_prefix(prefix).unwrap_or(token);
    }
    if !suffix.is_empty() {
        token = token.strip_suffix(suffix).unwrap_or(token);
    }
    token.trim_matches(['-', '_']).to_string()
}

/// Where corpus files come from. Listing order is the processing order, so
/// implementations must be deterministic about it.
pub trait Discovery: Send + Sync {
    fn list(&self) -> Result<Vec<String>, EngineError>;
    fn fetch(&self, name: &str) -> Result<Vec<u8>, EngineError>;
}

/// Corpus rooted at a local directory. Names are bare file names; listing
/// filters on the configured extensions and sorts lexicographically.
pub struct DirSource {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>, extensions: &[String]) -> Self {
        DirSource {
            dir: dir.into(),
            extensions: extensions.to_vec(),
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }
}

impl Discovery for DirSource {
    fn list(&self) -> Result<Vec<String>, EngineError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && self.matches_extension(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        Ok(fs::read(self.dir.join(name))?)
    }
}

/// In-memory corpus preserving insertion order. Intended for tests and
/// dry runs where listing order must be controlled exactly.
pub struct MemorySource {
    files: Vec<(String, Vec<u8>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource { files: Vec::new() }
    }

    pub fn with_file(mut self, name: &str, bytes: &[u8]) -> Self {
        self.files.push((name.to_string(), bytes.to_vec()));
        self
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        MemorySource::new()
    }
}

impl Discovery for MemorySource {
    fn list(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.files.iter().map(|(name, _)| name.clone()).collect())
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.files
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| {
                EngineError::Transport(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such corpus file: {name}"),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn file_date_strips_extension_and_prefix() {
        assert_eq!(file_date("basica2024-01.txt", "basica", ""), "2024-01");
        assert_eq!(file_date("basica_2023-12.txt", "basica", ""), "2023-12");
    }

    #[test]
    fn file_date_strips_suffix_token() {
        assert_eq!(file_date("2024-01_final.csv", "", "final"), "2024-01");
    }

    #[test]
    fn unconventional_names_yield_empty_or_partial_dates() {
        assert_eq!(file_date("basica.txt", "basica", ""), "");
        assert_eq!(file_date("voos_2024.txt", "basica", ""), "voos_2024");
    }

    #[test]
    fn resolve_fixes_encoding_dialect_and_header() {
        let config = EngineConfig::default();
        let bytes = b"# comentario\nnome;idade\nAna;30\n";
        let file = SourceFile::resolve("basica2024-01.txt", bytes, &config).expect("resolve");
        assert_eq!(file.dialect.delimiter, b';');
        assert_eq!(file.header_index, 1);
        assert_eq!(file.raw_headers, vec!["nome", "idade"]);
        assert_eq!(file.data_lines().collect::<Vec<_>>(), vec!["Ana;30"]);
    }

    #[test]
    fn data_lines_skip_blanks_but_keep_comments() {
        let config = EngineConfig::default();
        let bytes = b"nome;idade\n\nAna;30\n# nota\n  \nRui;41\n";
        let file = SourceFile::resolve("a.txt", bytes, &config).expect("resolve");
        assert_eq!(
            file.data_lines().collect::<Vec<_>>(),
            vec!["Ana;30", "# nota", "Rui;41"]
        );
    }

    #[test]
    fn dir_source_lists_sorted_and_filtered() {
        let dir = TempDir::new().expect("temp dir");
        for name in ["b.txt", "a.txt", "notes.md", "c.TXT"] {
            let mut file = File::create(dir.path().join(name)).expect("create");
            writeln!(file, "x;y").expect("write");
        }
        let source = DirSource::new(dir.path(), &[String::from("txt")]);
        assert_eq!(source.list().expect("list"), vec!["a.txt", "b.txt", "c.TXT"]);
        assert_eq!(source.fetch("a.txt").expect("fetch"), b"x;y\n");
    }

    #[test]
    fn memory_source_preserves_insertion_order() {
        let source = MemorySource::new()
            .with_file("z.txt", b"a;b\n")
            .with_file("a.txt", b"c;d\n");
        assert_eq!(source.list().expect("list"), vec!["z.txt", "a.txt"]);
        assert!(source.fetch("missing.txt").is_err());
    }
}
