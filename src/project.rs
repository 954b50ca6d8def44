//! Row projection into the unified schema.
//!
//! Once the unified schema is frozen, every file's rows are rewritten into
//! its column order: values are looked up through the file's own normalized
//! header map, absent columns fill with the empty string, embedded `"`
//! characters become `'`, and the two provenance values are prepended. The
//! projected batch then re-serializes under the configured output delimiter
//! for submission to the bulk loader.

use std::collections::{HashMap, HashSet};
use std::io;

use csv::{QuoteStyle, WriterBuilder};
use itertools::Itertools;
use log::debug;

use crate::columns::local_column_name;
use crate::dialect;
use crate::error::EngineError;
use crate::schema::UnifiedSchema;
use crate::source::{Provenance, SourceFile};

/// One file's rows after projection, with the table header they align to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedBatch {
    /// Provenance columns followed by the unified columns.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ProjectedBatch {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Serializes the batch as one header line plus one record per row,
    /// quoting with `"` only where the delimiter or a quote would otherwise
    /// break the record apart.
    pub fn to_delimited_bytes(&self, delimiter: u8) -> Result<Vec<u8>, EngineError> {
        let mut buffer = Vec::new();
        {
            let mut writer = WriterBuilder::new()
                .delimiter(delimiter)
                .quote_style(QuoteStyle::Necessary)
                .from_writer(&mut buffer);
            writer.write_record(&self.columns).map_err(io::Error::other)?;
            for row in &self.rows {
                writer.write_record(row).map_err(io::Error::other)?;
            }
            writer.flush()?;
        }
        Ok(buffer)
    }
}

/// Projects files against one frozen [`UnifiedSchema`].
pub struct RowProjector<'a> {
    unified: &'a UnifiedSchema,
}

impl<'a> RowProjector<'a> {
    pub fn new(unified: &'a UnifiedSchema) -> Self {
        RowProjector { unified }
    }

    /// Rewrites every data line of one resolved file into unified order.
    ///
    /// The local header map is built in header order with later duplicates
    /// overwriting earlier ones. Every produced row has exactly
    /// `unified.len() + 2` fields; ragged data lines fill short columns
    /// with the empty string. An empty result means the file had no data
    /// rows and is the caller's no-op case.
    pub fn project_file(&self, file: &SourceFile, provenance: &Provenance) -> ProjectedBatch {
        let local = local_header_map(&file.raw_headers);
        self.log_unmapped(&file.name, &local);

        let mut rows = Vec::new();
        for line in file.data_lines() {
            let fields = dialect::tokenize(line, &file.dialect);
            let mut row = Vec::with_capacity(self.unified.len() + 2);
            row.push(provenance.source_file.clone());
            row.push(provenance.file_date.clone());
            for column in &self.unified.columns {
                let value = local
                    .get(column.as_str())
                    .and_then(|&index| fields.get(index))
                    .map(|field| sanitize(field))
                    .unwrap_or_default();
                row.push(value);
            }
            rows.push(row);
        }
        ProjectedBatch {
            columns: self.unified.table_columns(),
            rows,
        }
    }

    fn log_unmapped(&self, name: &str, local: &HashMap<String, usize>) {
        let unified: HashSet<&str> = self.unified.columns.iter().map(String::as_str).collect();
        let unmapped: Vec<&str> = local
            .keys()
            .map(String::as_str)
            .filter(|column| !unified.contains(column))
            .sorted()
            .collect();
        if !unmapped.is_empty() {
            debug!(
                "{name}: {count} local column(s) outside the unified schema: {unmapped:?}",
                count = unmapped.len(),
            );
        }
    }
}

/// Maps each normalized local header name to its field position. Later
/// occurrences of the same normalized name overwrite earlier ones.
fn local_header_map(raw_headers: &[String]) -> HashMap<String, usize> {
    raw_headers
        .iter()
        .enumerate()
        .map(|(index, raw)| (local_column_name(raw, index), index))
        .collect()
}

fn sanitize(value: &str) -> String {
    value.replace('"', "'")
}
