use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::raw_table::RawTable;
use crate::error::{PipelineError, Result};
use crate::metrics::IngestionMetrics;
use crate::pipeline::processing::normalize::{clean_cell, clean_header};

/// Table whose header was resolved from two language rows.
///
/// Source workbooks store fields as rows: the first column holds the French
/// label, the second the English label, and every following column is one
/// record. After transposition each record is a row.
#[derive(Debug, Clone, PartialEq)]
pub struct DualHeaderTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Labels appearing more than once, in first-appearance order
    pub duplicates: Vec<String>,
}

impl DualHeaderTable {
    /// Build from a table in file orientation (fields as rows).
    pub fn from_raw(raw: &RawTable, source: &Path) -> Result<Self> {
        if raw.height() == 0 {
            return Err(PipelineError::load(source, "file contains no fields"));
        }
        if raw.width() < 2 {
            return Err(PipelineError::load(
                source,
                format!(
                    "expected two header columns (French, English), found {}",
                    raw.width()
                ),
            ));
        }

        let records = raw.transpose();
        let headers: Vec<String> = records.rows[0]
            .iter()
            .zip(&records.rows[1])
            .enumerate()
            .map(|(i, (first, second))| {
                let first = clean_header(first);
                if !first.is_empty() {
                    return first;
                }
                let second = clean_header(second);
                if second.is_empty() {
                    format!("Unnamed: {i}")
                } else {
                    second
                }
            })
            .collect();

        let duplicates = find_duplicates(&headers);
        if !duplicates.is_empty() {
            warn!(
                "{}: duplicate column labels {:?}; first occurrence wins",
                source.display(),
                duplicates
            );
            IngestionMetrics::record_duplicate_headers(duplicates.len());
        }

        let rows: Vec<Vec<String>> = records.rows.into_iter().skip(2).collect();
        IngestionMetrics::record_rows_read(rows.len());

        Ok(Self {
            headers,
            rows,
            duplicates,
        })
    }

    /// Index of the first column carrying this label
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Rename every column labelled `from`
    pub fn rename(&mut self, from: &str, to: &str) {
        for header in self.headers.iter_mut().filter(|h| h.as_str() == from) {
            *header = to.to_string();
        }
    }

    /// Trimmed cell content, `None` when blank
    pub fn value(&self, row: usize, col: usize) -> Option<String> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|c| clean_cell(c))
    }

    /// Trimmed cell content of the named column
    pub fn value_of(&self, row: usize, name: &str) -> Option<String> {
        self.column(name).and_then(|col| self.value(row, col))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn find_duplicates(headers: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for header in headers {
        *counts.entry(header.as_str()).or_default() += 1;
    }
    let mut duplicates: Vec<String> = Vec::new();
    for header in headers {
        if counts[header.as_str()] > 1 && !duplicates.contains(header) {
            duplicates.push(header.clone());
        }
    }
    duplicates
}

/// Read a dual-header workbook (or its CSV export) from disk.
pub fn read_dual_header(path: &Path, delimiter: u8) -> Result<DualHeaderTable> {
    let raw = RawTable::read(path, delimiter, "utf-8")?;
    let table = DualHeaderTable::from_raw(&raw, path)?;
    info!(
        "Loaded {} records with {} columns from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}
