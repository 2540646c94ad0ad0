use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Rectangular grid of text cells, exactly as laid out in the source file.
/// Empty cells are empty strings; ragged rows are padded on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Swap rows and columns: the sources store records as columns.
    pub fn transpose(&self) -> RawTable {
        let (height, width) = (self.height(), self.width());
        let rows = (0..width)
            .map(|c| (0..height).map(|r| self.rows[r][c].clone()).collect())
            .collect();
        RawTable { rows }
    }

    /// Parse delimited text without a header row.
    pub fn from_delimited(text: &str, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(rows))
    }

    /// Read a delimited file, decoding it with the given encoding label.
    pub fn read_delimited(path: &Path, delimiter: u8, encoding_label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(encoding_label.as_bytes()).ok_or_else(|| {
            PipelineError::Config(format!("unknown encoding label '{encoding_label}'"))
        })?;
        let bytes = fs::read(path).map_err(|e| PipelineError::load(path, e.to_string()))?;
        let (text, used, had_errors) = encoding.decode(&bytes);
        if had_errors {
            warn!(
                "{}: malformed {} sequences replaced while decoding",
                path.display(),
                used.name()
            );
        }
        let table = Self::from_delimited(&text, delimiter)
            .map_err(|e| PipelineError::load(path, e.to_string()))?;
        debug!(
            "Read {} ({} x {}) as delimited text",
            path.display(),
            table.height(),
            table.width()
        );
        Ok(table)
    }

    /// Read the first worksheet of an Excel/ODS workbook.
    pub fn read_workbook(path: &Path) -> Result<Self> {
        let range = first_sheet(path).map_err(|e| PipelineError::load(path, e.to_string()))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let table = Self::new(rows);
        debug!(
            "Read {} ({} x {}) as workbook",
            path.display(),
            table.height(),
            table.width()
        );
        Ok(table)
    }

    /// Dispatch on file extension: `.csv`/`.txt` are delimited text, anything
    /// else is opened as a workbook.
    pub fn read(path: &Path, delimiter: u8, encoding_label: &str) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") | Some("txt") => Self::read_delimited(path, delimiter, encoding_label),
            _ => Self::read_workbook(path),
        }
    }
}

fn first_sheet(path: &Path) -> std::result::Result<calamine::Range<Data>, calamine::Error> {
    let mut workbook = open_workbook_auto(path)?;
    workbook
        .worksheet_range_at(0)
        .unwrap_or(Err(calamine::Error::Msg("workbook has no worksheet")))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
