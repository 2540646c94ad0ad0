use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::pipeline::ingestion::DualHeaderTable;

pub mod metadata;

pub use metadata::{CategoryNormalizer, CategoryTable, MetadataTable, ProcessMetadataNormalizer};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Outcome of coercing a cell to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coercion {
    Value(f64),
    /// Empty cell: missing, not a gap
    Blank,
    /// Non-empty cell that is not a finite number
    Gap,
}

impl Coercion {
    pub fn value(self) -> Option<f64> {
        match self {
            Coercion::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Trim a data cell; blank cells become `None`.
pub fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trim a header label and collapse internal whitespace runs to one space.
pub fn clean_header(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    headers.iter().map(|h| clean_header(h)).collect()
}

/// Parse a cell as a float. Never fails: unparseable text is a gap and
/// downstream treats it as missing. `NaN` counts as blank.
pub fn coerce_number(raw: &str) -> Coercion {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Coercion::Blank;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => Coercion::Blank,
        Ok(v) if v.is_finite() => Coercion::Value(v),
        _ => Coercion::Gap,
    }
}

/// Converts a resolved dual-header table into typed, canonically named rows
pub trait Normalizer {
    type Output;

    fn normalize(&self, table: DualHeaderTable) -> Result<Self::Output>;
}
