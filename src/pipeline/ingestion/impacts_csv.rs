use std::path::Path;
use tracing::{debug, info, instrument};

use super::raw_table::RawTable;
use crate::constants::{IMPACT_ID_COLUMNS, IMPACT_METADATA_ROWS, IMPACT_WIDE_HEADER_ROW};
use crate::error::{PipelineError, Result};
use crate::metrics::IngestionMetrics;
use crate::pipeline::processing::normalize::{clean_cell, clean_header, coerce_number, Coercion};
use crate::types::{ImpactValue, WideColumn, WideImpacts};

/// Both views of the impacts file, derived from the same parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImpactTables {
    /// One row per (process, category), category-major like a melt
    pub long: Vec<ImpactValue>,
    /// One row per process, one column per category
    pub wide: WideImpacts,
    /// Non-blank cells that failed numeric coercion
    pub coercion_gaps: usize,
    /// Data rows skipped for lack of a process identifier
    pub dropped_rows: usize,
}

/// Reshape the impacts table.
///
/// The file is transposed: after swapping axes, rows 0-3 describe the
/// categories (row 0 holds the category identifiers, row 2 the localized
/// names) and every following row is one process. Columns 0 and 1 carry the
/// process identifier and name; each further column is one category.
pub fn parse_impacts(raw: &RawTable, source: &Path) -> Result<ImpactTables> {
    let table = raw.transpose();
    if table.height() < IMPACT_METADATA_ROWS {
        return Err(PipelineError::load(
            source,
            format!(
                "expected {} category metadata rows, found {}",
                IMPACT_METADATA_ROWS,
                table.height()
            ),
        ));
    }
    if table.width() < IMPACT_ID_COLUMNS {
        return Err(PipelineError::load(
            source,
            "expected process identifier and name columns",
        ));
    }

    let category_columns: Vec<(usize, String)> = (IMPACT_ID_COLUMNS..table.width())
        .filter_map(|col| {
            let uuid = clean_header(table.cell(0, col));
            if uuid.is_empty() {
                debug!("Skipping impacts column {} without category identifier", col);
                None
            } else {
                Some((col, uuid))
            }
        })
        .collect();

    let mut process_rows = Vec::new();
    let mut dropped_rows = 0;
    for row in IMPACT_METADATA_ROWS..table.height() {
        match clean_cell(table.cell(row, 0)) {
            Some(uuid) => process_rows.push((row, uuid, clean_cell(table.cell(row, 1)))),
            None => dropped_rows += 1,
        }
    }

    let mut coercion_gaps = 0;
    let mut long = Vec::with_capacity(category_columns.len() * process_rows.len());
    let mut columns = Vec::with_capacity(category_columns.len());
    for (col, category_uuid) in &category_columns {
        let mut values = Vec::with_capacity(process_rows.len());
        for (row, process_uuid, process_name) in &process_rows {
            let value = match coerce_number(table.cell(*row, *col)) {
                Coercion::Value(v) => Some(v),
                Coercion::Blank => None,
                Coercion::Gap => {
                    coercion_gaps += 1;
                    None
                }
            };
            values.push(value);
            long.push(ImpactValue {
                process_uuid: process_uuid.clone(),
                process_name: process_name.clone(),
                category_uuid: category_uuid.clone(),
                value,
            });
        }
        columns.push(WideColumn {
            label: clean_header(table.cell(IMPACT_WIDE_HEADER_ROW, *col)),
            category_uuid: category_uuid.clone(),
            values,
        });
    }

    let wide = WideImpacts {
        process_uuids: process_rows.into_iter().map(|(_, uuid, _)| uuid).collect(),
        columns,
    };

    IngestionMetrics::record_rows_read(wide.process_uuids.len());
    IngestionMetrics::record_coercion_gaps(coercion_gaps);
    IngestionMetrics::record_dropped_rows(dropped_rows);

    Ok(ImpactTables {
        long,
        wide,
        coercion_gaps,
        dropped_rows,
    })
}

/// Read and reshape the semicolon-delimited impacts file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_impacts(path: &Path, delimiter: u8, encoding: &str) -> Result<ImpactTables> {
    let raw = RawTable::read(path, delimiter, encoding)?;
    let tables = parse_impacts(&raw, path)?;
    info!(
        "Loaded {} processes x {} categories ({} coercion gaps, {} rows without identifier)",
        tables.wide.process_uuids.len(),
        tables.wide.columns.len(),
        tables.coercion_gaps,
        tables.dropped_rows
    );
    Ok(tables)
}
