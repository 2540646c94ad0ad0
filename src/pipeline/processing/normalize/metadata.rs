use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::Normalizer;
use crate::config::ColumnsConfig;
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::metrics::IngestionMetrics;
use crate::pipeline::ingestion::DualHeaderTable;
use crate::types::{CategoryPath, ImpactCategory, ProcessMetadata};

/// Normalized process metadata plus the canonical column list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    pub columns: Vec<String>,
    pub processes: Vec<ProcessMetadata>,
    pub dropped_rows: usize,
}

impl MetadataTable {
    pub fn find(&self, uuid: &str) -> Option<&ProcessMetadata> {
        self.processes.iter().find(|p| p.uuid == uuid)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    pub columns: Vec<String>,
    pub categories: Vec<ImpactCategory>,
    pub dropped_rows: usize,
}

impl CategoryTable {
    /// Distinct display names in table order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.categories.iter().filter_map(|c| c.display_name()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

fn require(table: &DualHeaderTable, name: &str, table_name: &str) -> Result<usize> {
    table.column(name).ok_or_else(|| PipelineError::MissingColumn {
        table: table_name.to_string(),
        column: name.to_string(),
    })
}

fn optional(table: &DualHeaderTable, name: &str, table_name: &str) -> Option<usize> {
    let col = table.column(name);
    if col.is_none() {
        debug!("{}: no '{}' column, values will be null", table_name, name);
    }
    col
}

fn cell(table: &DualHeaderTable, row: usize, col: Option<usize>) -> Option<String> {
    col.and_then(|c| table.value(row, c))
}

/// Renames the category-level headers and extracts one `ProcessMetadata`
/// per record. Records with a blank identifier are dropped.
pub struct ProcessMetadataNormalizer<'a> {
    pub columns: &'a ColumnsConfig,
}

impl<'a> ProcessMetadataNormalizer<'a> {
    pub fn new(columns: &'a ColumnsConfig) -> Self {
        Self { columns }
    }
}

impl Normalizer for ProcessMetadataNormalizer<'_> {
    type Output = MetadataTable;

    fn normalize(&self, mut table: DualHeaderTable) -> Result<MetadataTable> {
        const TABLE: &str = "process metadata";
        let columns = self.columns;

        for (source, canonical) in columns.category_levels.iter().zip(constants::CATEGORY_LEVELS) {
            table.rename(source, canonical);
        }
        if columns.process_uuid != constants::UUID {
            table.rename(&columns.process_uuid, constants::UUID);
        }

        let uuid_col = require(&table, constants::UUID, TABLE)?;
        let level_cols = constants::CATEGORY_LEVELS.map(|name| optional(&table, name, TABLE));
        let name_col = optional(&table, &columns.process_name, TABLE);
        let flow_col = optional(&table, &columns.flow_name, TABLE);
        let unit_col = optional(&table, &columns.unit, TABLE);
        let quantity_col = optional(&table, &columns.reference_quantity, TABLE);
        let zone_col = optional(&table, &columns.geographic_zone, TABLE);
        let dataset_col = optional(&table, &columns.dataset_type, TABLE);

        let mut processes = Vec::with_capacity(table.len());
        let mut dropped_rows = 0;
        for row in 0..table.len() {
            let Some(uuid) = table.value(row, uuid_col) else {
                dropped_rows += 1;
                continue;
            };
            processes.push(ProcessMetadata {
                uuid,
                name: cell(&table, row, name_col),
                path: CategoryPath::from_levels(level_cols.map(|col| cell(&table, row, col))),
                flow_name: cell(&table, row, flow_col),
                unit: cell(&table, row, unit_col),
                reference_quantity: cell(&table, row, quantity_col),
                geographic_zone: cell(&table, row, zone_col),
                dataset_type: cell(&table, row, dataset_col),
            });
        }

        if dropped_rows > 0 {
            warn!("{}: dropped {} records without identifier", TABLE, dropped_rows);
            IngestionMetrics::record_dropped_rows(dropped_rows);
        }
        info!("Normalized {} process metadata records", processes.len());

        Ok(MetadataTable {
            columns: table.headers,
            processes,
            dropped_rows,
        })
    }
}

/// Renames the identifier header to `UUID_cat` and extracts one
/// `ImpactCategory` per record. Records without identifier or without any
/// localized name are dropped.
pub struct CategoryNormalizer<'a> {
    pub columns: &'a ColumnsConfig,
}

impl<'a> CategoryNormalizer<'a> {
    pub fn new(columns: &'a ColumnsConfig) -> Self {
        Self { columns }
    }
}

impl Normalizer for CategoryNormalizer<'_> {
    type Output = CategoryTable;

    fn normalize(&self, mut table: DualHeaderTable) -> Result<CategoryTable> {
        const TABLE: &str = "impact category metadata";
        let columns = self.columns;

        table.rename(&columns.category_uuid, constants::CATEGORY_UUID);
        let uuid_col = require(&table, constants::CATEGORY_UUID, TABLE)?;
        let primary_col = optional(&table, &columns.category_name_primary, TABLE);
        let secondary_col = optional(&table, &columns.category_name_secondary, TABLE);
        let unit_col = optional(&table, &columns.reference_unit, TABLE);

        // Repeats of a named column stay out of `extra`: first occurrence wins
        let known_labels = [
            constants::CATEGORY_UUID,
            columns.category_name_primary.as_str(),
            columns.category_name_secondary.as_str(),
            columns.reference_unit.as_str(),
        ];
        let extra_cols: Vec<(usize, &String)> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !known_labels.contains(&header.as_str()))
            .collect();

        let mut categories = Vec::with_capacity(table.len());
        let mut dropped_rows = 0;
        for row in 0..table.len() {
            let Some(uuid) = table.value(row, uuid_col) else {
                dropped_rows += 1;
                continue;
            };
            let name_primary = cell(&table, row, primary_col);
            let name_secondary = cell(&table, row, secondary_col);
            if name_primary.is_none() && name_secondary.is_none() {
                warn!("{}: category {} has no name, dropped", TABLE, uuid);
                dropped_rows += 1;
                continue;
            }

            let mut extra = BTreeMap::new();
            for (col, header) in &extra_cols {
                extra
                    .entry((*header).clone())
                    .or_insert_with(|| table.value(row, *col));
            }

            categories.push(ImpactCategory {
                uuid,
                name_primary,
                name_secondary,
                reference_unit: cell(&table, row, unit_col),
                extra,
            });
        }

        if dropped_rows > 0 {
            IngestionMetrics::record_dropped_rows(dropped_rows);
        }
        info!("Normalized {} impact categories", categories.len());

        Ok(CategoryTable {
            columns: table.headers,
            categories,
            dropped_rows,
        })
    }
}
