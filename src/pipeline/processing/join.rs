use std::collections::HashMap;
use tracing::{info, instrument};

use crate::metrics::ProcessingMetrics;
use crate::pipeline::processing::normalize::{CategoryTable, MetadataTable};
use crate::types::{ImpactCategory, ImpactRecord, ImpactValue, ProcessMetadata};

/// Result of joining the long impact table to both metadata tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    pub records: Vec<ImpactRecord>,
    /// Impact rows with no process metadata match
    pub process_gaps: usize,
    /// Impact rows with no category metadata match
    pub category_gaps: usize,
}

/// Left-join impact values to process metadata on the process identifier,
/// then to category metadata on the category identifier.
///
/// Every impact row survives; unmatched rows carry null metadata. A key
/// matching several metadata rows yields one output row per match, in the
/// order of the long table.
#[instrument(skip_all, fields(impacts = long.len()))]
pub fn join_impacts(
    long: &[ImpactValue],
    metadata: &MetadataTable,
    categories: &CategoryTable,
) -> JoinOutcome {
    let mut processes_by_uuid: HashMap<&str, Vec<&ProcessMetadata>> = HashMap::new();
    for process in &metadata.processes {
        processes_by_uuid.entry(process.uuid.as_str()).or_default().push(process);
    }
    let mut categories_by_uuid: HashMap<&str, Vec<&ImpactCategory>> = HashMap::new();
    for category in &categories.categories {
        categories_by_uuid.entry(category.uuid.as_str()).or_default().push(category);
    }

    let mut outcome = JoinOutcome::default();
    for impact in long {
        let process_matches: Vec<Option<&ProcessMetadata>> =
            match processes_by_uuid.get(impact.process_uuid.as_str()) {
                Some(found) => found.iter().copied().map(Some).collect(),
                None => {
                    outcome.process_gaps += 1;
                    vec![None]
                }
            };
        let category_matches: Vec<Option<&ImpactCategory>> =
            match categories_by_uuid.get(impact.category_uuid.as_str()) {
                Some(found) => found.iter().copied().map(Some).collect(),
                None => {
                    outcome.category_gaps += 1;
                    vec![None]
                }
            };

        for process in &process_matches {
            for category in &category_matches {
                outcome.records.push(merge_row(impact, *process, *category));
            }
        }
    }

    ProcessingMetrics::record_join_gaps(outcome.process_gaps, outcome.category_gaps);
    info!(
        "Joined {} impact rows into {} records ({} without process metadata, {} without category metadata)",
        long.len(),
        outcome.records.len(),
        outcome.process_gaps,
        outcome.category_gaps
    );
    outcome
}

fn merge_row(
    impact: &ImpactValue,
    process: Option<&ProcessMetadata>,
    category: Option<&ImpactCategory>,
) -> ImpactRecord {
    let mut record = ImpactRecord {
        process_uuid: impact.process_uuid.clone(),
        process_name: impact.process_name.clone(),
        category_uuid: impact.category_uuid.clone(),
        value: impact.value,
        ..Default::default()
    };
    if let Some(process) = process {
        record.metadata_uuid = Some(process.uuid.clone());
        record.flow_name = process.flow_name.clone();
        record.path = process.path.clone();
        record.reference_quantity = process.reference_quantity.clone();
        record.unit = process.unit.clone();
        record.geographic_zone = process.geographic_zone.clone();
        record.dataset_type = process.dataset_type.clone();
    }
    if let Some(category) = category {
        record.category_name = category.display_name().map(str::to_string);
        record.reference_unit = category.reference_unit.clone();
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CategoryPath;
    use std::collections::BTreeMap;

    fn process(uuid: &str, levels: [&str; 4]) -> ProcessMetadata {
        ProcessMetadata {
            uuid: uuid.to_string(),
            name: None,
            path: CategoryPath::from_levels(levels.map(|l| Some(l.to_string()))),
            flow_name: Some(format!("flux {uuid}")),
            unit: Some("t.km".to_string()),
            reference_quantity: Some("1".to_string()),
            geographic_zone: Some("FR".to_string()),
            dataset_type: None,
        }
    }

    fn category(uuid: &str, name: &str) -> ImpactCategory {
        ImpactCategory {
            uuid: uuid.to_string(),
            name_primary: Some(name.to_string()),
            name_secondary: None,
            reference_unit: Some("kg".to_string()),
            extra: BTreeMap::new(),
        }
    }

    fn value(process: &str, category: &str, v: Option<f64>) -> ImpactValue {
        ImpactValue {
            process_uuid: process.to_string(),
            process_name: None,
            category_uuid: category.to_string(),
            value: v,
        }
    }

    const ROAD: [&str; 4] = [
        "Transport",
        "Routier",
        "Transport à température ambiante",
        "Flotte moyenne nationale européenne",
    ];

    #[test]
    fn matching_rows_carry_all_four_levels() {
        let metadata = MetadataTable {
            processes: vec![process("p1", ROAD)],
            ..Default::default()
        };
        let categories = CategoryTable {
            categories: vec![category("c1", "Climat"), category("c2", "Eau")],
            ..Default::default()
        };
        let long = vec![value("p1", "c1", Some(1.0)), value("p1", "c2", Some(2.0))];

        let outcome = join_impacts(&long, &metadata, &categories);
        assert_eq!(outcome.records.len(), 2);
        for record in &outcome.records {
            assert_eq!(record.path.levels(), ROAD.map(Some));
            assert_eq!(record.metadata_uuid.as_deref(), Some("p1"));
        }
        assert_eq!(outcome.records[1].category_name.as_deref(), Some("Eau"));
        assert_eq!(outcome.process_gaps, 0);
    }

    #[test]
    fn unmatched_rows_are_kept_with_null_metadata() {
        let metadata = MetadataTable {
            processes: vec![process("p1", ROAD)],
            ..Default::default()
        };
        let categories = CategoryTable {
            categories: vec![category("c1", "Climat")],
            ..Default::default()
        };
        let long = vec![
            value("p2", "c1", Some(1.0)),
            value("p1", "c9", None),
            value("p3", "c9", Some(3.0)),
        ];

        let outcome = join_impacts(&long, &metadata, &categories);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.process_gaps, 2);
        assert_eq!(outcome.category_gaps, 2);
        assert!(outcome.records.iter().all(|r| !r.process_uuid.is_empty()));
        assert_eq!(outcome.records[0].metadata_uuid, None);
        assert_eq!(outcome.records[0].category_name.as_deref(), Some("Climat"));
        assert_eq!(outcome.records[1].category_name, None);
        assert_eq!(outcome.records[2].path, CategoryPath::default());
    }

    #[test]
    fn duplicate_metadata_keys_fan_out() {
        let metadata = MetadataTable {
            processes: vec![process("p1", ROAD), process("p1", ROAD)],
            ..Default::default()
        };
        let categories = CategoryTable::default();
        let outcome = join_impacts(&[value("p1", "c1", Some(1.0))], &metadata, &categories);
        assert_eq!(outcome.records.len(), 2);
    }
}
