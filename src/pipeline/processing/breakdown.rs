use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use tracing::debug;

use crate::config::CountryTableConfig;
use crate::types::{numeric_text, CategoryPath, FlatHierarchyRow, ImpactRecord, ProcessMetadata};

/// Process count per (category path, unit, reference quantity)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitBreakdown {
    #[serde(flatten)]
    pub path: CategoryPath,
    #[serde(rename = "Unité")]
    pub unit: Option<String>,
    #[serde(rename = "Quantité de référence", serialize_with = "numeric_text::serialize")]
    pub reference_quantity: Option<String>,
    #[serde(rename = "nombre_procedes")]
    pub count: usize,
}

/// Process count per (category path, geographic zone)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneBreakdown {
    #[serde(flatten)]
    pub path: CategoryPath,
    #[serde(rename = "Zone géographique")]
    pub geographic_zone: Option<String>,
    #[serde(rename = "nombre_procedes")]
    pub count: usize,
}

/// Process count per (category path, dataset type)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetTypeBreakdown {
    #[serde(flatten)]
    pub path: CategoryPath,
    #[serde(rename = "Type de données")]
    pub dataset_type: Option<String>,
    #[serde(rename = "nombre_procedes")]
    pub count: usize,
}

/// Count rows per key, keys in order of first appearance.
fn count_by<'a, T: 'a, K, I, F>(rows: I, key: F) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for row in rows {
        let k = key(row);
        match index.get(&k) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(k.clone(), counts.len());
                counts.push((k, 1));
            }
        }
    }
    counts
}

pub fn breakdown_by_unit(processes: &[ProcessMetadata]) -> Vec<UnitBreakdown> {
    count_by(processes, |p| {
        (p.path.clone(), p.unit.clone(), p.reference_quantity.clone())
    })
    .into_iter()
    .map(|((path, unit, reference_quantity), count)| UnitBreakdown {
        path,
        unit,
        reference_quantity,
        count,
    })
    .collect()
}

pub fn breakdown_by_zone(processes: &[ProcessMetadata]) -> Vec<ZoneBreakdown> {
    count_by(processes, |p| (p.path.clone(), p.geographic_zone.clone()))
        .into_iter()
        .map(|((path, geographic_zone), count)| ZoneBreakdown {
            path,
            geographic_zone,
            count,
        })
        .collect()
}

pub fn breakdown_by_dataset_type(processes: &[ProcessMetadata]) -> Vec<DatasetTypeBreakdown> {
    count_by(processes, |p| (p.path.clone(), p.dataset_type.clone()))
        .into_iter()
        .map(|((path, dataset_type), count)| DatasetTypeBreakdown {
            path,
            dataset_type,
            count,
        })
        .collect()
}

pub fn distinct_units(processes: &[ProcessMetadata]) -> Vec<String> {
    distinct(processes.iter().map(|p| p.unit.as_deref()))
}

pub fn distinct_dataset_types(processes: &[ProcessMetadata]) -> Vec<String> {
    distinct(processes.iter().map(|p| p.dataset_type.as_deref()))
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// (levels, flow name, UUID) for every process that has a flow name
pub fn flat_hierarchy(processes: &[ProcessMetadata]) -> Vec<FlatHierarchyRow> {
    processes
        .iter()
        .filter_map(|p| {
            p.flow_name.as_ref().map(|flow_name| FlatHierarchyRow {
                path: p.path.clone(),
                flow_name: flow_name.clone(),
                uuid: p.uuid.clone(),
            })
        })
        .collect()
}

impl CountryTableConfig {
    /// Whether an enriched impact row belongs to this table
    pub fn matches(&self, record: &ImpactRecord) -> bool {
        let level_matches = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            Some(wanted) => actual.as_deref() == Some(wanted.as_str()),
            None => true,
        };
        if !level_matches(&self.level_2, &record.path.level_2)
            || !level_matches(&self.level_3, &record.path.level_3)
            || !level_matches(&self.level_4, &record.path.level_4)
        {
            return false;
        }
        match (&self.exclude_name_containing, &record.process_name) {
            (Some(needle), Some(name)) => !name.contains(needle.as_str()),
            _ => true,
        }
    }
}

/// Enriched impact rows of one country table, trailing `;` stripped from
/// the geographic zone.
pub fn country_table(records: &[ImpactRecord], table: &CountryTableConfig) -> Vec<ImpactRecord> {
    let rows: Vec<ImpactRecord> = records
        .iter()
        .filter(|record| table.matches(record))
        .cloned()
        .map(|mut record| {
            record.geographic_zone = record
                .geographic_zone
                .map(|zone| zone.trim_end_matches(';').to_string());
            record
        })
        .collect();
    debug!("Country table {}: {} rows", table.name, rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;

    fn process(uuid: &str, level_1: &str, unit: Option<&str>, zone: Option<&str>) -> ProcessMetadata {
        ProcessMetadata {
            uuid: uuid.to_string(),
            name: None,
            path: CategoryPath {
                level_1: Some(level_1.to_string()),
                ..Default::default()
            },
            flow_name: Some(format!("flux {uuid}")),
            unit: unit.map(str::to_string),
            reference_quantity: Some("1".to_string()),
            geographic_zone: zone.map(str::to_string),
            dataset_type: None,
        }
    }

    fn processes() -> Vec<ProcessMetadata> {
        vec![
            process("p1", "Transport", Some("t.km"), Some("FR")),
            process("p2", "Energie", Some("kWh"), Some("FR")),
            process("p3", "Transport", Some("t.km"), Some("DE")),
            process("p4", "Transport", None, Some("FR")),
        ]
    }

    #[test]
    fn unit_breakdown_counts_in_first_appearance_order() {
        let rows = breakdown_by_unit(&processes());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].path.level_1.as_deref(), Some("Transport"));
        assert_eq!(rows[0].unit.as_deref(), Some("t.km"));
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[1].unit.as_deref(), Some("kWh"));
        assert_eq!(rows[2].unit, None);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json[constants::PROCESS_COUNT], 2);
        assert_eq!(json[constants::UNIT], "t.km");
    }

    #[test]
    fn zone_and_dataset_type_breakdowns() {
        let zones = breakdown_by_zone(&processes());
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[0].count, 2);

        let types = breakdown_by_dataset_type(&processes());
        assert_eq!(types.len(), 2);
        assert_eq!(types.iter().map(|r| r.count).sum::<usize>(), 4);
    }

    #[test]
    fn distinct_lists_are_sorted_without_nulls() {
        assert_eq!(distinct_units(&processes()), vec!["kWh", "t.km"]);
        assert!(distinct_dataset_types(&processes()).is_empty());
    }

    #[test]
    fn flat_hierarchy_skips_processes_without_flow_name() {
        let mut rows = processes();
        rows[1].flow_name = None;
        let flat = flat_hierarchy(&rows);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[1].uuid, "p3");
    }

    fn road_record(name: &str, zone: &str) -> ImpactRecord {
        ImpactRecord {
            process_uuid: "p".to_string(),
            process_name: Some(name.to_string()),
            path: CategoryPath::from_levels([
                Some("Transport".to_string()),
                Some("Routier".to_string()),
                Some("Transport à température ambiante".to_string()),
                Some("Flotte moyenne nationale européenne".to_string()),
            ]),
            geographic_zone: Some(zone.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn road_table_excludes_full_load_processes_and_strips_zone() {
        let tables = CountryTableConfig::defaults();
        let road = tables.iter().find(|t| t.name == "transport_routier").unwrap();
        let records = vec![
            road_record("Camion, France", "FR;"),
            road_record("Camion 100% chargé, France", "FR;"),
            ImpactRecord::default(),
        ];
        let rows = country_table(&records, road);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].geographic_zone.as_deref(), Some("FR"));
    }

    #[test]
    fn rail_table_filters_on_levels_two_and_three() {
        let tables = CountryTableConfig::defaults();
        let rail = tables.iter().find(|t| t.name == "transport_ferro").unwrap();
        let mut record = road_record("Train, France", "FR");
        assert!(!rail.matches(&record));
        record.path.level_2 = Some("Ferroviaire".to_string());
        record.path.level_3 = Some("Flotte moyenne nationale européenne".to_string());
        assert!(rail.matches(&record));
    }
}
