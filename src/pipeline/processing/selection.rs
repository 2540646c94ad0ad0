use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::pipeline::processing::normalize::CategoryTable;
use crate::types::{CategoryPath, ImpactRecord, ProcessMetadata};

/// Drill-down selection: a category path plus the impact categories to show
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub path: CategoryPath,
    pub categories: Vec<String>,
}

impl Selection {
    pub fn new(path: CategoryPath, categories: Vec<String>) -> Self {
        Self { path, categories }
    }

    fn includes_category(&self, record: &ImpactRecord) -> bool {
        record
            .category_name
            .as_ref()
            .is_some_and(|name| self.categories.contains(name))
    }
}

/// Processes at exactly the selected path (absent levels match absent
/// levels) that have a flow name.
pub fn selected_processes<'a>(
    processes: &'a [ProcessMetadata],
    selection: &Selection,
) -> Vec<&'a ProcessMetadata> {
    processes
        .iter()
        .filter(|p| p.path == selection.path && p.flow_name.is_some())
        .collect()
}

/// Merged impacts of the selected processes in the selected categories,
/// sorted by value ascending with missing values last.
pub fn select_impacts<'a>(
    processes: &[ProcessMetadata],
    merged: &'a [ImpactRecord],
    selection: &Selection,
) -> Vec<&'a ImpactRecord> {
    let uuids: HashSet<&str> = selected_processes(processes, selection)
        .into_iter()
        .map(|p| p.uuid.as_str())
        .collect();

    let mut impacts: Vec<&ImpactRecord> = merged
        .iter()
        .filter(|r| uuids.contains(r.process_uuid.as_str()) && selection.includes_category(r))
        .collect();
    impacts.sort_by(|a, b| compare_missing_last(a.value, b.value));
    impacts
}

fn compare_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Every merged row in the selected categories, whatever its process
pub fn category_distribution<'a>(
    merged: &'a [ImpactRecord],
    selection: &Selection,
) -> Vec<&'a ImpactRecord> {
    merged
        .iter()
        .filter(|r| selection.includes_category(r))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Equal-width histogram over the present values. Bins are half-open except
/// the last, which includes the maximum. A single-valued input is spread
/// over `value ± 0.5`. `None` when there is nothing to count.
pub fn histogram<I>(values: I, bins: usize) -> Option<Histogram>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let values: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    if values.is_empty() || bins == 0 {
        return None;
    }
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..bins).map(|i| lo + i as f64 * width).collect();
    edges.push(hi);

    let mut counts = vec![0usize; bins];
    for v in values {
        let index = (((v - lo) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    Some(Histogram { edges, counts })
}

/// One bar of a process profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub category_name: Option<String>,
    #[serde(rename = "valeur")]
    pub value: Option<f64>,
}

/// Impact values of a single process across all categories, in table order
pub fn process_profile(merged: &[ImpactRecord], process_uuid: &str) -> Vec<ProfileEntry> {
    merged
        .iter()
        .filter(|r| r.process_uuid == process_uuid)
        .map(|r| ProfileEntry {
            category_name: r.category_name.clone(),
            value: r.value,
        })
        .collect()
}

/// Process UUID for a flow name; the last metadata row carrying it wins
pub fn find_process_by_flow_name<'a>(
    processes: &'a [ProcessMetadata],
    flow_name: &str,
) -> Option<&'a ProcessMetadata> {
    processes
        .iter()
        .rev()
        .find(|p| p.flow_name.as_deref() == Some(flow_name))
}

/// The first `count` distinct category names, in table order
pub fn default_categories(categories: &CategoryTable, count: usize) -> Vec<String> {
    categories.names().into_iter().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImpactCategory;
    use std::collections::BTreeMap;

    fn path(levels: [Option<&str>; 4]) -> CategoryPath {
        CategoryPath::from_levels(levels.map(|l| l.map(str::to_string)))
    }

    fn process(uuid: &str, path: CategoryPath, flow: Option<&str>) -> ProcessMetadata {
        ProcessMetadata {
            uuid: uuid.to_string(),
            name: None,
            path,
            flow_name: flow.map(str::to_string),
            unit: None,
            reference_quantity: None,
            geographic_zone: None,
            dataset_type: None,
        }
    }

    fn impact(process: &str, category: &str, value: Option<f64>) -> ImpactRecord {
        ImpactRecord {
            process_uuid: process.to_string(),
            category_uuid: format!("uuid-{category}"),
            category_name: Some(category.to_string()),
            value,
            ..Default::default()
        }
    }

    fn rail() -> CategoryPath {
        path([Some("Transport"), Some("Ferroviaire"), None, None])
    }

    #[test]
    fn selection_matches_exact_path_including_absent_levels() {
        let processes = vec![
            process("p1", rail(), Some("Train FR")),
            process("p2", rail(), None),
            process("p3", path([Some("Transport"), Some("Ferroviaire"), Some("Fret"), None]), Some("Fret")),
            process("p4", rail(), Some("Train DE")),
        ];
        let merged = vec![
            impact("p1", "Climat", Some(3.0)),
            impact("p1", "Eau", Some(1.0)),
            impact("p2", "Climat", Some(0.5)),
            impact("p3", "Climat", Some(0.1)),
            impact("p4", "Climat", None),
            impact("p4", "Eau", Some(-2.0)),
        ];
        let selection = Selection::new(rail(), vec!["Climat".to_string(), "Eau".to_string()]);

        let selected = select_impacts(&processes, &merged, &selection);
        let values: Vec<Option<f64>> = selected.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(-2.0), Some(1.0), Some(3.0), None]);
    }

    #[test]
    fn distribution_ignores_the_path() {
        let merged = vec![
            impact("p1", "Climat", Some(3.0)),
            impact("p2", "Eau", Some(1.0)),
            impact("p3", "Climat", None),
        ];
        let selection = Selection::new(CategoryPath::default(), vec!["Climat".to_string()]);
        assert_eq!(category_distribution(&merged, &selection).len(), 2);
    }

    #[test]
    fn histogram_bins_are_equal_width_with_inclusive_last_bin() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0].map(Some);
        let hist = histogram(values, 4).unwrap();
        assert_eq!(hist.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(hist.counts, vec![1, 1, 1, 2]);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn histogram_edge_cases() {
        assert!(histogram([None, None], 20).is_none());
        assert!(histogram([Some(1.0)], 0).is_none());

        let single = histogram([Some(2.0), Some(2.0), None], 2).unwrap();
        assert_eq!(single.edges, vec![1.5, 2.0, 2.5]);
        assert_eq!(single.counts, vec![0, 2]);
    }

    #[test]
    fn profile_and_lookup_by_flow_name() {
        let merged = vec![
            impact("p1", "Climat", Some(3.0)),
            impact("p2", "Climat", Some(1.0)),
            impact("p1", "Eau", None),
        ];
        let profile = process_profile(&merged, "p1");
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[1].category_name.as_deref(), Some("Eau"));

        let processes = vec![
            process("p1", rail(), Some("Train")),
            process("p2", rail(), Some("Train")),
        ];
        assert_eq!(find_process_by_flow_name(&processes, "Train").unwrap().uuid, "p2");
        assert!(find_process_by_flow_name(&processes, "Avion").is_none());
    }

    #[test]
    fn default_categories_take_the_first_names() {
        let category = |uuid: &str, name: &str| ImpactCategory {
            uuid: uuid.to_string(),
            name_primary: Some(name.to_string()),
            name_secondary: None,
            reference_unit: None,
            extra: BTreeMap::new(),
        };
        let table = CategoryTable {
            categories: vec![
                category("c1", "Climat"),
                category("c2", "Eau"),
                category("c3", "Climat"),
                category("c4", "Sol"),
                category("c5", "Air"),
            ],
            ..Default::default()
        };
        assert_eq!(default_categories(&table, 3), vec!["Climat", "Eau", "Sol"]);
    }
}
