use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

use super::stats::{ratio, Summary};
use crate::metrics::ProcessingMetrics;
use crate::types::{CategoryPath, GlobalImpact, ImpactRecord};

/// Enriched impact table plus the synthetic per-process global rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedImpacts {
    pub records: Vec<ImpactRecord>,
    /// Kept apart from `records`: exported as its own relation
    pub global: Vec<GlobalImpact>,
}

/// Adds per-category normalization and group aggregates to joined impacts.
///
/// Rows without a `category_name` belong to no group: their normalized and
/// aggregate columns stay null. Null category levels are ordinary key values.
#[derive(Debug, Default)]
pub struct StatisticsEnricher;

impl StatisticsEnricher {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(records = records.len()))]
    pub fn enrich(&self, mut records: Vec<ImpactRecord>) -> EnrichedImpacts {
        self.normalize_by_category(&mut records);
        self.merge_group_aggregates(&mut records);
        let global = self.global_impacts(&records);

        ProcessingMetrics::record_global_rows(global.len());
        info!(
            "Enriched {} records, {} global impact rows",
            records.len(),
            global.len()
        );
        EnrichedImpacts { records, global }
    }

    /// Divide each value by its category's median and Q3.
    pub fn normalize_by_category(&self, records: &mut [ImpactRecord]) {
        let mut groups: HashMap<String, Vec<Option<f64>>> = HashMap::new();
        for record in records.iter() {
            if let Some(name) = &record.category_name {
                groups.entry(name.clone()).or_default().push(record.value);
            }
        }
        let summaries: HashMap<String, Option<Summary>> = groups
            .into_iter()
            .map(|(name, values)| (name, Summary::of(values)))
            .collect();

        for record in records.iter_mut() {
            let summary = record
                .category_name
                .as_ref()
                .and_then(|name| summaries.get(name).copied().flatten());
            record.valeur_norm_median = ratio(record.value, summary.map(|s| s.median));
            record.valeur_norm_q3 = ratio(record.value, summary.map(|s| s.q3));
        }
    }

    /// Mean, median and Q3 per (category levels, category name), merged
    /// back onto every row of the group.
    pub fn merge_group_aggregates(&self, records: &mut [ImpactRecord]) {
        let mut groups: HashMap<(CategoryPath, String), Vec<Option<f64>>> = HashMap::new();
        for record in records.iter() {
            if let Some(name) = &record.category_name {
                groups
                    .entry((record.path.clone(), name.clone()))
                    .or_default()
                    .push(record.value);
            }
        }
        let summaries: HashMap<(CategoryPath, String), Option<Summary>> = groups
            .into_iter()
            .map(|(key, values)| (key, Summary::of(values)))
            .collect();

        for record in records.iter_mut() {
            let Some(name) = record.category_name.clone() else {
                continue;
            };
            let summary = summaries
                .get(&(record.path.clone(), name))
                .copied()
                .flatten();
            record.valeur_mean = summary.map(|s| s.mean);
            record.valeur_median = summary.map(|s| s.median);
            record.valeur_q3 = summary.map(|s| s.q3);
        }
    }

    /// One row per (process, name, category levels): the sum of Q3-normalized
    /// values across all of the process's categories, missing ones skipped.
    /// Rows come out sorted by key.
    pub fn global_impacts(&self, records: &[ImpactRecord]) -> Vec<GlobalImpact> {
        let mut sums: BTreeMap<(String, Option<String>, CategoryPath), f64> = BTreeMap::new();
        for record in records {
            let key = (
                record.process_uuid.clone(),
                record.process_name.clone(),
                record.path.clone(),
            );
            *sums.entry(key).or_insert(0.0) += record.valeur_norm_q3.unwrap_or(0.0);
        }
        sums.into_iter()
            .map(|((uuid, name, path), sum)| GlobalImpact::new(uuid, name, path, sum))
            .collect()
    }
}
