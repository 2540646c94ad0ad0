use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, info_span, instrument};

use crate::config::Config;
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::metrics::ProcessingMetrics;
use crate::pipeline::export::{ExportWriter, InputDigest, RunManifest};
use crate::pipeline::ingestion::{read_dual_header, read_impacts, ImpactTables};
use crate::pipeline::processing::breakdown;
use crate::pipeline::processing::normalize::{
    CategoryNormalizer, CategoryTable, MetadataTable, Normalizer, ProcessMetadataNormalizer,
};
use crate::pipeline::processing::{
    clustered_correlation, join_impacts, CategoryTree, CorrelationMatrix, EnrichedImpacts,
    StatisticsEnricher,
};

/// Everything the pipeline derives from the three inputs, before export
#[derive(Debug, Clone)]
pub struct PipelineData {
    pub metadata: MetadataTable,
    pub categories: CategoryTable,
    pub impacts: ImpactTables,
    pub enriched: EnrichedImpacts,
    pub correlation: CorrelationMatrix,
    pub tree: CategoryTree,
    pub process_join_gaps: usize,
    pub category_join_gaps: usize,
}

/// Summary of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub processes: usize,
    pub categories: usize,
    pub impact_rows: usize,
    pub merged_rows: usize,
    pub global_rows: usize,
    pub coercion_gaps: usize,
    pub process_join_gaps: usize,
    pub category_join_gaps: usize,
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub duration_secs: f64,
}

pub struct Pipeline;

impl Pipeline {
    fn delimiter(config: &Config) -> Result<u8> {
        u8::try_from(config.inputs.delimiter).map_err(|_| {
            PipelineError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                config.inputs.delimiter
            ))
        })
    }

    /// Read, normalize, join and enrich the inputs without writing anything.
    #[instrument(skip_all)]
    pub fn load(config: &Config) -> Result<PipelineData> {
        let delimiter = Self::delimiter(config)?;
        let inputs = &config.inputs;

        let metadata = {
            let _span = info_span!("process_metadata", path = %inputs.process_metadata.display()).entered();
            let table = read_dual_header(&inputs.process_metadata, delimiter)?;
            ProcessMetadataNormalizer::new(&config.columns).normalize(table)?
        };

        let categories = {
            let _span = info_span!("category_metadata", path = %inputs.category_metadata.display()).entered();
            let table = read_dual_header(&inputs.category_metadata, delimiter)?;
            CategoryNormalizer::new(&config.columns).normalize(table)?
        };

        let impacts = read_impacts(&inputs.impacts, delimiter, &inputs.encoding)?;

        let joined = join_impacts(&impacts.long, &metadata, &categories);
        let enriched = StatisticsEnricher::new().enrich(joined.records);
        let correlation = clustered_correlation(&impacts.wide);
        let tree = CategoryTree::build(&metadata.processes);

        Ok(PipelineData {
            metadata,
            categories,
            impacts,
            enriched,
            correlation,
            tree,
            process_join_gaps: joined.process_gaps,
            category_join_gaps: joined.category_gaps,
        })
    }

    /// Full run: load everything, then write the enabled exports.
    #[instrument(skip_all, fields(output = %config.output.directory.display()))]
    pub fn run(config: &Config) -> Result<PipelineResult> {
        let started = Instant::now();
        info!("Starting pipeline");

        let data = Self::load(config)?;
        let files = Self::export(config, &data)?;

        let duration_secs = started.elapsed().as_secs_f64();
        ProcessingMetrics::record_run_duration(duration_secs);
        info!("Pipeline finished in {:.2}s, {} files written", duration_secs, files.len());

        Ok(PipelineResult {
            processes: data.metadata.processes.len(),
            categories: data.categories.categories.len(),
            impact_rows: data.impacts.long.len(),
            merged_rows: data.enriched.records.len(),
            global_rows: data.enriched.global.len(),
            coercion_gaps: data.impacts.coercion_gaps,
            process_join_gaps: data.process_join_gaps,
            category_join_gaps: data.category_join_gaps,
            output_dir: config.output.directory.clone(),
            files,
            duration_secs,
        })
    }

    fn input_digests(config: &Config) -> Result<Vec<InputDigest>> {
        let inputs = &config.inputs;
        Ok(vec![
            InputDigest::of("process_metadata", &inputs.process_metadata)?,
            InputDigest::of("impacts", &inputs.impacts)?,
            InputDigest::of("category_metadata", &inputs.category_metadata)?,
        ])
    }

    /// Write every enabled artifact into the configured output directory.
    pub fn export(config: &Config, data: &PipelineData) -> Result<Vec<PathBuf>> {
        let _span = info_span!("export").entered();
        let exports = &config.exports;
        let processes = &data.metadata.processes;

        // Fingerprint inputs before the first write so an unreadable input
        // leaves no output behind
        let digests = if exports.manifest {
            Some(Self::input_digests(config)?)
        } else {
            None
        };
        let mut writer = ExportWriter::new(&config.output.directory)?;

        if exports.impacts_merged {
            writer.write_json(constants::IMPACTS_MERGED_FILE, &data.enriched.records)?;
        }
        if exports.categories {
            writer.write_json(constants::CATEGORIES_FILE, &data.categories.categories)?;
        }
        if exports.correlations {
            writer.write_json(constants::CORRELATIONS_FILE, &data.correlation.triples())?;
        }
        if exports.global_impact {
            writer.write_json(constants::GLOBAL_IMPACT_FILE, &data.enriched.global)?;
        }
        if exports.breakdowns {
            writer.write_json(constants::BREAKDOWN_UNIT_FILE, &breakdown::breakdown_by_unit(processes))?;
            writer.write_json(constants::BREAKDOWN_ZONE_FILE, &breakdown::breakdown_by_zone(processes))?;
            writer.write_json(
                constants::BREAKDOWN_DATASET_TYPE_FILE,
                &breakdown::breakdown_by_dataset_type(processes),
            )?;
        }
        if exports.distinct_lists {
            writer.write_json(constants::UNITS_FILE, &breakdown::distinct_units(processes))?;
            writer.write_json(constants::DATASET_TYPES_FILE, &breakdown::distinct_dataset_types(processes))?;
        }
        if exports.metadata_columns {
            writer.write_lines(constants::METADATA_COLUMNS_FILE, &data.metadata.columns)?;
        }
        if exports.hierarchy {
            writer.write_json(constants::FLAT_HIERARCHY_FILE, &breakdown::flat_hierarchy(processes))?;
            writer.write_json(constants::CATEGORY_TREE_FILE, &data.tree)?;
        }
        if exports.country_tables {
            for table in &config.country_tables {
                let rows = breakdown::country_table(&data.enriched.records, table);
                writer.write_json(&format!("{}.json", table.name), &rows)?;
            }
        }
        if let Some(inputs) = digests {
            let manifest = RunManifest::new(inputs, writer.written());
            info!("Run cache key {}", manifest.cache_key());
            writer.write_json(constants::MANIFEST_FILE, &manifest)?;
        }

        Ok(writer.into_written())
    }
}
