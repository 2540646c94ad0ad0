//! Pipeline stage metrics
//!
//! Counters are emitted through the `metrics` facade. Nothing is installed
//! by default, so they cost nothing unless an embedding application sets up
//! a recorder.

/// Macro to create phase-specific metric names with consistent naming
///
/// This ensures all metrics follow the naming convention:
/// empreinte_{phase}_{metric_name}_{type}
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("empreinte_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("empreinte_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

/// Readers and normalizer
pub struct IngestionMetrics;

impl IngestionMetrics {
    pub fn record_rows_read(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingestion", "rows_read")).increment(rows as u64);
    }

    /// A cell that failed numeric coercion and became a missing value
    pub fn record_coercion_gaps(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingestion", "coercion_gaps"))
            .increment(count as u64);
    }

    pub fn record_duplicate_headers(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingestion", "duplicate_headers"))
            .increment(count as u64);
    }

    pub fn record_dropped_rows(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingestion", "dropped_rows"))
            .increment(count as u64);
    }
}

/// Joiner and enricher
pub struct ProcessingMetrics;

impl ProcessingMetrics {
    pub fn record_join_gaps(process_gaps: usize, category_gaps: usize) {
        ::metrics::counter!(phase_metric!(counter, "processing", "process_join_gaps"))
            .increment(process_gaps as u64);
        ::metrics::counter!(phase_metric!(counter, "processing", "category_join_gaps"))
            .increment(category_gaps as u64);
    }

    pub fn record_global_rows(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "processing", "global_rows"))
            .increment(count as u64);
    }

    pub fn record_run_duration(duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "processing", "run_duration_seconds"))
            .record(duration_secs);
    }
}

/// Export writer
pub struct ExportMetrics;

impl ExportMetrics {
    pub fn record_file_written(bytes: usize) {
        ::metrics::counter!(phase_metric!(counter, "export", "files_written")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "export", "file_bytes")).record(bytes as f64);
    }
}
