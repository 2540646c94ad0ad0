// Data processing pipeline: ingestion, processing, and export

pub mod export;
pub mod ingestion;
pub mod processing;
pub mod runner;

// Re-export key types and functions from each stage
pub use export::{ExportWriter, RunManifest};
pub use runner::{Pipeline, PipelineData, PipelineResult};
