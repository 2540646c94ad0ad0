// Pipeline processing: normalization, joins, statistics, and derived views

pub mod breakdown;
pub mod cluster;
pub mod correlation;
pub mod enrich;
pub mod hierarchy;
pub mod join;
pub mod normalize;
pub mod selection;
pub mod stats;

// Re-export key types and functions
pub use correlation::{clustered_correlation, CorrelationMatrix};
pub use enrich::{EnrichedImpacts, StatisticsEnricher};
pub use hierarchy::CategoryTree;
pub use join::{join_impacts, JoinOutcome};
pub use selection::{Histogram, Selection};
