// Pipeline ingestion: source readers for the three tabular inputs

pub mod dual_header;
pub mod impacts_csv;
pub mod raw_table;

// Re-export key types and functions for external use
pub use dual_header::{read_dual_header, DualHeaderTable};
pub use impacts_csv::{parse_impacts, read_impacts, ImpactTables};
pub use raw_table::RawTable;
