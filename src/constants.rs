/// Canonical column names used across the normalized tables and exports.
/// These match the field names of the JSON artifacts consumed by the dashboard.

// Process metadata
pub const UUID: &str = "UUID";
pub const FLOW_NAME: &str = "Nom du flux";
pub const REFERENCE_QUANTITY: &str = "Quantité de référence";
pub const UNIT: &str = "Unité";
pub const GEOGRAPHIC_ZONE: &str = "Zone géographique";
pub const DATASET_TYPE: &str = "Type de données";
pub const CATEGORY_LEVELS: [&str; 4] = [
    "Categorie_niv_1",
    "Categorie_niv_2",
    "Categorie_niv_3",
    "Categorie_niv_4",
];

// Impact values
pub const PROCESS_UUID: &str = "UUID_procede";
pub const PROCESS_NAME: &str = "Nom_procede";
pub const CATEGORY_UUID: &str = "UUID_cat";
pub const VALUE: &str = "valeur";

// Impact category metadata
pub const CATEGORY_NAME: &str = "category_name";
pub const REFERENCE_UNIT: &str = "Unité de référence";

/// Process count column of the breakdown tables
pub const PROCESS_COUNT: &str = "nombre_procedes";

/// Label of the synthetic per-process category summing Q3-normalized values
pub const GLOBAL_IMPACT: &str = "global impact";

/// Number of leading metadata rows in the transposed impacts table
pub const IMPACT_METADATA_ROWS: usize = 4;

/// Row of the transposed impacts table holding the localized category names
pub const IMPACT_WIDE_HEADER_ROW: usize = 2;

/// Number of leading identity columns (process UUID, process name)
pub const IMPACT_ID_COLUMNS: usize = 2;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;
pub const DEFAULT_SELECTED_CATEGORIES: usize = 3;

// Default input locations, relative to the working directory
pub const DEFAULT_PROCESS_METADATA_PATH: &str = "data/BI_2.02__02_Procedes_Details.xlsx";
pub const DEFAULT_IMPACTS_PATH: &str = "data/BI_2.02__03_Procedes_Impacts.csv";
pub const DEFAULT_CATEGORY_METADATA_PATH: &str = "data/BI_2.02__06_CatImpacts_Details.xlsx";
pub const DEFAULT_OUTPUT_DIR: &str = "export";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// Export file names
pub const IMPACTS_MERGED_FILE: &str = "impacts_long_merged.json";
pub const CATEGORIES_FILE: &str = "categories_metadata.json";
pub const CORRELATIONS_FILE: &str = "correlations.json";
pub const GLOBAL_IMPACT_FILE: &str = "impacts_global_normalized.json";
pub const BREAKDOWN_UNIT_FILE: &str = "breakdown_unit.json";
pub const BREAKDOWN_ZONE_FILE: &str = "breakdown_zone.json";
pub const BREAKDOWN_DATASET_TYPE_FILE: &str = "breakdown_dataset_type.json";
pub const UNITS_FILE: &str = "units.json";
pub const DATASET_TYPES_FILE: &str = "dataset_types.json";
pub const METADATA_COLUMNS_FILE: &str = "metadata_columns.txt";
pub const FLAT_HIERARCHY_FILE: &str = "hierarchie_plate.json";
pub const CATEGORY_TREE_FILE: &str = "arbre_categories.json";
pub const MANIFEST_FILE: &str = "run_manifest.json";
