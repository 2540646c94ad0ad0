use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants;

/// Four-level category path of a process. A level may be absent, which
/// terminates the hierarchy for drill-down purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryPath {
    #[serde(rename = "Categorie_niv_1")]
    pub level_1: Option<String>,
    #[serde(rename = "Categorie_niv_2")]
    pub level_2: Option<String>,
    #[serde(rename = "Categorie_niv_3")]
    pub level_3: Option<String>,
    #[serde(rename = "Categorie_niv_4")]
    pub level_4: Option<String>,
}

impl CategoryPath {
    pub fn from_levels(levels: [Option<String>; 4]) -> Self {
        let [level_1, level_2, level_3, level_4] = levels;
        Self {
            level_1,
            level_2,
            level_3,
            level_4,
        }
    }

    pub fn levels(&self) -> [Option<&str>; 4] {
        [
            self.level_1.as_deref(),
            self.level_2.as_deref(),
            self.level_3.as_deref(),
            self.level_4.as_deref(),
        ]
    }
}

/// Workbook cells read as text but exported as JSON numbers when the text
/// is the canonical rendering of one, so `"1"` becomes `1` while `"1e3"`
/// or `"n/a"` stay strings.
pub mod numeric_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(text) = value else {
            return serializer.serialize_none();
        };
        if let Ok(n) = text.parse::<i64>() {
            if n.to_string() == *text {
                return serializer.serialize_i64(n);
            }
        }
        if let Ok(n) = text.parse::<f64>() {
            if n.is_finite() && n.to_string() == *text {
                return serializer.serialize_f64(n);
            }
        }
        serializer.serialize_str(text)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Text(String),
        Int(i64),
        Float(f64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Cell>::deserialize(deserializer)?.map(|cell| match cell {
            Cell::Text(text) => text,
            Cell::Int(n) => n.to_string(),
            Cell::Float(n) => n.to_string(),
        }))
    }
}

/// One row per process of the reference database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetadata {
    #[serde(rename = "UUID")]
    pub uuid: String,
    #[serde(rename = "Nom")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub path: CategoryPath,
    #[serde(rename = "Nom du flux")]
    pub flow_name: Option<String>,
    #[serde(rename = "Unité")]
    pub unit: Option<String>,
    #[serde(rename = "Quantité de référence", default, with = "numeric_text")]
    pub reference_quantity: Option<String>,
    #[serde(rename = "Zone géographique")]
    pub geographic_zone: Option<String>,
    #[serde(rename = "Type de données")]
    pub dataset_type: Option<String>,
}

/// One row per impact category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactCategory {
    #[serde(rename = "UUID_cat")]
    pub uuid: String,
    #[serde(rename = "Nom français")]
    pub name_primary: Option<String>,
    #[serde(rename = "Nom anglais")]
    pub name_secondary: Option<String>,
    #[serde(rename = "Unité de référence")]
    pub reference_unit: Option<String>,
    /// Remaining source columns, carried through to the categories export
    #[serde(flatten)]
    pub extra: BTreeMap<String, Option<String>>,
}

impl ImpactCategory {
    /// Name used as `category_name` downstream
    pub fn display_name(&self) -> Option<&str> {
        self.name_primary
            .as_deref()
            .or(self.name_secondary.as_deref())
    }
}

/// Long (tidy) impact value: one row per (process, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactValue {
    #[serde(rename = "UUID_procede")]
    pub process_uuid: String,
    #[serde(rename = "Nom_procede")]
    pub process_name: Option<String>,
    #[serde(rename = "UUID_cat")]
    pub category_uuid: String,
    #[serde(rename = "valeur")]
    pub value: Option<f64>,
}

/// A column of the wide impact table: one category, one value per process.
#[derive(Debug, Clone, PartialEq)]
pub struct WideColumn {
    /// Localized category name taken from the secondary header row
    pub label: String,
    pub category_uuid: String,
    pub values: Vec<Option<f64>>,
}

/// Wide impact table: one row per process, one column per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideImpacts {
    pub process_uuids: Vec<String>,
    pub columns: Vec<WideColumn>,
}

/// Denormalized impact row: long value joined to process and category
/// metadata, then enriched with per-category statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    #[serde(rename = "UUID_procede")]
    pub process_uuid: String,
    #[serde(rename = "Nom_procede")]
    pub process_name: Option<String>,
    #[serde(rename = "UUID_cat")]
    pub category_uuid: String,
    #[serde(rename = "valeur")]
    pub value: Option<f64>,
    #[serde(rename = "UUID")]
    pub metadata_uuid: Option<String>,
    #[serde(rename = "Nom du flux")]
    pub flow_name: Option<String>,
    #[serde(flatten)]
    pub path: CategoryPath,
    #[serde(rename = "Quantité de référence", default, with = "numeric_text")]
    pub reference_quantity: Option<String>,
    #[serde(rename = "Unité")]
    pub unit: Option<String>,
    #[serde(rename = "Zone géographique")]
    pub geographic_zone: Option<String>,
    #[serde(rename = "Type de données")]
    pub dataset_type: Option<String>,
    pub category_name: Option<String>,
    #[serde(rename = "Unité de référence")]
    pub reference_unit: Option<String>,
    #[serde(default)]
    pub valeur_norm_median: Option<f64>,
    #[serde(default)]
    pub valeur_norm_q3: Option<f64>,
    #[serde(default)]
    pub valeur_mean: Option<f64>,
    #[serde(default)]
    pub valeur_median: Option<f64>,
    #[serde(default)]
    pub valeur_q3: Option<f64>,
}

/// Synthetic per-process row: sum of Q3-normalized values across categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalImpact {
    #[serde(rename = "UUID_procede")]
    pub process_uuid: String,
    #[serde(rename = "Nom_procede")]
    pub process_name: Option<String>,
    #[serde(flatten)]
    pub path: CategoryPath,
    pub category_name: String,
    #[serde(rename = "valeur")]
    pub value: f64,
}

impl GlobalImpact {
    pub fn new(process_uuid: String, process_name: Option<String>, path: CategoryPath, value: f64) -> Self {
        Self {
            process_uuid,
            process_name,
            path,
            category_name: constants::GLOBAL_IMPACT.to_string(),
            value,
        }
    }
}

/// Flattened cell of the correlation matrix, as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTriple {
    pub x: String,
    pub y: String,
    pub value: Option<f64>,
}

/// Row of the flat hierarchy export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatHierarchyRow {
    #[serde(flatten)]
    pub path: CategoryPath,
    #[serde(rename = "Nom du flux")]
    pub flow_name: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_record_uses_canonical_field_names() {
        let record = ImpactRecord {
            process_uuid: "p1".to_string(),
            category_uuid: "c1".to_string(),
            value: Some(1.5),
            path: CategoryPath {
                level_1: Some("Transport".to_string()),
                ..Default::default()
            },
            category_name: Some("Changement climatique".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json[constants::PROCESS_UUID], "p1");
        assert_eq!(json[constants::CATEGORY_UUID], "c1");
        assert_eq!(json[constants::VALUE], 1.5);
        assert_eq!(json[constants::CATEGORY_LEVELS[0]], "Transport");
        assert!(json[constants::CATEGORY_LEVELS[3]].is_null());
        assert_eq!(json[constants::CATEGORY_NAME], "Changement climatique");
        assert!(json["valeur_norm_q3"].is_null());
    }

    #[test]
    fn numeric_reference_quantity_exports_as_number() {
        let quantity = |text: &str| {
            let record = ImpactRecord {
                reference_quantity: Some(text.to_string()),
                ..Default::default()
            };
            serde_json::to_value(&record).unwrap()["Quantité de référence"].clone()
        };
        assert_eq!(quantity("1"), serde_json::json!(1));
        assert_eq!(quantity("0.5"), serde_json::json!(0.5));
        assert_eq!(quantity("1e3"), serde_json::json!("1e3"));
        assert_eq!(quantity("n/a"), serde_json::json!("n/a"));
        assert_eq!(quantity("007"), serde_json::json!("007"));
    }

    #[test]
    fn reference_quantity_reads_back_from_number_or_string() {
        let record = ImpactRecord {
            process_uuid: "p1".to_string(),
            category_uuid: "c1".to_string(),
            reference_quantity: Some("2.5".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ImpactRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);

        let text: ProcessMetadata = serde_json::from_str(
            r#"{"UUID":"p1","Nom":null,"Nom du flux":null,"Unité":null,
                "Quantité de référence":"kg","Zone géographique":null,"Type de données":null}"#,
        )
        .unwrap();
        assert_eq!(text.reference_quantity.as_deref(), Some("kg"));

        let missing: ProcessMetadata = serde_json::from_str(r#"{"UUID":"p1"}"#).unwrap();
        assert_eq!(missing.reference_quantity, None);
    }

    #[test]
    fn category_display_name_falls_back_to_secondary() {
        let category = ImpactCategory {
            uuid: "c1".to_string(),
            name_primary: None,
            name_secondary: Some("Climate change".to_string()),
            reference_unit: None,
            extra: BTreeMap::new(),
        };
        assert_eq!(category.display_name(), Some("Climate change"));
    }
}
