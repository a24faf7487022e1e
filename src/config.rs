//! Dashboard configuration.
//!
//! Every field has a default reproducing the production dashboard, so an
//! absent or partial JSON file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::aggregate::{GapFill, Granularity, TOP_N};
use crate::data::model::RELEVANCE_THRESHOLD;
use crate::error::{Error, Result};

/// Source column names for each [`VisitRecord`](crate::data::model::VisitRecord) field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: String,
    pub patient_id: String,
    pub age: String,
    pub sex: String,
    pub code: String,
    pub specialty: String,
    pub insurer: String,
    pub municipality: String,
    /// Field delimiter for text datasets.
    pub delimiter: char,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: "DT_ATENDIMENTO".to_string(),
            patient_id: "CD_PACIENTE".to_string(),
            age: "IDADE".to_string(),
            sex: "SEXO".to_string(),
            code: "DESCRICAO_CID".to_string(),
            specialty: "DS_ESPECIALID".to_string(),
            insurer: "NM_CONVENIO".to_string(),
            municipality: "MUNICIPIO".to_string(),
            delimiter: ';',
        }
    }
}

impl ColumnMapping {
    /// Delimiter as the single byte the CSV reader expects. Non-ASCII
    /// delimiters fall back to `;`.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b';'
        }
    }
}

/// Configuration for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Visits dataset (`.csv`, `.zip` or `.parquet`).
    pub dataset_path: PathBuf,
    /// GeoJSON municipality boundaries.
    pub boundary_path: PathBuf,
    /// Feature property holding the region name.
    pub boundary_name_property: String,
    pub columns: ColumnMapping,
    /// Minimum dataset-wide frequency for a code to be offered as a filter.
    pub relevance_threshold: usize,
    /// Categories kept by the specialty and insurer rankings.
    pub top_n: usize,
    /// Initial temporal granularity.
    pub granularity: Granularity,
    pub gap_fill: GapFill,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("epidemio_2024_2025_compacta.zip"),
            boundary_path: PathBuf::from("geojson_es.json"),
            boundary_name_property: "name".to_string(),
            columns: ColumnMapping::default(),
            relevance_threshold: RELEVANCE_THRESHOLD,
            top_n: TOP_N,
            granularity: Granularity::Day,
            gap_fill: GapFill::Zeros,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
