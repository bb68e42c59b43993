use crate::table::{Column, RatingOrder};
use crate::types::MarkerStyle;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub places_csv: PathBuf,
    pub sites_csv: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    // [lat, lon] used when the filtered rows give no usable center.
    pub default_center: [f64; 2],
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: [4.7110, -74.0721],
            zoom: 9,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PresentationConfig {
    pub palette: Vec<String>,
    pub default_icon: String,
    pub fallback_color: String,
    // Curated styles keyed by sub-category.
    pub icons: HashMap<String, MarkerStyle>,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            palette: [
                "blue", "green", "red", "orange", "purple", "darkred", "cadetblue", "pink",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            default_icon: "info-sign".to_string(),
            fallback_color: "gray".to_string(),
            icons: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TableConfig {
    pub columns: Vec<String>,
    pub sort: RatingOrder,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            columns: Column::DEFAULT
                .iter()
                .map(|c| c.header().to_string())
                .collect(),
            sort: RatingOrder::default(),
        }
    }
}

impl TableConfig {
    pub fn resolve_columns(&self) -> Result<Vec<Column>> {
        self.columns
            .iter()
            .map(|name| {
                Column::from_header(name)
                    .ok_or_else(|| anyhow!("Unknown table column '{}' in configuration", name))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        if config.presentation.palette.is_empty() {
            return Err(anyhow!("presentation.palette must not be empty"));
        }
        config.table.resolve_columns()?;
        Ok(config)
    }
}
