use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::DashboardError;
use crate::types::FilterSpec;

/// Contents of the optional TOML config file. Every table may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub filter: FilterSpec,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Row-level records, `.json` or compiled `.csv`. Required at load time.
    pub detailed: PathBuf,
    /// Pre-aggregated metadata; failures to read it are tolerated.
    pub aggregated: Option<PathBuf>,
    /// Territorial boundaries; failures to read it are tolerated.
    pub boundaries: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            detailed: PathBuf::from("data/detailed.json"),
            aggregated: Some(PathBuf::from("data/aggregated.json")),
            boundaries: Some(PathBuf::from("data/territorios.geojson")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("."),
            preview_rows: 5,
        }
    }
}

pub fn parse_config(text: &str) -> Result<Config, DashboardError> {
    Ok(toml::from_str(text)?)
}

pub fn load_config(path: &Path) -> Result<Config, DashboardError> {
    let text = std::fs::read_to_string(path).map_err(|e| DashboardError::io(path, e))?;
    let config = parse_config(&text)?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}
