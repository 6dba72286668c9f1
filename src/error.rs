use thiserror::Error;

/// Failures at the data-loading boundary. The computation core itself has
/// no error cases.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("File {path} is missing required columns: {}", columns.join(", "))]
    MissingColumns { path: String, columns: Vec<String> },
}

impl DashboardError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        DashboardError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
