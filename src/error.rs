use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Unreadable or structurally malformed source file. Aborts the run.
    #[error("Failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column '{column}' in {table}")]
    MissingColumn { table: String, column: String },
}

impl PipelineError {
    pub fn load(path: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        PipelineError::Load {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
