use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Alias table configuration error: {0}")]
    Config(String),

    #[error("Invalid input document: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, NormalizerError>;
