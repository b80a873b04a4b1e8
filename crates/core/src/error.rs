use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for SiftError {
    fn from(e: serde_json::Error) -> Self {
        SiftError::Serialize(e.to_string())
    }
}
