use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

/// Errors raised by the question-set loader and the game library.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Game not found: {0}")]
    NotFound(String),
    #[error("Invalid game identifier: {0:?}")]
    InvalidGameId(String),
    #[error("Content parse error: {0}")]
    Parse(String),
    #[error("Content source misconfigured: {0}")]
    Config(String),
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to fetch {url}: {source}")]
    HttpFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
