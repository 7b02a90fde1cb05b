use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("API error: {0}")]
    Api(String),

    #[error("unexpected response format from API")]
    MalformedResponse,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
