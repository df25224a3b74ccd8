use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstuaryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Push adapter error: {0}")]
    Push(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),
}

pub type Result<T> = std::result::Result<T, EstuaryError>;
