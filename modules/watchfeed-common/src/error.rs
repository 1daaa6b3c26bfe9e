use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchfeedError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
