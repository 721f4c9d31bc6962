use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiPulseError {
    #[error("Malformed run payload: {0}")]
    MalformedPayload(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Store query timed out after {0}ms")]
    StoreTimeout(u64),

    #[error("No run found with id {0}")]
    RunNotFound(i64),

    #[error("Narrative generation failed: {0}")]
    Narrative(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CiPulseError>;
