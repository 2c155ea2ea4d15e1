use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schedule api error: {0}")]
    Api(String),
    #[error("credential error: {0}")]
    Credential(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
}
