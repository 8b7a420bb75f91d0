use thiserror::Error;
use uuid::Uuid;

/// Error type that captures tracker, gateway, and report failures.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Report selection contains no budgets")]
    EmptySelection,
    #[error("Conflicting write on budget {0}")]
    StaleWrite(Uuid),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Gateway unavailable: {0}")]
    Gateway(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Report encoding error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
