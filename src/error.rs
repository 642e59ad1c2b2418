//! Error types for Nexus Flux

use thiserror::Error;

/// Errors surfaced by the engine's public operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Content generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid signal: {0}")]
    InvalidSignal(#[from] SignalValidationError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No item with id {0} in the feed")]
    UnknownItem(String),
}

/// Failures of the persistence port
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize profile: {0}")]
    Serialize(serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the external ranking boundary
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Malformed generator response: {0}")]
    Parse(String),

    #[error("Generator returned no items")]
    Empty,
}

/// Raw signal records that cannot be replayed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalValidationError {
    #[error("Negative value for {field}: {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("Intersection ratio out of range: {0}")]
    RatioOutOfRange(f64),

    #[error("Empty identifier for {0}")]
    EmptyId(&'static str),

    #[error("Record timestamp {actual} precedes previous record at {previous}")]
    OutOfOrder { previous: String, actual: String },
}
