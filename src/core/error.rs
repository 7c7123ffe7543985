use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown reference: {0}")]
    Reference(String),

    #[error("Conflicting entry: {0}")]
    Overlap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Value out of range: {0}")]
    Range(String),

    #[error("Invalid state: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
