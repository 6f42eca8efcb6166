use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Error, Debug)]
pub enum ExperimentError {
    /// A structural rule of the experiment was broken (group size, membership).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    /// An operation ran before the state it depends on was reached.
    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),
    /// The wait-page callback of a group failed; every member of the group sees this.
    #[error("Round aborted: {0}")]
    RoundAborted(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ExperimentError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionNotMet(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
