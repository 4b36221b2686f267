use thiserror::Error;

/// Errors raised by the vessel catalog and the simulation engine.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("invalid {field}: {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    #[error("unknown vessel {0:?}")]
    UnknownVessel(String),
}

pub type SimResult<T> = Result<T, SimError>;
