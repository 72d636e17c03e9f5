use thiserror::Error;

/// Invalid pipeline options.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("target city must not be blank")]
    BlankCity,
    #[error("{field} must be at least 1")]
    ZeroValue { field: &'static str },
    #[error("timeout for step {step} must be greater than zero")]
    ZeroTimeout { step: &'static str },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
