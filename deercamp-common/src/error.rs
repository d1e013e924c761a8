//! Common error types for DeerCamp

use thiserror::Error;

/// Common result type for DeerCamp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the DeerCamp crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error in a configuration file
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
