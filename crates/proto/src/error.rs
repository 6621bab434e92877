use std::path::PathBuf;

use thiserror::Error;

/// Process supervisor errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable could not be started or one of its pipes could not be opened.
    #[error("failed to start process: {0}")]
    Spawn(String),

    /// The command template produced no tokens.
    #[error("command template resolved to an empty command")]
    EmptyCommand,

    /// Input was written while no interactive process owns a stdin pipe.
    #[error("stdin pipe not available")]
    NoInputStream,

    /// Pipe IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(String),

    /// The catalog answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    /// Response body did not match the expected schema.
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),

    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Local model discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The models directory could not be listed.
    #[error("failed to read models directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
