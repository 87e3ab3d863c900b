//! Error types for the flight path bridge

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Malformed socket address in configuration
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    /// Unknown simulator backend requested in configuration
    #[error("Unknown simulator backend: {0}")]
    UnknownBackend(String),

    /// Operation requires an open simulator connection
    #[error("Not connected to simulation host")]
    NotConnected,

    /// A worker thread panicked
    #[error("Thread panic")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
