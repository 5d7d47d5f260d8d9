use thiserror::Error;

/// Error type for store connections, key universe loading and configuration
#[derive(Error, Debug)]
pub enum StoreError {
    /// Network-related errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The server replied with something other than what RESP allows here
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Invalid configuration values or malformed network blocks
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O errors (wrapper for `std::io::Error`)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn network(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source),
        }
    }
    pub fn network_msg(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for store operations
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
