//! Protocol error types

use thiserror::Error;

/// Errors that can occur while interpreting the relay's status stream
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A `Forwarding` line carried a value that is not a URL
    #[error("Malformed forwarding URL {value:?}: {source}")]
    MalformedForwarding {
        value: String,
        #[source]
        source: url::ParseError,
    },

    /// A status line exceeded the maximum accepted length
    #[error("Status line exceeds maximum of {max} bytes")]
    LineTooLong { max: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
