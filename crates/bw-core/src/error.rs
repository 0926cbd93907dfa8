//! Core error types for burrow

use std::path::PathBuf;
use std::time::Duration;

use bw_protocol::ProtocolError;
use thiserror::Error;

/// Coarse classification of tunnel failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Identity path could not be resolved or read
    CredentialUnavailable,
    /// Identity file is not a usable private key
    CredentialMalformed,
    /// Connecting or authenticating to the relay failed
    TransportDialFailure,
    /// The relay refused to open a session channel
    ChannelOpenFailure,
    /// The relay refused or never acknowledged the tunnel command
    CommandStartFailure,
    /// The relay refused the remote port forward
    RemoteForwardFailure,
    /// The relay sent status output that cannot be interpreted
    StatusStreamMalformed,
    /// The status stream ended before the tunnel became ready
    StatusStreamClosed,
    /// The tunnel did not become ready in time
    ReadyTimeout,
    /// The transport session is gone; no more connections will arrive
    ConnectionClosed,
    /// One or more resources failed to release
    TeardownFailure,
}

/// Errors raised while establishing, using or closing a tunnel
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Credential resolution failed
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Could not connect to the relay
    #[error("Failed to connect to relay at {address}: {source}")]
    TransportDial {
        address: String,
        #[source]
        source: anyhow::Error,
    },

    /// The relay did not accept our public key
    #[error("Relay at {address} rejected public key authentication")]
    AuthRejected { address: String },

    /// Opening the command channel failed
    #[error("Failed to open command channel: {0}")]
    ChannelOpen(#[source] anyhow::Error),

    /// The tunnel command could not be started
    #[error("Relay did not start tunnel command: {0}")]
    CommandStart(String),

    /// The remote port forward was refused
    #[error("Relay refused remote forward of {bind}: {source}")]
    RemoteForward {
        bind: String,
        #[source]
        source: anyhow::Error,
    },

    /// Unparseable status output before readiness
    #[error("Malformed relay status: {0}")]
    StatusStreamMalformed(#[source] ProtocolError),

    /// Status stream ended before a secure URL was announced
    #[error("Relay closed the status stream before announcing a public URL")]
    StatusStreamClosed,

    /// No secure URL within the configured readiness timeout
    #[error("Relay did not announce a public URL within {0:?}")]
    ReadyTimeout(Duration),

    /// The transport session has ended
    #[error("Tunnel connection closed: {0}")]
    ConnectionClosed(String),

    /// Releasing a single resource failed
    #[error("Failed to close {resource}: {source}")]
    Close {
        resource: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Closing the listener failed for at least one resource
    #[error("Teardown failed: {source} ({} further errors)", .suppressed.len())]
    Teardown {
        #[source]
        source: Box<TunnelError>,
        suppressed: Vec<TunnelError>,
    },
}

impl TunnelError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TunnelError::Credential(e) => e.kind(),
            TunnelError::TransportDial { .. } | TunnelError::AuthRejected { .. } => {
                ErrorKind::TransportDialFailure
            }
            TunnelError::ChannelOpen(_) => ErrorKind::ChannelOpenFailure,
            TunnelError::CommandStart(_) => ErrorKind::CommandStartFailure,
            TunnelError::RemoteForward { .. } => ErrorKind::RemoteForwardFailure,
            TunnelError::StatusStreamMalformed(_) => ErrorKind::StatusStreamMalformed,
            TunnelError::StatusStreamClosed => ErrorKind::StatusStreamClosed,
            TunnelError::ReadyTimeout(_) => ErrorKind::ReadyTimeout,
            TunnelError::ConnectionClosed(_) => ErrorKind::ConnectionClosed,
            TunnelError::Close { .. } | TunnelError::Teardown { .. } => ErrorKind::TeardownFailure,
        }
    }

    /// Whether a fresh attempt might succeed
    ///
    /// Only connection-level failures qualify; a rejected key or a bad
    /// identity file will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TunnelError::TransportDial { .. })
    }
}

/// Credential resolution errors
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No home directory to derive the default identity path from
    #[error("Cannot determine home directory to locate the default identity")]
    HomeDirUnavailable,

    /// Identity file could not be read
    #[error("Identity file {} is unavailable: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Identity file could not be decoded
    #[error("Identity file {} is not a usable private key: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: russh_keys::Error,
    },
}

impl CredentialError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredentialError::HomeDirUnavailable | CredentialError::Unavailable { .. } => {
                ErrorKind::CredentialUnavailable
            }
            CredentialError::Malformed { .. } => ErrorKind::CredentialMalformed,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
