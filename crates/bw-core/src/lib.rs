//! bw-core: Core abstractions and configuration for burrow
//!
//! This crate provides the configuration model, credential loading, the
//! error taxonomy and the resource traits shared by the tunnel runtime
//! and the CLI.

pub mod config;
pub mod credential;
pub mod error;
pub mod traits;

pub use config::TunnelConfig;
pub use credential::Credential;
pub use error::{ConfigError, CredentialError, ErrorKind, TunnelError};
