//! SSH plumbing between this process and the relay

mod control;
mod forward;
mod reconnect;
mod status;
mod transport;

pub use control::ControlChannel;
pub use forward::{BridgedConnection, RemoteListener};
pub use reconnect::{retry, ExponentialBackoff};
pub use status::StatusReader;
pub use transport::TransportSession;
