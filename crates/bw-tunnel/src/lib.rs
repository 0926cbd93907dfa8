//! bw-tunnel: Reverse tunnels through an SSH relay
//!
//! Dials the relay over SSH, runs the tunnel command on a session
//! channel, asks for a remote port forward and waits until the relay
//! announces the public URL. The result is a [`BridgedListener`] whose
//! connections come from public clients of that URL.
//!
//! ```no_run
//! # async fn run() -> Result<(), bw_core::TunnelError> {
//! use bw_core::TunnelConfig;
//!
//! let mut listener = bw_tunnel::establish(TunnelConfig::default()).await?;
//! if let Some(url) = listener.url() {
//!     println!("Serving on {}", url);
//! }
//! let conn = listener.accept().await?;
//! # drop(conn);
//! listener.close().await
//! # }
//! ```

pub mod establish;
pub mod listener;
pub mod tunnel;

pub use establish::{establish, establish_with_retry};
pub use listener::BridgedListener;
pub use tunnel::{
    BridgedConnection, ControlChannel, ExponentialBackoff, RemoteListener, StatusReader,
    TransportSession,
};
