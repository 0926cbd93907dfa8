//! Resource traits composed by a bridged listener

use async_trait::async_trait;

use crate::error::TunnelError;

/// Source of inbound bridged connections
#[async_trait]
pub trait Acceptor: Send {
    /// A single bridged byte stream
    type Conn: Send;

    /// Wait for the next connection
    ///
    /// Must return an error, not block, once the underlying transport
    /// has gone away.
    async fn accept(&mut self) -> Result<Self::Conn, TunnelError>;

    /// Address connections are accepted on, as `host:port`
    fn bind_address(&self) -> String;

    /// Stop accepting and release the forward
    async fn close(&mut self) -> Result<(), TunnelError>;
}

/// The channel running the relay-side tunnel command
#[async_trait]
pub trait CommandChannel: Send {
    /// Close the channel, ending the status stream
    async fn close(&mut self) -> Result<(), TunnelError>;
}

/// The authenticated connection to the relay
#[async_trait]
pub trait Transport: Send {
    /// Whether the connection has already ended
    fn is_closed(&self) -> bool;

    /// Disconnect from the relay
    async fn close(&mut self) -> Result<(), TunnelError>;
}
