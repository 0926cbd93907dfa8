//! The listener handed to applications
//!
//! Composes the remote forward, the command channel and the transport
//! session into something that looks like a local listener.

use url::Url;

use bw_core::traits::{Acceptor, CommandChannel, Transport};
use bw_core::TunnelError;
use bw_protocol::SessionMetadata;

use crate::tunnel::{ControlChannel, RemoteListener, TransportSession};

/// A listener whose connections arrive through the relay
///
/// Owns every resource the tunnel holds. Dropping it without calling
/// [`BridgedListener::close`] still tears the session down once the
/// transport handle is dropped, but without a clean disconnect.
pub struct BridgedListener<A = RemoteListener, C = ControlChannel, T = TransportSession> {
    acceptor: A,
    control: C,
    transport: T,
    metadata: SessionMetadata,
}

impl<A, C, T> BridgedListener<A, C, T>
where
    A: Acceptor,
    C: CommandChannel,
    T: Transport,
{
    /// Assemble a listener from already established parts
    pub fn new(acceptor: A, control: C, transport: T, metadata: SessionMetadata) -> Self {
        Self {
            acceptor,
            control,
            transport,
            metadata,
        }
    }

    /// Wait for the next public client
    ///
    /// Fails with a connection-closed error once the relay session is gone.
    pub async fn accept(&mut self) -> Result<A::Conn, TunnelError> {
        if self.transport.is_closed() {
            return Err(TunnelError::ConnectionClosed(
                "relay session ended".to_string(),
            ));
        }
        self.acceptor.accept().await
    }

    /// Relay-side address the public traffic is forwarded from
    pub fn addr(&self) -> String {
        self.acceptor.bind_address()
    }

    /// Everything the relay announced during setup
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Account the relay associated with the credential, possibly empty
    pub fn account(&self) -> &str {
        self.metadata.account()
    }

    /// Region serving the tunnel, possibly empty
    pub fn region(&self) -> &str {
        self.metadata.region()
    }

    /// Public HTTPS URL
    pub fn url(&self) -> Option<&Url> {
        self.metadata.url()
    }

    /// Public plain-HTTP URL, when the relay offers one
    pub fn insecure_url(&self) -> Option<&Url> {
        self.metadata.insecure_url()
    }

    /// Release the tunnel
    ///
    /// Closes the remote forward, then the command channel, then the
    /// transport. Every step is attempted even if an earlier one fails;
    /// the first failure is returned with the rest attached.
    pub async fn close(mut self) -> Result<(), TunnelError> {
        let mut errors = Vec::new();

        if let Err(e) = self.acceptor.close().await {
            tracing::debug!("Error closing remote forward: {}", e);
            errors.push(e);
        }
        if let Err(e) = self.control.close().await {
            tracing::debug!("Error closing command channel: {}", e);
            errors.push(e);
        }
        if let Err(e) = self.transport.close().await {
            tracing::debug!("Error closing transport: {}", e);
            errors.push(e);
        }

        let mut errors = errors.into_iter();
        match errors.next() {
            None => Ok(()),
            Some(first) => Err(TunnelError::Teardown {
                source: Box::new(first),
                suppressed: errors.collect(),
            }),
        }
    }
}

impl<A, C, T> std::fmt::Debug for BridgedListener<A, C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgedListener")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
