//! Remote port forward acceptor

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use russh::client::{Handle, Msg};
use russh::{Channel, ChannelStream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

use bw_core::traits::Acceptor;
use bw_core::TunnelError;

use super::transport::ClientHandler;

/// A forwarded-tcpip channel opened by the relay
pub(crate) struct ForwardedChannel {
    pub(crate) channel: Channel<Msg>,
    pub(crate) originator_address: String,
    pub(crate) originator_port: u32,
}

/// Yields connections the relay forwards from its public endpoint
pub struct RemoteListener {
    /// Session handle, for cancelling the forward
    handle: Arc<Handle<ClientHandler>>,
    /// Channels queued by the client handler
    incoming: mpsc::Receiver<ForwardedChannel>,
    /// Bound address on the relay
    bind_host: String,
    /// Bound port on the relay
    bind_port: u32,
    closed: bool,
}

impl RemoteListener {
    pub(crate) fn new(
        handle: Arc<Handle<ClientHandler>>,
        incoming: mpsc::Receiver<ForwardedChannel>,
        bind_host: String,
        bind_port: u32,
    ) -> Self {
        Self {
            handle,
            incoming,
            bind_host,
            bind_port,
            closed: false,
        }
    }
}

#[async_trait]
impl Acceptor for RemoteListener {
    type Conn = BridgedConnection;

    async fn accept(&mut self) -> Result<BridgedConnection, TunnelError> {
        match self.incoming.recv().await {
            Some(forwarded) => Ok(BridgedConnection::from(forwarded)),
            None if self.closed => Err(TunnelError::ConnectionClosed(
                "listener closed".to_string(),
            )),
            None => Err(TunnelError::ConnectionClosed(
                "relay session ended".to_string(),
            )),
        }
    }

    /// Relay-side bind target
    fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    async fn close(&mut self) -> Result<(), TunnelError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Refuse anything still queued
        self.incoming.close();
        while let Ok(pending) = self.incoming.try_recv() {
            let _ = pending.channel.close().await;
        }

        if self.handle.is_closed() {
            return Ok(());
        }

        self.handle
            .cancel_tcpip_forward(self.bind_host.clone(), self.bind_port)
            .await
            .map_err(|e| TunnelError::Close {
                resource: "remote forward",
                source: e.into(),
            })?;

        tracing::debug!("Cancelled remote forward {}", self.bind_address());
        Ok(())
    }
}

/// A public client's connection, bridged through the relay
///
/// Reads and writes go straight to the forwarded SSH channel.
pub struct BridgedConnection {
    stream: ChannelStream<Msg>,
    originator_address: String,
    originator_port: u32,
}

impl BridgedConnection {
    /// Address the relay reports for the public client
    pub fn originator_address(&self) -> &str {
        &self.originator_address
    }

    /// Port the relay reports for the public client
    pub fn originator_port(&self) -> u32 {
        self.originator_port
    }

    /// Unwrap the underlying channel stream
    pub fn into_inner(self) -> ChannelStream<Msg> {
        self.stream
    }
}

impl From<ForwardedChannel> for BridgedConnection {
    fn from(forwarded: ForwardedChannel) -> Self {
        Self {
            stream: forwarded.channel.into_stream(),
            originator_address: forwarded.originator_address,
            originator_port: forwarded.originator_port,
        }
    }
}

impl std::fmt::Debug for BridgedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgedConnection")
            .field("originator_address", &self.originator_address)
            .field("originator_port", &self.originator_port)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for BridgedConnection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for BridgedConnection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
