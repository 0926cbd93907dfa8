//! Outbound SSH transport to the relay
//!
//! Opens the single authenticated connection everything else rides on
//! and routes the relay's forwarded-tcpip channels to the remote
//! listener.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle, Msg};
use russh::{Channel, Disconnect};
use russh_keys::key::PublicKey;
use tokio::sync::mpsc;

use bw_core::traits::Transport;
use bw_core::{Credential, TunnelError};

use super::forward::{ForwardedChannel, RemoteListener};

/// Bridged connections queued between the SSH session and `accept()`.
///
/// When the queue is full the relay's newest connection is refused
/// rather than stalling the session loop, which also carries the status
/// stream.
const FORWARDED_CHANNEL_CAPACITY: usize = 64;

/// An authenticated SSH session with the relay
pub struct TransportSession {
    /// SSH session handle
    handle: Arc<Handle<ClientHandler>>,
    /// Relay address, for logging
    address: String,
    /// Forwarded channels, until a remote listener claims them
    forwarded: Option<mpsc::Receiver<ForwardedChannel>>,
}

impl TransportSession {
    /// Connect and authenticate with the given credential
    ///
    /// Only public key authentication is attempted. The relay's host key
    /// is not verified.
    pub async fn open(
        address: &str,
        user: &str,
        credential: &Credential,
        connect_timeout: Duration,
    ) -> Result<Self, TunnelError> {
        let ssh_config = Arc::new(Config::default());

        let (forwarded_tx, forwarded_rx) = mpsc::channel(FORWARDED_CHANNEL_CAPACITY);
        let handler = ClientHandler::new(forwarded_tx);

        let dial = async {
            tracing::debug!("Connecting to {}", address);
            let mut handle = client::connect(ssh_config, address, handler)
                .await
                .map_err(|source| TunnelError::TransportDial {
                    address: address.to_string(),
                    source,
                })?;

            tracing::debug!(
                "Authenticating with {}",
                credential.path().display()
            );
            let authenticated = handle
                .authenticate_publickey(user, credential.key_pair())
                .await
                .map_err(|e| TunnelError::TransportDial {
                    address: address.to_string(),
                    source: anyhow::anyhow!("Authentication error: {}", e),
                })?;

            if !authenticated {
                return Err(TunnelError::AuthRejected {
                    address: address.to_string(),
                });
            }

            Ok(handle)
        };

        let handle = tokio::time::timeout(connect_timeout, dial)
            .await
            .map_err(|_| TunnelError::TransportDial {
                address: address.to_string(),
                source: anyhow::anyhow!("Connection timed out after {:?}", connect_timeout),
            })??;

        tracing::info!("Connected to relay at {}", address);

        Ok(Self {
            handle: Arc::new(handle),
            address: address.to_string(),
            forwarded: Some(forwarded_rx),
        })
    }

    /// Relay address this session is connected to
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Open a session channel for running one relay-side command
    pub async fn new_command_channel(&self) -> Result<Channel<Msg>, TunnelError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| TunnelError::ChannelOpen(e.into()))?;

        tracing::debug!("Opened command channel {:?}", channel.id());
        Ok(channel)
    }

    /// Ask the relay to forward TCP connections on `host:port` back to us
    ///
    /// Only one remote listener may exist per session.
    pub async fn listen_remote(
        &mut self,
        host: &str,
        port: u32,
    ) -> Result<RemoteListener, TunnelError> {
        let bind = format!("{}:{}", host, port);

        let Some(incoming) = self.forwarded.take() else {
            return Err(TunnelError::RemoteForward {
                bind,
                source: anyhow::anyhow!("A remote forward is already active on this session"),
            });
        };

        let Some(handle) = Arc::get_mut(&mut self.handle) else {
            self.forwarded = Some(incoming);
            return Err(TunnelError::RemoteForward {
                bind,
                source: anyhow::anyhow!("Session handle is shared"),
            });
        };

        let assigned = match handle.tcpip_forward(host, port).await {
            Ok(assigned) => assigned,
            Err(e) => {
                self.forwarded = Some(incoming);
                return Err(TunnelError::RemoteForward {
                    bind,
                    source: e.into(),
                });
            }
        };
        let bound_port = if assigned != 0 { assigned } else { port };

        tracing::info!("Relay forwarding {}:{} to this session", host, bound_port);

        Ok(RemoteListener::new(
            Arc::clone(&self.handle),
            incoming,
            host.to_string(),
            bound_port,
        ))
    }
}

#[async_trait]
impl Transport for TransportSession {
    fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    async fn close(&mut self) -> Result<(), TunnelError> {
        if self.handle.is_closed() {
            tracing::debug!("Relay session {} already closed", self.address);
            return Ok(());
        }

        self.handle
            .disconnect(Disconnect::ByApplication, "closing", "en")
            .await
            .map_err(|e| TunnelError::Close {
                resource: "transport session",
                source: e.into(),
            })?;

        tracing::info!("Disconnected from relay at {}", self.address);
        Ok(())
    }
}

/// SSH client handler for the relay connection
pub(crate) struct ClientHandler {
    /// Sink for channels the relay opens towards us
    forwarded_tx: mpsc::Sender<ForwardedChannel>,
}

impl ClientHandler {
    fn new(forwarded_tx: mpsc::Sender<ForwardedChannel>) -> Self {
        Self { forwarded_tx }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    /// Accept the relay's host key without verification
    ///
    /// The relay's key is not pinned. The fingerprint is logged so an
    /// operator can at least compare it out of band.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::warn!(
            "Relay host key {} is not pinned; accepting without verification",
            server_public_key.fingerprint()
        );
        Ok(true)
    }

    /// Queue a connection the relay bridged to us
    async fn server_channel_open_forwarded_tcpip(
        &mut self,
        channel: Channel<Msg>,
        connected_address: &str,
        connected_port: u32,
        originator_address: &str,
        originator_port: u32,
        _session: &mut client::Session,
    ) -> Result<(), Self::Error> {
        tracing::debug!(
            "Bridged connection from {}:{} on {}:{}",
            originator_address,
            originator_port,
            connected_address,
            connected_port
        );

        let forwarded = ForwardedChannel {
            channel,
            originator_address: originator_address.to_string(),
            originator_port,
        };

        if let Err(e) = self.forwarded_tx.try_send(forwarded) {
            let reason = match &e {
                mpsc::error::TrySendError::Full(_) => "accept queue full",
                mpsc::error::TrySendError::Closed(_) => "no listener",
            };
            tracing::warn!(
                "Refusing bridged connection from {}:{}: {}",
                originator_address,
                originator_port,
                reason
            );
            let rejected = e.into_inner();
            tokio::spawn(async move {
                let _ = rejected.channel.close().await;
            });
        }

        Ok(())
    }
}
