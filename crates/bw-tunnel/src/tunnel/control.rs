//! Control channel negotiation
//!
//! Runs the tunnel command on a session channel and hands the channel's
//! standard output to the status reader through a bounded in-process
//! pipe. A pump task owns the channel for its whole life: it forwards
//! stdout into the pipe, logs the relay's stderr, and closes the channel
//! on request. When the pump exits the pipe's write half is dropped, so
//! the status reader sees end of stream.

use std::time::Duration;

use async_trait::async_trait;
use russh::client::Msg;
use russh::{Channel, ChannelId, ChannelMsg};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::{mpsc, oneshot};

use bw_core::traits::CommandChannel;
use bw_core::TunnelError;
use bw_protocol::TunnelCommand;

/// Size of the in-process pipe between the channel and the status reader.
///
/// The status reader drains it for the life of the session; the bound only
/// matters if the reader falls behind, in which case the pump stops
/// pulling from the channel and SSH flow control pushes back on the relay.
const STATUS_PIPE_CAPACITY: usize = 16 * 1024;

/// Requests from the [`ControlChannel`] handle to its pump task
enum ControlRequest {
    Close {
        reply: oneshot::Sender<Result<(), russh::Error>>,
    },
}

/// Handle to the channel running the tunnel command
pub struct ControlChannel {
    id: ChannelId,
    requests: mpsc::Sender<ControlRequest>,
}

impl ControlChannel {
    /// Execute `command` on `channel`
    ///
    /// Returns the handle and the read half of the status pipe once the
    /// relay has acknowledged the command. A refusal, a channel close, or
    /// no reply within `reply_timeout` is a command start failure.
    pub async fn start(
        mut channel: Channel<Msg>,
        command: &TunnelCommand,
        reply_timeout: Duration,
    ) -> Result<(Self, DuplexStream), TunnelError> {
        let id = channel.id();
        let (status_reader, status_writer) = tokio::io::duplex(STATUS_PIPE_CAPACITY);

        tracing::info!("Requesting tunnel: {}", command);
        channel
            .exec(true, command.to_command_line())
            .await
            .map_err(|e| TunnelError::CommandStart(e.to_string()))?;

        let (started_tx, started_rx) = oneshot::channel();
        let (requests_tx, requests_rx) = mpsc::channel(1);
        let pump = tokio::spawn(pump(channel, status_writer, started_tx, requests_rx));

        match tokio::time::timeout(reply_timeout, started_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(reason))) => return Err(TunnelError::CommandStart(reason)),
            Ok(Err(_)) => {
                return Err(TunnelError::CommandStart(
                    "command channel task ended unexpectedly".to_string(),
                ))
            }
            Err(_) => {
                pump.abort();
                return Err(TunnelError::CommandStart(format!(
                    "no reply from relay within {:?}",
                    reply_timeout
                )));
            }
        }

        tracing::debug!("Relay accepted tunnel command on channel {:?}", id);

        Ok((
            Self {
                id,
                requests: requests_tx,
            },
            status_reader,
        ))
    }

    /// Channel the command runs on
    pub fn id(&self) -> ChannelId {
        self.id
    }
}

#[async_trait]
impl CommandChannel for ControlChannel {
    async fn close(&mut self) -> Result<(), TunnelError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        if self
            .requests
            .send(ControlRequest::Close { reply: reply_tx })
            .await
            .is_err()
        {
            tracing::debug!("Command channel {:?} already closed by relay", self.id);
            return Ok(());
        }

        match reply_rx.await {
            Ok(Ok(())) => {
                tracing::debug!("Closed command channel {:?}", self.id);
                Ok(())
            }
            Ok(Err(e)) => Err(TunnelError::Close {
                resource: "command channel",
                source: e.into(),
            }),
            // Pump exited on its own between send and reply
            Err(_) => Ok(()),
        }
    }
}

async fn pump(
    mut channel: Channel<Msg>,
    mut status: DuplexStream,
    started: oneshot::Sender<Result<(), String>>,
    mut requests: mpsc::Receiver<ControlRequest>,
) {
    let id = channel.id();
    let mut started = Some(started);
    let mut pipe_open = true;

    loop {
        tokio::select! {
            request = requests.recv() => {
                let result = channel.close().await;
                match request {
                    Some(ControlRequest::Close { reply }) => {
                        let _ = reply.send(result);
                    }
                    None => tracing::debug!("Command channel {:?} handle dropped", id),
                }
                break;
            }
            msg = channel.wait() => {
                let Some(msg) = msg else {
                    tracing::debug!("Command channel {:?} ended", id);
                    break;
                };

                match msg {
                    ChannelMsg::Success => {
                        if let Some(tx) = started.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    ChannelMsg::Failure => {
                        if let Some(tx) = started.take() {
                            let _ = tx.send(Err("relay rejected the tunnel command".to_string()));
                            let _ = channel.close().await;
                            break;
                        }
                    }
                    ChannelMsg::Data { data } => {
                        // Keep draining the channel even once nobody reads the pipe
                        if pipe_open {
                            if let Err(e) = status.write_all(&data).await {
                                tracing::debug!("Status pipe closed: {}", e);
                                pipe_open = false;
                            }
                        }
                    }
                    ChannelMsg::ExtendedData { data, .. } => {
                        for line in String::from_utf8_lossy(&data).lines() {
                            if !line.trim().is_empty() {
                                tracing::warn!("Relay: {}", line.trim_end());
                            }
                        }
                    }
                    ChannelMsg::ExitStatus { exit_status } => {
                        tracing::info!("Relay tunnel command exited with status {}", exit_status);
                    }
                    ChannelMsg::Eof => {
                        tracing::debug!("Relay sent EOF on command channel {:?}", id);
                    }
                    ChannelMsg::Close => {
                        tracing::debug!("Relay closed command channel {:?}", id);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(tx) = started.take() {
        let _ = tx.send(Err(
            "command channel closed before the relay replied".to_string()
        ));
    }
    // Dropping `status` ends the status stream
}
