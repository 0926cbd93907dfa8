//! Status stream reader
//!
//! Runs the relay's status output through the line codec and parser on a
//! background task. The task reports readiness once, then keeps draining
//! the stream until the relay closes it.

use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

use bw_core::TunnelError;
use bw_protocol::{SessionMetadata, StatusCodec, StatusParser};

/// Handle to the background status worker
pub struct StatusReader {
    ready: oneshot::Receiver<Result<SessionMetadata, TunnelError>>,
    task: JoinHandle<()>,
}

impl StatusReader {
    /// Start reading status lines from `pipe`
    pub fn spawn<R>(pipe: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(read_status(pipe, ready_tx));

        Self {
            ready: ready_rx,
            task,
        }
    }

    /// Wait until the relay announces the secure URL
    ///
    /// With `timeout` set to `None` this waits as long as the stream stays
    /// open. On timeout the worker is stopped. On success it keeps running
    /// so the relay's later output is still consumed.
    pub async fn wait(self, timeout: Option<Duration>) -> Result<SessionMetadata, TunnelError> {
        let Self { ready, task } = self;

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, ready).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    task.abort();
                    return Err(TunnelError::ReadyTimeout(limit));
                }
            },
            None => ready.await,
        };

        match outcome {
            Ok(result) => result,
            Err(_) => Err(TunnelError::StatusStreamClosed),
        }
    }
}

async fn read_status<R>(pipe: R, ready: oneshot::Sender<Result<SessionMetadata, TunnelError>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(pipe, StatusCodec::new());
    let mut parser = StatusParser::new();
    let mut ready = Some(ready);

    while let Some(line) = lines.next().await {
        let outcome = line.and_then(|line| parser.feed(&line));

        match outcome {
            Ok(true) => {
                let metadata = parser.metadata().clone();
                if let Some(url) = metadata.url() {
                    tracing::info!("Tunnel ready at {}", url);
                }
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(metadata));
                }
            }
            Ok(false) => {}
            Err(e) => match ready.take() {
                Some(tx) => {
                    let _ = tx.send(Err(TunnelError::StatusStreamMalformed(e)));
                    return;
                }
                None => tracing::warn!("Discarding relay status: {}", e),
            },
        }
    }

    if let Some(tx) = ready.take() {
        let _ = tx.send(Err(TunnelError::StatusStreamClosed));
    } else {
        tracing::debug!("Relay status stream ended");
    }
}
