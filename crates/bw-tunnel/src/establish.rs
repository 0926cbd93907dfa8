//! Tunnel establishment
//!
//! Credential, transport, command channel, remote forward and status
//! stream are brought up in that order. A failure at any step releases
//! whatever was already opened before the error is returned.

use bw_core::config::BackoffConfig;
use bw_core::traits::{Acceptor, CommandChannel, Transport};
use bw_core::{Credential, TunnelConfig, TunnelError};
use bw_protocol::SessionMetadata;

use crate::listener::BridgedListener;
use crate::tunnel::{retry, ControlChannel, RemoteListener, StatusReader, TransportSession};

/// Open a tunnel and wait until the relay publishes its secure URL
pub async fn establish(mut config: TunnelConfig) -> Result<BridgedListener, TunnelError> {
    config.apply_defaults()?;

    let credential = Credential::resolve(config.identity.as_deref(), config.passphrase.as_deref())?;
    let address = config.relay_address();

    let mut transport =
        TransportSession::open(&address, &config.user, &credential, config.connect_timeout).await?;

    match negotiate(&mut transport, &config).await {
        Ok((acceptor, control, metadata)) => {
            Ok(BridgedListener::new(acceptor, control, transport, metadata))
        }
        Err(e) => {
            if let Err(close_err) = transport.close().await {
                tracing::debug!("Error closing transport after failed setup: {}", close_err);
            }
            Err(e)
        }
    }
}

/// Like [`establish`], retrying failed connection attempts with backoff
pub async fn establish_with_retry(
    config: TunnelConfig,
    backoff: &BackoffConfig,
) -> Result<BridgedListener, TunnelError> {
    retry(backoff, || establish(config.clone())).await
}

async fn negotiate(
    transport: &mut TransportSession,
    config: &TunnelConfig,
) -> Result<(RemoteListener, ControlChannel, SessionMetadata), TunnelError> {
    let channel = transport.new_command_channel().await?;
    let (mut control, status_pipe) =
        ControlChannel::start(channel, &config.command(), config.connect_timeout).await?;

    let mut acceptor = match transport
        .listen_remote(&config.remote_bind_host, config.remote_bind_port)
        .await
    {
        Ok(acceptor) => acceptor,
        Err(e) => {
            if let Err(close_err) = control.close().await {
                tracing::debug!("Error closing command channel: {}", close_err);
            }
            return Err(e);
        }
    };

    match StatusReader::spawn(status_pipe)
        .wait(config.ready_timeout())
        .await
    {
        Ok(metadata) => Ok((acceptor, control, metadata)),
        Err(e) => {
            if let Err(close_err) = acceptor.close().await {
                tracing::debug!("Error cancelling remote forward: {}", close_err);
            }
            if let Err(close_err) = control.close().await {
                tracing::debug!("Error closing command channel: {}", close_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_core::ErrorKind;
    use std::path::PathBuf;
    use std::time::Duration;

    fn fixture_key() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../bw-core/tests/fixtures/id_ed25519")
    }

    #[tokio::test]
    async fn test_missing_identity_fails_before_dialing() {
        let dir = tempfile::tempdir().unwrap();
        let config = TunnelConfig {
            identity: Some(dir.path().join("absent")),
            relay_domain: "invalid".to_string(),
            ..Default::default()
        };

        let err = establish(config).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialUnavailable);
    }

    #[tokio::test]
    async fn test_malformed_identity() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa");
        std::fs::write(&key, "not a key").unwrap();

        let config = TunnelConfig {
            identity: Some(key),
            relay_domain: "invalid".to_string(),
            ..Default::default()
        };

        let err = establish(config).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialMalformed);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_dial_failure() {
        let config = TunnelConfig {
            identity: Some(fixture_key()),
            relay_domain: "invalid".to_string(),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };

        let err = establish(config).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportDialFailure);
        assert!(err.to_string().contains("tunnel.us.invalid:22"));
    }

    #[tokio::test]
    async fn test_retry_stops_on_credential_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = TunnelConfig {
            identity: Some(dir.path().join("absent")),
            ..Default::default()
        };
        let backoff = BackoffConfig {
            max_attempts: 5,
            initial: Duration::from_secs(3600),
            ..Default::default()
        };

        // Would sleep an hour if the credential failure were retried
        let err = tokio::time::timeout(
            Duration::from_secs(10),
            establish_with_retry(config, &backoff),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialUnavailable);
    }
}
