//! In-process SSH relay
//!
//! Speaks just enough of the relay's side of the protocol to drive a
//! tunnel end to end: public key auth, the tunnel command, the remote
//! forward and forwarded-tcpip channels back to the client.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use russh::server::{Auth, Handle, Handler, Msg, Session};
use russh::{Channel, ChannelId, ChannelStream, CryptoVec};
use russh_keys::key::PublicKey;
use tokio::net::TcpListener;

use bw_core::TunnelConfig;

/// Address the relay reports for every public client
pub const PUBLIC_CLIENT: (&str, u32) = ("203.0.113.7", 50000);

/// How the relay answers the tunnel command
#[derive(Clone)]
pub enum ExecReply {
    /// Acknowledge, then write these lines on stdout
    Accept(Vec<&'static str>),
    /// Acknowledge, write these lines, then exit and close the channel
    Exit(Vec<&'static str>),
    /// Refuse the command
    Reject,
}

/// Something the relay saw the client do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Exec(String),
    Forward { host: String, port: u32 },
    CancelForward { host: String, port: u32 },
    ChannelClosed,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<RelayEvent>>,
    session: Mutex<Option<Handle>>,
}

pub struct FakeRelay {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

pub fn fixture_key() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../bw-core/tests/fixtures/id_ed25519")
}

impl FakeRelay {
    pub async fn start(reply: ExecReply) -> Self {
        let host_key = russh_keys::load_secret_key(fixture_key(), None).unwrap();
        let mut config = russh::server::Config::default();
        config.keys.push(host_key);
        config.auth_rejection_time = Duration::from_millis(10);
        config.auth_rejection_time_initial = Some(Duration::from_secs(0));
        let config = Arc::new(config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared::default());

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = RelayHandler {
                    reply: reply.clone(),
                    shared: Arc::clone(&accept_shared),
                };
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    let _ = russh::server::run_stream(config, socket, handler).await;
                });
            }
        });

        Self { addr, shared }
    }

    /// Tunnel configuration pointing at this relay
    pub fn config(&self) -> TunnelConfig {
        TunnelConfig {
            identity: Some(fixture_key()),
            relay_host: Some(self.addr.ip().to_string()),
            relay_port: self.addr.port(),
            connect_timeout: Duration::from_secs(5),
            ready_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<RelayEvent> {
        self.shared.events.lock().unwrap().clone()
    }

    /// Wait until the relay has seen `event`
    pub async fn wait_for(&self, event: &RelayEvent) {
        for _ in 0..500 {
            if self.events().contains(event) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("relay never saw {:?}; saw {:?}", event, self.events());
    }

    /// Bridge a public client to the tunnel, as the relay does on a new request
    pub async fn connect_public_client(&self) -> ChannelStream<Msg> {
        let handle = self
            .shared
            .session
            .lock()
            .unwrap()
            .clone()
            .expect("no remote forward requested");

        let channel = handle
            .channel_open_forwarded_tcpip("127.0.0.1", 443, PUBLIC_CLIENT.0, PUBLIC_CLIENT.1)
            .await
            .unwrap();
        channel.into_stream()
    }
}

struct RelayHandler {
    reply: ExecReply,
    shared: Arc<Shared>,
}

impl RelayHandler {
    fn record(&self, event: RelayEvent) {
        self.shared.events.lock().unwrap().push(event);
    }
}

fn send_lines(session: &mut Session, channel: ChannelId, lines: &[&str]) {
    for line in lines {
        session.data(channel, CryptoVec::from_slice(format!("{}\n", line).as_bytes()));
    }
}

#[async_trait]
impl Handler for RelayHandler {
    type Error = anyhow::Error;

    async fn auth_publickey(
        &mut self,
        _user: &str,
        _public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.record(RelayEvent::Exec(String::from_utf8_lossy(data).into_owned()));

        match &self.reply {
            ExecReply::Accept(lines) => {
                session.channel_success(channel);
                send_lines(session, channel, lines);
            }
            ExecReply::Exit(lines) => {
                session.channel_success(channel);
                send_lines(session, channel, lines);
                session.exit_status_request(channel, 1);
                session.eof(channel);
                session.close(channel);
            }
            ExecReply::Reject => {
                session.channel_failure(channel);
            }
        }
        Ok(())
    }

    async fn tcpip_forward(
        &mut self,
        address: &str,
        port: &mut u32,
        session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.record(RelayEvent::Forward {
            host: address.to_string(),
            port: *port,
        });
        *self.shared.session.lock().unwrap() = Some(session.handle());
        Ok(true)
    }

    async fn cancel_tcpip_forward(
        &mut self,
        address: &str,
        port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.record(RelayEvent::CancelForward {
            host: address.to_string(),
            port,
        });
        Ok(true)
    }

    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.record(RelayEvent::ChannelClosed);
        Ok(())
    }
}
