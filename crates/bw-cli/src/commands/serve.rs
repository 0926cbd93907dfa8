//! `burrow serve`: publish a greeting service through the relay

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tower::ServiceExt;

use bw_core::config::ConfigFile;
use bw_tunnel::{BridgedConnection, BridgedListener};

use super::config;
use crate::output::{
    format_tunnel, format_tunnel_json, print_error, print_info, print_success, TunnelSummary,
};

/// Command-line overrides for the `[tunnel]` and `[retry]` sections
#[derive(Debug, Default, Clone)]
pub struct ServeOptions {
    pub subdomain: Option<String>,
    pub auth: Option<String>,
    pub hostname: Option<String>,
    pub identity: Option<PathBuf>,
    pub region: Option<String>,
    pub retries: Option<u32>,
    pub ready_timeout: Option<u64>,
    pub json: bool,
}

impl ServeOptions {
    /// Apply the overrides on top of the loaded file
    pub fn apply(&self, file: &mut ConfigFile) {
        let tunnel = &mut file.tunnel;
        if self.subdomain.is_some() {
            tunnel.subdomain = self.subdomain.clone();
        }
        if self.auth.is_some() {
            tunnel.auth = self.auth.clone();
        }
        if self.hostname.is_some() {
            tunnel.hostname = self.hostname.clone();
        }
        if self.identity.is_some() {
            tunnel.identity = self.identity.clone();
        }
        if self.region.is_some() {
            tunnel.region = self.region.clone();
        }
        if let Some(secs) = self.ready_timeout {
            tunnel.ready_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.retries {
            file.retry.max_attempts = retries.saturating_add(1);
        }
    }
}

/// Establish the tunnel and serve until Ctrl-C or until the relay goes away
pub async fn serve_command(config_path: Option<&PathBuf>, options: ServeOptions) -> Result<()> {
    let mut file = config::load(config_path)?;
    options.apply(&mut file);

    let relay = file.tunnel.relay_address();
    if !options.json {
        print_info(&format!("Opening tunnel through {}", relay));
    }

    let mut listener = bw_tunnel::establish_with_retry(file.tunnel, &file.retry)
        .await
        .context("Failed to establish tunnel")?;

    let summary = TunnelSummary {
        relay: &relay,
        metadata: listener.metadata(),
    };
    if options.json {
        println!("{}", format_tunnel_json(&summary)?);
    } else {
        print_success("Tunnel ready");
        println!("{}", format_tunnel(&summary));
    }

    let router = greeting_router(listener.account());
    let outcome = accept_loop(&mut listener, router).await;

    if let Err(e) = listener.close().await {
        tracing::warn!("Tunnel teardown incomplete: {}", e);
    }

    outcome
}

async fn accept_loop(listener: &mut BridgedListener, router: Router) -> Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                print_info("Shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    let router = router.clone();
                    tokio::spawn(serve_connection(conn, router));
                }
                Err(e) => {
                    print_error(&format!("Tunnel closed: {}", e));
                    return Err(e).context("Relay session ended");
                }
            },
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

async fn serve_connection(conn: BridgedConnection, router: Router) {
    tracing::info!(
        "Connection from {}:{}",
        conn.originator_address(),
        conn.originator_port()
    );

    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
        router.clone().oneshot(request)
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(conn), service)
        .await
    {
        tracing::debug!("Connection ended with error: {}", e);
    }
}

/// Router answering every request with a greeting for `account`
pub fn greeting_router(account: &str) -> Router {
    let name = if account.is_empty() {
        "world".to_string()
    } else {
        account.to_string()
    };

    Router::new()
        .route("/", get(greet))
        .fallback(greet)
        .with_state(name)
}

async fn greet(State(name): State<String>) -> String {
    format!("Hello, {}!\n", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    async fn body_text(router: Router, uri: &str) -> String {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_greets_account() {
        assert_eq!(body_text(greeting_router("alice"), "/").await, "Hello, alice!\n");
        assert_eq!(
            body_text(greeting_router("alice"), "/any/path").await,
            "Hello, alice!\n"
        );
    }

    #[tokio::test]
    async fn test_greets_world_without_account() {
        assert_eq!(body_text(greeting_router(""), "/").await, "Hello, world!\n");
    }

    #[test]
    fn test_overrides() {
        let mut file = ConfigFile::default();
        file.tunnel.subdomain = Some("from-file".to_string());
        file.tunnel.region = Some("eu".to_string());

        let options = ServeOptions {
            subdomain: Some("from-cli".to_string()),
            retries: Some(2),
            ready_timeout: Some(0),
            ..Default::default()
        };
        options.apply(&mut file);

        assert_eq!(file.tunnel.subdomain.as_deref(), Some("from-cli"));
        assert_eq!(file.tunnel.region.as_deref(), Some("eu"));
        assert_eq!(file.retry.max_attempts, 3);
        assert_eq!(file.tunnel.ready_timeout(), None);
    }
}
