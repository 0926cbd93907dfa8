//! Tunnel configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use bw_protocol::TunnelCommand;

use super::serde_utils::duration_secs;
use crate::credential;
use crate::error::CredentialError;

/// Relay region used when none is configured
pub const DEFAULT_REGION: &str = "us";

/// Relay domain; the SSH endpoint is `tunnel.<region>.<domain>`
pub const DEFAULT_RELAY_DOMAIN: &str = "ngrok.com";

/// Relay SSH port
pub const DEFAULT_RELAY_PORT: u16 = 22;

/// Configuration for establishing a tunnel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Public subdomain to request
    pub subdomain: Option<String>,

    /// Basic auth enforced at the relay, as `user:password`
    pub auth: Option<String>,

    /// Custom hostname to request (requires a DNS CNAME to the relay)
    pub hostname: Option<String>,

    /// Private key for SSH authentication (default: `~/.ssh/id_rsa`)
    pub identity: Option<PathBuf>,

    /// Passphrase for an encrypted identity file
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,

    /// Relay region (default: `us`)
    pub region: Option<String>,

    /// Relay domain
    pub relay_domain: String,

    /// Relay SSH host, replacing `tunnel.<region>.<relay_domain>`
    pub relay_host: Option<String>,

    /// Relay SSH port
    pub relay_port: u16,

    /// SSH user name offered to the relay
    pub user: String,

    /// Address the relay binds the remote forward to
    pub remote_bind_host: String,

    /// Port the relay binds the remote forward to
    pub remote_bind_port: u32,

    /// Bound on connecting, authenticating and starting the tunnel command
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Bound on waiting for the public URL; zero waits forever
    #[serde(with = "duration_secs")]
    pub ready_timeout: Duration,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            subdomain: None,
            auth: None,
            hostname: None,
            identity: None,
            passphrase: None,
            region: None,
            relay_domain: DEFAULT_RELAY_DOMAIN.to_string(),
            relay_host: None,
            relay_port: DEFAULT_RELAY_PORT,
            user: String::new(),
            remote_bind_host: "127.0.0.1".to_string(),
            remote_bind_port: 443,
            connect_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(30),
        }
    }
}

impl TunnelConfig {
    /// Fill in the region and identity path
    ///
    /// Fails when no identity is configured and the home directory
    /// cannot be determined.
    pub fn apply_defaults(&mut self) -> Result<(), CredentialError> {
        if non_empty(&self.region).is_none() {
            self.region = Some(DEFAULT_REGION.to_string());
        }
        let identity = credential::resolve_identity_path(self.identity.as_deref())?;
        self.identity = Some(identity);
        Ok(())
    }

    /// Relay region, falling back to the default
    pub fn region(&self) -> &str {
        non_empty(&self.region).unwrap_or(DEFAULT_REGION)
    }

    /// Relay SSH host for the configured region
    pub fn relay_host(&self) -> String {
        match non_empty(&self.relay_host) {
            Some(host) => host.to_string(),
            None => format!("tunnel.{}.{}", self.region(), self.relay_domain),
        }
    }

    /// Relay SSH address as `host:port`
    pub fn relay_address(&self) -> String {
        format!("{}:{}", self.relay_host(), self.relay_port)
    }

    /// Remote forward bind target as `host:port`
    pub fn remote_bind(&self) -> String {
        format!("{}:{}", self.remote_bind_host, self.remote_bind_port)
    }

    /// Tunnel command requested from the relay
    pub fn command(&self) -> TunnelCommand {
        TunnelCommand {
            subdomain: non_empty(&self.subdomain).map(str::to_string),
            hostname: non_empty(&self.hostname).map(str::to_string),
            auth: non_empty(&self.auth).map(str::to_string),
        }
    }

    /// Readiness timeout, `None` meaning no limit
    pub fn ready_timeout(&self) -> Option<Duration> {
        Some(self.ready_timeout).filter(|t| !t.is_zero())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_host_override() {
        let config = TunnelConfig {
            relay_host: Some("127.0.0.1".to_string()),
            relay_port: 2222,
            region: Some("eu".to_string()),
            ..Default::default()
        };
        assert_eq!(config.relay_address(), "127.0.0.1:2222");

        let blank = TunnelConfig {
            relay_host: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(blank.relay_address(), "tunnel.us.ngrok.com:22");
    }

    #[test]
    fn test_default_relay_address() {
        let config = TunnelConfig::default();
        assert_eq!(config.region(), "us");
        assert_eq!(config.relay_address(), "tunnel.us.ngrok.com:22");
        assert_eq!(config.remote_bind(), "127.0.0.1:443");
    }

    #[test]
    fn test_empty_region_falls_back() {
        let config = TunnelConfig {
            region: Some(String::new()),
            relay_domain: "relay.example".to_string(),
            ..Default::default()
        };
        assert_eq!(config.relay_host(), "tunnel.us.relay.example");
    }

    #[test]
    fn test_apply_defaults_keeps_explicit_values() {
        let mut config = TunnelConfig {
            region: Some("eu".to_string()),
            identity: Some(PathBuf::from("/keys/relay")),
            ..Default::default()
        };
        config.apply_defaults().unwrap();
        assert_eq!(config.region.as_deref(), Some("eu"));
        assert_eq!(config.identity, Some(PathBuf::from("/keys/relay")));
    }

    #[test]
    fn test_apply_defaults_fills_region() {
        let mut config = TunnelConfig {
            identity: Some(PathBuf::from("/keys/relay")),
            ..Default::default()
        };
        config.apply_defaults().unwrap();
        assert_eq!(config.region.as_deref(), Some(DEFAULT_REGION));
    }

    #[test]
    fn test_command_skips_empty_fields() {
        let config = TunnelConfig {
            subdomain: Some("x".to_string()),
            hostname: Some(String::new()),
            auth: Some("u:p".to_string()),
            ..Default::default()
        };
        assert_eq!(config.command().to_command_line(), "http -subdomain=x -auth=u:p");
        assert_eq!(TunnelConfig::default().command().to_command_line(), "http");
    }

    #[test]
    fn test_zero_ready_timeout_means_unbounded() {
        let config = TunnelConfig {
            ready_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.ready_timeout(), None);
        assert_eq!(
            TunnelConfig::default().ready_timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_passphrase_not_written_back() {
        let config = TunnelConfig {
            passphrase: Some("hunter2".to_string()),
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("hunter2"));
    }
}
