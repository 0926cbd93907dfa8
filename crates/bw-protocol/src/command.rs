//! Tunnel request command line
//!
//! The relay provisions a public endpoint when the client executes a
//! command of the form `http[ -subdomain=S][ -hostname=H][ -auth=A]` on a
//! session channel. Flags always appear in that order and are omitted
//! entirely when their value is empty, leaving the relay default in place.

use std::fmt;

/// Base token of every tunnel request
pub const TUNNEL_PROTOCOL: &str = "http";

/// A tunnel request as understood by the relay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelCommand {
    /// Requested public subdomain
    pub subdomain: Option<String>,
    /// Requested custom hostname (needs a DNS CNAME managed elsewhere)
    pub hostname: Option<String>,
    /// Basic-auth credential enforced at the relay edge, `user:password`
    pub auth: Option<String>,
}

impl TunnelCommand {
    /// Create a request with all relay defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a specific subdomain
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Request a custom hostname
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Enforce basic auth on the public endpoint
    pub fn auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    /// Render the command line sent to the relay
    pub fn to_command_line(&self) -> String {
        let mut args = vec![TUNNEL_PROTOCOL.to_string()];

        let flags = [
            ("subdomain", &self.subdomain),
            ("hostname", &self.hostname),
            ("auth", &self.auth),
        ];
        for (name, value) in flags {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                args.push(format!("-{}={}", name, value));
            }
        }

        args.join(" ")
    }
}

impl fmt::Display for TunnelCommand {
    /// Displays the command with the auth secret redacted, for logging
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = TunnelCommand {
            auth: self
                .auth
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|_| "<redacted>".to_string()),
            ..self.clone()
        };
        f.write_str(&redacted.to_command_line())
    }
}
