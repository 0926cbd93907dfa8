//! Session metadata announced by the relay

use serde::Serialize;
use url::Url;

use crate::status::StatusEvent;

/// What the relay told us about the session while it was being set up
///
/// Every field is written at most once; repeated announcements are
/// ignored so a published secure URL can never change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionMetadata {
    /// Account the credential authenticated as
    pub account: Option<String>,
    /// Region serving the tunnel
    pub region: Option<String>,
    /// Public HTTPS endpoint
    pub url: Option<Url>,
    /// Public plain-HTTP endpoint, when the relay offers one
    pub insecure_url: Option<Url>,
}

impl SessionMetadata {
    /// Record an event, returning whether any field changed
    pub fn apply(&mut self, event: StatusEvent) -> bool {
        match event {
            StatusEvent::Account(account) => set_once(&mut self.account, account, |a| !a.is_empty()),
            StatusEvent::Region(region) => set_once(&mut self.region, region, |r| !r.is_empty()),
            StatusEvent::Forwarding(url) => match url.scheme() {
                "https" => set_once(&mut self.url, url, |_| true),
                "http" => set_once(&mut self.insecure_url, url, |_| true),
                other => {
                    tracing::debug!("Ignoring forwarding URL with scheme {}", other);
                    false
                }
            },
            StatusEvent::Unrecognized => false,
        }
    }

    /// Whether the secure endpoint is known
    pub fn is_ready(&self) -> bool {
        self.url.is_some()
    }

    /// Account identifier, empty until announced
    pub fn account(&self) -> &str {
        self.account.as_deref().unwrap_or_default()
    }

    /// Region confirmation, empty until announced
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or_default()
    }

    /// Public HTTPS endpoint
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Public plain-HTTP endpoint
    pub fn insecure_url(&self) -> Option<&Url> {
        self.insecure_url.as_ref()
    }
}

fn set_once<T: std::fmt::Debug>(slot: &mut Option<T>, value: T, accept: impl Fn(&T) -> bool) -> bool {
    if slot.is_some() {
        tracing::debug!("Ignoring repeated announcement {:?}", value);
        return false;
    }
    if !accept(&value) {
        return false;
    }
    *slot = Some(value);
    true
}
