//! Status lines emitted by the relay

use url::Url;

use crate::error::ProtocolError;

/// Key announcing the account the session authenticated as
pub const KEY_ACCOUNT: &str = "Account";
/// Key confirming the relay region serving the session
pub const KEY_REGION: &str = "Region";
/// Key carrying a public URL that forwards to this session
pub const KEY_FORWARDING: &str = "Forwarding";

/// One line of relay output split into key and value
///
/// The key is everything before the first space; the value is the
/// untrimmed remainder, empty when the line has no space at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub key: String,
    pub value: String,
}

/// Meaning of a status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Account identifier
    Account(String),
    /// Region confirmation
    Region(String),
    /// A public URL forwarding to this session
    Forwarding(Url),
    /// A key this client does not act on
    Unrecognized,
}

impl StatusLine {
    /// Split a raw line on its first space
    pub fn parse(line: &str) -> Self {
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Interpret the line
    ///
    /// Only a `Forwarding` value that cannot be parsed as a URL is an
    /// error; unknown keys are reported as [`StatusEvent::Unrecognized`].
    pub fn interpret(&self) -> Result<StatusEvent, ProtocolError> {
        let value = self.value.trim();

        let event = match self.key.as_str() {
            KEY_ACCOUNT => StatusEvent::Account(value.to_string()),
            KEY_REGION => StatusEvent::Region(value.to_string()),
            KEY_FORWARDING => {
                let url = Url::parse(value).map_err(|source| ProtocolError::MalformedForwarding {
                    value: value.to_string(),
                    source,
                })?;
                StatusEvent::Forwarding(url)
            }
            _ => StatusEvent::Unrecognized,
        };

        Ok(event)
    }
}
