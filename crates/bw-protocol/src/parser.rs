//! Status stream state machine
//!
//! Tracks which announcements the relay has made and reports readiness
//! exactly once: on the line that first publishes the secure URL.

use crate::error::ProtocolError;
use crate::metadata::SessionMetadata;
use crate::status::{StatusEvent, StatusLine};

/// Progress through the relay's startup announcements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Nothing useful seen yet
    AwaitingAccountOrRegion,
    /// Account or region known, public endpoint still missing
    AwaitingForwarding,
    /// Secure URL published on the most recent line
    Ready,
    /// Readiness already reported; further lines are discarded
    Draining,
}

/// Consumes status lines and builds the session metadata
#[derive(Debug)]
pub struct StatusParser {
    state: ParserState,
    metadata: SessionMetadata,
}

impl StatusParser {
    /// Create a parser awaiting the first announcement
    pub fn new() -> Self {
        Self {
            state: ParserState::AwaitingAccountOrRegion,
            metadata: SessionMetadata::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Metadata collected so far
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Process one line
    ///
    /// Returns `Ok(true)` on the single line that makes the session ready.
    /// A malformed `Forwarding` value is an error until then; once
    /// draining, it is logged and skipped.
    pub fn feed(&mut self, line: &StatusLine) -> Result<bool, ProtocolError> {
        if matches!(self.state, ParserState::Ready | ParserState::Draining) {
            self.state = ParserState::Draining;
            match line.interpret() {
                Ok(StatusEvent::Unrecognized) => {
                    tracing::trace!("Relay status: {} {}", line.key, line.value.trim());
                }
                Ok(event) => tracing::debug!("Ignoring status after readiness: {:?}", event),
                Err(e) => tracing::warn!("Ignoring malformed status after readiness: {}", e),
            }
            return Ok(false);
        }

        let event = line.interpret()?;
        if event == StatusEvent::Unrecognized {
            tracing::trace!("Relay status: {} {}", line.key, line.value.trim());
        }
        self.metadata.apply(event);

        if self.metadata.is_ready() {
            self.state = ParserState::Ready;
            return Ok(true);
        }

        if self.metadata.account.is_some() || self.metadata.region.is_some() {
            self.state = ParserState::AwaitingForwarding;
        }

        Ok(false)
    }
}

impl Default for StatusParser {
    fn default() -> Self {
        Self::new()
    }
}
