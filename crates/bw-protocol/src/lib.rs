//! bw-protocol: Relay control-channel convention for burrow
//!
//! The relay is driven by a single command line issued on an SSH session
//! channel and answers with `Key value` status lines on that channel's
//! standard output. This crate models both directions without doing any
//! I/O itself.

pub mod codec;
pub mod command;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod status;

pub use codec::{StatusCodec, MAX_STATUS_LINE_LENGTH};
pub use command::{TunnelCommand, TUNNEL_PROTOCOL};
pub use error::ProtocolError;
pub use metadata::SessionMetadata;
pub use parser::{ParserState, StatusParser};
pub use status::{StatusEvent, StatusLine};
