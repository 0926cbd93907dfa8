//! Core trait definitions

mod resource;

pub use resource::{Acceptor, CommandChannel, Transport};
