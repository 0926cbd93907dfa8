//! burrow: Command-line interface
//!
//! Provides the `burrow` CLI, which publishes a local greeting service
//! through an SSH relay and manages the configuration file.

pub mod commands;
pub mod output;
