//! CLI command implementations

mod config;
mod serve;

pub use config::{config_init, config_path, config_show};
pub use serve::{greeting_router, serve_command, ServeOptions};
