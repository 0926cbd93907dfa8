//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_info, print_success, print_warning};
use bw_core::config::{self, ConfigFile};

/// Resolve the config file path from the `--config` flag
pub fn config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Load the config file
///
/// An explicit `--config` must exist. Without one, a missing default file
/// means built-in defaults.
pub fn load(config_path: Option<&PathBuf>) -> Result<ConfigFile> {
    let path = match config_path {
        Some(path) => path.clone(),
        None => {
            let default_path = config::default_config_path();
            if !default_path.exists() {
                tracing::debug!("No config at {:?}, using defaults", default_path);
                return Ok(ConfigFile::default());
            }
            default_path
        }
    };

    let file: ConfigFile = config::load_config(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    file.retry
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;
    Ok(file)
}

/// Show current configuration
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = self::config_path(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'burrow config init' to create one");
        println!();
        println!("{}", toml::to_string_pretty(&ConfigFile::default())?);
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    // Validate before echoing so a broken file is reported as such
    let parsed = toml::from_str::<ConfigFile>(&content)
        .with_context(|| format!("Invalid config file: {:?}", path))?;
    parsed
        .retry
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    println!("{}", content);
    Ok(())
}

/// Initialize default configuration
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let config_file = self::config_path(config_path);
    let config_dir = config_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_dir);

    if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
        print_success(&format!("Created config directory: {:?}", config_dir));
    }

    if config_file.exists() && !force {
        print_info("Use --force to overwrite");
        anyhow::bail!("Config file already exists: {:?}", config_file);
    }

    std::fs::write(&config_file, default_config_template())
        .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

    print_success(&format!("Created configuration file: {:?}", config_file));
    Ok(())
}

/// Default configuration content
fn default_config_template() -> &'static str {
    r#"# burrow configuration

[tunnel]
# Public subdomain to request
# subdomain = "myapp"

# Basic auth enforced by the relay, as "user:password"
# auth = "user:password"

# Custom hostname (needs a DNS CNAME pointing at the relay)
# hostname = "app.example.com"

# Private key for SSH authentication (default: ~/.ssh/id_rsa)
# identity = "/home/me/.ssh/id_ed25519"

# Relay region (default: us)
# region = "eu"

# Relay endpoint is tunnel.<region>.<relay_domain>:<relay_port>
relay_domain = "ngrok.com"
relay_port = 22
# Connect to this host instead of tunnel.<region>.<relay_domain>
# relay_host = "relay.internal.example"

# Remote forward requested from the relay
remote_bind_host = "127.0.0.1"
remote_bind_port = 443

# Seconds allowed for connecting and starting the tunnel command
connect_timeout = 30

# Seconds to wait for the public URL (0 waits forever)
ready_timeout = 30

[retry]
# Connection attempts before giving up (including the first)
max_attempts = 1
# Initial retry delay in seconds
initial = 1
# Maximum retry delay in seconds
max = 60
# Backoff multiplier
multiplier = 2.0
# Jitter factor
jitter = 0.25
"#
}
