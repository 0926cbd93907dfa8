//! burrow CLI
//!
//! Publishes a local service at a public URL by tunnelling through an
//! SSH relay:
//! - `serve` opens the tunnel and answers requests until interrupted
//! - `config` manages the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burrow::commands::{self, ServeOptions};

#[derive(Parser)]
#[command(name = "burrow")]
#[command(author, version, about = "Expose a local service through an SSH relay")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "BURROW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a tunnel and serve a greeting at its public URL
    Serve {
        /// Public subdomain to request
        #[arg(short, long)]
        subdomain: Option<String>,
        /// Basic auth enforced by the relay, as user:password
        #[arg(short, long)]
        auth: Option<String>,
        /// Custom hostname (needs a DNS CNAME to the relay)
        #[arg(long)]
        hostname: Option<String>,
        /// Private key for SSH authentication (default: ~/.ssh/id_rsa)
        #[arg(short, long)]
        identity: Option<PathBuf>,
        /// Relay region (default: us)
        #[arg(short, long)]
        region: Option<String>,
        /// Extra connection attempts when the relay is unreachable
        #[arg(long)]
        retries: Option<u32>,
        /// Seconds to wait for the public URL (0 waits forever)
        #[arg(long)]
        ready_timeout: Option<u64>,
        /// Print tunnel details as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Serve {
            subdomain,
            auth,
            hostname,
            identity,
            region,
            retries,
            ready_timeout,
            json,
        } => {
            let options = ServeOptions {
                subdomain,
                auth,
                hostname,
                identity,
                region,
                retries,
                ready_timeout,
                json,
            };
            commands::serve_command(cli.config.as_ref(), options).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::config_show(cli.config.as_ref())?;
            }
            ConfigAction::Init { force } => {
                commands::config_init(cli.config.as_ref(), force)?;
            }
            ConfigAction::Path => {
                println!("{}", commands::config_path(cli.config.as_ref()).display());
            }
        },
    }

    Ok(())
}
