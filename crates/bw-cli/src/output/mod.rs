//! Output formatting utilities for the CLI
//!
//! Tables for tunnel details and colored status messages.

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use bw_protocol::SessionMetadata;

/// What `burrow serve` reports once the tunnel is up
#[derive(Debug, Serialize)]
pub struct TunnelSummary<'a> {
    /// Relay the tunnel runs through
    pub relay: &'a str,
    /// Everything the relay announced
    #[serde(flatten)]
    pub metadata: &'a SessionMetadata,
}

/// Format tunnel details as a two-column table
pub fn format_tunnel(summary: &TunnelSummary<'_>) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "FIELD")]
        field: &'static str,
        #[tabled(rename = "VALUE")]
        value: String,
    }

    let metadata = summary.metadata;
    let rows = vec![
        Row {
            field: "URL",
            value: or_dash(metadata.url().map(|u| u.to_string())),
        },
        Row {
            field: "HTTP URL",
            value: or_dash(metadata.insecure_url().map(|u| u.to_string())),
        },
        Row {
            field: "ACCOUNT",
            value: or_dash(Some(metadata.account().to_string())),
        },
        Row {
            field: "REGION",
            value: or_dash(Some(metadata.region().to_string())),
        },
        Row {
            field: "RELAY",
            value: summary.relay.to_string(),
        },
    ];

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format tunnel details as JSON
pub fn format_tunnel_json(summary: &TunnelSummary<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

fn or_dash(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

/// Print a success message in green with a checkmark prefix
///
/// Outputs to stdout with green coloring for positive feedback to the user.
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
