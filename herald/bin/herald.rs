//! Command-line surface for sending one status notification.
//!
//! Thin glue only: argument parsing, configuration loading, logging
//! setup, and exit-code mapping. Everything of substance lives in the
//! library crates.

use std::path::PathBuf;

use clap::Parser;
use herald::config::Config;
use herald::notify::{Notifier, NotifyOutcome, StatusNotification};

/// Send a procurement request status notification by email.
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(about = "Send a procurement request status notification", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "herald.toml")]
    config: PathBuf,

    /// Recipient mailbox
    recipient: String,

    /// Procurement request identifier
    request_id: String,

    /// The status the request changed to
    new_status: String,

    /// Path to the pre-rendered HTML body; a minimal body is generated
    /// when omitted
    #[arg(long)]
    body_html: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    let notifier = Notifier::from_config(&config)?;

    let body_html = match &cli.body_html {
        Some(path) => std::fs::read_to_string(path)?,
        None => format!(
            "<p>Procurement request <strong>#{}</strong> is now <strong>{}</strong>.</p>",
            cli.request_id, cli.new_status
        ),
    };

    let notification = StatusNotification {
        recipient: cli.recipient,
        request_id: cli.request_id,
        new_status: cli.new_status,
        body_html,
    };

    match notifier.send(&notification).await? {
        NotifyOutcome::Delivered { profile, attempts } => {
            tracing::info!(profile, attempts, "notification delivered");
            Ok(())
        }
        NotifyOutcome::ConfigurationError { detail } => {
            anyhow::bail!("provider rejected the configured credentials: {detail}")
        }
        NotifyOutcome::NetworkUnavailable => {
            anyhow::bail!("no configured mail server is reachable")
        }
        NotifyOutcome::Failed { kind, detail } => {
            anyhow::bail!("delivery failed ({kind}): {detail}")
        }
    }
}
