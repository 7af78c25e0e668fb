//! # Bindery
//!
//! Command-line host for the Bindery binding engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  apps/bindery (THE BINARY)                │
//! │                                                           │
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────────┐   │
//! │  │    CLI     │   │   Scenario   │   │ HTTP Transport │   │
//! │  │   (clap)   │   │    Runner    │   │   (reqwest)    │   │
//! │  └─────┬──────┘   └──────┬───────┘   └───────┬────────┘   │
//! │        │                 │                   │            │
//! │        └─────────────────┼───────────────────┘            │
//! │                          ▼                                │
//! │                  ┌───────────────┐                        │
//! │                  │ bindery-core  │                        │
//! │                  │  (THE LOGIC)  │                        │
//! │                  └───────────────┘                        │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! bindery parse "<#friends"
//! bindery validate "a@b.com, c@d.com" emails
//! bindery changes --previous "a, b" --next "b, c"
//! bindery --config bindery.toml run scenario.json
//! ```

use bindery::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = cli::Cli::parse();

    // BINDERY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("BINDERY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli::default_log_filter(cli.verbose).into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    match cli::execute(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
