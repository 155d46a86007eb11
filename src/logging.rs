//! Logging setup for the command line binary. Output goes to stderr so it
//! never mixes with rendered boards on stdout.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Filter directive in effect: `RUST_LOG`, then `--verbose`, then the config level.
pub fn filter_directive(config: &Config, verbose: bool, rust_log: Option<String>) -> String {
    rust_log
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| {
            if verbose {
                "debug".to_string()
            } else {
                config.logging.level.clone()
            }
        })
}

pub fn init_logging(config: &Config, verbose: bool) {
    let directive = filter_directive(config, verbose, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
