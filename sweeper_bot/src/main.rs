//! Pushgateway Sweeper

mod config;

use anyhow::{Context, Result}; // alias std::result::Result with dynamic error type
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use sweeper_prometheus::gateway::Gateway;
use sweeper_prometheus::sweep::sweep;

use crate::config::Config;

/// The program's main entry point.
fn main() {
    let config = Config::load();
    init_logging(config.as_ref().map(|config| config.debug).unwrap_or(false));

    // Run a single sweep, then exit
    let result = config.and_then(|config| async_std::task::block_on(run(config)));
    if let Err(err) = result {
        report_fatal(&err);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let gateway = Gateway::new(&config.url, config.credentials.clone())
        .context("configuring pushgateway client")?;
    tracing::info!(
        url = gateway.base_url(),
        retention_minutes = config.retention.num_minutes(),
        "sweeping stale groups"
    );

    let mut stdout = std::io::stdout();
    let stats = sweep(&gateway, config.retention, Utc::now(), &mut stdout)
        .await
        .context("sweep aborted")?;
    stats.publish();

    Ok(())
}

/// `RUST_LOG` takes precedence over `--debug`
fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn report_fatal(err: &anyhow::Error) {
    tracing::error!("{}", err);
    for cause in err.chain().skip(1) {
        tracing::error!("caused by: {}", cause);
    }
}
