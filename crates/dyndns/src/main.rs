// # dyndns - One-shot Dynamic DNS Updater
//
// This binary is a THIN integration layer:
// - Configuration parsing and validation live in dyndns-core
// - Reconciliation logic lives in dyndns-core
// - WAN IP discovery and the Cloudflare API live in their own crates
//
// Each invocation performs exactly one pass and exits. Run it from cron or a
// systemd timer to keep records current.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `CFDD_TOKEN`: Cloudflare API token (required)
// - `CFDD_LOG_LEVEL`: trace, debug, info, warn (default), error
// - `CFDD_TIMEOUT_SECONDS`: Deadline for each network call (default 5)
// - `CFDD_TTL`: TTL for newly created records (default 300)
// - `CFDD_ZONE_<n>` / `CFDD_SUBDOMAINS_<n>`: Zone and comma-separated
//   subdomains, numbered from 1
// - `CFDD_RESOLVER`: Resolver to ask for the WAN IP, as IPv4 address or host
//   name with optional port (default 1.1.1.1)
// - `CFDD_RESOLVER_TARGET`: CHAOS TXT name to query (default whoami.cloudflare)
//
// ## Example
//
// ```bash
// export CFDD_TOKEN=your_token
// export CFDD_ZONE_1=example.com
// export CFDD_SUBDOMAINS_1=home,vpn
//
// dyndns
// ```

use anyhow::{Context, Result};
use dyndns_core::{DyndnsConfig, DyndnsRunner, ReconcileService, RunSummary};
use dyndns_ip_chaos::ChaosTxtResolver;
use dyndns_provider_cloudflare::CloudflareStore;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};

/// Exit codes for the single pass
///
/// - 0: The pass completed (individual records may have failed)
/// - 1: Configuration error, or the WAN IP could not be determined
#[derive(Debug, Clone, Copy)]
enum DyndnsExitCode {
    Success = 0,
    Failure = 1,
}

impl From<DyndnsExitCode> for ExitCode {
    fn from(code: DyndnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match DyndnsConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DyndnsExitCode::Failure.into();
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(Level::from(config.log_level))
        .with_writer(std::io::stdout)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DyndnsExitCode::Failure.into();
    }

    info!(
        binary = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        domains = config.domains.len(),
        "Starting dyndns"
    );
    debug!(config = ?config, "Configuration loaded");
    for warning in &config.warnings {
        warn!("{}", warning);
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DyndnsExitCode::Failure.into();
        }
    };

    match rt.block_on(run(config)) {
        Ok(summary) => {
            if !summary.is_clean() {
                warn!(
                    failed_records = ?summary.failed_records,
                    skipped_zones = ?summary.skipped_zones,
                    "Some records were not reconciled"
                );
            }
            DyndnsExitCode::Success.into()
        }
        Err(e) => {
            error!("{:#}", e);
            DyndnsExitCode::Failure.into()
        }
    }
}

/// Wire the resolver and store into a runner and perform one pass
async fn run(config: DyndnsConfig) -> Result<RunSummary> {
    let resolver = ChaosTxtResolver::from_config(&config).context("invalid resolver settings")?;
    let store = CloudflareStore::from_config(&config).context("failed to set up Cloudflare client")?;

    let service = ReconcileService::from_config(Arc::new(store), &config);
    let runner = DyndnsRunner::from_config(Box::new(resolver), service, &config)?;

    let summary = runner.run_once().await.context("failed to get WAN IP")?;
    Ok(summary)
}
