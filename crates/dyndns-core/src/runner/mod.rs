//! Single-pass update pipeline
//!
//! The runner is responsible for:
//! - Discovering the WAN IP once via a [`WanIpResolver`]
//! - Resolving each configured zone's id
//! - Reconciling every subdomain of every zone via [`ReconcileService`]
//!
//! ## Failure Policy
//!
//! - WAN IP discovery failure is fatal: nothing can be reconciled
//! - Zone resolution failure skips that domain
//! - A subdomain failure is logged and the next subdomain is processed
//!
//! There is no loop here. Periodic updates come from an external scheduler
//! re-running the process.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::{DomainConfig, DyndnsConfig};
use crate::error::{Error, Result};
use crate::reconcile::{ReconcileOutcome, ReconcileService};
use crate::traits::WanIpResolver;

/// What one pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// WAN IP the records were reconciled against
    pub wan_ip: String,
    /// Records created
    pub created: usize,
    /// Records updated
    pub updated: usize,
    /// Records already current
    pub unchanged: usize,
    /// Names of records that failed to reconcile
    pub failed_records: Vec<String>,
    /// Zones that could not be resolved
    pub skipped_zones: Vec<String>,
}

impl RunSummary {
    fn new(wan_ip: String, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            wan_ip,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed_records: Vec::new(),
            skipped_zones: Vec::new(),
        }
    }

    /// True if every configured record was reconciled
    pub fn is_clean(&self) -> bool {
        self.failed_records.is_empty() && self.skipped_zones.is_empty()
    }

    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created { .. } => self.created += 1,
            ReconcileOutcome::Updated { .. } => self.updated += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Orchestrates one discovery + reconciliation pass
///
/// ## Lifecycle
///
/// 1. Create with [`DyndnsRunner::new()`]
/// 2. Call [`DyndnsRunner::run_once()`]
/// 3. Drop
///
/// Domains and subdomains are processed sequentially, in configuration order.
pub struct DyndnsRunner {
    resolver: Box<dyn WanIpResolver>,
    service: ReconcileService,
    domains: Vec<DomainConfig>,
}

impl DyndnsRunner {
    /// Create a new runner
    pub fn new(
        resolver: Box<dyn WanIpResolver>,
        service: ReconcileService,
        domains: Vec<DomainConfig>,
    ) -> Self {
        Self {
            resolver,
            service,
            domains,
        }
    }

    /// Create a runner for a validated configuration
    pub fn from_config(
        resolver: Box<dyn WanIpResolver>,
        service: ReconcileService,
        config: &DyndnsConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(resolver, service, config.domains.clone()))
    }

    /// Run one pass over all configured domains
    ///
    /// # Returns
    ///
    /// - `Ok(RunSummary)`: The pass completed; individual records may still
    ///   have failed (see `failed_records`)
    /// - `Err(Error)`: The WAN IP could not be discovered
    pub async fn run_once(&self) -> Result<RunSummary> {
        let started_at = Utc::now();

        let wan_ip = self.resolver.resolve().await.map_err(|e| {
            error!(lookup = %self.resolver.describe(), error = %e, "Failed to get WAN IP");
            e
        })?;
        info!(wan_ip = %wan_ip, "WAN IP resolved");

        let mut summary = RunSummary::new(wan_ip.clone(), started_at);

        for domain in &self.domains {
            let zone_id = match self.resolve_zone(&domain.zone).await {
                Ok(id) => id,
                Err(e) => {
                    error!(zone = %domain.zone, error = %e, "Failed to resolve zone, skipping");
                    summary.skipped_zones.push(domain.zone.clone());
                    continue;
                }
            };

            for subdomain in &domain.subdomains {
                match self
                    .service
                    .update_subdomain(&zone_id, subdomain, &domain.zone, &wan_ip)
                    .await
                {
                    Ok(outcome) => summary.record(&outcome),
                    Err(e) => {
                        let record_name = domain.record_name(subdomain);
                        error!(record = %record_name, error = %e, "Failed to update record");
                        summary.failed_records.push(record_name);
                    }
                }
            }
        }

        if summary.is_clean() {
            info!(
                created = summary.created,
                updated = summary.updated,
                unchanged = summary.unchanged,
                "Run complete"
            );
        } else {
            warn!(
                created = summary.created,
                updated = summary.updated,
                unchanged = summary.unchanged,
                failed = summary.failed_records.len(),
                skipped_zones = summary.skipped_zones.len(),
                "Run complete with errors"
            );
        }

        Ok(summary)
    }

    async fn resolve_zone(&self, zone_name: &str) -> Result<String> {
        let timeout = self.service.timeout();
        tokio::time::timeout(timeout, self.service.store().resolve_zone_id(zone_name))
            .await
            .map_err(|_| Error::timeout(format!("resolve zone {}", zone_name), timeout))?
    }
}
