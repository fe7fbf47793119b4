//! Record reconciliation
//!
//! Converges one DNS record onto the current WAN IP:
//!
//! ```text
//!            find_record
//!                 │
//!     ┌───────────┼────────────────┐
//!     │ NotFound  │ content != ip  │ content == ip
//!     ▼           ▼                ▼
//!  create      update            no-op
//!     │           │                │
//!     └───────────┴──── Current ───┘
//! ```
//!
//! A created record whose content already equals the IP is terminal; any
//! other error from the lookup short-circuits before a mutation is attempted.
//! Each call runs under its own deadline.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DyndnsConfig;
use crate::error::{Error, Result};
use crate::traits::{RecordStore, RecordType};

/// Result of reconciling one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record didn't exist and was created with the WAN IP
    Created {
        /// The created record id
        record_id: String,
    },
    /// Record existed with stale content and was updated
    Updated {
        /// Content before the update
        previous: String,
    },
    /// Record already held the WAN IP
    Unchanged,
}

/// Reconciles subdomain records against a record store
///
/// Holds no state between calls; every call is a single pass with no
/// internal retry.
pub struct ReconcileService {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
    ttl: u32,
}

impl ReconcileService {
    /// Create a new service
    ///
    /// # Parameters
    ///
    /// - `store`: Record store to read and mutate
    /// - `timeout`: Deadline applied to each `update_subdomain` call
    /// - `ttl`: TTL for records this service creates
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration, ttl: u32) -> Self {
        Self { store, timeout, ttl }
    }

    /// Create a service using the timeout and TTL from configuration
    pub fn from_config(store: Arc<dyn RecordStore>, config: &DyndnsConfig) -> Self {
        Self::new(store, config.timeout(), config.ttl)
    }

    /// The underlying record store
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Per-call deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Make `subdomain.zone_name` resolve to `wan_ip`
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileOutcome)`: What was done
    /// - `Err(Error::Timeout)`: The deadline expired; in-flight work is dropped
    /// - `Err(Error)`: Lookup (other than not-found), create or update failed
    pub async fn update_subdomain(
        &self,
        zone_id: &str,
        subdomain: &str,
        zone_name: &str,
        wan_ip: &str,
    ) -> Result<ReconcileOutcome> {
        let record_name = format!("{}.{}", subdomain, zone_name);

        tokio::time::timeout(self.timeout, self.reconcile(zone_id, &record_name, wan_ip))
            .await
            .map_err(|_| Error::timeout(format!("reconcile {}", record_name), self.timeout))?
    }

    async fn reconcile(
        &self,
        zone_id: &str,
        record_name: &str,
        wan_ip: &str,
    ) -> Result<ReconcileOutcome> {
        let (record, created) = match self.store.find_record(zone_id, record_name).await {
            Ok(record) => (record, false),
            Err(e) if e.is_not_found() => {
                let record = self
                    .store
                    .create_record(zone_id, RecordType::A, record_name, wan_ip, self.ttl)
                    .await?;
                info!(record = record_name, ip = wan_ip, "Created record");
                (record, true)
            }
            Err(e) => return Err(e),
        };

        if record.content == wan_ip {
            if created {
                return Ok(ReconcileOutcome::Created {
                    record_id: record.id,
                });
            }
            debug!(record = record_name, "Record is up to date");
            return Ok(ReconcileOutcome::Unchanged);
        }

        self.store
            .update_record(zone_id, &record.id, record_name, wan_ip)
            .await?;

        info!(
            record = record_name,
            ip = wan_ip,
            previous = %record.content,
            "Updated record"
        );

        Ok(ReconcileOutcome::Updated {
            previous: record.content,
        })
    }
}
