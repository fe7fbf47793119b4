// # Record Store Trait
//
// Defines the capability surface of a DNS-hosting provider's zone/record API.
//
// ## Implementations
//
// - Cloudflare: `dyndns-provider-cloudflare` crate
// - In-memory: `dyndns_core::store::MemoryRecordStore` (tests, dry runs)
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::{RecordStore, RecordType};
//
// let zone_id = store.resolve_zone_id("example.com").await?;
// match store.find_record(&zone_id, "home.example.com").await {
//     Ok(record) => println!("{} -> {}", record.name, record.content),
//     Err(e) if e.is_not_found() => {
//         store.create_record(&zone_id, RecordType::A, "home.example.com", "203.0.113.5", 300).await?;
//     }
//     Err(e) => return Err(e),
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default TTL for created records, in seconds
pub const DEFAULT_TTL: u32 = 300;

/// DNS record type
///
/// Only address records are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS zone as known to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-assigned zone id
    pub id: String,
    /// Zone name (e.g. "example.com")
    pub name: String,
}

/// A DNS record owned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned record id (opaque)
    pub id: String,
    /// Record type as reported by the provider
    #[serde(rename = "type")]
    pub record_type: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (an IP literal for address records)
    pub content: String,
    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

/// Trait for DNS record store implementations
///
/// All operations are single-shot: no retries, no caching beyond the
/// request. Deadlines are applied by the caller.
///
/// # Errors
///
/// - [`crate::Error::NotFound`] when a zone or record does not exist. For
///   `find_record` this is the expected trigger for creation, not a failure.
/// - [`crate::Error::Ambiguous`] when a zone name matches more than once.
/// - [`crate::Error::Provider`] when the remote API reports a failure.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Resolve the id of the zone named exactly `zone_name`
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String, crate::Error>;

    /// Find the "A" record named exactly `record_name` within the zone
    ///
    /// Records of other types under the same name are ignored. When the
    /// provider holds several "A" records with that name, the first one is
    /// returned.
    async fn find_record(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<DnsRecord, crate::Error>;

    /// Create a record
    ///
    /// Always attempts creation; callers check for absence first.
    async fn create_record(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<DnsRecord, crate::Error>;

    /// Overwrite the name and content of an existing record
    ///
    /// Type and TTL are left unchanged.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        content: &str,
    ) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
