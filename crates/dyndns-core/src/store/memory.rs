// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Stands in for a provider API where no network is wanted: unit tests of the
// reconciliation service, contract tests of the run pipeline, and local
// experiments. Every mutating call is counted so tests can assert exactly
// which operations a reconciliation performed.
//
// ## Failure Injection
//
// Provider failures can be injected per record name (for lookups, creates
// and updates) or per zone name (for zone resolution). Injected failures are
// reported as `Error::Provider`, the same kind a real API failure maps to.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::record_store::{DnsRecord, RecordStore, RecordType, Zone};

/// Which operation an injected failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    /// `resolve_zone_id` for a zone name
    ResolveZone,
    /// `find_record` for a record name
    Find,
    /// `create_record` for a record name
    Create,
    /// `update_record` for a record name
    Update,
}

#[derive(Debug, Default)]
struct Inner {
    zones: Vec<Zone>,
    /// zone id -> records in insertion order
    records: HashMap<String, Vec<DnsRecord>>,
    /// (operation, name) -> (code, message)
    failures: HashMap<(FailOn, String), (i64, String)>,
    next_id: usize,
}

/// In-memory record store
///
/// Clones share the same state and counters.
///
/// # Example
///
/// ```rust
/// use dyndns_core::store::MemoryRecordStore;
/// use dyndns_core::traits::RecordStore;
///
/// # tokio_test::block_on(async {
/// let store = MemoryRecordStore::new();
/// let zone_id = store.add_zone("example.com").await;
/// store.add_record(&zone_id, "home.example.com", "203.0.113.1").await;
///
/// let record = store.find_record(&zone_id, "home.example.com").await.unwrap();
/// assert_eq!(record.content, "203.0.113.1");
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Inner>>,
    find_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone and return its id
    pub async fn add_zone(&self, name: &str) -> String {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = format!("zone-{}", inner.next_id);
        inner.zones.push(Zone {
            id: id.clone(),
            name: name.to_string(),
        });
        inner.records.entry(id.clone()).or_default();
        id
    }

    /// Seed an "A" record without counting it as a mutation
    pub async fn add_record(&self, zone_id: &str, name: &str, content: &str) -> String {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let record = DnsRecord {
            id: format!("rec-{}", inner.next_id),
            record_type: RecordType::A.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            ttl: crate::traits::DEFAULT_TTL,
        };
        let id = record.id.clone();
        inner.records.entry(zone_id.to_string()).or_default().push(record);
        id
    }

    /// Make `operation` on `name` fail with a provider error
    pub async fn fail(&self, operation: FailOn, name: &str, code: i64, message: &str) {
        self.inner
            .write()
            .await
            .failures
            .insert((operation, name.to_string()), (code, message.to_string()));
    }

    /// All records currently held in a zone
    pub async fn records(&self, zone_id: &str) -> Vec<DnsRecord> {
        self.inner
            .read()
            .await
            .records
            .get(zone_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `find_record` calls
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Number of `create_record` calls
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_record` calls
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Total number of mutating calls
    pub fn mutation_calls(&self) -> usize {
        self.create_calls() + self.update_calls()
    }

    fn injected(inner: &Inner, operation: FailOn, name: &str) -> Option<Error> {
        inner
            .failures
            .get(&(operation, name.to_string()))
            .map(|(code, message)| Error::provider(*code, message.clone()))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String, Error> {
        let inner = self.inner.read().await;
        if let Some(err) = Self::injected(&inner, FailOn::ResolveZone, zone_name) {
            return Err(err);
        }

        let matches: Vec<&Zone> = inner
            .zones
            .iter()
            .filter(|z| z.name.eq_ignore_ascii_case(zone_name))
            .collect();
        match matches.as_slice() {
            [] => Err(Error::not_found(format!("zone not found: {}", zone_name))),
            [zone] => Ok(zone.id.clone()),
            _ => Err(Error::ambiguous(format!(
                "{} zones named {}",
                matches.len(),
                zone_name
            ))),
        }
    }

    async fn find_record(&self, zone_id: &str, record_name: &str) -> Result<DnsRecord, Error> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read().await;
        if let Some(err) = Self::injected(&inner, FailOn::Find, record_name) {
            return Err(err);
        }

        inner
            .records
            .get(zone_id)
            .and_then(|records| records.iter().find(|r| r.name.eq_ignore_ascii_case(record_name)))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("record not found: {}", record_name)))
    }

    async fn create_record(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<DnsRecord, Error> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().await;
        if let Some(err) = Self::injected(&inner, FailOn::Create, name) {
            return Err(err);
        }

        inner.next_id += 1;
        let record = DnsRecord {
            id: format!("rec-{}", inner.next_id),
            record_type: record_type.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            ttl,
        };
        inner
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        content: &str,
    ) -> Result<(), Error> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().await;
        if let Some(err) = Self::injected(&inner, FailOn::Update, name) {
            return Err(err);
        }

        let record = inner
            .records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| Error::not_found(format!("record id not found: {}", record_id)))?;

        record.name = name.to_string();
        record.content = content.to_string();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zone_resolution() {
        let store = MemoryRecordStore::new();
        let id = store.add_zone("example.com").await;

        assert_eq!(store.resolve_zone_id("example.com").await.unwrap(), id);
        assert!(store.resolve_zone_id("example.org").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_zone_is_ambiguous() {
        let store = MemoryRecordStore::new();
        store.add_zone("example.com").await;
        store.add_zone("example.com").await;

        let err = store.resolve_zone_id("example.com").await.unwrap_err();
        assert!(matches!(err, Error::Ambiguous(_)));
    }

    #[tokio::test]
    async fn test_find_returns_first_match() {
        let store = MemoryRecordStore::new();
        let zone = store.add_zone("example.com").await;
        let first = store.add_record(&zone, "home.example.com", "203.0.113.1").await;
        store.add_record(&zone, "home.example.com", "203.0.113.2").await;

        let record = store.find_record(&zone, "home.example.com").await.unwrap();
        assert_eq!(record.id, first);
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_and_update_are_counted() {
        let store = MemoryRecordStore::new();
        let zone = store.add_zone("example.com").await;

        let created = store
            .create_record(&zone, RecordType::A, "home.example.com", "203.0.113.1", 120)
            .await
            .unwrap();
        assert_eq!(created.ttl, 120);
        assert_eq!(created.record_type, "A");

        store
            .update_record(&zone, &created.id, "home.example.com", "203.0.113.9")
            .await
            .unwrap();

        let records = store.records(&zone).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "203.0.113.9");
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.update_calls(), 1);
        assert_eq!(store.mutation_calls(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryRecordStore::new();
        let zone = store.add_zone("example.com").await;
        store.fail(FailOn::Find, "home.example.com", 500, "internal error").await;

        let err = store.find_record(&zone, "home.example.com").await.unwrap_err();
        assert!(matches!(err, Error::Provider { code: 500, .. }));
    }

    #[test]
    fn test_clones_share_counters() {
        let store = MemoryRecordStore::new();
        let clone = store.clone();

        tokio_test::block_on(async {
            let zone = clone.add_zone("example.com").await;
            let _ = clone.find_record(&zone, "home.example.com").await;
        });

        assert_eq!(store.find_calls(), 1);
    }
}
