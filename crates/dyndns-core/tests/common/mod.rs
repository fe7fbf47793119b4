//! Test doubles and common utilities for contract tests

#![allow(dead_code)]

use dyndns_core::error::{Error, Result};
use dyndns_core::traits::{DnsRecord, RecordStore, RecordType, WanIpResolver};
use dyndns_core::{DomainConfig, DyndnsRunner, MemoryRecordStore, ReconcileService};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A resolver that always returns the same IP
pub struct FixedResolver {
    ip: String,
    call_count: Arc<AtomicUsize>,
}

impl FixedResolver {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: ip.to_string(),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter shared with the resolver after it's boxed
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }
}

#[async_trait::async_trait]
impl WanIpResolver for FixedResolver {
    async fn resolve(&self) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.ip.clone())
    }

    fn describe(&self) -> String {
        "fixed".to_string()
    }
}

/// A resolver that always fails
pub struct FailingResolver;

#[async_trait::async_trait]
impl WanIpResolver for FailingResolver {
    async fn resolve(&self) -> Result<String> {
        Err(Error::no_answer("whoami.cloudflare"))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// A memory store whose lookups of one record name never complete
pub struct StallingStore {
    inner: MemoryRecordStore,
    stalled: String,
}

impl StallingStore {
    pub fn new(inner: &MemoryRecordStore, stalled: &str) -> Self {
        Self {
            inner: inner.clone(),
            stalled: stalled.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for StallingStore {
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        self.inner.resolve_zone_id(zone_name).await
    }

    async fn find_record(&self, zone_id: &str, record_name: &str) -> Result<DnsRecord> {
        if record_name == self.stalled {
            std::future::pending::<()>().await;
        }
        self.inner.find_record(zone_id, record_name).await
    }

    async fn create_record(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<DnsRecord> {
        self.inner
            .create_record(zone_id, record_type, name, content, ttl)
            .await
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        content: &str,
    ) -> Result<()> {
        self.inner.update_record(zone_id, record_id, name, content).await
    }

    fn store_name(&self) -> &'static str {
        "stalling"
    }
}

/// Build a runner over a memory store with a 5s timeout and TTL 300
pub fn runner(
    resolver: impl WanIpResolver + 'static,
    store: &MemoryRecordStore,
    domains: Vec<DomainConfig>,
) -> DyndnsRunner {
    let service = ReconcileService::new(Arc::new(store.clone()), Duration::from_secs(5), 300);
    DyndnsRunner::new(Box::new(resolver), service, domains)
}

pub fn load(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
