//! Core traits for the dyndns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`WanIpResolver`]: Discover the public IP address
//! - [`RecordStore`]: Read and mutate DNS records via a provider API

pub mod ip_resolver;
pub mod record_store;

pub use ip_resolver::WanIpResolver;
pub use record_store::{DEFAULT_TTL, DnsRecord, RecordStore, RecordType, Zone};
