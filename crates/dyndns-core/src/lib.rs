// # dyndns-core
//
// Core library for the cf-dyndns record reconciler.
//
// ## Architecture Overview
//
// This library provides the core functionality for one dynamic DNS pass:
// - **WanIpResolver**: Trait for discovering the public IP address
// - **RecordStore**: Trait for reading and mutating records via a provider API
// - **ReconcileService**: Get-or-create-then-update for a single record
// - **DyndnsRunner**: One pass over every configured zone and subdomain
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Single Pass**: No scheduler inside; re-run the process to poll
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Reconciling an up-to-date record performs no mutation

pub mod traits;
pub mod reconcile;
pub mod runner;
pub mod config;
pub mod error;
pub mod store;

// Re-export core types for convenience
pub use traits::{DnsRecord, RecordStore, RecordType, WanIpResolver, Zone};
pub use reconcile::{ReconcileOutcome, ReconcileService};
pub use runner::{DyndnsRunner, RunSummary};
pub use config::{DomainConfig, DyndnsConfig, LogLevel, ResolverConfig};
pub use error::{Error, ProviderCause, Result};
pub use store::MemoryRecordStore;
