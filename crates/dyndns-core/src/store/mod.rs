//! Record store implementations
//!
//! - [`MemoryRecordStore`]: In-memory store (no network)

pub mod memory;

pub use memory::{FailOn, MemoryRecordStore};
