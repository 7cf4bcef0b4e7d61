//! Cache Module
//!
//! Provides the in-memory cache engine with TTL expiry and memory-pressure eviction.

mod engine;
mod entry;
mod memory;


// Re-export public types
pub use engine::{CacheEngine, EngineConfig, SweepReport};
pub(crate) use engine::EngineCore;
pub use entry::CacheEntry;
pub use memory::{MemorySampler, ProcessMemorySampler};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value length in bytes
pub const MAX_VALUE_LENGTH: usize = 256;
