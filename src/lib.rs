//! kv_cache - An in-memory key-value cache server
//!
//! Stores short string pairs with optional TTL expiry and approximate
//! memory-pressure eviction, served over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
mod tasks;

pub use api::AppState;
pub use cache::{CacheEngine, EngineConfig};
pub use config::Config;
