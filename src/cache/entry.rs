//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their age checks.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored value together with the time it was last written.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Time of the most recent `put` for this key
    pub stored_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: String) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    // == Age ==
    /// Time elapsed between `stored_at` and `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    // == Is Expired ==
    /// Checks whether the entry has outlived `max_age` as of `now`.
    ///
    /// The comparison is strict: an entry exactly `max_age` old is still live.
    /// A zero `max_age` means TTL is disabled and nothing ever expires.
    pub fn is_expired(&self, max_age: Duration, now: Instant) -> bool {
        !max_age.is_zero() && self.age(now) > max_age
    }
}
