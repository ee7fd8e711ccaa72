//! Foundational low-level utilities shared across the bridge crates.
//!
//! Provides wall-clock helpers used when reading CI timestamps and the
//! read-through `TtlCache` that backs the process-wide job list.

pub mod time_utils;
pub mod ttl_cache;

pub use time_utils::{current_unix_timestamp_ms, elapsed_since_unix_ms};
pub use ttl_cache::{FreshnessPolicy, MaxAge, TtlCache};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_wall_clock_is_past_a_known_instant() {
        // 2023-11-14T22:13:20Z
        let known_ms = 1_700_000_000_000;
        let now_ms = current_unix_timestamp_ms();
        assert!(now_ms > known_ms);
        assert!(elapsed_since_unix_ms(known_ms, now_ms) > std::time::Duration::ZERO);
    }
}
