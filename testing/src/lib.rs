//! # Homeservice Testing
//!
//! Test doubles and helpers for the homeservice lifecycle engine.
//!
//! This crate provides:
//! - `FixedClock` and `SequentialIdGenerator` for deterministic environments
//! - `InMemoryStore`, a transactional in-memory backend implementing every
//!   collaborator trait, with fault injection
//! - `Marketplace`, a seeded fixture with a householder, providers and a
//!   service category
//! - proptest strategies for ratings and quotes
//!
//! ## Example
//!
//! ```ignore
//! use homeservice_testing::Marketplace;
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let market = Marketplace::new();
//!     let request = market.create_request(market.after(Duration::days(2))).await?;
//!
//!     market.engine.accept_request(&request.id, &market.provider_a, "500").await?;
//! }
//! ```

use chrono::{DateTime, Utc};
use homeservice_core::environment::{Clock, IdGenerator};

pub mod fixtures;
pub mod memory;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use homeservice_testing::mocks::FixedClock;
    /// use homeservice_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// Predictable identifiers: `{prefix}-1`, `{prefix}-2`, ...
    ///
    /// # Example
    ///
    /// ```
    /// use homeservice_testing::mocks::SequentialIdGenerator;
    /// use homeservice_core::environment::IdGenerator;
    ///
    /// let ids = SequentialIdGenerator::new("id");
    /// assert_eq!(ids.next_id(), "id-1");
    /// assert_eq!(ids.next_id(), "id-2");
    /// ```
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Start counting from 1 with the given prefix.
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::Relaxed);
            format!("{}-{n}", self.prefix)
        }
    }
}

/// Property-based testing strategies.
pub mod properties {
    use proptest::prelude::*;

    /// Ratings inside the default accepted range, on half-star steps.
    pub fn rating() -> impl Strategy<Value = f64> {
        (2u8..=10).prop_map(|halves| f64::from(halves) / 2.0)
    }

    /// Non-empty quoted prices.
    pub fn quote() -> impl Strategy<Value = String> {
        (1u32..100_000).prop_map(|amount| amount.to_string())
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs. Honours
/// `RUST_LOG`, defaulting to debug output from the core crate.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("homeservice_core=debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::Marketplace;
pub use memory::InMemoryStore;
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock};
