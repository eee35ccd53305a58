//! Environment for the request lifecycle.

use crate::config::LifecycleConfig;
use crate::environment::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

/// Dependencies injected into the lifecycle engine.
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Clock for timestamps and the cancellation window
    pub clock: Arc<dyn Clock>,
    /// Identifier source for requests, offers and reviews
    pub ids: Arc<dyn IdGenerator>,
    /// Business rules
    pub config: LifecycleConfig,
}

impl LifecycleEnvironment {
    /// Creates a new `LifecycleEnvironment`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, config: LifecycleConfig) -> Self {
        Self { clock, ids, config }
    }

    /// System clock and random UUIDs.
    #[must_use]
    pub fn production(config: LifecycleConfig) -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(UuidIdGenerator), config)
    }

    /// Current time in the service timezone.
    #[must_use]
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.config.timezone)
    }
}

impl std::fmt::Debug for LifecycleEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
