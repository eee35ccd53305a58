//! Lifecycle configuration.
//!
//! Business rules that vary per deployment: cancellation lead time, the fixed
//! timezone request timestamps are recorded in, the accepted rating range and
//! listing page sizes. Values come from the application, or from the
//! environment via [`LifecycleConfig::from_env`].

use chrono::{Duration, FixedOffset, Offset, Utc};
use std::env;

/// Default offset of the service timezone (+05:30).
const DEFAULT_TZ_OFFSET_MINUTES: i32 = 330;

/// Configuration for the lifecycle engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Minimum time between a generic cancellation and the scheduled time.
    ///
    /// Default: 4 hours
    pub cancellation_lead_time: Duration,

    /// Timezone request and review timestamps are recorded in.
    ///
    /// Default: UTC+05:30
    pub timezone: FixedOffset,

    /// Lowest accepted review rating.
    ///
    /// Default: 1.0
    pub min_rating: f64,

    /// Highest accepted review rating.
    ///
    /// Default: 5.0
    pub max_rating: f64,

    /// Page size used when a listing does not ask for one.
    ///
    /// Default: 10
    pub default_page_size: u32,

    /// Upper bound on any listing page.
    ///
    /// Default: 100
    pub max_page_size: u32,
}

impl LifecycleConfig {
    /// Create configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancellation_lead_time: Duration::hours(4),
            timezone: offset_from_minutes(DEFAULT_TZ_OFFSET_MINUTES),
            min_rating: 1.0,
            max_rating: 5.0,
            default_page_size: 10,
            max_page_size: 100,
        }
    }

    /// Load configuration from `HOMESERVICE_*` environment variables.
    ///
    /// Absent or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::new();
        Self {
            cancellation_lead_time: lookup("HOMESERVICE_CANCELLATION_LEAD_MINUTES")
                .and_then(|s| s.parse().ok())
                .and_then(Duration::try_minutes)
                .unwrap_or(defaults.cancellation_lead_time),
            timezone: lookup("HOMESERVICE_TZ_OFFSET_MINUTES")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.timezone, offset_from_minutes),
            min_rating: lookup("HOMESERVICE_MIN_RATING")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_rating),
            max_rating: lookup("HOMESERVICE_MAX_RATING")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_rating),
            default_page_size: defaults.default_page_size,
            max_page_size: lookup("HOMESERVICE_MAX_PAGE_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_page_size),
        }
    }

    /// Set the cancellation lead time.
    #[must_use]
    pub const fn with_cancellation_lead_time(mut self, lead_time: Duration) -> Self {
        self.cancellation_lead_time = lead_time;
        self
    }

    /// Set the service timezone.
    #[must_use]
    pub const fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set the accepted rating range (inclusive).
    #[must_use]
    pub const fn with_rating_range(mut self, min: f64, max: f64) -> Self {
        self.min_rating = min;
        self.max_rating = max;
        self
    }

    /// Set the default and maximum page sizes.
    #[must_use]
    pub const fn with_page_sizes(mut self, default: u32, max: u32) -> Self {
        self.default_page_size = default;
        self.max_page_size = max;
        self
    }

    /// Whether `rating` is finite and inside the accepted range.
    #[must_use]
    pub fn accepts_rating(&self, rating: f64) -> bool {
        rating.is_finite() && rating >= self.min_rating && rating <= self.max_rating
    }

    /// Clamp a requested page size into `1..=max_page_size`.
    #[must_use]
    pub fn page_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Offset east of UTC; out-of-range values fall back to UTC.
fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}
