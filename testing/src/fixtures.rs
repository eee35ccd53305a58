//! Seeded marketplace fixture.

use crate::memory::InMemoryStore;
use crate::mocks::{FixedClock, SequentialIdGenerator, test_clock};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use homeservice_core::environment::Clock;
use homeservice_core::{
    HouseholderId, LifecycleConfig, LifecycleEngine, LifecycleEnvironment, NewReview,
    NewServiceRequest, ProviderId, ProviderProfile, RatingAggregate, Result, ServiceId,
    ServiceRequest,
};
use std::sync::Arc;

/// Engine wired to the in-memory backend.
pub type MemoryEngine = LifecycleEngine<InMemoryStore, InMemoryStore, InMemoryStore>;

/// Category seeded by [`Marketplace`].
pub const PLUMBING: &str = "Plumbing";

/// An engine over a seeded in-memory backend.
///
/// Seeds two householders, a "Plumbing" category mapped to service `S1`, and
/// three providers:
///
/// - `provider_a` (`P1`): an account with no profile, so its first offer
///   provisions one
/// - `provider_b` (`P2`): an account, a profile rated 4.2 and a listing of
///   `S1` at 450 with aggregate (4.0, 2)
/// - `unregistered`: no account at all
pub struct Marketplace {
    /// Shared backend, for seeding, inspection and fault injection
    pub store: InMemoryStore,
    /// Engine under test
    pub engine: MemoryEngine,
    /// The fixed clock's time
    pub now: DateTime<Utc>,
    /// Owner of the requests created by [`Marketplace::create_request`]
    pub householder: HouseholderId,
    /// A second householder
    pub neighbour: HouseholderId,
    /// Provider without a profile
    pub provider_a: ProviderId,
    /// Provider with a profile and a listing
    pub provider_b: ProviderId,
    /// Provider with no account
    pub unregistered: ProviderId,
    /// Service the plumbing category maps to
    pub plumbing: ServiceId,
}

impl Marketplace {
    /// Seed with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LifecycleConfig::default())
    }

    /// Seed with a custom configuration.
    #[must_use]
    pub fn with_config(config: LifecycleConfig) -> Self {
        let store = InMemoryStore::new();
        let clock = test_clock();
        let now = clock.now();

        let householder = HouseholderId::new("H");
        let neighbour = HouseholderId::new("H2");
        let provider_a = ProviderId::new("P1");
        let provider_b = ProviderId::new("P2");
        let unregistered = ProviderId::new("P404");
        let plumbing = ServiceId::new("S1");

        store.add_householder(&householder, "Asha Rao", Some("12 MG Road"), "asha@example.com");
        store.add_householder(&neighbour, "Vikram Iyer", None, "vikram@example.com");
        store.add_category(PLUMBING, &plumbing);

        store.add_provider_account(&provider_a, "Ravi Pipes", "ravi@example.com", "Jayanagar");
        store.add_provider_account(&provider_b, "Meena Fixit", "meena@example.com", "HSR Layout");
        store.add_provider_profile(ProviderProfile {
            rating: 4.2,
            ..ProviderProfile::provisioned(provider_b.clone())
        });
        store.list_service(
            &provider_b,
            &plumbing,
            Some(450.0),
            RatingAggregate::new(4.0, 2),
        );

        let env = LifecycleEnvironment::new(
            Arc::new(FixedClock::new(now)),
            Arc::new(SequentialIdGenerator::new("id")),
            config,
        );
        let engine = LifecycleEngine::new(store.clone(), store.clone(), store.clone(), env);

        Self {
            store,
            engine,
            now,
            householder,
            neighbour,
            provider_a,
            provider_b,
            unregistered,
            plumbing,
        }
    }

    /// `offset` from now, in the configured service timezone.
    #[must_use]
    pub fn after(&self, offset: Duration) -> DateTime<FixedOffset> {
        (self.now + offset).with_timezone(&self.engine.environment().config.timezone)
    }

    /// Create a plumbing request for [`Marketplace::householder`].
    ///
    /// # Errors
    ///
    /// Propagates any error from the engine.
    pub async fn create_request(&self, scheduled_at: DateTime<FixedOffset>) -> Result<ServiceRequest> {
        self.engine
            .create_request(
                &self.householder,
                NewServiceRequest {
                    category: PLUMBING.to_string(),
                    service_name: PLUMBING.to_string(),
                    description: "Kitchen sink is leaking".to_string(),
                    scheduled_at,
                },
            )
            .await
    }

    /// A review of `provider` for plumbing.
    #[must_use]
    pub fn review(&self, householder: &HouseholderId, provider: &ProviderId, rating: f64) -> NewReview {
        NewReview {
            provider_id: provider.clone(),
            service_id: self.plumbing.clone(),
            householder_id: householder.clone(),
            rating,
            comments: "Prompt and tidy".to_string(),
        }
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new()
    }
}
