//! In-memory backend implementing every collaborator trait.
//!
//! All tables live behind one mutex. Each write runs against a clone of the
//! tables and is swapped in only on success, so a failing step leaves
//! nothing behind, the same as a rolled-back transaction.

use homeservice_core::{
    Directory, Entity, HouseholderId, HouseholderProfile, Offer, Page, ProviderId,
    ProviderProfile, ProviderSnapshot, RatingAggregate, RatingLedger, RatingLocation,
    RequestFilter, RequestId, RequestStatus, RequestStore, Result, Review, ServiceError,
    ServiceId, ServiceRequest, SortOrder,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registered provider account.
#[derive(Debug, Clone)]
struct ProviderAccount {
    name: String,
    contact: String,
    address: String,
}

/// A provider's listing of one service.
#[derive(Debug, Clone)]
struct Listing {
    price: Option<f64>,
    aggregate: RatingAggregate,
}

/// A service and the aggregate last written by a review of it.
#[derive(Debug, Clone)]
struct ServiceRecord {
    aggregate: RatingAggregate,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    householders: HashMap<HouseholderId, HouseholderProfile>,
    provider_accounts: HashMap<ProviderId, ProviderAccount>,
    provider_profiles: HashMap<ProviderId, ProviderProfile>,
    categories: HashMap<String, ServiceId>,
    services: HashMap<ServiceId, ServiceRecord>,
    listings: HashMap<(ProviderId, ServiceId), Listing>,
    requests: HashMap<RequestId, ServiceRequest>,
    reviews: Vec<Review>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    rating_location: Option<RatingLocation>,
    approval_offer_write: bool,
}

/// In-memory store, directory and rating ledger.
///
/// Cloning shares the underlying tables, so one instance can be handed to
/// the engine three times.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Mutex<Faults>>,
}

fn lock_failed<T>(_: PoisonError<T>) -> ServiceError {
    ServiceError::Storage("Mutex lock failed".to_string())
}

fn sort_by_schedule(requests: &mut [ServiceRequest], sort: SortOrder) {
    requests.sort_by(|a, b| {
        let order = a
            .scheduled_at
            .cmp(&b.scheduled_at)
            .then_with(|| a.id.cmp(&b.id));
        match sort {
            SortOrder::Ascending => order,
            SortOrder::Descending => order.reverse(),
        }
    });
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn seed(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> Result<T>) -> Result<T> {
        let tables = self.tables.lock().map_err(lock_failed)?;
        f(&tables)
    }

    /// Run `f` against a copy of the tables and keep the copy only if `f`
    /// succeeds.
    fn transact<T>(&self, f: impl FnOnce(&mut Tables, Faults) -> Result<T>) -> Result<T> {
        let faults = *self.faults.lock().map_err(lock_failed)?;
        let mut tables = self.tables.lock().map_err(lock_failed)?;
        let mut working = tables.clone();
        let value = f(&mut working, faults)?;
        *tables = working;
        Ok(value)
    }

    // ═══════════════════════════════════════════════════════════
    // Seeding
    // ═══════════════════════════════════════════════════════════

    /// Register a householder account.
    pub fn add_householder(
        &self,
        id: &HouseholderId,
        name: &str,
        address: Option<&str>,
        contact: &str,
    ) {
        self.seed().householders.insert(
            id.clone(),
            HouseholderProfile {
                name: name.to_string(),
                address: address.map(ToString::to_string),
                contact: contact.to_string(),
            },
        );
    }

    /// Register a provider account without a provider profile.
    pub fn add_provider_account(&self, id: &ProviderId, name: &str, contact: &str, address: &str) {
        self.seed().provider_accounts.insert(
            id.clone(),
            ProviderAccount {
                name: name.to_string(),
                contact: contact.to_string(),
                address: address.to_string(),
            },
        );
    }

    /// Insert or replace a provider profile.
    pub fn add_provider_profile(&self, profile: ProviderProfile) {
        self.seed()
            .provider_profiles
            .insert(profile.provider_id.clone(), profile);
    }

    /// Create a service and map `category` to it.
    pub fn add_category(&self, category: &str, service_id: &ServiceId) {
        let mut tables = self.seed();
        tables.services.entry(service_id.clone()).or_insert(ServiceRecord {
            aggregate: RatingAggregate::default(),
        });
        tables
            .categories
            .insert(category.to_string(), service_id.clone());
    }

    /// List a service under a provider with a price and starting aggregate.
    pub fn list_service(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
        price: Option<f64>,
        aggregate: RatingAggregate,
    ) {
        self.seed()
            .listings
            .insert((provider_id.clone(), service_id.clone()), Listing { price, aggregate });
    }

    // ═══════════════════════════════════════════════════════════
    // Fault injection
    // ═══════════════════════════════════════════════════════════

    /// Make the next reviews fail when writing `location`. `None` clears it.
    pub fn fail_rating_update_at(&self, location: Option<RatingLocation>) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rating_location = location;
    }

    /// Make approvals fail after the request row is written but before the
    /// offer flag is.
    pub fn fail_approval_offer_write(&self, fail: bool) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .approval_offer_write = fail;
    }

    // ═══════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════

    /// Stored copy of a request.
    #[must_use]
    pub fn stored_request(&self, id: &RequestId) -> Option<ServiceRequest> {
        self.seed().requests.get(id).cloned()
    }

    /// Stored provider profile.
    #[must_use]
    pub fn provider_profile(&self, id: &ProviderId) -> Option<ProviderProfile> {
        self.seed().provider_profiles.get(id).cloned()
    }

    /// Rating stored on the provider's listing of a service.
    #[must_use]
    pub fn listing_rating(&self, provider_id: &ProviderId, service_id: &ServiceId) -> Option<f64> {
        self.seed()
            .listings
            .get(&(provider_id.clone(), service_id.clone()))
            .map(|l| l.aggregate.avg_rating)
    }

    /// The service's rating aggregate.
    #[must_use]
    pub fn service_aggregate(&self, service_id: &ServiceId) -> Option<RatingAggregate> {
        self.seed().services.get(service_id).map(|s| s.aggregate)
    }

    /// Number of stored reviews.
    #[must_use]
    pub fn review_count(&self) -> usize {
        self.seed().reviews.len()
    }

    /// Whether a category mapping exists.
    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.seed().categories.contains_key(category)
    }
}

impl RequestStore for InMemoryStore {
    fn get(&self, id: &RequestId) -> impl Future<Output = Result<ServiceRequest>> + Send {
        let store = self.clone();
        let id = id.clone();

        async move {
            store.read(|tables| {
                tables
                    .requests
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| ServiceError::not_found(Entity::Request, &id))
            })
        }
    }

    fn save(&self, request: &ServiceRequest) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        let request = request.clone();

        async move {
            store.transact(|tables, _| {
                if tables.requests.contains_key(&request.id) {
                    return Err(ServiceError::Storage(format!(
                        "Request {} already exists",
                        request.id
                    )));
                }
                tables.requests.insert(request.id.clone(), request);
                Ok(())
            })
        }
    }

    fn update(
        &self,
        request: &ServiceRequest,
        expected_status: RequestStatus,
    ) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        let request = request.clone();

        async move {
            store.transact(|tables, _| {
                let stored = tables
                    .requests
                    .get_mut(&request.id)
                    .ok_or_else(|| ServiceError::not_found(Entity::Request, &request.id))?;
                if stored.status != expected_status {
                    return Err(ServiceError::ConcurrentModification);
                }
                stored.status = request.status;
                stored.approve_status = request.approve_status;
                stored.scheduled_at = request.scheduled_at;
                Ok(())
            })
        }
    }

    fn record_offer(
        &self,
        request: &ServiceRequest,
        offer: &Offer,
    ) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        let request_id = request.id.clone();
        let status = request.status;
        let offer = offer.clone();

        async move {
            store.transact(|tables, _| {
                let stored = tables
                    .requests
                    .get_mut(&request_id)
                    .ok_or_else(|| ServiceError::not_found(Entity::Request, &request_id))?;
                if stored.approve_status {
                    return Err(ServiceError::AlreadyApproved);
                }
                if stored.offer_from(&offer.provider_id).is_some() {
                    return Err(ServiceError::OfferAlreadySubmitted);
                }
                if !stored.status.is_open() {
                    return Err(ServiceError::ConcurrentModification);
                }
                stored.offers.push(offer);
                stored.status = status;
                Ok(())
            })
        }
    }

    fn commit_approval(
        &self,
        request_id: &RequestId,
        provider_id: &ProviderId,
    ) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        let request_id = request_id.clone();
        let provider_id = provider_id.clone();

        async move {
            store.transact(|tables, faults| {
                let stored = tables
                    .requests
                    .get_mut(&request_id)
                    .ok_or_else(|| ServiceError::not_found(Entity::Request, &request_id))?;
                if stored.approve_status {
                    return Err(ServiceError::AlreadyApproved);
                }
                stored.approve_status = true;
                stored.status = RequestStatus::Approved;

                if faults.approval_offer_write {
                    return Err(ServiceError::Storage(
                        "offer approval write failed".to_string(),
                    ));
                }
                if stored.offer_from(&provider_id).is_none() {
                    return Err(ServiceError::not_found(Entity::Offer, &provider_id));
                }
                for offer in &mut stored.offers {
                    offer.approved = offer.provider_id == provider_id;
                }
                Ok(())
            })
        }
    }

    fn list_by_householder(
        &self,
        householder_id: &HouseholderId,
        filter: &RequestFilter,
    ) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        let store = self.clone();
        let householder_id = householder_id.clone();
        let filter = *filter;

        async move {
            store.read(|tables| {
                let mut found: Vec<ServiceRequest> = tables
                    .requests
                    .values()
                    .filter(|r| r.is_owned_by(&householder_id))
                    .filter(|r| filter.matches(r.status, r.approve_status))
                    .cloned()
                    .collect();
                sort_by_schedule(&mut found, filter.sort);
                Ok(filter.page.slice(found))
            })
        }
    }

    fn list_by_provider(
        &self,
        provider_id: &ProviderId,
        filter: &RequestFilter,
    ) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        let store = self.clone();
        let provider_id = provider_id.clone();
        let filter = *filter;

        async move {
            store.read(|tables| {
                let mut found: Vec<ServiceRequest> = tables
                    .requests
                    .values()
                    .filter(|r| {
                        r.offer_from(&provider_id).is_some_and(|offer| {
                            filter.status.is_none_or(|s| s == r.status)
                                && (!filter.approved_only || offer.approved)
                        })
                    })
                    .cloned()
                    .collect();
                sort_by_schedule(&mut found, filter.sort);
                Ok(filter.page.slice(found))
            })
        }
    }

    fn list_open_for_provider(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        let store = self.clone();
        let provider_id = provider_id.clone();
        let service_id = service_id.cloned();

        async move {
            store.read(|tables| {
                let mut found: Vec<ServiceRequest> = tables
                    .requests
                    .values()
                    .filter(|r| r.status.is_open() && !r.approve_status)
                    .filter(|r| r.offer_from(&provider_id).is_none())
                    .filter(|r| service_id.as_ref().is_none_or(|s| s == &r.service_id))
                    .cloned()
                    .collect();
                sort_by_schedule(&mut found, SortOrder::Ascending);
                Ok(page.slice(found))
            })
        }
    }

    fn list_all(&self, page: Page) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        let store = self.clone();

        async move {
            store.read(|tables| {
                let mut all: Vec<ServiceRequest> = tables.requests.values().cloned().collect();
                all.sort_by(|a, b| {
                    b.requested_at
                        .cmp(&a.requested_at)
                        .then_with(|| b.id.cmp(&a.id))
                });
                Ok(page.slice(all))
            })
        }
    }
}

impl Directory for InMemoryStore {
    fn resolve_category(&self, category: &str) -> impl Future<Output = Result<Option<ServiceId>>> + Send {
        let store = self.clone();
        let category = category.to_string();

        async move { store.read(|tables| Ok(tables.categories.get(&category).cloned())) }
    }

    fn householder(
        &self,
        householder_id: &HouseholderId,
    ) -> impl Future<Output = Result<HouseholderProfile>> + Send {
        let store = self.clone();
        let householder_id = householder_id.clone();

        async move {
            store.read(|tables| {
                tables
                    .householders
                    .get(&householder_id)
                    .cloned()
                    .ok_or_else(|| ServiceError::not_found(Entity::Householder, &householder_id))
            })
        }
    }

    fn ensure_provider_profile(
        &self,
        provider_id: &ProviderId,
    ) -> impl Future<Output = Result<ProviderProfile>> + Send {
        let store = self.clone();
        let provider_id = provider_id.clone();

        async move {
            store.transact(|tables, _| {
                if !tables.provider_accounts.contains_key(&provider_id) {
                    return Err(ServiceError::ProviderNotRegistered);
                }
                let profile = tables
                    .provider_profiles
                    .entry(provider_id.clone())
                    .or_insert_with(|| ProviderProfile::provisioned(provider_id));
                Ok(profile.clone())
            })
        }
    }

    fn provider_snapshot(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
    ) -> impl Future<Output = Result<ProviderSnapshot>> + Send {
        let store = self.clone();
        let key = (provider_id.clone(), service_id.clone());

        async move {
            store.read(|tables| {
                let (provider_id, _) = &key;
                let account = tables
                    .provider_accounts
                    .get(provider_id)
                    .ok_or_else(|| ServiceError::not_found(Entity::Provider, provider_id))?;
                let listing = tables.listings.get(&key);
                let profile_rating = tables
                    .provider_profiles
                    .get(provider_id)
                    .map_or(0.0, |p| p.rating);

                Ok(ProviderSnapshot {
                    name: account.name.clone(),
                    contact: account.contact.clone(),
                    address: account.address.clone(),
                    rating: listing.map_or(profile_rating, |l| l.aggregate.avg_rating),
                    price_basis: listing.and_then(|l| l.price),
                })
            })
        }
    }

    fn remove_service(&self, service_id: &ServiceId) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        let service_id = service_id.clone();

        async move {
            store.transact(|tables, _| {
                tables
                    .services
                    .remove(&service_id)
                    .ok_or_else(|| ServiceError::not_found(Entity::Service, &service_id))?;
                tables.categories.retain(|_, mapped| mapped != &service_id);
                tables.listings.retain(|(_, listed), _| listed != &service_id);
                Ok(())
            })
        }
    }
}

impl RatingLedger for InMemoryStore {
    fn aggregate(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
    ) -> impl Future<Output = Result<RatingAggregate>> + Send {
        let store = self.clone();
        let key = (provider_id.clone(), service_id.clone());

        async move {
            store.read(|tables| {
                tables.listings.get(&key).map(|l| l.aggregate).ok_or_else(|| {
                    ServiceError::not_found(Entity::RatingAggregate, format!("{}/{}", key.0, key.1))
                })
            })
        }
    }

    fn record_review(&self, review: &Review) -> impl Future<Output = Result<RatingAggregate>> + Send {
        let store = self.clone();
        let review = review.clone();

        async move {
            store.transact(|tables, faults| {
                let duplicate = tables.reviews.iter().any(|r| {
                    r.provider_id == review.provider_id
                        && r.service_id == review.service_id
                        && r.householder_id == review.householder_id
                });
                if duplicate {
                    return Err(ServiceError::DuplicateReview);
                }
                if !tables.services.contains_key(&review.service_id) {
                    return Err(ServiceError::not_found(Entity::Service, &review.service_id));
                }

                tables.reviews.push(review.clone());

                let key = (review.provider_id.clone(), review.service_id.clone());
                let current = tables
                    .listings
                    .get(&key)
                    .map(|l| l.aggregate)
                    .unwrap_or_default();
                let updated = current.fold(review.rating);

                let fail = |location: RatingLocation| -> Result<()> {
                    if faults.rating_location == Some(location) {
                        Err(ServiceError::RatingUpdateFailed {
                            location,
                            reason: "injected write failure".to_string(),
                        })
                    } else {
                        Ok(())
                    }
                };

                fail(RatingLocation::ProviderProfile)?;
                let profile = tables
                    .provider_profiles
                    .get_mut(&review.provider_id)
                    .ok_or_else(|| ServiceError::RatingUpdateFailed {
                        location: RatingLocation::ProviderProfile,
                        reason: "no provider profile".to_string(),
                    })?;
                profile.rating = updated.avg_rating;

                fail(RatingLocation::ProviderListing)?;
                tables
                    .listings
                    .entry(key)
                    .and_modify(|l| l.aggregate = updated)
                    .or_insert(Listing {
                        price: None,
                        aggregate: updated,
                    });

                fail(RatingLocation::ServiceAggregate)?;
                let service = tables
                    .services
                    .get_mut(&review.service_id)
                    .ok_or_else(|| ServiceError::RatingUpdateFailed {
                        location: RatingLocation::ServiceAggregate,
                        reason: "service vanished".to_string(),
                    })?;
                service.aggregate = updated;

                Ok(updated)
            })
        }
    }

    fn reviews(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> impl Future<Output = Result<Vec<Review>>> + Send {
        let store = self.clone();
        let provider_id = provider_id.clone();
        let service_id = service_id.cloned();

        async move {
            store.read(|tables| {
                let mut found: Vec<Review> = tables
                    .reviews
                    .iter()
                    .filter(|r| r.provider_id == provider_id)
                    .filter(|r| service_id.as_ref().is_none_or(|s| s == &r.service_id))
                    .cloned()
                    .collect();
                found.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
                Ok(page.slice(found))
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use homeservice_core::ReviewId;

    fn review(householder: &str, rating: f64) -> Review {
        Review {
            id: ReviewId::new(format!("rev-{householder}")),
            provider_id: ProviderId::new("p-1"),
            service_id: ServiceId::new("s-1"),
            householder_id: HouseholderId::new(householder),
            rating,
            comments: String::new(),
            reviewed_at: chrono::Utc::now().fixed_offset(),
        }
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.add_category("Plumbing", &ServiceId::new("s-1"));
        store.add_provider_account(&ProviderId::new("p-1"), "Ravi", "ravi@example.com", "Jayanagar");
        store.add_provider_profile(ProviderProfile::provisioned(ProviderId::new("p-1")));
        store
    }

    #[tokio::test]
    async fn failed_location_rolls_back_review() {
        let store = seeded();
        store.fail_rating_update_at(Some(RatingLocation::ServiceAggregate));

        let result = store.record_review(&review("h-1", 5.0)).await;

        assert!(matches!(
            result,
            Err(ServiceError::RatingUpdateFailed {
                location: RatingLocation::ServiceAggregate,
                ..
            })
        ));
        assert_eq!(store.review_count(), 0);
        assert_eq!(store.listing_rating(&ProviderId::new("p-1"), &ServiceId::new("s-1")), None);
        let profile = store.provider_profile(&ProviderId::new("p-1")).unwrap();
        assert!(profile.rating.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn provisioning_requires_account() {
        let store = seeded();
        let result = store.ensure_provider_profile(&ProviderId::new("ghost")).await;
        assert_eq!(result, Err(ServiceError::ProviderNotRegistered));

        store.add_provider_account(&ProviderId::new("p-2"), "Meena", "meena@example.com", "HSR");
        let profile = store.ensure_provider_profile(&ProviderId::new("p-2")).await.unwrap();
        assert_eq!(profile, ProviderProfile::provisioned(ProviderId::new("p-2")));
        assert!(store.provider_profile(&ProviderId::new("p-2")).is_some());
    }

    #[tokio::test]
    async fn remove_service_drops_category_links() {
        let store = seeded();
        store.remove_service(&ServiceId::new("s-1")).await.unwrap();

        assert!(!store.has_category("Plumbing"));
        assert_eq!(store.service_aggregate(&ServiceId::new("s-1")), None);
        assert!(matches!(
            store.remove_service(&ServiceId::new("s-1")).await,
            Err(ServiceError::NotFound { entity: Entity::Service, .. })
        ));
    }
}
