//! Offer Manager.
//!
//! Owns the one-to-many relationship between a request and its competing
//! offers. Two invariants hold for every request:
//!
//! - at most one offer per (request, provider)
//! - at most one offer with the approval flag set
//!
//! The in-memory request is updated first, then persisted with a single
//! atomic store call. If the store rejects the write the caller discards the
//! in-memory copy.

use crate::error::Result;
use crate::lifecycle::{LifecycleEnvironment, RequestEvent, RequestLifecycleReducer};
use crate::providers::{Directory, RequestStore};
use crate::types::{Offer, OfferId, ProviderId, Quote, ServiceRequest};
use tracing::{debug, info};

/// Records and approves offers against a request.
#[derive(Debug)]
pub struct OfferManager<'a, R, D> {
    store: &'a R,
    directory: &'a D,
}

impl<'a, R: RequestStore, D: Directory> OfferManager<'a, R, D> {
    /// Borrow the store and directory for one operation.
    #[must_use]
    pub const fn new(store: &'a R, directory: &'a D) -> Self {
        Self { store, directory }
    }

    /// Snapshot the provider, append the offer and persist it.
    ///
    /// The caller has already run the accept guards. A provider account
    /// without a profile gets one provisioned with rating 0 and availability
    /// on.
    ///
    /// # Errors
    ///
    /// - `ServiceError::ProviderNotRegistered` if the provider has no account
    /// - `ServiceError::OfferAlreadySubmitted` or
    ///   `ServiceError::AlreadyApproved` if a concurrent write won
    /// - `ServiceError::Storage` on collaborator failure
    pub async fn record_offer(
        &self,
        request: &mut ServiceRequest,
        provider_id: &ProviderId,
        price: Quote,
        env: &LifecycleEnvironment,
    ) -> Result<OfferId> {
        let profile = self.directory.ensure_provider_profile(provider_id).await?;
        debug!(
            provider_id = %profile.provider_id,
            rating = profile.rating,
            "Provider profile ready"
        );

        let snapshot = self
            .directory
            .provider_snapshot(provider_id, &request.service_id)
            .await?;

        let offer = Offer {
            id: OfferId::new(env.ids.next_id()),
            provider_id: provider_id.clone(),
            provider_name: snapshot.name,
            provider_contact: snapshot.contact,
            provider_address: snapshot.address,
            price: price.clone(),
            provider_rating: snapshot.rating,
            approved: false,
            offered_at: env.clock.now(),
        };

        request.offers.push(offer.clone());
        RequestLifecycleReducer::apply(
            request,
            &RequestEvent::Accepted {
                provider_id: provider_id.clone(),
                price,
            },
        );
        self.store.record_offer(request, &offer).await?;

        metrics::counter!("service_request.offer_recorded").increment(1);
        info!(
            request_id = %request.id,
            provider_id = %offer.provider_id,
            offer_id = %offer.id,
            price = %offer.price,
            "Offer recorded"
        );

        Ok(offer.id)
    }

    /// Flip exactly one offer's approval flag and commit the request and the
    /// offer together.
    ///
    /// # Errors
    ///
    /// - `ServiceError::AlreadyApproved` if a concurrent approval won
    /// - `ServiceError::NotFound` if the offer vanished
    /// - `ServiceError::Storage` on collaborator failure; nothing is written
    pub async fn approve_offer(
        &self,
        request: &mut ServiceRequest,
        provider_id: &ProviderId,
    ) -> Result<()> {
        RequestLifecycleReducer::apply(
            request,
            &RequestEvent::Approved {
                provider_id: provider_id.clone(),
            },
        );
        debug_assert!(request.approved_offer_count() <= 1);

        self.store.commit_approval(&request.id, provider_id).await
    }
}
