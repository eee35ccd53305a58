//! Lifecycle engine: the entry point for every actor action.
//!
//! Each call loads the request, runs the reducer guards, applies the event
//! and persists it with one conditional write (or one transaction for accept
//! and approve). No state is held between calls.

use super::actions::{NewServiceRequest, RequestAction};
use super::environment::LifecycleEnvironment;
use super::reducer::RequestLifecycleReducer;
use crate::error::{Result, ServiceError};
use crate::offers::OfferManager;
use crate::providers::{Directory, RatingLedger, RequestStore};
use crate::rating::{NewReview, RatingAggregate, RatingAggregator};
use crate::types::{
    HouseholderId, OfferId, ProviderId, RequestId, RequestStatus, ServiceRequest,
};
use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

/// Request lifecycle and rating engine.
///
/// Generic over its three collaborators so the same engine runs against the
/// in-memory backend in tests and `PostgreSQL` in production.
pub struct LifecycleEngine<R, D, L> {
    pub(crate) store: R,
    pub(crate) directory: D,
    pub(crate) ratings: RatingAggregator<L>,
    pub(crate) env: LifecycleEnvironment,
}

impl<R, D, L> LifecycleEngine<R, D, L>
where
    R: RequestStore,
    D: Directory,
    L: RatingLedger,
{
    /// Creates a new `LifecycleEngine`.
    #[must_use]
    pub const fn new(store: R, directory: D, ledger: L, env: LifecycleEnvironment) -> Self {
        Self {
            store,
            directory,
            ratings: RatingAggregator::new(ledger),
            env,
        }
    }

    /// The injected environment.
    #[must_use]
    pub const fn environment(&self) -> &LifecycleEnvironment {
        &self.env
    }

    /// Create a `Pending` request for `householder_id`.
    ///
    /// The category is resolved to a service and the householder's name,
    /// address and contact are copied onto the request. The scheduled time is
    /// taken as given.
    ///
    /// # Errors
    ///
    /// - `CategoryNotFound` if no service is mapped to the category
    /// - `NotFound` if the householder is unknown
    /// - `Storage` on collaborator failure
    pub async fn create_request(
        &self,
        householder_id: &HouseholderId,
        new_request: NewServiceRequest,
    ) -> Result<ServiceRequest> {
        let result = self.create_request_inner(householder_id, new_request).await;
        match &result {
            Ok(request) => info!(
                request_id = %request.id,
                householder_id = %householder_id,
                service_id = %request.service_id,
                scheduled_at = %request.scheduled_at,
                "Service request created"
            ),
            Err(error) => warn!(householder_id = %householder_id, %error, "Service request rejected"),
        }
        count_transition(
            "create",
            result.as_ref().map_or_else(ServiceError::kind, |_| "ok"),
        );
        result
    }

    async fn create_request_inner(
        &self,
        householder_id: &HouseholderId,
        new_request: NewServiceRequest,
    ) -> Result<ServiceRequest> {
        let service_id = self
            .directory
            .resolve_category(&new_request.category)
            .await?
            .ok_or(ServiceError::CategoryNotFound)?;
        let householder = self.directory.householder(householder_id).await?;

        let request = ServiceRequest {
            id: RequestId::new(self.env.ids.next_id()),
            householder_id: Some(householder_id.clone()),
            householder_name: householder.name,
            householder_address: householder.address,
            householder_contact: householder.contact,
            category: new_request.category,
            service_name: new_request.service_name,
            service_id,
            description: new_request.description,
            requested_at: self.env.local_now(),
            scheduled_at: new_request.scheduled_at,
            status: RequestStatus::Pending,
            approve_status: false,
            offers: Vec::new(),
        };

        self.store.save(&request).await?;
        Ok(request)
    }

    /// Provider accepts the request with a quote, creating an offer.
    ///
    /// Several providers may accept the same request; their offers coexist
    /// until one is approved.
    ///
    /// # Errors
    ///
    /// - `AlreadyApproved` if an offer was already approved
    /// - `InvalidTransition` if the request is cancelled or declined
    /// - `OfferAlreadySubmitted` if this provider already made an offer
    /// - `InvalidQuote` if the quote is blank
    /// - `ProviderNotRegistered` if the provider has no account
    pub async fn accept_request(
        &self,
        request_id: &RequestId,
        provider_id: &ProviderId,
        quote: &str,
    ) -> Result<OfferId> {
        let result = self.accept_inner(request_id, provider_id, quote).await;
        observe(
            "accept",
            request_id,
            provider_id.as_str(),
            result.as_ref().map(|_| RequestStatus::Accepted),
        );
        result
    }

    async fn accept_inner(
        &self,
        request_id: &RequestId,
        provider_id: &ProviderId,
        quote: &str,
    ) -> Result<OfferId> {
        let mut request = self.store.get(request_id).await?;
        let price = RequestLifecycleReducer::validate_accept(&request, provider_id, quote)?;
        OfferManager::new(&self.store, &self.directory)
            .record_offer(&mut request, provider_id, price, &self.env)
            .await
    }

    /// Provider declines a `Pending` request.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the request is `Pending`.
    pub async fn decline_request(
        &self,
        request_id: &RequestId,
        provider_id: &ProviderId,
    ) -> Result<ServiceRequest> {
        self.transition(
            request_id,
            RequestAction::Decline {
                provider_id: provider_id.clone(),
            },
        )
        .await
    }

    /// Householder approves one provider's offer. The request and the
    /// winning offer are committed together.
    ///
    /// # Errors
    ///
    /// - `NotOwner` if the caller does not own the request
    /// - `AlreadyApproved` if an offer was already approved
    /// - `InvalidTransition` if the request is cancelled or declined
    /// - `NotFound` if the provider made no offer
    pub async fn approve_request(
        &self,
        request_id: &RequestId,
        householder_id: &HouseholderId,
        provider_id: &ProviderId,
    ) -> Result<ServiceRequest> {
        let result = self
            .approve_inner(request_id, householder_id, provider_id)
            .await;
        observe(
            "approve",
            request_id,
            householder_id.as_str(),
            result.as_ref().map(|r| r.status),
        );
        result
    }

    async fn approve_inner(
        &self,
        request_id: &RequestId,
        householder_id: &HouseholderId,
        provider_id: &ProviderId,
    ) -> Result<ServiceRequest> {
        let mut request = self.store.get(request_id).await?;
        RequestLifecycleReducer::validate_approve(&request, householder_id, provider_id)?;
        OfferManager::new(&self.store, &self.directory)
            .approve_offer(&mut request, provider_id)
            .await?;
        Ok(request)
    }

    /// Householder cancels a request at least the configured lead time
    /// before it is scheduled.
    ///
    /// # Errors
    ///
    /// - `NotOwner` if the caller does not own the request
    /// - `TooLate` inside the lead time
    /// - `AlreadyCancelled` if already cancelled
    /// - `InvalidTransition` if approved or declined
    pub async fn cancel_request(
        &self,
        request_id: &RequestId,
        householder_id: &HouseholderId,
    ) -> Result<ServiceRequest> {
        self.transition(
            request_id,
            RequestAction::Cancel {
                householder_id: householder_id.clone(),
            },
        )
        .await
    }

    /// Householder cancels an `Accepted` request. No lead-time check applies
    /// on this path.
    ///
    /// # Errors
    ///
    /// - `NotOwner` if the caller does not own the request
    /// - `InvalidTransition` unless the request is `Accepted`
    pub async fn cancel_accepted_request(
        &self,
        request_id: &RequestId,
        householder_id: &HouseholderId,
    ) -> Result<ServiceRequest> {
        self.transition(
            request_id,
            RequestAction::CancelAccepted {
                householder_id: householder_id.clone(),
            },
        )
        .await
    }

    /// Householder moves a `Pending` or `Accepted` request to a new time.
    ///
    /// # Errors
    ///
    /// - `NotOwner` if the caller does not own the request
    /// - `InvalidTransition` unless the request is `Pending` or `Accepted`
    pub async fn reschedule_request(
        &self,
        request_id: &RequestId,
        householder_id: &HouseholderId,
        scheduled_at: DateTime<FixedOffset>,
    ) -> Result<ServiceRequest> {
        self.transition(
            request_id,
            RequestAction::Reschedule {
                householder_id: householder_id.clone(),
                scheduled_at,
            },
        )
        .await
    }

    /// Submit a review and fold it into the (provider, service) rating.
    ///
    /// # Errors
    ///
    /// - `InvalidRating` if outside the configured range
    /// - `DuplicateReview` if this householder already reviewed the pair
    /// - `RatingUpdateFailed` if a rating location could not be written
    pub async fn submit_review(&self, review: NewReview) -> Result<RatingAggregate> {
        let provider_id = review.provider_id.clone();
        let service_id = review.service_id.clone();
        let householder_id = review.householder_id.clone();

        let result = self
            .ratings
            .submit_review(
                review,
                self.env.clock.as_ref(),
                self.env.ids.as_ref(),
                &self.env.config,
            )
            .await;

        match &result {
            Ok(aggregate) => {
                metrics::counter!("review.submitted").increment(1);
                info!(
                    provider_id = %provider_id,
                    service_id = %service_id,
                    householder_id = %householder_id,
                    avg_rating = aggregate.avg_rating,
                    rating_count = aggregate.rating_count,
                    "Review recorded"
                );
            }
            Err(error) => {
                metrics::counter!("review.rejected", "reason" => error.kind()).increment(1);
                warn!(
                    provider_id = %provider_id,
                    service_id = %service_id,
                    householder_id = %householder_id,
                    %error,
                    "Review rejected"
                );
            }
        }
        result
    }

    /// Load, decide, apply and conditionally write a single-row transition.
    async fn transition(
        &self,
        request_id: &RequestId,
        action: RequestAction,
    ) -> Result<ServiceRequest> {
        let result = self.transition_inner(request_id, &action).await;
        observe(
            action.name(),
            request_id,
            action.actor(),
            result.as_ref().map(|r| r.status),
        );
        result
    }

    async fn transition_inner(
        &self,
        request_id: &RequestId,
        action: &RequestAction,
    ) -> Result<ServiceRequest> {
        let mut request = self.store.get(request_id).await?;
        let expected_status = request.status;
        let event = RequestLifecycleReducer::decide(&request, action, &self.env)?;
        RequestLifecycleReducer::apply(&mut request, &event);
        self.store.update(&request, expected_status).await?;
        Ok(request)
    }
}

fn observe(
    action: &'static str,
    request_id: &RequestId,
    actor: &str,
    outcome: std::result::Result<RequestStatus, &ServiceError>,
) {
    match outcome {
        Ok(status) => {
            count_transition(action, "ok");
            info!(request_id = %request_id, actor, action, %status, "Request transitioned");
        }
        Err(error) => {
            count_transition(action, error.kind());
            warn!(request_id = %request_id, actor, action, %error, "Request transition rejected");
        }
    }
}

fn count_transition(action: &'static str, outcome: &'static str) {
    metrics::counter!("service_request.transition", "action" => action, "outcome" => outcome)
        .increment(1);
}
