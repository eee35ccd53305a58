//! Request state machine.
//!
//! [`RequestLifecycleReducer::decide`] validates an action against the
//! current request and returns the event to apply; it never mutates.
//! [`RequestLifecycleReducer::apply`] folds an event into the request.
//! Every guard runs before any write, so a rejected action leaves both the
//! in-memory request and storage untouched.
//!
//! The engine calls [`RequestLifecycleReducer::validate_accept`] and
//! [`RequestLifecycleReducer::validate_approve`] directly, since offers and
//! approvals are written by the offer manager rather than folded with
//! `apply`. Their `decide` arms keep the reducer total over
//! [`RequestAction`] and are exercised by the reducer tests.

use super::actions::{RequestAction, RequestEvent};
use super::environment::LifecycleEnvironment;
use crate::error::{Entity, Result, ServiceError, TransitionRule};
use crate::types::{HouseholderId, ProviderId, Quote, RequestStatus, ServiceRequest};
use chrono::{DateTime, FixedOffset};

/// Reducer for service requests.
#[derive(Clone, Debug, Default)]
pub struct RequestLifecycleReducer;

impl RequestLifecycleReducer {
    /// Creates a new `RequestLifecycleReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validate `action` against `request`.
    ///
    /// # Errors
    ///
    /// Returns the first guard that fails; see the individual transitions.
    pub fn decide(
        request: &ServiceRequest,
        action: &RequestAction,
        env: &LifecycleEnvironment,
    ) -> Result<RequestEvent> {
        match action {
            RequestAction::Accept { provider_id, quote } => {
                let price = Self::validate_accept(request, provider_id, quote)?;
                Ok(RequestEvent::Accepted {
                    provider_id: provider_id.clone(),
                    price,
                })
            }
            RequestAction::Decline { provider_id } => Self::validate_decline(request, provider_id),
            RequestAction::Approve {
                householder_id,
                provider_id,
            } => {
                Self::validate_approve(request, householder_id, provider_id)?;
                Ok(RequestEvent::Approved {
                    provider_id: provider_id.clone(),
                })
            }
            RequestAction::Cancel { householder_id } => {
                Self::validate_cancel(request, householder_id, env)
            }
            RequestAction::CancelAccepted { householder_id } => {
                Self::validate_cancel_accepted(request, householder_id)
            }
            RequestAction::Reschedule {
                householder_id,
                scheduled_at,
            } => Self::validate_reschedule(request, householder_id, *scheduled_at),
        }
    }

    fn ensure_owner(request: &ServiceRequest, householder_id: &HouseholderId) -> Result<()> {
        if request.is_owned_by(householder_id) {
            Ok(())
        } else {
            Err(ServiceError::NotOwner)
        }
    }

    const fn closed(status: RequestStatus) -> ServiceError {
        ServiceError::InvalidTransition {
            status,
            rule: TransitionRule::RequestClosed,
        }
    }

    /// Guards for a provider accepting with a quote. Returns the validated
    /// quote.
    ///
    /// # Errors
    ///
    /// `AlreadyApproved`, then `InvalidTransition` for a closed request, then
    /// `OfferAlreadySubmitted`, then `InvalidQuote`.
    pub fn validate_accept(
        request: &ServiceRequest,
        provider_id: &ProviderId,
        quote: &str,
    ) -> Result<Quote> {
        if request.approve_status {
            return Err(ServiceError::AlreadyApproved);
        }
        if !request.status.is_open() {
            return Err(Self::closed(request.status));
        }
        if request.offer_from(provider_id).is_some() {
            return Err(ServiceError::OfferAlreadySubmitted);
        }
        Quote::parse(quote)
    }

    fn validate_decline(request: &ServiceRequest, provider_id: &ProviderId) -> Result<RequestEvent> {
        if request.status != RequestStatus::Pending {
            return Err(ServiceError::InvalidTransition {
                status: request.status,
                rule: TransitionRule::RequestNotPending,
            });
        }

        Ok(RequestEvent::Declined {
            provider_id: provider_id.clone(),
        })
    }

    /// Guards for a householder approving one provider's offer.
    ///
    /// # Errors
    ///
    /// `NotOwner`, then `AlreadyApproved`, then `InvalidTransition` for a
    /// closed request, then `NotFound` when the provider made no offer.
    pub fn validate_approve(
        request: &ServiceRequest,
        householder_id: &HouseholderId,
        provider_id: &ProviderId,
    ) -> Result<()> {
        Self::ensure_owner(request, householder_id)?;
        if request.approve_status {
            return Err(ServiceError::AlreadyApproved);
        }
        if !request.status.is_open() {
            return Err(Self::closed(request.status));
        }
        if request.offer_from(provider_id).is_none() {
            return Err(ServiceError::not_found(Entity::Offer, provider_id));
        }

        Ok(())
    }

    fn validate_cancel(
        request: &ServiceRequest,
        householder_id: &HouseholderId,
        env: &LifecycleEnvironment,
    ) -> Result<RequestEvent> {
        Self::ensure_owner(request, householder_id)?;

        let remaining = request.scheduled_at.signed_duration_since(env.clock.now());
        if remaining < env.config.cancellation_lead_time {
            return Err(ServiceError::TooLate);
        }
        if request.status == RequestStatus::Cancelled {
            return Err(ServiceError::AlreadyCancelled);
        }
        if !request.status.is_open() {
            return Err(Self::closed(request.status));
        }

        Ok(RequestEvent::Cancelled {
            from: request.status,
        })
    }

    fn validate_cancel_accepted(
        request: &ServiceRequest,
        householder_id: &HouseholderId,
    ) -> Result<RequestEvent> {
        Self::ensure_owner(request, householder_id)?;
        if request.status != RequestStatus::Accepted {
            return Err(ServiceError::InvalidTransition {
                status: request.status,
                rule: TransitionRule::OnlyAcceptedCancellable,
            });
        }

        Ok(RequestEvent::Cancelled {
            from: request.status,
        })
    }

    fn validate_reschedule(
        request: &ServiceRequest,
        householder_id: &HouseholderId,
        scheduled_at: DateTime<FixedOffset>,
    ) -> Result<RequestEvent> {
        Self::ensure_owner(request, householder_id)?;
        if !request.status.is_open() {
            return Err(ServiceError::InvalidTransition {
                status: request.status,
                rule: TransitionRule::OnlyPendingOrAcceptedReschedulable,
            });
        }

        Ok(RequestEvent::Rescheduled {
            previous: request.scheduled_at,
            scheduled_at,
        })
    }

    /// Applies an event to the request.
    ///
    /// `Accepted` only moves the status; the offer itself is appended by the
    /// offer manager, which owns the provider snapshot.
    pub fn apply(request: &mut ServiceRequest, event: &RequestEvent) {
        match event {
            RequestEvent::Accepted { .. } => {
                request.status = RequestStatus::Accepted;
            }
            RequestEvent::Declined { .. } => {
                request.status = RequestStatus::Declined;
            }
            RequestEvent::Approved { provider_id } => {
                for offer in &mut request.offers {
                    offer.approved = &offer.provider_id == provider_id;
                }
                request.approve_status = true;
                request.status = RequestStatus::Approved;
            }
            RequestEvent::Cancelled { .. } => {
                request.status = RequestStatus::Cancelled;
            }
            RequestEvent::Rescheduled { scheduled_at, .. } => {
                request.scheduled_at = *scheduled_at;
            }
        }
    }
}
