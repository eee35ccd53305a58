//! Unit tests for `RequestLifecycleReducer` guards and event application.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use super::*;
use crate::config::LifecycleConfig;
use crate::environment::{Clock, IdGenerator};
use crate::error::{Entity, ServiceError, TransitionRule};
use crate::types::{
    HouseholderId, Offer, OfferId, ProviderId, Quote, RequestId, RequestStatus, ServiceId,
    ServiceRequest,
};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::sync::Arc;

struct StoppedClock(DateTime<Utc>);

impl Clock for StoppedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

struct FixedIds;

impl IdGenerator for FixedIds {
    fn next_id(&self) -> String {
        "id".to_string()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap()
}

fn test_env() -> LifecycleEnvironment {
    LifecycleEnvironment::new(
        Arc::new(StoppedClock(now())),
        Arc::new(FixedIds),
        LifecycleConfig::default(),
    )
}

fn ist(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&LifecycleConfig::default().timezone)
}

fn owner() -> HouseholderId {
    HouseholderId::new("h-1")
}

fn request_in(status: RequestStatus) -> ServiceRequest {
    ServiceRequest {
        id: RequestId::new("r-1"),
        householder_id: Some(owner()),
        householder_name: "Asha".to_string(),
        householder_address: Some("12 MG Road".to_string()),
        householder_contact: "asha@example.com".to_string(),
        category: "Plumbing".to_string(),
        service_name: "Plumbing".to_string(),
        service_id: ServiceId::new("s-1"),
        description: "Leaking tap".to_string(),
        requested_at: ist(now()),
        scheduled_at: ist(now() + Duration::days(1)),
        status,
        approve_status: false,
        offers: Vec::new(),
    }
}

fn offer_from(provider: &str) -> Offer {
    Offer {
        id: OfferId::new(format!("o-{provider}")),
        provider_id: ProviderId::new(provider),
        provider_name: provider.to_uppercase(),
        provider_contact: format!("{provider}@example.com"),
        provider_address: "Indiranagar".to_string(),
        price: Quote::parse("500").unwrap(),
        provider_rating: 4.0,
        approved: false,
        offered_at: now(),
    }
}

fn decide(request: &ServiceRequest, action: RequestAction) -> crate::Result<RequestEvent> {
    RequestLifecycleReducer::decide(request, &action, &test_env())
}

// ============================================================================
// Accept
// ============================================================================

#[test]
fn accept_pending_moves_to_accepted() {
    let mut request = request_in(RequestStatus::Pending);
    let event = decide(
        &request,
        RequestAction::Accept {
            provider_id: ProviderId::new("p-1"),
            quote: " 500 ".to_string(),
        },
    )
    .unwrap();

    assert_eq!(
        event,
        RequestEvent::Accepted {
            provider_id: ProviderId::new("p-1"),
            price: Quote::parse("500").unwrap(),
        }
    );

    RequestLifecycleReducer::apply(&mut request, &event);
    assert_eq!(request.status, RequestStatus::Accepted);
}

#[test]
fn accept_after_approval_is_already_approved() {
    let mut request = request_in(RequestStatus::Approved);
    request.approve_status = true;

    let result = decide(
        &request,
        RequestAction::Accept {
            provider_id: ProviderId::new("p-9"),
            quote: "300".to_string(),
        },
    );
    assert_eq!(result, Err(ServiceError::AlreadyApproved));
}

#[test]
fn accept_on_closed_request_is_invalid() {
    for status in [RequestStatus::Cancelled, RequestStatus::Declined] {
        let result = decide(
            &request_in(status),
            RequestAction::Accept {
                provider_id: ProviderId::new("p-1"),
                quote: "300".to_string(),
            },
        );
        assert_eq!(
            result,
            Err(ServiceError::InvalidTransition {
                status,
                rule: TransitionRule::RequestClosed,
            })
        );
    }
}

#[test]
fn second_offer_from_same_provider_rejected() {
    let mut request = request_in(RequestStatus::Accepted);
    request.offers.push(offer_from("p-1"));

    let result = decide(
        &request,
        RequestAction::Accept {
            provider_id: ProviderId::new("p-1"),
            quote: "450".to_string(),
        },
    );
    assert_eq!(result, Err(ServiceError::OfferAlreadySubmitted));
}

#[test]
fn blank_quote_rejected() {
    let result = decide(
        &request_in(RequestStatus::Pending),
        RequestAction::Accept {
            provider_id: ProviderId::new("p-1"),
            quote: "  ".to_string(),
        },
    );
    assert_eq!(result, Err(ServiceError::InvalidQuote));
}

// ============================================================================
// Decline
// ============================================================================

#[test]
fn decline_pending() {
    let mut request = request_in(RequestStatus::Pending);
    let action = RequestAction::Decline {
        provider_id: ProviderId::new("p-1"),
    };
    let event = decide(&request, action.clone()).unwrap();
    RequestLifecycleReducer::apply(&mut request, &event);
    assert_eq!(request.status, RequestStatus::Declined);

    let snapshot = request.clone();
    let again = decide(&request, action);
    assert_eq!(
        again,
        Err(ServiceError::InvalidTransition {
            status: RequestStatus::Declined,
            rule: TransitionRule::RequestNotPending,
        })
    );
    assert_eq!(request, snapshot);
}

#[test]
fn decline_accepted_is_invalid() {
    let result = decide(
        &request_in(RequestStatus::Accepted),
        RequestAction::Decline {
            provider_id: ProviderId::new("p-1"),
        },
    );
    assert!(matches!(
        result,
        Err(ServiceError::InvalidTransition {
            rule: TransitionRule::RequestNotPending,
            ..
        })
    ));
}

// ============================================================================
// Approve
// ============================================================================

#[test]
fn approve_flips_only_matching_offer() {
    let mut request = request_in(RequestStatus::Accepted);
    request.offers.push(offer_from("p-1"));
    request.offers.push(offer_from("p-2"));

    let event = decide(
        &request,
        RequestAction::Approve {
            householder_id: owner(),
            provider_id: ProviderId::new("p-2"),
        },
    )
    .unwrap();
    RequestLifecycleReducer::apply(&mut request, &event);

    assert_eq!(request.status, RequestStatus::Approved);
    assert!(request.approve_status);
    assert_eq!(request.offers[0].approval_flag(), 0);
    assert_eq!(request.offers[1].approval_flag(), 1);
    assert_eq!(request.approved_offer_count(), 1);
}

#[test]
fn approve_checks_owner_first() {
    let mut request = request_in(RequestStatus::Approved);
    request.approve_status = true;

    let result = decide(
        &request,
        RequestAction::Approve {
            householder_id: HouseholderId::new("intruder"),
            provider_id: ProviderId::new("p-1"),
        },
    );
    assert_eq!(result, Err(ServiceError::NotOwner));
}

#[test]
fn approve_without_offer_is_not_found() {
    let result = decide(
        &request_in(RequestStatus::Accepted),
        RequestAction::Approve {
            householder_id: owner(),
            provider_id: ProviderId::new("p-7"),
        },
    );
    assert_eq!(
        result,
        Err(ServiceError::NotFound {
            entity: Entity::Offer,
            id: "p-7".to_string(),
        })
    );
}

#[test]
fn request_without_householder_is_never_owned() {
    let mut request = request_in(RequestStatus::Accepted);
    request.householder_id = None;
    request.offers.push(offer_from("p-1"));

    let result = decide(
        &request,
        RequestAction::Approve {
            householder_id: owner(),
            provider_id: ProviderId::new("p-1"),
        },
    );
    assert_eq!(result, Err(ServiceError::NotOwner));
}

// ============================================================================
// Cancel
// ============================================================================

fn cancel_with_lead(lead: Duration, status: RequestStatus) -> crate::Result<RequestEvent> {
    let mut request = request_in(status);
    request.scheduled_at = ist(now() + lead);
    decide(
        &request,
        RequestAction::Cancel {
            householder_id: owner(),
        },
    )
}

#[test]
fn cancel_lead_time_boundary() {
    let lead = Duration::hours(4);
    assert!(cancel_with_lead(lead + Duration::minutes(1), RequestStatus::Pending).is_ok());
    assert!(cancel_with_lead(lead, RequestStatus::Pending).is_ok());
    assert_eq!(
        cancel_with_lead(lead - Duration::minutes(1), RequestStatus::Pending),
        Err(ServiceError::TooLate)
    );
}

#[test]
fn cancel_checks_lead_time_before_already_cancelled() {
    assert_eq!(
        cancel_with_lead(Duration::hours(1), RequestStatus::Cancelled),
        Err(ServiceError::TooLate)
    );
    assert_eq!(
        cancel_with_lead(Duration::hours(5), RequestStatus::Cancelled),
        Err(ServiceError::AlreadyCancelled)
    );
}

#[test]
fn cancel_approved_is_invalid() {
    assert_eq!(
        cancel_with_lead(Duration::hours(5), RequestStatus::Approved),
        Err(ServiceError::InvalidTransition {
            status: RequestStatus::Approved,
            rule: TransitionRule::RequestClosed,
        })
    );
}

#[test]
fn cancel_accepted_ignores_lead_time() {
    let mut request = request_in(RequestStatus::Accepted);
    request.scheduled_at = ist(now() + Duration::minutes(30));

    let event = decide(
        &request,
        RequestAction::CancelAccepted {
            householder_id: owner(),
        },
    )
    .unwrap();
    assert_eq!(
        event,
        RequestEvent::Cancelled {
            from: RequestStatus::Accepted
        }
    );
}

#[test]
fn cancel_accepted_requires_accepted() {
    let result = decide(
        &request_in(RequestStatus::Pending),
        RequestAction::CancelAccepted {
            householder_id: owner(),
        },
    );
    assert_eq!(
        result,
        Err(ServiceError::InvalidTransition {
            status: RequestStatus::Pending,
            rule: TransitionRule::OnlyAcceptedCancellable,
        })
    );
}

// ============================================================================
// Reschedule
// ============================================================================

#[test]
fn reschedule_replaces_scheduled_time() {
    let mut request = request_in(RequestStatus::Accepted);
    let new_time = ist(now() + Duration::days(3));

    let event = decide(
        &request,
        RequestAction::Reschedule {
            householder_id: owner(),
            scheduled_at: new_time,
        },
    )
    .unwrap();
    RequestLifecycleReducer::apply(&mut request, &event);

    assert_eq!(request.scheduled_at, new_time);
    assert_eq!(request.status, RequestStatus::Accepted);
}

#[test]
fn reschedule_closed_request_rejected() {
    let result = decide(
        &request_in(RequestStatus::Declined),
        RequestAction::Reschedule {
            householder_id: owner(),
            scheduled_at: ist(now()),
        },
    );
    assert_eq!(
        result,
        Err(ServiceError::InvalidTransition {
            status: RequestStatus::Declined,
            rule: TransitionRule::OnlyPendingOrAcceptedReschedulable,
        })
    );
}
