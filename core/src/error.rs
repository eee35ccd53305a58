//! Error types for the request lifecycle and rating engine.

use crate::types::RequestStatus;
use thiserror::Error;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Kind of record a [`ServiceError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A service request
    Request,
    /// A provider's offer on a request
    Offer,
    /// A householder account
    Householder,
    /// A service provider account or profile
    Provider,
    /// A service listing
    Service,
    /// A (provider, service) rating aggregate
    RatingAggregate,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Request => "service request",
            Self::Offer => "offer",
            Self::Householder => "householder",
            Self::Provider => "service provider",
            Self::Service => "service",
            Self::RatingAggregate => "rating aggregate",
        };
        f.write_str(name)
    }
}

/// The status guard an [`ServiceError::InvalidTransition`] tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRule {
    /// Decline requires `Pending`
    RequestNotPending,
    /// Cancel-accepted requires `Accepted`
    OnlyAcceptedCancellable,
    /// Reschedule requires `Pending` or `Accepted`
    OnlyPendingOrAcceptedReschedulable,
    /// Accept, approve and generic cancel require `Pending` or `Accepted`
    RequestClosed,
}

impl std::fmt::Display for TransitionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::RequestNotPending => "request is not pending",
            Self::OnlyAcceptedCancellable => "only accepted requests can be cancelled this way",
            Self::OnlyPendingOrAcceptedReschedulable => {
                "only pending or accepted requests can be rescheduled"
            }
            Self::RequestClosed => "request is closed",
        };
        f.write_str(msg)
    }
}

/// Denormalized location of a rating value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingLocation {
    /// The provider's overall rating
    ProviderProfile,
    /// The provider's per-service listing rating
    ProviderListing,
    /// The service's own average rating and count
    ServiceAggregate,
}

impl RatingLocation {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderProfile => "provider_profile",
            Self::ProviderListing => "provider_listing",
            Self::ServiceAggregate => "service_aggregate",
        }
    }
}

impl std::fmt::Display for RatingLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every failure a lifecycle or rating operation can report.
///
/// Validation failures are detected before any mutation, so a returned error
/// means nothing was written unless the variant says otherwise.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    // ═══════════════════════════════════════════════════════════
    // Lookup and Ownership
    // ═══════════════════════════════════════════════════════════

    /// Referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What kind of record was missing
        entity: Entity,
        /// Identifier that was looked up
        id: String,
    },

    /// Caller does not own the request.
    #[error("Caller does not own this request")]
    NotOwner,

    /// Service category has no service mapped to it.
    #[error("Service category not found")]
    CategoryNotFound,

    /// Provider has no provider account.
    #[error("Service provider is not registered")]
    ProviderNotRegistered,

    // ═══════════════════════════════════════════════════════════
    // State Machine
    // ═══════════════════════════════════════════════════════════

    /// Status precondition for the transition is unmet.
    #[error("Invalid transition from {status}: {rule}")]
    InvalidTransition {
        /// Status the request was in
        status: RequestStatus,
        /// Guard that rejected the transition
        rule: TransitionRule,
    },

    /// An offer on this request has already been approved.
    #[error("Request has already been approved")]
    AlreadyApproved,

    /// Request is already cancelled.
    #[error("Request is already cancelled")]
    AlreadyCancelled,

    /// Cancellation lead time has passed.
    #[error("Too late to cancel this request")]
    TooLate,

    /// Provider already has an offer on this request.
    #[error("Offer already submitted for this request")]
    OfferAlreadySubmitted,

    /// Quote is blank.
    #[error("Quoted price must not be empty")]
    InvalidQuote,

    // ═══════════════════════════════════════════════════════════
    // Reviews and Ratings
    // ═══════════════════════════════════════════════════════════

    /// Householder already reviewed this provider for this service.
    #[error("Review already submitted for this provider and service")]
    DuplicateReview,

    /// Rating is non-finite or outside the accepted range.
    #[error("Rating {rating} is outside the accepted range")]
    InvalidRating {
        /// Rejected rating value
        rating: f64,
    },

    /// One of the denormalized rating locations could not be written.
    #[error("Failed to update {location} rating: {reason}")]
    RatingUpdateFailed {
        /// Location that failed
        location: RatingLocation,
        /// Underlying cause
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Storage
    // ═══════════════════════════════════════════════════════════

    /// A conditional write found the row changed since it was read.
    #[error("Request was modified concurrently")]
    ConcurrentModification,

    /// Storage collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Shorthand for [`ServiceError::NotFound`].
    pub fn not_found(entity: Entity, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` if the caller can fix the request and try again.
    ///
    /// # Examples
    ///
    /// ```
    /// # use homeservice_core::ServiceError;
    /// assert!(ServiceError::TooLate.is_user_error());
    /// assert!(!ServiceError::Storage("timeout".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotOwner
                | Self::CategoryNotFound
                | Self::InvalidTransition { .. }
                | Self::AlreadyApproved
                | Self::AlreadyCancelled
                | Self::TooLate
                | Self::OfferAlreadySubmitted
                | Self::InvalidQuote
                | Self::DuplicateReview
                | Self::InvalidRating { .. }
        )
    }

    /// Returns `true` if the failure is transient and the caller may retry.
    ///
    /// # Examples
    ///
    /// ```
    /// # use homeservice_core::ServiceError;
    /// assert!(ServiceError::ConcurrentModification.is_retryable());
    /// assert!(!ServiceError::DuplicateReview.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::ConcurrentModification)
    }

    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotOwner => "not_owner",
            Self::CategoryNotFound => "category_not_found",
            Self::ProviderNotRegistered => "provider_not_registered",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AlreadyApproved => "already_approved",
            Self::AlreadyCancelled => "already_cancelled",
            Self::TooLate => "too_late",
            Self::OfferAlreadySubmitted => "offer_already_submitted",
            Self::InvalidQuote => "invalid_quote",
            Self::DuplicateReview => "duplicate_review",
            Self::InvalidRating { .. } => "invalid_rating",
            Self::RatingUpdateFailed { .. } => "rating_update_failed",
            Self::ConcurrentModification => "concurrent_modification",
            Self::Storage(_) => "storage",
        }
    }
}
