//! Actions and events for the request lifecycle.

use crate::types::{HouseholderId, ProviderId, Quote, RequestStatus};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Input for creating a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceRequest {
    /// Category name, resolved to a service on creation
    pub category: String,
    /// Service name as shown to the householder
    pub service_name: String,
    /// What needs doing
    pub description: String,
    /// Requested appointment time
    pub scheduled_at: DateTime<FixedOffset>,
}

/// Actor commands against an existing request.
///
/// Provider actions carry the provider's id; householder actions carry the
/// caller's id, which must own the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestAction {
    /// Provider accepts the request with a quoted price.
    Accept {
        /// Accepting provider
        provider_id: ProviderId,
        /// Quoted price as entered
        quote: String,
    },

    /// Provider declines a pending request.
    Decline {
        /// Declining provider
        provider_id: ProviderId,
    },

    /// Householder approves one provider's offer.
    Approve {
        /// Caller
        householder_id: HouseholderId,
        /// Provider whose offer is approved
        provider_id: ProviderId,
    },

    /// Householder cancels, subject to the lead time.
    Cancel {
        /// Caller
        householder_id: HouseholderId,
    },

    /// Householder cancels an accepted request. No lead-time check.
    CancelAccepted {
        /// Caller
        householder_id: HouseholderId,
    },

    /// Householder moves the appointment.
    Reschedule {
        /// Caller
        householder_id: HouseholderId,
        /// New appointment time
        scheduled_at: DateTime<FixedOffset>,
    },
}

impl RequestAction {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accept",
            Self::Decline { .. } => "decline",
            Self::Approve { .. } => "approve",
            Self::Cancel { .. } => "cancel",
            Self::CancelAccepted { .. } => "cancel_accepted",
            Self::Reschedule { .. } => "reschedule",
        }
    }

    /// Id of the acting householder or provider.
    #[must_use]
    pub fn actor(&self) -> &str {
        match self {
            Self::Accept { provider_id, .. } | Self::Decline { provider_id } => {
                provider_id.as_str()
            }
            Self::Approve { householder_id, .. }
            | Self::Cancel { householder_id }
            | Self::CancelAccepted { householder_id }
            | Self::Reschedule { householder_id, .. } => householder_id.as_str(),
        }
    }
}

/// Validated facts produced by the reducer and applied to the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestEvent {
    /// A provider's offer was accepted onto the request.
    Accepted {
        /// Provider making the offer
        provider_id: ProviderId,
        /// Validated quote
        price: Quote,
    },

    /// A provider declined the request.
    Declined {
        /// Declining provider
        provider_id: ProviderId,
    },

    /// The householder approved this provider's offer.
    Approved {
        /// Winning provider
        provider_id: ProviderId,
    },

    /// The householder cancelled the request.
    Cancelled {
        /// Status before cancellation
        from: RequestStatus,
    },

    /// The appointment moved.
    Rescheduled {
        /// Previous appointment time
        previous: DateTime<FixedOffset>,
        /// New appointment time
        scheduled_at: DateTime<FixedOffset>,
    },
}
