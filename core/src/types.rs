//! Domain types for service requests, offers and reviews.
//!
//! A [`ServiceRequest`] is the householder's solicitation for one service
//! category at a scheduled time. Providers answer it with [`Offer`]s; the
//! householder approves exactly one of them.

use crate::error::{Result, ServiceError};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Unique identifier of a service request. Never reused.
    RequestId
);
string_id!(
    /// Unique identifier of a provider's offer on a request.
    OfferId
);
string_id!(
    /// Unique identifier of a review.
    ReviewId
);
string_id!(
    /// Identifier of a householder account.
    HouseholderId
);
string_id!(
    /// Identifier of a service provider account.
    ProviderId
);
string_id!(
    /// Identifier of a service, resolved from a service category.
    ServiceId
);

/// Status of a service request.
///
/// ```text
/// Pending ──► Accepted ──► Approved
///    │  └──► Declined │
///    └────────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Created, no provider has accepted yet
    Pending,
    /// At least one provider has submitted an offer
    Accepted,
    /// The householder approved exactly one offer
    Approved,
    /// Cancelled by the householder
    Cancelled,
    /// Declined by a provider
    Declined,
}

impl RequestStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Approved => "Approved",
            Self::Cancelled => "Cancelled",
            Self::Declined => "Declined",
        }
    }

    /// Parse a status from its stored representation.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Storage`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Approved" => Ok(Self::Approved),
            "Cancelled" => Ok(Self::Cancelled),
            "Declined" => Ok(Self::Declined),
            other => Err(ServiceError::Storage(format!(
                "Invalid request status: {other}"
            ))),
        }
    }

    /// `Pending` or `Accepted`: the request can still change hands.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// No further status transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider's quoted price, kept as the string the provider entered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quote(String);

impl Quote {
    /// Validate and wrap a quoted price.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidQuote`] if the quote is blank.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::InvalidQuote);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The quote as entered (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A provider's accepted quote against a request.
///
/// Provider fields are a point-in-time copy taken when the offer was made and
/// are never refreshed. Only `approved` changes after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Offer identifier
    pub id: OfferId,
    /// Provider who made the offer
    pub provider_id: ProviderId,
    /// Provider name at offer time
    pub provider_name: String,
    /// Provider contact at offer time
    pub provider_contact: String,
    /// Provider address at offer time
    pub provider_address: String,
    /// Quoted price
    pub price: Quote,
    /// Provider rating for this service at offer time
    pub provider_rating: f64,
    /// Whether the householder approved this offer
    pub approved: bool,
    /// When the offer was recorded
    pub offered_at: DateTime<Utc>,
}

impl Offer {
    /// Approval flag as stored (`0` or `1`).
    #[must_use]
    pub const fn approval_flag(&self) -> u8 {
        if self.approved { 1 } else { 0 }
    }
}

/// One row per request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Request identifier
    pub id: RequestId,
    /// Owning householder. Absent on legacy rows whose account was removed.
    pub householder_id: Option<HouseholderId>,
    /// Householder name snapshot
    pub householder_name: String,
    /// Householder address snapshot
    pub householder_address: Option<String>,
    /// Householder contact snapshot
    pub householder_contact: String,
    /// Category the householder asked for
    pub category: String,
    /// Service name snapshot
    pub service_name: String,
    /// Service resolved from the category
    pub service_id: ServiceId,
    /// Free-text description of the job
    pub description: String,
    /// Server-assigned creation time in the service timezone
    pub requested_at: DateTime<FixedOffset>,
    /// Householder-supplied appointment time
    pub scheduled_at: DateTime<FixedOffset>,
    /// Current status
    pub status: RequestStatus,
    /// True only once exactly one offer has been approved
    pub approve_status: bool,
    /// Offers in submission order
    pub offers: Vec<Offer>,
}

impl ServiceRequest {
    /// Whether `householder_id` owns this request.
    ///
    /// A request with no recorded householder is owned by nobody.
    #[must_use]
    pub fn is_owned_by(&self, householder_id: &HouseholderId) -> bool {
        self.householder_id
            .as_ref()
            .is_some_and(|owner| owner == householder_id)
    }

    /// The offer submitted by `provider_id`, if any.
    #[must_use]
    pub fn offer_from(&self, provider_id: &ProviderId) -> Option<&Offer> {
        self.offers.iter().find(|o| &o.provider_id == provider_id)
    }

    /// The approved offer, if any.
    #[must_use]
    pub fn approved_offer(&self) -> Option<&Offer> {
        self.offers.iter().find(|o| o.approved)
    }

    /// Number of offers carrying the approval flag. Never more than one.
    #[must_use]
    pub fn approved_offer_count(&self) -> usize {
        self.offers.iter().filter(|o| o.approved).count()
    }
}

/// A householder's review of a provider for one service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Review identifier
    pub id: ReviewId,
    /// Reviewed provider
    pub provider_id: ProviderId,
    /// Reviewed service
    pub service_id: ServiceId,
    /// Author
    pub householder_id: HouseholderId,
    /// Rating in the configured range (1–5 by default)
    pub rating: f64,
    /// Free-text comments
    pub comments: String,
    /// When the review was submitted, in the service timezone
    pub reviewed_at: DateTime<FixedOffset>,
}
