//! Storage and directory collaborators.
//!
//! The engine depends only on these traits. The in-memory backend in
//! `homeservice-testing` and the `PostgreSQL` adapter in
//! `homeservice-postgres` both implement all three.
//!
//! ```text
//! LifecycleEngine ──► RequestStore   (requests + offers)
//!        │        ──► Directory      (categories, householders, providers)
//!        └──────────► RatingLedger   (reviews + rating aggregates)
//! ```

use crate::config::LifecycleConfig;
use crate::types::{ProviderId, RequestStatus};
use serde::{Deserialize, Serialize};

pub mod directory;
pub mod rating_ledger;
pub mod request_store;

pub use directory::Directory;
pub use rating_ledger::RatingLedger;
pub use request_store::RequestStore;

/// Listing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Maximum rows to return
    pub limit: u32,
    /// Rows to skip
    pub offset: u32,
}

impl Page {
    /// A page with `limit` clamped into the configured bounds.
    #[must_use]
    pub fn new(limit: Option<u32>, offset: u32, config: &LifecycleConfig) -> Self {
        Self {
            limit: config.page_limit(limit),
            offset,
        }
    }

    /// First page at the default size.
    #[must_use]
    pub fn first(config: &LifecycleConfig) -> Self {
        Self::new(None, 0, config)
    }

    /// Apply the window to an already-ordered iterator.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Ordering on scheduled time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Earliest first
    #[default]
    Ascending,
    /// Latest first
    Descending,
}

impl SortOrder {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Listing filter for request queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    /// Only requests in this status
    pub status: Option<RequestStatus>,
    /// Only requests with an approved offer
    pub approved_only: bool,
    /// Listing window
    pub page: Page,
    /// Order on scheduled time
    pub sort: SortOrder,
}

impl RequestFilter {
    /// No status filter, ascending, first page.
    #[must_use]
    pub fn all(config: &LifecycleConfig) -> Self {
        Self {
            status: None,
            approved_only: false,
            page: Page::first(config),
            sort: SortOrder::Ascending,
        }
    }

    /// Restrict to one status.
    #[must_use]
    pub const fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to approved requests.
    #[must_use]
    pub const fn approved(mut self) -> Self {
        self.approved_only = true;
        self
    }

    /// Set the page.
    #[must_use]
    pub const fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    /// Set the sort order.
    #[must_use]
    pub const fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Whether a request with this status and approve flag passes the filter.
    #[must_use]
    pub fn matches(&self, status: RequestStatus, approve_status: bool) -> bool {
        self.status.is_none_or(|wanted| wanted == status)
            && (!self.approved_only || approve_status)
    }
}

/// Householder fields snapshotted onto a new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholderProfile {
    /// Display name
    pub name: String,
    /// Postal address, if on file
    pub address: Option<String>,
    /// Phone or email
    pub contact: String,
}

/// A provider's base profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Provider account
    pub provider_id: ProviderId,
    /// Overall rating
    pub rating: f64,
    /// Whether the provider is taking work
    pub availability: bool,
    /// Whether the profile is active
    pub is_active: bool,
}

impl ProviderProfile {
    /// Profile created the first time a provider makes an offer.
    #[must_use]
    pub const fn provisioned(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            rating: 0.0,
            availability: true,
            is_active: true,
        }
    }
}

/// Provider fields copied into an offer at quote time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    /// Display name
    pub name: String,
    /// Phone or email
    pub contact: String,
    /// Business address
    pub address: String,
    /// Rating for the service being quoted, or the overall rating when the
    /// provider has no listing for it
    pub rating: f64,
    /// Listed price for the service, if any
    pub price_basis: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_clamped_and_slices() {
        let config = LifecycleConfig::default().with_page_sizes(2, 3);
        let page = Page::new(Some(50), 1, &config);
        assert_eq!(page.limit, 3);
        assert_eq!(page.slice(1..=10), vec![2, 3, 4]);
        assert_eq!(Page::first(&config).slice(1..=10), vec![1, 2]);
    }

    #[test]
    fn filter_matches_status_and_approval() {
        let config = LifecycleConfig::default();
        let pending = RequestFilter::all(&config).with_status(RequestStatus::Pending);
        assert!(pending.matches(RequestStatus::Pending, false));
        assert!(!pending.matches(RequestStatus::Accepted, false));

        let approved = RequestFilter::all(&config).approved();
        assert!(approved.matches(RequestStatus::Approved, true));
        assert!(!approved.matches(RequestStatus::Accepted, false));
    }
}
