//! Rating ledger trait.

use super::Page;
use crate::error::Result;
use crate::rating::RatingAggregate;
use crate::types::{ProviderId, Review, ServiceId};

/// Durable reviews and the running rating aggregates they feed.
pub trait RatingLedger: Send + Sync {
    /// Current aggregate for a (provider, service) pair.
    ///
    /// # Errors
    ///
    /// - Unknown pair → `ServiceError::NotFound`
    /// - Storage failure → `ServiceError::Storage`
    fn aggregate(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
    ) -> impl std::future::Future<Output = Result<RatingAggregate>> + Send;

    /// Record a review and fold its rating into all three rating locations,
    /// as one atomic unit.
    ///
    /// The implementation checks for a duplicate, inserts the review, reads
    /// the pair aggregate from the listing, folds with [`RatingAggregate::fold`] and writes
    /// the provider profile, the provider's listing and the service aggregate.
    ///
    /// # Errors
    ///
    /// - Duplicate (provider, service, householder) → `ServiceError::DuplicateReview`
    /// - Unknown service → `ServiceError::NotFound`
    /// - A location write fails → `ServiceError::RatingUpdateFailed`,
    ///   with the review insert rolled back
    fn record_review(
        &self,
        review: &Review,
    ) -> impl std::future::Future<Output = Result<RatingAggregate>> + Send;

    /// Reviews for a provider, optionally for one service, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the query fails.
    fn reviews(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> impl std::future::Future<Output = Result<Vec<Review>>> + Send;
}
