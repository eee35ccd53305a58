//! Rating Aggregator.
//!
//! Folds a single new review into the running (average, count) pair for a
//! (provider, service) without re-scanning historical reviews:
//!
//! ```text
//! new_avg   = (avg * count + rating) / (count + 1)
//! new_count = count + 1
//! ```

use crate::environment::{Clock, IdGenerator};
use crate::config::LifecycleConfig;
use crate::error::{Result, ServiceError};
use crate::providers::RatingLedger;
use crate::types::{HouseholderId, ProviderId, Review, ReviewId, ServiceId};
use serde::{Deserialize, Serialize};

/// Running average rating for one (provider, service) pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingAggregate {
    /// Mean of the accepted ratings
    pub avg_rating: f64,
    /// Number of accepted ratings
    pub rating_count: i64,
}

impl RatingAggregate {
    /// Aggregate with the given average and count.
    #[must_use]
    pub const fn new(avg_rating: f64, rating_count: i64) -> Self {
        Self {
            avg_rating,
            rating_count,
        }
    }

    /// Fold one more rating into the aggregate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use homeservice_core::RatingAggregate;
    /// let agg = RatingAggregate::default().fold(4.0).fold(5.0).fold(3.0);
    /// assert_eq!(agg, RatingAggregate::new(4.0, 3));
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
    pub fn fold(self, rating: f64) -> Self {
        let count = self.rating_count as f64;
        Self {
            avg_rating: self.avg_rating.mul_add(count, rating) / (count + 1.0),
            rating_count: self.rating_count + 1,
        }
    }
}

/// A review as submitted by a householder, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    /// Reviewed provider
    pub provider_id: ProviderId,
    /// Reviewed service
    pub service_id: ServiceId,
    /// Author
    pub householder_id: HouseholderId,
    /// Rating value
    pub rating: f64,
    /// Free-text comments
    pub comments: String,
}

/// Validates reviews and hands them to the [`RatingLedger`] for the atomic
/// duplicate-check, insert and three-location fold.
#[derive(Debug, Clone)]
pub struct RatingAggregator<L> {
    ledger: L,
}

impl<L: RatingLedger> RatingAggregator<L> {
    /// Create an aggregator over `ledger`.
    #[must_use]
    pub const fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// The underlying ledger.
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Build a [`Review`] from a submission, rejecting out-of-range ratings.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRating`] if the rating is non-finite or
    /// outside the configured range.
    pub fn prepare(
        submission: NewReview,
        clock: &dyn Clock,
        ids: &dyn IdGenerator,
        config: &LifecycleConfig,
    ) -> Result<Review> {
        if !config.accepts_rating(submission.rating) {
            return Err(ServiceError::InvalidRating {
                rating: submission.rating,
            });
        }

        Ok(Review {
            id: ReviewId::new(ids.next_id()),
            provider_id: submission.provider_id,
            service_id: submission.service_id,
            householder_id: submission.householder_id,
            rating: submission.rating,
            comments: submission.comments,
            reviewed_at: clock.now().with_timezone(&config.timezone),
        })
    }

    /// Validate and record a review, returning the updated aggregate.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidRating`] before any write
    /// - [`ServiceError::DuplicateReview`] if the householder already
    ///   reviewed this (provider, service); the aggregate is unchanged
    /// - [`ServiceError::RatingUpdateFailed`] if any rating location could
    ///   not be written; the review insert is rolled back
    pub async fn submit_review(
        &self,
        submission: NewReview,
        clock: &dyn Clock,
        ids: &dyn IdGenerator,
        config: &LifecycleConfig,
    ) -> Result<RatingAggregate> {
        let review = Self::prepare(submission, clock, ids, config)?;
        self.ledger.record_review(&review).await
    }
}
