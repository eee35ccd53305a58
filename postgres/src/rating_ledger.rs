//! [`RatingLedger`] over `reviews` and the three aggregate columns.
//!
//! A review touches four rows in one transaction: the review itself, the
//! provider profile's overall rating, the (provider, service) listing and the
//! service's aggregate. All three receive the same folded pair aggregate. The
//! service row is locked first, which serializes concurrent reviews of the
//! same service so no fold reads a stale count.

use crate::rows::{self, REVIEW_COLUMNS};
use crate::{PostgresStore, finish, storage_error};
use chrono::Utc;
use homeservice_core::{
    Entity, Page, ProviderId, RatingAggregate, RatingLedger, RatingLocation, Result, Review,
    ServiceError, ServiceId,
};
use sqlx::PgConnection;
use std::future::Future;

fn location_failed(location: RatingLocation) -> impl FnOnce(sqlx::Error) -> ServiceError {
    move |e| ServiceError::RatingUpdateFailed {
        location,
        reason: e.to_string(),
    }
}

async fn review_writes(conn: &mut PgConnection, review: &Review) -> Result<RatingAggregate> {
    sqlx::query("SELECT id FROM services WHERE id = $1 FOR UPDATE")
        .bind(review.service_id.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ServiceError::not_found(Entity::Service, &review.service_id))?;

    let inserted = sqlx::query(
        r"
        INSERT INTO reviews (
            id, provider_id, service_id, householder_id, rating, comments, reviewed_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (provider_id, service_id, householder_id) DO NOTHING
        ",
    )
    .bind(review.id.as_str())
    .bind(review.provider_id.as_str())
    .bind(review.service_id.as_str())
    .bind(review.householder_id.as_str())
    .bind(review.rating)
    .bind(&review.comments)
    .bind(review.reviewed_at.with_timezone(&Utc))
    .execute(&mut *conn)
    .await
    .map_err(storage_error)?;
    if inserted.rows_affected() == 0 {
        return Err(ServiceError::DuplicateReview);
    }

    let pair = sqlx::query(
        r"
        SELECT avg_rating, rating_count FROM service_providers_services
        WHERE provider_id = $1 AND service_id = $2
        FOR UPDATE
        ",
    )
    .bind(review.provider_id.as_str())
    .bind(review.service_id.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_error)?;
    let updated = pair
        .as_ref()
        .map(rows::aggregate)
        .transpose()?
        .unwrap_or_default()
        .fold(review.rating);

    let profile = sqlx::query("UPDATE service_providers SET rating = $2 WHERE provider_id = $1")
        .bind(review.provider_id.as_str())
        .bind(updated.avg_rating)
        .execute(&mut *conn)
        .await
        .map_err(location_failed(RatingLocation::ProviderProfile))?;
    if profile.rows_affected() == 0 {
        return Err(ServiceError::RatingUpdateFailed {
            location: RatingLocation::ProviderProfile,
            reason: "no provider profile".to_string(),
        });
    }

    sqlx::query(
        r"
        INSERT INTO service_providers_services (provider_id, service_id, avg_rating, rating_count)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (provider_id, service_id)
        DO UPDATE SET avg_rating = EXCLUDED.avg_rating, rating_count = EXCLUDED.rating_count
        ",
    )
    .bind(review.provider_id.as_str())
    .bind(review.service_id.as_str())
    .bind(updated.avg_rating)
    .bind(updated.rating_count)
    .execute(&mut *conn)
    .await
    .map_err(location_failed(RatingLocation::ProviderListing))?;

    sqlx::query("UPDATE services SET avg_rating = $2, rating_count = $3 WHERE id = $1")
        .bind(review.service_id.as_str())
        .bind(updated.avg_rating)
        .bind(updated.rating_count)
        .execute(&mut *conn)
        .await
        .map_err(location_failed(RatingLocation::ServiceAggregate))?;

    Ok(updated)
}

impl RatingLedger for PostgresStore {
    fn aggregate(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
    ) -> impl Future<Output = Result<RatingAggregate>> + Send {
        async move {
            let row = sqlx::query(
                r"
                SELECT avg_rating, rating_count FROM service_providers_services
                WHERE provider_id = $1 AND service_id = $2
                ",
            )
            .bind(provider_id.as_str())
            .bind(service_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| {
                ServiceError::not_found(
                    Entity::RatingAggregate,
                    format!("{provider_id}/{service_id}"),
                )
            })?;

            rows::aggregate(&row)
        }
    }

    fn record_review(&self, review: &Review) -> impl Future<Output = Result<RatingAggregate>> + Send {
        async move {
            let mut tx = self.begin().await?;
            let outcome = review_writes(&mut tx, review).await;
            let aggregate = finish(tx, "record_review", outcome).await?;

            tracing::debug!(
                provider_id = %review.provider_id,
                service_id = %review.service_id,
                avg_rating = aggregate.avg_rating,
                rating_count = aggregate.rating_count,
                "Review recorded"
            );
            Ok(aggregate)
        }
    }

    fn reviews(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> impl Future<Output = Result<Vec<Review>>> + Send {
        async move {
            let found = sqlx::query(&format!(
                r"
                SELECT {REVIEW_COLUMNS} FROM reviews
                WHERE provider_id = $1 AND ($2::TEXT IS NULL OR service_id = $2)
                ORDER BY reviewed_at DESC, id DESC
                LIMIT $3 OFFSET $4
                "
            ))
            .bind(provider_id.as_str())
            .bind(service_id.map(ServiceId::as_str))
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

            found
                .iter()
                .map(|row| rows::review(row, self.timezone))
                .collect()
        }
    }
}
