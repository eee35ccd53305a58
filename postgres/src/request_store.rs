//! [`RequestStore`] over `service_requests` and `service_request_offers`.

use crate::rows::{self, OFFER_COLUMNS, REQUEST_COLUMNS};
use crate::{PostgresStore, finish, storage_error};
use chrono::Utc;
use homeservice_core::{
    Entity, HouseholderId, Offer, Page, ProviderId, RequestFilter, RequestId, RequestStatus,
    RequestStore, Result, ServiceError, ServiceId, ServiceRequest,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use std::future::Future;

impl PostgresStore {
    /// Decode request rows and load their offers in one extra query.
    async fn hydrate(&self, found: Vec<PgRow>) -> Result<Vec<ServiceRequest>> {
        let mut requests = found
            .iter()
            .map(|row| rows::request(row, self.timezone))
            .collect::<Result<Vec<_>>>()?;
        if requests.is_empty() {
            return Ok(requests);
        }

        let ids: Vec<String> = requests.iter().map(|r| r.id.to_string()).collect();
        let offer_rows = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM service_request_offers \
             WHERE request_id = ANY($1) ORDER BY position ASC"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows::attach_offers(&mut requests, &offer_rows)?;
        Ok(requests)
    }

    async fn request_exists(conn: &mut PgConnection, id: &RequestId) -> Result<bool> {
        let found = sqlx::query("SELECT 1 FROM service_requests WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(storage_error)?;
        Ok(found.is_some())
    }
}

async fn insert_offer(conn: &mut PgConnection, request_id: &RequestId, offer: &Offer) -> Result<u64> {
    let result = sqlx::query(
        r"
        INSERT INTO service_request_offers (
            id, request_id, provider_id, provider_name, provider_contact,
            provider_address, price, provider_rating, approved, offered_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (request_id, provider_id) DO NOTHING
        ",
    )
    .bind(offer.id.as_str())
    .bind(request_id.as_str())
    .bind(offer.provider_id.as_str())
    .bind(&offer.provider_name)
    .bind(&offer.provider_contact)
    .bind(&offer.provider_address)
    .bind(offer.price.as_str())
    .bind(offer.provider_rating)
    .bind(offer.approved)
    .bind(offer.offered_at)
    .execute(&mut *conn)
    .await
    .map_err(storage_error)?;

    Ok(result.rows_affected())
}

async fn insert_request(conn: &mut PgConnection, request: &ServiceRequest) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO service_requests (
            id, householder_id, householder_name, householder_address,
            householder_contact, category, service_name, service_id, description,
            requested_at, scheduled_at, status, approve_status
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ",
    )
    .bind(request.id.as_str())
    .bind(request.householder_id.as_ref().map(HouseholderId::as_str))
    .bind(&request.householder_name)
    .bind(request.householder_address.as_deref())
    .bind(&request.householder_contact)
    .bind(&request.category)
    .bind(&request.service_name)
    .bind(request.service_id.as_str())
    .bind(&request.description)
    .bind(request.requested_at.with_timezone(&Utc))
    .bind(request.scheduled_at.with_timezone(&Utc))
    .bind(request.status.as_str())
    .bind(request.approve_status)
    .execute(&mut *conn)
    .await
    .map_err(storage_error)?;

    for offer in &request.offers {
        insert_offer(conn, &request.id, offer).await?;
    }
    Ok(())
}

async fn offer_writes(
    conn: &mut PgConnection,
    request: &ServiceRequest,
    offer: &Offer,
) -> Result<()> {
    let row = sqlx::query(
        "SELECT status, approve_status FROM service_requests WHERE id = $1 FOR UPDATE",
    )
    .bind(request.id.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_error)?
    .ok_or_else(|| ServiceError::not_found(Entity::Request, &request.id))?;

    let approved: bool = row.try_get("approve_status").map_err(storage_error)?;
    if approved {
        return Err(ServiceError::AlreadyApproved);
    }
    let status: String = row.try_get("status").map_err(storage_error)?;
    if !RequestStatus::parse(&status)?.is_open() {
        return Err(ServiceError::ConcurrentModification);
    }

    if insert_offer(conn, &request.id, offer).await? == 0 {
        return Err(ServiceError::OfferAlreadySubmitted);
    }

    sqlx::query("UPDATE service_requests SET status = $2 WHERE id = $1")
        .bind(request.id.as_str())
        .bind(request.status.as_str())
        .execute(&mut *conn)
        .await
        .map_err(storage_error)?;
    Ok(())
}

async fn approval_writes(
    conn: &mut PgConnection,
    request_id: &RequestId,
    provider_id: &ProviderId,
) -> Result<()> {
    let updated = sqlx::query(
        r"
        UPDATE service_requests
        SET approve_status = TRUE, status = $2
        WHERE id = $1 AND approve_status = FALSE
        ",
    )
    .bind(request_id.as_str())
    .bind(RequestStatus::Approved.as_str())
    .execute(&mut *conn)
    .await
    .map_err(storage_error)?;

    if updated.rows_affected() == 0 {
        return if PostgresStore::request_exists(conn, request_id).await? {
            Err(ServiceError::AlreadyApproved)
        } else {
            Err(ServiceError::not_found(Entity::Request, request_id))
        };
    }

    let flagged = sqlx::query(
        r"
        UPDATE service_request_offers
        SET approved = TRUE
        WHERE request_id = $1 AND provider_id = $2
        ",
    )
    .bind(request_id.as_str())
    .bind(provider_id.as_str())
    .execute(&mut *conn)
    .await
    .map_err(storage_error)?;

    if flagged.rows_affected() == 0 {
        return Err(ServiceError::not_found(Entity::Offer, provider_id));
    }
    Ok(())
}

impl RequestStore for PostgresStore {
    fn get(&self, id: &RequestId) -> impl Future<Output = Result<ServiceRequest>> + Send {
        async move {
            let row = sqlx::query(&format!(
                "SELECT {REQUEST_COLUMNS} FROM service_requests r WHERE r.id = $1"
            ))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| ServiceError::not_found(Entity::Request, id))?;

            self.hydrate(vec![row])
                .await?
                .pop()
                .ok_or_else(|| ServiceError::not_found(Entity::Request, id))
        }
    }

    fn save(&self, request: &ServiceRequest) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut tx = self.begin().await?;
            let outcome = insert_request(&mut tx, request).await;
            finish(tx, "save_request", outcome).await?;

            tracing::debug!(request_id = %request.id, "Request stored");
            Ok(())
        }
    }

    fn update(
        &self,
        request: &ServiceRequest,
        expected_status: RequestStatus,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let result = sqlx::query(
                r"
                UPDATE service_requests
                SET status = $2, approve_status = $3, scheduled_at = $4
                WHERE id = $1 AND status = $5
                ",
            )
            .bind(request.id.as_str())
            .bind(request.status.as_str())
            .bind(request.approve_status)
            .bind(request.scheduled_at.with_timezone(&Utc))
            .bind(expected_status.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

            if result.rows_affected() > 0 {
                return Ok(());
            }

            let mut conn = self.pool.acquire().await.map_err(storage_error)?;
            if Self::request_exists(&mut conn, &request.id).await? {
                tracing::warn!(
                    request_id = %request.id,
                    expected = %expected_status,
                    "Conditional update found a different status"
                );
                Err(ServiceError::ConcurrentModification)
            } else {
                Err(ServiceError::not_found(Entity::Request, &request.id))
            }
        }
    }

    fn record_offer(
        &self,
        request: &ServiceRequest,
        offer: &Offer,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut tx = self.begin().await?;
            let outcome = offer_writes(&mut tx, request, offer).await;
            finish(tx, "record_offer", outcome).await
        }
    }

    fn commit_approval(
        &self,
        request_id: &RequestId,
        provider_id: &ProviderId,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut tx = self.begin().await?;
            let outcome = approval_writes(&mut tx, request_id, provider_id).await;
            finish(tx, "commit_approval", outcome).await
        }
    }

    fn list_by_householder(
        &self,
        householder_id: &HouseholderId,
        filter: &RequestFilter,
    ) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        async move {
            let order = filter.sort.as_sql();
            let rows = sqlx::query(&format!(
                r"
                SELECT {REQUEST_COLUMNS} FROM service_requests r
                WHERE r.householder_id = $1
                  AND ($2::TEXT IS NULL OR r.status = $2)
                  AND (NOT $3 OR r.approve_status)
                ORDER BY r.scheduled_at {order}, r.id {order}
                LIMIT $4 OFFSET $5
                "
            ))
            .bind(householder_id.as_str())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.approved_only)
            .bind(i64::from(filter.page.limit))
            .bind(i64::from(filter.page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

            self.hydrate(rows).await
        }
    }

    fn list_by_provider(
        &self,
        provider_id: &ProviderId,
        filter: &RequestFilter,
    ) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        async move {
            let order = filter.sort.as_sql();
            let rows = sqlx::query(&format!(
                r"
                SELECT {REQUEST_COLUMNS} FROM service_requests r
                JOIN service_request_offers o ON o.request_id = r.id
                WHERE o.provider_id = $1
                  AND ($2::TEXT IS NULL OR r.status = $2)
                  AND (NOT $3 OR o.approved)
                ORDER BY r.scheduled_at {order}, r.id {order}
                LIMIT $4 OFFSET $5
                "
            ))
            .bind(provider_id.as_str())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.approved_only)
            .bind(i64::from(filter.page.limit))
            .bind(i64::from(filter.page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

            self.hydrate(rows).await
        }
    }

    fn list_open_for_provider(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {REQUEST_COLUMNS} FROM service_requests r
                WHERE r.status IN ($2, $3)
                  AND NOT r.approve_status
                  AND ($4::TEXT IS NULL OR r.service_id = $4)
                  AND NOT EXISTS (
                      SELECT 1 FROM service_request_offers o
                      WHERE o.request_id = r.id AND o.provider_id = $1
                  )
                ORDER BY r.scheduled_at ASC, r.id ASC
                LIMIT $5 OFFSET $6
                "
            ))
            .bind(provider_id.as_str())
            .bind(RequestStatus::Pending.as_str())
            .bind(RequestStatus::Accepted.as_str())
            .bind(service_id.map(ServiceId::as_str))
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

            self.hydrate(rows).await
        }
    }

    fn list_all(&self, page: Page) -> impl Future<Output = Result<Vec<ServiceRequest>>> + Send {
        async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {REQUEST_COLUMNS} FROM service_requests r
                ORDER BY r.requested_at DESC, r.id DESC
                LIMIT $1 OFFSET $2
                "
            ))
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

            self.hydrate(rows).await
        }
    }
}
