//! Row decoding.

use crate::storage_error;
use chrono::{DateTime, FixedOffset, Utc};
use homeservice_core::{
    HouseholderId, Offer, OfferId, ProviderId, Quote, RatingAggregate, RequestId, RequestStatus,
    Result, Review, ReviewId, ServiceError, ServiceId, ServiceRequest,
};
use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};
use std::collections::HashMap;

pub(crate) const REQUEST_COLUMNS: &str = "r.id, r.householder_id, r.householder_name, \
     r.householder_address, r.householder_contact, r.category, r.service_name, r.service_id, \
     r.description, r.requested_at, r.scheduled_at, r.status, r.approve_status";

pub(crate) const OFFER_COLUMNS: &str = "id, request_id, provider_id, provider_name, \
     provider_contact, provider_address, price, provider_rating, approved, offered_at";

pub(crate) const REVIEW_COLUMNS: &str =
    "id, provider_id, service_id, householder_id, rating, comments, reviewed_at";

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name).map_err(storage_error)
}

fn local(row: &PgRow, name: &str, timezone: FixedOffset) -> Result<DateTime<FixedOffset>> {
    column::<DateTime<Utc>>(row, name).map(|at| at.with_timezone(&timezone))
}

/// A request row with no offers attached yet.
pub(crate) fn request(row: &PgRow, timezone: FixedOffset) -> Result<ServiceRequest> {
    let status: String = column(row, "status")?;

    Ok(ServiceRequest {
        id: RequestId::new(column::<String>(row, "id")?),
        householder_id: column::<Option<String>>(row, "householder_id")?.map(HouseholderId::new),
        householder_name: column(row, "householder_name")?,
        householder_address: column(row, "householder_address")?,
        householder_contact: column(row, "householder_contact")?,
        category: column(row, "category")?,
        service_name: column(row, "service_name")?,
        service_id: ServiceId::new(column::<String>(row, "service_id")?),
        description: column(row, "description")?,
        requested_at: local(row, "requested_at", timezone)?,
        scheduled_at: local(row, "scheduled_at", timezone)?,
        status: RequestStatus::parse(&status)?,
        approve_status: column(row, "approve_status")?,
        offers: Vec::new(),
    })
}

/// An offer row with the request it belongs to.
pub(crate) fn offer(row: &PgRow) -> Result<(RequestId, Offer)> {
    let price: String = column(row, "price")?;
    let price = Quote::parse(&price)
        .map_err(|_| ServiceError::Storage(format!("Blank stored quote: {price:?}")))?;

    Ok((
        RequestId::new(column::<String>(row, "request_id")?),
        Offer {
            id: OfferId::new(column::<String>(row, "id")?),
            provider_id: ProviderId::new(column::<String>(row, "provider_id")?),
            provider_name: column(row, "provider_name")?,
            provider_contact: column(row, "provider_contact")?,
            provider_address: column(row, "provider_address")?,
            price,
            provider_rating: column(row, "provider_rating")?,
            approved: column(row, "approved")?,
            offered_at: column(row, "offered_at")?,
        },
    ))
}

pub(crate) fn review(row: &PgRow, timezone: FixedOffset) -> Result<Review> {
    Ok(Review {
        id: ReviewId::new(column::<String>(row, "id")?),
        provider_id: ProviderId::new(column::<String>(row, "provider_id")?),
        service_id: ServiceId::new(column::<String>(row, "service_id")?),
        householder_id: HouseholderId::new(column::<String>(row, "householder_id")?),
        rating: column(row, "rating")?,
        comments: column(row, "comments")?,
        reviewed_at: local(row, "reviewed_at", timezone)?,
    })
}

pub(crate) fn aggregate(row: &PgRow) -> Result<RatingAggregate> {
    Ok(RatingAggregate::new(
        column(row, "avg_rating")?,
        column(row, "rating_count")?,
    ))
}

/// Distribute offer rows, already in submission order, onto their requests.
pub(crate) fn attach_offers(
    requests: &mut [ServiceRequest],
    offer_rows: &[PgRow],
) -> Result<()> {
    let mut by_request: HashMap<RequestId, Vec<Offer>> = HashMap::new();
    for row in offer_rows {
        let (request_id, offer) = offer(row)?;
        by_request.entry(request_id).or_default().push(offer);
    }
    for request in requests {
        if let Some(offers) = by_request.remove(&request.id) {
            request.offers = offers;
        }
    }
    Ok(())
}
