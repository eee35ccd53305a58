//! Request store trait.

use super::{Page, RequestFilter};
use crate::error::Result;
use crate::types::{
    HouseholderId, Offer, ProviderId, RequestId, RequestStatus, ServiceId, ServiceRequest,
};

/// Durable record of service requests and their offers.
///
/// Every write is a single conditional statement or a single transaction.
/// No lock is held between calls.
pub trait RequestStore: Send + Sync {
    /// Load a request with its offers in submission order.
    ///
    /// # Errors
    ///
    /// - Request not found → `ServiceError::NotFound`
    /// - Storage failure → `ServiceError::Storage`
    fn get(
        &self,
        id: &RequestId,
    ) -> impl std::future::Future<Output = Result<ServiceRequest>> + Send;

    /// Insert a new request.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the insert fails or the ID exists.
    fn save(
        &self,
        request: &ServiceRequest,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Write the request's status, approve flag and scheduled time, provided
    /// the stored status is still `expected_status`.
    ///
    /// # Errors
    ///
    /// - Stored status differs → `ServiceError::ConcurrentModification`
    /// - Request not found → `ServiceError::NotFound`
    /// - Storage failure → `ServiceError::Storage`
    fn update(
        &self,
        request: &ServiceRequest,
        expected_status: RequestStatus,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Insert `offer` and write the request's new status in one atomic unit.
    ///
    /// # Errors
    ///
    /// - An approval committed first → `ServiceError::AlreadyApproved`
    /// - Provider already has an offer → `ServiceError::OfferAlreadySubmitted`
    /// - Storage failure → `ServiceError::Storage` (nothing written)
    fn record_offer(
        &self,
        request: &ServiceRequest,
        offer: &Offer,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Mark the request `Approved` and flip the provider's offer flag in one
    /// transaction. Either write failing rolls back both.
    ///
    /// # Errors
    ///
    /// - Request already approved → `ServiceError::AlreadyApproved`
    /// - No offer from `provider_id` → `ServiceError::NotFound`
    /// - Storage failure → `ServiceError::Storage` (nothing written)
    fn commit_approval(
        &self,
        request_id: &RequestId,
        provider_id: &ProviderId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// A householder's requests.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the query fails.
    fn list_by_householder(
        &self,
        householder_id: &HouseholderId,
        filter: &RequestFilter,
    ) -> impl std::future::Future<Output = Result<Vec<ServiceRequest>>> + Send;

    /// Requests the provider holds an offer on. With `approved_only`, only
    /// those where the provider's own offer was approved.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the query fails.
    fn list_by_provider(
        &self,
        provider_id: &ProviderId,
        filter: &RequestFilter,
    ) -> impl std::future::Future<Output = Result<Vec<ServiceRequest>>> + Send;

    /// Open, unapproved requests the provider has not yet made an offer on,
    /// optionally restricted to one service.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the query fails.
    fn list_open_for_provider(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> impl std::future::Future<Output = Result<Vec<ServiceRequest>>> + Send;

    /// Every request, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the query fails.
    fn list_all(
        &self,
        page: Page,
    ) -> impl std::future::Future<Output = Result<Vec<ServiceRequest>>> + Send;
}
