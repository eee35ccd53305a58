//! Read-side operations for householders, providers and the administrator.

use super::engine::LifecycleEngine;
use crate::error::Result;
use crate::providers::{Directory, Page, RatingLedger, RequestFilter, RequestStore, SortOrder};
use crate::rating::RatingAggregate;
use crate::types::{
    HouseholderId, ProviderId, RequestId, RequestStatus, Review, ServiceId, ServiceRequest,
};
use tracing::{debug, info};

impl<R, D, L> LifecycleEngine<R, D, L>
where
    R: RequestStore,
    D: Directory,
    L: RatingLedger,
{
    /// Current status of a request.
    ///
    /// # Errors
    ///
    /// `NotFound` if the request does not exist.
    pub async fn request_status(&self, request_id: &RequestId) -> Result<RequestStatus> {
        Ok(self.store.get(request_id).await?.status)
    }

    /// A single request with its offers.
    ///
    /// # Errors
    ///
    /// `NotFound` if the request does not exist.
    pub async fn request(&self, request_id: &RequestId) -> Result<ServiceRequest> {
        self.store.get(request_id).await
    }

    /// A householder's requests, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// `Storage` if the query fails.
    pub async fn booking_history(
        &self,
        householder_id: &HouseholderId,
        filter: &RequestFilter,
    ) -> Result<Vec<ServiceRequest>> {
        let requests = self
            .store
            .list_by_householder(householder_id, filter)
            .await?;
        debug!(householder_id = %householder_id, count = requests.len(), "Booking history loaded");
        Ok(requests)
    }

    /// A householder's approved requests. An empty list is not an error.
    ///
    /// # Errors
    ///
    /// `Storage` if the query fails.
    pub async fn approved_requests(
        &self,
        householder_id: &HouseholderId,
        page: Page,
        sort: SortOrder,
    ) -> Result<Vec<ServiceRequest>> {
        let filter = RequestFilter::all(&self.env.config)
            .with_status(RequestStatus::Approved)
            .approved()
            .with_page(page)
            .with_sort(sort);
        self.store.list_by_householder(householder_id, &filter).await
    }

    /// Requests the provider can still make an offer on.
    ///
    /// # Errors
    ///
    /// `Storage` if the query fails.
    pub async fn open_requests_for_provider(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> Result<Vec<ServiceRequest>> {
        self.store
            .list_open_for_provider(provider_id, service_id, page)
            .await
    }

    /// Requests where this provider's offer was approved.
    ///
    /// # Errors
    ///
    /// `Storage` if the query fails.
    pub async fn approved_requests_for_provider(
        &self,
        provider_id: &ProviderId,
        page: Page,
        sort: SortOrder,
    ) -> Result<Vec<ServiceRequest>> {
        let filter = RequestFilter::all(&self.env.config)
            .approved()
            .with_page(page)
            .with_sort(sort);
        self.store.list_by_provider(provider_id, &filter).await
    }

    /// Running rating for a (provider, service) pair.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pair has never been rated.
    pub async fn rating(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
    ) -> Result<RatingAggregate> {
        self.ratings.ledger().aggregate(provider_id, service_id).await
    }

    /// Reviews for a provider, optionally for one service.
    ///
    /// # Errors
    ///
    /// `Storage` if the query fails.
    pub async fn reviews(
        &self,
        provider_id: &ProviderId,
        service_id: Option<&ServiceId>,
        page: Page,
    ) -> Result<Vec<Review>> {
        self.ratings
            .ledger()
            .reviews(provider_id, service_id, page)
            .await
    }

    /// Every request with its offers, newest first.
    ///
    /// # Errors
    ///
    /// `Storage` if the query fails.
    pub async fn admin_reports(&self, page: Page) -> Result<Vec<ServiceRequest>> {
        self.store.list_all(page).await
    }

    /// Delete a service listing. Requests and offers that refer to it are kept.
    ///
    /// # Errors
    ///
    /// `NotFound` if the service does not exist.
    pub async fn admin_remove_service(&self, service_id: &ServiceId) -> Result<()> {
        self.directory.remove_service(service_id).await?;
        metrics::counter!("service.removed").increment(1);
        info!(service_id = %service_id, "Service removed");
        Ok(())
    }
}
