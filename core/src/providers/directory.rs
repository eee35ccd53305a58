//! Provider and service directory trait.

use super::{HouseholderProfile, ProviderProfile, ProviderSnapshot};
use crate::error::Result;
use crate::types::{HouseholderId, ProviderId, ServiceId};

/// Read access to categories, householders and providers, plus the two
/// directory writes the lifecycle needs.
pub trait Directory: Send + Sync {
    /// Service mapped to a category name, if any.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the lookup fails.
    fn resolve_category(
        &self,
        category: &str,
    ) -> impl std::future::Future<Output = Result<Option<ServiceId>>> + Send;

    /// Householder fields to snapshot onto a new request.
    ///
    /// # Errors
    ///
    /// - Unknown householder → `ServiceError::NotFound`
    /// - Storage failure → `ServiceError::Storage`
    fn householder(
        &self,
        householder_id: &HouseholderId,
    ) -> impl std::future::Future<Output = Result<HouseholderProfile>> + Send;

    /// The provider's profile, provisioned with rating 0 and availability
    /// on if the provider account exists but has no profile yet.
    ///
    /// # Errors
    ///
    /// - No provider account → `ServiceError::ProviderNotRegistered`
    /// - Storage failure → `ServiceError::Storage`
    fn ensure_provider_profile(
        &self,
        provider_id: &ProviderId,
    ) -> impl std::future::Future<Output = Result<ProviderProfile>> + Send;

    /// Current provider fields for an offer on `service_id`.
    ///
    /// # Errors
    ///
    /// - Unknown provider → `ServiceError::NotFound`
    /// - Storage failure → `ServiceError::Storage`
    fn provider_snapshot(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
    ) -> impl std::future::Future<Output = Result<ProviderSnapshot>> + Send;

    /// Delete a service listing and its category links. Requests and offers
    /// referring to it are kept.
    ///
    /// # Errors
    ///
    /// - Unknown service → `ServiceError::NotFound`
    /// - Storage failure → `ServiceError::Storage`
    fn remove_service(
        &self,
        service_id: &ServiceId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
