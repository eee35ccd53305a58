//! [`Directory`] over the account and catalogue tables.

use crate::{PostgresStore, storage_error};
use homeservice_core::{
    Directory, Entity, HouseholderId, HouseholderProfile, ProviderId, ProviderProfile,
    ProviderSnapshot, Result, ServiceError, ServiceId,
};
use sqlx::Row;
use std::future::Future;

impl Directory for PostgresStore {
    fn resolve_category(
        &self,
        category: &str,
    ) -> impl Future<Output = Result<Option<ServiceId>>> + Send {
        async move {
            let service: Option<(String,)> =
                sqlx::query_as("SELECT service_id FROM service_categories WHERE name = $1")
                    .bind(category)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(storage_error)?;

            Ok(service.map(|(id,)| ServiceId::new(id)))
        }
    }

    fn householder(
        &self,
        householder_id: &HouseholderId,
    ) -> impl Future<Output = Result<HouseholderProfile>> + Send {
        async move {
            let (name, address, contact): (String, Option<String>, String) = sqlx::query_as(
                "SELECT name, address, contact FROM householders WHERE id = $1",
            )
            .bind(householder_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| ServiceError::not_found(Entity::Householder, householder_id))?;

            Ok(HouseholderProfile {
                name,
                address,
                contact,
            })
        }
    }

    fn ensure_provider_profile(
        &self,
        provider_id: &ProviderId,
    ) -> impl Future<Output = Result<ProviderProfile>> + Send {
        async move {
            let account = sqlx::query("SELECT 1 FROM provider_accounts WHERE id = $1")
                .bind(provider_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
            if account.is_none() {
                return Err(ServiceError::ProviderNotRegistered);
            }

            let provisioned = ProviderProfile::provisioned(provider_id.clone());
            let inserted = sqlx::query(
                r"
                INSERT INTO service_providers (provider_id, rating, availability, is_active)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (provider_id) DO NOTHING
                ",
            )
            .bind(provider_id.as_str())
            .bind(provisioned.rating)
            .bind(provisioned.availability)
            .bind(provisioned.is_active)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

            if inserted.rows_affected() > 0 {
                tracing::info!(provider_id = %provider_id, "Provider profile provisioned");
                return Ok(provisioned);
            }

            let row = sqlx::query(
                "SELECT rating, availability, is_active FROM service_providers WHERE provider_id = $1",
            )
            .bind(provider_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;

            Ok(ProviderProfile {
                provider_id: provider_id.clone(),
                rating: row.try_get("rating").map_err(storage_error)?,
                availability: row.try_get("availability").map_err(storage_error)?,
                is_active: row.try_get("is_active").map_err(storage_error)?,
            })
        }
    }

    fn provider_snapshot(
        &self,
        provider_id: &ProviderId,
        service_id: &ServiceId,
    ) -> impl Future<Output = Result<ProviderSnapshot>> + Send {
        async move {
            let row = sqlx::query(
                r"
                SELECT a.name, a.contact, a.address,
                       COALESCE(l.avg_rating, p.rating, 0) AS rating,
                       l.price
                FROM provider_accounts a
                LEFT JOIN service_providers p ON p.provider_id = a.id
                LEFT JOIN service_providers_services l
                       ON l.provider_id = a.id AND l.service_id = $2
                WHERE a.id = $1
                ",
            )
            .bind(provider_id.as_str())
            .bind(service_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| ServiceError::not_found(Entity::Provider, provider_id))?;

            Ok(ProviderSnapshot {
                name: row.try_get("name").map_err(storage_error)?,
                contact: row.try_get("contact").map_err(storage_error)?,
                address: row.try_get("address").map_err(storage_error)?,
                rating: row.try_get("rating").map_err(storage_error)?,
                price_basis: row.try_get("price").map_err(storage_error)?,
            })
        }
    }

    fn remove_service(&self, service_id: &ServiceId) -> impl Future<Output = Result<()>> + Send {
        // Category links and listings cascade; requests and reviews keep the ID
        async move {
            let removed = sqlx::query("DELETE FROM services WHERE id = $1")
                .bind(service_id.as_str())
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;

            if removed.rows_affected() == 0 {
                return Err(ServiceError::not_found(Entity::Service, service_id));
            }
            Ok(())
        }
    }
}
