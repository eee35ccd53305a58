//! # Homeservice Core
//!
//! Service request lifecycle and rating engine for a household services
//! broker.
//!
//! Householders post requests for a service category at a scheduled time.
//! Providers answer with quoted offers; the householder approves exactly one.
//! After the job, householders review providers and the review is folded into
//! a running average rating.
//!
//! ## Components
//!
//! - **[`LifecycleEngine`]**: entry point for every actor action
//! - **[`RequestLifecycleReducer`]**: pure state-machine guards and event
//!   application
//! - **[`OfferManager`]**: competing offers and single-approval exclusivity
//! - **[`RatingAggregator`]**: incremental running-average fold
//! - **[`providers`]**: storage and directory traits the engine depends on
//!
//! ## Example
//!
//! ```ignore
//! use homeservice_core::*;
//!
//! let env = LifecycleEnvironment::production(LifecycleConfig::from_env());
//! let engine = LifecycleEngine::new(store.clone(), store.clone(), store, env);
//!
//! let request = engine.create_request(&householder, NewServiceRequest {
//!     category: "Plumbing".into(),
//!     service_name: "Plumbing".into(),
//!     description: "Leaking kitchen tap".into(),
//!     scheduled_at,
//! }).await?;
//!
//! engine.accept_request(&request.id, &provider, "450").await?;
//! engine.approve_request(&request.id, &householder, &provider).await?;
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod offers;
pub mod providers;
pub mod rating;
pub mod types;

pub use config::LifecycleConfig;
pub use environment::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
pub use error::{Entity, RatingLocation, Result, ServiceError, TransitionRule};
pub use lifecycle::{
    LifecycleEngine, LifecycleEnvironment, NewServiceRequest, RequestAction, RequestEvent,
    RequestLifecycleReducer,
};
pub use offers::OfferManager;
pub use providers::{
    Directory, HouseholderProfile, Page, ProviderProfile, ProviderSnapshot, RatingLedger,
    RequestFilter, RequestStore, SortOrder,
};
pub use rating::{NewReview, RatingAggregate, RatingAggregator};
pub use types::{
    HouseholderId, Offer, OfferId, ProviderId, Quote, RequestId, RequestStatus, Review, ReviewId,
    ServiceId, ServiceRequest,
};
