//! Service request lifecycle.
//!
//! # Architecture
//!
//! ```text
//! actor action ──► LifecycleEngine
//!                    │ load request (RequestStore::get)
//!                    ▼
//!                  RequestLifecycleReducer::decide   guards only, no writes
//!                    │
//!                    ▼
//!                  RequestLifecycleReducer::apply    in-memory update
//!                    │
//!                    ├─ accept/approve ──► OfferManager ──► one transaction
//!                    └─ other          ──► RequestStore::update (conditional)
//! ```
//!
//! # State machine
//!
//! | From       | Action          | To        | Guard                                  |
//! |------------|-----------------|-----------|----------------------------------------|
//! | Pending    | accept          | Accepted  | not approved, no offer from provider   |
//! | Accepted   | accept          | Accepted  | not approved, no offer from provider   |
//! | Pending    | decline         | Declined  | status is exactly `Pending`            |
//! | Pending/Accepted | approve   | Approved  | owner, not approved, offer exists      |
//! | Pending/Accepted | cancel    | Cancelled | owner, at least lead time before slot  |
//! | Accepted   | cancel_accepted | Cancelled | owner                                  |
//! | Pending/Accepted | reschedule| unchanged | owner                                  |

pub mod actions;
pub mod engine;
pub mod environment;
mod queries;
pub mod reducer;
#[cfg(test)]
mod tests;

pub use actions::{NewServiceRequest, RequestAction, RequestEvent};
pub use engine::LifecycleEngine;
pub use environment::LifecycleEnvironment;
pub use reducer::RequestLifecycleReducer;
