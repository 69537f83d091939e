//! Domain layer for the pickup-point service.
//!
//! This crate provides the business rules on top of the storage gateway:
//! - [`ReceptionService`]: the open/close state machine per pickup point
//! - [`ProductService`]: append and "last-in" removal against an open reception
//! - [`PvzService`]: pickup-point registration and the paginated nested listing
//! - [`AuthService`]: account registration and credential checks
//!
//! Services are stateless apart from their store handle and perform no
//! authorization; callers check roles before invoking them.

pub mod auth;
pub mod error;
pub mod listing;
pub mod password;
pub mod product;
pub mod pvz;
pub mod reception;

pub use auth::AuthService;
pub use error::DomainError;
pub use listing::{PvzTreeBuilder, PvzWithReceptions, ReceptionWithProducts, fold_rows};
pub use password::{MIN_PASSWORD_COST, PASSWORD_COST};
pub use product::ProductService;
pub use pvz::{ListPvzParams, MAX_PAGE_LIMIT, PvzService};
pub use reception::ReceptionService;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
