//! Shared types for the pickup-point service.
//!
//! - Strongly-typed identifiers for every entity
//! - The closed vocabularies (cities, product types, reception status, roles)
//!   together with their wire spellings

pub mod types;
pub mod vocab;

pub use types::{ProductId, PvzId, ReceptionId, UserId};
pub use vocab::{City, ParseVocabError, ProductType, ReceptionStatus, Role};
