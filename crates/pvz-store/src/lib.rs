//! Storage gateway for the pickup-point service.
//!
//! Executes parameterized reads and writes against the relational store and
//! owns no business rules. One trait per entity, each implemented by
//! [`PostgresStore`] and by [`InMemoryStore`] for tests.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use record::{JoinedRow, PickupPoint, Product, PvzPageQuery, Reception, User};
pub use store::{JoinedRowStream, PickupPointStore, ProductStore, ReceptionStore, UserStore};
