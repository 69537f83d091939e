use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{City, ProductId, ProductType, PvzId, ReceptionId, ReceptionStatus, Role, UserId};
use futures_core::Stream;

use crate::{JoinedRow, PickupPoint, Product, PvzPageQuery, Reception, Result, User};

/// A stream of joined listing rows, possibly borrowing the store's connection pool.
pub type JoinedRowStream<'a> = Pin<Box<dyn Stream<Item = Result<JoinedRow>> + Send + 'a>>;

/// Persistence for pickup points.
#[async_trait]
pub trait PickupPointStore: Send + Sync {
    /// Inserts a pickup point. The registration date is assigned by the store.
    async fn insert_pickup_point(&self, id: PvzId, city: City) -> Result<()>;

    /// Retrieves a pickup point by id.
    async fn get_pickup_point(&self, id: PvzId) -> Result<Option<PickupPoint>>;

    /// Lists pickup points without relations, oldest registration first.
    ///
    /// `limit = None` returns every pickup point.
    async fn list_pickup_points(&self, limit: Option<i64>, offset: i64)
    -> Result<Vec<PickupPoint>>;

    /// Streams the left join of a page of pickup points with their receptions
    /// and products.
    ///
    /// The page is cut over distinct pickup points before the join, so every
    /// reception and product of a selected pickup point is present and none
    /// of an unselected one is.
    async fn query_pickup_points_joined<'a>(
        &'a self,
        query: PvzPageQuery,
    ) -> Result<JoinedRowStream<'a>>;
}

/// Persistence for reception sessions.
#[async_trait]
pub trait ReceptionStore: Send + Sync {
    /// Returns the reception in progress for a pickup point, if any.
    async fn find_open_reception(&self, pvz_id: PvzId) -> Result<Option<Reception>>;

    /// Returns true if the pickup point has a reception in progress.
    async fn has_open_reception(&self, pvz_id: PvzId) -> Result<bool>;

    /// Inserts a reception.
    ///
    /// Fails with `OpenReceptionExists` if an in-progress reception would be
    /// the second one for the pickup point, and with `MissingParent` if the
    /// pickup point does not exist.
    async fn insert_reception(
        &self,
        id: ReceptionId,
        pvz_id: PvzId,
        status: ReceptionStatus,
        created_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Retrieves a reception by id.
    async fn get_reception(&self, id: ReceptionId) -> Result<Option<Reception>>;

    /// Closes an in-progress reception. Returns the number of rows affected,
    /// zero if the reception was not in progress.
    async fn update_reception_close(&self, id: ReceptionId, closed_at: DateTime<Utc>)
    -> Result<u64>;
}

/// Persistence for received products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts a product. The creation time is assigned by the store.
    ///
    /// Fails with `ReceptionClosed` unless the reception is still in progress
    /// when the row is written.
    async fn insert_product(
        &self,
        id: ProductId,
        reception_id: ReceptionId,
        product_type: ProductType,
    ) -> Result<()>;

    /// Retrieves a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Returns the most recently created product of a reception.
    ///
    /// Ties on creation time are broken by the larger id.
    async fn find_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>>;

    /// Deletes a product. Returns the number of rows affected.
    ///
    /// Fails with `ReceptionClosed` if the product's reception has been closed.
    async fn delete_product(&self, id: ProductId) -> Result<u64>;
}

/// Persistence for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with `EmailTaken` on a duplicate e-mail.
    async fn create_user(
        &self,
        id: UserId,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<()>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns any user holding the role.
    async fn find_user_by_role(&self, role: Role) -> Result<Option<User>>;
}
