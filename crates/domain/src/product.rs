//! Product ledger for open receptions.

use common::{ProductId, ProductType, PvzId};
use pvz_store::{Product, ProductStore, Reception, ReceptionStore, StoreError};

use crate::error::DomainError;

pub(crate) const INVALID_PRODUCT_TYPE: &str = "invalid product type";
pub(crate) const NO_OPEN_RECEPTION: &str = "no open reception for this PVZ";
pub(crate) const NO_PRODUCTS_TO_DELETE: &str = "no products to delete in this reception";

/// Service appending products to, and removing the newest product from, the
/// open reception of a pickup point.
pub struct ProductService<S>
where
    S: ReceptionStore + ProductStore,
{
    store: S,
}

impl<S> ProductService<S>
where
    S: ReceptionStore + ProductStore,
{
    /// Creates a new product service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn open_reception(&self, pvz_id: PvzId) -> Result<Reception, DomainError> {
        self.store
            .find_open_reception(pvz_id)
            .await?
            .ok_or_else(|| DomainError::conflict(NO_OPEN_RECEPTION))
    }

    /// Logs a product of the given type against the open reception.
    ///
    /// The product is re-read after insert so the returned creation time is
    /// the one assigned by the store.
    #[tracing::instrument(skip(self))]
    pub async fn add_product(&self, pvz_id: PvzId, product_type: &str) -> Result<Product, DomainError> {
        let product_type: ProductType = product_type
            .parse()
            .map_err(|_| DomainError::validation(INVALID_PRODUCT_TYPE))?;

        let reception = self.open_reception(pvz_id).await?;

        let id = ProductId::new();
        self.store
            .insert_product(id, reception.id, product_type)
            .await
            .map_err(closed_reception_conflict)?;

        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("product {id} missing after insert")))?;

        tracing::debug!(product_id = %product.id, reception_id = %reception.id, "product added");
        Ok(product)
    }

    /// Removes the most recently created product of the open reception.
    ///
    /// Returns the removed product.
    #[tracing::instrument(skip(self))]
    pub async fn delete_last_product(&self, pvz_id: PvzId) -> Result<Product, DomainError> {
        let reception = self.open_reception(pvz_id).await?;

        let product = self
            .store
            .find_last_product(reception.id)
            .await?
            .ok_or_else(|| DomainError::not_found(NO_PRODUCTS_TO_DELETE))?;

        // Zero rows means a concurrent delete already took it.
        let deleted = self
            .store
            .delete_product(product.id)
            .await
            .map_err(closed_reception_conflict)?;
        if deleted == 0 {
            return Err(DomainError::not_found(NO_PRODUCTS_TO_DELETE));
        }

        tracing::debug!(product_id = %product.id, "product deleted");
        Ok(product)
    }
}

/// The reception was closed between lookup and write.
fn closed_reception_conflict(e: StoreError) -> DomainError {
    match e {
        StoreError::ReceptionClosed(_) | StoreError::MissingParent { .. } => {
            DomainError::conflict(NO_OPEN_RECEPTION)
        }
        other => DomainError::Store(other),
    }
}
