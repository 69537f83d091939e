//! Reception lifecycle: `(none) ──create──► in_progress ──close──► close`.

use common::{PvzId, ReceptionId, ReceptionStatus};
use pvz_store::{Reception, ReceptionStore, StoreError};

use crate::error::DomainError;

pub(crate) const OPEN_RECEPTION_EXISTS: &str = "open reception already exists for this PVZ";
pub(crate) const NO_OPEN_RECEPTION_TO_CLOSE: &str = "no open reception found for this PVZ";
pub(crate) const PVZ_NOT_FOUND: &str = "pickup point not found";

/// Service enforcing at most one open reception per pickup point.
///
/// The existence check and the insert are two round-trips; the store's
/// unique index on open receptions rejects the loser of a concurrent race,
/// which surfaces here as the same conflict as the check.
pub struct ReceptionService<S: ReceptionStore> {
    store: S,
}

impl<S: ReceptionStore> ReceptionService<S> {
    /// Creates a new reception service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Opens a new reception at a pickup point.
    #[tracing::instrument(skip(self))]
    pub async fn create_reception(&self, pvz_id: PvzId) -> Result<Reception, DomainError> {
        if self.store.has_open_reception(pvz_id).await? {
            return Err(DomainError::conflict(OPEN_RECEPTION_EXISTS));
        }

        let id = ReceptionId::new();
        self.store
            .insert_reception(id, pvz_id, ReceptionStatus::InProgress, crate::now())
            .await
            .map_err(|e| match e {
                StoreError::OpenReceptionExists(_) => {
                    tracing::info!(%pvz_id, "lost race for open reception");
                    DomainError::conflict(OPEN_RECEPTION_EXISTS)
                }
                StoreError::MissingParent { .. } => DomainError::not_found(PVZ_NOT_FOUND),
                other => DomainError::Store(other),
            })?;

        let reception = self
            .store
            .get_reception(id)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("reception {id} missing after insert")))?;

        tracing::info!(reception_id = %reception.id, "reception opened");
        Ok(reception)
    }

    /// Closes the reception in progress at a pickup point.
    #[tracing::instrument(skip(self))]
    pub async fn close_last_reception(&self, pvz_id: PvzId) -> Result<Reception, DomainError> {
        let reception = self
            .store
            .find_open_reception(pvz_id)
            .await?
            .ok_or_else(|| DomainError::not_found(NO_OPEN_RECEPTION_TO_CLOSE))?;

        let closed_at = crate::now();
        let affected = self
            .store
            .update_reception_close(reception.id, closed_at)
            .await?;

        // Someone else closed it between the lookup and the update
        if affected == 0 {
            return Err(DomainError::not_found(NO_OPEN_RECEPTION_TO_CLOSE));
        }

        tracing::info!(reception_id = %reception.id, "reception closed");
        Ok(Reception {
            status: ReceptionStatus::Closed,
            closed_at: Some(closed_at),
            ..reception
        })
    }
}
