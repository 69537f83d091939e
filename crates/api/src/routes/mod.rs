//! HTTP handlers, grouped by resource.

pub mod auth;
pub mod health;
pub mod products;
pub mod pvz;
pub mod receptions;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use common::PvzId;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, INVALID_BODY};

pub(crate) const INVALID_PVZ_ID: &str = "Invalid pvzId format";

/// `Json` whose rejection is reported as an [`ApiError`] body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| {
                tracing::debug!(error = %e, "rejected request body");
                ApiError::BadRequest(INVALID_BODY.to_string())
            })?;
        Ok(Self(value))
    }
}

pub(crate) fn parse_pvz_id(raw: &str) -> Result<PvzId, ApiError> {
    PvzId::parse(raw.trim()).map_err(|_| ApiError::BadRequest(INVALID_PVZ_ID.to_string()))
}
