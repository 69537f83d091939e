//! Reception endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::AppStore;
use crate::auth::{Authorized, EmployeeOnly};
use crate::dto::{CreateReceptionRequest, ReceptionDto};
use crate::error::ApiError;
use crate::metrics::RECEPTIONS_CREATED;
use crate::routes::{ApiJson, INVALID_PVZ_ID, parse_pvz_id};
use crate::state::AppState;

/// POST /receptions: open a reception at a pickup point.
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.principal.user_id))]
pub async fn create<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authorized<EmployeeOnly>,
    ApiJson(req): ApiJson<CreateReceptionRequest>,
) -> Result<(StatusCode, Json<ReceptionDto>), ApiError> {
    let pvz_id = parse_pvz_id(&req.pvz_id)?;
    let reception = state.receptions.create_reception(pvz_id).await?;
    state.metrics.increment_counter(RECEPTIONS_CREATED);
    Ok((StatusCode::CREATED, Json(reception.into())))
}

/// POST /pvz/{pvzId}/close_last_reception: close the open reception.
#[tracing::instrument(skip(state, auth, pvz_id), fields(user_id = %auth.principal.user_id))]
pub async fn close_last<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authorized<EmployeeOnly>,
    pvz_id: Result<Path<String>, PathRejection>,
) -> Result<Json<ReceptionDto>, ApiError> {
    let Path(raw) = pvz_id.map_err(|_| ApiError::BadRequest(INVALID_PVZ_ID.to_string()))?;
    let pvz_id = parse_pvz_id(&raw)?;

    let reception = state.receptions.close_last_reception(pvz_id).await?;
    Ok(Json(reception.into()))
}
