//! Product endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::AppStore;
use crate::auth::{Authorized, EmployeeOnly};
use crate::dto::{AddProductRequest, ProductDto};
use crate::error::ApiError;
use crate::metrics::PRODUCTS_ADDED;
use crate::routes::{ApiJson, INVALID_PVZ_ID, parse_pvz_id};
use crate::state::AppState;

/// POST /products: log a product against the open reception.
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.principal.user_id))]
pub async fn create<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authorized<EmployeeOnly>,
    ApiJson(req): ApiJson<AddProductRequest>,
) -> Result<(StatusCode, Json<ProductDto>), ApiError> {
    let pvz_id = parse_pvz_id(&req.pvz_id)?;
    let product = state
        .products
        .add_product(pvz_id, &req.product_type)
        .await?;
    state.metrics.increment_counter(PRODUCTS_ADDED);
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// POST /pvz/{pvzId}/delete_last_product: remove the newest product of the
/// open reception.
#[tracing::instrument(skip(state, auth, pvz_id), fields(user_id = %auth.principal.user_id))]
pub async fn delete_last<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authorized<EmployeeOnly>,
    pvz_id: Result<Path<String>, PathRejection>,
) -> Result<Json<ProductDto>, ApiError> {
    let Path(raw) = pvz_id.map_err(|_| ApiError::BadRequest(INVALID_PVZ_ID.to_string()))?;
    let pvz_id = parse_pvz_id(&raw)?;

    let product = state.products.delete_last_product(pvz_id).await?;
    Ok(Json(product.into()))
}
