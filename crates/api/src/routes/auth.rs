//! Token endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::AppStore;
use crate::dto::{DummyLoginRequest, LoginRequest, RegisterRequest, TokenResponse};
use crate::error::ApiError;
use crate::routes::ApiJson;
use crate::state::AppState;

/// POST /dummyLogin: token for a placeholder user of the given role.
#[tracing::instrument(skip(state, req))]
pub async fn dummy_login<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<DummyLoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.auth.dummy_login(&req.role).await?;
    let token = state.keys.issue(user.id, user.role)?;
    Ok(Json(TokenResponse { token }))
}

/// POST /register: create an account and return its token.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let user = state
        .auth
        .register(&req.email, &req.password, &req.role)
        .await?;
    let token = state.keys.issue(user.id, user.role)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// POST /login: exchange credentials for a token.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.auth.login(&req.email, &req.password).await?;
    let token = state.keys.issue(user.id, user.role)?;
    Ok(Json(TokenResponse { token }))
}
