//! Pickup-point endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use domain::ListPvzParams;

use crate::AppStore;
use crate::auth::{AnyStaff, Authorized, ModeratorOnly};
use crate::dto::{CreatePvzRequest, ListPvzQuery, PvzDto, PvzListItem};
use crate::error::ApiError;
use crate::metrics::PICKUP_POINTS_CREATED;
use crate::routes::ApiJson;
use crate::state::AppState;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

/// POST /pvz: register a pickup point.
#[tracing::instrument(skip(state, auth, req), fields(user_id = %auth.principal.user_id))]
pub async fn create<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authorized<ModeratorOnly>,
    ApiJson(req): ApiJson<CreatePvzRequest>,
) -> Result<(StatusCode, Json<PvzDto>), ApiError> {
    let pvz = state.pvz.create_pvz(&req.city).await?;
    state.metrics.increment_counter(PICKUP_POINTS_CREATED);
    Ok((StatusCode::CREATED, Json(pvz.into())))
}

/// GET /pvz: one page of pickup points with receptions and products.
#[tracing::instrument(skip(state, _auth, query))]
pub async fn list<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    _auth: Authorized<AnyStaff>,
    query: Result<Query<ListPvzQuery>, QueryRejection>,
) -> Result<Json<Vec<PvzListItem>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let params = to_params(query)?;

    let tree = state.pvz.list_pvzs_with_relations(&params).await?;
    Ok(Json(tree.into_iter().map(Into::into).collect()))
}

fn to_params(query: ListPvzQuery) -> Result<ListPvzParams, ApiError> {
    Ok(ListPvzParams {
        page: number_or(query.page.as_deref(), DEFAULT_PAGE, "invalid page number")?,
        limit: number_or(query.limit.as_deref(), DEFAULT_LIMIT, "invalid limit")?,
        start_date: query.start_date,
        end_date: query.end_date,
    })
}

fn number_or(raw: Option<&str>, default: i64, message: &str) -> Result<i64, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::BadRequest(message.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_paging_uses_defaults() {
        let params = to_params(ListPvzQuery::default()).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
    }

    #[test]
    fn non_numeric_paging_is_bad_request() {
        let query = ListPvzQuery {
            page: Some("two".into()),
            ..Default::default()
        };
        assert!(matches!(to_params(query), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn numbers_pass_through_for_domain_validation() {
        let query = ListPvzQuery {
            page: Some("0".into()),
            limit: Some(" 31 ".into()),
            ..Default::default()
        };
        let params = to_params(query).unwrap();
        assert_eq!(params.page, 0);
        assert_eq!(params.limit, 31);
    }
}
