//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

pub(crate) const INVALID_BODY: &str = "Invalid request body";
pub(crate) const INTERNAL: &str = "internal server error";

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the role is not allowed here.
    #[error("{0}")]
    Forbidden(String),

    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Domain(err) => domain_status(err),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Store(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details go to the log, never to the client.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "internal server error");
            INTERNAL.to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pvz_store::StoreError;

    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (DomainError::Conflict("c".into()), StatusCode::CONFLICT),
            (DomainError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (DomainError::Unauthorized("u".into()), StatusCode::UNAUTHORIZED),
            (DomainError::Internal("i".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                DomainError::Store(StoreError::Unavailable),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let (status, body) =
            body_of(DomainError::Conflict("open reception already exists".into()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "open reception already exists");
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, body) = body_of(ApiError::Internal("pool exhausted at 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL);
    }
}
