//! Bearer-token access control.
//!
//! [`authenticate`] verifies the JWT and stores a [`Principal`] in the request
//! extensions; handlers then demand a role set through [`Authorized`].

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use common::{Role, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub(crate) const MISSING_AUTH_HEADER: &str = "Missing authorization header";
pub(crate) const INVALID_TOKEN: &str = "Invalid token";
pub(crate) const INSUFFICIENT_ROLE: &str = "Insufficient role";

/// Token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
}

/// HS256 signing and verification keys.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(1),
        }
    }

    /// Overrides the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Signs a token for the user.
    pub fn issue(&self, user_id: UserId, role: Role) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id,
            role,
            exp: now + self.ttl.num_seconds(),
            iat: now,
            nbf: now,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Checks signature, expiry and not-before.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ApiError::Unauthorized(INVALID_TOKEN.to_string())
            })
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

/// Middleware rejecting requests without a valid bearer token.
pub async fn authenticate(
    State(keys): State<Arc<JwtKeys>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;
    let claims = keys.verify(token)?;

    req.extensions_mut().insert(Principal {
        user_id: claims.user_id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized(MISSING_AUTH_HEADER.to_string()))?;

    let invalid = || ApiError::Unauthorized(INVALID_TOKEN.to_string());
    let token = header
        .to_str()
        .map_err(|_| invalid())?
        .strip_prefix("Bearer ")
        .ok_or_else(invalid)?
        .trim();

    if token.is_empty() {
        return Err(invalid());
    }
    Ok(token)
}

/// A set of roles allowed to call an endpoint.
pub trait Policy: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

/// Moderators only.
pub enum ModeratorOnly {}

impl Policy for ModeratorOnly {
    const ROLES: &'static [Role] = &[Role::Moderator];
}

/// Employees only.
pub enum EmployeeOnly {}

impl Policy for EmployeeOnly {
    const ROLES: &'static [Role] = &[Role::Employee];
}

/// Any authenticated staff member.
pub enum AnyStaff {}

impl Policy for AnyStaff {
    const ROLES: &'static [Role] = &[Role::Employee, Role::Moderator];
}

/// Extractor yielding the caller if its role satisfies `P`.
///
/// Runs before body extraction, so a wrong role is reported ahead of a
/// malformed body.
pub struct Authorized<P: Policy> {
    pub principal: Principal,
    _policy: PhantomData<P>,
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: Send + Sync,
    P: Policy,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or_else(|| ApiError::Unauthorized(MISSING_AUTH_HEADER.to_string()))?;

        if !P::ROLES.contains(&principal.role) {
            tracing::debug!(user_id = %principal.user_id, role = %principal.role, "role not allowed");
            return Err(ApiError::Forbidden(INSUFFICIENT_ROLE.to_string()));
        }

        Ok(Self {
            principal,
            _policy: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn issued_token_verifies() {
        let keys = JwtKeys::new("test-secret");
        let user_id = UserId::new();

        let token = keys.issue(user_id, Role::Moderator).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, Role::Moderator);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = JwtKeys::new("one").issue(UserId::new(), Role::Employee).unwrap();

        let err = JwtKeys::new("two").verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg == INVALID_TOKEN));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new("secret").with_ttl(Duration::minutes(-5));
        let token = keys.issue(UserId::new(), Role::Employee).unwrap();

        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn claims_use_camel_case() {
        let keys = JwtKeys::new("secret");
        let token = keys.issue(UserId::new(), Role::Employee).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let raw = jsonwebtoken::decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap()
        .claims;

        assert!(raw.get("userId").is_some());
        assert_eq!(raw["role"], "employee");
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            extract_bearer(&headers),
            Err(ApiError::Unauthorized(msg)) if msg == MISSING_AUTH_HEADER
        ));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            extract_bearer(&headers),
            Err(ApiError::Unauthorized(msg)) if msg == INVALID_TOKEN
        ));

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(extract_bearer(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn policies_cover_expected_roles() {
        assert!(ModeratorOnly::ROLES.contains(&Role::Moderator));
        assert!(!ModeratorOnly::ROLES.contains(&Role::Employee));
        assert!(EmployeeOnly::ROLES.contains(&Role::Employee));
        assert!(!EmployeeOnly::ROLES.contains(&Role::Moderator));
        assert_eq!(AnyStaff::ROLES.len(), 2);
    }
}
