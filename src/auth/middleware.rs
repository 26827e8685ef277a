use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::token::TokenService;
use crate::models::User;
use crate::store::Store;
use crate::utils::error::AppError;

/// Identity resolved by [`require_auth`], stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Present on routes guarded by [`optional_auth`]; `None` for anonymous callers.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Resolves bearer tokens to stored users.
#[derive(Clone)]
pub struct Verifier {
    tokens: TokenService,
    store: Arc<dyn Store>,
}

impl Verifier {
    pub fn new(tokens: TokenService, store: Arc<dyn Store>) -> Self {
        Self { tokens, store }
    }

    pub async fn verify(&self, headers: &HeaderMap) -> Result<User, AppError> {
        let token = extract_bearer(headers)?;
        let claims = self.tokens.verify(token)?;

        let subject = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(AppError::InvalidToken)?;
        let user_id = Uuid::parse_str(&subject).map_err(|e| {
            tracing::debug!(error = %e, "Token subject is not a user id");
            AppError::AuthenticationFailed
        })?;

        let user = self.store.find_user(user_id).await.map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "User lookup failed during authentication");
            AppError::AuthenticationFailed
        })?;

        user.ok_or_else(|| AppError::Unauthenticated("User no longer exists".to_string()))
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    let missing = || AppError::Unauthenticated("Missing bearer token".to_string());

    let header = headers.get(header::AUTHORIZATION).ok_or_else(missing)?;
    let header = header.to_str().map_err(|_| missing())?;
    let header = header.strip_prefix("Bearer ").ok_or_else(missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}

pub async fn require_auth(
    State(verifier): State<Verifier>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = verifier.verify(req.headers()).await?;
    tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Like [`require_auth`], but lets requests without an `Authorization` header through
/// anonymously. A header that is present must still verify.
pub async fn optional_auth(
    State(verifier): State<Verifier>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = if req.headers().contains_key(header::AUTHORIZATION) {
        Some(verifier.verify(req.headers()).await?)
    } else {
        None
    };

    req.extensions_mut().insert(MaybeUser(user));
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            AppError::InternalFailure("route is not behind the authentication layer".to_string())
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<MaybeUser>()
            .cloned()
            .unwrap_or(MaybeUser(None)))
    }
}
