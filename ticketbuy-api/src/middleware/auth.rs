use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use ticketbuy_core::{Actor, Role};

use crate::error::AppError;
use crate::state::AppState;

/// Token claims issued by the external auth service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

/// `Ok(None)` when no bearer token is present; an invalid or expired token
/// is an error.
pub fn resolve_actor(state: &AppState, headers: &HeaderMap) -> Result<Option<Actor>, AppError> {
    let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
        return Ok(None);
    };

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::Unauthenticated("Invalid or expired token".to_string())
    })?;

    Ok(Some(Actor::new(token_data.claims.sub, token_data.claims.role)))
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = resolve_actor(&state, req.headers())?
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))?;

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = resolve_actor(&state, req.headers())?
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden("Administrator access required".to_string()));
    }

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}
