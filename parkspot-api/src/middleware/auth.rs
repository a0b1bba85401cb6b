use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use parkspot_core::OwnerId;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const ACCEPTED_ROLES: [&str; 2] = ["GUEST", "CUSTOMER"];

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    pub sub: String,
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

/// Validates the bearer token and hands the owner id to handlers as an
/// `Extension<OwnerId>`.
pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Authorization(bearer) = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<CustomerClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    if !ACCEPTED_ROLES.contains(&token_data.claims.role.as_str()) {
        return Err(StatusCode::FORBIDDEN);
    }

    let owner = OwnerId::new(token_data.claims.sub.clone()).map_err(|_| StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(owner);
    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
