use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::state::AppState;
use crate::error::FirewallError;

const TOKEN_TTL_SECONDS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    access_token: String,
    token_type: &'static str,
}

/// `POST /api/auth/login`: exchanges username/password for a bearer token.
/// Token format details aren't load-bearing beyond "issued here, verified
/// by `require_bearer_token`, carries `sub = username`".
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .store
        .find_user(&form.username)
        .await?
        .ok_or(FirewallError::InvalidCredentials)?;

    let valid = bcrypt::verify(&form.password, &user.hashed_password).map_err(FirewallError::from)?;
    if !valid {
        return Err(ApiError(FirewallError::InvalidCredentials));
    }

    let claims = Claims {
        sub: user.username,
        exp: (chrono::Utc::now() + chrono::Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.secret_key.as_bytes()),
    )
    .map_err(FirewallError::from)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

/// Middleware guarding every Control API route but login. Rejects with 401
/// and a `WWW-Authenticate: Bearer` header on a missing, malformed, or
/// expired token.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(FirewallError::InvalidCredentials)?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map_err(FirewallError::from)?;

    Ok(next.run(request).await)
}

/// Wraps [`FirewallError`] so handlers can return it directly and have it
/// rendered as the HTTP response the Control API contract promises.
pub struct ApiError(pub FirewallError);

impl From<FirewallError> for ApiError {
    fn from(err: FirewallError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            FirewallError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            FirewallError::Token(_) => (StatusCode::UNAUTHORIZED, "invalid or expired token".to_string()),
            FirewallError::Conflict { domain, list_type, source } => (
                StatusCode::CONFLICT,
                format!("{domain} already exists in {source}/{list_type}"),
            ),
            FirewallError::NotFound(domain) => (StatusCode::NOT_FOUND, format!("domain not found: {domain}")),
            FirewallError::InvalidDomain(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail.clone()),
            FirewallError::Config(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        let mut response = (status, Json(json!({ "detail": message }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, "Bearer".parse().unwrap());
        }
        response
    }
}
