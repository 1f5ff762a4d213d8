use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::auth::extract::{source_address, Authenticated};
use crate::auth::permissions::capabilities;
use crate::auth::session::Identity;
use crate::auth::tokens::TokenPair;
use crate::db::UserProfile;
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenBody,
}

#[derive(Debug, Serialize)]
pub struct TokenBody {
    pub token_type: &'static str,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl From<&TokenPair> for TokenBody {
    fn from(pair: &TokenPair) -> Self {
        Self {
            token_type: "Bearer",
            access_token: pair.access.value.clone(),
            refresh_token: pair.refresh.value.clone(),
            access_token_expires_at: pair.access.expires_at,
            refresh_token_expires_at: pair.refresh.expires_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    #[serde(flatten)]
    pub tokens: TokenBody,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    pub user: Identity,
}

#[derive(Debug, Serialize)]
pub struct PermissionsResponse<'a> {
    pub role: String,
    pub permissions: BTreeSet<&'a str>,
}

pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { email, password } = body.into_inner();
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::ValidationError("Email and password are required".into()));
    }

    let source = source_address(&req, state.config.server.trust_forwarded_for);
    let outcome = state.sessions.login(&email, &password, &source).await?;

    Ok(HttpResponse::Ok()
        .cookie(state.cookies.access_cookie(&outcome.tokens.access.value))
        .cookie(state.cookies.refresh_cookie(&outcome.tokens.refresh.value))
        .json(LoginResponse {
            tokens: TokenBody::from(&outcome.tokens),
            user: outcome.user,
        }))
}

pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = req
        .cookie(&state.cookies.refresh_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            warn!("Refresh rejected: no refresh token presented");
            AuthError::RefreshRejected
        })?;

    let tokens = state.sessions.refresh(&token).await?;

    Ok(HttpResponse::Ok()
        .cookie(state.cookies.access_cookie(&tokens.access.value))
        .cookie(state.cookies.refresh_cookie(&tokens.refresh.value))
        .json(RefreshResponse {
            success: true,
            tokens: TokenBody::from(&tokens),
        }))
}

/// Clears the token cookies. Already-issued tokens stay valid until they expire.
pub async fn logout(
    auth: Authenticated,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.sessions.logout(&auth.0);

    let mut response = HttpResponse::Ok();
    for cookie in state.cookies.clearing_cookies() {
        response.cookie(cookie);
    }
    Ok(response.json(serde_json::json!({
        "message": "Successfully logged out"
    })))
}

pub async fn verify(auth: Authenticated) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(VerifyResponse {
        authenticated: true,
        user: auth.into_inner(),
    }))
}

pub async fn permissions(
    auth: Authenticated,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let identity = auth.into_inner();
    Ok(HttpResponse::Ok().json(PermissionsResponse {
        permissions: state.sessions.permissions_of(&identity),
        role: identity.role,
    }))
}

pub async fn rate_limit_stats(
    auth: Authenticated,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state
        .sessions
        .require_permission(&auth.0, capabilities::SYSTEM_MANAGE)?;

    info!(user_id = auth.0.user_id, "Rate limiter stats requested");
    Ok(HttpResponse::Ok().json(state.sessions.rate_limit_stats().await))
}
