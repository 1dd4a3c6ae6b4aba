//! Authentication routes: login, token refresh, current account.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    issue_access_token, issue_refresh_token, resolve_account, verify_token, Identity, TokenKind,
};
use crate::configuration::JwtSettings;
use crate::error::AppError;
use crate::lifecycle::AccountLifecycle;

/// Login request, form-encoded like an OAuth2 password grant: the email
/// travels in the `username` field.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPairResponse {
    fn issue(subject: &str, role: &str, config: &JwtSettings) -> Result<Self, AppError> {
        Ok(Self {
            access_token: issue_access_token(subject, role, config)?,
            refresh_token: issue_refresh_token(subject, role, config)?,
            token_type: "bearer".to_string(),
        })
    }
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub created_at: String,
}

/// POST /auth/login
///
/// Authenticates with email and password and returns a fresh token pair.
///
/// # Errors
/// - 401: unknown email or wrong password (indistinguishable on purpose)
/// - 403: account pending or rejected
pub async fn login(
    form: web::Form<LoginForm>,
    lifecycle: web::Data<AccountLifecycle>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let account = lifecycle
        .authenticate(&form.username, &form.password)
        .await?;

    tracing::info!(account_id = %account.id, "Login succeeded");

    Ok(HttpResponse::Ok().json(TokenPairResponse::issue(
        &account.email,
        &account.role,
        &jwt_config,
    )?))
}

/// POST /auth/refresh
///
/// Mints a new token pair from a valid refresh token. Stateless: the claims
/// carried by the refresh token are reused as-is, and the presented token
/// stays valid until its own expiry.
///
/// # Errors
/// - 401: invalid, expired, or wrong-kind token
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let claims = verify_token(&body.refresh_token, TokenKind::Refresh, &jwt_config)?;

    tracing::info!(subject = %claims.sub, "Token pair refreshed");

    Ok(HttpResponse::Ok().json(TokenPairResponse::issue(
        &claims.sub,
        &claims.role,
        &jwt_config,
    )?))
}

/// GET /auth/me
///
/// Returns the authenticated caller's account, re-resolved from storage so
/// a token held for a since-deleted account yields 404 rather than data.
pub async fn get_current_user(
    identity: web::ReqData<Identity>,
    lifecycle: web::Data<AccountLifecycle>,
) -> Result<HttpResponse, AppError> {
    let accounts = lifecycle.accounts();
    let account = resolve_account(&identity, accounts.as_ref()).await?;

    Ok(HttpResponse::Ok().json(AccountResponse {
        id: account.id.to_string(),
        name: account.name,
        email: account.email,
        role: account.role,
        status: account.status.as_str().to_string(),
        created_at: account.created_at.to_rfc3339(),
    }))
}
