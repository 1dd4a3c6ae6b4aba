//! Admin moderation routes.
//!
//! Every handler re-resolves the caller's account and checks the stored
//! role, so a demoted admin's still-valid token carries no weight here.

use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{require_admin_account, Identity};
use crate::error::AppError;
use crate::lifecycle::AccountLifecycle;
use crate::repository::Account;

#[derive(Serialize)]
pub struct PendingRegistration {
    pub id: String,
    pub name: String,
    pub email: String,
    pub document: Option<String>,
    pub created_at: String,
}

impl From<Account> for PendingRegistration {
    fn from(account: Account) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name,
            email: account.email,
            document: account.document,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// GET /admin/pending-registrations
pub async fn pending_registrations(
    identity: web::ReqData<Identity>,
    lifecycle: web::Data<AccountLifecycle>,
) -> Result<HttpResponse, AppError> {
    let accounts = lifecycle.accounts();
    require_admin_account(&identity, accounts.as_ref()).await?;

    let pending: Vec<PendingRegistration> = accounts
        .list_pending()
        .await?
        .into_iter()
        .map(PendingRegistration::from)
        .collect();

    Ok(HttpResponse::Ok().json(pending))
}

/// POST /admin/registrations/{id}/approve
pub async fn approve_registration(
    identity: web::ReqData<Identity>,
    path: web::Path<Uuid>,
    lifecycle: web::Data<AccountLifecycle>,
) -> Result<HttpResponse, AppError> {
    let accounts = lifecycle.accounts();
    let admin = require_admin_account(&identity, accounts.as_ref()).await?;

    let id = path.into_inner();
    lifecycle.approve(id).await?;

    tracing::info!(account_id = %id, admin_id = %admin.id, "Registration approved by admin");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User approved successfully",
        "user_id": id.to_string(),
    })))
}

/// POST /admin/registrations/{id}/reject
pub async fn reject_registration(
    identity: web::ReqData<Identity>,
    path: web::Path<Uuid>,
    lifecycle: web::Data<AccountLifecycle>,
) -> Result<HttpResponse, AppError> {
    let accounts = lifecycle.accounts();
    let admin = require_admin_account(&identity, accounts.as_ref()).await?;

    let id = path.into_inner();
    lifecycle.reject(id).await?;

    tracing::info!(account_id = %id, admin_id = %admin.id, "Registration rejected by admin");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User rejected and deleted",
        "user_id": id.to_string(),
    })))
}
