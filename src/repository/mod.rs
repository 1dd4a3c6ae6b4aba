//! Account persistence model and the collaborator interfaces the core
//! consumes. Implementations: Postgres for the running service, in-memory
//! for the test suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::ROLE_USER;
use crate::error::AppError;

/// Moderation status of an account.
///
/// `Rejected` is a transient marker: the reject transition deletes the row
/// outright, so a persisted rejected account is not expected in steady state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Rejected,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AccountStatus::Pending),
            "active" => Some(AccountStatus::Active),
            "rejected" => Some(AccountStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: AccountStatus,
    /// Reference to the moderation document; present only while pending.
    pub document: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A freshly self-registered account awaiting moderation.
    pub fn new_pending(
        name: String,
        email: String,
        password_hash: String,
        document: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role: ROLE_USER.to_string(),
            status: AccountStatus::Pending,
            document: Some(document),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    async fn list_pending(&self) -> Result<Vec<Account>, AppError>;

    /// Insert a new account. Fails on a duplicate email.
    async fn save(&self, account: &Account) -> Result<(), AppError>;

    /// Flip `pending -> active` and clear the document reference.
    ///
    /// Conditional on the stored status still being pending; returns whether
    /// this caller won the transition. Of two concurrent approvals exactly
    /// one sees `true`.
    async fn activate_if_pending(&self, id: Uuid) -> Result<bool, AppError>;

    /// Delete the row, conditional on the status still being pending.
    /// Returns whether this caller performed the deletion.
    async fn delete_if_pending(&self, id: Uuid) -> Result<bool, AppError>;

    /// Unconditional delete.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, recipient: Uuid, title: &str, body: &str) -> Result<(), AppError>;
}
