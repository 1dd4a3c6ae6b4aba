//! In-memory collaborators backing the test suite.
//!
//! The account map lives behind a single mutex, so the check-then-write of
//! the conditional transitions is atomic, mirroring the conditional
//! `UPDATE ... WHERE status = 'pending'` of the Postgres implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};
use crate::repository::{Account, AccountRepository, AccountStatus, NotificationSink};

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountRepository {
    /// Test hook: overwrite the stored role (e.g. to simulate a demotion
    /// after token issuance).
    pub fn set_role(&self, id: Uuid, role: &str) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.role = role.to_string();
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.get(&id).cloned())
    }

    async fn list_pending(&self) -> Result<Vec<Account>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        let mut pending: Vec<Account> = accounts
            .values()
            .filter(|a| a.status == AccountStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        Ok(pending)
    }

    async fn save(&self, account: &Account) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts
            .values()
            .any(|a| a.email == account.email && a.id != account.id)
        {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "email already registered".to_string(),
            )));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn activate_if_pending(&self, id: Uuid) -> Result<bool, AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.get_mut(&id) {
            Some(account) if account.status == AccountStatus::Pending => {
                account.status = AccountStatus::Active;
                account.document = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_if_pending(&self, id: Uuid) -> Result<bool, AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.get(&id) {
            Some(account) if account.status == AccountStatus::Pending => {
                accounts.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        accounts.remove(&id);
        Ok(())
    }
}

/// Records notifications instead of delivering them.
#[derive(Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<(Uuid, String, String)>>,
}

impl RecordingNotificationSink {
    pub fn sent(&self) -> Vec<(Uuid, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, recipient: Uuid, title: &str, body: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient, title.to_string(), body.to_string()));
        Ok(())
    }
}
