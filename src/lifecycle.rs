//! The account moderation state machine.
//!
//! Self-registration creates a pending account with an identity document
//! attached; an admin either approves (activate + notify) or rejects
//! (delete outright). Only active accounts can authenticate.
//!
//! Transition ordering: the moderation document is deleted before the
//! status commit, and the commit itself is conditional on the status still
//! being pending. A failure between the two leaves the account pending with
//! a dangling reference, which is safe to retry because document deletion
//! is idempotent. Of concurrent approve/reject calls on one account, exactly
//! one commits.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::documents::DocumentStore;
use crate::error::{AppError, AuthError, DatabaseError, LifecycleError};
use crate::repository::{Account, AccountRepository, AccountStatus, NotificationSink};
use crate::validators::{is_valid_email, is_valid_name};

pub const ALLOWED_DOCUMENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];
pub const MAX_DOCUMENT_SIZE: usize = 5 * 1024 * 1024;

/// A self-registration submission.
pub struct NewRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub document_content_type: String,
    pub document: Vec<u8>,
}

#[derive(Clone)]
pub struct AccountLifecycle {
    accounts: Arc<dyn AccountRepository>,
    documents: Arc<dyn DocumentStore>,
    notifications: Arc<dyn NotificationSink>,
}

impl AccountLifecycle {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        documents: Arc<dyn DocumentStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            accounts,
            documents,
            notifications,
        }
    }

    pub fn accounts(&self) -> Arc<dyn AccountRepository> {
        self.accounts.clone()
    }

    /// Entry transition: persist a pending account with a hashed credential
    /// and the stored moderation document.
    pub async fn register(&self, registration: NewRegistration) -> Result<Account, AppError> {
        let name = is_valid_name(&registration.name)?;
        let email = is_valid_email(&registration.email)?;
        validate_document(
            &registration.document_content_type,
            registration.document.len(),
        )?;

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "email already registered".to_string(),
            )));
        }

        let password_hash = hash_password(&registration.password)?;
        let reference = self
            .documents
            .store(&registration.document_content_type, &registration.document)
            .await?;

        let account = Account::new_pending(name, email, password_hash, reference.clone());
        if let Err(e) = self.accounts.save(&account).await {
            if let Err(cleanup) = self.documents.delete(&reference).await {
                tracing::warn!(
                    reference = %reference,
                    error = %cleanup,
                    "Failed to remove document after aborted registration"
                );
            }
            return Err(e);
        }

        tracing::info!(
            account_id = %account.id,
            "Registration submitted for review"
        );
        Ok(account)
    }

    /// Admin transition `pending -> active`: delete the moderation document,
    /// commit the status, notify the account holder.
    ///
    /// Document deletion and notification failures are logged, never fatal;
    /// the status commit is the only step that can fail the transition.
    pub async fn approve(&self, id: Uuid) -> Result<(), AppError> {
        let account = self
            .accounts
            .find_by_id(id)
            .await?
            .ok_or(AppError::Lifecycle(LifecycleError::AccountNotFound))?;

        if account.status != AccountStatus::Pending {
            return Err(AppError::Lifecycle(LifecycleError::InvalidState));
        }

        self.discard_document(&account).await;

        if !self.accounts.activate_if_pending(id).await? {
            // A concurrent transition won the race.
            return Err(AppError::Lifecycle(LifecycleError::InvalidState));
        }

        if let Err(e) = self
            .notifications
            .notify(
                id,
                "Account activated",
                "Your account has been activated. You can now log in.",
            )
            .await
        {
            tracing::warn!(account_id = %id, error = %e, "Failed to deliver activation notification");
        }

        tracing::info!(account_id = %id, "Registration approved");
        Ok(())
    }

    /// Admin transition `pending -> deleted`: delete the moderation document,
    /// then remove the account row. No rejected row is retained.
    pub async fn reject(&self, id: Uuid) -> Result<(), AppError> {
        let account = self
            .accounts
            .find_by_id(id)
            .await?
            .ok_or(AppError::Lifecycle(LifecycleError::AccountNotFound))?;

        if account.status != AccountStatus::Pending {
            return Err(AppError::Lifecycle(LifecycleError::InvalidState));
        }

        self.discard_document(&account).await;

        if !self.accounts.delete_if_pending(id).await? {
            return Err(AppError::Lifecycle(LifecycleError::InvalidState));
        }

        tracing::info!(account_id = %id, "Registration rejected and deleted");
        Ok(())
    }

    /// Login gate: verify credentials first, then the moderation status.
    /// Only an active account is returned for token issuance.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AppError> {
        let account = match self.accounts.find_by_email(email).await? {
            Some(account) => account,
            None => return Err(AppError::Auth(AuthError::InvalidCredentials)),
        };

        if !verify_password(password, &account.password_hash)? {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        match account.status {
            AccountStatus::Pending => Err(AppError::Auth(AuthError::AccountPending)),
            AccountStatus::Rejected => Err(AppError::Auth(AuthError::AccountRejected)),
            AccountStatus::Active => Ok(account),
        }
    }

    async fn discard_document(&self, account: &Account) {
        if let Some(reference) = &account.document {
            if let Err(e) = self.documents.delete(reference).await {
                tracing::warn!(
                    account_id = %account.id,
                    reference = %reference,
                    error = %e,
                    "Failed to delete moderation document"
                );
            }
        }
    }
}

fn validate_document(content_type: &str, size: usize) -> Result<(), AppError> {
    if !ALLOWED_DOCUMENT_TYPES.contains(&content_type) {
        return Err(AppError::Lifecycle(LifecycleError::InvalidDocument(
            "Invalid file type. Allowed: JPEG, PNG, PDF".to_string(),
        )));
    }

    if size > MAX_DOCUMENT_SIZE {
        return Err(AppError::Lifecycle(LifecycleError::InvalidDocument(
            "File too large. Maximum size: 5 MiB".to_string(),
        )));
    }

    Ok(())
}
