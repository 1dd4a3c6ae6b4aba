//! Authorization guards layered on top of token authentication.
//!
//! The bearer middleware produces an [`Identity`]; handlers then either
//! check the claim-carried role directly, or re-resolve the live account
//! when the decision must not trust a stale claim.

use crate::auth::claims::{Identity, ROLE_ADMIN};
use crate::error::{AppError, AuthError, LifecycleError};
use crate::repository::{Account, AccountRepository};

/// Claim-only role check. Sufficient for endpoints that do not touch live
/// account data; the role is the one embedded at token issuance.
pub fn require_role(identity: &Identity, role: &str) -> Result<(), AppError> {
    if identity.role != role {
        return Err(AppError::Auth(AuthError::Forbidden));
    }
    Ok(())
}

/// Resolve the authenticated identity to its persisted account.
///
/// A token outlives account deletion; this is the guard that catches a
/// subject which no longer exists.
pub async fn resolve_account(
    identity: &Identity,
    accounts: &dyn AccountRepository,
) -> Result<Account, AppError> {
    accounts
        .find_by_email(&identity.subject)
        .await?
        .ok_or(AppError::Lifecycle(LifecycleError::AccountNotFound))
}

/// Admin check against the resolved account's current role, not the claim.
/// An admin demoted after token issuance is rejected here.
pub async fn require_admin_account(
    identity: &Identity,
    accounts: &dyn AccountRepository,
) -> Result<Account, AppError> {
    let account = resolve_account(identity, accounts).await?;
    if account.role != ROLE_ADMIN {
        return Err(AppError::Auth(AuthError::Forbidden));
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::ROLE_USER;
    use crate::repository::memory::InMemoryAccountRepository;
    use crate::repository::{Account, AccountStatus};

    fn identity(subject: &str, role: &str) -> Identity {
        Identity {
            subject: subject.to_string(),
            role: role.to_string(),
        }
    }

    fn account(email: &str, role: &str) -> Account {
        Account {
            id: uuid::Uuid::new_v4(),
            name: "Test Account".to_string(),
            email: email.to_string(),
            password_hash: "unused".to_string(),
            role: role.to_string(),
            status: AccountStatus::Active,
            document: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn require_role_accepts_matching_claim() {
        assert!(require_role(&identity("a@example.com", ROLE_ADMIN), ROLE_ADMIN).is_ok());
    }

    #[test]
    fn require_role_rejects_mismatched_claim() {
        let result = require_role(&identity("a@example.com", ROLE_USER), ROLE_ADMIN);
        assert!(matches!(result, Err(AppError::Auth(AuthError::Forbidden))));
    }

    #[tokio::test]
    async fn resolve_account_finds_live_subject() {
        let accounts = InMemoryAccountRepository::default();
        accounts.save(&account("a@example.com", ROLE_USER)).await.unwrap();

        let resolved = resolve_account(&identity("a@example.com", ROLE_USER), &accounts)
            .await
            .unwrap();
        assert_eq!(resolved.email, "a@example.com");
    }

    #[tokio::test]
    async fn resolve_account_fails_for_deleted_subject() {
        let accounts = InMemoryAccountRepository::default();

        let result = resolve_account(&identity("gone@example.com", ROLE_USER), &accounts).await;
        assert!(matches!(
            result,
            Err(AppError::Lifecycle(LifecycleError::AccountNotFound))
        ));
    }

    #[tokio::test]
    async fn admin_guard_uses_resolved_role_not_claim() {
        let accounts = InMemoryAccountRepository::default();
        accounts.save(&account("was-admin@example.com", ROLE_USER)).await.unwrap();

        // Claim still says admin; the persisted role does not.
        let result =
            require_admin_account(&identity("was-admin@example.com", ROLE_ADMIN), &accounts).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::Forbidden))));
    }

    #[tokio::test]
    async fn admin_guard_accepts_live_admin() {
        let accounts = InMemoryAccountRepository::default();
        accounts.save(&account("admin@example.com", ROLE_ADMIN)).await.unwrap();

        let resolved =
            require_admin_account(&identity("admin@example.com", ROLE_ADMIN), &accounts)
                .await
                .unwrap();
        assert_eq!(resolved.role, ROLE_ADMIN);
    }
}
