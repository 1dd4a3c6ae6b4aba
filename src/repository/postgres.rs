//! Postgres-backed implementations of the persistence collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};
use crate::repository::{Account, AccountRepository, AccountStatus, NotificationSink};

type AccountRow = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
);

const SELECT_ACCOUNT: &str = r#"
    SELECT id, name, email, password_hash, role, status, document, created_at
    FROM accounts
"#;

fn row_to_account(row: AccountRow) -> Result<Account, AppError> {
    let (id, name, email, password_hash, role, status, document, created_at) = row;

    let status = AccountStatus::parse(&status).ok_or_else(|| {
        AppError::Database(DatabaseError::UnexpectedError(format!(
            "unknown account status '{}' for account {}",
            status, id
        )))
    })?;

    Ok(Account {
        id,
        name,
        email,
        password_hash,
        role,
        status,
        document,
        created_at,
    })
}

pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{} WHERE email = $1", SELECT_ACCOUNT))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_account).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{} WHERE id = $1", SELECT_ACCOUNT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_account).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<Account>, AppError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "{} WHERE status = 'pending' ORDER BY created_at",
            SELECT_ACCOUNT
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_account).collect()
    }

    async fn save(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, password_hash, role, status, document, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.role)
        .bind(account.status.as_str())
        .bind(&account.document)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn activate_if_pending(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET status = 'active', document = NULL
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_if_pending(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

pub struct PgNotificationSink {
    pool: PgPool,
}

impl PgNotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for PgNotificationSink {
    async fn notify(&self, recipient: Uuid, title: &str, body: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, title, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recipient)
        .bind(title)
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
