use crate::shared::time::current_time_millis;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// One authenticated identity. Platform accounts carry the platform's
/// player reference; guest accounts have none and exist for one nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub external_ref: Option<String>,
    pub nickname: String,
    pub is_guest: bool,
    pub created_at: i64,
    pub last_login_at: i64,
}

impl Account {
    pub fn guest(nickname: &str) -> Self {
        let now = current_time_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            external_ref: None,
            nickname: nickname.to_string(),
            is_guest: true,
            created_at: now,
            last_login_at: now,
        }
    }

    pub fn external(external_ref: &str, nickname: &str) -> Self {
        let now = current_time_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            external_ref: Some(external_ref.to_string()),
            nickname: nickname.to_string(),
            is_guest: false,
            created_at: now,
            last_login_at: now,
        }
    }
}

#[derive(Clone)]
pub struct AccountStore {
    db: SqlitePool,
}

impl AccountStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, account: &Account) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO accounts (id, external_ref, nickname, is_guest, created_at, last_login_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.id)
        .bind(&account.external_ref)
        .bind(&account.nickname)
        .bind(account.is_guest)
        .bind(account.created_at)
        .bind(account.last_login_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, external_ref, nickname, is_guest, created_at, last_login_at \
             FROM accounts WHERE external_ref = ?",
        )
        .bind(external_ref)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(Account {
            id: row.try_get("id")?,
            external_ref: row.try_get("external_ref")?,
            nickname: row.try_get("nickname")?,
            is_guest: row.try_get::<i64, _>("is_guest")? != 0,
            created_at: row.try_get("created_at")?,
            last_login_at: row.try_get("last_login_at")?,
        }))
    }

    pub async fn touch_login(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET last_login_at = ? WHERE id = ?")
            .bind(current_time_millis())
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
