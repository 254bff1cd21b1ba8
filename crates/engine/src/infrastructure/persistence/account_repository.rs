//! Accounts and their users.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{Account, AccountId, AccountUser};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

fn row_to_account(row: &SqliteRow) -> Result<Account, RepoError> {
    Ok(Account {
        id: rows::id(row, "id")?,
        name: rows::text(row, "name")?,
        created_at: rows::ts(row, "created_at")?,
    })
}

fn row_to_account_user(row: &SqliteRow) -> Result<AccountUser, RepoError> {
    Ok(AccountUser {
        id: rows::id(row, "id")?,
        account_id: rows::id(row, "account_id")?,
        email: rows::text(row, "email")?,
        name: rows::text(row, "name")?,
        created_at: rows::ts(row, "created_at")?,
    })
}

impl Model {
    pub async fn create_account(&mut self, account: &Account) -> Result<(), RepoError> {
        sqlx::query("INSERT INTO account (id, name, created_at) VALUES (?, ?, ?)")
            .bind(account.id.to_uuid())
            .bind(&account.name)
            .bind(rows::format_ts(account.created_at))
            .execute(self.conn())
            .await
            .map_err(|e| RepoError::database("create_account", e))?;
        Ok(())
    }

    pub async fn get_account(&mut self, id: AccountId) -> Result<Account, RepoError> {
        let row = sqlx::query("SELECT id, name, created_at FROM account WHERE id = ?")
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_account", e))?
            .ok_or_else(|| RepoError::not_found("Account", id))?;
        row_to_account(&row)
    }

    pub async fn create_account_user(&mut self, user: &AccountUser) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO account_user (id, account_id, email, name, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_uuid())
        .bind(user.account_id.to_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(rows::format_ts(user.created_at))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_account_user", e))?;
        Ok(())
    }

    /// The account's first user receives its mail.
    pub async fn get_primary_account_user(
        &mut self,
        account_id: AccountId,
    ) -> Result<AccountUser, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, email, name, created_at
            FROM account_user WHERE account_id = ? AND deleted_at IS NULL
            ORDER BY created_at, id LIMIT 1
            "#,
        )
        .bind(account_id.to_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(|e| RepoError::database("get_primary_account_user", e))?
        .ok_or_else(|| RepoError::not_found("AccountUser", account_id))?;
        row_to_account_user(&row)
    }
}
