//! Game subscriptions.

use sqlx::sqlite::SqliteRow;

use playbymail_domain::{
    AccountId, GameId, GameInstanceId, GameSubscription, GameSubscriptionId, SubscriptionStatus,
    SubscriptionType,
};

use super::model::Model;
use super::rows;
use crate::infrastructure::ports::RepoError;

const COLUMNS: &str = "id, game_id, account_id, game_instance_id, subscription_type, status, \
     created_at, updated_at";

fn row_to_subscription(row: &SqliteRow) -> Result<GameSubscription, RepoError> {
    Ok(GameSubscription {
        id: rows::id(row, "id")?,
        game_id: rows::id(row, "game_id")?,
        account_id: rows::id(row, "account_id")?,
        game_instance_id: rows::opt_id(row, "game_instance_id")?,
        subscription_type: rows::parsed(row, "subscription_type")?,
        status: rows::parsed(row, "status")?,
        created_at: rows::ts(row, "created_at")?,
        updated_at: rows::ts(row, "updated_at")?,
    })
}

impl Model {
    pub async fn create_subscription(
        &mut self,
        subscription: &GameSubscription,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO game_subscription (
                id, game_id, account_id, game_instance_id, subscription_type, status,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(subscription.id.to_uuid())
        .bind(subscription.game_id.to_uuid())
        .bind(subscription.account_id.to_uuid())
        .bind(subscription.game_instance_id.map(|id| id.to_uuid()))
        .bind(subscription.subscription_type.as_str())
        .bind(subscription.status.as_str())
        .bind(rows::format_ts(subscription.created_at))
        .bind(rows::format_ts(subscription.updated_at))
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("create_subscription", e))?;
        Ok(())
    }

    pub async fn get_subscription(
        &mut self,
        id: GameSubscriptionId,
    ) -> Result<GameSubscription, RepoError> {
        let sql = format!("SELECT {} FROM game_subscription WHERE id = ?", COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("get_subscription", e))?
            .ok_or_else(|| RepoError::not_found("GameSubscription", id))?;
        row_to_subscription(&row)
    }

    pub async fn update_subscription(
        &mut self,
        subscription: &GameSubscription,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE game_subscription
            SET game_instance_id = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(subscription.game_instance_id.map(|id| id.to_uuid()))
        .bind(subscription.status.as_str())
        .bind(rows::format_ts(subscription.updated_at))
        .bind(subscription.id.to_uuid())
        .execute(self.conn())
        .await
        .map_err(|e| RepoError::database("update_subscription", e))?;
        Ok(())
    }

    /// Active player subscriptions attached to an instance.
    pub async fn list_active_player_subscriptions(
        &mut self,
        game_instance_id: GameInstanceId,
    ) -> Result<Vec<GameSubscription>, RepoError> {
        let sql = format!(
            "SELECT {} FROM game_subscription \
             WHERE game_instance_id = ? AND subscription_type = ? AND status = ? \
               AND deleted_at IS NULL \
             ORDER BY created_at, id",
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(game_instance_id.to_uuid())
            .bind(SubscriptionType::Player.as_str())
            .bind(SubscriptionStatus::Active.as_str())
            .fetch_all(self.conn())
            .await
            .map_err(|e| RepoError::database("list_active_player_subscriptions", e))?;
        rows.iter().map(row_to_subscription).collect()
    }

    pub async fn find_active_player_subscription(
        &mut self,
        game_id: GameId,
        account_id: AccountId,
    ) -> Result<Option<GameSubscription>, RepoError> {
        let sql = format!(
            "SELECT {} FROM game_subscription \
             WHERE game_id = ? AND account_id = ? AND subscription_type = ? AND status = ? \
               AND deleted_at IS NULL",
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(game_id.to_uuid())
            .bind(account_id.to_uuid())
            .bind(SubscriptionType::Player.as_str())
            .bind(SubscriptionStatus::Active.as_str())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| RepoError::database("find_active_player_subscription", e))?;
        row.as_ref().map(row_to_subscription).transpose()
    }
}
