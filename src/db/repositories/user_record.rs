use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{dashboard_users, prelude::*};
use crate::models::user_record::UserRecord;

impl From<dashboard_users::Model> for UserRecord {
    fn from(model: dashboard_users::Model) -> Self {
        Self {
            username: model.username,
            owned_server: model.owned_server,
            premium_user: model.premium_user,
            total_modern_auth_players: model.total_modern_auth_players,
            total_players: model.total_players,
        }
    }
}

impl From<&UserRecord> for dashboard_users::ActiveModel {
    fn from(record: &UserRecord) -> Self {
        Self {
            username: Set(record.username.clone()),
            owned_server: Set(record.owned_server.clone()),
            premium_user: Set(record.premium_user),
            total_modern_auth_players: Set(record.total_modern_auth_players),
            total_players: Set(record.total_players),
        }
    }
}

pub struct UserRecordRepository {
    conn: DatabaseConnection,
}

impl UserRecordRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, username: &str) -> Result<Option<UserRecord>> {
        let row = DashboardUsers::find_by_id(username.to_string())
            .one(&self.conn)
            .await
            .with_context(|| format!("Failed to query user record '{username}'"))?;

        Ok(row.map(UserRecord::from))
    }

    /// Single-statement upsert; the last writer wins.
    pub async fn upsert(&self, record: &UserRecord) -> Result<()> {
        let active = dashboard_users::ActiveModel::from(record);

        DashboardUsers::insert(active)
            .on_conflict(
                OnConflict::column(dashboard_users::Column::Username)
                    .update_columns([
                        dashboard_users::Column::OwnedServer,
                        dashboard_users::Column::PremiumUser,
                        dashboard_users::Column::TotalModernAuthPlayers,
                        dashboard_users::Column::TotalPlayers,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .with_context(|| format!("Failed to save user record '{}'", record.username))?;

        Ok(())
    }

    /// Inserts the zero-valued record unless one exists.
    ///
    /// The conflict clause rewrites the key onto itself, which leaves an
    /// existing row untouched on both SQLite and MySQL.
    pub async fn insert_default(&self, username: &str) -> Result<()> {
        let active = dashboard_users::ActiveModel::from(&UserRecord::new(username));

        DashboardUsers::insert(active)
            .on_conflict(
                OnConflict::column(dashboard_users::Column::Username)
                    .update_column(dashboard_users::Column::Username)
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .with_context(|| format!("Failed to create user record '{username}'"))?;

        Ok(())
    }

    /// Writes only the `owned_server` column, creating the default row first
    /// so concurrent premium or counter updates are never overwritten.
    pub async fn set_owned_server(&self, username: &str, owned_server: Option<&str>) -> Result<()> {
        self.insert_default(username).await?;

        DashboardUsers::update_many()
            .col_expr(
                dashboard_users::Column::OwnedServer,
                Expr::value(owned_server.map(ToString::to_string)),
            )
            .filter(dashboard_users::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to update owned server for '{username}'"))?;

        Ok(())
    }

    /// Returns false when no record exists for `username`.
    pub async fn set_premium(&self, username: &str, premium: bool) -> Result<bool> {
        let result = DashboardUsers::update_many()
            .col_expr(dashboard_users::Column::PremiumUser, Expr::value(premium))
            .filter(dashboard_users::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .context("Failed to update premium flag")?;

        Ok(result.rows_affected > 0)
    }

    /// Returns false when no record exists for `username`.
    pub async fn set_player_counts(
        &self,
        username: &str,
        modern_auth_players: i32,
        total_players: i32,
    ) -> Result<bool> {
        let result = DashboardUsers::update_many()
            .col_expr(
                dashboard_users::Column::TotalModernAuthPlayers,
                Expr::value(modern_auth_players),
            )
            .col_expr(
                dashboard_users::Column::TotalPlayers,
                Expr::value(total_players),
            )
            .filter(dashboard_users::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .context("Failed to update player counters")?;

        Ok(result.rows_affected > 0)
    }
}
