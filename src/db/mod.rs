use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::models::user_record::UserRecord;

pub mod migrator;
pub mod repositories;

pub use repositories::user_record::UserRecordRepository;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory && let Some(path_str) = sqlite_file_path(db_url) {
            if let Some(parent) = Path::new(path_str).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        // Every pooled connection to `:memory:` is its own database, so pin one.
        if in_memory {
            opt.max_connections(1).min_connections(1);
        } else {
            opt.max_connections(max_connections)
                .min_connections(min_connections)
                .idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            backend = ?conn.get_database_backend(),
            "Database connected & migrations applied (pool: {}-{})",
            min_connections,
            max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> UserRecordRepository {
        UserRecordRepository::new(self.conn.clone())
    }

    // ========== Soft-failing record access used by request handlers ==========

    /// Storage errors are logged and reported as "no record".
    pub async fn get_user(&self, username: &str) -> Option<UserRecord> {
        match self.user_repo().get(username).await {
            Ok(record) => record,
            Err(e) => {
                error!(username, "Failed to fetch user record: {e:#}");
                None
            }
        }
    }

    /// Upserts `record`; storage errors are logged and dropped.
    pub async fn set_user(&self, record: &UserRecord) {
        if let Err(e) = self.user_repo().upsert(record).await {
            error!(username = %record.username, "Failed to save user record: {e:#}");
        }
    }

    /// Updates ownership alone; storage errors are logged and dropped.
    pub async fn set_owned_server(&self, username: &str, owned_server: Option<&str>) {
        if let Err(e) = self.user_repo().set_owned_server(username, owned_server).await {
            error!(username, "Failed to save server ownership: {e:#}");
        }
    }

    /// Writes the zero-valued record on first sight of `username`.
    pub async fn create_user_if_missing(&self, username: &str) {
        if let Err(e) = self.user_repo().insert_default(username).await {
            error!(username, "Failed to create user record: {e:#}");
        }
    }
}

fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let rest = db_url.strip_prefix("sqlite:")?;
    let rest = rest.trim_start_matches("//");
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty()).then_some(path)
}
