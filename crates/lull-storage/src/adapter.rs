// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage capabilities.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use lull_config::model::StorageConfig;
use lull_core::{
    AdapterType, ChatHistory, HealthStatus, LullError, Message, MessageStore, PendingEntry,
    PendingQueue, PluginAdapter, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed message store and durable pending queue.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn with_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: String::new(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open a throwaway in-memory store with the full schema.
    pub async fn in_memory() -> Result<Self, LullError> {
        Ok(Self::with_database(Database::open_in_memory().await?))
    }

    /// The underlying database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, LullError> {
        self.db
            .get()
            .ok_or_else(|| LullError::storage("storage not initialized -- call initialize() first"))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, LullError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LullError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), LullError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| LullError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), LullError> {
        self.database()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteStorage {
    async fn save_message(&self, msg: &Message) -> Result<bool, LullError> {
        queries::messages::save_message(self.database()?, msg).await
    }

    async fn get_history(&self, conversation_id: &str) -> Result<ChatHistory, LullError> {
        queries::messages::get_history(self.database()?, conversation_id).await
    }

    async fn get_last_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Message>, LullError> {
        queries::messages::get_last_message(self.database()?, conversation_id).await
    }

    async fn mark_replied(&self, conversation_id: &str) -> Result<usize, LullError> {
        queries::messages::mark_replied(self.database()?, conversation_id).await
    }
}

#[async_trait]
impl PendingQueue for SqliteStorage {
    async fn enqueue(&self, conversation_id: &str, entry: PendingEntry) -> Result<(), LullError> {
        queries::pending::enqueue(self.database()?, conversation_id, &entry).await
    }

    async fn count(&self, conversation_id: &str) -> Result<usize, LullError> {
        queries::pending::count(self.database()?, conversation_id).await
    }

    async fn trim_until(
        &self,
        conversation_id: &str,
        until: DateTime<Utc>,
    ) -> Result<usize, LullError> {
        queries::pending::trim_until(self.database()?, conversation_id, until).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let storage = SqliteStorage::new(make_config("never-opened.db"));
        assert!(storage.health_check().await.is_err());
        assert!(matches!(
            storage.count("c1").await,
            Err(LullError::Storage { .. })
        ));
    }

    #[tokio::test]
    async fn health_check_returns_healthy_when_initialized() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn reply_cycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("cycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let now = Utc::now();
        let inbound = Message::inbound("w1", "c1", "what's my balance?", now);
        assert!(storage.save_message(&inbound).await.unwrap());
        storage
            .enqueue("c1", PendingEntry::from(&inbound))
            .await
            .unwrap();
        assert_eq!(storage.count("c1").await.unwrap(), 1);

        let reply = Message::outbound(
            "r1",
            "c1",
            "So far this conversation has used $0.00.",
            now + chrono::Duration::seconds(1),
        );
        assert!(storage.save_message(&reply).await.unwrap());
        assert_eq!(storage.mark_replied("c1").await.unwrap(), 1);
        assert_eq!(storage.trim_until("c1", reply.timestamp).await.unwrap(), 1);

        let history = storage.get_history("c1").await.unwrap();
        assert_eq!(history.replied.len(), 2);
        assert!(history.unreplied.is_empty());

        let last = storage.get_last_message("c1").await.unwrap().unwrap();
        assert_eq!(last.external_id, "r1");

        storage.close().await.unwrap();
        storage.shutdown().await.unwrap();
    }
}
