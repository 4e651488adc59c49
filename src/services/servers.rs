//! Server ownership workflow: one provisioned server per dashboard user.
//!
//! The user record is the source of truth for ownership; the session value
//! is only consulted when the record is unavailable.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::db::Store;
use crate::services::provisioning::{ProvisionError, ServerProvisioner};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("You already own server '{0}'")]
    AlreadyOwned(String),

    #[error("Server ID '{0}' is already taken")]
    Taken(String),

    #[error("You do not own a server")]
    NoServer,

    #[error("Server '{0}' no longer exists")]
    Unknown(String),

    #[error("Provisioning error: {0}")]
    Provisioning(String),
}

impl From<ProvisionError> for ServerError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::AlreadyExists(id) => Self::Taken(id),
            ProvisionError::NotFound(id) => Self::Unknown(id),
            ProvisionError::Failed(msg) => Self::Provisioning(msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatedServer {
    pub server_id: String,
    pub secret_key: String,
}

#[derive(Clone)]
pub struct ServerService {
    store: Store,
    provisioner: Arc<dyn ServerProvisioner>,
}

impl ServerService {
    #[must_use]
    pub fn new(store: Store, provisioner: Arc<dyn ServerProvisioner>) -> Self {
        Self { store, provisioner }
    }

    /// Owned server from the record; the session's copy is used only when
    /// the record cannot be read.
    pub async fn owned_server(
        &self,
        username: &str,
        session_server: Option<String>,
    ) -> Option<String> {
        match self.store.get_user(username).await {
            Some(record) => record.owned_server,
            None => session_server,
        }
    }

    /// `server_id` must already be normalized.
    pub async fn create(
        &self,
        username: &str,
        server_id: &str,
        session_server: Option<String>,
    ) -> Result<CreatedServer, ServerError> {
        if let Some(existing) = self.owned_server(username, session_server).await {
            return Err(ServerError::AlreadyOwned(existing));
        }

        let secret_key = self.provisioner.create_server(server_id).await?;

        self.store.set_owned_server(username, Some(server_id)).await;
        info!(username, server_id, "Server created");

        Ok(CreatedServer {
            server_id: server_id.to_string(),
            secret_key,
        })
    }

    /// Returns the id of the removed server.
    pub async fn delete(
        &self,
        username: &str,
        session_server: Option<String>,
    ) -> Result<String, ServerError> {
        let server_id = self
            .owned_server(username, session_server)
            .await
            .ok_or(ServerError::NoServer)?;

        match self.provisioner.remove_server(&server_id).await {
            Ok(()) => {}
            Err(ProvisionError::NotFound(_)) => {
                warn!(username, %server_id, "Server already gone upstream, clearing ownership");
            }
            Err(e) => return Err(e.into()),
        }

        self.store.set_owned_server(username, None).await;
        info!(username, %server_id, "Server deleted");

        Ok(server_id)
    }

    /// Returns the server id and its new access code.
    pub async fn reset_code(
        &self,
        username: &str,
        session_server: Option<String>,
    ) -> Result<(String, String), ServerError> {
        let server_id = self
            .owned_server(username, session_server)
            .await
            .ok_or(ServerError::NoServer)?;

        let new_code = self.provisioner.reset_server_key(&server_id).await?;
        info!(username, %server_id, "Server access code reset");

        Ok((server_id, new_code))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvisioner {
        calls: Mutex<Vec<String>>,
        missing_upstream: bool,
    }

    impl FakeProvisioner {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ServerProvisioner for FakeProvisioner {
        async fn create_server(&self, server_id: &str) -> Result<String, ProvisionError> {
            self.calls.lock().unwrap().push(format!("add {server_id}"));
            if server_id == "taken" {
                return Err(ProvisionError::AlreadyExists(server_id.to_string()));
            }
            Ok(format!("secret-{server_id}"))
        }

        async fn remove_server(&self, server_id: &str) -> Result<(), ProvisionError> {
            self.calls.lock().unwrap().push(format!("remove {server_id}"));
            if self.missing_upstream {
                return Err(ProvisionError::NotFound(server_id.to_string()));
            }
            Ok(())
        }

        async fn reset_server_key(&self, server_id: &str) -> Result<String, ProvisionError> {
            self.calls.lock().unwrap().push(format!("reset-key {server_id}"));
            Ok("new-code".to_string())
        }
    }

    async fn service(fake: Arc<FakeProvisioner>) -> (Store, ServerService) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        store.create_user_if_missing("alice").await;
        let service = ServerService::new(store.clone(), fake);
        (store, service)
    }

    #[tokio::test]
    async fn test_create_records_ownership() {
        let fake = Arc::new(FakeProvisioner::default());
        let (store, service) = service(fake.clone()).await;

        let created = service.create("alice", "my-server", None).await.unwrap();
        assert_eq!(created.server_id, "my-server");
        assert_eq!(created.secret_key, "secret-my-server");

        let record = store.get_user("alice").await.unwrap();
        assert_eq!(record.owned_server.as_deref(), Some("my-server"));
        assert_eq!(fake.calls(), vec!["add my-server"]);
    }

    #[tokio::test]
    async fn test_create_rejects_second_server() {
        let fake = Arc::new(FakeProvisioner::default());
        let (_store, service) = service(fake.clone()).await;

        service.create("alice", "first", None).await.unwrap();
        let err = service.create("alice", "second", None).await.unwrap_err();

        assert!(matches!(err, ServerError::AlreadyOwned(id) if id == "first"));
        assert_eq!(fake.calls(), vec!["add first"]);
    }

    #[tokio::test]
    async fn test_create_taken_leaves_record_untouched() {
        let fake = Arc::new(FakeProvisioner::default());
        let (store, service) = service(fake).await;

        let err = service.create("alice", "taken", None).await.unwrap_err();
        assert!(matches!(err, ServerError::Taken(_)));
        assert!(store.get_user("alice").await.unwrap().owned_server.is_none());
    }

    #[tokio::test]
    async fn test_delete_without_server_skips_provisioner() {
        let fake = Arc::new(FakeProvisioner::default());
        let (_store, service) = service(fake.clone()).await;

        let err = service.delete("alice", None).await.unwrap_err();
        assert!(matches!(err, ServerError::NoServer));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_session_value_ignored_when_record_exists() {
        let fake = Arc::new(FakeProvisioner::default());
        let (_store, service) = service(fake.clone()).await;

        let err = service
            .delete("alice", Some("someone-elses".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, ServerError::NoServer));
        assert!(fake.calls().is_empty());

        service
            .create("alice", "fresh", Some("someone-elses".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_falls_back_to_session_without_record() {
        let fake = Arc::new(FakeProvisioner::default());
        let (store, service) = service(fake.clone()).await;

        let removed = service
            .delete("zed", Some("from-session".to_string()))
            .await
            .unwrap();

        assert_eq!(removed, "from-session");
        assert_eq!(fake.calls(), vec!["remove from-session"]);
        assert!(store.get_user("zed").await.unwrap().owned_server.is_none());
    }

    #[tokio::test]
    async fn test_ownership_changes_keep_premium_and_counters() {
        let fake = Arc::new(FakeProvisioner::default());
        let (store, service) = service(fake).await;

        let repo = store.user_repo();
        repo.set_premium("alice", true).await.unwrap();
        repo.set_player_counts("alice", 11, 20).await.unwrap();

        service.create("alice", "keeper", None).await.unwrap();
        let record = store.get_user("alice").await.unwrap();
        assert_eq!(record.owned_server.as_deref(), Some("keeper"));
        assert!(record.premium_user);
        assert_eq!(record.total_modern_auth_players, 11);
        assert_eq!(record.total_players, 20);

        service.delete("alice", None).await.unwrap();
        let record = store.get_user("alice").await.unwrap();
        assert!(record.owned_server.is_none());
        assert!(record.premium_user);
        assert_eq!(record.total_modern_auth_players, 11);
        assert_eq!(record.total_players, 20);
    }

    #[tokio::test]
    async fn test_delete_clears_ownership_when_gone_upstream() {
        let fake = Arc::new(FakeProvisioner {
            missing_upstream: true,
            ..Default::default()
        });
        let (store, service) = service(fake).await;

        let mut record = store.get_user("alice").await.unwrap();
        record.owned_server = Some("stale".to_string());
        store.set_user(&record).await;

        assert_eq!(service.delete("alice", None).await.unwrap(), "stale");
        assert!(store.get_user("alice").await.unwrap().owned_server.is_none());
    }

    #[tokio::test]
    async fn test_reset_code() {
        let fake = Arc::new(FakeProvisioner::default());
        let (_store, service) = service(fake.clone()).await;

        assert!(matches!(
            service.reset_code("alice", None).await,
            Err(ServerError::NoServer)
        ));

        service.create("alice", "my-server", None).await.unwrap();
        let (server_id, code) = service.reset_code("alice", None).await.unwrap();
        assert_eq!(server_id, "my-server");
        assert_eq!(code, "new-code");
    }
}
