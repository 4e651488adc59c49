//! Delegate for the external server provisioning CLI.
//!
//! The CLI is invoked as `<command> [args..] <action> <server_id>`:
//! exit 0 is success (secrets are printed on the first stdout line),
//! exit 3 means the identifier is taken and exit 4 that it is unknown.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ProvisioningConfig;

const EXIT_TAKEN: i32 = 3;
const EXIT_UNKNOWN: i32 = 4;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Server '{0}' is already taken")]
    AlreadyExists(String),

    #[error("Server '{0}' does not exist")]
    NotFound(String),

    #[error("Provisioning failed: {0}")]
    Failed(String),
}

/// Creates, removes and re-keys servers on behalf of a dashboard user.
#[async_trait]
pub trait ServerProvisioner: Send + Sync {
    /// Returns the new server's secret key.
    async fn create_server(&self, server_id: &str) -> Result<String, ProvisionError>;

    async fn remove_server(&self, server_id: &str) -> Result<(), ProvisionError>;

    /// Returns the replacement access code.
    async fn reset_server_key(&self, server_id: &str) -> Result<String, ProvisionError>;
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Add,
    Remove,
    ResetKey,
}

impl Action {
    const fn as_arg(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::ResetKey => "reset-key",
        }
    }
}

pub struct CommandProvisioner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProvisioner {
    #[must_use]
    pub fn new(config: &ProvisioningConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    async fn run(&self, action: Action, server_id: &str) -> Result<String, ProvisionError> {
        debug!(command = %self.command, action = action.as_arg(), server_id, "Running provisioning command");

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(action.as_arg())
            .arg(server_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProvisionError::Failed(format!("failed to spawn {}: {e}", self.command)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ProvisionError::Failed(format!(
                    "{} {} timed out after {}s",
                    self.command,
                    action.as_arg(),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ProvisionError::Failed(e.to_string()))?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(EXIT_TAKEN) => Err(ProvisionError::AlreadyExists(server_id.to_string())),
            Some(EXIT_UNKNOWN) => Err(ProvisionError::NotFound(server_id.to_string())),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    action = action.as_arg(),
                    server_id,
                    exit_code = ?code,
                    "Provisioning command failed: {}",
                    stderr.trim()
                );
                Err(ProvisionError::Failed(format!(
                    "{} {} exited with {code:?}",
                    self.command,
                    action.as_arg()
                )))
            }
        }
    }

    async fn run_for_secret(&self, action: Action, server_id: &str) -> Result<String, ProvisionError> {
        let stdout = self.run(action, server_id).await?;
        first_line(&stdout).ok_or_else(|| {
            ProvisionError::Failed(format!("{} printed no secret", action.as_arg()))
        })
    }
}

fn first_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

#[async_trait]
impl ServerProvisioner for CommandProvisioner {
    async fn create_server(&self, server_id: &str) -> Result<String, ProvisionError> {
        self.run_for_secret(Action::Add, server_id).await
    }

    async fn remove_server(&self, server_id: &str) -> Result<(), ProvisionError> {
        self.run(Action::Remove, server_id).await.map(|_| ())
    }

    async fn reset_server_key(&self, server_id: &str) -> Result<String, ProvisionError> {
        self.run_for_secret(Action::ResetKey, server_id).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
case "$1" in
  add)
    if [ "$2" = "taken" ]; then exit 3; fi
    echo "secret-for-$2" ;;
  remove)
    if [ "$2" = "ghost" ]; then exit 4; fi ;;
  reset-key)
    echo "" ;;
  *)
    echo "bad action" >&2; exit 1 ;;
esac
"#;

    fn provisioner() -> CommandProvisioner {
        CommandProvisioner::new(&ProvisioningConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), SCRIPT.to_string(), "provision".to_string()],
            timeout_seconds: 5,
        })
    }

    #[tokio::test]
    async fn test_create_returns_first_stdout_line() {
        let secret = provisioner().create_server("my-server").await.unwrap();
        assert_eq!(secret, "secret-for-my-server");
    }

    #[tokio::test]
    async fn test_exit_codes_map_to_errors() {
        let p = provisioner();

        assert!(matches!(
            p.create_server("taken").await,
            Err(ProvisionError::AlreadyExists(id)) if id == "taken"
        ));
        assert!(matches!(
            p.remove_server("ghost").await,
            Err(ProvisionError::NotFound(_))
        ));
        assert!(p.remove_server("my-server").await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_secret_is_a_failure() {
        assert!(matches!(
            provisioner().reset_server_key("my-server").await,
            Err(ProvisionError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_command_is_a_failure() {
        let p = CommandProvisioner::new(&ProvisioningConfig {
            command: "/nonexistent/modernauth-server".to_string(),
            args: vec![],
            timeout_seconds: 5,
        });

        assert!(matches!(
            p.create_server("x").await,
            Err(ProvisionError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let p = CommandProvisioner::new(&ProvisioningConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 5".to_string(), "provision".to_string()],
            timeout_seconds: 1,
        });

        assert!(matches!(
            p.remove_server("x").await,
            Err(ProvisionError::Failed(msg)) if msg.contains("timed out")
        ));
    }
}
