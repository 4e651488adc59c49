use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub sso: SsoConfig,

    pub security: SecurityConfig,

    pub provisioning: ProvisioningConfig,

    pub analytics: AnalyticsConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `sqlite:` or `mysql://` connection string
    pub database_url: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/modernauthdash.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    pub port: u16,

    /// Externally visible origin used to build the SSO callback URL,
    /// e.g. `https://dash.example.org`. When unset the request `Host` is used.
    pub public_url: Option<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            public_url: None,
            secure_cookies: true,
            session_inactivity_minutes: 60 * 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoConfig {
    /// Origin of the SSO backend; `/login` is appended.
    pub backend_url: String,

    pub dashboard_id: String,

    /// Shared secret sent to the backend alongside `dashboard_id`.
    /// WARNING: it travels as a URL query parameter.
    pub dashboard_access_code: String,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            backend_url: "https://auth.bonkmc.org".to_string(),
            dashboard_id: String::new(),
            dashboard_access_code: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Session cookie signing secret, at least 64 bytes.
    /// When empty an ephemeral key is generated on startup.
    pub app_secret_key: String,

    pub rate_limits: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Applied to every request per client address.
    pub default_per_day: u32,

    pub data_per_hour: u32,

    pub reset_key_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_per_day: 10_000,
            data_per_hour: 200,
            reset_key_per_hour: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Executable invoked as `<command> [args..] <add|remove|reset-key> <server_id>`
    pub command: String,

    pub args: Vec<String>,

    pub timeout_seconds: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            command: "modernauth-server".to_string(),
            args: vec![],
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub free_player_quota: u32,

    pub premium_player_quota: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            free_player_quota: 2_500,
            premium_player_quota: 25_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            sso: SsoConfig::default(),
            security: SecurityConfig::default(),
            provisioning: ProvisioningConfig::default(),
            analytics: AnalyticsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads `.env`, the first config file found, then environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        Self::config_file().map_or_else(|| Ok(Self::default()), |path| Self::load_from_path(&path))
    }

    /// First existing config file, if any.
    #[must_use]
    pub fn config_file() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|path| path.exists())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over file values.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("BACKEND_URL") {
            self.sso.backend_url = v;
        }
        if let Some(v) = non_empty("DASHBOARD_ID") {
            self.sso.dashboard_id = v;
        }
        if let Some(v) = non_empty("DASHBOARD_ACCESS_CODE") {
            self.sso.dashboard_access_code = v;
        }
        if let Some(v) = non_empty("APP_SECRET_KEY") {
            self.security.app_secret_key = v;
        }
        if let Some(v) = non_empty("DATABASE_URL").or_else(|| non_empty("MYSQL_CONNECTION")) {
            self.general.database_url = v;
        }
        if let Some(v) = non_empty("PUBLIC_URL") {
            self.server.public_url = Some(v);
        }
        if let Some(port) = non_empty("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("modernauthdash").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".modernauthdash").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_url.trim().is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.sso.backend_url.trim().is_empty() {
            anyhow::bail!("SSO backend URL cannot be empty");
        }

        url::Url::parse(&self.sso.backend_url)
            .with_context(|| format!("Invalid SSO backend URL: {}", self.sso.backend_url))?;

        if let Some(public_url) = &self.server.public_url {
            url::Url::parse(public_url)
                .with_context(|| format!("Invalid public URL: {public_url}"))?;
        }

        if !self.security.app_secret_key.is_empty() && self.security.app_secret_key.len() < 64 {
            anyhow::bail!("app_secret_key must be at least 64 bytes long");
        }

        if self.provisioning.command.trim().is_empty() {
            anyhow::bail!("Provisioning command cannot be empty");
        }

        if self.provisioning.timeout_seconds == 0 {
            anyhow::bail!("Provisioning timeout must be > 0");
        }

        if self.server.session_inactivity_minutes <= 0 {
            anyhow::bail!("Session inactivity timeout must be > 0");
        }

        Ok(())
    }

    /// Quota used for the analytics page.
    #[must_use]
    pub const fn player_quota(&self, premium: bool) -> u32 {
        if premium {
            self.analytics.premium_player_quota
        } else {
            self.analytics.free_player_quota
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sso.backend_url, "https://auth.bonkmc.org");
        assert_eq!(config.security.rate_limits.default_per_day, 10_000);
        assert_eq!(config.security.rate_limits.data_per_hour, 200);
        assert_eq!(config.security.rate_limits.reset_key_per_hour, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[sso]"));
        assert!(toml_str.contains("[provisioning]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [sso]
            dashboard_id = "dash-1"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.sso.dashboard_id, "dash-1");

        assert_eq!(config.sso.backend_url, "https://auth.bonkmc.org");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BACKEND_URL", "https://sso.example.org"),
            ("DASHBOARD_ID", "dash"),
            ("DASHBOARD_ACCESS_CODE", "code"),
            ("MYSQL_CONNECTION", "mysql://u:p@db/dash"),
            ("PORT", "8080"),
            ("PUBLIC_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.sso.backend_url, "https://sso.example.org");
        assert_eq!(config.sso.dashboard_id, "dash");
        assert_eq!(config.sso.dashboard_access_code, "code");
        assert_eq!(config.general.database_url, "mysql://u:p@db/dash");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.public_url.is_none());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = Config::default();
        config.security.app_secret_key = "dev_secret_key".to_string();
        assert!(config.validate().is_err());

        config.security.app_secret_key = "k".repeat(64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_player_quota() {
        let config = Config::default();
        assert_eq!(config.player_quota(false), 2_500);
        assert_eq!(config.player_quota(true), 25_000);
    }
}
