use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub notifications: NotificationConfig,

    pub storefront: StorefrontConfig,

    pub payments: PaymentsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
            notifications: NotificationConfig::default(),
            storefront: StorefrontConfig::default(),
            payments: PaymentsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

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
            database_path: "sqlite:data/mercadoboom.db".to_string(),
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
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Session inactivity timeout.
    pub session_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            secure_cookies: true,
            session_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// One-time code settings for the two-factor gate.
    pub verification: VerificationConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            verification: VerificationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Number of digits in a one-time code.
    pub code_length: usize,

    /// Minutes a code stays valid after it is sent.
    pub code_ttl_minutes: i64,

    /// Wrong guesses allowed against a single code.
    pub max_attempts: i32,

    /// Minutes a successful verification unlocks its action.
    pub grant_ttl_minutes: i64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            code_ttl_minutes: 10,
            max_attempts: 5,
            grant_ttl_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Only log outgoing messages instead of calling providers.
    pub log_only: bool,

    pub email_endpoint: Option<String>,

    pub sms_endpoint: Option<String>,

    pub whatsapp_endpoint: Option<String>,

    /// Bearer token sent to every provider endpoint.
    pub api_token: Option<String>,

    pub sender_name: String,

    /// Request timeout in seconds (default: 10)
    pub request_timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            log_only: true,
            email_endpoint: None,
            sms_endpoint: None,
            whatsapp_endpoint: None,
            api_token: None,
            sender_name: "MercadoBoom".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub currency: String,

    /// Orders whose total reaches this amount require the `high_value_order` code.
    pub high_value_threshold: Decimal,

    pub order_number_prefix: String,

    pub ticket_number_prefix: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            currency: "MXN".to_string(),
            high_value_threshold: Decimal::new(10_000, 0),
            order_number_prefix: "MB".to_string(),
            ticket_number_prefix: "TK".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Shared secret expected in the `X-Webhook-Secret` header of gateway callbacks.
    /// When unset the webhook endpoint rejects every call.
    pub webhook_secret: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mercadoboom").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mercadoboom").join("config.toml"));
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
        let verification = &self.security.verification;

        if !(4..=10).contains(&verification.code_length) {
            anyhow::bail!("Verification code length must be between 4 and 10 digits");
        }

        if verification.code_ttl_minutes <= 0 || verification.grant_ttl_minutes <= 0 {
            anyhow::bail!("Verification code and grant lifetimes must be > 0 minutes");
        }

        if verification.max_attempts <= 0 {
            anyhow::bail!("Verification max_attempts must be > 0");
        }

        if self.storefront.high_value_threshold.is_sign_negative() {
            anyhow::bail!("High value threshold cannot be negative");
        }

        if self.server.session_minutes <= 0 {
            anyhow::bail!("Session lifetime must be > 0 minutes");
        }

        if !self.notifications.log_only {
            let n = &self.notifications;
            if n.email_endpoint.is_none() && n.sms_endpoint.is_none() && n.whatsapp_endpoint.is_none()
            {
                anyhow::bail!("At least one notification endpoint is required when log_only is off");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.verification.code_length, 6);
        assert_eq!(config.security.verification.code_ttl_minutes, 10);
        assert_eq!(config.storefront.currency, "MXN");
        assert!(config.notifications.log_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[security.verification]"));
        assert!(toml_str.contains("[storefront]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [security.verification]
            code_ttl_minutes = 5

            [storefront]
            high_value_threshold = "2500.00"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.security.verification.code_ttl_minutes, 5);
        assert_eq!(config.security.verification.code_length, 6);
        assert_eq!(
            config.storefront.high_value_threshold,
            Decimal::new(250_000, 2)
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.security.verification.code_length = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.notifications.log_only = false;
        assert!(config.validate().is_err());
        config.notifications.sms_endpoint = Some("https://sms.example.com/send".to_string());
        assert!(config.validate().is_ok());
    }
}
