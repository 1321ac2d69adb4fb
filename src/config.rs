use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the progress engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Record store settings
    pub store: StoreConfig,
    /// Collection names in the record store
    pub collections: CollectionsConfig,
    /// Notification record settings
    pub notifications: NotificationConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON document used by the file-backed store
    pub data_file: String,
    /// Sustained request rate against the store
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst_capacity: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: "mo-progress-data.json".to_string(),
            requests_per_second: 20,
            burst_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionsConfig {
    pub orders: String,
    pub parts: String,
    pub users: String,
    pub projects: String,
    pub notifications: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            orders: "MO_Table".to_string(),
            parts: "Parts_Table".to_string(),
            users: "users".to_string(),
            projects: "Projects".to_string(),
            notifications: "Notifications".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Page the deep link in a notification points at
    pub order_link_path: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            order_link_path: "/MO_Card.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        // Start with default configuration
        let mut builder = Config::builder().add_source(Config::try_from(&EngineConfig::default())?);

        if Path::new("mo-progress.toml").exists() {
            builder = builder.add_source(File::with_name("mo-progress"));
        }

        // Override with environment variables, e.g. MO_PROGRESS__STORE__DATA_FILE
        builder = builder.add_source(
            Environment::with_prefix("MO_PROGRESS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

static CONFIG: std::sync::LazyLock<Result<EngineConfig, anyhow::Error>> = std::sync::LazyLock::new(|| {
    // Load .env file first
    let _ = EngineConfig::load_env_file();
    EngineConfig::load()
});

pub fn config() -> Result<&'static EngineConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Load the configuration and log where records will be read from.
pub fn init_config() -> Result<()> {
    let config = config()?;
    tracing::info!(
        data_file = %config.store.data_file,
        orders = %config.collections.orders,
        parts = %config.collections.parts,
        "Configuration loaded successfully"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_the_standard_collections() {
        let config = EngineConfig::default();
        assert_eq!(config.collections.orders, "MO_Table");
        assert_eq!(config.collections.parts, "Parts_Table");
        assert_eq!(config.notifications.order_link_path, "/MO_Card.html");
        assert!(config.store.requests_per_second > 0);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [collections]
            orders = "Orders"

            [observability]
            json_logs = false
            "#,
        )
        .unwrap();

        assert_eq!(config.collections.orders, "Orders");
        assert_eq!(config.collections.users, "users");
        assert!(!config.observability.json_logs);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn init_config_loads_the_shared_configuration() {
        assert!(init_config().is_ok());
        assert!(!config().unwrap().collections.orders.is_empty());
    }

    #[test]
    fn saved_file_loads_back() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("mo-progress.toml");
        let mut config = EngineConfig::default();
        config.store.data_file = "plant.json".to_string();

        config.save_to_file(&path).unwrap();
        let loaded: EngineConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(loaded.store.data_file, "plant.json");
        assert_eq!(loaded.collections, config.collections);
    }
}
