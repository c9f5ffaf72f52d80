use fleet_core::config::{self as core_config, ObservabilityConfig, ServerConfig};
use fleet_core::error::AppError;
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    #[serde(default = "default_database")]
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Attempts at the optimistic totals write before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_overdue_critical_days")]
    pub overdue_critical_days: i64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            overdue_critical_days: default_overdue_critical_days(),
        }
    }
}

fn default_database() -> String {
    "fleet_admin".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_overdue_critical_days() -> i64 {
    7
}

impl AdminConfig {
    /// Reads `configuration.*` and `FLEET__*` variables, e.g. `FLEET__MONGODB__URI`.
    pub fn load() -> Result<Self, AppError> {
        core_config::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn only_mongodb_uri_is_required() {
        let config: AdminConfig =
            serde_json::from_str(r#"{ "mongodb": { "uri": "mongodb://db:27017" } }"#).unwrap();

        assert_eq!(config.mongodb.uri.expose_secret(), "mongodb://db:27017");
        assert_eq!(config.mongodb.database, "fleet_admin");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.sync.max_retries, 5);
        assert_eq!(config.alerts.overdue_critical_days, 7);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn missing_mongodb_section_is_an_error() {
        assert!(serde_json::from_str::<AdminConfig>("{}").is_err());
    }
}
