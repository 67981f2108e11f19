//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod limits;
pub mod logging;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::database::DatabaseConfig;
pub use self::limits::LimitsConfig;
pub use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay + `ITEMHUB__*` variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Structural limits enforced by the tree-mutation tasks.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `path` with the `config/{env}` overlay and environment
    /// variables prefixed with `ITEMHUB__`, then validates the database
    /// and limits sections.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ITEMHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.database.validate()?;
        config.limits.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn write_config(name: &str, body: &str) -> String {
        let path = std::env::temp_dir().join(format!("itemhub-{name}-{}.toml", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_fills_section_defaults() {
        let path = write_config(
            "defaults",
            r#"
            [database]
            url = "postgres://localhost/itemhub"

            [limits]
            max_children = 5
            "#,
        );

        let config = AppConfig::load(&path, "no-such-overlay").unwrap();
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.database.acquire_timeout_seconds, 5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.limits.max_children, 5);
        assert_eq!(config.limits.delete_subtask_threshold, 20);
    }

    #[test]
    fn test_load_rejects_invalid_limits() {
        let path = write_config(
            "invalid",
            r#"
            [database]
            url = "postgres://localhost/itemhub"

            [limits]
            max_tree_depth = 0
            "#,
        );

        let err = AppConfig::load(&path, "no-such-overlay").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_load_rejects_empty_pool() {
        let path = write_config(
            "pool",
            r#"
            [database]
            url = "postgres://localhost/itemhub"
            pool_size = 0
            "#,
        );

        let err = AppConfig::load(&path, "no-such-overlay").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_load_requires_database_section() {
        let path = write_config("empty", "[logging]\nlevel = \"debug\"\n");

        let err = AppConfig::load(&path, "no-such-overlay").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
