//! Import configuration loaded from environment variables.

use mudclub_core::import::OnError;
use mudclub_core::role::RoleKind;

/// Default pool size when `DATABASE_MAX_CONNECTIONS` is unset.
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("DATABASE_URL must be set unless --dry-run is given")]
    MissingDatabaseUrl,
}

/// Settings for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// PostgreSQL connection string. Unused for dry runs.
    pub database_url: Option<String>,
    /// Pool size (default: `20`).
    pub max_connections: u32,
    /// Role every row is imported as (default: `player`).
    pub role: RoleKind,
    /// Behaviour after a failed row (default: `skip`).
    pub on_error: OnError,
    /// Whether the first CSV line is a header (default: `true`).
    pub has_headers: bool,
    /// Value for the `active` flag of imported records; unset keeps it.
    pub active: Option<bool>,
    /// Run against an in-memory store and discard the result.
    pub dry_run: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            role: RoleKind::Player,
            on_error: OnError::Skip,
            has_headers: true,
            active: None,
            dry_run: false,
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default  |
    /// |----------------------------|----------|
    /// | `DATABASE_URL`             | --       |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`     |
    /// | `IMPORT_ROLE`              | `player` |
    /// | `IMPORT_ON_ERROR`          | `skip`   |
    /// | `IMPORT_HAS_HEADERS`       | `true`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            ..Self::default()
        };

        if let Some(value) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "DATABASE_MAX_CONNECTIONS",
                value: value.clone(),
                reason: "must be a positive integer".into(),
            })?;
        }
        if let Some(value) = lookup("IMPORT_ROLE") {
            config.role = value.parse().map_err(|e| invalid("IMPORT_ROLE", &value, e))?;
        }
        if let Some(value) = lookup("IMPORT_ON_ERROR") {
            config.on_error = value
                .parse()
                .map_err(|e| invalid("IMPORT_ON_ERROR", &value, e))?;
        }
        if let Some(value) = lookup("IMPORT_HAS_HEADERS") {
            config.has_headers = value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "IMPORT_HAS_HEADERS",
                value: value.clone(),
                reason: "must be true or false".into(),
            })?;
        }
        Ok(config)
    }

    /// The connection string, required for anything but a dry run.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

fn invalid(var: &'static str, value: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ImportConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ImportConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, ImportConfig::default());
        assert_eq!(config.database_url(), Err(ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/mudclub"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("IMPORT_ROLE", "Coach"),
            ("IMPORT_ON_ERROR", "abort"),
            ("IMPORT_HAS_HEADERS", "false"),
        ])
        .unwrap();
        assert_eq!(config.database_url(), Ok("postgres://localhost/mudclub"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.role, RoleKind::Coach);
        assert_eq!(config.on_error, OnError::Abort);
        assert!(!config.has_headers);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("IMPORT_ROLE", "goalie")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "IMPORT_ROLE", .. }));

        let err = load(&[("DATABASE_MAX_CONNECTIONS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DATABASE_MAX_CONNECTIONS", .. }));
    }
}
