//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use party_blackjack::table::TableConfig;
use std::net::SocketAddr;

const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape address; the exporter is off when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Settings applied to every room
    pub table: TableConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if an address or number can't be parsed
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        Self::from_lookup(bind_override, |key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(bind_override: Option<SocketAddr>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_var(&lookup, "SERVER_BIND")?
                .map_or_else(|| parse_default(DEFAULT_BIND), Ok)?,
        };

        let metrics_bind = parse_var(&lookup, "METRICS_BIND")?;

        let defaults = TableConfig::default();
        let table = TableConfig {
            starting_chips: parse_var(&lookup, "STARTING_CHIPS")?
                .unwrap_or(defaults.starting_chips),
            num_decks: parse_var(&lookup, "NUM_DECKS")?.unwrap_or(defaults.num_decks),
            max_players: parse_var(&lookup, "MAX_PLAYERS")?.unwrap_or(defaults.max_players),
            reset_delay_ms: parse_var(&lookup, "RESET_DELAY_MS")?
                .unwrap_or(defaults.reset_delay_ms),
            max_hands: parse_var(&lookup, "MAX_HANDS")?.unwrap_or(defaults.max_hands),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            table,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        self.table
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "table settings".to_string(),
                reason,
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an optional variable, rejecting values that don't parse
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

fn parse_default(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.parse().map_err(|e| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("default '{addr}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(None, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind, DEFAULT_BIND.parse().unwrap());
        assert_eq!(config.metrics_bind, None);
        assert_eq!(config.table, TableConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_values_override_defaults() {
        let config = load(&[
            ("SERVER_BIND", "0.0.0.0:8080"),
            ("METRICS_BIND", "0.0.0.0:9090"),
            ("STARTING_CHIPS", "500"),
            ("NUM_DECKS", "2"),
            ("MAX_PLAYERS", "5"),
            ("RESET_DELAY_MS", "1000"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.metrics_bind.map(|a| a.port()), Some(9090));
        assert_eq!(config.table.starting_chips, 500);
        assert_eq!(config.table.num_decks, 2);
        assert_eq!(config.table.max_players, 5);
        assert_eq!(config.table.reset_delay_ms, 1000);
    }

    #[test]
    fn test_cli_bind_wins() {
        let cli: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config = ServerConfig::from_lookup(Some(cli), |key| {
            (key == "SERVER_BIND").then(|| "0.0.0.0:1".to_string())
        })
        .unwrap();
        assert_eq!(config.bind, cli);
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let err = load(&[("NUM_DECKS", "six")]).unwrap_err();
        assert!(err.to_string().contains("NUM_DECKS"));
    }

    #[test]
    fn test_out_of_range_table_settings_rejected() {
        let config = load(&[("MAX_PLAYERS", "12")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_metrics_address_must_differ() {
        let config = load(&[
            ("SERVER_BIND", "127.0.0.1:8080"),
            ("METRICS_BIND", "127.0.0.1:8080"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }
}
