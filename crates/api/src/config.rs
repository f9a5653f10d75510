//! Application configuration loaded from environment variables.

use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST` (default `"0.0.0.0"`) and `PORT` (default `5000`)
/// - `RUST_LOG` tracing filter (default `"info"`), `LOG_FORMAT` (`json` for JSON lines)
/// - `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS` (default `10`)
/// - `TOKEN_SECRET` (required), `TOKEN_RETIRED_SECRETS` (comma separated),
///   `TOKEN_TTL_SECS` (default one day)
/// - `REQUEST_TIMEOUT_SECS` (default `30`), `PRODUCTS_PAGE_SIZE` (default `20`)
#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: SecretString,
    pub database_max_connections: u32,
    pub token_secret: SecretString,
    pub token_retired_secrets: Vec<SecretString>,
    pub token_ttl_secs: i64,
    pub request_timeout_secs: u64,
    pub products_page_size: i64,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        let config = Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse(&var, "PORT", defaults.port)?,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: SecretString::from(required("DATABASE_URL")?),
            database_max_connections: parse(
                &var,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            token_secret: SecretString::from(required("TOKEN_SECRET")?),
            token_retired_secrets: var("TOKEN_RETIRED_SECRETS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| SecretString::from(s.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
            token_ttl_secs: parse(&var, "TOKEN_TTL_SECS", defaults.token_ttl_secs)?,
            request_timeout_secs: parse(
                &var,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            products_page_size: parse(&var, "PRODUCTS_PAGE_SIZE", defaults.products_page_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("TOKEN_TTL_SECS", self.token_ttl_secs),
            ("PRODUCTS_PAGE_SIZE", self.products_page_size),
            ("DATABASE_MAX_CONNECTIONS", i64::from(self.database_max_connections)),
        ];
        for (var, value) in positive {
            if value < 1 {
                return Err(ConfigError::Invalid {
                    var,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var: name,
            value,
        }),
        None => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: SecretString::from(String::new()),
            database_max_connections: 10,
            token_secret: SecretString::from(String::new()),
            token_retired_secrets: Vec::new(),
            token_ttl_secs: 86_400,
            request_timeout_secs: 30,
            products_page_size: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/shop"),
        ("TOKEN_SECRET", "signing-key"),
    ];

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.products_page_size, 20);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_required_values_only() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:5000");
        assert_eq!(config.token_secret.expose_secret(), "signing-key");
        assert!(config.token_retired_secrets.is_empty());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_secret() {
        let err = load(&[("DATABASE_URL", "postgres://localhost/shop")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TOKEN_SECRET"));

        let err = load(&[("DATABASE_URL", "x"), ("TOKEN_SECRET", "  ")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TOKEN_SECRET"));
    }

    #[test]
    fn test_overrides_and_retired_secrets() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("PORT", "8081"),
            ("LOG_FORMAT", "json"),
            ("TOKEN_RETIRED_SECRETS", "old-1, ,old-2"),
            ("PRODUCTS_PAGE_SIZE", "50"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.products_page_size, 50);
        let retired: Vec<&str> = config
            .token_retired_secrets
            .iter()
            .map(|s| s.expose_secret())
            .collect();
        assert_eq!(retired, vec!["old-1", "old-2"]);
    }

    #[test]
    fn test_invalid_numbers() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("PRODUCTS_PAGE_SIZE", "0"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                var: "PRODUCTS_PAGE_SIZE",
                ..
            })
        ));
    }
}
