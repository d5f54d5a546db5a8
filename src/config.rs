use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::delivery::DeliveryTimeline;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db_pool_size: u32,
    pub session_ttl: Duration,
    pub delivery: DeliveryTimeline,
}

impl Settings {
    /// Reads settings from the process environment. Call `dotenvy::dotenv()`
    /// first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let db_pool_size = parse_or(&lookup, "DB_POOL_SIZE", 10u32)?;
        let session_ttl = Duration::from_secs(parse_or(&lookup, "SESSION_TTL_SECONDS", 1_209_600u64)?);
        let processing = parse_or(&lookup, "DELIVERY_PROCESSING_SECONDS", 60i64)?;
        let en_route = parse_or(&lookup, "DELIVERY_EN_ROUTE_SECONDS", 60i64)?;
        if processing <= 0 {
            return Err(ConfigError::Invalid {
                name: "DELIVERY_PROCESSING_SECONDS",
                value: processing.to_string(),
            });
        }
        if en_route <= 0 {
            return Err(ConfigError::Invalid {
                name: "DELIVERY_EN_ROUTE_SECONDS",
                value: en_route.to_string(),
            });
        }

        Ok(Settings {
            database_url,
            redis_url,
            host,
            port,
            db_pool_size,
            session_ttl,
            delivery: DeliveryTimeline::from_seconds(processing, en_route),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let s = settings(&[("DATABASE_URL", "postgres://localhost/becathlon")]).unwrap();
        assert_eq!(s.port, 8080);
        assert_eq!(s.host, "127.0.0.1");
        assert!(s.redis_url.is_none());
        assert_eq!(s.session_ttl, Duration::from_secs(1_209_600));
        assert_eq!(s.delivery, DeliveryTimeline::from_seconds(60, 60));
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(settings(&[]).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn malformed_port_is_rejected() {
        let err = settings(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_owned()
            }
        );
    }

    #[test]
    fn blank_redis_url_means_memory_sessions() {
        let s = settings(&[("DATABASE_URL", "postgres://x"), ("REDIS_URL", "  ")]).unwrap();
        assert!(s.redis_url.is_none());
    }

    #[test]
    fn delivery_windows_must_be_positive() {
        let err = settings(&[
            ("DATABASE_URL", "postgres://x"),
            ("DELIVERY_EN_ROUTE_SECONDS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DELIVERY_EN_ROUTE_SECONDS", .. }));
    }
}
