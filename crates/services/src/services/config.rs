//! Runtime configuration read from the process environment.

use std::{env, net::IpAddr, str::FromStr, time::Duration};

use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("{0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),
}

/// Credentials of the administrator created on first start.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub correo: String,
    pub clave: SecretString,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_ttl: chrono::Duration,
    pub expiry_sweep_interval: Duration,
    pub admin: Option<AdminBootstrap>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://backoffice.db".to_string(),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            db_max_connections: 10,
            session_ttl: chrono::Duration::hours(8),
            expiry_sweep_interval: Duration::from_secs(3600),
            admin: None,
        }
    }
}

impl Config {
    /// Reads the process environment. A `.env` file, if any, should be loaded beforehand.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let session_ttl_hours: i64 = parse(&value, "SESSION_TTL_HOURS", 8)?;
        let sweep_secs: u64 = parse(&value, "EXPIRY_SWEEP_SECS", 3600)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                var: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "EXPIRY_SWEEP_SECS",
                value: "0".to_string(),
            });
        }

        let admin = match (value("ADMIN_EMAIL"), value("ADMIN_PASSWORD")) {
            (Some(correo), Some(clave)) => Some(AdminBootstrap {
                correo: correo.trim().to_string(),
                clave: SecretString::from(clave),
            }),
            (Some(_), None) => return Err(ConfigError::Incomplete("ADMIN_EMAIL", "ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("ADMIN_PASSWORD", "ADMIN_EMAIL")),
            (None, None) => None,
        };

        Ok(Self {
            database_url: value("DATABASE_URL").unwrap_or(defaults.database_url),
            host: parse(&value, "HOST", defaults.host)?,
            port: parse(&value, "PORT", defaults.port)?,
            db_max_connections: parse(&value, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            session_ttl: chrono::Duration::hours(session_ttl_hours),
            expiry_sweep_interval: Duration::from_secs(sweep_secs),
            admin,
        })
    }
}

fn parse<T, F>(value: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match value(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}
