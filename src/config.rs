//! Runtime settings read from the environment (a `.env` file is honoured by the binary).

use crate::error::ConfigError;
use std::str::FromStr;

/// Which backend holds the records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgres,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "postgres" | "postgresql" => Ok(StorageKind::Postgres),
            _ => Err(ConfigError::Invalid {
                key: "STORAGE",
                value: s.to_string(),
            }),
        }
    }
}

/// Defaults and cap for `limit` on list endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        PageLimits {
            default_limit: 10,
            max_limit: 1000,
        }
    }
}

impl PageLimits {
    /// Requested limit, falling back to the default and clamped to the cap.
    pub fn resolve(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub database_schema: String,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub pages: PageLimits,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `STORAGE` defaults to postgres when `DATABASE_URL` is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        let storage = match lookup("STORAGE") {
            Some(s) => s.parse()?,
            None if database_url.is_some() => StorageKind::Postgres,
            None => StorageKind::Memory,
        };
        if storage == StorageKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        let defaults = PageLimits::default();
        let pages = PageLimits {
            default_limit: parse_or(&lookup, "DEFAULT_PAGE_LIMIT", defaults.default_limit)?,
            max_limit: parse_or(&lookup, "MAX_PAGE_LIMIT", defaults.max_limit)?,
        };
        Ok(ServerConfig {
            storage,
            database_url,
            database_schema: lookup("DATABASE_SCHEMA").unwrap_or_else(|| "public".into()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            pages,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", 1024 * 1024)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
