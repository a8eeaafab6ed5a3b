use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;

use crate::error::LoadError;

const URL_VARS: [&str; 2] = ["DATABASE_URL", "MOBILITY_DATABASE_URL"];
const DEFAULT_PORT: u16 = 5432;

/// Where the dashboard database lives.
///
/// Either a full connection URL or the individual parts the deployment
/// exposes as `MDI_*` variables.
#[derive(Clone, PartialEq, Eq)]
pub enum DbConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: String,
    },
}

impl DbConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, LoadError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, LoadError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = URL_VARS.iter().find_map(|key| present(*key)) {
            return Ok(DbConfig::Url(url));
        }

        let required = |key: &str| {
            present(key).ok_or_else(|| {
                LoadError::Config(format!(
                    "{key} must be set when DATABASE_URL (or MOBILITY_DATABASE_URL) is not"
                ))
            })
        };

        let port = match present("MDI_DB_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|err| {
                LoadError::Config(format!("MDI_DB_PORT '{raw}' is not a port: {err}"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(DbConfig::Parts {
            host: required("MDI_DB_HOST")?,
            port,
            database: required("MDI_DASHBOARD_DB_NAME")?,
            user: required("MDI_DB_USER")?,
            password: required("MDI_DB_PASSWORD")?,
        })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, LoadError> {
        match self {
            DbConfig::Url(url) => Ok(PgConnectOptions::from_str(url)?),
            DbConfig::Parts {
                host,
                port,
                database,
                user,
                password,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(database)
                .username(user)
                .password(password)),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbConfig::Url(_) => f.debug_tuple("Url").field(&"<redacted>").finish(),
            DbConfig::Parts {
                host,
                port,
                database,
                user,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("database", database)
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
