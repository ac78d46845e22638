use std::env;
use std::path::PathBuf;

use lazy_static::lazy_static;

pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

lazy_static! {
    pub static ref CONFIG: Config = Config::from_env();
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub media_root: PathBuf,
    pub max_connections: u32,
    pub superuser: Option<SuperuserSeed>,
}

/// Credentials for the superuser the binary creates on first start.
#[derive(Debug, Clone)]
pub struct SuperuserSeed {
    pub user_id: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_connections = match non_empty("QRMARK_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!(
                    "Ignoring invalid QRMARK_MAX_CONNECTIONS `{}`, using {}",
                    raw,
                    DEFAULT_MAX_CONNECTIONS
                );
                DEFAULT_MAX_CONNECTIONS
            }),
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let superuser = match (
            non_empty("QRMARK_SUPERUSER_ID"),
            non_empty("QRMARK_SUPERUSER_PASSWORD"),
        ) {
            (Some(user_id), Some(password)) => Some(SuperuserSeed { user_id, password }),
            _ => None,
        };

        Config {
            database_url: non_empty("DATABASE_URL"),
            media_root: non_empty("QRMARK_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            max_connections,
            superuser,
        }
    }
}
