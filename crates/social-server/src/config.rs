use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use tracing::info;

pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: try_load("DATABASE_URL", "social_network.db")?,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "3001")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e: T::Err| anyhow!("invalid {key} value {raw:?}: {e}"))
}
