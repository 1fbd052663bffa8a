// src/config.rs
//! Settings come from three layers, later ones winning:
//! built-in defaults, an optional TOML file, then flags / environment.

use crate::errors::ServerError;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Default)]
#[command(name = "buyer-leads")]
#[command(about = "Buyer lead intake API")]
#[command(version)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, env = "LEADS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:3000
    #[arg(short, long, env = "LEADS_BIND")]
    pub bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "LEADS_DB")]
    pub database: Option<String>,

    /// Worker thread count
    #[arg(short, long, env = "LEADS_WORKERS")]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitStoreKind {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: i64,
    pub store: RateLimitStoreKind,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
            store: RateLimitStoreKind::Memory,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub magic_link_ttl_secs: i64,
    pub session_ttl_secs: i64,
    /// Return the sign-in link in the response body. Development only:
    /// there is no mailer, so otherwise the link only reaches the log.
    pub expose_links: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            magic_link_ttl_secs: 15 * 60,
            session_ttl_secs: 7 * 24 * 60 * 60,
            expose_links: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub database_path: String,
    pub max_workers: usize,
    /// Cap on request bodies, CSV uploads included.
    pub max_upload_bytes: u64,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            database_path: "buyer_leads.sqlite3".to_string(),
            max_workers: 8,
            max_upload_bytes: 2 * 1024 * 1024,
            rate_limit: RateLimitConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self, ServerError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(bind) = &cli.bind {
            config.bind = bind.clone();
        }
        if let Some(database) = &cli.database {
            config.database_path = database.clone();
        }
        if let Some(workers) = cli.workers {
            config.max_workers = workers;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ServerError> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<(), ServerError> {
        if self.max_workers == 0 {
            return Err(ServerError::Config("max_workers must be at least 1".into()));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs <= 0 {
            return Err(ServerError::Config(
                "rate_limit needs positive max_requests and window_secs".into(),
            ));
        }
        if self.auth.magic_link_ttl_secs <= 0 || self.auth.session_ttl_secs <= 0 {
            return Err(ServerError::Config("auth TTLs must be positive".into()));
        }
        Ok(())
    }
}
