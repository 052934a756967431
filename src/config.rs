//! Service configuration from environment variables.
//!
//! Every setting has a default except the storage credentials; storage is
//! disabled when any of the three Cloudinary variables is missing. Values are
//! read through a lookup function so tests never touch the process
//! environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::auth::{AuthError, StaticTokenAuthenticator};
use crate::db::DEFAULT_MAX_CONNECTIONS;
use crate::debates::DEFAULT_SITE_URL;
use crate::proxy::{DEFAULT_LOOPBACK_HOST, DEFAULT_TRUSTED_SUFFIX};
use crate::storage::{CloudinaryConfig, DEFAULT_API_BASE, DEFAULT_DELIVERY_BASE};
use crate::user_agent::default_user_agent;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;
/// Default SQLite file.
pub const DEFAULT_DATABASE: &str = "filhaal.db";
/// Default request body limit for uploads (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
/// Upper bound for `FILHAAL_DB_MAX_CONNECTIONS`.
pub const MAX_DB_CONNECTIONS: u32 = 20;

const MEMORY_DATABASE: &str = ":memory:";

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid FILHAAL_ADMIN_TOKENS: {0}")]
    AdminTokens(#[from] AuthError),
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where the structured store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

impl DatabaseLocation {
    fn parse(value: &str) -> Self {
        if value == MEMORY_DATABASE {
            Self::Memory
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub database: DatabaseLocation,
    pub db_max_connections: u32,
    /// Root of the public debates site.
    pub site_url: Url,
    pub user_agent: String,
    /// `None` keeps outbound fetches unbounded.
    pub fetch_timeout: Option<Duration>,
    pub trusted_storage_suffix: String,
    pub loopback_host: String,
    /// Hosts this service is publicly reachable at; the proxy accepts them
    /// as targets.
    pub public_hosts: Vec<String>,
    pub max_upload_bytes: usize,
    pub admin_tokens: StaticTokenAuthenticator,
    /// `None` when storage credentials are incomplete.
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind = parse_or(&get, "FILHAAL_BIND", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse_or(&get, "FILHAAL_PORT", DEFAULT_PORT)?;
        let database = DatabaseLocation::parse(
            &get("FILHAAL_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        );

        let db_max_connections =
            parse_or(&get, "FILHAAL_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        if !(1..=MAX_DB_CONNECTIONS).contains(&db_max_connections) {
            return Err(ConfigError::invalid(
                "FILHAAL_DB_MAX_CONNECTIONS",
                &db_max_connections.to_string(),
                format!("must be between 1 and {MAX_DB_CONNECTIONS}"),
            ));
        }

        let site_raw = get("FILHAAL_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        let site_url = Url::parse(&site_raw)
            .map_err(|e| ConfigError::invalid("FILHAAL_SITE_URL", &site_raw, e))?;
        if !matches!(site_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "FILHAAL_SITE_URL",
                &site_raw,
                "must be an http(s) URL",
            ));
        }

        let fetch_timeout = match get("FILHAAL_FETCH_TIMEOUT_SECS") {
            None => None,
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|e| ConfigError::invalid("FILHAAL_FETCH_TIMEOUT_SECS", &raw, e))?;
                if secs == 0 {
                    return Err(ConfigError::invalid(
                        "FILHAAL_FETCH_TIMEOUT_SECS",
                        &raw,
                        "must be greater than zero",
                    ));
                }
                Some(Duration::from_secs(secs))
            }
        };

        let max_upload_bytes =
            parse_or(&get, "FILHAAL_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let admin_tokens =
            StaticTokenAuthenticator::parse(&get("FILHAAL_ADMIN_TOKENS").unwrap_or_default())?;

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                api_base: get("CLOUDINARY_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                delivery_base: get("CLOUDINARY_DELIVERY_BASE")
                    .unwrap_or_else(|| DEFAULT_DELIVERY_BASE.to_string()),
            }),
            _ => {
                debug!("cloudinary credentials incomplete; storage disabled");
                None
            }
        };

        Ok(Self {
            bind,
            port,
            database,
            db_max_connections,
            site_url,
            user_agent: get("FILHAAL_USER_AGENT").unwrap_or_else(default_user_agent),
            fetch_timeout,
            trusted_storage_suffix: get("FILHAAL_TRUSTED_STORAGE_SUFFIX")
                .unwrap_or_else(|| DEFAULT_TRUSTED_SUFFIX.to_string()),
            loopback_host: get("FILHAAL_LOOPBACK_HOST")
                .unwrap_or_else(|| DEFAULT_LOOPBACK_HOST.to_string()),
            public_hosts: get("FILHAAL_PUBLIC_HOST")
                .map(|raw| split_hosts(&raw))
                .unwrap_or_default(),
            max_upload_bytes,
            admin_tokens,
            cloudinary,
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn apply_overrides(&mut self, bind: Option<IpAddr>, port: Option<u16>, database: Option<&str>) {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(database) = database {
            self.database = DatabaseLocation::parse(database);
        }
    }

    /// Socket address to listen on.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Logs the effective settings without secrets.
    pub fn log_summary(&self) {
        info!(
            addr = %self.socket_addr(),
            database = ?self.database,
            site = %self.site_url,
            storage = self.cloudinary.is_some(),
            public_hosts = ?self.public_hosts,
            admin_tokens = self.admin_tokens.len(),
            fetch_timeout_secs = self.fetch_timeout.map(|t| t.as_secs()),
            "configuration loaded"
        );
    }
}

fn split_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e)),
    }
}
