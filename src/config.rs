//!
//! Connection settings for the primary/standby pair, read from the
//! environment with defaults matching the bundled compose setup.
//!
use std::env;
use std::fmt;
use std::time::Duration;

use postgres::config::SslMode;

pub const DEFAULT_PRIMARY_CONTAINER: &str = "postgres-primary";
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port in {var}: {value:?}")]
    InvalidPort { var: &'static str, value: String },
}

/// Return the value of `key`, or `default` if it is unset or empty.
pub fn get_env(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn get_env_port(key: &'static str, default: u16) -> Result<u16, ConfigError> {
    let value = get_env(key, &default.to_string());
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort { var: key, value })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub dbname: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
        }
    }

    /// Host to hand to the driver. `localhost` may resolve to `::1` first,
    /// which the published container ports don't listen on.
    pub fn resolved_host(&self) -> &str {
        if self.host == "localhost" {
            "127.0.0.1"
        } else {
            &self.host
        }
    }

    /// Driver configuration for this endpoint. Values are passed as-is, so
    /// credentials need no quoting.
    pub fn pg_config(&self, creds: &Credentials, connect_timeout_secs: u64) -> postgres::Config {
        let mut conf = postgres::Config::new();
        conf.host(self.resolved_host())
            .port(self.port)
            .user(&creds.user)
            .password(&creds.password)
            .dbname(&creds.dbname)
            .ssl_mode(SslMode::Disable)
            .connect_timeout(Duration::from_secs(connect_timeout_secs));
        conf
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    pub credentials: Credentials,
    pub primary: Endpoint,
    pub standby: Endpoint,
    /// Container running the primary; writes are executed inside it.
    pub primary_container: String,
    pub container_runtime: String,
    pub connect_timeout_secs: u64,
}

impl ClusterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ClusterConfig {
            credentials: Credentials {
                user: get_env("POSTGRES_USER", "postgres"),
                password: get_env("POSTGRES_PASSWORD", "password"),
                dbname: get_env("POSTGRES_DB", "testdb"),
            },
            primary: Endpoint::new(
                get_env("POSTGRES_PRIMARY_HOST", "localhost"),
                get_env_port("POSTGRES_PRIMARY_PORT", 5432)?,
            ),
            standby: Endpoint::new(
                get_env("POSTGRES_STANDBY_HOST", "localhost"),
                get_env_port("POSTGRES_STANDBY_PORT", 5433)?,
            ),
            primary_container: get_env("POSTGRES_PRIMARY_CONTAINER", DEFAULT_PRIMARY_CONTAINER),
            container_runtime: get_env("CONTAINER_RUNTIME", DEFAULT_CONTAINER_RUNTIME),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        })
    }
}
