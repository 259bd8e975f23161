use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_RESERVATION_TTL_SECS: u64 = 900;
const DEFAULT_RESERVATION_SWEEP_SECS: u64 = 30;
const DEFAULT_MAX_TICKETS_PER_RESERVATION: u32 = 10;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub reservation_ttl: Duration,
    pub sweep_interval: Duration,
    pub max_tickets_per_reservation: u32,
    pub cors_allowed_origins: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let bind_addr = parse_or(
            &lookup,
            "BIND_ADDR",
            SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        )?;
        let db_max_connections =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let ttl_secs = parse_or(&lookup, "RESERVATION_TTL_SECS", DEFAULT_RESERVATION_TTL_SECS)?;
        let sweep_secs = parse_or(
            &lookup,
            "RESERVATION_SWEEP_SECS",
            DEFAULT_RESERVATION_SWEEP_SECS,
        )?;
        let max_tickets_per_reservation = parse_or(
            &lookup,
            "MAX_TICKETS_PER_RESERVATION",
            DEFAULT_MAX_TICKETS_PER_RESERVATION,
        )?;

        for (name, value) in [
            ("RESERVATION_TTL_SECS", ttl_secs),
            ("RESERVATION_SWEEP_SECS", sweep_secs),
            ("DB_MAX_CONNECTIONS", u64::from(db_max_connections)),
            (
                "MAX_TICKETS_PER_RESERVATION",
                u64::from(max_tickets_per_reservation),
            ),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    name,
                    value: value.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            reservation_ttl: Duration::from_secs(ttl_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
            max_tickets_per_reservation,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            production: lookup("RUST_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        })
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
