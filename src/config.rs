//! Process configuration
//!
//! Everything is read once from the environment (optionally seeded from a
//! `.env` file). Server-wide misconfiguration fails fast at startup.

use std::env;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3005;
const DEFAULT_ZYFAI_API_URL: &str = "https://api.zyf.ai";
const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.x402.rs";
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLIENT_CACHE_CAPACITY: usize = 100;
const DEFAULT_UPSTREAM_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 1800;
const DEFAULT_SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {message}")]
    InvalidUrl { var: &'static str, message: String },

    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} is required when {because}")]
    Missing {
        var: &'static str,
        because: &'static str,
    },
}

/// Upstream DeFi API settings
#[derive(Debug, Clone)]
pub struct ZyfaiApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub client_cache_capacity: usize,
    /// Zero disables the response cache
    pub cache_ttl: Duration,
}

/// x402 payment gate settings
#[derive(Debug, Clone)]
pub struct X402Config {
    pub enabled: bool,
    pub facilitator_url: String,
    pub receiver_address: Option<String>,
}

/// Streamable HTTP session lifecycle settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Zero disables idle expiry
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub admin_api_key: Option<String>,
    pub zyfai: ZyfaiApiConfig,
    pub x402: X402Config,
    pub sessions: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = parse_number("PORT", DEFAULT_PORT)?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let zyfai = ZyfaiApiConfig {
            base_url: parse_url("ZYFAI_API_URL", DEFAULT_ZYFAI_API_URL)?,
            api_key: non_empty_var("ZYFAI_API_KEY"),
            timeout: Duration::from_secs(parse_number(
                "ZYFAI_API_TIMEOUT_SECS",
                DEFAULT_API_TIMEOUT_SECS,
            )?),
            client_cache_capacity: parse_number(
                "CLIENT_CACHE_CAPACITY",
                DEFAULT_CLIENT_CACHE_CAPACITY,
            )?,
            cache_ttl: Duration::from_secs(parse_number(
                "UPSTREAM_CACHE_TTL_SECS",
                DEFAULT_UPSTREAM_CACHE_TTL_SECS,
            )?),
        };

        let x402 = X402Config {
            enabled: env::var("X402_ENABLED")
                .map(|v| v == "true")
                .unwrap_or(false),
            facilitator_url: parse_url("X402_FACILITATOR_URL", DEFAULT_FACILITATOR_URL)?,
            receiver_address: non_empty_var("X402_RECEIVER_ADDRESS"),
        };

        if x402.enabled && x402.receiver_address.is_none() {
            return Err(ConfigError::Missing {
                var: "X402_RECEIVER_ADDRESS",
                because: "X402_ENABLED=true",
            });
        }

        let sessions = SessionConfig {
            idle_timeout: Duration::from_secs(parse_number(
                "MCP_SESSION_IDLE_TIMEOUT_SECS",
                DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
            )?),
            sweep_interval: Duration::from_secs(parse_number(
                "MCP_SESSION_SWEEP_INTERVAL_SECS",
                DEFAULT_SESSION_SWEEP_INTERVAL_SECS,
            )?),
        };

        Ok(Self {
            host,
            port,
            allowed_origins,
            admin_api_key: non_empty_var("ADMIN_API_KEY"),
            zyfai,
            x402,
            sessions,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validated base URL, without trailing slash so paths can be appended
fn parse_url(var: &'static str, default: &str) -> Result<String, ConfigError> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    let normalized = raw.trim().trim_end_matches('/').to_string();
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
        var,
        message: e.to_string(),
    })?;
    Ok(normalized)
}

fn parse_number<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}
