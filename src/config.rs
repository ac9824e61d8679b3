// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup into
//! [`AppConfig`]. Invalid or missing required values abort startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `postwallet.redb` | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 signing secret for access tokens | Required |
//! | `JWT_TTL_SECS` | Access token lifetime in seconds | `86400` |
//! | `TOKEN_BLACKLIST_TTL` | Retention of revoked tokens in seconds | `172800` |
//! | `POST_CREATION_COST` | Fee debited per created post | `5.00` |
//! | `STRIPE_SECRET_KEY` | Stripe API key; enables wallet funding | Optional |
//! | `STRIPE_WEBHOOK_SECRET` | Stripe webhook signing secret | Required with Stripe |
//! | `STRIPE_API_BASE_URL` | Stripe API base URL | `https://api.stripe.com` |
//! | `PAYMENT_CURRENCY` | ISO currency of payment intents | `usd` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::ledger::money;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_ENV: &str = "JWT_TTL_SECS";
pub const TOKEN_BLACKLIST_TTL_ENV: &str = "TOKEN_BLACKLIST_TTL";
pub const POST_CREATION_COST_ENV: &str = "POST_CREATION_COST";
pub const STRIPE_SECRET_KEY_ENV: &str = "STRIPE_SECRET_KEY";
pub const STRIPE_WEBHOOK_SECRET_ENV: &str = "STRIPE_WEBHOOK_SECRET";
pub const STRIPE_API_BASE_URL_ENV: &str = "STRIPE_API_BASE_URL";
pub const PAYMENT_CURRENCY_ENV: &str = "PAYMENT_CURRENCY";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_TTL_SECS: i64 = 86_400;
pub const DEFAULT_TOKEN_BLACKLIST_TTL_SECS: i64 = 172_800;
pub const DEFAULT_POST_CREATION_COST: &str = "5.00";
pub const DEFAULT_STRIPE_API_BASE_URL: &str = "https://api.stripe.com";
pub const DEFAULT_PAYMENT_CURRENCY: &str = "usd";

/// Default `RUST_LOG` filter when the variable is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "postwallet.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Stripe credentials. Present only when `STRIPE_SECRET_KEY` is set.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub token_blacklist_ttl_secs: i64,
    /// Always scale 2 and positive
    pub post_creation_cost: Decimal,
    pub payment_currency: String,
    pub stripe: Option<StripeConfig>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let jwt_ttl_secs = positive_secs(get(JWT_TTL_ENV), JWT_TTL_ENV, DEFAULT_JWT_TTL_SECS)?;
        let token_blacklist_ttl_secs = positive_secs(
            get(TOKEN_BLACKLIST_TTL_ENV),
            TOKEN_BLACKLIST_TTL_ENV,
            DEFAULT_TOKEN_BLACKLIST_TTL_SECS,
        )?;

        let raw_cost =
            get(POST_CREATION_COST_ENV).unwrap_or_else(|| DEFAULT_POST_CREATION_COST.to_string());
        let post_creation_cost = money::parse_amount(&raw_cost)
            .and_then(money::validate_amount)
            .map_err(|e| ConfigError::Invalid {
                name: POST_CREATION_COST_ENV,
                reason: e.to_string(),
            })?;

        let stripe = match get(STRIPE_SECRET_KEY_ENV) {
            Some(secret_key) => Some(StripeConfig {
                secret_key,
                webhook_secret: get(STRIPE_WEBHOOK_SECRET_ENV)
                    .ok_or(ConfigError::Missing(STRIPE_WEBHOOK_SECRET_ENV))?,
                api_base_url: get(STRIPE_API_BASE_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE_URL.to_string()),
            }),
            None => None,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let data_dir = get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwt_secret,
            jwt_ttl_secs,
            token_blacklist_ttl_secs,
            post_creation_cost,
            payment_currency: get(PAYMENT_CURRENCY_ENV)
                .unwrap_or_else(|| DEFAULT_PAYMENT_CURRENCY.to_string())
                .to_ascii_lowercase(),
            stripe,
            log_format,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn positive_secs(
    raw: Option<String>,
    name: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        Ok(_) => Err(ConfigError::Invalid {
            name,
            reason: "must be a positive number of seconds".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
