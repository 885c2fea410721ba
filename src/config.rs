use anyhow::Context;
use serde::Deserialize;

/// One year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("SECRET_KEY is empty");
        }
        let ttl_minutes = match std::env::var("JWT_TTL_MINUTES") {
            Ok(v) => v
                .parse::<i64>()
                .ok()
                .filter(|m| (1..=MAX_TTL_MINUTES).contains(m))
                .with_context(|| {
                    format!("JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}")
                })?,
            Err(_) => 60,
        };
        let jwt = JwtConfig {
            secret,
            ttl_minutes,
        };

        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>().context("APP_PORT is not a valid port")?,
            Err(_) => 8080,
        };

        Ok(Self {
            database_url,
            jwt,
            host,
            port,
        })
    }
}
