use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("unknown APP_ENV value: {other}"),
        }
    }
}

/// Credentials for the outbound SMS provider. Present only when every
/// variable is set; otherwise SMS scheduling is disabled.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub cors_extra_origins: Vec<String>,
    pub environment: Environment,
    pub static_dir: String,

    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,

    pub twilio: Option<TwilioConfig>,

    pub auth_rate_limit_max: u32,
    pub auth_rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("PORT", 3000)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            environment: parse_or("APP_ENV", Environment::Production)?,
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".into()),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_ttl_secs: jwt_ttl(parse_or("JWT_TTL_SECS", 7 * 24 * 60 * 60)?)?,

            twilio: twilio_from_env(),

            auth_rate_limit_max: parse_or("AUTH_RATE_LIMIT_MAX", 10)?,
            auth_rate_limit_window_secs: parse_or("AUTH_RATE_LIMIT_WINDOW_SECS", 60)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Local development values. No database URL and no SMS provider.
impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 20,
            host: "127.0.0.1".into(),
            port: 3000,
            frontend_url: "http://localhost:3000".into(),
            cors_extra_origins: Vec::new(),
            environment: Environment::Development,
            static_dir: "public".into(),
            jwt_secret: "dev-secret".into(),
            jwt_ttl_secs: 7 * 24 * 60 * 60,
            twilio: None,
            auth_rate_limit_max: 10,
            auth_rate_limit_window_secs: 60,
        }
    }
}

/// Token lifetime upper bound: one year.
const MAX_JWT_TTL_SECS: i64 = 365 * 24 * 60 * 60;

fn jwt_ttl(secs: i64) -> Result<i64> {
    if !(1..=MAX_JWT_TTL_SECS).contains(&secs) {
        anyhow::bail!("JWT_TTL_SECS must be between 1 and {MAX_JWT_TTL_SECS}, got {secs}");
    }
    Ok(secs)
}

fn twilio_from_env() -> Option<TwilioConfig> {
    let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());

    Some(TwilioConfig {
        account_sid: non_empty("TWILIO_SID")?,
        auth_token: non_empty("TWILIO_AUTH_TOKEN")?,
        from_phone: non_empty("TWILIO_PHONE_NUMBER")?,
        api_base: non_empty("TWILIO_API_BASE").unwrap_or_else(|| "https://api.twilio.com".into()),
    })
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!(
            "Production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn jwt_ttl_must_be_positive_and_bounded() {
        assert_eq!(jwt_ttl(604_800).unwrap(), 604_800);
        assert!(jwt_ttl(0).is_err());
        assert!(jwt_ttl(-60).is_err());
        assert!(jwt_ttl(i64::MAX).is_err());
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u16 = parse_or("MOODSYNC_TEST_SURELY_UNSET_PORT", 4242).unwrap();
        assert_eq!(value, 4242);
    }
}
