// ABOUTME: Runtime configuration read from the environment (and an optional .env file)
// ABOUTME: Covers database location, listen address, logging format and pagination bounds

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// `production` turns off error diagnostics in responses.
    pub app_env: String,
    pub log_format: LogFormat,
    pub default_page_limit: u64,
    pub max_page_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:notespace.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            app_env: "development".to_string(),
            log_format: LogFormat::Text,
            default_page_limit: 20,
            max_page_limit: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            app_env: env::var("APP_ENV").unwrap_or(defaults.app_env),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            default_page_limit: parse_var("DEFAULT_PAGE_LIMIT", defaults.default_page_limit)?,
            max_page_limit: parse_var("MAX_PAGE_LIMIT", defaults.max_page_limit)?,
        };

        if config.max_page_limit == 0 || config.default_page_limit == 0 {
            anyhow::bail!("page limits must be at least 1");
        }
        if config.default_page_limit > config.max_page_limit {
            anyhow::bail!(
                "DEFAULT_PAGE_LIMIT ({}) exceeds MAX_PAGE_LIMIT ({})",
                config.default_page_limit,
                config.max_page_limit
            );
        }

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn expose_error_details(&self) -> bool {
        !self.is_production()
    }
}

fn parse_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a positive integer, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_development() {
        let config = Config::default();
        assert!(!config.is_production());
        assert!(config.expose_error_details());
        assert!(config.default_page_limit <= config.max_page_limit);
    }

    #[test]
    fn production_hides_details() {
        let config = Config {
            app_env: "Production".to_string(),
            ..Config::default()
        };
        assert!(config.is_production());
        assert!(!config.expose_error_details());
    }
}
