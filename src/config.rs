// src/config.rs
//! Process configuration from the environment (`.env` is loaded by main).

use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::ingest::trigger::DEFAULT_COOLDOWN;
use crate::ingest::DEFAULT_SCRAPER_DELAY;

pub const ENV_ADMIN_API_KEY: &str = "ADMIN_API_KEY";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_OPENCAGE_API_KEY: &str = "OPENCAGE_API_KEY";
pub const ENV_SCRAPE_COOLDOWN_SECS: &str = "SCRAPE_COOLDOWN_SECS";
pub const ENV_SCRAPER_DELAY_MS: &str = "SCRAPER_DELAY_MS";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://hackathons.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub admin_api_key: String,
    pub database_url: String,
    pub opencage_api_key: Option<String>,
    pub scrape_cooldown: Duration,
    pub scraper_delay: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let admin_api_key = non_empty_env(ENV_ADMIN_API_KEY)
            .ok_or_else(|| anyhow!("{ENV_ADMIN_API_KEY} must be set"))?;

        Ok(Self {
            admin_api_key,
            database_url: non_empty_env(ENV_DATABASE_URL)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            opencage_api_key: non_empty_env(ENV_OPENCAGE_API_KEY),
            scrape_cooldown: parse_u64_env(ENV_SCRAPE_COOLDOWN_SECS)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_COOLDOWN),
            scraper_delay: parse_u64_env(ENV_SCRAPER_DELAY_MS)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SCRAPER_DELAY),
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// unparsable values fall back to the default
fn parse_u64_env(name: &str) -> Option<u64> {
    non_empty_env(name).and_then(|s| s.parse::<u64>().ok())
}
