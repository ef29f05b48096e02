// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod api;
pub mod config;
pub mod geocode;
pub mod inbox;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod store;
pub mod submission;

pub use crate::api::{router, AppState};

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::geocode::{Geocoder, OpenCageGeocoder};
use crate::ingest::config::{build_scrapers, load_scrapers_default};
use crate::ingest::trigger::ScrapeTrigger;
use crate::ingest::IngestPipeline;
use crate::store::{HackathonStore, SqliteStore};

/// Wire store, scrapers, trigger and geocoder from `config`.
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let store: Arc<dyn HackathonStore> = Arc::new(
        SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("opening database {}", config.database_url))?,
    );
    build_state_with_store(config, store)
}

/// Same as [`build_state`] over an already-open store.
pub fn build_state_with_store(
    config: &AppConfig,
    store: Arc<dyn HackathonStore>,
) -> Result<AppState> {
    let specs = load_scrapers_default()?;
    let scrapers = build_scrapers(&specs);

    let pipeline = IngestPipeline::new(store.clone(), scrapers).with_delay(config.scraper_delay);
    info!(scrapers = ?pipeline.scraper_names(), "ingest pipeline ready");
    let trigger = Arc::new(ScrapeTrigger::new(
        Arc::new(pipeline),
        config.scrape_cooldown,
    ));

    let geocoder = config
        .opencage_api_key
        .clone()
        .map(|key| Arc::new(OpenCageGeocoder::new(key)) as Arc<dyn Geocoder>);
    if geocoder.is_none() {
        info!("OPENCAGE_API_KEY not set, city lookup disabled");
    }

    Ok(AppState::new(store, trigger, geocoder, &config.admin_api_key))
}
