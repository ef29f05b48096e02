//! Hackathon inbox service: binary entrypoint.
//! Boots the Axum HTTP server with the admin API and `/metrics`.

use hackathon_inbox::{build_state, config::AppConfig, metrics::Metrics, router};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - INBOX_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("INBOX_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ingest=info,inbox=info,trigger=info,warn"));

    // the platform may already have installed a subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let config = AppConfig::from_env()?;
    let state = build_state(&config).await?;
    let metrics = Metrics::init(state.trigger.cooldown())?;

    let app = router(state).merge(metrics.router());
    tracing::info!(db = %config.database_url, "hackathon inbox ready");

    Ok(app.into())
}
