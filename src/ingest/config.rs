// src/ingest/config.rs
//! Which scrapers are active. Built once at startup into an explicit list.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ingest::scrapers::{MlhScraper, MockScenario, MockScraper};
use crate::ingest::types::Scraper;

const ENV_PATH: &str = "SCRAPERS_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScraperSpec {
    Mock {
        #[serde(default)]
        scenario: Option<String>,
    },
    Mlh {
        year: i32,
    },
}

#[derive(Deserialize)]
struct ScrapersFile {
    #[serde(default)]
    scrapers: Vec<ScraperSpec>,
}

/// With no configuration at all only the mock scraper runs.
pub fn default_specs() -> Vec<ScraperSpec> {
    vec![ScraperSpec::Mock { scenario: None }]
}

/// Load scraper specs from an explicit path. Supports TOML or JSON formats.
pub fn load_scrapers_from(path: &Path) -> Result<Vec<ScraperSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading scraper config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_scrapers(&content, ext.as_str())
}

/// Load scraper specs using env var + fallbacks:
/// 1) $SCRAPERS_CONFIG_PATH
/// 2) config/scrapers.toml
/// 3) config/scrapers.json
/// 4) [`default_specs`]
pub fn load_scrapers_default() -> Result<Vec<ScraperSpec>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_scrapers_from(&pb);
        } else {
            return Err(anyhow!("SCRAPERS_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/scrapers.toml");
    if toml_p.exists() {
        return load_scrapers_from(&toml_p);
    }
    let json_p = PathBuf::from("config/scrapers.json");
    if json_p.exists() {
        return load_scrapers_from(&json_p);
    }
    Ok(default_specs())
}

fn parse_scrapers(s: &str, hint_ext: &str) -> Result<Vec<ScraperSpec>> {
    match hint_ext {
        "toml" => parse_toml(s),
        "json" => parse_json(s),
        _ => parse_toml(s)
            .or_else(|_| parse_json(s))
            .map_err(|_| anyhow!("unsupported scraper config format")),
    }
}

fn parse_toml(s: &str) -> Result<Vec<ScraperSpec>> {
    let v: ScrapersFile = toml::from_str(s)?;
    Ok(v.scrapers)
}

/// JSON accepts either `{"scrapers": [...]}` or a bare array.
fn parse_json(s: &str) -> Result<Vec<ScraperSpec>> {
    if let Ok(v) = serde_json::from_str::<Vec<ScraperSpec>>(s) {
        return Ok(v);
    }
    let v: ScrapersFile = serde_json::from_str(s)?;
    Ok(v.scrapers)
}

/// Instantiate the configured scrapers. A spec that cannot be built is
/// logged and left out; the others still run.
pub fn build_scrapers(specs: &[ScraperSpec]) -> Vec<Arc<dyn Scraper>> {
    let mut out: Vec<Arc<dyn Scraper>> = Vec::with_capacity(specs.len());
    for spec in specs {
        match build_one(spec) {
            Ok(s) => out.push(s),
            Err(e) => tracing::error!(target: "ingest", ?spec, error = ?e, "failed to initialize scraper"),
        }
    }
    let names: Vec<&str> = out.iter().map(|s| s.name()).collect();
    tracing::info!(target: "ingest", count = out.len(), scrapers = ?names, "initialized active scrapers");
    out
}

fn build_one(spec: &ScraperSpec) -> Result<Arc<dyn Scraper>> {
    match spec {
        ScraperSpec::Mock { scenario } => {
            let raw = scenario.as_deref().unwrap_or("default");
            let scenario =
                MockScenario::parse(raw).ok_or_else(|| anyhow!("unknown mock scenario '{raw}'"))?;
            Ok(Arc::new(MockScraper::new(scenario)))
        }
        ScraperSpec::Mlh { year } => Ok(Arc::new(MlhScraper::new(*year)?)),
    }
}
