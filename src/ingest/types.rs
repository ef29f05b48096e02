// src/ingest/types.rs
use anyhow::Result;

use crate::models::CandidateRecord;

/// A source of candidate hackathon records.
///
/// Implementations are expected to absorb their own fetch and parse errors
/// (log them, return what they have). The pipeline still isolates an `Err`
/// or a panic per scraper, so one broken source never blocks the others.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self) -> Result<Vec<CandidateRecord>>;

    /// Provenance tag stamped on every record this scraper emits.
    fn name(&self) -> &str;
}
