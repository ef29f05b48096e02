// src/ingest/mod.rs
pub mod config;
pub mod dedupe;
pub mod scrapers;
pub mod trigger;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::ingest::dedupe::DuplicateChecker;
use crate::ingest::types::Scraper;
use crate::models::CandidateRecord;
use crate::store::{HackathonStore, StoreError};

/// Pause between scrapers so sources are not hit back to back.
pub const DEFAULT_SCRAPER_DELAY: Duration = Duration::from_secs(1);

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Pipeline runs started.");
        describe_counter!(
            "ingest_candidates_total",
            "Candidate records returned by scrapers."
        );
        describe_counter!("ingest_inserted_total", "Candidates queued in the inbox.");
        describe_counter!(
            "ingest_skipped_total",
            "Candidates skipped, labelled by reason (duplicate/invalid/error)."
        );
        describe_counter!(
            "ingest_scraper_errors_total",
            "Scrapers that returned an error or panicked."
        );
        describe_histogram!("ingest_run_ms", "Pipeline run time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
        describe_counter!(
            "inbox_transitions_total",
            "Inbox review transitions, labelled by target status."
        );
        describe_counter!(
            "scrape_trigger_rejections_total",
            "Refused scrape triggers, labelled by reason (conflict/rate_limited)."
        );
        describe_gauge!("scrape_trigger_running", "1 while a scrape run is in flight.");
        describe_gauge!(
            "scrape_trigger_cooldown_secs",
            "Configured minimum spacing between scrape runs."
        );
    });
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("store unavailable, run aborted: {0}")]
    StoreUnavailable(StoreError),
}

/// Tally of one pipeline run.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub scrapers_run: usize,
    pub scrapers_failed: usize,
    pub collected: usize,
    pub inserted: usize,
    pub skipped_duplicate: usize,
    pub skipped_invalid: usize,
    pub skipped_error: usize,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_duplicate + self.skipped_invalid + self.skipped_error
    }
}

/// Runs every configured scraper and queues the new candidates for review.
pub struct IngestPipeline {
    scrapers: Vec<Arc<dyn Scraper>>,
    store: Arc<dyn HackathonStore>,
    checker: DuplicateChecker,
    delay: Duration,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn HackathonStore>, scrapers: Vec<Arc<dyn Scraper>>) -> Self {
        Self {
            checker: DuplicateChecker::new(store.clone()),
            scrapers,
            store,
            delay: DEFAULT_SCRAPER_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn scraper_names(&self) -> Vec<String> {
        self.scrapers.iter().map(|s| s.name().to_string()).collect()
    }

    /// Run all scrapers sequentially and concatenate their output.
    /// Returns the candidates and the number of scrapers that failed.
    pub async fn collect(&self) -> (Vec<CandidateRecord>, usize) {
        let mut all = Vec::new();
        let mut failed = 0usize;

        for (i, scraper) in self.scrapers.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let name = scraper.name().to_string();
            info!(target: "ingest", scraper = %name, "running scraper");

            // own task per scraper: a panic stays inside its JoinHandle
            let task = {
                let scraper = Arc::clone(scraper);
                tokio::spawn(async move { scraper.scrape().await })
            };

            match task.await {
                Ok(Ok(mut items)) => {
                    info!(target: "ingest", scraper = %name, found = items.len(), "scraper finished");
                    all.append(&mut items);
                }
                Ok(Err(e)) => {
                    failed += 1;
                    counter!("ingest_scraper_errors_total").increment(1);
                    error!(target: "ingest", scraper = %name, error = ?e, "scraper failed");
                }
                Err(join_err) => {
                    failed += 1;
                    counter!("ingest_scraper_errors_total").increment(1);
                    error!(target: "ingest", scraper = %name, error = %join_err, "scraper panicked");
                }
            }
        }

        (all, failed)
    }

    /// Validate, dedupe and insert candidates in order. First write wins
    /// among duplicates of the same run.
    ///
    /// Only an unreachable store aborts; every other failure is counted as a
    /// skip.
    pub async fn process_candidates(
        &self,
        candidates: Vec<CandidateRecord>,
    ) -> Result<RunSummary, PipelineError> {
        ensure_metrics_described();

        let mut summary = RunSummary {
            collected: candidates.len(),
            ..RunSummary::default()
        };
        if candidates.is_empty() {
            info!(target: "ingest", "no items to process");
            return Ok(summary);
        }

        for candidate in candidates {
            let url = candidate.url.clone();
            let name = candidate.name.clone();

            if let Err(e) = candidate.validate() {
                summary.skipped_invalid += 1;
                counter!("ingest_skipped_total", "reason" => "invalid").increment(1);
                warn!(target: "ingest", ?url, ?name, error = %e, "skipping invalid candidate");
                continue;
            }

            match self.checker.is_duplicate(&candidate).await {
                Ok(false) => {}
                Ok(true) => {
                    summary.skipped_duplicate += 1;
                    counter!("ingest_skipped_total", "reason" => "duplicate").increment(1);
                    info!(target: "ingest", ?url, ?name, "skipping duplicate item");
                    continue;
                }
                Err(e) if e.is_unavailable() => return Err(abort(summary, e)),
                Err(e) => {
                    summary.skipped_error += 1;
                    counter!("ingest_skipped_total", "reason" => "error").increment(1);
                    error!(target: "ingest", ?url, ?name, error = %e, "duplicate check failed");
                    continue;
                }
            }

            match self.store.insert_inbox(&candidate).await {
                Ok(item) => {
                    summary.inserted += 1;
                    counter!("ingest_inserted_total").increment(1);
                    info!(target: "ingest", ?url, ?name, id = %item.id, "inserted new item");
                }
                Err(e) if e.is_duplicate_key() => {
                    // another writer committed the same url after our check
                    summary.skipped_duplicate += 1;
                    counter!("ingest_skipped_total", "reason" => "duplicate").increment(1);
                    warn!(target: "ingest", ?url, ?name, "duplicate key on insert");
                }
                Err(e) if e.is_unavailable() => return Err(abort(summary, e)),
                Err(e) => {
                    summary.skipped_error += 1;
                    counter!("ingest_skipped_total", "reason" => "error").increment(1);
                    error!(target: "ingest", ?url, ?name, error = %e, "failed to insert item");
                }
            }
        }

        Ok(summary)
    }

    /// Full run: scrape everything, then process. Partial failures are
    /// absorbed and reported in the summary.
    pub async fn run_all_scrapes(&self) -> Result<RunSummary, PipelineError> {
        ensure_metrics_described();
        let t0 = Instant::now();
        counter!("ingest_runs_total").increment(1);

        if self.scrapers.is_empty() {
            warn!(target: "ingest", "no active scrapers configured");
            return Ok(RunSummary::default());
        }

        info!(target: "ingest", scrapers = ?self.scraper_names(), "starting scraping cycle");

        let (candidates, failed) = self.collect().await;
        counter!("ingest_candidates_total").increment(candidates.len() as u64);
        info!(
            target: "ingest",
            collected = candidates.len(),
            scrapers_failed = failed,
            "scraping finished, processing items"
        );

        let mut summary = self.process_candidates(candidates).await?;
        summary.scrapers_run = self.scrapers.len();
        summary.scrapers_failed = failed;

        histogram!("ingest_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("ingest_pipeline_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        info!(
            target: "ingest",
            inserted = summary.inserted,
            skipped = summary.skipped(),
            skipped_duplicate = summary.skipped_duplicate,
            skipped_invalid = summary.skipped_invalid,
            skipped_error = summary.skipped_error,
            "finished processing items"
        );
        Ok(summary)
    }
}

fn abort(summary: RunSummary, e: StoreError) -> PipelineError {
    error!(
        target: "ingest",
        inserted = summary.inserted,
        skipped = summary.skipped(),
        error = %e,
        "store unavailable, aborting run"
    );
    PipelineError::StoreUnavailable(e)
}
