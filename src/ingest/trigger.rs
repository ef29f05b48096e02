// src/ingest/trigger.rs
//! On-demand pipeline runs: at most one in flight, and a cooldown between
//! starts. State lives in memory only and resets with the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::ingest::{IngestPipeline, RunSummary};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed { summary: RunSummary },
    Failed { detail: String },
}

/// Why a trigger was refused. Not an exceptional condition; callers map it
/// to a response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TriggerRejection {
    #[error("a scraping run is already in progress")]
    Conflict,
    #[error("last run started too recently, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerAck {
    pub status: &'static str,
    pub started_at: DateTime<Utc>,
}

/// Read-only snapshot for `/scraping/status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TriggerStatus {
    pub is_running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_status: Option<RunStatus>,
    pub last_scrape_started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct TriggerState {
    last_run_at: Option<DateTime<Utc>>,
    last_status: Option<RunStatus>,
    last_scrape_started_at: Option<DateTime<Utc>>,
}

pub struct ScrapeTrigger {
    running: AtomicBool,
    state: Mutex<TriggerState>,
    cooldown: Duration,
    pipeline: Arc<IngestPipeline>,
}

impl ScrapeTrigger {
    pub fn new(pipeline: Arc<IngestPipeline>, cooldown: Duration) -> Self {
        Self {
            running: AtomicBool::new(false),
            state: Mutex::new(TriggerState::default()),
            cooldown,
            pipeline,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TriggerState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn trigger(self: &Arc<Self>) -> Result<TriggerAck, TriggerRejection> {
        self.trigger_at(Utc::now())
    }

    /// Start a detached pipeline run at `now`, unless one is running or the
    /// previous one started within the cooldown. Must be called from within
    /// a tokio runtime.
    pub fn trigger_at(self: &Arc<Self>, now: DateTime<Utc>) -> Result<TriggerAck, TriggerRejection> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            counter!("scrape_trigger_rejections_total", "reason" => "conflict").increment(1);
            info!(target: "trigger", "rejected: run already in progress");
            return Err(TriggerRejection::Conflict);
        }

        {
            let mut st = self.lock();
            if let Some(last) = st.last_scrape_started_at {
                // clock going backwards counts as "just started"
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                if elapsed < self.cooldown {
                    self.running.store(false, Ordering::Release);
                    let remaining = self.cooldown - elapsed;
                    let retry_after_secs =
                        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                    counter!("scrape_trigger_rejections_total", "reason" => "rate_limited")
                        .increment(1);
                    info!(target: "trigger", retry_after_secs, "rejected: cooldown active");
                    return Err(TriggerRejection::RateLimited { retry_after_secs });
                }
            }
            st.last_scrape_started_at = Some(now);
            st.last_status = Some(RunStatus::Running);
        }
        gauge!("scrape_trigger_running").set(1.0);
        info!(target: "trigger", started_at = %now, "scraping run initiated");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let pipeline = Arc::clone(&this.pipeline);
            // inner task so a panic in the run is caught here, not lost
            let outcome = tokio::spawn(async move { pipeline.run_all_scrapes().await }).await;
            let status = match outcome {
                Ok(Ok(summary)) => RunStatus::Completed { summary },
                Ok(Err(e)) => RunStatus::Failed {
                    detail: e.to_string(),
                },
                Err(join_err) => RunStatus::Failed {
                    detail: format!("pipeline panicked: {join_err}"),
                },
            };
            this.finish(status, Utc::now());
        });

        Ok(TriggerAck {
            status: "Scraping initiated",
            started_at: now,
        })
    }

    fn finish(&self, status: RunStatus, at: DateTime<Utc>) {
        match &status {
            RunStatus::Failed { detail } => {
                error!(target: "trigger", %detail, "scraping run failed")
            }
            RunStatus::Completed { summary } => info!(
                target: "trigger",
                inserted = summary.inserted,
                skipped = summary.skipped(),
                "scraping run completed"
            ),
            RunStatus::Running => {}
        }
        {
            let mut st = self.lock();
            st.last_run_at = Some(at);
            st.last_status = Some(status);
        }
        self.running.store(false, Ordering::Release);
        gauge!("scrape_trigger_running").set(0.0);
    }

    pub fn status(&self) -> TriggerStatus {
        let st = self.lock();
        TriggerStatus {
            is_running: self.running.load(Ordering::Acquire),
            last_run_at: st.last_run_at,
            last_status: st.last_status.clone(),
            last_scrape_started_at: st.last_scrape_started_at,
        }
    }
}
