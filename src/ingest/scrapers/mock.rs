// src/ingest/scrapers/mock.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::ingest::types::Scraper;
use crate::models::CandidateRecord;

pub const MOCK_SCRAPER_NAME: &str = "mock_scraper_v1";
pub const DUPLICATE_URL: &str = "https://example.com/duplicate-hackathon";
const MOCK_SOURCE: &str = "https://mocksource.com/events";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockScenario {
    /// Two unique events, a pair sharing one url, and a minimal record.
    Default,
    Empty,
    OnlyDuplicates,
    /// Returns an error, to exercise per-scraper isolation.
    Failing,
}

impl MockScenario {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Some(MockScenario::Default),
            "empty" => Some(MockScenario::Empty),
            "only_duplicates" => Some(MockScenario::OnlyDuplicates),
            "failing" => Some(MockScenario::Failing),
            _ => None,
        }
    }
}

/// Fixed, offline scraper used for demos and tests.
pub struct MockScraper {
    scenario: MockScenario,
}

impl MockScraper {
    pub fn new(scenario: MockScenario) -> Self {
        Self { scenario }
    }

    fn default_items(&self) -> Vec<CandidateRecord> {
        let now = Utc::now();
        let start_1 = now + Duration::days(30);
        let end_1 = start_1 + Duration::days(2);
        let start_2 = now + Duration::days(60);
        let end_2 = start_2 + Duration::days(2);

        vec![
            CandidateRecord::new(MOCK_SCRAPER_NAME)
                .with_name("MockHacks Alpha")
                .with_date(start_1, end_1)
                .with_location("Virtual")
                .with_url("https://example.com/mockhacks-alpha")
                .with_notes("First test event from mock.")
                .with_source_url(MOCK_SOURCE),
            CandidateRecord::new(MOCK_SCRAPER_NAME)
                .with_name("FakeConf Beta")
                .with_date(start_2, end_2)
                .with_location("San Francisco, CA")
                .with_url("https://example.com/fakeconf-beta")
                .with_source_url(MOCK_SOURCE),
            CandidateRecord::new(MOCK_SCRAPER_NAME)
                .with_name("Duplicate Event Gamma")
                .with_date(start_1, end_1)
                .with_location("Online")
                .with_url(DUPLICATE_URL)
                .with_notes("This should be caught as a duplicate maybe.")
                .with_source_url(MOCK_SOURCE),
            CandidateRecord::new(MOCK_SCRAPER_NAME)
                .with_name("Duplicate Event Gamma - Updated Name")
                .with_date(start_1 + Duration::days(1), end_1 + Duration::days(1))
                .with_location("Online")
                .with_url(DUPLICATE_URL)
                .with_notes("Variation to test duplicate logic.")
                .with_source_url(MOCK_SOURCE),
            CandidateRecord::new(MOCK_SCRAPER_NAME)
                .with_name("Minimal Event Delta")
                .with_url("https://example.com/minimal-delta")
                .with_source_url(MOCK_SOURCE),
        ]
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn scrape(&self) -> Result<Vec<CandidateRecord>> {
        let items = match self.scenario {
            MockScenario::Default => self.default_items(),
            MockScenario::Empty => Vec::new(),
            MockScenario::OnlyDuplicates => self.default_items().drain(2..4).collect(),
            MockScenario::Failing => return Err(anyhow!("mock scraper configured to fail")),
        };
        tracing::info!(
            target: "ingest",
            scraper = MOCK_SCRAPER_NAME,
            scenario = ?self.scenario,
            found = items.len(),
            "mock scrape finished"
        );
        Ok(items)
    }

    fn name(&self) -> &str {
        MOCK_SCRAPER_NAME
    }
}
