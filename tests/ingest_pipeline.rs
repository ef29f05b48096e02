// tests/ingest_pipeline.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hackathon_inbox::ingest::scrapers::mock::DUPLICATE_URL;
use hackathon_inbox::ingest::scrapers::{MockScenario, MockScraper};
use hackathon_inbox::ingest::types::Scraper;
use hackathon_inbox::ingest::IngestPipeline;
use hackathon_inbox::models::{CandidateRecord, ReviewStatus};
use hackathon_inbox::store::{HackathonStore, MemoryStore};

struct FixedScraper {
    name: &'static str,
    items: Vec<CandidateRecord>,
}

#[async_trait]
impl Scraper for FixedScraper {
    async fn scrape(&self) -> Result<Vec<CandidateRecord>> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        self.name
    }
}

struct BrokenScraper;

#[async_trait]
impl Scraper for BrokenScraper {
    async fn scrape(&self) -> Result<Vec<CandidateRecord>> {
        Err(anyhow!("source is down"))
    }
    fn name(&self) -> &str {
        "broken"
    }
}

struct PanickingScraper;

#[async_trait]
impl Scraper for PanickingScraper {
    async fn scrape(&self) -> Result<Vec<CandidateRecord>> {
        panic!("selector blew up")
    }
    fn name(&self) -> &str {
        "panicking"
    }
}

fn candidate(name: &str, url: &str) -> CandidateRecord {
    CandidateRecord::new("fixed").with_name(name).with_url(url)
}

fn pipeline(store: Arc<MemoryStore>, scrapers: Vec<Arc<dyn Scraper>>) -> IngestPipeline {
    IngestPipeline::new(store, scrapers).with_delay(Duration::ZERO)
}

#[tokio::test]
async fn shared_url_pair_inserts_first_only() {
    let store = Arc::new(MemoryStore::new());
    let scraper = FixedScraper {
        name: "four_items",
        items: vec![
            candidate("Alpha", "https://example.com/alpha"),
            candidate("Gamma", DUPLICATE_URL),
            candidate("Gamma - Updated", DUPLICATE_URL),
            candidate("Beta", "https://example.com/beta"),
        ],
    };
    let p = pipeline(store.clone(), vec![Arc::new(scraper)]);

    let summary = p.run_all_scrapes().await.unwrap();
    assert_eq!(summary.collected, 4);
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.skipped_duplicate, 1);

    let inbox = store.inbox();
    assert_eq!(inbox.len(), 3);
    let gamma: Vec<_> = inbox
        .iter()
        .filter(|i| i.url() == Some(DUPLICATE_URL))
        .collect();
    assert_eq!(gamma.len(), 1);
    assert_eq!(gamma[0].candidate.name.as_deref(), Some("Gamma"));
    assert!(inbox.iter().all(|i| i.review_status == ReviewStatus::Pending));
}

#[tokio::test]
async fn second_run_inserts_nothing_new() {
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(
        store.clone(),
        vec![Arc::new(MockScraper::new(MockScenario::Default))],
    );

    let first = p.run_all_scrapes().await.unwrap();
    assert_eq!(first.inserted, 4);
    assert_eq!(first.skipped_duplicate, 1);

    let second = p.run_all_scrapes().await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped_duplicate, 5);
    assert_eq!(store.inbox().len(), 4);
}

#[tokio::test]
async fn candidates_without_url_are_never_duplicates() {
    let store = Arc::new(MemoryStore::new());
    let no_url = CandidateRecord::new("fixed").with_name("Mystery Hack");
    let scraper = FixedScraper {
        name: "no_url",
        items: vec![no_url.clone(), no_url],
    };
    let p = pipeline(store.clone(), vec![Arc::new(scraper)]);

    assert_eq!(p.run_all_scrapes().await.unwrap().inserted, 2);
    assert_eq!(p.run_all_scrapes().await.unwrap().inserted, 2);
    assert_eq!(store.inbox().len(), 4);
}

#[tokio::test]
async fn failing_scrapers_do_not_block_the_others() {
    let store = Arc::new(MemoryStore::new());
    let good = FixedScraper {
        name: "good",
        items: vec![candidate("Survivor", "https://example.com/survivor")],
    };
    let p = pipeline(
        store.clone(),
        vec![
            Arc::new(BrokenScraper),
            Arc::new(PanickingScraper),
            Arc::new(good),
        ],
    );

    let summary = p.run_all_scrapes().await.unwrap();
    assert_eq!(summary.scrapers_run, 3);
    assert_eq!(summary.scrapers_failed, 2);
    assert_eq!(summary.inserted, 1);
    assert!(store
        .find_inbox_by_url("https://example.com/survivor")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn rejected_url_is_still_a_duplicate() {
    let store = Arc::new(MemoryStore::new());
    let scraper = FixedScraper {
        name: "one",
        items: vec![candidate("Once", "https://example.com/once")],
    };
    let p = pipeline(store.clone(), vec![Arc::new(scraper)]);
    p.run_all_scrapes().await.unwrap();

    let id = store.inbox()[0].id;
    store.reject_inbox(id).await.unwrap();

    let again = p.run_all_scrapes().await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.skipped_duplicate, 1);
}
