// tests/ingest_race.rs
//
// Two runs that both pass the duplicate check and then race on insert.
// Lookups are hidden so the check always says "new"; the store's unique
// index is the only thing standing between them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hackathon_inbox::inbox::ReviewError;
use hackathon_inbox::ingest::IngestPipeline;
use hackathon_inbox::models::{
    CandidateRecord, Hackathon, InboxItem, NewHackathon, ReviewStatus,
};
use hackathon_inbox::store::{HackathonStore, MemoryStore, SqliteStore, StoreError};
use uuid::Uuid;

const RACED_URL: &str = "https://example.com/raced";

struct BlindLookups<S> {
    inner: S,
}

#[async_trait]
impl<S: HackathonStore> HackathonStore for BlindLookups<S> {
    async fn find_inbox_by_url(&self, _url: &str) -> Result<Option<InboxItem>, StoreError> {
        Ok(None)
    }
    async fn find_hackathon_by_url(&self, _url: &str) -> Result<Option<Hackathon>, StoreError> {
        Ok(None)
    }
    async fn insert_inbox(&self, candidate: &CandidateRecord) -> Result<InboxItem, StoreError> {
        self.inner.insert_inbox(candidate).await
    }
    async fn get_inbox(&self, id: Uuid) -> Result<Option<InboxItem>, StoreError> {
        self.inner.get_inbox(id).await
    }
    async fn list_inbox(&self, status: Option<ReviewStatus>) -> Result<Vec<InboxItem>, StoreError> {
        self.inner.list_inbox(status).await
    }
    async fn reject_inbox(&self, id: Uuid) -> Result<InboxItem, ReviewError> {
        self.inner.reject_inbox(id).await
    }
    async fn approve_inbox(
        &self,
        id: Uuid,
        hackathon: NewHackathon,
    ) -> Result<Hackathon, ReviewError> {
        self.inner.approve_inbox(id, hackathon).await
    }
    async fn insert_hackathon(&self, hackathon: NewHackathon) -> Result<Hackathon, StoreError> {
        self.inner.insert_hackathon(hackathon).await
    }
}

async fn race(store: Arc<dyn HackathonStore>) {
    let a = IngestPipeline::new(store.clone(), vec![]).with_delay(Duration::ZERO);
    let b = IngestPipeline::new(store.clone(), vec![]).with_delay(Duration::ZERO);
    let item = || vec![CandidateRecord::new("racer").with_name("Raced").with_url(RACED_URL)];

    let (ra, rb) = tokio::join!(a.process_candidates(item()), b.process_candidates(item()));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.inserted + rb.inserted, 1, "exactly one insert wins");
    assert_eq!(ra.skipped_duplicate + rb.skipped_duplicate, 1);
    assert_eq!(ra.skipped_error + rb.skipped_error, 0);

    let live = store.list_inbox(None).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].url(), Some(RACED_URL));
}

#[tokio::test]
async fn racing_inserts_memory_store() {
    let store = BlindLookups {
        inner: MemoryStore::new(),
    };
    race(Arc::new(store)).await;
}

#[tokio::test]
async fn racing_inserts_sqlite_store() {
    let store = BlindLookups {
        inner: SqliteStore::in_memory().await.unwrap(),
    };
    race(Arc::new(store)).await;
}
