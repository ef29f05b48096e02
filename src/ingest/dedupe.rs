// src/ingest/dedupe.rs
use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::CandidateRecord;
use crate::store::{HackathonStore, StoreError};

/// Decides whether a candidate is already known, by exact url match against
/// the inbox (any status) and the canonical records.
///
/// No normalization happens here: `http://x` and `https://x/` are different
/// keys. Candidates without a url cannot be checked and always pass.
#[derive(Clone)]
pub struct DuplicateChecker {
    store: Arc<dyn HackathonStore>,
}

impl DuplicateChecker {
    pub fn new(store: Arc<dyn HackathonStore>) -> Self {
        Self { store }
    }

    pub async fn is_duplicate(&self, candidate: &CandidateRecord) -> Result<bool, StoreError> {
        let Some(url) = candidate.url.as_deref() else {
            warn!(
                target: "ingest",
                name = ?candidate.name,
                scraper = %candidate.scraper_name,
                "candidate has no url, cannot check for duplicates"
            );
            return Ok(false);
        };

        if let Some(existing) = self.store.find_inbox_by_url(url).await? {
            debug!(
                target: "ingest",
                %url,
                existing_id = %existing.id,
                status = existing.review_status.as_str(),
                "duplicate found in inbox"
            );
            return Ok(true);
        }

        if let Some(existing) = self.store.find_hackathon_by_url(url).await? {
            debug!(
                target: "ingest",
                %url,
                existing_id = %existing.id,
                "duplicate found in canonical records"
            );
            return Ok(true);
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewStatus;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn rejected_inbox_items_still_count_as_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let c = CandidateRecord::new("mock").with_url("https://example.com/a");
        let item = store.insert_inbox(&c).await.unwrap();
        store.reject_inbox(item.id).await.unwrap();
        assert_eq!(
            store.get_inbox(item.id).await.unwrap().unwrap().review_status,
            ReviewStatus::Rejected
        );

        let checker = DuplicateChecker::new(store);
        assert!(checker.is_duplicate(&c).await.unwrap());
    }

    #[tokio::test]
    async fn url_match_is_exact_and_case_sensitive() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_inbox(&CandidateRecord::new("mock").with_url("https://example.com/a"))
            .await
            .unwrap();
        let checker = DuplicateChecker::new(store);

        for other in [
            "https://example.com/A",
            "https://example.com/a/",
            "http://example.com/a",
            "https://example.com/a?ref=mlh",
        ] {
            let c = CandidateRecord::new("mock").with_url(other);
            assert!(!checker.is_duplicate(&c).await.unwrap(), "{other}");
        }
    }
}
