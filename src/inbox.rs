// src/inbox.rs
//! Moderation inbox: pending → approved | rejected.
//!
//! Approval promotes an item into the canonical dataset. The store runs it
//! as a single transaction (insert canonical record, then conditionally flip
//! the item to approved), so an item is promoted at most once and a
//! canonical record never comes from an already-resolved item.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Hackathon, InboxItem, NewHackathon, ReviewStatus};
use crate::store::{HackathonStore, StoreError};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("inbox item {0} not found")]
    NotFound(Uuid),
    #[error("inbox item {id} is {} and can no longer be reviewed", .status.as_str())]
    NotPending { id: Uuid, status: ReviewStatus },
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReviewError {
    /// Caller mistakes (4xx) as opposed to store failures (5xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ReviewError::Store(_))
    }
}

#[derive(Clone)]
pub struct InboxReview {
    store: Arc<dyn HackathonStore>,
}

impl InboxReview {
    pub fn new(store: Arc<dyn HackathonStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: Uuid) -> Result<InboxItem, ReviewError> {
        self.store
            .get_inbox(id)
            .await?
            .ok_or(ReviewError::NotFound(id))
    }

    pub async fn list(&self, status: Option<ReviewStatus>) -> Result<Vec<InboxItem>, ReviewError> {
        Ok(self.store.list_inbox(status).await?)
    }

    pub async fn pending(&self) -> Result<Vec<InboxItem>, ReviewError> {
        self.list(Some(ReviewStatus::Pending)).await
    }

    pub async fn reject(&self, id: Uuid) -> Result<InboxItem, ReviewError> {
        match self.store.reject_inbox(id).await {
            Ok(item) => {
                counter!("inbox_transitions_total", "to" => "rejected").increment(1);
                info!(target: "inbox", %id, url = ?item.url(), "inbox item rejected");
                Ok(item)
            }
            Err(e) => {
                warn!(target: "inbox", %id, error = %e, "reject failed");
                Err(e)
            }
        }
    }

    /// Promote a pending item, creating the canonical record from the
    /// operator's (possibly edited) data.
    pub async fn approve(&self, id: Uuid, hackathon: NewHackathon) -> Result<Hackathon, ReviewError> {
        let hackathon = hackathon.normalized();
        if !hackathon.date.is_ordered() {
            return Err(ReviewError::InvalidSubmission(
                "start date is after end date".into(),
            ));
        }
        if hackathon.name.trim().is_empty() {
            return Err(ReviewError::InvalidSubmission("name is empty".into()));
        }

        match self.store.approve_inbox(id, hackathon).await {
            Ok(record) => {
                counter!("inbox_transitions_total", "to" => "approved").increment(1);
                info!(
                    target: "inbox",
                    %id,
                    hackathon_id = %record.id,
                    url = %record.url,
                    "inbox item approved and promoted"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(target: "inbox", %id, error = %e, "approve rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateRecord, Coordinates, DateRange, HackathonStatus, Location};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn new_hackathon(url: &str) -> NewHackathon {
        NewHackathon {
            name: "HackMIT".into(),
            date: DateRange {
                start_date: Utc.with_ymd_and_hms(2026, 9, 12, 0, 0, 0).unwrap(),
                end_date: Utc.with_ymd_and_hms(2026, 9, 14, 0, 0, 0).unwrap(),
            },
            location: Location {
                city: "Cambridge".into(),
                state: Some("Massachusetts".into()),
                country: "United States".into(),
                coordinates: Coordinates {
                    lat: 42.37,
                    long: -71.11,
                },
            },
            url: url.into(),
            notes: None,
            status: HackathonStatus::Announced,
            source: None,
            application_form: None,
            application_deadline: None,
        }
    }

    #[tokio::test]
    async fn inverted_dates_are_refused_before_touching_the_store() {
        let store = Arc::new(MemoryStore::new());
        let item = store
            .insert_inbox(&CandidateRecord::new("mock").with_url("https://hackmit.org"))
            .await
            .unwrap();
        let review = InboxReview::new(store.clone());

        let mut bad = new_hackathon("https://hackmit.org");
        std::mem::swap(&mut bad.date.start_date, &mut bad.date.end_date);

        let err = review.approve(item.id, bad).await.unwrap_err();
        assert!(matches!(err, ReviewError::InvalidSubmission(_)));
        assert!(store.hackathons().is_empty());
        assert_eq!(review.get(item.id).await.unwrap().review_status, ReviewStatus::Pending);
    }

    #[tokio::test]
    async fn approve_normalizes_url_scheme() {
        let store = Arc::new(MemoryStore::new());
        let item = store
            .insert_inbox(&CandidateRecord::new("mock").with_url("https://hackmit.org"))
            .await
            .unwrap();
        let review = InboxReview::new(store.clone());

        let record = review.approve(item.id, new_hackathon("hackmit.org")).await.unwrap();
        assert_eq!(record.url, "https://hackmit.org");
    }

    #[test]
    fn client_errors_are_distinguished_from_store_errors() {
        let id = Uuid::new_v4();
        assert!(ReviewError::NotFound(id).is_client_error());
        assert!(ReviewError::NotPending {
            id,
            status: ReviewStatus::Rejected
        }
        .is_client_error());
        assert!(!ReviewError::Store(StoreError::Unavailable("down".into())).is_client_error());
    }
}
