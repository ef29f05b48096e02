// tests/inbox_review.rs
//
// Review state machine against both store backends:
// - approve creates exactly one canonical record and flips the item
// - concurrent approvals of one item: one wins, the other conflicts
// - rejected items cannot be approved afterwards

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use hackathon_inbox::inbox::{InboxReview, ReviewError};
use hackathon_inbox::models::{
    CandidateRecord, Coordinates, DateRange, HackathonStatus, Location, NewHackathon,
    ReviewStatus,
};
use hackathon_inbox::store::{HackathonStore, MemoryStore, SqliteStore};
use uuid::Uuid;

const EVENT_URL: &str = "https://hackthenorth.com";

fn canonical(url: &str) -> NewHackathon {
    NewHackathon {
        name: "Hack the North".into(),
        date: DateRange {
            start_date: Utc.with_ymd_and_hms(2026, 9, 18, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 9, 20, 0, 0, 0).unwrap(),
        },
        location: Location {
            city: "Waterloo".into(),
            state: Some("Ontario".into()),
            country: "Canada".into(),
            coordinates: Coordinates {
                lat: 43.46,
                long: -80.52,
            },
        },
        url: url.into(),
        notes: Some("Canada's biggest hackathon".into()),
        status: HackathonStatus::ApplicationsOpen,
        source: Some("mlh".into()),
        application_form: None,
        application_deadline: None,
    }
}

async fn seeded(store: Arc<dyn HackathonStore>) -> (InboxReview, Uuid) {
    let item = store
        .insert_inbox(
            &CandidateRecord::new("mlh_events_2026_inperson")
                .with_name("Hack the North")
                .with_url(EVENT_URL),
        )
        .await
        .unwrap();
    (InboxReview::new(store), item.id)
}

/// Both backends, plus a way to count canonical rows each one holds.
enum Backend {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
}

impl Backend {
    async fn all() -> Vec<Backend> {
        vec![
            Backend::Memory(Arc::new(MemoryStore::new())),
            Backend::Sqlite(Arc::new(SqliteStore::in_memory().await.unwrap())),
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            Backend::Sqlite(_) => "sqlite",
        }
    }

    fn store(&self) -> Arc<dyn HackathonStore> {
        match self {
            Backend::Memory(s) => s.clone(),
            Backend::Sqlite(s) => s.clone(),
        }
    }

    async fn canonical_count(&self) -> usize {
        match self {
            Backend::Memory(s) => s.hackathons().iter().filter(|h| h.url == EVENT_URL).count(),
            Backend::Sqlite(s) => {
                let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hackathons WHERE url = ?")
                    .bind(EVENT_URL)
                    .fetch_one(s.pool())
                    .await
                    .unwrap();
                n as usize
            }
        }
    }
}

#[tokio::test]
async fn approve_creates_record_and_marks_item() {
    for b in Backend::all().await {
        let (backend, store) = (b.name(), b.store());
        let (review, id) = seeded(store.clone()).await;

        let record = review.approve(id, canonical(EVENT_URL)).await.unwrap();
        assert_eq!(record.url, EVENT_URL, "{backend}");
        assert_eq!(record.location.city, "Waterloo", "{backend}");

        let item = review.get(id).await.unwrap();
        assert_eq!(item.review_status, ReviewStatus::Approved, "{backend}");
        // traceable through url equality
        let found = store.find_hackathon_by_url(EVENT_URL).await.unwrap().unwrap();
        assert_eq!(found.id, record.id, "{backend}");
        assert_eq!(item.url(), Some(found.url.as_str()), "{backend}");

        assert!(review.pending().await.unwrap().is_empty(), "{backend}");
    }
}

#[tokio::test]
async fn concurrent_approvals_yield_one_record() {
    for b in Backend::all().await {
        let (backend, store) = (b.name(), b.store());
        let (review, id) = seeded(store.clone()).await;

        let (first, second) = tokio::join!(
            review.approve(id, canonical(EVENT_URL)),
            review.approve(id, canonical(EVENT_URL)),
        );

        let (ok, err) = match (first, second) {
            (Ok(r), Err(e)) | (Err(e), Ok(r)) => (r, e),
            (x, y) => panic!("{backend}: expected one winner, got {x:?} / {y:?}"),
        };
        assert!(
            matches!(err, ReviewError::NotPending { status: ReviewStatus::Approved, .. }),
            "{backend}: {err:?}"
        );
        assert_eq!(ok.url, EVENT_URL);
        assert_eq!(b.canonical_count().await, 1, "{backend}");
        assert_eq!(
            review.list(Some(ReviewStatus::Approved)).await.unwrap().len(),
            1,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn rejected_item_cannot_be_approved() {
    for b in Backend::all().await {
        let (backend, store) = (b.name(), b.store());
        let (review, id) = seeded(store.clone()).await;

        let rejected = review.reject(id).await.unwrap();
        assert_eq!(rejected.review_status, ReviewStatus::Rejected, "{backend}");

        let err = review.approve(id, canonical(EVENT_URL)).await.unwrap_err();
        assert!(
            matches!(err, ReviewError::NotPending { status: ReviewStatus::Rejected, .. }),
            "{backend}: {err:?}"
        );
        assert_eq!(
            b.canonical_count().await,
            0,
            "{backend}: rollback must leave no canonical record"
        );

        // a second reject is also a conflict
        assert!(matches!(
            review.reject(id).await.unwrap_err(),
            ReviewError::NotPending { .. }
        ));
    }
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    for b in Backend::all().await {
        let (backend, store) = (b.name(), b.store());
        let review = InboxReview::new(store.clone());
        let ghost = Uuid::new_v4();

        assert!(matches!(review.get(ghost).await, Err(ReviewError::NotFound(_))), "{backend}");
        assert!(matches!(review.reject(ghost).await, Err(ReviewError::NotFound(_))), "{backend}");
        assert!(matches!(
            review.approve(ghost, canonical(EVENT_URL)).await,
            Err(ReviewError::NotFound(_))
        ));
        assert_eq!(b.canonical_count().await, 0, "{backend}");
    }
}

#[tokio::test]
async fn rejected_url_can_be_queued_again() {
    for b in Backend::all().await {
        let (backend, store) = (b.name(), b.store());
        let (review, id) = seeded(store.clone()).await;
        review.reject(id).await.unwrap();

        // the unique index only covers live items
        let again = store
            .insert_inbox(&CandidateRecord::new("manual").with_url(EVENT_URL))
            .await;
        assert!(again.is_ok(), "{backend}: {again:?}");
        assert_eq!(review.list(None).await.unwrap().len(), 2, "{backend}");
    }
}
