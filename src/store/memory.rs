// src/store/memory.rs
//! In-process store with the same semantics as the SQLite backend.
//! One mutex guards both collections, so every operation (including the
//! approval transaction) is atomic with respect to the others.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::{HackathonStore, StoreError};
use crate::inbox::ReviewError;
use crate::models::{CandidateRecord, Hackathon, InboxItem, NewHackathon, ReviewStatus};

#[derive(Debug, Default)]
struct Collections {
    inbox: Vec<InboxItem>,
    hackathons: Vec<Hackathon>,
    // url -> position in `inbox` for pending/approved items (the unique index)
    inbox_url_index: HashMap<String, usize>,
    // url -> positions in `inbox`, every status, insertion order
    inbox_by_url: HashMap<String, Vec<usize>>,
    // url -> positions in `hackathons`
    hackathons_by_url: HashMap<String, Vec<usize>>,
}

impl Collections {
    fn push_hackathon(&mut self, record: Hackathon) {
        let pos = self.hackathons.len();
        self.hackathons_by_url
            .entry(record.url.clone())
            .or_default()
            .push(pos);
        self.hackathons.push(record);
    }

    fn pop_hackathon(&mut self) {
        let Some(record) = self.hackathons.pop() else {
            return;
        };
        if let Some(positions) = self.hackathons_by_url.get_mut(&record.url) {
            positions.pop();
            if positions.is_empty() {
                self.hackathons_by_url.remove(&record.url);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collections> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Snapshot of all canonical records, in insertion order.
    pub fn hackathons(&self) -> Vec<Hackathon> {
        self.lock().hackathons.clone()
    }

    /// Snapshot of all inbox items, in insertion order.
    pub fn inbox(&self) -> Vec<InboxItem> {
        self.lock().inbox.clone()
    }
}

#[async_trait::async_trait]
impl HackathonStore for MemoryStore {
    async fn find_inbox_by_url(&self, url: &str) -> Result<Option<InboxItem>, StoreError> {
        let g = self.lock();
        Ok(g
            .inbox_by_url
            .get(url)
            .and_then(|positions| positions.first())
            .map(|&pos| g.inbox[pos].clone()))
    }

    async fn find_hackathon_by_url(&self, url: &str) -> Result<Option<Hackathon>, StoreError> {
        let g = self.lock();
        Ok(g
            .hackathons_by_url
            .get(url)
            .and_then(|positions| positions.first())
            .map(|&pos| g.hackathons[pos].clone()))
    }

    async fn insert_inbox(&self, candidate: &CandidateRecord) -> Result<InboxItem, StoreError> {
        let mut g = self.lock();
        if let Some(url) = candidate.url.as_deref() {
            if g.inbox_url_index.contains_key(url) {
                return Err(StoreError::DuplicateKey(url.to_string()));
            }
        }
        let item = InboxItem::pending(candidate.clone());
        let pos = g.inbox.len();
        if let Some(url) = item.url() {
            g.inbox_url_index.insert(url.to_string(), pos);
            g.inbox_by_url.entry(url.to_string()).or_default().push(pos);
        }
        g.inbox.push(item.clone());
        Ok(item)
    }

    async fn get_inbox(&self, id: Uuid) -> Result<Option<InboxItem>, StoreError> {
        let g = self.lock();
        Ok(g.inbox.iter().find(|i| i.id == id).cloned())
    }

    async fn list_inbox(&self, status: Option<ReviewStatus>) -> Result<Vec<InboxItem>, StoreError> {
        let g = self.lock();
        Ok(g
            .inbox
            .iter()
            .filter(|i| status.map_or(true, |s| i.review_status == s))
            .cloned()
            .collect())
    }

    async fn reject_inbox(&self, id: Uuid) -> Result<InboxItem, ReviewError> {
        let mut g = self.lock();
        let pos = g
            .inbox
            .iter()
            .position(|i| i.id == id)
            .ok_or(ReviewError::NotFound(id))?;
        let current = g.inbox[pos].review_status;
        if current != ReviewStatus::Pending {
            return Err(ReviewError::NotPending {
                id,
                status: current,
            });
        }
        g.inbox[pos].review_status = ReviewStatus::Rejected;
        // rejected urls leave the unique index
        if let Some(url) = g.inbox[pos].candidate.url.clone() {
            g.inbox_url_index.remove(&url);
        }
        Ok(g.inbox[pos].clone())
    }

    async fn approve_inbox(
        &self,
        id: Uuid,
        hackathon: NewHackathon,
    ) -> Result<Hackathon, ReviewError> {
        let mut g = self.lock();

        // step 1: insert canonical record
        let record = Hackathon::from_new(hackathon, Utc::now());
        g.push_hackathon(record.clone());

        // step 2: conditional update, undo step 1 if it matches nothing
        let outcome = match g.inbox.iter().position(|i| i.id == id) {
            None => Err(ReviewError::NotFound(id)),
            Some(pos) if g.inbox[pos].review_status != ReviewStatus::Pending => {
                Err(ReviewError::NotPending {
                    id,
                    status: g.inbox[pos].review_status,
                })
            }
            Some(pos) => {
                g.inbox[pos].review_status = ReviewStatus::Approved;
                Ok(())
            }
        };

        match outcome {
            Ok(()) => Ok(record),
            Err(e) => {
                g.pop_hackathon();
                Err(e)
            }
        }
    }

    async fn insert_hackathon(&self, hackathon: NewHackathon) -> Result<Hackathon, StoreError> {
        let record = Hackathon::from_new(hackathon, Utc::now());
        self.lock().push_hackathon(record.clone());
        Ok(record)
    }
}
