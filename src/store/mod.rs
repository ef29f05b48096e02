// src/store/mod.rs
//! Document-store contract the pipeline and inbox review depend on.
//!
//! The store needs point lookups by url, inserts that report uniqueness
//! conflicts, conditional (optimistic) status updates, and one
//! multi-document transaction: approving an inbox item.

pub mod memory;
pub mod sqlite;

use thiserror::Error;
use uuid::Uuid;

use crate::inbox::ReviewError;
use crate::models::{CandidateRecord, Hackathon, InboxItem, NewHackathon, ReviewStatus};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique index rejected the write (another writer got there first).
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    /// Store cannot be reached at all; callers treat this as fatal.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(String),
    /// A stored row could not be mapped back into a record.
    #[error("corrupt record {id}: {detail}")]
    Corrupt { id: String, detail: String },
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[async_trait::async_trait]
pub trait HackathonStore: Send + Sync {
    /// Any inbox item with exactly this url, regardless of status.
    async fn find_inbox_by_url(&self, url: &str) -> Result<Option<InboxItem>, StoreError>;

    async fn find_hackathon_by_url(&self, url: &str) -> Result<Option<Hackathon>, StoreError>;

    /// Persist a candidate as a new pending inbox item.
    /// Fails with [`StoreError::DuplicateKey`] when the url is already taken
    /// by a pending or approved item.
    async fn insert_inbox(&self, candidate: &CandidateRecord) -> Result<InboxItem, StoreError>;

    async fn get_inbox(&self, id: Uuid) -> Result<Option<InboxItem>, StoreError>;

    async fn list_inbox(&self, status: Option<ReviewStatus>) -> Result<Vec<InboxItem>, StoreError>;

    /// pending → rejected, as a single conditional update.
    async fn reject_inbox(&self, id: Uuid) -> Result<InboxItem, ReviewError>;

    /// Insert the canonical record and flip the inbox item pending → approved
    /// in one all-or-nothing transaction.
    async fn approve_inbox(&self, id: Uuid, hackathon: NewHackathon)
        -> Result<Hackathon, ReviewError>;

    /// Direct operator submission, outside the inbox flow.
    async fn insert_hackathon(&self, hackathon: NewHackathon) -> Result<Hackathon, StoreError>;
}
