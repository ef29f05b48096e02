// src/models.rs
//! Records flowing through the pipeline: scraper candidates, queued inbox
//! items, and canonical hackathon entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl DateRange {
    pub fn is_ordered(&self) -> bool {
        self.start_date <= self.end_date
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CandidateError {
    #[error("date range starts after it ends")]
    InvertedDateRange,
    #[error("candidate has no scraper name")]
    MissingScraperName,
}

/// One scraper's raw, possibly incomplete view of a discovered event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRecord {
    pub name: Option<String>,
    pub date: Option<DateRange>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub source_url: Option<String>,
    pub scraper_name: String,
    pub scraped_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Empty candidate stamped with the current time.
    pub fn new(scraper_name: impl Into<String>) -> Self {
        Self {
            name: None,
            date: None,
            location: None,
            url: None,
            notes: None,
            source_url: None,
            scraper_name: scraper_name.into(),
            scraped_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_date(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date = Some(DateRange {
            start_date: start,
            end_date: end,
        });
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    pub fn validate(&self) -> Result<(), CandidateError> {
        if self.scraper_name.trim().is_empty() {
            return Err(CandidateError::MissingScraperName);
        }
        match &self.date {
            Some(range) if !range.is_ordered() => Err(CandidateError::InvertedDateRange),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

/// A persisted candidate awaiting an operator decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboxItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub candidate: CandidateRecord,
    #[serde(default)]
    pub review_status: ReviewStatus,
}

impl InboxItem {
    /// Queue a candidate. Whatever the scraper said, new items start pending.
    pub fn pending(candidate: CandidateRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate,
            review_status: ReviewStatus::Pending,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.candidate.url.as_deref()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HackathonStatus {
    Announced,
    ApplicationsOpen,
    ApplicationsClosed,
    Expected,
}

impl HackathonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HackathonStatus::Announced => "announced",
            HackathonStatus::ApplicationsOpen => "applications_open",
            HackathonStatus::ApplicationsClosed => "applications_closed",
            HackathonStatus::Expected => "expected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "announced" => Some(HackathonStatus::Announced),
            "applications_open" => Some(HackathonStatus::ApplicationsOpen),
            "applications_closed" => Some(HackathonStatus::ApplicationsClosed),
            "expected" => Some(HackathonStatus::Expected),
            _ => None,
        }
    }
}

/// Operator-supplied data for a canonical record, before the store assigns
/// identity and creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewHackathon {
    pub name: String,
    pub date: DateRange,
    pub location: Location,
    pub url: String,
    pub notes: Option<String>,
    pub status: HackathonStatus,
    pub source: Option<String>,
    pub application_form: Option<String>,
    pub application_deadline: Option<DateTime<Utc>>,
}

impl NewHackathon {
    /// Apply the scheme injection canonical urls go through.
    pub fn normalized(mut self) -> Self {
        self.url = ensure_scheme(&self.url);
        self.application_form = self.application_form.as_deref().map(ensure_scheme);
        self
    }
}

/// Published, authoritative hackathon entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hackathon {
    pub id: Uuid,
    pub name: String,
    pub date: DateRange,
    pub location: Location,
    pub url: String,
    pub notes: Option<String>,
    pub status: HackathonStatus,
    pub source: Option<String>,
    pub application_form: Option<String>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Hackathon {
    pub fn from_new(new: NewHackathon, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            date: new.date,
            location: new.location,
            url: new.url,
            notes: new.notes,
            status: new.status,
            source: new.source,
            application_form: new.application_form,
            application_deadline: new.application_deadline,
            created_at,
        }
    }
}

/// Prefix `https://` when the url carries no scheme.
pub fn ensure_scheme(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
