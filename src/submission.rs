// src/submission.rs
//! Operator-entered hackathon data, as posted by the admin panel, and the
//! direct-submission path that bypasses the inbox.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::geocode::{resolve_city, GeocodeError, Geocoder};
use crate::models::{DateRange, Hackathon, HackathonStatus, Location, NewHackathon};
use crate::store::{HackathonStore, StoreError};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("name is empty")]
    EmptyName,
    #[error("invalid date range '{0}', expected 'YYYY-MM-DD to YYYY-MM-DD'")]
    InvalidDateRange(String),
    #[error("either a structured location or a city is required")]
    MissingLocation,
    #[error("city given but no geocoder is configured")]
    GeocodingUnavailable,
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct HackathonForm {
    pub name: String,
    #[serde(alias = "date-range")]
    pub date_range: String,
    /// Free-text city, resolved through the geocoder.
    #[serde(default)]
    pub city: Option<String>,
    /// Already-resolved location; wins over `city`.
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(alias = "URL")]
    pub url: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: HackathonStatus,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub application_form: Option<String>,
    #[serde(default)]
    pub application_deadline: Option<DateTime<Utc>>,
}

impl HackathonForm {
    pub async fn into_new_hackathon(
        self,
        geocoder: Option<&dyn Geocoder>,
    ) -> Result<NewHackathon, FormError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(FormError::EmptyName);
        }
        let date = parse_date_range(&self.date_range)?;

        let location = match (self.location, self.city.as_deref().map(str::trim)) {
            (Some(loc), _) => loc,
            (None, Some(city)) if !city.is_empty() => {
                let geocoder = geocoder.ok_or(FormError::GeocodingUnavailable)?;
                resolve_city(geocoder, city).await?
            }
            _ => return Err(FormError::MissingLocation),
        };

        Ok(NewHackathon {
            name,
            date,
            location,
            url: self.url,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            status: self.status,
            source: self.source,
            application_form: self.application_form,
            application_deadline: self.application_deadline,
        }
        .normalized())
    }
}

/// `"2026-09-12 to 2026-09-14"` → UTC midnights. Start must not follow end.
pub fn parse_date_range(raw: &str) -> Result<DateRange, FormError> {
    let invalid = || FormError::InvalidDateRange(raw.to_string());
    let (start, end) = raw.split_once(" to ").ok_or_else(invalid)?;
    let day = |s: &str| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(invalid)
    };
    let range = DateRange {
        start_date: day(start)?,
        end_date: day(end)?,
    };
    if !range.is_ordered() {
        return Err(invalid());
    }
    Ok(range)
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid submission: {0}")]
    Invalid(String),
    #[error("a hackathon with url {0} already exists")]
    Duplicate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Insert a canonical record directly, after checking its url is not
/// already published.
pub async fn submit_hackathon(
    store: &dyn HackathonStore,
    hackathon: NewHackathon,
) -> Result<Hackathon, SubmitError> {
    let hackathon = hackathon.normalized();
    if !hackathon.date.is_ordered() {
        return Err(SubmitError::Invalid("start date is after end date".into()));
    }
    if store.find_hackathon_by_url(&hackathon.url).await?.is_some() {
        return Err(SubmitError::Duplicate(hackathon.url));
    }
    let record = store.insert_hackathon(hackathon).await?;
    info!(target: "inbox", id = %record.id, url = %record.url, "hackathon submitted directly");
    Ok(record)
}
