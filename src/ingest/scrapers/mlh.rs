// src/ingest/scrapers/mlh.rs
//! Major League Hacking season page. Only in-person upcoming events are kept.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info, warn};

use super::{clean_text, http_client};
use crate::ingest::types::Scraper;
use crate::models::{CandidateRecord, DateRange};

const BASE_URL_TEMPLATE: &str = "https://mlh.io/seasons/{year}/events";
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

static SEL_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("div.row").unwrap());
static SEL_CARD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.col-lg-3.col-md-4.col-sm-6").unwrap());
static SEL_FORMAT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.event-hybrid-notes span").unwrap());
static SEL_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.event-name").unwrap());
static SEL_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.event-link").unwrap());
static SEL_START: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[itemprop="startDate"]"#).unwrap());
static SEL_END: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[itemprop="endDate"]"#).unwrap());
static SEL_CITY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"span[itemprop="city"]"#).unwrap());
static SEL_STATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"span[itemprop="state"]"#).unwrap());

pub struct MlhScraper {
    name: String,
    target_url: String,
    client: reqwest::Client,
}

impl MlhScraper {
    pub fn new(year: i32) -> Result<Self> {
        if year < 2000 {
            bail!("invalid year {year} for MLH scraper");
        }
        let target_url = BASE_URL_TEMPLATE.replace("{year}", &year.to_string());
        Self::with_target_url(year, target_url)
    }

    /// Same scraper pointed at another page (mirrors, local test servers).
    pub fn with_target_url(year: i32, target_url: impl Into<String>) -> Result<Self> {
        let client = http_client(FETCH_TIMEOUT).context("building MLH http client")?;
        let scraper = Self {
            name: format!("mlh_events_{year}_inperson"),
            target_url: target_url.into(),
            client,
        };
        info!(target: "ingest", scraper = %scraper.name, url = %scraper.target_url, "initialized MLH scraper");
        Ok(scraper)
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    async fn fetch(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.target_url)
            .send()
            .await
            .context("MLH http get()")?
            .error_for_status()
            .context("MLH http status")?;
        resp.text().await.context("MLH http .text()")
    }
}

#[async_trait]
impl Scraper for MlhScraper {
    async fn scrape(&self) -> Result<Vec<CandidateRecord>> {
        let body = match self.fetch().await {
            Ok(b) => b,
            Err(e) => {
                error!(target: "ingest", scraper = %self.name, url = %self.target_url, error = ?e, "fetch failed");
                return Ok(Vec::new());
            }
        };
        let items = parse_events_page(&body, &self.target_url, &self.name);
        info!(target: "ingest", scraper = %self.name, found = items.len(), "MLH scrape finished");
        Ok(items)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Extract in-person upcoming events from an MLH season page.
pub fn parse_events_page(html: &str, source_url: &str, scraper_name: &str) -> Vec<CandidateRecord> {
    let doc = Html::parse_document(html);

    let Some(container) = doc.select(&SEL_ROW).find(|row| {
        row.children()
            .filter_map(ElementRef::wrap)
            .any(|c| c.value().name() == "h3" && element_text(&c).contains("Upcoming Events"))
    }) else {
        warn!(target: "ingest", scraper = scraper_name, "could not find upcoming events container");
        return Vec::new();
    };

    let cards: Vec<ElementRef> = container.select(&SEL_CARD).collect();
    let in_person: Vec<ElementRef> = cards
        .iter()
        .copied()
        .filter(|card| {
            card.select(&SEL_FORMAT)
                .next()
                .is_some_and(|tag| element_text(&tag).contains("In-Person Only"))
        })
        .collect();
    info!(
        target: "ingest",
        scraper = scraper_name,
        upcoming = cards.len(),
        in_person = in_person.len(),
        "parsing MLH cards"
    );

    in_person
        .into_iter()
        .map(|card| parse_card(card, source_url, scraper_name))
        .collect()
}

fn parse_card(card: ElementRef, source_url: &str, scraper_name: &str) -> CandidateRecord {
    let name = first_text(card, &SEL_NAME);
    let url = first_attr(card, &SEL_LINK, "href").map(|href| absolute_href(source_url, href));
    let start = first_attr(card, &SEL_START, "content");
    let end = first_attr(card, &SEL_END, "content");

    let location_parts: Vec<String> = [first_text(card, &SEL_CITY), first_text(card, &SEL_STATE)]
        .into_iter()
        .flatten()
        .collect();

    let mut candidate = CandidateRecord::new(scraper_name).with_source_url(source_url);
    candidate.name = name;
    candidate.url = url;
    candidate.date = date_range(start.as_deref(), end.as_deref());
    if !location_parts.is_empty() {
        candidate.location = Some(location_parts.join(", "));
    }
    candidate
}

/// Absolute hrefs are kept byte for byte; relative ones are joined onto the
/// page url.
fn absolute_href(page_url: &str, href: String) -> String {
    if url::Url::parse(&href).is_ok() {
        return href;
    }
    url::Url::parse(page_url)
        .and_then(|base| base.join(&href))
        .map(String::from)
        .unwrap_or(href)
}

/// Parse `YYYY-MM-DD` pairs as UTC midnights. Missing or malformed input
/// drops the date (logged) but keeps the record.
pub fn date_range(start: Option<&str>, end: Option<&str>) -> Option<DateRange> {
    let (Some(start), Some(end)) = (start, end) else {
        warn!(target: "ingest", ?start, ?end, "missing start or end date");
        return None;
    };
    match (parse_day(start), parse_day(end)) {
        (Some(start_date), Some(end_date)) => Some(DateRange {
            start_date,
            end_date,
        }),
        _ => {
            error!(target: "ingest", %start, %end, "could not parse dates");
            None
        }
    }
}

fn parse_day(s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

fn first_text(scope: ElementRef, sel: &Selector) -> Option<String> {
    scope
        .select(sel)
        .next()
        .and_then(|el| clean_text(&element_text(&el)))
}

fn first_attr(scope: ElementRef, sel: &Selector, attr: &str) -> Option<String> {
    scope
        .select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .and_then(clean_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn dates_parse_as_utc_midnight() {
        let r = date_range(Some("2026-02-07"), Some("2026-02-08")).unwrap();
        assert_eq!(r.start_date, Utc.with_ymd_and_hms(2026, 2, 7, 0, 0, 0).unwrap());
        assert_eq!(r.end_date, Utc.with_ymd_and_hms(2026, 2, 8, 0, 0, 0).unwrap());
    }

    #[test]
    fn malformed_or_missing_dates_are_dropped() {
        assert!(date_range(Some("Feb 7"), Some("2026-02-08")).is_none());
        assert!(date_range(None, Some("2026-02-08")).is_none());
    }

    #[test]
    fn rejects_years_before_2000() {
        assert!(MlhScraper::new(1999).is_err());
        let s = MlhScraper::new(2026).unwrap();
        assert_eq!(s.name(), "mlh_events_2026_inperson");
        assert_eq!(s.target_url(), "https://mlh.io/seasons/2026/events");
    }

    #[test]
    fn page_without_upcoming_section_yields_nothing() {
        let html = r#"<html><body><div class="row"><h3>Past Events</h3></div></body></html>"#;
        assert!(parse_events_page(html, "https://mlh.io", "mlh_test").is_empty());
    }
}
