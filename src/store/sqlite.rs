// src/store/sqlite.rs
//! SQLite-backed store. Documents map onto two tables; the url columns are
//! indexed for the duplicate checker's point lookups, and live inbox urls
//! carry a partial unique index so racing inserts surface as
//! [`StoreError::DuplicateKey`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::info;
use uuid::Uuid;

use super::{HackathonStore, StoreError};
use crate::inbox::ReviewError;
use crate::models::{
    CandidateRecord, Coordinates, DateRange, Hackathon, HackathonStatus, InboxItem, Location,
    NewHackathon, ReviewStatus,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS inbox (
        id TEXT PRIMARY KEY,
        name TEXT,
        start_date TEXT,
        end_date TEXT,
        location TEXT,
        url TEXT,
        notes TEXT,
        source_url TEXT,
        scraper_name TEXT NOT NULL,
        scraped_at TEXT NOT NULL,
        review_status TEXT NOT NULL DEFAULT 'pending'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_inbox_url ON inbox(url)",
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_inbox_live_url
        ON inbox(url)
        WHERE url IS NOT NULL AND review_status != 'rejected'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hackathons (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        city TEXT NOT NULL,
        state TEXT,
        country TEXT NOT NULL,
        lat REAL NOT NULL,
        long REAL NOT NULL,
        url TEXT NOT NULL,
        notes TEXT,
        status TEXT NOT NULL,
        source TEXT,
        application_form TEXT,
        application_deadline TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_hackathons_url ON hackathons(url)",
];

const INBOX_COLUMNS: &str = "id, name, start_date, end_date, location, url, notes, source_url, \
                             scraper_name, scraped_at, review_status";

const HACKATHON_COLUMNS: &str = "id, name, start_date, end_date, city, state, country, lat, long, \
                                 url, notes, status, source, application_form, \
                                 application_deadline, created_at";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateKey(db.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(target: "store", %url, "sqlite store ready");
        Ok(store)
    }

    /// Private in-memory database. A single connection that never expires,
    /// since every new connection would see an empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn current_status(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<ReviewStatus>, StoreError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT review_status FROM inbox WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *conn)
                .await?;
        raw.map(|s| {
            ReviewStatus::parse(&s).ok_or_else(|| StoreError::Corrupt {
                id: id.to_string(),
                detail: format!("unknown review_status '{s}'"),
            })
        })
        .transpose()
    }
}

async fn insert_hackathon_row(
    conn: &mut SqliteConnection,
    h: &Hackathon,
) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO hackathons ({HACKATHON_COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(h.id.to_string())
    .bind(&h.name)
    .bind(h.date.start_date)
    .bind(h.date.end_date)
    .bind(&h.location.city)
    .bind(&h.location.state)
    .bind(&h.location.country)
    .bind(h.location.coordinates.lat)
    .bind(h.location.coordinates.long)
    .bind(&h.url)
    .bind(&h.notes)
    .bind(h.status.as_str())
    .bind(&h.source)
    .bind(&h.application_form)
    .bind(h.application_deadline)
    .bind(h.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt {
        id: raw.to_string(),
        detail: e.to_string(),
    })
}

fn inbox_from_row(row: &SqliteRow) -> Result<InboxItem, StoreError> {
    let raw_id: String = row.try_get("id")?;
    let id = parse_id(&raw_id)?;

    let start: Option<DateTime<Utc>> = row.try_get("start_date")?;
    let end: Option<DateTime<Utc>> = row.try_get("end_date")?;
    let date = match (start, end) {
        (Some(start_date), Some(end_date)) => Some(DateRange {
            start_date,
            end_date,
        }),
        _ => None,
    };

    let status_raw: String = row.try_get("review_status")?;
    let review_status = ReviewStatus::parse(&status_raw).ok_or_else(|| StoreError::Corrupt {
        id: raw_id.clone(),
        detail: format!("unknown review_status '{status_raw}'"),
    })?;

    Ok(InboxItem {
        id,
        candidate: CandidateRecord {
            name: row.try_get("name")?,
            date,
            location: row.try_get("location")?,
            url: row.try_get("url")?,
            notes: row.try_get("notes")?,
            source_url: row.try_get("source_url")?,
            scraper_name: row.try_get("scraper_name")?,
            scraped_at: row.try_get("scraped_at")?,
        },
        review_status,
    })
}

fn hackathon_from_row(row: &SqliteRow) -> Result<Hackathon, StoreError> {
    let raw_id: String = row.try_get("id")?;
    let status_raw: String = row.try_get("status")?;
    let status = HackathonStatus::parse(&status_raw).ok_or_else(|| StoreError::Corrupt {
        id: raw_id.clone(),
        detail: format!("unknown status '{status_raw}'"),
    })?;

    Ok(Hackathon {
        id: parse_id(&raw_id)?,
        name: row.try_get("name")?,
        date: DateRange {
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
        },
        location: Location {
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            country: row.try_get("country")?,
            coordinates: Coordinates {
                lat: row.try_get("lat")?,
                long: row.try_get("long")?,
            },
        },
        url: row.try_get("url")?,
        notes: row.try_get("notes")?,
        status,
        source: row.try_get("source")?,
        application_form: row.try_get("application_form")?,
        application_deadline: row.try_get("application_deadline")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait::async_trait]
impl HackathonStore for SqliteStore {
    async fn find_inbox_by_url(&self, url: &str) -> Result<Option<InboxItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {INBOX_COLUMNS} FROM inbox WHERE url = ? LIMIT 1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(inbox_from_row).transpose()
    }

    async fn find_hackathon_by_url(&self, url: &str) -> Result<Option<Hackathon>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {HACKATHON_COLUMNS} FROM hackathons WHERE url = ? LIMIT 1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(hackathon_from_row).transpose()
    }

    async fn insert_inbox(&self, candidate: &CandidateRecord) -> Result<InboxItem, StoreError> {
        let item = InboxItem::pending(candidate.clone());
        let c = &item.candidate;
        sqlx::query(&format!(
            "INSERT INTO inbox ({INBOX_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(item.id.to_string())
        .bind(&c.name)
        .bind(c.date.map(|d| d.start_date))
        .bind(c.date.map(|d| d.end_date))
        .bind(&c.location)
        .bind(&c.url)
        .bind(&c.notes)
        .bind(&c.source_url)
        .bind(&c.scraper_name)
        .bind(c.scraped_at)
        .bind(item.review_status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(item)
    }

    async fn get_inbox(&self, id: Uuid) -> Result<Option<InboxItem>, StoreError> {
        let row = sqlx::query(&format!("SELECT {INBOX_COLUMNS} FROM inbox WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(inbox_from_row).transpose()
    }

    async fn list_inbox(&self, status: Option<ReviewStatus>) -> Result<Vec<InboxItem>, StoreError> {
        let rows = match status {
            Some(s) => {
                sqlx::query(&format!(
                    "SELECT {INBOX_COLUMNS} FROM inbox WHERE review_status = ? \
                     ORDER BY scraped_at, rowid"
                ))
                .bind(s.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {INBOX_COLUMNS} FROM inbox ORDER BY scraped_at, rowid"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(inbox_from_row).collect()
    }

    async fn reject_inbox(&self, id: Uuid) -> Result<InboxItem, ReviewError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::from)?;
        let res = sqlx::query(
            "UPDATE inbox SET review_status = 'rejected' \
             WHERE id = ? AND review_status = 'pending'",
        )
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(StoreError::from)?;

        if res.rows_affected() == 0 {
            return Err(match Self::current_status(&mut conn, id).await? {
                None => ReviewError::NotFound(id),
                Some(status) => ReviewError::NotPending { id, status },
            });
        }

        let row = sqlx::query(&format!("SELECT {INBOX_COLUMNS} FROM inbox WHERE id = ?"))
            .bind(id.to_string())
            .fetch_one(&mut *conn)
            .await
            .map_err(StoreError::from)?;
        Ok(inbox_from_row(&row)?)
    }

    async fn approve_inbox(
        &self,
        id: Uuid,
        hackathon: NewHackathon,
    ) -> Result<Hackathon, ReviewError> {
        let record = Hackathon::from_new(hackathon, Utc::now());
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        insert_hackathon_row(&mut tx, &record).await?;

        let res = sqlx::query(
            "UPDATE inbox SET review_status = 'approved' \
             WHERE id = ? AND review_status = 'pending'",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        if res.rows_affected() == 0 {
            let current = Self::current_status(&mut tx, id).await?;
            tx.rollback().await.map_err(StoreError::from)?;
            return Err(match current {
                None => ReviewError::NotFound(id),
                Some(status) => ReviewError::NotPending { id, status },
            });
        }

        tx.commit().await.map_err(StoreError::from)?;
        Ok(record)
    }

    async fn insert_hackathon(&self, hackathon: NewHackathon) -> Result<Hackathon, StoreError> {
        let record = Hackathon::from_new(hackathon, Utc::now());
        let mut conn = self.pool.acquire().await?;
        insert_hackathon_row(&mut conn, &record).await?;
        Ok(record)
    }
}
