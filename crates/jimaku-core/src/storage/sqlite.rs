//! SQLite Record Store
//!
//! Persistence for card scheduling state and the append-only review log.
//! Serializes the read-modify-write of a review inside one transaction so
//! concurrent callers never interleave updates to the same card.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

use crate::card::{Card, Rating, ReviewLog, ReviewStats, State};
use crate::fsrs::{FSRSParameters, FSRSScheduler, PreviewResults, SchedulerError};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Card not found
    #[error("Card not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Scheduler error
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// RECORDS
// ============================================================================

/// A persisted card: identity and ownership around the scheduling state
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Stable identifier, referenced by the owning flashcard
    pub id: String,
    /// Optional deck grouping
    pub deck_id: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
    /// The scheduling state itself
    #[serde(flatten)]
    pub card: Card,
}

/// A persisted review log entry
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogRecord {
    /// Stable identifier
    pub id: String,
    /// The card this review belongs to
    pub card_id: String,
    /// The audit snapshot
    #[serde(flatten)]
    pub log: ReviewLog,
}

// ============================================================================
// STORAGE
// ============================================================================

/// Record store for cards and review logs.
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self` (not `&mut self`), making `Storage` `Send +
/// Sync` so callers can share it behind an `Arc` without an outer mutex.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    scheduler: FSRSScheduler,
}

impl Storage {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Create a store with the default scheduler configuration
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_scheduler(db_path, FSRSScheduler::default())
    }

    /// Create a store with custom scheduler parameters
    pub fn with_params(db_path: Option<PathBuf>, params: FSRSParameters) -> Result<Self> {
        Self::with_scheduler(db_path, FSRSScheduler::new(params)?)
    }

    /// Create a store around an already-built scheduler
    pub fn with_scheduler(db_path: Option<PathBuf>, scheduler: FSRSScheduler) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "jimaku", "core").ok_or_else(|| {
                    StorageError::Init("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                data_dir.join("jimaku.db")
            }
        };

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            scheduler,
        })
    }

    /// The scheduler this store reviews with
    pub fn scheduler(&self) -> &FSRSScheduler {
        &self.scheduler
    }

    // ------------------------------------------------------------------
    // Card CRUD
    // ------------------------------------------------------------------

    /// Create a new card, immediately due
    pub fn create_card(&self, deck_id: Option<&str>) -> Result<CardRecord> {
        let now = Utc::now();
        let record = CardRecord {
            id: Uuid::new_v4().to_string(),
            deck_id: deck_id.map(str::to_string),
            created_at: now,
            updated_at: now,
            card: Card::new(now),
        };

        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO cards (
                id, deck_id, created_at, updated_at,
                due, stability, difficulty, elapsed_days, scheduled_days,
                reps, lapses, state, last_review, learning_steps
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.id,
                record.deck_id,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
                record.card.due.to_rfc3339(),
                record.card.stability,
                record.card.difficulty,
                record.card.elapsed_days,
                record.card.scheduled_days,
                record.card.reps,
                record.card.lapses,
                record.card.state.as_str(),
                record.card.last_review.map(|t| t.to_rfc3339()),
                record.card.learning_steps as i64,
            ],
        )?;

        tracing::debug!(card_id = %record.id, deck_id = ?record.deck_id, "created card");
        Ok(record)
    }

    /// Fetch a card by id
    pub fn get_card(&self, id: &str) -> Result<Option<CardRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let raw = reader
            .query_row(
                "SELECT * FROM cards WHERE id = ?1",
                params![id],
                Self::read_card_row,
            )
            .optional()?;
        raw.map(Self::card_from_row).transpose()
    }

    /// Overwrite a card's scheduling state
    pub fn update_card(&self, record: &CardRecord) -> Result<()> {
        let now = Utc::now();
        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE cards SET
                deck_id = ?1,
                updated_at = ?2,
                due = ?3,
                stability = ?4,
                difficulty = ?5,
                elapsed_days = ?6,
                scheduled_days = ?7,
                reps = ?8,
                lapses = ?9,
                state = ?10,
                last_review = ?11,
                learning_steps = ?12
            WHERE id = ?13",
            params![
                record.deck_id,
                now.to_rfc3339(),
                record.card.due.to_rfc3339(),
                record.card.stability,
                record.card.difficulty,
                record.card.elapsed_days,
                record.card.scheduled_days,
                record.card.reps,
                record.card.lapses,
                record.card.state.as_str(),
                record.card.last_review.map(|t| t.to_rfc3339()),
                record.card.learning_steps as i64,
                record.id,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(record.id.clone()));
        }
        Ok(())
    }

    /// Delete a card and, via cascade, its review logs
    pub fn delete_card(&self, id: &str) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let changed = writer.execute("DELETE FROM cards WHERE id = ?1", params![id])?;

        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        tracing::debug!(card_id = %id, "deleted card");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reviewing
    // ------------------------------------------------------------------

    /// Review a card: schedule it, persist the new state and append the
    /// log, all inside one transaction.
    pub fn review_card(
        &self,
        id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<(CardRecord, ReviewLogRecord)> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction()?;

        // Read inside the transaction so the review is serialized against
        // any concurrent writer
        let raw = tx
            .query_row(
                "SELECT * FROM cards WHERE id = ?1",
                params![id],
                Self::read_card_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let mut record = Self::card_from_row(raw)?;

        let output = self.scheduler.next(&record.card, now, rating);
        record.card = output.card;
        record.updated_at = now;

        tx.execute(
            "UPDATE cards SET
                updated_at = ?1,
                due = ?2,
                stability = ?3,
                difficulty = ?4,
                elapsed_days = ?5,
                scheduled_days = ?6,
                reps = ?7,
                lapses = ?8,
                state = ?9,
                last_review = ?10,
                learning_steps = ?11
            WHERE id = ?12",
            params![
                record.updated_at.to_rfc3339(),
                record.card.due.to_rfc3339(),
                record.card.stability,
                record.card.difficulty,
                record.card.elapsed_days,
                record.card.scheduled_days,
                record.card.reps,
                record.card.lapses,
                record.card.state.as_str(),
                record.card.last_review.map(|t| t.to_rfc3339()),
                record.card.learning_steps as i64,
                record.id,
            ],
        )?;

        let log_record = ReviewLogRecord {
            id: Uuid::new_v4().to_string(),
            card_id: record.id.clone(),
            log: output.log,
        };
        Self::insert_log(&tx, &log_record)?;

        tx.commit()?;

        tracing::info!(
            card_id = %record.id,
            rating = %rating,
            state = %record.card.state,
            due = %record.card.due,
            "reviewed card"
        );
        Ok((record, log_record))
    }

    /// What each rating would do to a card, without persisting anything
    pub fn preview_review(&self, id: &str, now: DateTime<Utc>) -> Result<PreviewResults> {
        let record = self
            .get_card(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(self.scheduler.preview(&record.card, now))
    }

    fn insert_log(tx: &Transaction, record: &ReviewLogRecord) -> Result<()> {
        tx.execute(
            "INSERT INTO review_logs (
                id, card_id, rating, state, due, stability, difficulty,
                elapsed_days, last_elapsed_days, scheduled_days,
                learning_steps, review_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.id,
                record.card_id,
                record.log.rating.as_str(),
                record.log.state.as_str(),
                record.log.due.to_rfc3339(),
                record.log.stability,
                record.log.difficulty,
                record.log.elapsed_days,
                record.log.last_elapsed_days,
                record.log.scheduled_days,
                record.log.learning_steps as i64,
                record.log.review_time.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Cards due at or before `now`, soonest first
    pub fn due_cards(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<CardRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT * FROM cards WHERE due <= ?1 ORDER BY due ASC, id ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![now.to_rfc3339(), limit as i64], Self::read_card_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::card_from_row).collect()
    }

    /// All cards in a deck
    pub fn cards_for_deck(&self, deck_id: &str) -> Result<Vec<CardRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt =
            reader.prepare("SELECT * FROM cards WHERE deck_id = ?1 ORDER BY created_at ASC")?;
        let rows = stmt
            .query_map(params![deck_id], Self::read_card_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::card_from_row).collect()
    }

    /// Full review history of a card, oldest first
    pub fn review_logs(&self, card_id: &str) -> Result<Vec<ReviewLogRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT * FROM review_logs WHERE card_id = ?1 ORDER BY review_time ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![card_id], Self::read_log_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::log_from_row).collect()
    }

    /// Distinct cards reviewed during one UTC calendar day
    pub fn cards_reviewed_on(&self, date: NaiveDate) -> Result<i64> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let count = reader.query_row(
            "SELECT COUNT(DISTINCT card_id) FROM review_logs
             WHERE review_time >= ?1 AND review_time < ?2",
            params![start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Aggregate counts over the store at a point in time
    pub fn stats(&self, now: DateTime<Utc>) -> Result<ReviewStats> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let total_cards: i64 =
            reader.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

        let new_cards: i64 = reader.query_row(
            "SELECT COUNT(*) FROM cards WHERE state = 'New'",
            [],
            |row| row.get(0),
        )?;

        let learning_cards: i64 = reader.query_row(
            "SELECT COUNT(*) FROM cards WHERE state IN ('Learning', 'Relearning')",
            [],
            |row| row.get(0),
        )?;

        let review_cards: i64 = reader.query_row(
            "SELECT COUNT(*) FROM cards WHERE state = 'Review'",
            [],
            |row| row.get(0),
        )?;

        let due_cards: i64 = reader.query_row(
            "SELECT COUNT(*) FROM cards WHERE due <= ?1",
            params![now.to_rfc3339()],
            |row| row.get(0),
        )?;

        let day_start = now
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        let reviewed_today: i64 = reader.query_row(
            "SELECT COUNT(DISTINCT card_id) FROM review_logs
             WHERE review_time >= ?1 AND review_time < ?2",
            params![
                day_start.to_rfc3339(),
                (day_start + Duration::days(1)).to_rfc3339()
            ],
            |row| row.get(0),
        )?;

        Ok(ReviewStats {
            total_cards,
            new_cards,
            learning_cards,
            review_cards,
            due_cards,
            reviewed_today,
        })
    }

    // ------------------------------------------------------------------
    // Row mapping
    // ------------------------------------------------------------------
    // Two stages: the rusqlite closure only pulls raw columns, then a
    // second step parses the text columns into domain types so a corrupt
    // state/rating/timestamp surfaces as its named error variant rather
    // than a generic database error.

    fn read_card_row(row: &Row) -> rusqlite::Result<CardRow> {
        Ok(CardRow {
            id: row.get("id")?,
            deck_id: row.get("deck_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            due: row.get("due")?,
            stability: row.get("stability")?,
            difficulty: row.get("difficulty")?,
            elapsed_days: row.get("elapsed_days")?,
            scheduled_days: row.get("scheduled_days")?,
            reps: row.get("reps")?,
            lapses: row.get("lapses")?,
            state: row.get("state")?,
            last_review: row.get("last_review")?,
            learning_steps: row.get("learning_steps")?,
        })
    }

    fn read_log_row(row: &Row) -> rusqlite::Result<LogRow> {
        Ok(LogRow {
            id: row.get("id")?,
            card_id: row.get("card_id")?,
            rating: row.get("rating")?,
            state: row.get("state")?,
            due: row.get("due")?,
            stability: row.get("stability")?,
            difficulty: row.get("difficulty")?,
            elapsed_days: row.get("elapsed_days")?,
            last_elapsed_days: row.get("last_elapsed_days")?,
            scheduled_days: row.get("scheduled_days")?,
            learning_steps: row.get("learning_steps")?,
            review_time: row.get("review_time")?,
        })
    }

    fn parse_timestamp(s: &str, column: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::InvalidTimestamp(format!("{column}: {s} ({e})")))
    }

    fn card_from_row(raw: CardRow) -> Result<CardRecord> {
        let state: State = raw
            .state
            .parse()
            .map_err(SchedulerError::InvalidCardState)?;
        let last_review = match raw.last_review.as_deref() {
            Some(s) => Some(Self::parse_timestamp(s, "last_review")?),
            None => None,
        };

        Ok(CardRecord {
            id: raw.id,
            deck_id: raw.deck_id,
            created_at: Self::parse_timestamp(&raw.created_at, "created_at")?,
            updated_at: Self::parse_timestamp(&raw.updated_at, "updated_at")?,
            card: Card {
                due: Self::parse_timestamp(&raw.due, "due")?,
                stability: raw.stability,
                difficulty: raw.difficulty,
                elapsed_days: raw.elapsed_days,
                scheduled_days: raw.scheduled_days,
                reps: raw.reps,
                lapses: raw.lapses,
                state,
                last_review,
                learning_steps: raw.learning_steps.max(0) as usize,
            },
        })
    }

    fn log_from_row(raw: LogRow) -> Result<ReviewLogRecord> {
        let rating: Rating = raw.rating.parse().map_err(SchedulerError::InvalidRating)?;
        let state: State = raw
            .state
            .parse()
            .map_err(SchedulerError::InvalidCardState)?;

        Ok(ReviewLogRecord {
            id: raw.id,
            card_id: raw.card_id,
            log: ReviewLog {
                rating,
                state,
                due: Self::parse_timestamp(&raw.due, "due")?,
                stability: raw.stability,
                difficulty: raw.difficulty,
                elapsed_days: raw.elapsed_days,
                last_elapsed_days: raw.last_elapsed_days,
                scheduled_days: raw.scheduled_days,
                learning_steps: raw.learning_steps.max(0) as usize,
                review_time: Self::parse_timestamp(&raw.review_time, "review_time")?,
            },
        })
    }
}

/// Raw `cards` row, text columns still unparsed
struct CardRow {
    id: String,
    deck_id: Option<String>,
    created_at: String,
    updated_at: String,
    due: String,
    stability: f64,
    difficulty: f64,
    elapsed_days: f64,
    scheduled_days: f64,
    reps: u32,
    lapses: u32,
    state: String,
    last_review: Option<String>,
    learning_steps: i64,
}

/// Raw `review_logs` row, text columns still unparsed
struct LogRow {
    id: String,
    card_id: String,
    rating: String,
    state: String,
    due: String,
    stability: f64,
    difficulty: f64,
    elapsed_days: f64,
    last_elapsed_days: f64,
    scheduled_days: f64,
    learning_steps: i64,
    review_time: String,
}

// ============================================================================
// TESTS
// ============================================================================
