//! SQLite storage layer for the baby tracker.
//!
//! Implements the `bt-core` store traits ([`EventStore`], [`BabyStore`]) on
//! top of `rusqlite`.
//!
//! # Thread Safety
//!
//! `rusqlite::Connection` is `Send` but not `Sync`, while the store traits
//! require `Send + Sync`. The [`Database`] therefore serializes access through
//! an internal `Mutex`. Contention is negligible for this workload: writes are
//! single-row and reads are per-baby.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Instants are stored as TEXT in RFC 3339 with millisecond precision and a
//! `Z` suffix (e.g., `2025-06-01T10:30:00.000Z`). The fixed width keeps
//! lexicographic ordering identical to chronological ordering, so range and
//! ordering queries compare strings directly. Event start and end times also
//! carry the originating IANA timezone identifier and UTC offset in sibling
//! columns, matching [`bt_core::Timestamp`].
//!
//! ## Event Payload Storage
//!
//! The `payload` column stores the tagged JSON form of
//! [`bt_core::EventPayload`] (`{"type": ..., "data": ...}`). The `category`
//! column duplicates the discriminator for indexed filtering; it is derived
//! from the payload at write time and never read back into the domain model.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

use bt_core::baby::{Baby, BabySettings};
use bt_core::event::{Event, EventCategory, EventPayload};
use bt_core::store::{BabyStore, EventStore, StoreError};
use bt_core::timestamp::Timestamp;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp failed to parse.
    #[error("invalid {column} for row {id}: {value}")]
    TimestampParse {
        column: &'static str,
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored date failed to parse.
    #[error("invalid birth date for baby {id}: {value}")]
    DateParse {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored identifier is not a valid UUID.
    #[error("invalid {column} for row {id}")]
    UuidParse {
        column: &'static str,
        id: String,
        #[source]
        source: uuid::Error,
    },
    /// Event payload or settings JSON failed to encode or decode.
    #[error("invalid JSON for row {id}")]
    Json {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::backend(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety and schema notes.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS babies (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                birth_date TEXT NOT NULL,
                primary_caregiver_id TEXT NOT NULL,
                settings TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Events table: one row per caregiving occurrence
            -- start_utc/end_utc: RFC 3339 millis (e.g., '2025-06-01T10:30:00.000Z')
            -- start_tz/end_tz: IANA identifier of the originating timezone
            -- payload: tagged JSON ({\"type\": ..., \"data\": ...})
            -- deleted_at: soft-delete marker; NULL means live
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                baby_id TEXT NOT NULL,
                logged_by TEXT NOT NULL,
                category TEXT NOT NULL,
                start_utc TEXT NOT NULL,
                start_tz TEXT NOT NULL,
                start_offset INTEGER NOT NULL,
                end_utc TEXT,
                end_tz TEXT,
                end_offset INTEGER,
                payload TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_baby_start ON events(baby_id, start_utc);
            CREATE INDEX IF NOT EXISTS idx_events_category ON events(category);
            ",
        )?;
        Ok(())
    }

    fn insert_event(&self, event: &Event) -> Result<(), DbError> {
        let payload = encode_json(event.id, &event.payload)?;
        self.conn().execute(
            "
            INSERT INTO events
            (id, baby_id, logged_by, category, start_utc, start_tz, start_offset,
             end_utc, end_tz, end_offset, payload, notes, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                event.id.to_string(),
                event.baby_id.to_string(),
                event.logged_by.to_string(),
                event.category().as_str(),
                format_timestamp(event.start_time.utc),
                event.start_time.timezone_id,
                event.start_time.offset_seconds,
                event.end_time.as_ref().map(|t| format_timestamp(t.utc)),
                event.end_time.as_ref().map(|t| t.timezone_id.clone()),
                event.end_time.as_ref().map(|t| t.offset_seconds),
                payload,
                event.notes,
                format_timestamp(event.created_at),
                format_timestamp(event.updated_at),
                event.deleted_at.map(format_timestamp),
            ],
        )?;
        tracing::debug!(event_id = %event.id, category = %event.category(), "inserted event");
        Ok(())
    }

    /// Returns the number of rows changed (zero when the event is absent).
    fn update_event(&self, event: &Event) -> Result<usize, DbError> {
        let payload = encode_json(event.id, &event.payload)?;
        let changed = self.conn().execute(
            "
            UPDATE events
            SET baby_id = ?2, logged_by = ?3, category = ?4,
                start_utc = ?5, start_tz = ?6, start_offset = ?7,
                end_utc = ?8, end_tz = ?9, end_offset = ?10,
                payload = ?11, notes = ?12, created_at = ?13,
                updated_at = ?14, deleted_at = ?15
            WHERE id = ?1
            ",
            params![
                event.id.to_string(),
                event.baby_id.to_string(),
                event.logged_by.to_string(),
                event.category().as_str(),
                format_timestamp(event.start_time.utc),
                event.start_time.timezone_id,
                event.start_time.offset_seconds,
                event.end_time.as_ref().map(|t| format_timestamp(t.utc)),
                event.end_time.as_ref().map(|t| t.timezone_id.clone()),
                event.end_time.as_ref().map(|t| t.offset_seconds),
                payload,
                event.notes,
                format_timestamp(event.created_at),
                format_timestamp(event.updated_at),
                event.deleted_at.map(format_timestamp),
            ],
        )?;
        Ok(changed)
    }

    fn query_events(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Event>, DbError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, EventRow::from_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.decode()?);
        }
        Ok(events)
    }

    /// The earliest-registered baby, if any.
    pub fn first_baby(&self) -> Result<Option<Baby>, DbError> {
        let row = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "
                SELECT id, name, birth_date, primary_caregiver_id, settings, created_at
                FROM babies ORDER BY created_at ASC, id ASC LIMIT 1
                ",
            )?;
            stmt.query_row([], BabyRow::from_row).optional()?
        };
        row.map(BabyRow::decode).transpose()
    }
}

const EVENT_COLUMNS: &str = "id, baby_id, logged_by, start_utc, start_tz, start_offset, \
     end_utc, end_tz, end_offset, payload, notes, created_at, updated_at, deleted_at";

impl EventStore for Database {
    fn fetch_active_events(
        &self,
        baby_id: Uuid,
        category: EventCategory,
    ) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "
            SELECT {EVENT_COLUMNS} FROM events
            WHERE baby_id = ? AND category = ? AND end_utc IS NULL AND deleted_at IS NULL
            ORDER BY start_utc DESC
            "
        );
        Ok(self.query_events(&sql, params![baby_id.to_string(), category.as_str()])?)
    }

    fn fetch_events_in_range(
        &self,
        baby_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "
            SELECT {EVENT_COLUMNS} FROM events
            WHERE baby_id = ? AND deleted_at IS NULL AND start_utc >= ? AND start_utc <= ?
            ORDER BY start_utc DESC
            "
        );
        Ok(self.query_events(
            &sql,
            params![
                baby_id.to_string(),
                format_timestamp(from),
                format_timestamp(to)
            ],
        )?)
    }

    fn fetch_events(
        &self,
        baby_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Event>, StoreError> {
        let filter = if include_deleted {
            ""
        } else {
            "AND deleted_at IS NULL"
        };
        let sql = format!(
            "
            SELECT {EVENT_COLUMNS} FROM events
            WHERE baby_id = ? {filter}
            ORDER BY start_utc DESC
            "
        );
        Ok(self.query_events(&sql, params![baby_id.to_string()])?)
    }

    fn create(&self, event: &Event) -> Result<Event, StoreError> {
        self.insert_event(event)?;
        Ok(event.clone())
    }

    fn update(&self, event: &Event) -> Result<Event, StoreError> {
        if self.update_event(event)? == 0 {
            return Err(StoreError::NotFound {
                entity: "event",
                id: event.id,
            });
        }
        tracing::debug!(event_id = %event.id, "updated event");
        Ok(event.clone())
    }

    fn soft_delete(&self, event: &Event, deleted_at: DateTime<Utc>) -> Result<Event, StoreError> {
        let mut deleted = event.clone();
        deleted.deleted_at = Some(deleted_at);
        deleted.updated_at = deleted_at;
        EventStore::update(self, &deleted)
    }

    fn hard_delete(&self, id: Uuid) -> Result<(), StoreError> {
        let changed = self
            .conn()
            .execute("DELETE FROM events WHERE id = ?", params![id.to_string()])
            .map_err(DbError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "event", id });
        }
        tracing::debug!(event_id = %id, "hard-deleted event");
        Ok(())
    }
}

impl BabyStore for Database {
    fn create(&self, baby: &Baby) -> Result<Baby, StoreError> {
        let settings = encode_json(baby.id, &baby.settings)?;
        self.conn()
            .execute(
                "
                INSERT INTO babies (id, name, birth_date, primary_caregiver_id, settings, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![
                    baby.id.to_string(),
                    baby.name,
                    baby.birth_date.to_string(),
                    baby.primary_caregiver_id.to_string(),
                    settings,
                    format_timestamp(baby.created_at),
                ],
            )
            .map_err(DbError::from)?;
        Ok(baby.clone())
    }

    fn fetch(&self, id: Uuid) -> Result<Baby, StoreError> {
        let row = {
            let conn = self.conn();
            let mut stmt = conn
                .prepare(
                    "
                    SELECT id, name, birth_date, primary_caregiver_id, settings, created_at
                    FROM babies WHERE id = ?
                    ",
                )
                .map_err(DbError::from)?;
            stmt.query_row(params![id.to_string()], BabyRow::from_row)
                .optional()
                .map_err(DbError::from)?
        };
        let row = row.ok_or(StoreError::NotFound { entity: "baby", id })?;
        Ok(row.decode()?)
    }

    fn update(&self, baby: &Baby) -> Result<Baby, StoreError> {
        let settings = encode_json(baby.id, &baby.settings)?;
        let changed = self
            .conn()
            .execute(
                "
                UPDATE babies
                SET name = ?2, birth_date = ?3, primary_caregiver_id = ?4,
                    settings = ?5, created_at = ?6
                WHERE id = ?1
                ",
                params![
                    baby.id.to_string(),
                    baby.name,
                    baby.birth_date.to_string(),
                    baby.primary_caregiver_id.to_string(),
                    settings,
                    format_timestamp(baby.created_at),
                ],
            )
            .map_err(DbError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "baby",
                id: baby.id,
            });
        }
        Ok(baby.clone())
    }
}

/// Raw event columns as stored, before domain decoding.
struct EventRow {
    id: String,
    baby_id: String,
    logged_by: String,
    start_utc: String,
    start_tz: String,
    start_offset: i32,
    end_utc: Option<String>,
    end_tz: Option<String>,
    end_offset: Option<i32>,
    payload: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

impl EventRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            baby_id: row.get(1)?,
            logged_by: row.get(2)?,
            start_utc: row.get(3)?,
            start_tz: row.get(4)?,
            start_offset: row.get(5)?,
            end_utc: row.get(6)?,
            end_tz: row.get(7)?,
            end_offset: row.get(8)?,
            payload: row.get(9)?,
            notes: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
            deleted_at: row.get(13)?,
        })
    }

    fn decode(self) -> Result<Event, DbError> {
        let payload: EventPayload =
            serde_json::from_str(&self.payload).map_err(|source| DbError::Json {
                id: self.id.clone(),
                source,
            })?;
        let end_time = match self.end_utc {
            Some(end_utc) => Some(Timestamp::new(
                parse_timestamp(&end_utc, "end_utc", &self.id)?,
                self.end_tz.unwrap_or_else(|| "UTC".to_string()),
                self.end_offset.unwrap_or(0),
            )),
            None => None,
        };
        let deleted_at = match self.deleted_at {
            Some(raw) => Some(parse_timestamp(&raw, "deleted_at", &self.id)?),
            None => None,
        };
        Ok(Event {
            id: parse_uuid(&self.id, "id", &self.id)?,
            baby_id: parse_uuid(&self.baby_id, "baby_id", &self.id)?,
            logged_by: parse_uuid(&self.logged_by, "logged_by", &self.id)?,
            start_time: Timestamp::new(
                parse_timestamp(&self.start_utc, "start_utc", &self.id)?,
                self.start_tz,
                self.start_offset,
            ),
            end_time,
            payload,
            notes: self.notes,
            created_at: parse_timestamp(&self.created_at, "created_at", &self.id)?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at", &self.id)?,
            deleted_at,
        })
    }
}

/// Raw baby columns as stored, before domain decoding.
struct BabyRow {
    id: String,
    name: String,
    birth_date: String,
    primary_caregiver_id: String,
    settings: String,
    created_at: String,
}

impl BabyRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            birth_date: row.get(2)?,
            primary_caregiver_id: row.get(3)?,
            settings: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn decode(self) -> Result<Baby, DbError> {
        // BabySettings clamps the expiry policy during deserialization, so
        // out-of-range values written by older builds load safely.
        let settings: BabySettings =
            serde_json::from_str(&self.settings).map_err(|source| DbError::Json {
                id: self.id.clone(),
                source,
            })?;
        let birth_date: NaiveDate =
            self.birth_date
                .parse()
                .map_err(|source| DbError::DateParse {
                    id: self.id.clone(),
                    value: self.birth_date.clone(),
                    source,
                })?;
        Ok(Baby {
            id: parse_uuid(&self.id, "id", &self.id)?,
            name: self.name,
            birth_date,
            primary_caregiver_id: parse_uuid(&self.primary_caregiver_id, "primary_caregiver_id", &self.id)?,
            settings,
            created_at: parse_timestamp(&self.created_at, "created_at", &self.id)?,
        })
    }
}

fn encode_json(id: Uuid, value: &impl serde::Serialize) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|source| DbError::Json {
        id: id.to_string(),
        source,
    })
}

fn parse_timestamp(value: &str, column: &'static str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            column,
            id: id.to_string(),
            value: value.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_uuid(value: &str, column: &'static str, id: &str) -> Result<Uuid, DbError> {
    value.parse().map_err(|source| DbError::UuidParse {
        column,
        id: id.to_string(),
        source,
    })
}
