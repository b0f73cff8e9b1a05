//! Storage layer for the attendance tracker.
//!
//! Persists employees, admitted attendance events and a bounded audit log
//! using `rusqlite`. This is the ingestion side of the system: it hands the
//! core an already-ordered event list per employee.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Event admission runs inside an immediate transaction, which takes the
//! database write lock before the preceding event is read. Two processes
//! punching for the same employee are therefore serialized, and the
//! auto-derived direction always sees every committed event.
//!
//! ## Manual Entries
//!
//! Operator-entered events carry `is_manual = 1` and a mandatory comment.
//! Only these may be deleted individually; terminal swipes are removed only
//! by clearing a whole day.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC with microsecond precision
//! (e.g., `2025-01-15T10:30:00.000000Z`). The fixed width keeps lexicographic
//! ordering identical to chronological ordering.
//!
//! ## Event Ordering
//!
//! Events are listed by `(ts, id)`. `id` is an autoincrement key, so events
//! with identical timestamps keep their insertion order.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use wt_core::{AttendanceRecord, Direction, EmployeeId, ValidationError};

/// Default number of audit entries kept before the oldest are dropped.
pub const DEFAULT_AUDIT_CAPACITY: usize = 500;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {row}: {timestamp}")]
    TimestampParse {
        row: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored identifier failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No employee with this ID.
    #[error("employee {0} not found")]
    UnknownEmployee(EmployeeId),
    /// The employee exists but may not punch.
    #[error("employee {0} is inactive")]
    InactiveEmployee(EmployeeId),
    /// An employee with this badge UID already exists.
    #[error("badge UID {0:?} is already assigned")]
    DuplicateUid(String),
    /// No event with this ID.
    #[error("event {0} not found")]
    UnknownEvent(i64),
    /// Only manual entries may be deleted one by one.
    #[error("event {0} is not a manual entry")]
    NotManual(i64),
    /// Failed to encode or decode an audit payload.
    #[error("invalid audit details: {0}")]
    AuditDetails(#[from] serde_json::Error),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
    audit_capacity: usize,
}

/// An employee row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub full_name: String,
    pub nfc_uid: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An event ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub employee_id: EmployeeId,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// An admitted event as stored.
///
/// The direction is kept as the raw stored text; rows written by older
/// tooling may hold values the core reports as `UNKNOWN_DIRECTION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEvent {
    pub id: i64,
    pub employee_id: EmployeeId,
    pub direction: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    /// Entered by an operator rather than swiped at a terminal.
    pub is_manual: bool,
    /// Operator's reason; always present on manual entries.
    pub comment: Option<String>,
}

impl AttendanceRecord for StoredEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn direction(&self) -> &str {
        &self.direction
    }

    fn event_id(&self) -> Option<i64> {
        Some(self.id)
    }
}

/// One audited admin action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub action: String,
    pub action_label: String,
    pub actor: String,
    pub details: Value,
}

/// Audited action names and their human-readable labels.
pub const AUDIT_ACTIONS: &[(&str, &str)] = &[
    ("employee_create", "Employee created"),
    ("employee_update", "Employee updated"),
    ("manual_event_create", "Manual event added"),
    ("manual_event_delete", "Manual event deleted"),
    ("events_import", "Events imported"),
    ("clear_day_events", "Day events cleared"),
];

/// Human-readable label for an audit action; unknown actions label themselves.
pub fn action_label(action: &str) -> &str {
    AUDIT_ACTIONS
        .iter()
        .find(|(name, _)| *name == action)
        .map_or(action, |(_, label)| label)
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        };
        db.init()?;
        Ok(db)
    }

    /// Sets how many audit entries are retained. Zero is treated as one.
    #[must_use]
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity.max(1);
        self
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                nfc_uid TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Events table: admitted badge swipes
            -- direction: 'IN' or 'OUT'
            -- ts: RFC 3339 UTC, microsecond precision
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id INTEGER NOT NULL,
                direction TEXT NOT NULL,
                ts TEXT NOT NULL,
                source TEXT NOT NULL,
                is_manual INTEGER NOT NULL DEFAULT 0,
                comment TEXT,
                FOREIGN KEY (employee_id) REFERENCES employees(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_events_employee_ts ON events(employee_id, ts);

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                action TEXT NOT NULL,
                actor TEXT NOT NULL,
                details TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_log(action);
            ",
        )?;
        self.add_missing_event_columns()?;
        Ok(())
    }

    /// Databases created before manual entries were tracked lack these columns.
    fn add_missing_event_columns(&self) -> Result<(), DbError> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info('events')")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if !columns.iter().any(|name| name == "is_manual") {
            self.conn.execute_batch(
                "ALTER TABLE events ADD COLUMN is_manual INTEGER NOT NULL DEFAULT 0;",
            )?;
        }
        if !columns.iter().any(|name| name == "comment") {
            self.conn.execute_batch("ALTER TABLE events ADD COLUMN comment TEXT;")?;
        }
        Ok(())
    }

    // ========== Employees ==========

    /// Registers a new employee with a badge UID.
    pub fn add_employee(
        &mut self,
        full_name: &str,
        nfc_uid: &str,
    ) -> Result<EmployeeRecord, DbError> {
        let full_name = full_name.trim();
        let nfc_uid = nfc_uid.trim();
        if full_name.is_empty() {
            return Err(ValidationError::Empty { field: "full name" }.into());
        }
        if nfc_uid.is_empty() {
            return Err(ValidationError::Empty { field: "badge UID" }.into());
        }
        if self.find_employee_by_uid(nfc_uid)?.is_some() {
            return Err(DbError::DuplicateUid(nfc_uid.to_string()));
        }

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO employees (full_name, nfc_uid, is_active, created_at) VALUES (?, ?, 1, ?)",
            params![full_name, nfc_uid, format_timestamp(created_at)],
        )?;
        let id = EmployeeId::new(self.conn.last_insert_rowid())?;
        tracing::debug!(%id, nfc_uid, "employee created");

        Ok(EmployeeRecord {
            id,
            full_name: full_name.to_string(),
            nfc_uid: nfc_uid.to_string(),
            is_active: true,
            created_at: parse_timestamp(&format_timestamp(created_at), "employee")?,
        })
    }

    pub fn get_employee(&self, id: EmployeeId) -> Result<Option<EmployeeRecord>, DbError> {
        self.query_employee("WHERE id = ?", id.get())
    }

    pub fn find_employee_by_uid(&self, nfc_uid: &str) -> Result<Option<EmployeeRecord>, DbError> {
        self.query_employee("WHERE nfc_uid = ?", nfc_uid.trim())
    }

    fn query_employee(
        &self,
        filter: &str,
        value: impl rusqlite::ToSql,
    ) -> Result<Option<EmployeeRecord>, DbError> {
        let sql = format!(
            "SELECT id, full_name, nfc_uid, is_active, created_at FROM employees {filter}"
        );
        let row = self
            .conn
            .query_row(&sql, [value], |row| {
                Ok(EmployeeRow {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    nfc_uid: row.get(2)?,
                    is_active: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .optional()?;
        row.map(EmployeeRow::into_record).transpose()
    }

    /// Lists employees ordered by ID.
    pub fn list_employees(&self, active_only: bool) -> Result<Vec<EmployeeRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, full_name, nfc_uid, is_active, created_at
            FROM employees
            WHERE is_active = 1 OR ?1 = 0
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([active_only], |row| {
            Ok(EmployeeRow {
                id: row.get(0)?,
                full_name: row.get(1)?,
                nfc_uid: row.get(2)?,
                is_active: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?.into_record()?);
        }
        Ok(employees)
    }

    /// Activates or deactivates an employee. Returns false if the employee does not exist.
    pub fn set_employee_active(&mut self, id: EmployeeId, active: bool) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE employees SET is_active = ? WHERE id = ?",
            params![active, id.get()],
        )?;
        Ok(updated > 0)
    }

    // ========== Events ==========

    /// Admits one badge swipe.
    ///
    /// When `direction` is `None` it is derived from the employee's latest
    /// event at or before `timestamp`: OUT after an IN, IN otherwise. The read
    /// and the insert share one immediate transaction, so concurrent punches
    /// cannot both observe the same preceding event.
    pub fn record_punch(
        &mut self,
        employee_id: EmployeeId,
        direction: Option<Direction>,
        timestamp: DateTime<Utc>,
        source: &str,
    ) -> Result<StoredEvent, DbError> {
        self.admit(employee_id, direction, timestamp, source, None)
    }

    /// Adds an operator-entered event, typically backdated.
    ///
    /// Unlike [`Database::record_punch`] the employee may be inactive, so
    /// history can still be corrected after someone leaves. A non-empty
    /// comment is required.
    pub fn record_manual_event(
        &mut self,
        employee_id: EmployeeId,
        direction: Option<Direction>,
        timestamp: DateTime<Utc>,
        source: &str,
        comment: &str,
    ) -> Result<StoredEvent, DbError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ValidationError::Empty { field: "comment" }.into());
        }
        self.admit(employee_id, direction, timestamp, source, Some(comment))
    }

    fn admit(
        &mut self,
        employee_id: EmployeeId,
        direction: Option<Direction>,
        timestamp: DateTime<Utc>,
        source: &str,
        comment: Option<&str>,
    ) -> Result<StoredEvent, DbError> {
        let is_manual = comment.is_some();
        let ts = format_timestamp(timestamp);
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let active: Option<bool> = tx
            .query_row(
                "SELECT is_active FROM employees WHERE id = ?",
                [employee_id.get()],
                |row| row.get(0),
            )
            .optional()?;
        match active {
            None => return Err(DbError::UnknownEmployee(employee_id)),
            Some(false) if !is_manual => return Err(DbError::InactiveEmployee(employee_id)),
            Some(_) => {}
        }

        let direction = match direction {
            Some(direction) => direction,
            None => {
                let previous: Option<String> = tx
                    .query_row(
                        "
                        SELECT direction FROM events
                        WHERE employee_id = ?1 AND ts <= ?2
                        ORDER BY ts DESC, id DESC
                        LIMIT 1
                        ",
                        params![employee_id.get(), ts],
                        |row| row.get(0),
                    )
                    .optional()?;
                let derived = match previous.as_deref().map(str::parse::<Direction>) {
                    Some(Ok(Direction::In)) => Direction::Out,
                    _ => Direction::In,
                };
                tracing::debug!(
                    %employee_id,
                    previous = ?previous,
                    %derived,
                    "derived punch direction"
                );
                derived
            }
        };

        tx.execute(
            "
            INSERT INTO events (employee_id, direction, ts, source, is_manual, comment)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![employee_id.get(), direction.as_str(), ts, source, is_manual, comment],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(StoredEvent {
            id,
            employee_id,
            direction: direction.as_str().to_string(),
            timestamp: parse_timestamp(&ts, "event")?,
            source: source.to_string(),
            is_manual,
            comment: comment.map(str::to_string),
        })
    }

    /// Inserts a batch of events in one transaction.
    ///
    /// Unlike [`Database::record_punch`] this does not check the employee's
    /// active flag; it is meant for admin corrections and imports.
    pub fn insert_events(&mut self, events: &[NewEvent]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut exists = tx.prepare("SELECT 1 FROM employees WHERE id = ?")?;
            let mut stmt = tx.prepare(
                "INSERT INTO events (employee_id, direction, ts, source) VALUES (?, ?, ?, ?)",
            )?;
            for event in events {
                if !exists.exists([event.employee_id.get()])? {
                    return Err(DbError::UnknownEmployee(event.employee_id));
                }
                inserted += stmt.execute(params![
                    event.employee_id.get(),
                    event.direction.as_str(),
                    format_timestamp(event.timestamp),
                    event.source,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Lists one employee's events ordered by timestamp, ties in insertion order.
    pub fn list_events_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<StoredEvent>, DbError> {
        self.query_events(
            "WHERE employee_id = ?1 ORDER BY ts ASC, id ASC",
            params![employee_id.get()],
        )
    }

    /// Lists one employee's events in `[start, end)`, oldest first.
    pub fn list_events_between(
        &self,
        employee_id: EmployeeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>, DbError> {
        self.query_events(
            "WHERE employee_id = ?1 AND ts >= ?2 AND ts < ?3 ORDER BY ts ASC, id ASC",
            params![employee_id.get(), format_timestamp(start), format_timestamp(end)],
        )
    }

    /// Lists manual entries across all employees, newest first.
    pub fn list_manual_events(&self, limit: usize) -> Result<Vec<StoredEvent>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_events(
            "WHERE is_manual = 1 ORDER BY ts DESC, id DESC LIMIT ?1",
            params![limit],
        )
    }

    pub fn get_event(&self, id: i64) -> Result<Option<StoredEvent>, DbError> {
        Ok(self.query_events("WHERE id = ?1", params![id])?.pop())
    }

    /// Deletes one manual entry and returns it. Terminal punches are refused.
    pub fn delete_manual_event(&mut self, id: i64) -> Result<StoredEvent, DbError> {
        let event = self.get_event(id)?.ok_or(DbError::UnknownEvent(id))?;
        if !event.is_manual {
            return Err(DbError::NotManual(id));
        }
        self.conn.execute("DELETE FROM events WHERE id = ?", [id])?;
        tracing::debug!(event_id = id, employee = %event.employee_id, "manual event deleted");
        Ok(event)
    }

    fn query_events(
        &self,
        filter: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<StoredEvent>, DbError> {
        let sql = format!(
            "SELECT id, employee_id, direction, ts, source, is_manual, comment FROM events {filter}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok(EventRow {
                id: row.get(0)?,
                employee_id: row.get(1)?,
                direction: row.get(2)?,
                ts: row.get(3)?,
                source: row.get(4)?,
                is_manual: row.get(5)?,
                comment: row.get(6)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }

    /// Deletes an employee's events in `[start, end)`. Returns how many were removed.
    pub fn delete_events_between(
        &mut self,
        employee_id: EmployeeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM events WHERE employee_id = ? AND ts >= ? AND ts < ?",
            params![employee_id.get(), format_timestamp(start), format_timestamp(end)],
        )?;
        Ok(deleted)
    }

    // ========== Audit log ==========

    /// Records an admin action and trims the log to its capacity.
    pub fn record_audit(
        &mut self,
        action: &str,
        actor: &str,
        details: &Value,
    ) -> Result<AuditEntry, DbError> {
        let ts = Utc::now();
        let details_json = serde_json::to_string(details)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO audit_log (ts, action, actor, details) VALUES (?, ?, ?, ?)",
            params![format_timestamp(ts), action, actor, details_json],
        )?;
        let id = tx.last_insert_rowid();
        let capacity = i64::try_from(self.audit_capacity).unwrap_or(i64::MAX);
        let trimmed = tx.execute(
            "
            DELETE FROM audit_log
            WHERE id NOT IN (SELECT id FROM audit_log ORDER BY id DESC LIMIT ?)
            ",
            [capacity],
        )?;
        tx.commit()?;

        tracing::info!(target: "audit", action, actor, details = %details_json, "admin action");
        if trimmed > 0 {
            tracing::debug!(trimmed, capacity = self.audit_capacity, "audit log trimmed");
        }

        Ok(AuditEntry {
            id,
            ts: parse_timestamp(&format_timestamp(ts), "audit entry")?,
            action: action.to_string(),
            action_label: action_label(action).to_string(),
            actor: actor.to_string(),
            details: details.clone(),
        })
    }

    /// Lists audit entries newest first, optionally filtered by action.
    pub fn list_audit(
        &self,
        limit: usize,
        action: Option<&str>,
    ) -> Result<Vec<AuditEntry>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "
            SELECT id, ts, action, actor, details
            FROM audit_log
            WHERE ?1 IS NULL OR action = ?1
            ORDER BY id DESC
            LIMIT ?2
            ",
        )?;
        let rows = stmt.query_map(params![action, limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            let (id, ts, action, actor, details) = row?;
            entries.push(AuditEntry {
                id,
                ts: parse_timestamp(&ts, &format!("audit entry {id}"))?,
                action_label: action_label(&action).to_string(),
                action,
                actor,
                details: serde_json::from_str(&details)?,
            });
        }
        Ok(entries)
    }
}

/// Raw event columns before validation.
struct EventRow {
    id: i64,
    employee_id: i64,
    direction: String,
    ts: String,
    source: String,
    is_manual: bool,
    comment: Option<String>,
}

impl EventRow {
    fn into_event(self) -> Result<StoredEvent, DbError> {
        Ok(StoredEvent {
            id: self.id,
            employee_id: EmployeeId::new(self.employee_id)?,
            timestamp: parse_timestamp(&self.ts, &format!("event {}", self.id))?,
            direction: self.direction,
            source: self.source,
            is_manual: self.is_manual,
            comment: self.comment,
        })
    }
}

/// Raw employee columns before validation.
struct EmployeeRow {
    id: i64,
    full_name: String,
    nfc_uid: String,
    is_active: bool,
    created_at: String,
}

impl EmployeeRow {
    fn into_record(self) -> Result<EmployeeRecord, DbError> {
        Ok(EmployeeRecord {
            id: EmployeeId::new(self.id)?,
            created_at: parse_timestamp(&self.created_at, &format!("employee {}", self.id))?,
            full_name: self.full_name,
            nfc_uid: self.nfc_uid,
            is_active: self.is_active,
        })
    }
}

fn parse_timestamp(timestamp: &str, row: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row: row.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
