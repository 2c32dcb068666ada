//! SQLite implementation of [`IdentityStore`] via `tokio-rusqlite`.
//!
//! Descriptors are stored as JSON text; timestamps as fixed-width RFC 3339
//! UTC strings, which sort lexicographically in chronological order so the
//! latest-record query can lean on a plain index.

use crate::records::{AttendanceRecord, AttendanceSettings, EmployeeDoc};
use crate::{IdentityStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use presence_core::Descriptor;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use tokio_rusqlite::Connection;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    name       TEXT PRIMARY KEY,
    descriptor TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS attendance (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    event_type TEXT NOT NULL,
    is_auto    INTEGER NOT NULL,
    timestamp  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_attendance_name_ts ON attendance(name, timestamp DESC);
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const SETTINGS_KEY_ATTENDANCE: &str = "attendance";

fn fmt_ts(ts: DateTime<Utc>) -> String {
    // Fixed 9-digit fraction keeps the strings fixed-width and lossless.
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(name: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            name: name.to_string(),
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}

fn parse_descriptor(name: &str, raw: &str) -> Result<Descriptor, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        name: name.to_string(),
        reason: format!("bad descriptor: {e}"),
    })
}

impl From<tokio_rusqlite::Error> for StoreError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// SQLite-backed document store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).await?;
        conn.call(|c| {
            c.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        tracing::info!(path = %path.as_ref().display(), "sqlite store opened");
        Ok(Self { conn })
    }

    /// Write the attendance settings document. Administrative surface;
    /// the service itself only reads settings.
    pub async fn put_attendance_settings(
        &self,
        settings: AttendanceSettings,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_string(&settings).map_err(|e| StoreError::Corrupt {
            name: SETTINGS_KEY_ATTENDANCE.to_string(),
            reason: e.to_string(),
        })?;
        self.conn
            .call(move |c| {
                c.execute(
                    "INSERT INTO settings (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![SETTINGS_KEY_ATTENDANCE, value],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn load_employees(&self, limit: usize) -> Result<Vec<EmployeeDoc>, StoreError> {
        let rows: Vec<(String, String, String)> = self
            .conn
            .call(move |c| {
                let mut stmt = c.prepare(
                    "SELECT name, descriptor, created_at FROM employees
                     ORDER BY name LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit as i64], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (name, descriptor, created_at) in rows {
            let descriptor = parse_descriptor(&name, &descriptor)?;
            let created_at = parse_ts(&name, &created_at)?;
            out.push(EmployeeDoc {
                name,
                descriptor,
                created_at,
            });
        }
        Ok(out)
    }

    async fn put_employee(&self, doc: &EmployeeDoc) -> Result<(), StoreError> {
        let name = doc.name.clone();
        let descriptor = serde_json::to_string(&doc.descriptor).map_err(|e| StoreError::Corrupt {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let created_at = fmt_ts(doc.created_at);
        self.conn
            .call(move |c| {
                c.execute(
                    "INSERT INTO employees (name, descriptor, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO UPDATE SET
                         descriptor = excluded.descriptor,
                         created_at = excluded.created_at",
                    params![name, descriptor, created_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_employee(&self, name: &str) -> Result<bool, StoreError> {
        let name = name.to_string();
        let changed = self
            .conn
            .call(move |c| {
                let n = c.execute("DELETE FROM employees WHERE name = ?1", params![name])?;
                Ok(n)
            })
            .await?;
        Ok(changed > 0)
    }

    async fn last_check_in(&self, name: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let key = name.to_string();
        let row: Option<(String, String, String, bool, String)> = self
            .conn
            .call(move |c| {
                let row = c
                    .query_row(
                        "SELECT id, name, event_type, is_auto, timestamp FROM attendance
                         WHERE name = ?1 ORDER BY timestamp DESC LIMIT 1",
                        params![key],
                        |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        match row {
            None => Ok(None),
            Some((id, name, event_type, is_auto, timestamp)) => {
                let timestamp = parse_ts(&name, &timestamp)?;
                Ok(Some(AttendanceRecord {
                    id,
                    name,
                    event_type,
                    is_auto,
                    timestamp,
                }))
            }
        }
    }

    async fn append_check_in(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let rec = record.clone();
        let timestamp = fmt_ts(rec.timestamp);
        self.conn
            .call(move |c| {
                c.execute(
                    "INSERT INTO attendance (id, name, event_type, is_auto, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![rec.id, rec.name, rec.event_type, rec.is_auto, timestamp],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn attendance_settings(&self) -> Result<Option<AttendanceSettings>, StoreError> {
        let raw: Option<String> = self
            .conn
            .call(|c| {
                let row = c
                    .query_row(
                        "SELECT value FROM settings WHERE key = ?1",
                        params![SETTINGS_KEY_ATTENDANCE],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        match raw {
            None => Ok(None),
            Some(value) => serde_json::from_str(&value)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    name: SETTINGS_KEY_ATTENDANCE.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.conn
            .call(|c| {
                c.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
