//! presence-store — the document store behind the attendance service.
//!
//! Everything durable lives here: enrolled employees with their
//! descriptors, the append-only attendance log, and the settings
//! documents. The daemon talks to the [`IdentityStore`] trait; the
//! shipped implementation is [`sqlite::SqliteStore`]. Per-document
//! operations are last-writer-wins; nothing here implements distributed
//! consistency.

pub mod records;
pub mod sqlite;

use async_trait::async_trait;
use records::{AttendanceRecord, AttendanceSettings, EmployeeDoc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    /// Callers keep serving whatever state they already hold.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record for {name}: {reason}")]
    Corrupt { name: String, reason: String },
}

/// Document-store contract the service is written against.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch up to `limit` enrolled employees, ordered by name. The limit
    /// is a memory-safety bound on the in-process cache, not a correctness
    /// guarantee.
    async fn load_employees(&self, limit: usize) -> Result<Vec<EmployeeDoc>, StoreError>;

    /// Insert or overwrite one employee document.
    async fn put_employee(&self, doc: &EmployeeDoc) -> Result<(), StoreError>;

    /// Delete one employee document. Returns false if none existed.
    async fn delete_employee(&self, name: &str) -> Result<bool, StoreError>;

    /// Most recent attendance record for the given employee, if any.
    async fn last_check_in(&self, name: &str) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Append one attendance record. Records are never mutated or deleted.
    async fn append_check_in(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Attendance settings document; `None` when never configured.
    async fn attendance_settings(&self) -> Result<Option<AttendanceSettings>, StoreError>;

    /// Cheap connectivity probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}
