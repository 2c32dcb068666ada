//! Per-identity check-in cooldown gate.
//!
//! Stateless between requests: the store's latest record per identity is
//! the sole source of truth, so the gate survives process restarts at the
//! cost of one query per attempt.

use chrono::{DateTime, Duration, Utc};
use presence_store::records::AttendanceRecord;
use presence_store::{IdentityStore, StoreError};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    Granted,
    Denied { remaining_minutes: i64 },
}

pub struct AttendanceGate {
    store: Arc<dyn IdentityStore>,
}

impl AttendanceGate {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Record a check-in unless one already exists inside the cooldown
    /// window.
    ///
    /// The latest-record read and the append are separate store calls, so
    /// two concurrent attempts for the same identity in the same instant
    /// can both be granted. That race is left open on purpose; closing it
    /// needs a store-side transaction or compare-and-swap.
    pub async fn check_in(&self, name: &str, is_auto: bool) -> Result<CheckInOutcome, StoreError> {
        self.check_in_at(name, is_auto, Utc::now()).await
    }

    pub(crate) async fn check_in_at(
        &self,
        name: &str,
        is_auto: bool,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, StoreError> {
        let cooldown = self
            .store
            .attendance_settings()
            .await?
            .unwrap_or_default()
            .cooldown_minutes;

        if let Some(last) = self.store.last_check_in(name).await? {
            let elapsed = now - last.timestamp;
            if elapsed < Duration::minutes(cooldown) {
                // Whole-minute truncation: 29m59s elapsed counts as 29 minutes.
                let remaining = cooldown - elapsed.num_seconds() / 60;
                tracing::debug!(name, remaining, "check-in denied, cooldown active");
                return Ok(CheckInOutcome::Denied {
                    remaining_minutes: remaining,
                });
            }
        }

        self.store
            .append_check_in(&AttendanceRecord::check_in(name, is_auto, now))
            .await?;
        tracing::info!(name, is_auto, "check-in recorded");
        Ok(CheckInOutcome::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockStore;
    use presence_store::records::AttendanceSettings;

    fn now() -> DateTime<Utc> {
        "2026-08-27T09:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_first_check_in_granted_and_recorded() {
        let store = MockStore::new();
        let gate = AttendanceGate::new(store.clone());

        let outcome = gate.check_in_at("alice", false, now()).await.unwrap();
        assert_eq!(outcome, CheckInOutcome::Granted);

        let last = store.last_check_in("alice").await.unwrap().unwrap();
        assert_eq!(last.timestamp, now());
        assert!(!last.is_auto);
    }

    #[tokio::test]
    async fn test_immediate_second_attempt_denied_with_full_cooldown() {
        let store = MockStore::new();
        let gate = AttendanceGate::new(store);

        gate.check_in_at("alice", false, now()).await.unwrap();
        let outcome = gate.check_in_at("alice", false, now()).await.unwrap();
        assert_eq!(
            outcome,
            CheckInOutcome::Denied {
                remaining_minutes: 30
            }
        );
    }

    #[tokio::test]
    async fn test_denied_one_minute_before_cooldown_expires() {
        let store = MockStore::new();
        let gate = AttendanceGate::new(store);

        gate.check_in_at("alice", false, now()).await.unwrap();
        let at = now() + Duration::minutes(29);
        assert_eq!(
            gate.check_in_at("alice", false, at).await.unwrap(),
            CheckInOutcome::Denied {
                remaining_minutes: 1
            }
        );
    }

    #[tokio::test]
    async fn test_partial_minutes_truncate() {
        let store = MockStore::new();
        let gate = AttendanceGate::new(store);

        gate.check_in_at("alice", false, now()).await.unwrap();
        // 10m30s elapsed counts as 10 whole minutes: 20 remaining.
        let at = now() + Duration::seconds(10 * 60 + 30);
        assert_eq!(
            gate.check_in_at("alice", false, at).await.unwrap(),
            CheckInOutcome::Denied {
                remaining_minutes: 20
            }
        );
    }

    #[tokio::test]
    async fn test_granted_exactly_at_cooldown() {
        let store = MockStore::new();
        let gate = AttendanceGate::new(store.clone());

        gate.check_in_at("alice", false, now()).await.unwrap();
        let at = now() + Duration::minutes(30);
        assert_eq!(
            gate.check_in_at("alice", true, at).await.unwrap(),
            CheckInOutcome::Granted
        );
        assert_eq!(store.attendance_count(), 2);
    }

    #[tokio::test]
    async fn test_cooldown_is_per_identity() {
        let store = MockStore::new();
        let gate = AttendanceGate::new(store);

        gate.check_in_at("alice", false, now()).await.unwrap();
        assert_eq!(
            gate.check_in_at("bob", false, now()).await.unwrap(),
            CheckInOutcome::Granted
        );
    }

    #[tokio::test]
    async fn test_configured_cooldown_overrides_default() {
        let store = MockStore::new();
        store.set_settings(AttendanceSettings {
            cooldown_minutes: 5,
        });
        let gate = AttendanceGate::new(store);

        gate.check_in_at("alice", false, now()).await.unwrap();
        assert_eq!(
            gate.check_in_at("alice", false, now() + Duration::minutes(3))
                .await
                .unwrap(),
            CheckInOutcome::Denied {
                remaining_minutes: 2
            }
        );
        assert_eq!(
            gate.check_in_at("alice", false, now() + Duration::minutes(5))
                .await
                .unwrap(),
            CheckInOutcome::Granted
        );
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MockStore::new();
        store.set_failing(true);
        let gate = AttendanceGate::new(store);
        assert!(gate.check_in_at("alice", false, now()).await.is_err());
    }
}
