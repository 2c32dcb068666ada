use chrono::{DateTime, Utc};
use presence_core::Descriptor;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type written for every accepted check-in.
pub const EVENT_CHECK_IN: &str = "checkin";

/// Cooldown applied when no settings document exists.
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 30;

/// One enrolled employee: a unique name and exactly one descriptor.
/// Re-enrolling the same name overwrites the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeDoc {
    pub name: String,
    pub descriptor: Descriptor,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl EmployeeDoc {
    pub fn new(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            created_at: Utc::now(),
        }
    }
}

/// Append-only attendance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "isAuto")]
    pub is_auto: bool,
    pub timestamp: DateTime<Utc>,
}

impl AttendanceRecord {
    /// New check-in event stamped with the given wall-clock time.
    pub fn check_in(name: impl Into<String>, is_auto: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            event_type: EVENT_CHECK_IN.to_string(),
            is_auto,
            timestamp,
        }
    }
}

/// Attendance settings document, key `"attendance"`. Owned externally;
/// the service only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSettings {
    #[serde(rename = "cooldownMinutes")]
    pub cooldown_minutes: i64,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_record_shape() {
        let now = Utc::now();
        let rec = AttendanceRecord::check_in("alice", true, now);
        assert_eq!(rec.name, "alice");
        assert_eq!(rec.event_type, EVENT_CHECK_IN);
        assert!(rec.is_auto);
        assert_eq!(rec.timestamp, now);
        assert!(!rec.id.is_empty());
    }

    #[test]
    fn test_settings_wire_names() {
        let json = serde_json::to_string(&AttendanceSettings {
            cooldown_minutes: 45,
        })
        .unwrap();
        assert_eq!(json, r#"{"cooldownMinutes":45}"#);
    }

    #[test]
    fn test_default_cooldown_is_thirty() {
        assert_eq!(
            AttendanceSettings::default().cooldown_minutes,
            DEFAULT_COOLDOWN_MINUTES
        );
    }
}
