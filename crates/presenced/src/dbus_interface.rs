//! D-Bus surface for the attendance daemon.
//!
//! Bus name: org.presence.Attendance1
//! Object path: /org/presence/Attendance1
//!
//! Every method takes plain arguments and returns a JSON document; the
//! typed work happens in [`crate::service`]. Failures become D-Bus errors
//! according to the service's status class.

use crate::service::{ApiError, Service};
use serde::Serialize;
use std::sync::Arc;
use zbus::interface;

pub struct PresenceService {
    service: Arc<Service>,
}

impl PresenceService {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[interface(name = "org.presence.Attendance1")]
impl PresenceService {
    /// Detect faces in a base64-encoded image.
    async fn detect(&self, image: String) -> zbus::fdo::Result<String> {
        reply(self.service.detect(&image).await)
    }

    /// Recognize the face in a base64-encoded image. A non-positive
    /// threshold means "use the configured default".
    async fn recognize(&self, image: String, threshold: f64) -> zbus::fdo::Result<String> {
        let threshold = (threshold > 0.0).then_some(threshold as f32);
        reply(self.service.recognize(&image, threshold).await)
    }

    /// Enroll a new employee from a base64-encoded image.
    async fn enroll(&self, name: String, image: String) -> zbus::fdo::Result<String> {
        tracing::info!(name, "enroll requested");
        reply(self.service.enroll(&name, &image).await)
    }

    /// List enrolled employees.
    async fn employees(&self) -> zbus::fdo::Result<String> {
        to_json(&self.service.employees().await)
    }

    /// Remove an enrolled employee.
    async fn remove(&self, name: String) -> zbus::fdo::Result<String> {
        tracing::info!(name, "remove requested");
        reply(self.service.remove(&name).await)
    }

    /// Record a check-in, subject to the cooldown.
    async fn check_in(&self, name: String, is_auto: bool) -> zbus::fdo::Result<String> {
        reply(self.service.check_in(&name, is_auto).await)
    }

    /// Rebuild the descriptor cache from the store.
    async fn reload(&self) -> zbus::fdo::Result<String> {
        reply(self.service.reload().await)
    }

    /// Daemon health summary.
    async fn health(&self) -> zbus::fdo::Result<String> {
        to_json(&self.service.health().await)
    }
}

fn reply<T: Serialize>(result: Result<T, ApiError>) -> zbus::fdo::Result<String> {
    match result {
        Ok(value) => to_json(&value),
        Err(err) => Err(map_error(err)),
    }
}

fn to_json<T: Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

fn map_error(err: ApiError) -> zbus::fdo::Error {
    let status = err.status_class();
    tracing::warn!(error = %err, status, "request failed");
    match status {
        400 => zbus::fdo::Error::InvalidArgs(err.to_string()),
        404 => zbus::fdo::Error::FileNotFound(err.to_string()),
        // 503 and 500 both surface as a generic failure; the message
        // already distinguishes a store outage from an internal fault.
        _ => zbus::fdo::Error::Failed(err.to_string()),
    }
}
