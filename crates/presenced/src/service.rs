//! Request boundary: typed operations, typed failures, and the single
//! place component errors map to transport status classes. The shapes here
//! are transport-agnostic; the D-Bus layer only serializes them.

use crate::attendance::{AttendanceGate, CheckInOutcome};
use crate::engine::{EngineError, EngineHandle};
use crate::registry::{Registry, RegistryError};
use presence_core::codec::DecodeError;
use presence_core::enroll::{require_single_face, EnrollError};
use presence_core::{best_match, codec, FaceRegion, MatchOutcome, MatchPolicy};
use presence_store::{IdentityStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing {0}")]
    InputMissing(&'static str),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Enroll(#[from] EnrollError),
    #[error("unknown employee: {0}")]
    NotFound(String),
    #[error("already checked in; wait {remaining_minutes} more minutes")]
    CooldownActive { remaining_minutes: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("analyzer failure: {0}")]
    Engine(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => ApiError::NotFound(name),
            RegistryError::Store(e) => ApiError::Store(e),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err.to_string())
    }
}

impl ApiError {
    /// HTTP-equivalent status class. Caller mistakes are 400s, unknown
    /// names 404, an unreachable store 503, everything else 500.
    pub fn status_class(&self) -> u16 {
        match self {
            ApiError::InputMissing(_)
            | ApiError::Decode(_)
            | ApiError::Enroll(_)
            | ApiError::CooldownActive { .. } => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Store(_) => 503,
            ApiError::Engine(_) => 500,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub faces_detected: usize,
    pub locations: Vec<FaceRegion>,
}

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<FaceRegion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecognizeResponse {
    fn miss(message: impl Into<String>, score: Option<f32>) -> Self {
        Self {
            name: None,
            confidence: None,
            score,
            location: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub success: bool,
    pub message: String,
    pub total_employees: usize,
}

#[derive(Debug, Serialize)]
pub struct EmployeesResponse {
    pub employees: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub remaining: usize,
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub registered_employees: usize,
    pub store_connected: bool,
}

pub struct Service {
    registry: Arc<Registry>,
    gate: AttendanceGate,
    engine: EngineHandle,
    store: Arc<dyn IdentityStore>,
    policy: MatchPolicy,
}

impl Service {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn IdentityStore>,
        engine: EngineHandle,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            registry,
            gate: AttendanceGate::new(store.clone()),
            engine,
            store,
            policy,
        }
    }

    pub async fn detect(&self, image_b64: &str) -> Result<DetectResponse, ApiError> {
        let image = decode_required(image_b64)?;
        let locations = self.engine.detect(image).await?;
        Ok(DetectResponse {
            faces_detected: locations.len(),
            locations,
        })
    }

    pub async fn recognize(
        &self,
        image_b64: &str,
        threshold: Option<f32>,
    ) -> Result<RecognizeResponse, ApiError> {
        let image = decode_required(image_b64)?;
        let regions = self.engine.detect(image.clone()).await?;

        let Some(region) = regions.first().copied() else {
            return Ok(RecognizeResponse::miss("no face detected", None));
        };

        // A face that refuses to encode is a recognition miss, not a
        // request failure.
        let probe = match self.engine.embed(image, region).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::warn!(error = %err, "probe encoding failed");
                return Ok(RecognizeResponse::miss("could not encode the face", None));
            }
        };

        let policy = MatchPolicy {
            kind: self.policy.kind,
            threshold: threshold.unwrap_or(self.policy.threshold),
        };
        let snapshot = self.registry.snapshot().await;
        let outcome = best_match(
            &probe,
            snapshot.iter().map(|(name, d)| (name.as_str(), d)),
            policy,
        );

        match outcome {
            MatchOutcome::Match { name, score } => {
                tracing::info!(name, score, "probe recognized");
                Ok(RecognizeResponse {
                    name: Some(name),
                    confidence: Some(policy.kind.confidence(score)),
                    score: Some(score),
                    location: Some(region),
                    message: None,
                })
            }
            MatchOutcome::NoMatch { best_score } => Ok(RecognizeResponse::miss(
                "no enrolled face within threshold",
                Some(best_score),
            )),
        }
    }

    pub async fn enroll(&self, name: &str, image_b64: &str) -> Result<EnrollResponse, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InputMissing("name"));
        }
        let image = decode_required(image_b64)?;

        let regions = self.engine.detect(image.clone()).await?;
        let region = *require_single_face(&regions)?;

        let descriptor = self.engine.embed(image, region).await.map_err(|err| {
            tracing::warn!(error = %err, name, "enrollment encoding failed");
            ApiError::Enroll(EnrollError::EncodingFailed)
        })?;

        self.registry.put(name, descriptor).await?;
        Ok(EnrollResponse {
            success: true,
            message: format!("enrolled {name}"),
            total_employees: self.registry.len().await,
        })
    }

    pub async fn employees(&self) -> EmployeesResponse {
        let employees = self.registry.list().await;
        let total = employees.len();
        EmployeesResponse { employees, total }
    }

    pub async fn remove(&self, name: &str) -> Result<DeleteResponse, ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::InputMissing("name"));
        }
        self.registry.remove(name).await?;
        Ok(DeleteResponse {
            success: true,
            remaining: self.registry.len().await,
        })
    }

    pub async fn check_in(&self, name: &str, is_auto: bool) -> Result<CheckInResponse, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InputMissing("name"));
        }
        match self.gate.check_in(name, is_auto).await? {
            CheckInOutcome::Granted => Ok(CheckInResponse {
                success: true,
                message: format!("check-in recorded for {name}"),
            }),
            CheckInOutcome::Denied { remaining_minutes } => {
                Err(ApiError::CooldownActive { remaining_minutes })
            }
        }
    }

    pub async fn reload(&self) -> Result<ReloadResponse, ApiError> {
        let total = self.registry.reload().await?;
        Ok(ReloadResponse {
            success: true,
            total,
        })
    }

    pub async fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok",
            registered_employees: self.registry.len().await,
            store_connected: self.store.ping().await.is_ok(),
        }
    }
}

fn decode_required(image_b64: &str) -> Result<image::RgbImage, ApiError> {
    if image_b64.trim().is_empty() {
        return Err(ApiError::InputMissing("image"));
    }
    Ok(codec::decode_base64_image(image_b64)?)
}
