//! presence-core — descriptor matching and enrollment invariants.
//!
//! Holds the pieces of the attendance service that carry real invariants:
//! the score-family policy, the linear-scan match engine, and the
//! single-subject enrollment guard. The face model itself is opaque,
//! reached through the [`FaceAnalyzer`] seam.

pub mod analyzer;
pub mod codec;
pub mod enroll;
pub mod matcher;
pub mod types;

pub use analyzer::{AnalyzerError, FaceAnalyzer};
pub use matcher::{best_match, MatchOutcome, MatchPolicy, ScoreKind};
pub use types::{Descriptor, FaceRegion};
