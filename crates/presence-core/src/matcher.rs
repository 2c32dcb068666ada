//! Linear-scan nearest-match engine.
//!
//! Two score families coexist: Euclidean distance (lower is better) and
//! cosine similarity (higher is better). They are not interchangeable, so
//! the direction travels with the threshold as a [`MatchPolicy`] instead of
//! being hard-coded at call sites.

use crate::types::Descriptor;
use serde::{Deserialize, Serialize};

/// Direction of a score family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Euclidean distance: a candidate qualifies strictly below the bound.
    LowerIsBetter,
    /// Cosine similarity: a candidate qualifies strictly above the bound.
    HigherIsBetter,
}

impl ScoreKind {
    /// Score a candidate against the probe under this family.
    pub fn score(&self, probe: &Descriptor, candidate: &Descriptor) -> f32 {
        match self {
            ScoreKind::LowerIsBetter => probe.euclidean_distance(candidate),
            ScoreKind::HigherIsBetter => probe.cosine_similarity(candidate),
        }
    }

    /// Whether `score` strictly beats `bound` under this family.
    pub fn beats(&self, score: f32, bound: f32) -> bool {
        match self {
            ScoreKind::LowerIsBetter => score < bound,
            ScoreKind::HigherIsBetter => score > bound,
        }
    }

    /// Map a score to the confidence figure reported to callers:
    /// `1 - distance` for the distance family, the similarity itself for
    /// the similarity family.
    pub fn confidence(&self, score: f32) -> f32 {
        match self {
            ScoreKind::LowerIsBetter => 1.0 - score,
            ScoreKind::HigherIsBetter => score,
        }
    }
}

/// Score family plus the cutoff separating match from no-match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    pub kind: ScoreKind,
    pub threshold: f32,
}

/// Outcome of scanning a gallery with one probe. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Match { name: String, score: f32 },
    /// No candidate beat the threshold. `best_score` is the final bound —
    /// the threshold itself when nothing qualified at all — so callers can
    /// report near-miss diagnostics.
    NoMatch { best_score: f32 },
}

/// Scan the whole gallery and return the best-qualifying identity.
///
/// The bound starts at the policy threshold and tightens only on a strictly
/// better score, so among equal scores the first-enumerated candidate wins.
/// Enumeration order is whatever the caller's map yields; that
/// nondeterminism is accepted. O(n) per probe in gallery size.
pub fn best_match<'a, I>(probe: &Descriptor, gallery: I, policy: MatchPolicy) -> MatchOutcome
where
    I: IntoIterator<Item = (&'a str, &'a Descriptor)>,
{
    let mut bound = policy.threshold;
    let mut best: Option<&str> = None;

    for (name, candidate) in gallery {
        let score = policy.kind.score(probe, candidate);
        if policy.kind.beats(score, bound) {
            bound = score;
            best = Some(name);
        }
    }

    match best {
        Some(name) => MatchOutcome::Match {
            name: name.to_string(),
            score: bound,
        },
        None => MatchOutcome::NoMatch { best_score: bound },
    }
}
