use presence_core::ScoreKind;
use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Score family used for matching.
    pub score_kind: ScoreKind,
    /// Default match threshold when a request carries none.
    pub match_threshold: f32,
    /// Page cap for registry reloads. Bounds cache memory; it is not a
    /// correctness guarantee.
    pub reload_limit: usize,
}

impl Config {
    /// Load configuration from `PRESENCE_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("presence");

        let db_path = std::env::var("PRESENCE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("presence.db"));

        let model_dir = std::env::var("PRESENCE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/usr/share/presence/models"));

        Self {
            db_path,
            model_dir,
            score_kind: std::env::var("PRESENCE_SCORE_KIND")
                .ok()
                .and_then(|v| parse_score_kind(&v))
                .unwrap_or(ScoreKind::LowerIsBetter),
            match_threshold: env_f32("PRESENCE_MATCH_THRESHOLD", 0.6),
            reload_limit: env_usize("PRESENCE_RELOAD_LIMIT", 10_000),
        }
    }
}

fn parse_score_kind(value: &str) -> Option<ScoreKind> {
    match value.to_ascii_lowercase().as_str() {
        "distance" => Some(ScoreKind::LowerIsBetter),
        "similarity" => Some(ScoreKind::HigherIsBetter),
        _ => None,
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_kind() {
        assert_eq!(parse_score_kind("distance"), Some(ScoreKind::LowerIsBetter));
        assert_eq!(
            parse_score_kind("Similarity"),
            Some(ScoreKind::HigherIsBetter)
        );
        assert_eq!(parse_score_kind("euclidean"), None);
    }
}
