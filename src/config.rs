use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";
pub const DEFAULT_TARGET_LANGUAGE: &str = "tr";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_RECORD_DURATION_SECS: u32 = 10;

/// Allowed relative deviation between the dubbed audio duration and the
/// source video duration before the merge is refused.
pub const DEFAULT_DURATION_TOLERANCE: f64 = 0.5;

/// Per-job configuration passed into the pipeline at construction.
///
/// Kept explicit (rather than process-wide state) so several jobs can run
/// in one process with different settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// API key used for transcription and translation.
    pub openai_api_key: String,
    pub duration_tolerance: f64,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            openai_api_key: String::new(),
            duration_tolerance: DEFAULT_DURATION_TOLERANCE,
        }
    }
}

impl JobConfig {
    /// Build a configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        JobConfig {
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            ..JobConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = JobConfig::default();
        assert!(config.openai_api_key.is_empty());
        assert_eq!(config.duration_tolerance, DEFAULT_DURATION_TOLERANCE);
    }
}
