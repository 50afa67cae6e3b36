use crate::error::{Result, RetrievalError};
use context_protocol::DEFAULT_ASSISTANT_RESPONSE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_SEARCH_TIMEOUT_MS: u64 = 300_000;
const MAX_FRAGMENT_TOKENS: usize = 100_000;

/// Budgets for context assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Files larger than this are skipped outright (hard cap)
    pub max_file_bytes: u64,

    /// Token budget each fragment's text is truncated to
    pub max_fragment_tokens: usize,

    /// Maximum fragment pairs emitted by a directory scan
    pub max_directory_fragments: usize,

    /// Maximum fragment pairs taken from a codebase-wide test search
    pub max_test_results: usize,

    /// Deadline for every workspace pattern search
    pub search_timeout_ms: u64,

    /// Acknowledgement paired with each fragment
    pub assistant_response: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_000_000,
            max_fragment_tokens: 1_000,
            max_directory_fragments: 10,
            max_test_results: 5,
            search_timeout_ms: 20_000,
            assistant_response: DEFAULT_ASSISTANT_RESPONSE.to_string(),
        }
    }
}

impl AssemblerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| RetrievalError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CONTEXT_SEARCH_TIMEOUT_MS` / `CONTEXT_MAX_FRAGMENT_TOKENS`.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        let timeout = std::env::var("CONTEXT_SEARCH_TIMEOUT_MS").ok();
        self.search_timeout_ms = parse_clamped(
            timeout.as_deref(),
            self.search_timeout_ms,
            1,
            MAX_SEARCH_TIMEOUT_MS,
        );
        let tokens = std::env::var("CONTEXT_MAX_FRAGMENT_TOKENS").ok();
        self.max_fragment_tokens = parse_clamped(
            tokens.as_deref(),
            self.max_fragment_tokens,
            1,
            MAX_FRAGMENT_TOKENS,
        );
        self
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_file_bytes == 0 {
            return Err(RetrievalError::invalid_config("max_file_bytes must be > 0"));
        }
        if self.max_fragment_tokens == 0 {
            return Err(RetrievalError::invalid_config(
                "max_fragment_tokens must be > 0",
            ));
        }
        if self.max_test_results == 0 {
            return Err(RetrievalError::invalid_config("max_test_results must be > 0"));
        }
        if self.search_timeout_ms == 0 {
            return Err(RetrievalError::invalid_config(
                "search_timeout_ms must be > 0",
            ));
        }
        Ok(())
    }
}

fn parse_clamped<T>(raw: Option<&str>, default_value: T, min: T, max: T) -> T
where
    T: std::str::FromStr + Ord,
{
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<T>().ok())
        .map(|v| v.clamp(min, max))
        .unwrap_or(default_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        let config = AssemblerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search_timeout(), Duration::from_secs(20));
        assert_eq!(config.max_test_results, 5);
    }

    #[test]
    fn toml_overrides_only_named_fields() {
        let config = AssemblerConfig::from_toml_str("max_directory_fragments = 3\n").unwrap();
        assert_eq!(config.max_directory_fragments, 3);
        assert_eq!(config.max_file_bytes, 1_000_000);
    }

    #[test]
    fn toml_rejects_zero_budgets() {
        assert!(AssemblerConfig::from_toml_str("max_fragment_tokens = 0\n").is_err());
        assert!(AssemblerConfig::from_toml_str("search_timeout_ms = \"soon\"\n").is_err());
    }

    #[test]
    fn parse_clamped_defaults_and_clamps() {
        assert_eq!(parse_clamped::<u64>(None, 7, 1, 10), 7);
        assert_eq!(parse_clamped::<u64>(Some("   "), 7, 1, 10), 7);
        assert_eq!(parse_clamped::<u64>(Some("abc"), 7, 1, 10), 7);
        assert_eq!(parse_clamped::<u64>(Some(" 5 "), 7, 1, 10), 5);
        assert_eq!(parse_clamped::<u64>(Some("0"), 7, 1, 10), 1);
        assert_eq!(parse_clamped::<u64>(Some("999"), 7, 1, 10), 10);
    }
}
