//! Buildwise configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Buildwise configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Context budget for one model call
    pub context: ContextConfig,

    /// Change-notice debounce
    pub trigger: TriggerConfig,

    /// System-initiated turn queue
    pub router: RouterConfig,

    /// Generator retry policy
    pub retry: RetryConfig,

    /// Goal confidence table and auto-apply threshold
    pub confidence: ConfidenceConfig,

    /// Rule thresholds
    pub detection: DetectionConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before issuing model calls
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.context.reserved_tokens >= self.context.ceiling_tokens {
            return Err(eyre::eyre!(
                "context.reserved-tokens ({}) must be below context.ceiling-tokens ({})",
                self.context.reserved_tokens,
                self.context.ceiling_tokens
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .buildwise.yml
        let local_config = PathBuf::from(".buildwise.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/buildwise/buildwise.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("buildwise").join("buildwise.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 1024,
            timeout_ms: 30_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} not set", self.api_key_env))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Token budget for the assembled context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Hard ceiling in token-equivalents; estimates stay strictly below it
    #[serde(rename = "ceiling-tokens")]
    pub ceiling_tokens: usize,

    /// Floor reserved for behavior profile and plan metadata
    #[serde(rename = "reserved-tokens")]
    pub reserved_tokens: usize,

    /// Characters per token-equivalent
    #[serde(rename = "chars-per-token")]
    pub chars_per_token: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            ceiling_tokens: 4000,
            reserved_tokens: 500,
            chars_per_token: 4,
        }
    }
}

/// Change-notice debounce configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Quiet period before a flush
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: u64,

    /// Cap on notices delivered from a multi-notice batch
    #[serde(rename = "max-delivered")]
    pub max_delivered: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 800,
            max_delivered: 2,
        }
    }
}

impl TriggerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Auto-turn queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: u64,

    #[serde(rename = "dedupe-window-secs")]
    pub dedupe_window_secs: u64,

    /// Minimum spacing between two delivered auto-turns
    #[serde(rename = "min-spacing-secs")]
    pub min_spacing_secs: u64,

    /// Auto-turns allowed per chapter
    #[serde(rename = "per-chapter-cap")]
    pub per_chapter_cap: u32,

    /// Inactivity before an idle event
    #[serde(rename = "idle-timeout-secs")]
    pub idle_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 750,
            dedupe_window_secs: 30,
            min_spacing_secs: 10,
            per_chapter_cap: 3,
            idle_timeout_secs: 30,
        }
    }
}

impl RouterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn dedupe_window(&self) -> Duration {
        Duration::from_secs(self.dedupe_window_secs)
    }

    pub fn min_spacing(&self) -> Duration {
        Duration::from_secs(self.min_spacing_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Retry policy for the generator/validator loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(rename = "max-retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 2 }
    }
}

/// Confidence assigned per goal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConfidenceConfig {
    pub blocking: f64,
    pub warning: f64,
    pub anticipation: f64,
    pub fill_data: f64,
    pub fill_data_without_patches: f64,
    pub clarify: f64,
    pub alternatives: f64,
    pub unknown: f64,
    /// Patches auto-apply only strictly above this
    pub auto_apply_threshold: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            blocking: 0.96,
            warning: 0.95,
            anticipation: 0.85,
            fill_data: 0.75,
            fill_data_without_patches: 0.70,
            clarify: 0.65,
            alternatives: 0.65,
            unknown: 0.6,
            auto_apply_threshold: 0.95,
        }
    }
}

/// Rule thresholds for detectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetectionConfig {
    /// Recursion bound for the structural diff
    pub max_diff_depth: usize,

    /// Relative budget change that counts as an edit
    pub budget_change_ratio: f64,

    /// Absolute budget change (EUR) that counts as an edit
    pub budget_change_abs: f64,

    /// All-wishes cost over budget factor for the ambition warning
    pub ambition_factor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_diff_depth: 5,
            budget_change_ratio: 0.05,
            budget_change_abs: 5000.0,
            ambition_factor: 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.context.ceiling_tokens, 4000);
        assert_eq!(config.context.reserved_tokens, 500);
        assert_eq!(config.trigger.debounce_ms, 800);
        assert_eq!(config.router.min_spacing_secs, 10);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.confidence.auto_apply_threshold, 0.95);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: anthropic
  model: claude-haiku
  api-key-env: MY_API_KEY
  max-tokens: 512

context:
  ceiling-tokens: 3000

router:
  per-chapter-cap: 5

confidence:
  fill-data: 0.8

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "claude-haiku");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 512);
        assert_eq!(config.context.ceiling_tokens, 3000);
        assert_eq!(config.context.reserved_tokens, 500);
        assert_eq!(config.router.per_chapter_cap, 5);
        assert_eq!(config.router.debounce_ms, 750);
        assert_eq!(config.confidence.fill_data, 0.8);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bw.yml");
        fs::write(&path, "trigger:\n  debounce-ms: 100\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.trigger.debounce(), Duration::from_millis(100));
        assert_eq!(config.trigger.max_delivered, 2);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/buildwise.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_validate_rejects_reserved_over_ceiling() {
        let mut config = Config::default();
        config.llm.api_key_env = "PATH".to_string();
        config.context.reserved_tokens = 5000;
        assert!(config.validate().is_err());
    }
}
