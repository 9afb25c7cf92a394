use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Translation job config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Chapter word and placeholder used by the clean and chapter-check jobs
    #[serde(default)]
    pub text_rules: TextRules,

    /// Download job config
    #[serde(default)]
    pub download: DownloadConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching log crate filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Generative API and retry settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Text placed before every chapter in the prompt
    #[serde(default = "default_prompt_prefix")]
    pub prompt_prefix: String,

    // @field: Stop after this many newly translated units
    #[serde(default)]
    pub file_limit: Option<usize>,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Total call attempts per unit
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    // @field: Backoff is backoff_unit_ms * 2^attempt
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    // @field: Longest uninterrupted sleep slice
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl TranslationConfig {
    /// Retry settings for the translation job
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            endpoint: default_endpoint(),
            prompt_prefix: default_prompt_prefix(),
            file_limit: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first call included
    pub max_attempts: u32,
    /// Multiplied by 2^attempt for each wait
    pub backoff_unit: Duration,
    /// Cancellation and pause are checked at least this often while waiting
    pub poll_interval: Duration,
}

impl RetryPolicy {
    /// Wait before the given retry (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.backoff_unit.saturating_mul(1u32 << retry.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        TranslationConfig::default().retry_policy()
    }
}

/// Localized text used by the transform jobs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TextRules {
    /// Localized word for "chapter"
    #[serde(default = "default_chapter_word")]
    pub chapter_word: String,

    /// Heading inserted into chapters that have none
    #[serde(default = "default_placeholder_heading")]
    pub placeholder_heading: String,
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            chapter_word: default_chapter_word(),
            placeholder_heading: default_placeholder_heading(),
        }
    }
}

/// Download job settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadConfig {
    /// Pause between two page requests
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Maximum number of pages per run
    #[serde(default)]
    pub max_pages: Option<usize>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            max_pages: None,
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_prompt_prefix() -> String {
    "Translate the following chapter into English. Keep paragraph breaks and return only the translation.".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_chapter_word() -> String {
    "Chapter".to_string()
}

fn default_placeholder_heading() -> String {
    "Untitled Chapter".to_string()
}

fn default_throttle_ms() -> u64 {
    1000
}

impl Config {
    /// Load the configuration, writing a default file when none exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Check the values every job relies on
    pub fn validate(&self) -> Result<()> {
        if self.translation.max_attempts == 0 {
            return Err(anyhow!("translation.max_attempts must be at least 1"));
        }
        if self.translation.poll_interval_ms == 0 || self.translation.poll_interval_ms > 500 {
            return Err(anyhow!("translation.poll_interval_ms must be between 1 and 500"));
        }
        if self.text_rules.chapter_word.trim().is_empty() {
            return Err(anyhow!("text_rules.chapter_word must not be empty"));
        }
        Ok(())
    }

    /// Validation for jobs that call the generative API
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.translation.api_key.trim();
        if key.is_empty() {
            return Err(anyhow!("Translation API key is not configured"));
        }
        Ok(key)
    }
}
