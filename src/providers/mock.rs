/*!
 * Mock collaborator implementations for testing.
 *
 * - `MockTranslator::working()` - Always succeeds with translated text
 * - `MockTranslator::transient_failures(n)` - Fails `n` times with a rate limit, then succeeds
 * - `MockTranslator::failing()` - Always fails with a transient error
 * - `MockTranslator::blocked()` - Always fails with a permanent error
 * - `MockTokenCounter` - Counts whitespace-separated words
 * - `MockScraper` - Serves a fixed chain of pages
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{ScrapedPage, Scraper, TokenCounter, Translator};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails the first `failures` calls with a transient error, then succeeds
    TransientFailures { failures: usize },
    /// Always fails with a rate limit
    Failing,
    /// Always fails with a blocked-content error
    Blocked,
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// Mock translator counting its calls
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn transient_failures(failures: usize) -> Self {
        Self::new(MockBehavior::TransientFailures { failures })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn blocked() -> Self {
        Self::new(MockBehavior::Blocked)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Number of `translate` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Mock output for a prompt: the chapter text after the prompt prefix, tagged
    pub fn render(prompt: &str) -> String {
        let text = prompt.split_once("\n\n").map(|(_, text)| text).unwrap_or(prompt);
        format!("[TRANSLATED] {}", text)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, prompt: &str) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.behavior {
            MockBehavior::Working => Ok(Self::render(prompt)),
            MockBehavior::TransientFailures { failures } if call <= failures => {
                Err(ProviderError::RateLimitExceeded("quota exhausted".to_string()))
            }
            MockBehavior::TransientFailures { .. } => Ok(Self::render(prompt)),
            MockBehavior::Failing => Err(ProviderError::RateLimitExceeded("quota exhausted".to_string())),
            MockBehavior::Blocked => Err(ProviderError::ContentBlocked("SAFETY".to_string())),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Self::render(prompt))
            }
        }
    }
}

/// Word-counting token counter; texts containing `fail_marker` fail
#[derive(Debug, Clone, Default)]
pub struct MockTokenCounter {
    calls: Arc<AtomicUsize>,
    fail_marker: Option<String>,
}

impl MockTokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCounter for MockTokenCounter {
    async fn count_tokens(&self, text: &str) -> Result<u64, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(ProviderError::ApiError {
                    status_code: 400,
                    message: "cannot count".to_string(),
                });
            }
        }
        Ok(text.split_whitespace().count() as u64)
    }
}

/// Scraper serving pages from a map of URL to page
#[derive(Debug, Clone, Default)]
pub struct MockScraper {
    pages: HashMap<String, ScrapedPage>,
    calls: Arc<AtomicUsize>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, text: &str, next_url: Option<&str>) -> Self {
        self.pages.insert(
            url.to_string(),
            ScrapedPage {
                text: text.to_string(),
                next_url: next_url.map(str::to_string),
            },
        );
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch(&self, url: &str) -> Result<ScrapedPage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.get(url).cloned().ok_or_else(|| ProviderError::ApiError {
            status_code: 404,
            message: format!("Page not found: {}", url),
        })
    }
}
