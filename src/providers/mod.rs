/*!
 * External collaborators used by the pipeline jobs.
 *
 * The jobs only depend on these traits:
 * - `Translator`: generative translation of one prompt
 * - `TokenCounter`: token count of a text
 * - `Scraper`: fetch one page of text plus the link to the next page
 *
 * `gemini` is the HTTP implementation of the first two; `mock` provides
 * scripted implementations for tests.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Generative translation service
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Send `prompt` and return the generated text
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - Generated text, or an error that the
    ///   caller classifies with [`ProviderError::is_transient`]
    async fn translate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Token counting service
#[async_trait]
pub trait TokenCounter: Send + Sync + Debug {
    async fn count_tokens(&self, text: &str) -> Result<u64, ProviderError>;
}

/// One page returned by a scraper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    /// Plain text of the chapter
    pub text: String,
    /// Link to the following page, absolute or relative to the fetched URL
    pub next_url: Option<String>,
}

/// Page source for the download job
#[async_trait]
pub trait Scraper: Send + Sync + Debug {
    async fn fetch(&self, url: &str) -> Result<ScrapedPage, ProviderError>;
}

pub mod gemini;
pub mod mock;
