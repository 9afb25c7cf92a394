/*!
 * Error types for the novelforge application.
 *
 * This module contains custom error types for the different layers of the
 * pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors returned by the external collaborators (translator, token counter, scraper)
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded (429): {0}")]
    RateLimitExceeded(String),

    /// The prompt was refused by the provider's safety filter
    #[error("Content blocked: {0}")]
    ContentBlocked(String),

    /// The provider answered without any usable text
    #[error("Empty response received from the API")]
    EmptyResponse,

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether the failure is a transient server condition worth retrying.
    ///
    /// Rate limits and server-side faults are transient. Errors that only carry
    /// text are classified by the status codes mentioned in the message.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::RequestFailed(message) | Self::ConnectionError(message) => {
                message.contains("429") || message.contains("500")
            }
            Self::ParseError(_)
            | Self::ContentBlocked(_)
            | Self::EmptyResponse
            | Self::AuthenticationError(_) => false,
        }
    }
}

/// Job-fatal conditions: the job aborts immediately through its error signal
#[derive(Error, Debug)]
pub enum JobError {
    /// Missing credentials or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An input directory could not be read when the job started
    #[error("Directory unreadable: {path}: {message}")]
    DirectoryUnreadable {
        /// Directory that failed to list
        path: String,
        /// Underlying error text
        message: String,
    },

    /// The caller selected nothing to work on
    #[error("No input: {0}")]
    NoInput(String),

    /// A collaborator failed in a way that stops the whole job
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}
