/*!
 * # novelforge
 *
 * Pipeline engine for translating serialized web fiction: chapters are
 * downloaded into `raw/`, translated by a generative API into `translated/`,
 * cleaned, checked for chapter headings and merged into `archive/`.
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `project`: Fixed on-disk layout of a project
 * - `file_utils`: File system operations and natural ordering
 * - `ledger`: Per-stage error ledgers
 * - `token_cache`: Token counts fingerprinted by modification time
 * - `reconcile`: Unified per-unit view over the stage directories
 * - `transform`: Chapter marker and heading rules
 * - `jobs`: Cancelable, pausable background jobs:
 *   - `jobs::translate`: Translation with bounded exponential backoff
 *   - `jobs::clean`: Front-matter removal
 *   - `jobs::chapter_check`: Heading check and placeholder headings
 *   - `jobs::merge`: Concatenation into the archive
 *   - `jobs::download`: Page chain download
 *   - `jobs::token_sweep`: Token counting over every stage
 * - `providers`: External collaborators (Gemini client, mocks)
 * - `app_controller`: Orchestration surface over one project
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod jobs;
pub mod ledger;
pub mod project;
pub mod providers;
pub mod reconcile;
pub mod token_cache;
pub mod transform;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, JobOutcome};
pub use errors::{JobError, ProviderError};
pub use jobs::{FinishState, JobEvent, JobKind, JobReport};
pub use project::ProjectLayout;
pub use reconcile::{ContentUnit, UnitStatus, reconcile};
