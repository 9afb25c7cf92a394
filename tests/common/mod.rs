/*!
 * Common test utilities for the novelforge test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use novelforge::app_config::Config;
use novelforge::project::ProjectLayout;
use novelforge::providers::mock::{MockTokenCounter, MockTranslator};
use novelforge::Controller;

/// Route `log` output through the test harness; repeated calls are no-ops
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates an initialized project with the given raw units
pub fn create_project(units: &[(&str, &str)]) -> Result<(TempDir, ProjectLayout)> {
    init_logging();
    let temp_dir = create_temp_dir()?;
    let layout = ProjectLayout::new(temp_dir.path());
    layout.init()?;
    for (name, content) in units {
        create_test_file(&layout.raw_dir(), name, content)?;
    }
    Ok((temp_dir, layout))
}

/// Default configuration with millisecond backoff so retry tests stay fast
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.translation.backoff_unit_ms = 1;
    config.translation.poll_interval_ms = 1;
    config.download.throttle_ms = 1;
    config
}

/// Controller over `layout` wired to the given mocks
pub fn mock_controller(layout: &ProjectLayout, translator: &MockTranslator, counter: &MockTokenCounter) -> Controller {
    Controller::new(layout.clone(), fast_config())
        .with_translator(Arc::new(translator.clone()))
        .with_token_counter(Arc::new(counter.clone()))
}

/// Read a file to a string, panicking with the path on failure
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {:?}: {}", path, e))
}
