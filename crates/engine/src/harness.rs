//! Test harness: runs each script as one named test and records the outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::config::EngineConfig;
use crate::driver::Driver;
use crate::error::{DriverResult, HarnessError};
use crate::interpreter::Interpreter;

/// Extension of script files picked up by discovery
pub const SCRIPT_EXTENSION: &str = "ui";

/// Result of running a single script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub path: PathBuf,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Result of running all registered scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// A script registered under a test name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTest {
    pub name: String,
    pub path: PathBuf,
}

/// Runs registered scripts, each with a fresh interpreter and driver
pub struct TestHarness<F> {
    config: EngineConfig,
    factory: F,
    tests: Vec<RegisteredTest>,
    output_dir: PathBuf,
}

impl<D, F> TestHarness<F>
where
    D: Driver,
    F: Fn() -> DriverResult<D>,
{
    pub fn new(config: EngineConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            tests: Vec::new(),
            output_dir: PathBuf::from("test-results"),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn register(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.tests.push(RegisteredTest {
            name: name.into(),
            path: path.into(),
        });
    }

    pub fn tests(&self) -> &[RegisteredTest] {
        &self.tests
    }

    /// Register a script file, or every `*.ui` script under a directory.
    /// Returns the number of scripts added.
    pub fn discover(&mut self, path: &Path) -> Result<usize, HarnessError> {
        if path.is_file() {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            self.register(name, path);
            return Ok(1);
        }
        if !path.is_dir() {
            return Err(HarnessError::NotFound(path.to_path_buf()));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|source| HarnessError::Walk {
                path: path.to_path_buf(),
                source,
            })?;
            let file = entry.path();
            if !entry.file_type().is_file()
                || file.extension().map(|e| e != SCRIPT_EXTENSION).unwrap_or(true)
            {
                continue;
            }
            let name = file
                .strip_prefix(path)
                .unwrap_or(file)
                .with_extension("")
                .to_string_lossy()
                .into_owned();
            found.push(RegisteredTest {
                name,
                path: file.to_path_buf(),
            });
        }

        debug!("Discovered {} script(s) in {}", found.len(), path.display());
        let count = found.len();
        self.tests.extend(found);
        Ok(count)
    }

    /// Run one script as a test
    pub async fn run_test(&self, test: &RegisteredTest) -> TestResult {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running test: {}", test.name);

        let error = match (self.factory)() {
            Ok(driver) => {
                let mut interpreter = Interpreter::new(driver, self.config.clone());
                interpreter
                    .run_script(&test.path)
                    .await
                    .err()
                    .map(|failure| failure.diagnostic())
            }
            Err(e) => Some(format!("Failed to create driver: {}", e)),
        };

        TestResult {
            name: test.name.clone(),
            path: test.path.clone(),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            error,
            started_at,
        }
    }

    /// Run every registered script in order
    pub async fn run_all(&self) -> TestSuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(self.tests.len());
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} test(s)...", self.tests.len());

        for test in &self.tests {
            let result = self.run_test(test).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        TestSuiteResult {
            total: self.tests.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Write results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &TestSuiteResult) -> Result<PathBuf, HarnessError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
