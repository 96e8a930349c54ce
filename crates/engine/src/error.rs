//! Error types for script execution

use std::fmt;
use thiserror::Error;

use crate::token::Token;

/// Failures reported by a [`Driver`](crate::driver::Driver)
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("No element selected")]
    NoCurrentElement,

    #[error("Browser not started")]
    NotStarted,

    #[error("WebDriver error {status} ({error}): {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Failed to launch driver: {0}")]
    Launch(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl DriverError {
    /// Whether the UI might still converge so that a retry can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::NoSuchElement(_) | DriverError::NoCurrentElement)
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// The kinds of failure a statement can raise
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Subprocess failed: {command} exited with status {status}")]
    Subprocess { command: String, status: i32 },

    #[error("Failed: {0}")]
    Explicit(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Failures of the test harness itself, outside any script
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to scan {path}: {source}")]
    Walk {
        path: std::path::PathBuf,
        source: walkdir::Error,
    },

    #[error("Not a script file or directory: {0}")]
    NotFound(std::path::PathBuf),
}

/// One level of the frame stack at the time of a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub frame: String,
    pub line: u32,
    pub caller_line: Option<u32>,
}

/// A script failure annotated with the offending token and frame trace
#[derive(Debug)]
pub struct Failure {
    pub error: ScriptError,

    /// Text of the offending token
    pub token: Option<String>,

    /// Line of the offending token within its frame
    pub line: Option<u32>,

    /// Frame stack, innermost first; filled in at the innermost frame
    pub trace: Vec<TraceEntry>,
}

pub type ScriptResult<T> = Result<T, Failure>;

impl Failure {
    pub fn new(error: ScriptError) -> Self {
        Self {
            error,
            token: None,
            line: None,
            trace: Vec::new(),
        }
    }

    pub fn at(error: ScriptError, token: &Token) -> Self {
        Self::new(error).with_token(token)
    }

    pub fn syntax(message: impl Into<String>, token: &Token) -> Self {
        Self::at(ScriptError::Syntax(message.into()), token)
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(ScriptError::Assertion(message.into()))
    }

    /// Attach the offending token unless one is already recorded
    pub fn with_token(mut self, token: &Token) -> Self {
        if self.token.is_none() {
            self.token = Some(token.to_string());
            self.line = Some(token.line);
        }
        self
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self.error, ScriptError::Syntax(_))
    }

    /// Failures that the wait budget retries
    pub fn is_retryable(&self) -> bool {
        match &self.error {
            ScriptError::Assertion(_) => true,
            ScriptError::Driver(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Failures that a conditional predicate turns into `false`
    pub fn is_predicate(&self) -> bool {
        self.is_retryable()
            || matches!(
                self.error,
                ScriptError::Timeout(_) | ScriptError::Subprocess { .. }
            )
    }

    /// Failures that end a `while` block normally
    pub fn ends_loop(&self) -> bool {
        !self.is_syntax()
    }

    /// Multi-line diagnostic with the frame trace
    pub fn diagnostic(&self) -> String {
        let mut out = self.error.to_string();
        match (&self.token, self.line) {
            (Some(token), Some(line)) => out.push_str(&format!(" at '{}' line {}", token, line)),
            (None, Some(line)) => out.push_str(&format!(" at line {}", line)),
            _ => {}
        }
        for entry in &self.trace {
            out.push_str(&format!("\n    in {} line {}", entry.frame, entry.line));
            if let Some(caller) = entry.caller_line {
                out.push_str(&format!(" (called from line {})", caller));
            }
        }
        out
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic())
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ScriptError> for Failure {
    fn from(error: ScriptError) -> Self {
        Failure::new(error)
    }
}

impl From<DriverError> for Failure {
    fn from(error: DriverError) -> Self {
        Failure::new(ScriptError::Driver(error))
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Failure::new(ScriptError::Io(error))
    }
}
