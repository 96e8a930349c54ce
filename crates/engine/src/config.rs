//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wait budget armed at the start of every run, in seconds
    pub default_wait_secs: f64,

    /// Multiplier applied to every `wait N`
    pub wait_scale: f64,

    /// Seconds added to every `wait N` after scaling
    pub wait_offset_secs: f64,

    /// Pause between failed assertion attempts
    pub retry_interval_ms: u64,

    /// Directory for screenshots with relative paths
    pub screenshot_dir: Option<PathBuf>,

    /// Scanner character classes
    pub lexer: LexerConfig,

    /// Browser / WebDriver settings
    pub browser: BrowserConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_wait_secs: 30.0,
            wait_scale: 1.0,
            wait_offset_secs: 0.0,
            retry_interval_ms: 100,
            screenshot_dir: None,
            lexer: LexerConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Effective budget for `wait N`
    pub fn scaled_wait(&self, seconds: f64) -> Duration {
        crate::wait::seconds(seconds * self.wait_scale + self.wait_offset_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Character classes for the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerConfig {
    /// Characters that open and close a quoted string
    pub quote_chars: String,

    /// Word characters in addition to ASCII letters and digits
    pub word_chars: String,

    /// Characters skipped between tokens
    pub whitespace: String,

    pub slash_slash_comments: bool,

    pub slash_star_comments: bool,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            quote_chars: "\"'".to_string(),
            word_chars: "$#_-".to_string(),
            whitespace: " \t\r\n".to_string(),
            slash_slash_comments: true,
            slash_star_comments: true,
        }
    }
}

/// Browser launch and WebDriver connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Existing WebDriver endpoint; when unset a driver process is launched
    pub webdriver_url: Option<String>,

    /// WebDriver server binary to launch
    pub driver_binary: PathBuf,

    /// Port for the launched driver (None = find free port)
    pub driver_port: Option<u16>,

    pub headless: bool,

    pub width: u32,

    pub height: u32,

    /// Window decoration added to the viewport when sizing the window
    pub chrome_width: u32,

    pub chrome_height: u32,

    /// Extra browser command-line flags
    pub args: Vec<String>,

    pub startup_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            driver_binary: PathBuf::from("chromedriver"),
            driver_port: None,
            headless: false,
            width: 1280,
            height: 720,
            chrome_width: 0,
            chrome_height: 0,
            args: Vec::new(),
            startup_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            retry_interval_ms = 1000
            [browser]
            headless = true
            "#,
        )
        .unwrap();
        assert_eq!(config.retry_interval_ms, 1000);
        assert!(config.browser.headless);
        assert_eq!(config.default_wait_secs, 30.0);
        assert_eq!(config.lexer.quote_chars, "\"'");
    }

    #[test]
    fn test_scaled_wait() {
        let config = EngineConfig {
            wait_scale: 2.0,
            wait_offset_secs: 0.5,
            ..Default::default()
        };
        assert_eq!(config.scaled_wait(5.0), Duration::from_millis(10_500));
        assert_eq!(config.scaled_wait(-10.0), Duration::ZERO);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = EngineConfig::load(Path::new("/nonexistent/uiscript.toml")).unwrap();
        assert_eq!(config.retry_interval_ms, 100);
    }
}
