//! uiscript engine
//!
//! Interpreter core for a small language of browser interactions and
//! assertions:
//! - A configurable scanner turns script text into typed tokens
//! - Token sources replay captured alias and loop bodies with parameter
//!   substitution
//! - The interpreter runs statements against a [`Driver`], retrying
//!   assertions under one shared wait budget
//! - A WebDriver-backed driver and a test harness complete the stack
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TestHarness                            │
//! │    ├── discover(dir) -> [*.ui]                              │
//! │    └── run_test(script) -> TestResult                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Interpreter<D: Driver>                                     │
//! │    ├── Scanner ─> TokenSource (ScannerSource|ReplaySource)  │
//! │    ├── StatementParser -> Statement                         │
//! │    ├── FrameStack, ConditionStack, AliasTable               │
//! │    └── WaitBudget ─> retry loop                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver (async trait)                                       │
//! │    └── WebDriver ─> DriverProcess (chromedriver)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod alias;
pub mod condition;
pub mod config;
pub mod driver;
pub mod error;
pub mod exec;
pub mod frame;
pub mod geometry;
pub mod harness;
pub mod interpreter;
pub mod launcher;
pub mod lexer;
pub mod source;
pub mod statement;
pub mod substitute;
pub mod token;
pub mod wait;
pub mod webdriver;

pub use config::{BrowserConfig, EngineConfig, LexerConfig};
pub use driver::{BrowserOptions, Driver, Key, Locator, LocatorKind, MouseStep, Rect};
pub use error::{DriverError, DriverResult, Failure, HarnessError, ScriptError, ScriptResult};
pub use harness::{TestHarness, TestResult, TestSuiteResult};
pub use interpreter::Interpreter;
pub use lexer::{tokenize, Scanner};
pub use token::{Token, TokenKind};
pub use webdriver::WebDriver;

/// Engine version reported by the `version` statement
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
