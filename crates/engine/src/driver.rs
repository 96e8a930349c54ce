//! The automation capability the interpreter drives
//!
//! A [`Driver`] performs browser actions and answers element queries. It does
//! not retry; the interpreter owns the wait budget and decides what a query
//! result means for an assertion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::DriverResult;

/// How an element is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorKind {
    Css,
    XPath,
    TestId,
    Field,
}

impl LocatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::Css => "select",
            LocatorKind::XPath => "xpath",
            LocatorKind::TestId => "test-id",
            LocatorKind::Field => "field",
        }
    }
}

/// A selector for the current element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub kind: LocatorKind,
    pub value: String,
}

impl Locator {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.kind.as_str(), self.value)
    }
}

/// Element geometry in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A single key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Space,
    Escape,
    Backspace,
    /// A character by code point
    Code(u32),
}

impl Key {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "enter" | "return" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "space" => Some(Key::Space),
            "escape" | "esc" => Some(Key::Escape),
            "backspace" => Some(Key::Backspace),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some(Key::Code(ch as u32)),
                    _ => None,
                }
            }
        }
    }
}

/// One step of a `mouse { ... }` gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseStep {
    /// Reference point is the page origin
    Body,
    /// Reference point is the current element's top-left corner
    Origin,
    /// Reference point is the current element's centre
    Center,
    /// Move by an offset from the current pointer position
    Move { dx: f64, dy: f64 },
    Down,
    Up,
    Click,
    Sleep(f64),
}

/// Launch options collected from `browser ...` statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserOptions {
    pub width: u32,
    pub height: u32,
    pub chrome_width: u32,
    pub chrome_height: u32,
    pub headless: bool,
    pub args: Vec<String>,
    /// Chrome preferences from `browser prefs`
    pub prefs: BTreeMap<String, String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            chrome_width: 0,
            chrome_height: 0,
            headless: false,
            args: Vec::new(),
            prefs: BTreeMap::new(),
        }
    }
}

/// Browser automation primitives
#[async_trait]
pub trait Driver: Send {
    /// Launch a browser
    async fn start(&mut self, options: &BrowserOptions) -> DriverResult<()>;

    /// Attach to an already running automation endpoint
    async fn connect(&mut self, endpoint: &str, options: &BrowserOptions) -> DriverResult<()>;

    async fn get(&mut self, url: &str) -> DriverResult<()>;

    async fn close(&mut self) -> DriverResult<()>;

    /// Resize the viewport of a live browser
    async fn viewport(&mut self, options: &BrowserOptions) -> DriverResult<()>;

    async fn back(&mut self) -> DriverResult<()>;

    async fn forward(&mut self) -> DriverResult<()>;

    async fn refresh(&mut self) -> DriverResult<()>;

    async fn set_page_load_timeout(&mut self, seconds: f64) -> DriverResult<()>;

    /// Type into whatever element has focus
    async fn send_to_page(&mut self, text: &str) -> DriverResult<()>;

    /// Locate an element and make it current. Fails with `NoSuchElement`
    /// when nothing matches right now.
    async fn locate(&mut self, locator: &Locator) -> DriverResult<()>;

    /// Forget the current element
    fn clear_current(&mut self);

    /// Text of the current element; the value for form fields
    async fn text(&mut self) -> DriverResult<String>;

    async fn tag_name(&mut self) -> DriverResult<String>;

    async fn rect(&mut self) -> DriverResult<Rect>;

    async fn is_displayed(&mut self) -> DriverResult<bool>;

    async fn is_enabled(&mut self) -> DriverResult<bool>;

    async fn is_selected(&mut self) -> DriverResult<bool>;

    /// CRC-32 of the current element's rendered image
    async fn checksum(&mut self) -> DriverResult<u32>;

    async fn click(&mut self) -> DriverResult<()>;

    async fn send(&mut self, text: &str) -> DriverResult<()>;

    async fn clear(&mut self) -> DriverResult<()>;

    async fn press(&mut self, key: Key) -> DriverResult<()>;

    async fn scroll_into_view(&mut self) -> DriverResult<()>;

    async fn mouse(&mut self, steps: &[MouseStep]) -> DriverResult<()>;

    async fn screenshot(&mut self, path: &Path) -> DriverResult<()>;

    /// Serialized page markup
    async fn page_source(&mut self) -> DriverResult<String>;

    /// `document.readyState`
    async fn ready_state(&mut self) -> DriverResult<String>;

    /// Invoke an in-page test hook
    async fn call(
        &mut self,
        name: &str,
        args: Vec<serde_json::Value>,
    ) -> DriverResult<serde_json::Value>;

    /// Drain console messages captured since the last call
    async fn console_messages(&mut self) -> DriverResult<Vec<String>>;
}
