//! In-memory driver with programmable responses
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;

use uiscript_engine::{
    BrowserOptions, Driver, DriverError, DriverResult, EngineConfig, Interpreter, Key, Locator,
    MouseStep, Rect, ScriptResult,
};

/// A fake element keyed by its locator value
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub text: String,
    /// Texts returned, one per read, before `text`
    pub pending_texts: VecDeque<String>,
    pub rect: Rect,
    pub displayed: bool,
    pub enabled: bool,
    pub selected: bool,
    pub checksum: u32,
    /// Checksums returned, one per read, before `checksum`
    pub pending_checksums: VecDeque<u32>,
}

impl Element {
    pub fn new(tag: &str, text: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: text.to_string(),
            displayed: true,
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_pending(mut self, texts: &[&str]) -> Self {
        self.pending_texts = texts.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_checksums(mut self, checksum: u32, pending: &[u32]) -> Self {
        self.checksum = checksum;
        self.pending_checksums = pending.iter().copied().collect();
        self
    }

    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect { x, y, width, height };
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

/// Records every call and answers from its element table
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    pub elements: HashMap<String, Element>,
    pub current: Option<String>,
    pub calls: Vec<String>,
    pub text_reads: usize,
    pub checksum_reads: usize,
    pub started: bool,
    pub console: Vec<String>,
    pub ready_states: VecDeque<String>,
    /// Options of the last `start`
    pub launch: Option<BrowserOptions>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, key: &str, element: Element) -> Self {
        self.elements.insert(key.to_string(), element);
        self
    }

    pub fn with_console(mut self, messages: &[&str]) -> Self {
        self.console = messages.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.iter().any(|c| c.starts_with(prefix))
    }

    fn element(&mut self) -> DriverResult<&mut Element> {
        let key = self.current.clone().ok_or(DriverError::NoCurrentElement)?;
        self.elements
            .get_mut(&key)
            .ok_or(DriverError::NoSuchElement(key))
    }

    fn record(&mut self, call: String) {
        self.calls.push(call);
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn start(&mut self, options: &BrowserOptions) -> DriverResult<()> {
        self.started = true;
        self.launch = Some(options.clone());
        self.record(format!("start {}x{}", options.width, options.height));
        Ok(())
    }

    async fn connect(&mut self, endpoint: &str, _options: &BrowserOptions) -> DriverResult<()> {
        self.started = true;
        self.record(format!("connect {}", endpoint));
        Ok(())
    }

    async fn get(&mut self, url: &str) -> DriverResult<()> {
        if !self.started {
            return Err(DriverError::NotStarted);
        }
        self.record(format!("get {}", url));
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.started = false;
        self.current = None;
        self.record("close".to_string());
        Ok(())
    }

    async fn viewport(&mut self, options: &BrowserOptions) -> DriverResult<()> {
        self.record(format!("viewport {}x{}", options.width, options.height));
        Ok(())
    }

    async fn back(&mut self) -> DriverResult<()> {
        self.record("back".to_string());
        Ok(())
    }

    async fn forward(&mut self) -> DriverResult<()> {
        self.record("forward".to_string());
        Ok(())
    }

    async fn refresh(&mut self) -> DriverResult<()> {
        self.record("refresh".to_string());
        Ok(())
    }

    async fn set_page_load_timeout(&mut self, seconds: f64) -> DriverResult<()> {
        self.record(format!("page-load-timeout {}", seconds));
        Ok(())
    }

    async fn send_to_page(&mut self, text: &str) -> DriverResult<()> {
        self.record(format!("page-send {}", text));
        Ok(())
    }

    async fn locate(&mut self, locator: &Locator) -> DriverResult<()> {
        if self.elements.contains_key(&locator.value) {
            self.current = Some(locator.value.clone());
            Ok(())
        } else {
            self.current = None;
            Err(DriverError::NoSuchElement(locator.to_string()))
        }
    }

    fn clear_current(&mut self) {
        self.current = None;
    }

    async fn text(&mut self) -> DriverResult<String> {
        self.text_reads += 1;
        let element = self.element()?;
        Ok(element
            .pending_texts
            .pop_front()
            .unwrap_or_else(|| element.text.clone()))
    }

    async fn tag_name(&mut self) -> DriverResult<String> {
        Ok(self.element()?.tag.clone())
    }

    async fn rect(&mut self) -> DriverResult<Rect> {
        Ok(self.element()?.rect)
    }

    async fn is_displayed(&mut self) -> DriverResult<bool> {
        Ok(self.element()?.displayed)
    }

    async fn is_enabled(&mut self) -> DriverResult<bool> {
        Ok(self.element()?.enabled)
    }

    async fn is_selected(&mut self) -> DriverResult<bool> {
        Ok(self.element()?.selected)
    }

    async fn checksum(&mut self) -> DriverResult<u32> {
        self.checksum_reads += 1;
        let element = self.element()?;
        Ok(element
            .pending_checksums
            .pop_front()
            .unwrap_or(element.checksum))
    }

    async fn click(&mut self) -> DriverResult<()> {
        self.element()?;
        let key = self.current.clone().unwrap_or_default();
        self.record(format!("click {}", key));
        Ok(())
    }

    async fn send(&mut self, text: &str) -> DriverResult<()> {
        let element = self.element()?;
        element.text.push_str(text);
        self.record(format!("send {}", text));
        Ok(())
    }

    async fn clear(&mut self) -> DriverResult<()> {
        self.element()?.text.clear();
        self.record("clear".to_string());
        Ok(())
    }

    async fn press(&mut self, key: Key) -> DriverResult<()> {
        self.record(format!("press {:?}", key));
        Ok(())
    }

    async fn scroll_into_view(&mut self) -> DriverResult<()> {
        self.element()?;
        self.record("scroll-into-view".to_string());
        Ok(())
    }

    async fn mouse(&mut self, steps: &[MouseStep]) -> DriverResult<()> {
        self.record(format!("mouse {}", steps.len()));
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> DriverResult<()> {
        self.record(format!("screenshot {}", path.display()));
        Ok(())
    }

    async fn page_source(&mut self) -> DriverResult<String> {
        Ok("<html></html>".to_string())
    }

    async fn ready_state(&mut self) -> DriverResult<String> {
        Ok(self
            .ready_states
            .pop_front()
            .unwrap_or_else(|| "complete".to_string()))
    }

    async fn call(&mut self, name: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.record(format!("call {} {}", name, args.len()));
        Ok(json!(args))
    }

    async fn console_messages(&mut self) -> DriverResult<Vec<String>> {
        let messages = std::mem::take(&mut self.console);
        self.record(format!("console {}", messages.len()));
        Ok(messages)
    }
}

/// Engine config with a short retry interval
pub fn test_config() -> EngineConfig {
    EngineConfig {
        retry_interval_ms: 20,
        ..EngineConfig::default()
    }
}

/// Run script text as a pseudo file rooted at `cwd`
pub async fn run_in(
    text: &str,
    driver: ScriptedDriver,
    cwd: &Path,
) -> (Interpreter<ScriptedDriver>, ScriptResult<()>) {
    let mut interpreter = Interpreter::new(driver, test_config());
    let result = interpreter.run_string(text, "test.ui", cwd).await;
    (interpreter, result)
}

pub async fn run(text: &str, driver: ScriptedDriver) -> (Interpreter<ScriptedDriver>, ScriptResult<()>) {
    run_in(text, driver, Path::new(".")).await
}
