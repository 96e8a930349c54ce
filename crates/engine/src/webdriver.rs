//! W3C WebDriver implementation of the [`Driver`] seam
//!
//! Talks JSON over HTTP to a WebDriver server (chromedriver by default),
//! either one already running at `webdriver_url` or one spawned through
//! [`DriverProcess`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::Crc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::config::BrowserConfig;
use crate::driver::{BrowserOptions, Driver, Key, Locator, LocatorKind, MouseStep, Rect};
use crate::error::{DriverError, DriverResult};
use crate::launcher::{DriverProcess, LaunchConfig};

/// Web element identifier key of the W3C protocol
const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4d7362f9c6f8";

const TEXT_SCRIPT: &str = "const el = arguments[0]; \
    const tag = el.tagName; \
    if (tag === 'INPUT' || tag === 'TEXTAREA' || tag === 'SELECT') return el.value; \
    return el.textContent;";

const HOOK_SCRIPT: &str = "const hook = window[arguments[0]]; \
    if (typeof hook !== 'function') throw new Error('no test hook ' + arguments[0]); \
    return hook.apply(window, arguments[1]);";

const SCROLL_SCRIPT: &str = "arguments[0].scrollIntoView({ block: 'center', inline: 'center' });";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct LogEntry {
    #[serde(default)]
    level: String,
    message: String,
}

/// Decode a WebDriver response body into its `value`
fn parse_response(status: u16, body: &str) -> DriverResult<Value> {
    let envelope: Envelope = if body.trim().is_empty() {
        Envelope { value: Value::Null }
    } else {
        serde_json::from_str(body)?
    };
    if (200..300).contains(&status) {
        return Ok(envelope.value);
    }

    let err: ErrorValue = serde_json::from_value(envelope.value).unwrap_or_else(|_| ErrorValue {
        error: "unknown error".to_string(),
        message: String::new(),
    });
    Err(match err.error.as_str() {
        "no such element" | "stale element reference" => DriverError::NoSuchElement(err.message),
        "invalid session id" => DriverError::NotStarted,
        _ => DriverError::Protocol {
            status,
            error: err.error,
            message: err.message,
        },
    })
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY).and_then(Value::as_str).map(str::to_string)
}

fn element_ref(id: &str) -> Value {
    json!({ ELEMENT_KEY: id })
}

fn quote_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Location strategy and selector for a locator
fn strategy(locator: &Locator) -> (&'static str, String) {
    match locator.kind {
        LocatorKind::Css => ("css selector", locator.value.clone()),
        LocatorKind::XPath => ("xpath", locator.value.clone()),
        LocatorKind::TestId => (
            "css selector",
            format!("*[test-id='{}']", quote_attr(&locator.value)),
        ),
        LocatorKind::Field => (
            "css selector",
            format!("*[name='{}']", quote_attr(&locator.value)),
        ),
    }
}

/// Text the WebDriver key input source sends for `key`
fn key_text(key: Key) -> Option<String> {
    let text = match key {
        Key::Enter | Key::Code(13) => "\u{E007}".to_string(),
        Key::Tab | Key::Code(9) => "\u{E004}".to_string(),
        Key::Space => " ".to_string(),
        Key::Escape | Key::Code(27) => "\u{E00C}".to_string(),
        Key::Backspace | Key::Code(8) => "\u{E003}".to_string(),
        Key::Code(code) => char::from_u32(code)?.to_string(),
    };
    Some(text)
}

fn key_actions(text: &str) -> Value {
    let actions: Vec<Value> = text
        .chars()
        .flat_map(|ch| {
            [
                json!({ "type": "keyDown", "value": ch.to_string() }),
                json!({ "type": "keyUp", "value": ch.to_string() }),
            ]
        })
        .collect();
    json!({ "type": "key", "id": "keyboard", "actions": actions })
}

fn pointer_move(x: f64, y: f64) -> Value {
    json!({
        "type": "pointerMove",
        "duration": 0,
        "origin": "viewport",
        "x": x.max(0.0).round() as i64,
        "y": y.max(0.0).round() as i64,
    })
}

/// Translate a mouse gesture into pointer actions. `rect` is the current
/// element's geometry, needed by `origin` and `center`.
fn pointer_actions(steps: &[MouseStep], rect: Option<Rect>) -> DriverResult<Value> {
    let (mut x, mut y) = (0.0, 0.0);
    let mut actions = Vec::with_capacity(steps.len());
    for step in steps {
        match step {
            MouseStep::Body => {
                x = 0.0;
                y = 0.0;
                actions.push(pointer_move(x, y));
            }
            MouseStep::Origin => {
                let r = rect.ok_or(DriverError::NoCurrentElement)?;
                x = r.x;
                y = r.y;
                actions.push(pointer_move(x, y));
            }
            MouseStep::Center => {
                let r = rect.ok_or(DriverError::NoCurrentElement)?;
                x = r.x + r.width / 2.0;
                y = r.y + r.height / 2.0;
                actions.push(pointer_move(x, y));
            }
            MouseStep::Move { dx, dy } => {
                x += dx;
                y += dy;
                actions.push(pointer_move(x, y));
            }
            MouseStep::Down => actions.push(json!({ "type": "pointerDown", "button": 0 })),
            MouseStep::Up => actions.push(json!({ "type": "pointerUp", "button": 0 })),
            MouseStep::Click => {
                actions.push(json!({ "type": "pointerDown", "button": 0 }));
                actions.push(json!({ "type": "pointerUp", "button": 0 }));
            }
            MouseStep::Sleep(seconds) => actions.push(json!({
                "type": "pause",
                "duration": (seconds.max(0.0) * 1000.0).round() as u64,
            })),
        }
    }
    Ok(json!({
        "type": "pointer",
        "id": "mouse",
        "parameters": { "pointerType": "mouse" },
        "actions": actions,
    }))
}

/// A WebDriver client session
pub struct WebDriver {
    client: reqwest::Client,
    config: BrowserConfig,
    endpoint: Option<String>,
    session: Option<String>,
    element: Option<String>,
    process: Option<DriverProcess>,
}

impl WebDriver {
    pub fn new(config: BrowserConfig) -> DriverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            config,
            endpoint: None,
            session: None,
            element: None,
            process: None,
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    async fn http(&self, method: Method, url: &str, body: Option<Value>) -> DriverResult<Value> {
        trace!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        parse_response(status, &text)
    }

    /// Session-relative command
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DriverResult<Value> {
        let (Some(endpoint), Some(session)) = (&self.endpoint, &self.session) else {
            return Err(DriverError::NotStarted);
        };
        let url = format!("{}/session/{}{}", endpoint, session, path);
        self.http(method, &url, body).await
    }

    async fn post(&self, path: &str, body: Value) -> DriverResult<Value> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn get_value(&self, path: &str) -> DriverResult<Value> {
        self.command(Method::GET, path, None).await
    }

    fn current(&self) -> DriverResult<String> {
        self.element.clone().ok_or(DriverError::NoCurrentElement)
    }

    async fn element_get(&self, what: &str) -> DriverResult<Value> {
        let id = self.current()?;
        self.get_value(&format!("/element/{}/{}", id, what)).await
    }

    async fn element_post(&self, what: &str, body: Value) -> DriverResult<Value> {
        let id = self.current()?;
        self.post(&format!("/element/{}/{}", id, what), body).await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    async fn perform(&self, source: Value) -> DriverResult<()> {
        self.post("/actions", json!({ "actions": [source] })).await?;
        self.command(Method::DELETE, "/actions", None).await?;
        Ok(())
    }

    async fn element_flag(&self, what: &str) -> DriverResult<bool> {
        Ok(self.element_get(what).await?.as_bool().unwrap_or(false))
    }

    fn capabilities(options: &BrowserOptions) -> Value {
        let mut args = options.args.clone();
        args.push(format!(
            "--window-size={},{}",
            options.width + options.chrome_width,
            options.height + options.chrome_height
        ));
        if options.headless {
            args.push("--headless=new".to_string());
        }
        args.push("--disable-extensions".to_string());
        args.push("--disable-infobars".to_string());
        // Preference values that parse as JSON keep their type
        let prefs: serde_json::Map<String, Value> = options
            .prefs
            .iter()
            .map(|(pref, value)| {
                let value = serde_json::from_str(value)
                    .unwrap_or_else(|_| Value::String(value.clone()));
                (pref.clone(), value)
            })
            .collect();
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args, "prefs": prefs },
                    "goog:loggingPrefs": { "browser": "ALL" },
                }
            }
        })
    }

    async fn new_session(&mut self, endpoint: String, options: &BrowserOptions) -> DriverResult<()> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let url = format!("{}/session", endpoint);
        let value = self
            .http(Method::POST, &url, Some(Self::capabilities(options)))
            .await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol {
                status: 200,
                error: "session not created".to_string(),
                message: value.to_string(),
            })?
            .to_string();

        info!("WebDriver session {} at {}", id, endpoint);
        self.endpoint = Some(endpoint);
        self.session = Some(id);
        self.element = None;
        self.viewport(options).await
    }

    fn stop_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.stop() {
                debug!("Failed to stop WebDriver: {}", e);
            }
        }
    }
}

#[async_trait]
impl Driver for WebDriver {
    async fn start(&mut self, options: &BrowserOptions) -> DriverResult<()> {
        if self.session.is_some() {
            self.close().await?;
        }
        let endpoint = match &self.config.webdriver_url {
            Some(url) => url.clone(),
            None => {
                let process = DriverProcess::spawn(&LaunchConfig::from(&self.config)).await?;
                let endpoint = process.endpoint().to_string();
                self.process = Some(process);
                endpoint
            }
        };
        let result = self.new_session(endpoint, options).await;
        if result.is_err() {
            self.stop_process();
        }
        result
    }

    async fn connect(&mut self, endpoint: &str, options: &BrowserOptions) -> DriverResult<()> {
        if self.session.is_some() {
            self.close().await?;
        }
        self.new_session(endpoint.to_string(), options).await
    }

    async fn get(&mut self, url: &str) -> DriverResult<()> {
        self.element = None;
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        let result = if self.session.is_some() {
            self.command(Method::DELETE, "", None).await.map(|_| ())
        } else {
            Ok(())
        };
        self.session = None;
        self.element = None;
        self.stop_process();
        result
    }

    async fn viewport(&mut self, options: &BrowserOptions) -> DriverResult<()> {
        self.post(
            "/window/rect",
            json!({
                "width": options.width + options.chrome_width,
                "height": options.height + options.chrome_height,
            }),
        )
        .await?;
        Ok(())
    }

    async fn back(&mut self) -> DriverResult<()> {
        self.element = None;
        self.post("/back", json!({})).await?;
        Ok(())
    }

    async fn forward(&mut self) -> DriverResult<()> {
        self.element = None;
        self.post("/forward", json!({})).await?;
        Ok(())
    }

    async fn refresh(&mut self) -> DriverResult<()> {
        self.element = None;
        self.post("/refresh", json!({})).await?;
        Ok(())
    }

    async fn set_page_load_timeout(&mut self, seconds: f64) -> DriverResult<()> {
        let ms = (seconds.max(0.0) * 1000.0).round() as u64;
        self.post("/timeouts", json!({ "pageLoad": ms })).await?;
        Ok(())
    }

    async fn send_to_page(&mut self, text: &str) -> DriverResult<()> {
        self.perform(key_actions(text)).await
    }

    async fn locate(&mut self, locator: &Locator) -> DriverResult<()> {
        let (using, value) = strategy(locator);
        let found = self
            .post("/element", json!({ "using": using, "value": value }))
            .await;
        match found {
            Ok(value) => {
                let id = element_id(&value).ok_or_else(|| DriverError::Protocol {
                    status: 200,
                    error: "invalid element reference".to_string(),
                    message: value.to_string(),
                })?;
                self.element = Some(id);
                Ok(())
            }
            Err(DriverError::NoSuchElement(_)) => {
                self.element = None;
                Err(DriverError::NoSuchElement(locator.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn clear_current(&mut self) {
        self.element = None;
    }

    async fn text(&mut self) -> DriverResult<String> {
        let id = self.current()?;
        let value = self.execute(TEXT_SCRIPT, vec![element_ref(&id)]).await?;
        Ok(match value {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    async fn tag_name(&mut self) -> DriverResult<String> {
        let value = self.element_get("name").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn rect(&mut self) -> DriverResult<Rect> {
        let value = self.element_get("rect").await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn is_displayed(&mut self) -> DriverResult<bool> {
        self.element_flag("displayed").await
    }

    async fn is_enabled(&mut self) -> DriverResult<bool> {
        self.element_flag("enabled").await
    }

    async fn is_selected(&mut self) -> DriverResult<bool> {
        self.element_flag("selected").await
    }

    async fn checksum(&mut self) -> DriverResult<u32> {
        let value = self.element_get("screenshot").await?;
        let png = BASE64.decode(value.as_str().unwrap_or_default())?;
        let mut crc = Crc::new();
        crc.update(&png);
        Ok(crc.sum())
    }

    async fn click(&mut self) -> DriverResult<()> {
        self.element_post("click", json!({})).await?;
        Ok(())
    }

    async fn send(&mut self, text: &str) -> DriverResult<()> {
        self.element_post("value", json!({ "text": text })).await?;
        Ok(())
    }

    async fn clear(&mut self) -> DriverResult<()> {
        self.element_post("clear", json!({})).await?;
        Ok(())
    }

    async fn press(&mut self, key: Key) -> DriverResult<()> {
        let text = key_text(key)
            .ok_or_else(|| DriverError::Unsupported(format!("key {:?}", key)))?;
        if self.element.is_some() {
            self.element_post("value", json!({ "text": text })).await?;
            Ok(())
        } else {
            self.perform(key_actions(&text)).await
        }
    }

    async fn scroll_into_view(&mut self) -> DriverResult<()> {
        let id = self.current()?;
        self.execute(SCROLL_SCRIPT, vec![element_ref(&id)]).await?;
        Ok(())
    }

    async fn mouse(&mut self, steps: &[MouseStep]) -> DriverResult<()> {
        let needs_element = steps
            .iter()
            .any(|s| matches!(s, MouseStep::Origin | MouseStep::Center));
        let rect = if needs_element {
            Some(self.rect().await?)
        } else {
            None
        };
        self.perform(pointer_actions(steps, rect)?).await
    }

    async fn screenshot(&mut self, path: &Path) -> DriverResult<()> {
        let value = self.get_value("/screenshot").await?;
        let png = BASE64.decode(value.as_str().unwrap_or_default())?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn page_source(&mut self) -> DriverResult<String> {
        let value = self.get_value("/source").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn ready_state(&mut self) -> DriverResult<String> {
        let value = self.execute("return document.readyState;", Vec::new()).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn call(&mut self, name: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.execute(HOOK_SCRIPT, vec![json!(name), Value::Array(args)])
            .await
    }

    async fn console_messages(&mut self) -> DriverResult<Vec<String>> {
        let value = self.post("/se/log", json!({ "type": "browser" })).await?;
        let entries: Vec<LogEntry> = serde_json::from_value(value)?;
        Ok(entries
            .into_iter()
            .map(|e| {
                if e.level.is_empty() {
                    e.message
                } else {
                    format!("[{}] {}", e.level, e.message)
                }
            })
            .collect())
    }
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        self.stop_process();
    }
}
