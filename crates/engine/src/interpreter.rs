//! The statement interpreter
//!
//! Reads statements from a [`TokenSource`], executes them against a
//! [`Driver`], and recurses into new sources for `include`, alias invocation,
//! `exec-include` and `while` bodies. Assertions race a single shared
//! [`WaitBudget`]: each failed attempt sleeps the retry interval, re-resolves
//! the current locator and tries again until the deadline passes.

use futures::future::BoxFuture;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use crate::alias::AliasTable;
use crate::condition::ConditionStack;
use crate::config::EngineConfig;
use crate::driver::{BrowserOptions, Driver, Locator};
use crate::error::{DriverError, Failure, ScriptError, ScriptResult};
use crate::exec::run_command;
use crate::frame::FrameStack;
use crate::geometry::AxisPair;
use crate::source::{Bindings, ReplaySource, ScannerSource, TokenArena, TokenSource};
use crate::statement::{BrowserCommand, Statement, StatementParser};
use crate::token::Token;
use crate::wait::{self, WaitBudget};

/// Alias run after a failed script
pub const ON_FAIL: &str = "--onfail";

/// Alias run after a successful script
pub const ON_SUCCESS: &str = "--onsuccess";

/// A retryable check against the current page
#[derive(Debug, Clone)]
enum Probe {
    Locate(Locator),
    Click,
    Text(String),
    Tag(String),
    Displayed(bool),
    Enabled(bool),
    Selected(bool),
    At(AxisPair),
    Size(AxisPair),
    Checksum(u32),
    Navigation,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Locate(locator) => write!(f, "{}", locator),
            Probe::Click => f.write_str("click"),
            Probe::Text(text) => write!(f, "check \"{}\"", text),
            Probe::Tag(tag) => write!(f, "tag \"{}\"", tag),
            Probe::Displayed(want) => write!(f, "displayed {}", want),
            Probe::Enabled(want) => write!(f, "enabled {}", want),
            Probe::Selected(want) => write!(f, "selected {}", want),
            Probe::At(pair) => write!(f, "at {},{}", pair.0, pair.1),
            Probe::Size(pair) => write!(f, "size {},{}", pair.0, pair.1),
            Probe::Checksum(sum) => write!(f, "checksum crc32:{}", sum),
            Probe::Navigation => f.write_str("navigation"),
        }
    }
}

fn state_check(what: &str, want: bool, actual: bool) -> ScriptResult<()> {
    if want == actual {
        Ok(())
    } else {
        let state = |b: bool| if b { what.to_string() } else { format!("not {}", what) };
        Err(Failure::assertion(format!(
            "expected {} but was {}",
            state(want),
            state(actual)
        )))
    }
}

/// Executes scripts against a driver
pub struct Interpreter<D: Driver> {
    config: EngineConfig,
    driver: D,
    arena: TokenArena,
    aliases: AliasTable,
    frames: FrameStack,
    conditions: ConditionStack,
    wait: WaitBudget,
    negate_next: bool,
    auto_log_console: bool,
    current: Option<Locator>,
    browser: BrowserOptions,
    launched: bool,
    page_load_timeout: Option<f64>,
    screenshot_dir: Option<PathBuf>,
    transcript: Vec<String>,
}

impl<D: Driver> Interpreter<D> {
    pub fn new(driver: D, config: EngineConfig) -> Self {
        let wait = WaitBudget::new(config.scaled_wait(config.default_wait_secs));
        let browser = BrowserOptions {
            width: config.browser.width,
            height: config.browser.height,
            chrome_width: config.browser.chrome_width,
            chrome_height: config.browser.chrome_height,
            headless: config.browser.headless,
            args: config.browser.args.clone(),
            ..BrowserOptions::default()
        };
        let screenshot_dir = config.screenshot_dir.clone();
        Self {
            config,
            driver,
            arena: TokenArena::new(),
            aliases: AliasTable::new(),
            frames: FrameStack::new(),
            conditions: ConditionStack::new(),
            wait,
            negate_next: false,
            auto_log_console: false,
            current: None,
            browser,
            launched: false,
            page_load_timeout: None,
            screenshot_dir,
            transcript: Vec::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Text emitted by `echo`, in order
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Run a script as a complete test: hooks, diagnostics and teardown
    pub async fn run_script(&mut self, path: &Path) -> ScriptResult<()> {
        let result = match self.run_file(path).await {
            Ok(()) => self.run_hook(ON_SUCCESS).await,
            Err(failure) => Err(failure),
        };

        let result = match result {
            Ok(()) => Ok(()),
            Err(failure) => {
                error!("{}", failure.diagnostic());
                self.capture_failure_screenshot(path).await;
                if let Err(hook) = self.run_hook(ON_FAIL).await {
                    warn!("{} hook failed: {}", ON_FAIL, hook.diagnostic());
                }
                Err(failure)
            }
        };

        self.teardown().await;
        result
    }

    async fn run_hook(&mut self, name: &str) -> ScriptResult<()> {
        if !self.aliases.contains(name) {
            return Ok(());
        }
        debug!("Running {} hook", name);
        self.invoke_alias(name, Bindings::new()).await
    }

    async fn capture_failure_screenshot(&mut self, script: &Path) {
        let Some(dir) = self.screenshot_dir.clone() else {
            return;
        };
        if !self.launched {
            return;
        }
        let stem = script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string());
        let path = dir.join(format!("{}-failure.png", stem));
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("Failed to create {}: {}", dir.display(), e);
            return;
        }
        match self.driver.screenshot(&path).await {
            Ok(()) => info!("Failure screenshot saved to {}", path.display()),
            Err(e) => warn!("Failed to capture failure screenshot: {}", e),
        }
    }

    /// Close a browser this run launched
    pub async fn teardown(&mut self) {
        if !self.launched {
            return;
        }
        if let Err(e) = self.driver.close().await {
            warn!("Failed to close browser: {}", e);
        }
        self.launched = false;
        self.current = None;
    }

    /// Parse and run a script file, relative to the current frame
    pub async fn run_file(&mut self, path: &Path) -> ScriptResult<()> {
        let path = self.frames.working_dir().join(path);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Failure::new(ScriptError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            )))
        })?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        info!("Running {}", path.display());
        let mut source = ScannerSource::new(&text, &self.config.lexer);
        self.run_frame(path.display().to_string(), dir, &mut source).await
    }

    /// Parse and run script text as a pseudo file
    pub async fn run_string(&mut self, text: &str, name: &str, cwd: &Path) -> ScriptResult<()> {
        let mut source = ScannerSource::new(text, &self.config.lexer);
        self.run_frame(name.to_string(), cwd.to_path_buf(), &mut source)
            .await
    }

    /// Run already scanned tokens with parameter bindings
    pub async fn run_tokens(&mut self, tokens: Vec<Token>, bindings: Bindings) -> ScriptResult<()> {
        let span = self.arena.alloc(tokens.into_iter().filter(|t| !t.is_end()));
        let dir = self.frames.working_dir().to_path_buf();
        let mut source = ReplaySource::new(span, Arc::new(bindings));
        self.run_frame("<tokens>".to_string(), dir, &mut source).await
    }

    /// Replay an alias body with the given bindings
    pub async fn invoke_alias(&mut self, name: &str, bindings: Bindings) -> ScriptResult<()> {
        let alias = self.aliases.get(name).cloned().ok_or_else(|| {
            Failure::new(ScriptError::Syntax(format!("unknown alias '{}'", name)))
        })?;
        if alias.params.len() != bindings.len() {
            debug!(
                "alias {} expects {} arguments, got {}",
                name,
                alias.params.len(),
                bindings.len()
            );
        }
        let dir = self.frames.working_dir().to_path_buf();
        let mut source = ReplaySource::new(alias.body, Arc::new(bindings));
        self.run_frame(format!("alias {}", name), dir, &mut source)
            .await
    }

    fn run_frame<'a>(
        &'a mut self,
        name: String,
        dir: PathBuf,
        source: &'a mut dyn TokenSource,
    ) -> BoxFuture<'a, ScriptResult<()>> {
        Box::pin(async move {
            self.frames.push(name, dir);
            let result = self.run_block(source).await.map_err(|mut failure| {
                if failure.trace.is_empty() {
                    failure.trace = self.frames.trace();
                }
                failure
            });
            self.frames.pop();
            result
        })
    }

    /// Run a source to its end; conditionals opened inside must close inside
    async fn run_block(&mut self, source: &mut dyn TokenSource) -> ScriptResult<()> {
        let depth = self.conditions.depth();
        let result = self.run_statements(source).await;
        let unclosed = self.conditions.depth() > depth;
        self.conditions.truncate(depth);
        result?;
        if unclosed {
            return Err(ScriptError::Syntax("'if' without 'endif'".into()).into());
        }
        Ok(())
    }

    fn run_statements<'a>(
        &'a mut self,
        source: &'a mut dyn TokenSource,
    ) -> BoxFuture<'a, ScriptResult<()>> {
        Box::pin(async move {
            loop {
                let first = source.next_token(&self.arena);
                if first.is_end() {
                    return Ok(());
                }
                self.frames.set_line(first.line);

                let statement =
                    StatementParser::new(&mut *source, &mut self.arena, &self.aliases)
                        .parse(&first)?;

                if self.conditions.skipping() && !statement.is_control() {
                    trace!(line = first.line, "skip {}", first);
                    continue;
                }

                let capturing = self.conditions.capturing() && !statement.is_control();
                debug!(line = first.line, "{}", first);
                match self.execute(statement).await {
                    Ok(()) => {
                        if capturing {
                            self.conditions.record(true);
                        }
                    }
                    Err(failure) if capturing && failure.is_predicate() => {
                        debug!("condition false: {}", failure.error);
                        self.conditions.record(false);
                    }
                    Err(failure) => return Err(failure.with_token(&first)),
                }

                if self.auto_log_console {
                    self.drain_console().await;
                }
            }
        })
    }

    async fn execute(&mut self, statement: Statement) -> ScriptResult<()> {
        match statement {
            Statement::Version => {
                info!("uiscript engine {}", crate::VERSION);
            }
            Statement::DefaultWait(seconds) => {
                self.config.default_wait_secs = seconds;
                self.wait.arm(self.config.scaled_wait(seconds));
            }
            Statement::DefaultScreenshot(dir) => {
                self.screenshot_dir = Some(self.frames.working_dir().join(dir));
            }
            Statement::Browser(command) => self.browser(command).await?,
            Statement::Include(file) => self.run_file(Path::new(&file)).await?,
            Statement::Call { name, args } => {
                let result = self.driver.call(&name, args).await?;
                info!("call {} returned {}", name, result);
            }
            Statement::DefineAlias(alias) => self.aliases.define(alias),
            Statement::Invoke { name, bindings } => self.invoke_alias(&name, bindings).await?,
            Statement::Locate(locator) => {
                self.current = Some(locator.clone());
                let negated = self.negate_next;
                self.verify(Probe::Locate(locator)).await?;
                if negated {
                    self.driver.clear_current();
                }
            }
            Statement::LogAuto(on) => self.auto_log_console = on,
            Statement::LogDump => self.drain_console().await,
            Statement::Dump => {
                let source = self.driver.page_source().await?;
                info!("{}", source);
            }
            Statement::Info => self.info().await?,
            Statement::Click => self.verify(Probe::Click).await?,
            Statement::ClickNow => self.driver.click().await?,
            Statement::Screenshot(file) => {
                let path = self.screenshot_path(&file);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                self.driver.screenshot(&path).await?;
                info!("Screenshot saved to {}", path.display());
            }
            Statement::Sleep(seconds) => {
                tokio::time::sleep(wait::seconds(seconds)).await;
            }
            Statement::Tag(tag) => self.verify(Probe::Tag(tag)).await?,
            Statement::Not => self.negate_next = true,
            Statement::Displayed(want) => self.verify(Probe::Displayed(want)).await?,
            Statement::Enabled(want) => self.verify(Probe::Enabled(want)).await?,
            Statement::Selected(want) => self.verify(Probe::Selected(want)).await?,
            Statement::At(pair) => self.verify(Probe::At(pair)).await?,
            Statement::Size(pair) => self.verify(Probe::Size(pair)).await?,
            Statement::Check(text) => self.verify(Probe::Text(text)).await?,
            Statement::Checksum(sum) => self.verify(Probe::Checksum(sum)).await?,
            Statement::Wait(seconds) => self.wait.arm(self.config.scaled_wait(seconds)),
            Statement::WaitForNavigation => self.verify(Probe::Navigation).await?,
            Statement::PushWait => self.wait.push(),
            Statement::PopWait => {
                if !self.wait.pop() {
                    return Err(ScriptError::Syntax("'pop wait' without 'push wait'".into()).into());
                }
            }
            Statement::Echo(text) => {
                info!("{}", text);
                self.transcript.push(text);
            }
            Statement::Set(text) => {
                self.driver.clear().await?;
                self.driver.send(&text).await?;
            }
            Statement::Send(text) => self.driver.send(&text).await?,
            Statement::Clear => self.driver.clear().await?,
            Statement::Press(key) => self.driver.press(key).await?,
            Statement::Exec {
                command,
                args,
                include,
            } => {
                let dir = self.frames.working_dir().to_path_buf();
                let output = run_command(&command, &args, &dir).await?;
                if include {
                    let name = format!("exec-include {}", command);
                    self.run_string(&output.stdout, &name, &dir).await?;
                }
            }
            Statement::If => self.conditions.begin(),
            Statement::Then => {
                let result = self
                    .conditions
                    .then()
                    .map_err(|e| Failure::new(ScriptError::Syntax(e.into())))?;
                debug!("condition is {}", result);
            }
            Statement::Endif => self
                .conditions
                .end()
                .map_err(|e| Failure::new(ScriptError::Syntax(e.into())))?,
            Statement::Fail(message) => return Err(ScriptError::Explicit(message).into()),
            Statement::Mouse(steps) => self.driver.mouse(&steps).await?,
            Statement::While(block) => {
                if block.span.is_empty() {
                    return Ok(());
                }
                loop {
                    let mut body = ReplaySource::from_block(&block);
                    match self.run_block(&mut body).await {
                        Ok(()) => continue,
                        Err(failure) if failure.ends_loop() => {
                            debug!("while loop ended: {}", failure.error);
                            self.negate_next = false;
                            break;
                        }
                        Err(failure) => return Err(failure),
                    }
                }
            }
            Statement::ScrollIntoView => self.driver.scroll_into_view().await?,
        }
        Ok(())
    }

    async fn browser(&mut self, command: BrowserCommand) -> ScriptResult<()> {
        match command {
            BrowserCommand::Start => {
                debug!("browser configured: {:?}", self.browser);
            }
            BrowserCommand::Connect(endpoint) => {
                self.driver.connect(&endpoint, &self.browser).await?;
                self.launched = true;
                self.apply_page_load_timeout().await?;
            }
            BrowserCommand::Size(width, height) => {
                self.browser.width = width;
                self.browser.height = height;
                if self.launched {
                    self.driver.viewport(&self.browser).await?;
                }
            }
            BrowserCommand::Chrome(width, height) => {
                self.browser.chrome_width = width;
                self.browser.chrome_height = height;
                if self.launched {
                    self.driver.viewport(&self.browser).await?;
                }
            }
            BrowserCommand::Get(url) => {
                self.ensure_browser().await?;
                self.driver.get(&url).await?;
            }
            BrowserCommand::Close => self.teardown().await,
            BrowserCommand::Wait(seconds) => {
                self.page_load_timeout = Some(seconds);
                self.apply_page_load_timeout().await?;
            }
            BrowserCommand::Back => self.driver.back().await?,
            BrowserCommand::Forward => self.driver.forward().await?,
            BrowserCommand::Refresh => self.driver.refresh().await?,
            BrowserCommand::Send(text) => self.driver.send_to_page(&text).await?,
            BrowserCommand::Headless(on) => {
                self.browser.headless = on;
                if self.launched {
                    warn!("browser headless takes effect on the next launch");
                }
            }
            BrowserCommand::Option(arg) => {
                if self.launched {
                    warn!("browser option {} takes effect on the next launch", arg);
                }
                self.browser.args.push(arg);
            }
            BrowserCommand::Prefs(pref, value) => {
                if self.launched {
                    warn!("browser prefs {} takes effect on the next launch", pref);
                }
                self.browser.prefs.insert(pref, value);
            }
        }
        Ok(())
    }

    async fn ensure_browser(&mut self) -> ScriptResult<()> {
        if self.launched {
            return Ok(());
        }
        info!(
            "Launching browser {}x{} headless={}",
            self.browser.width, self.browser.height, self.browser.headless
        );
        self.driver.start(&self.browser).await?;
        self.launched = true;
        self.apply_page_load_timeout().await
    }

    async fn apply_page_load_timeout(&mut self) -> ScriptResult<()> {
        if let (true, Some(seconds)) = (self.launched, self.page_load_timeout) {
            self.driver.set_page_load_timeout(seconds).await?;
        }
        Ok(())
    }

    fn screenshot_path(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.screenshot_dir {
            Some(dir) => dir.join(path),
            None => self.frames.working_dir().join(path),
        }
    }

    async fn info(&mut self) -> ScriptResult<()> {
        let tag = self.driver.tag_name().await?;
        let rect = self.driver.rect().await?;
        let text = self.driver.text().await?;
        let what = self
            .current
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "element".to_string());
        info!(
            "{} info tag {} at {},{} size {},{} text {:?}",
            what,
            tag,
            rect.x.round(),
            rect.y.round(),
            rect.width.round(),
            rect.height.round(),
            text
        );
        Ok(())
    }

    async fn drain_console(&mut self) {
        match self.driver.console_messages().await {
            Ok(messages) => {
                for message in messages {
                    info!(target: "uiscript::console", "{}", message);
                }
            }
            Err(DriverError::NotStarted) => {}
            Err(e) => debug!("console capture failed: {}", e),
        }
    }

    /// Run an assertion under the wait budget, honoring a pending `not`
    async fn verify(&mut self, probe: Probe) -> ScriptResult<()> {
        let negate = std::mem::take(&mut self.negate_next);
        self.retry(probe, negate).await
    }

    async fn retry(&mut self, probe: Probe, negate: bool) -> ScriptResult<()> {
        // Predicates get one attempt
        let single = self.conditions.capturing();
        let interval = self.config.retry_interval();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let outcome = match (self.attempt(&probe).await, negate) {
                (Ok(()), false) => Ok(()),
                (Ok(()), true) => Err(Failure::assertion(format!("expected not {}", probe))),
                (Err(failure), true) if failure.is_retryable() => Ok(()),
                (Err(failure), _) => Err(failure),
            };

            let failure = match outcome {
                Ok(()) => return Ok(()),
                Err(failure) => failure,
            };
            if !failure.is_retryable() || single || self.wait.is_exhausted() {
                if attempts > 1 {
                    debug!("{} gave up after {} attempts", probe, attempts);
                }
                return Err(match probe {
                    Probe::Navigation if failure.is_retryable() => {
                        ScriptError::Timeout(probe.to_string()).into()
                    }
                    _ => failure,
                });
            }

            trace!("{} failed, retrying: {}", probe, failure.error);
            tokio::time::sleep(interval.min(self.wait.remaining())).await;
            self.relocate(&probe).await;
        }
    }

    /// Re-resolve the current locator; the page may have replaced the node
    async fn relocate(&mut self, probe: &Probe) {
        if matches!(probe, Probe::Locate(_) | Probe::Navigation) {
            return;
        }
        if let Some(locator) = self.current.clone() {
            if let Err(e) = self.driver.locate(&locator).await {
                trace!("re-resolve {} failed: {}", locator, e);
            }
        }
    }

    async fn attempt(&mut self, probe: &Probe) -> ScriptResult<()> {
        match probe {
            Probe::Locate(locator) => self.driver.locate(locator).await?,
            Probe::Click => self.driver.click().await?,
            Probe::Text(expected) => {
                let actual = self.driver.text().await?;
                if &actual != expected {
                    return Err(Failure::assertion(format!(
                        "expected \"{}\" but was \"{}\"",
                        expected, actual
                    )));
                }
            }
            Probe::Tag(expected) => {
                let actual = self.driver.tag_name().await?;
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(Failure::assertion(format!(
                        "expected tag {} but was {}",
                        expected, actual
                    )));
                }
            }
            Probe::Displayed(want) => {
                let actual = self.driver.is_displayed().await?;
                state_check("displayed", *want, actual)?;
            }
            Probe::Enabled(want) => {
                let actual = self.driver.is_enabled().await?;
                state_check("enabled", *want, actual)?;
            }
            Probe::Selected(want) => {
                let actual = self.driver.is_selected().await?;
                state_check("selected", *want, actual)?;
            }
            Probe::At(pair) => {
                let rect = self.driver.rect().await?;
                pair.check_position(&rect).map_err(Failure::assertion)?;
            }
            Probe::Size(pair) => {
                let rect = self.driver.rect().await?;
                pair.check_size(&rect).map_err(Failure::assertion)?;
            }
            Probe::Checksum(expected) => {
                let actual = self.driver.checksum().await?;
                if actual != *expected {
                    return Err(Failure::assertion(format!(
                        "expected checksum crc32:{} but was crc32:{}",
                        expected, actual
                    )));
                }
            }
            Probe::Navigation => {
                let state = self.driver.ready_state().await?;
                if state != "complete" {
                    return Err(Failure::assertion(format!(
                        "document is {}",
                        state
                    )));
                }
            }
        }
        Ok(())
    }
}
