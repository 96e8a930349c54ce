//! uiscript CLI - Main Entry Point
//!
//! Runs UI-check scripts against a WebDriver browser and reports one
//! result per script.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

use uiscript_engine::{EngineConfig, TestHarness, WebDriver};

mod output;

use output::{print_error, print_suite, OutputFormat};

/// Exit status when every script passed
const EXIT_PASSED: u8 = 0;
/// Exit status when at least one script failed
const EXIT_FAILED: u8 = 1;
/// Exit status when the run could not be set up
const EXIT_SETUP: u8 = 2;

/// uiscript - scripted browser checks
#[derive(Parser, Debug)]
#[command(name = "uiscript")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script files or directories of `*.ui` scripts
    #[arg(required = true, value_name = "SCRIPTS")]
    scripts: Vec<PathBuf>,

    /// Configuration file
    #[arg(long, env = "UISCRIPT_CONFIG", default_value = "uiscript.toml")]
    config: PathBuf,

    /// Connect to a running WebDriver endpoint instead of launching one
    #[arg(long, env = "UISCRIPT_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// WebDriver server binary to launch
    #[arg(long, env = "UISCRIPT_DRIVER_BINARY")]
    driver_binary: Option<PathBuf>,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Multiplier applied to every `wait N`
    #[arg(long)]
    wait_scale: Option<f64>,

    /// Pause between failed assertion attempts
    #[arg(long)]
    retry_interval_ms: Option<u64>,

    /// Directory for screenshots
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// Write test-results.json into this directory
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// File config with command-line overrides applied
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(url) = &self.webdriver_url {
            config.browser.webdriver_url = Some(url.clone());
        }
        if let Some(binary) = &self.driver_binary {
            config.browser.driver_binary = binary.clone();
        }
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(scale) = self.wait_scale {
            config.wait_scale = scale;
        }
        if let Some(interval) = self.retry_interval_ms {
            config.retry_interval_ms = interval;
        }
        if let Some(dir) = &self.screenshot_dir {
            config.screenshot_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match run(&cli).await {
        Ok(true) => ExitCode::from(EXIT_PASSED),
        Ok(false) => ExitCode::from(EXIT_FAILED),
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::from(EXIT_SETUP)
        }
    }
}

/// Returns whether every script passed; errors are setup failures
async fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = cli.engine_config()?;
    debug!("Engine config: {:?}", config);

    let browser = config.browser.clone();
    let mut harness = TestHarness::new(config, move || WebDriver::new(browser.clone()));
    if let Some(dir) = &cli.output {
        harness = harness.with_output_dir(dir);
    }

    for path in &cli.scripts {
        discover(&mut harness, path)?;
    }
    if harness.tests().is_empty() {
        anyhow::bail!("no *.ui scripts found");
    }

    let suite = harness.run_all().await;
    if cli.output.is_some() {
        harness.write_results(&suite)?;
    }
    print_suite(&suite, cli.format);
    Ok(suite.success())
}

fn discover<D, F>(harness: &mut TestHarness<F>, path: &Path) -> anyhow::Result<()>
where
    D: uiscript_engine::Driver,
    F: Fn() -> uiscript_engine::DriverResult<D>,
{
    let count = harness
        .discover(path)
        .with_context(|| format!("discovering scripts in {}", path.display()))?;
    debug!("{}: {} script(s)", path.display(), count);
    Ok(())
}
