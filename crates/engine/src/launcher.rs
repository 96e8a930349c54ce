//! WebDriver server management - spawning and health checking the driver binary

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::BrowserConfig;
use crate::error::{DriverError, DriverResult};

/// Handle to a running WebDriver server process
pub struct DriverProcess {
    child: Child,
    pub endpoint: String,
    pub port: u16,
}

impl DriverProcess {
    /// Spawn the WebDriver binary and wait until it reports ready
    pub async fn spawn(config: &LaunchConfig) -> DriverResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let endpoint = format!("http://127.0.0.1:{}", port);

        info!("Spawning {} on port {}", config.binary_path.display(), port);

        let child = Command::new(&config.binary_path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                DriverError::Launch(format!(
                    "Failed to spawn {}: {}",
                    config.binary_path.display(),
                    e
                ))
            })?;

        let mut process = DriverProcess {
            child,
            endpoint,
            port,
        };

        if let Err(e) = process.wait_for_ready(config.startup_timeout).await {
            let _ = process.stop();
            return Err(e);
        }

        info!("WebDriver is ready at {}", process.endpoint);
        Ok(process)
    }

    /// Poll `/status` until the server accepts sessions
    async fn wait_for_ready(&mut self, timeout_duration: Duration) -> DriverResult<()> {
        let status_url = format!("{}/status", self.endpoint);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(DriverError::Launch(format!(
                    "driver exited during startup with {}",
                    status
                )));
            }

            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("Status check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for WebDriver to start...");
                    }
                    // Connection refused is expected while the server starts
                    if !e.is_connect() {
                        warn!("Status check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(DriverError::Launch(format!(
            "WebDriver not ready after {} status checks",
            attempts
        )))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Stop the server: SIGTERM first, then kill
    pub fn stop(&mut self) -> DriverResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        info!("Stopping WebDriver (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(200));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// How to launch the WebDriver binary
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Path or name of the WebDriver binary
    pub binary_path: PathBuf,

    /// Port to listen on (None = find a free port)
    pub port: Option<u16>,

    pub startup_timeout: Duration,
}

impl From<&BrowserConfig> for LaunchConfig {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            binary_path: config.driver_binary.clone(),
            port: config.driver_port,
            startup_timeout: Duration::from_secs(config.startup_timeout_secs),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self::from(&BrowserConfig::default())
    }
}

/// Find a free local port
pub fn find_free_port() -> DriverResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
