//! Subprocess execution for `exec` and `exec-include`

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ScriptError, ScriptResult};

/// Output of a finished subprocess
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub status: i32,
    pub stdout: String,
}

/// Resolve `command` against `working_dir` when it names a file there.
/// Anything else is left to the `PATH` search.
pub fn resolve_command(command: &str, working_dir: &Path) -> PathBuf {
    let path = Path::new(command);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let local = working_dir.join(path);
    if local.is_file() {
        local
    } else {
        path.to_path_buf()
    }
}

/// Relay a pipe line by line to the log, optionally keeping the text.
/// Invalid UTF-8 is replaced, not an error.
async fn relay<R>(pipe: R, label: &'static str, keep: bool) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(pipe).split(b'\n');
    let mut captured = String::new();
    while let Some(mut raw) = segments.next_segment().await? {
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let line = String::from_utf8_lossy(&raw);
        info!(target: "uiscript::exec", "{}: {}", label, line);
        if keep {
            captured.push_str(&line);
            captured.push('\n');
        }
    }
    Ok(captured)
}

/// Run a command to completion, relaying its output
pub async fn run_command(
    command: &str,
    args: &[String],
    working_dir: &Path,
) -> ScriptResult<ExecOutput> {
    let program = resolve_command(command, working_dir);
    debug!("exec {} {:?} in {}", program.display(), args, working_dir.display());

    let mut child = Command::new(&program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_task = async {
        match stdout {
            Some(pipe) => relay(pipe, "stdout", true).await,
            None => Ok(String::new()),
        }
    };
    let err_task = async {
        match stderr {
            Some(pipe) => relay(pipe, "stderr", false).await,
            None => Ok(String::new()),
        }
    };
    let (captured, relayed) = tokio::join!(out_task, err_task);
    if let Err(e) = relayed {
        warn!("Failed to read stderr of {}: {}", command, e);
    }
    let captured = captured?;

    let status = child.wait().await?;
    // Killed by a signal reports no code
    let code = status.code().unwrap_or(-1);
    if !status.success() {
        return Err(ScriptError::Subprocess {
            command: command.to_string(),
            status: code,
        }
        .into());
    }

    Ok(ExecOutput {
        status: code,
        stdout: captured,
    })
}
