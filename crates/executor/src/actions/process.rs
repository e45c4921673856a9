//! Subprocess execution under a timeout

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::guard::screen_command;
use crate::ExecError;

const OUTPUT_CAP: usize = 10_000;

/// Run a command through `sh -c` with the workspace as cwd
pub(crate) async fn run_shell(
    command: &str,
    workspace: &Path,
    timeout: Duration,
) -> Result<String, ExecError> {
    screen_command(command)?;

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(workspace);
    run(cmd, command, timeout).await
}

/// Run a program with an argument array, never through a shell
pub(crate) async fn run_argv(
    program: &str,
    args: &[String],
    workspace: &Path,
    timeout: Duration,
) -> Result<String, ExecError> {
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(workspace);
    run(cmd, program, timeout).await
}

async fn run(mut cmd: Command, label: &str, timeout: Duration) -> Result<String, ExecError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // dropping the wait future on timeout reaps the child
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| ExecError::Failed(format!("failed to spawn '{}': {}", label, e)))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ExecError::Failed(format!("execution error: {}", e))),
        Err(_) => {
            debug!("'{}' timed out after {:?}", label, timeout);
            return Err(ExecError::Timeout(format!(
                "'{}' exceeded {}s",
                label,
                timeout.as_secs()
            )));
        }
    };

    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr.trim_end());
    }
    crate::cap_output(&mut text, OUTPUT_CAP, "\n... (output truncated)");

    if output.status.success() {
        Ok(text)
    } else {
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Err(ExecError::Failed(format!(
            "exit status {}\n{}",
            code, text
        )))
    }
}
