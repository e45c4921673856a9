//! Security-gated tool execution
//!
//! Every tool call the model proposes goes through one funnel:
//! [`Executor::execute`] validates the capability name against a closed
//! registry, confines path arguments to the workspace, screens shell commands
//! against a destructive-pattern denylist, and runs the action under a
//! capability-specific timeout. All failure modes surface in the returned
//! [`ToolResult`]; execute never panics past its boundary.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

mod actions;
mod guard;
pub mod registry;

pub use registry::{specs, Capability, ToolSpec};

/// Typed failure classification carried in a [`ToolResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Tool or command not allowlisted
    Forbidden,
    /// Resolved path escapes the workspace
    PathTraversal,
    /// Execution exceeded its bound
    Timeout,
    /// Gateway response unusable after all fallbacks
    MalformedOutput,
    /// Task ended without success after the corrective-attempt ceiling
    RetryCeilingExceeded,
    /// Task ended without success after the outer step budget
    IterationBudgetExceeded,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::PathTraversal => "path_traversal",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MalformedOutput => "malformed_output",
            ErrorKind::RetryCeilingExceeded => "retry_ceiling_exceeded",
            ErrorKind::IterationBudgetExceeded => "iteration_budget_exceeded",
        };
        write!(f, "{}", s)
    }
}

/// A validated-before-execution tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one tool invocation; immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub ok: bool,
    pub output: String,
    pub error: Option<ErrorKind>,
    pub duration_ms: u64,
}

impl ToolResult {
    fn success(output: String, started: Instant) -> Self {
        Self {
            ok: true,
            output,
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn failure(error: Option<ErrorKind>, output: String, started: Instant) -> Self {
        Self {
            ok: false,
            output,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Internal action failure, mapped onto `ToolResult` at the boundary
#[derive(Debug)]
pub(crate) enum ExecError {
    Forbidden(String),
    Traversal(String),
    Timeout(String),
    InvalidArgs(String),
    Failed(String),
}

impl ExecError {
    fn into_result(self, started: Instant) -> ToolResult {
        match self {
            ExecError::Forbidden(msg) => {
                ToolResult::failure(Some(ErrorKind::Forbidden), msg, started)
            }
            ExecError::Traversal(msg) => {
                ToolResult::failure(Some(ErrorKind::PathTraversal), msg, started)
            }
            ExecError::Timeout(msg) => ToolResult::failure(Some(ErrorKind::Timeout), msg, started),
            ExecError::InvalidArgs(msg) | ExecError::Failed(msg) => {
                ToolResult::failure(None, msg, started)
            }
        }
    }
}

/// Per-capability execution bounds
#[derive(Debug, Clone)]
pub struct Timeouts {
    pub shell: Duration,
    pub http: Duration,
    pub container: Duration,
    pub remote: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            shell: Duration::from_secs(30),
            http: Duration::from_secs(30),
            container: Duration::from_secs(60),
            remote: Duration::from_secs(60),
        }
    }
}

/// The gated action runner
pub struct Executor {
    workspace: PathBuf,
    jobs_path: PathBuf,
    timeouts: Timeouts,
}

impl Executor {
    pub fn new(workspace: impl Into<PathBuf>, jobs_path: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            jobs_path: jobs_path.into(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Validate and run one tool call. Always returns a result.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();

        let capability = match Capability::from_name(&call.name) {
            Some(c) => c,
            None => {
                warn!("rejected unknown tool: {}", call.name);
                return ToolResult::failure(
                    Some(ErrorKind::Forbidden),
                    format!("tool '{}' is not in the allowlist", call.name),
                    started,
                );
            }
        };

        debug!("executing {} ({:?})", call.name, capability);
        match self.dispatch(capability, &call.arguments).await {
            Ok(output) => ToolResult::success(output, started),
            Err(e) => e.into_result(started),
        }
    }

    async fn dispatch(
        &self,
        capability: Capability,
        args: &serde_json::Value,
    ) -> Result<String, ExecError> {
        match capability {
            Capability::Shell => {
                let command = str_arg(args, "command")?;
                actions::process::run_shell(&command, &self.workspace, self.timeouts.shell).await
            }
            Capability::ReadFile => actions::files::read_file(args, &self.workspace).await,
            Capability::WriteFile => actions::files::write_file(args, &self.workspace).await,
            Capability::ListDirectory => {
                actions::files::list_directory(args, &self.workspace).await
            }
            Capability::HttpRequest => actions::http::request(args, self.timeouts.http).await,
            Capability::Git => {
                actions::vcs::run_git(args, &self.workspace, self.timeouts.shell).await
            }
            Capability::Docker => {
                actions::container::run_docker(args, &self.workspace, self.timeouts.container)
                    .await
            }
            Capability::SqlQuery => actions::sql::query(args, &self.workspace).await,
            Capability::RemoteShell => {
                actions::remote::run_ssh(args, &self.workspace, self.timeouts.remote).await
            }
            Capability::Scrape => actions::scrape::fetch(args, self.timeouts.http).await,
            Capability::ScheduleTask => {
                actions::schedule::register(args, &self.jobs_path).await
            }
        }
    }
}

/// Truncate on a char boundary at or below `max` and mark the cut
pub(crate) fn cap_output(text: &mut String, max: usize, marker: &str) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(marker);
}

/// Required string argument
pub(crate) fn str_arg(args: &serde_json::Value, key: &str) -> Result<String, ExecError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ExecError::InvalidArgs(format!("missing required argument '{}'", key)))
}

/// Optional string argument
pub(crate) fn opt_str_arg(args: &serde_json::Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Required list-of-strings argument
pub(crate) fn str_list_arg(args: &serde_json::Value, key: &str) -> Result<Vec<String>, ExecError> {
    let list = args
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ExecError::InvalidArgs(format!("missing required argument '{}'", key)))?;

    list.iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| ExecError::InvalidArgs(format!("'{}' must be a list of strings", key)))
        })
        .collect()
}
