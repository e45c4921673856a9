//! Closed capability registry
//!
//! Adding a tool means adding a variant here plus its schema entry; names not
//! in this set are denied by default.

use serde_json::{json, Value};

/// Supported capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Shell,
    ReadFile,
    WriteFile,
    ListDirectory,
    HttpRequest,
    Git,
    Docker,
    SqlQuery,
    RemoteShell,
    Scrape,
    ScheduleTask,
}

impl Capability {
    /// Every supported capability, in advertisement order
    pub fn all() -> &'static [Capability] {
        &[
            Capability::Shell,
            Capability::ReadFile,
            Capability::WriteFile,
            Capability::ListDirectory,
            Capability::HttpRequest,
            Capability::Git,
            Capability::Docker,
            Capability::SqlQuery,
            Capability::RemoteShell,
            Capability::Scrape,
            Capability::ScheduleTask,
        ]
    }

    /// Registry lookup; `None` means the name is not allowlisted
    pub fn from_name(name: &str) -> Option<Capability> {
        Capability::all().iter().copied().find(|c| c.name() == name)
    }

    /// Wire name advertised to the model
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Shell => "shell",
            Capability::ReadFile => "read_file",
            Capability::WriteFile => "write_file",
            Capability::ListDirectory => "list_directory",
            Capability::HttpRequest => "http_request",
            Capability::Git => "git",
            Capability::Docker => "docker",
            Capability::SqlQuery => "sql_query",
            Capability::RemoteShell => "remote_shell",
            Capability::Scrape => "scrape",
            Capability::ScheduleTask => "schedule_task",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Capability::Shell => "Run a shell command inside the workspace.",
            Capability::ReadFile => "Read a file from the workspace.",
            Capability::WriteFile => "Write content to a file in the workspace.",
            Capability::ListDirectory => "List entries of a workspace directory.",
            Capability::HttpRequest => "Perform an HTTP request and return status and body.",
            Capability::Git => "Run an allowlisted git subcommand in the workspace.",
            Capability::Docker => "Run an allowlisted docker subcommand.",
            Capability::SqlQuery => "Run a SQL statement against a SQLite database in the workspace.",
            Capability::RemoteShell => "Run a command on a remote host over ssh.",
            Capability::Scrape => "Fetch a web page and return its readable text.",
            Capability::ScheduleTask => "Register a task to run on a schedule.",
        }
    }

    /// JSON schema for the capability's arguments
    pub fn parameters(&self) -> Value {
        match self {
            Capability::Shell => object_schema(
                json!({
                    "command": {"type": "string", "description": "Command to run"}
                }),
                &["command"],
            ),
            Capability::ReadFile => object_schema(
                json!({
                    "path": {"type": "string", "description": "File path, relative to the workspace"}
                }),
                &["path"],
            ),
            Capability::WriteFile => object_schema(
                json!({
                    "path": {"type": "string", "description": "File path, relative to the workspace"},
                    "content": {"type": "string", "description": "Content to write"}
                }),
                &["path", "content"],
            ),
            Capability::ListDirectory => object_schema(
                json!({
                    "path": {"type": "string", "description": "Directory path, defaults to the workspace root"}
                }),
                &[],
            ),
            Capability::HttpRequest => object_schema(
                json!({
                    "url": {"type": "string", "description": "Request URL"},
                    "method": {"type": "string", "description": "GET, POST, PUT, DELETE, HEAD or PATCH"},
                    "body": {"type": "string", "description": "Request body"}
                }),
                &["url"],
            ),
            Capability::Git => object_schema(
                json!({
                    "args": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "git arguments, e.g. [\"status\", \"--short\"]"
                    }
                }),
                &["args"],
            ),
            Capability::Docker => object_schema(
                json!({
                    "args": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "docker arguments, e.g. [\"ps\", \"-a\"]"
                    }
                }),
                &["args"],
            ),
            Capability::SqlQuery => object_schema(
                json!({
                    "database": {"type": "string", "description": "SQLite database path in the workspace"},
                    "query": {"type": "string", "description": "SQL statement"}
                }),
                &["database", "query"],
            ),
            Capability::RemoteShell => object_schema(
                json!({
                    "host": {"type": "string", "description": "Remote host"},
                    "user": {"type": "string", "description": "Remote user"},
                    "command": {"type": "string", "description": "Command to run"}
                }),
                &["host", "command"],
            ),
            Capability::Scrape => object_schema(
                json!({
                    "url": {"type": "string", "description": "Page URL"}
                }),
                &["url"],
            ),
            Capability::ScheduleTask => object_schema(
                json!({
                    "task": {"type": "string", "description": "Task to run later"},
                    "schedule": {
                        "type": "object",
                        "description": "{\"kind\": \"at\"|\"every\"|\"cron\", ...}"
                    }
                }),
                &["task", "schedule"],
            ),
        }
    }
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// A tool declaration ready to advertise to the gateway
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Declarations for every registered capability
pub fn specs() -> Vec<ToolSpec> {
    Capability::all()
        .iter()
        .map(|c| ToolSpec {
            name: c.name(),
            description: c.description(),
            parameters: c.parameters(),
        })
        .collect()
}
