//! Version-control capability: git via argument arrays

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::actions::process::run_argv;
use crate::{str_list_arg, ExecError};

const GIT_ALLOWED: &[&str] = &[
    "status", "log", "diff", "add", "commit", "branch", "checkout", "pull", "push", "clone",
    "init", "remote", "show", "stash",
];

pub(crate) async fn run_git(
    args: &Value,
    workspace: &Path,
    timeout: Duration,
) -> Result<String, ExecError> {
    let argv = str_list_arg(args, "args")?;

    let action = argv
        .first()
        .ok_or_else(|| ExecError::InvalidArgs("git requires at least one argument".to_string()))?;

    if !GIT_ALLOWED.contains(&action.as_str()) {
        return Err(ExecError::Forbidden(format!(
            "git action '{}' is not allowlisted",
            action
        )));
    }

    run_argv("git", &argv, workspace, timeout).await
}
