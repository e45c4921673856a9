//! Remote-shell capability over ssh

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::actions::process::run_argv;
use crate::{opt_str_arg, str_arg, ExecError};

pub(crate) async fn run_ssh(
    args: &Value,
    workspace: &Path,
    timeout: Duration,
) -> Result<String, ExecError> {
    let host = str_arg(args, "host")?;
    let command = str_arg(args, "command")?;

    if host.starts_with('-') {
        return Err(ExecError::InvalidArgs("invalid host".to_string()));
    }

    let target = match opt_str_arg(args, "user") {
        Some(user) => format!("{}@{}", user, host),
        None => host,
    };

    // BatchMode: never hang on a password prompt
    let argv = vec![
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "ConnectTimeout=10".to_string(),
        target,
        command,
    ];

    run_argv("ssh", &argv, workspace, timeout).await
}
