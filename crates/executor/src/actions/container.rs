//! Container capability: docker via argument arrays

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::actions::process::run_argv;
use crate::{str_list_arg, ExecError};

const DOCKER_ALLOWED: &[&str] = &[
    "ps", "images", "run", "stop", "start", "logs", "pull", "build", "inspect", "rm", "rmi",
    "exec", "version", "info",
];

pub(crate) async fn run_docker(
    args: &Value,
    workspace: &Path,
    timeout: Duration,
) -> Result<String, ExecError> {
    let argv = str_list_arg(args, "args")?;

    let action = argv.first().ok_or_else(|| {
        ExecError::InvalidArgs("docker requires at least one argument".to_string())
    })?;

    if !DOCKER_ALLOWED.contains(&action.as_str()) {
        return Err(ExecError::Forbidden(format!(
            "docker action '{}' is not allowlisted",
            action
        )));
    }

    run_argv("docker", &argv, workspace, timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_disallowed_action_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let args = json!({"args": ["system", "prune", "-af"]});

        let result = run_docker(&args, temp_dir.path(), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ExecError::Forbidden(_))));
    }
}
