//! Workspace confinement and command screening

use std::path::{Component, Path, PathBuf};

use crate::ExecError;

/// First tokens that are denied regardless of the capability allowlist
const DENIED_COMMANDS: &[&str] = &[
    "rm", "rmdir", "sudo", "su", "chmod", "chown", "dd", "mkfs", "shutdown", "reboot", "halt",
    "poweroff", "kill", "killall", "pkill", "passwd", "useradd", "userdel", "usermod", "shred",
];

/// Reject shell commands matching the destructive-pattern denylist.
///
/// The check runs on the first token of every pipeline/sequence segment, so
/// `ls && rm -rf /` is caught even though `ls` is harmless.
pub(crate) fn screen_command(command: &str) -> Result<(), ExecError> {
    if command.contains(":(){") {
        return Err(ExecError::Forbidden("fork bomb pattern denied".to_string()));
    }

    for segment in command.split(['|', ';', '\n', '&']) {
        let Some(first) = segment.split_whitespace().next() else {
            continue;
        };
        let program = first.rsplit('/').next().unwrap_or(first);
        if DENIED_COMMANDS.contains(&program) || program.starts_with("mkfs.") {
            return Err(ExecError::Forbidden(format!(
                "command '{}' is denied",
                program
            )));
        }
    }

    Ok(())
}

/// Resolve a path argument against the workspace and reject escapes.
///
/// Relative paths join the workspace root; the result is canonicalized
/// (parent-canonicalized for not-yet-existing files, so symlinks cannot
/// smuggle the target out) and must stay under the canonical workspace root.
pub(crate) async fn confine(path: &str, workspace_root: &Path) -> Result<PathBuf, ExecError> {
    let expanded = if !path.starts_with('/') && !path.starts_with('~') {
        workspace_root.join(path)
    } else {
        expand_tilde(path)
    };
    // canonicalize only resolves existing paths; `..` in a not-yet-existing
    // path must be folded away lexically or the prefix check below is blind
    let expanded = normalize(&expanded);

    let absolute = if expanded.exists() {
        match tokio::fs::canonicalize(&expanded).await {
            Ok(p) => p,
            Err(e) => return Err(ExecError::Failed(format!("cannot resolve path: {}", e))),
        }
    } else {
        let parent = expanded.parent().filter(|p| !p.as_os_str().is_empty());
        let file_name = expanded.file_name();

        match (parent, file_name) {
            (Some(parent), Some(file_name)) => {
                let canonical_parent = if parent.exists() {
                    tokio::fs::canonicalize(parent)
                        .await
                        .unwrap_or_else(|_| parent.to_path_buf())
                } else {
                    parent.to_path_buf()
                };
                canonical_parent.join(file_name)
            }
            _ => expanded,
        }
    };

    let canonical_workspace = if workspace_root.exists() {
        tokio::fs::canonicalize(workspace_root)
            .await
            .unwrap_or_else(|_| workspace_root.to_path_buf())
    } else {
        workspace_root.to_path_buf()
    };

    if !is_within(&absolute, &canonical_workspace) {
        return Err(ExecError::Traversal(format!(
            "path '{}' resolves outside the workspace",
            path
        )));
    }

    Ok(absolute)
}

/// Fold `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Component-wise prefix check; string prefix matching would accept
/// `/work-other` as being inside `/work`
fn is_within(path: &Path, workspace: &Path) -> bool {
    let path_components: Vec<_> = path.components().collect();
    let workspace_components: Vec<_> = workspace.components().collect();

    if path_components.len() < workspace_components.len() {
        return false;
    }

    workspace_components
        .iter()
        .enumerate()
        .all(|(i, comp)| path_components.get(i) == Some(comp))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
