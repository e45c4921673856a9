//! Workspace-confined filesystem capabilities

use std::path::Path;

use serde_json::Value;

use crate::guard::confine;
use crate::{opt_str_arg, str_arg, ExecError};

pub(crate) async fn read_file(args: &Value, workspace: &Path) -> Result<String, ExecError> {
    let path = str_arg(args, "path")?;
    let resolved = confine(&path, workspace).await?;

    tokio::fs::read_to_string(&resolved)
        .await
        .map_err(|e| ExecError::Failed(format!("cannot read '{}': {}", path, e)))
}

pub(crate) async fn write_file(args: &Value, workspace: &Path) -> Result<String, ExecError> {
    let path = str_arg(args, "path")?;
    let content = str_arg(args, "content")?;
    let resolved = confine(&path, workspace).await?;

    if let Some(parent) = resolved.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExecError::Failed(format!("cannot create parent dirs: {}", e)))?;
    }

    tokio::fs::write(&resolved, &content)
        .await
        .map_err(|e| ExecError::Failed(format!("cannot write '{}': {}", path, e)))?;

    Ok(format!("wrote {} bytes to {}", content.len(), path))
}

pub(crate) async fn list_directory(args: &Value, workspace: &Path) -> Result<String, ExecError> {
    let path = opt_str_arg(args, "path").unwrap_or_else(|| ".".to_string());
    let resolved = confine(&path, workspace).await?;

    let mut entries = tokio::fs::read_dir(&resolved)
        .await
        .map_err(|e| ExecError::Failed(format!("cannot list '{}': {}", path, e)))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ExecError::Failed(format!("cannot list '{}': {}", path, e)))?
    {
        let mut name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    if names.is_empty() {
        Ok("(empty directory)".to_string())
    } else {
        Ok(names.join("\n"))
    }
}
