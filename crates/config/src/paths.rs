//! Well-known file locations under the peanut data directory

use std::path::PathBuf;

/// Peanut data directory (~/.peanut)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .expect("failed to locate home directory")
        .join(".peanut")
}

/// Configuration file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Default task workspace
pub fn workspace_path() -> PathBuf {
    data_dir().join("workspace")
}

/// Append-only memory log
pub fn memory_path() -> PathBuf {
    data_dir().join("memory.jsonl")
}

/// Persisted reward state
pub fn state_path() -> PathBuf {
    data_dir().join("state.json")
}

/// Scheduled job store
pub fn jobs_path() -> PathBuf {
    data_dir().join("jobs.json")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
