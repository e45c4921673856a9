//! Reward counter and prompt mode
//!
//! One peanut per verified task success. Crossing the threshold flips the
//! prompt tone to expert; control flow never depends on the mode. The state
//! is passed explicitly into each run so sessions stay testable in
//! isolation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default peanut count beyond which the expert tone kicks in
pub const EXPERT_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardMode {
    Normal,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardState {
    pub peanuts: u64,
    pub mode: RewardMode,
}

impl Default for RewardState {
    fn default() -> Self {
        Self {
            peanuts: 0,
            mode: RewardMode::Normal,
        }
    }
}

impl RewardState {
    pub fn new() -> Self {
        Self::default()
    }

    fn mode_for(peanuts: u64, threshold: u64) -> RewardMode {
        if peanuts > threshold {
            RewardMode::Expert
        } else {
            RewardMode::Normal
        }
    }

    /// One more peanut; recomputes the mode against the given threshold
    pub fn record_success(&mut self, threshold: u64) {
        self.peanuts += 1;
        self.mode = Self::mode_for(self.peanuts, threshold);
        debug!("peanuts: {} ({:?})", self.peanuts, self.mode);
    }

    /// Load from disk; missing or unreadable files yield a fresh state
    pub async fn load(path: &Path, threshold: u64) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str::<RewardState>(&content) {
                Ok(mut state) => {
                    // mode is derived, never trusted from disk
                    state.mode = Self::mode_for(state.peanuts, threshold);
                    state
                }
                Err(_) => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mode_flips_above_threshold() {
        let mut state = RewardState::new();
        for _ in 0..EXPERT_THRESHOLD {
            state.record_success(EXPERT_THRESHOLD);
        }
        assert_eq!(state.peanuts, EXPERT_THRESHOLD);
        assert_eq!(state.mode, RewardMode::Normal);

        state.record_success(EXPERT_THRESHOLD);
        assert_eq!(state.mode, RewardMode::Expert);
    }

    #[test]
    fn test_configured_threshold_applies() {
        let mut state = RewardState::new();
        state.record_success(2);
        state.record_success(2);
        assert_eq!(state.mode, RewardMode::Normal);

        state.record_success(2);
        assert_eq!(state.peanuts, 3);
        assert_eq!(state.mode, RewardMode::Expert);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        let mut state = RewardState::new();
        state.record_success(EXPERT_THRESHOLD);
        state.record_success(EXPERT_THRESHOLD);
        state.save(&path).await.unwrap();

        let loaded = RewardState::load(&path, EXPERT_THRESHOLD).await;
        assert_eq!(loaded.peanuts, 2);
        assert_eq!(loaded.mode, RewardMode::Normal);
    }

    #[tokio::test]
    async fn test_load_missing_is_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let state = RewardState::load(&temp_dir.path().join("nope.json"), EXPERT_THRESHOLD).await;
        assert_eq!(state.peanuts, 0);
    }

    #[tokio::test]
    async fn test_load_recomputes_mode() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        tokio::fs::write(&path, r#"{"peanuts": 50, "mode": "normal"}"#)
            .await
            .unwrap();

        let state = RewardState::load(&path, EXPERT_THRESHOLD).await;
        assert_eq!(state.mode, RewardMode::Expert);

        // a loaded count already past a lower configured threshold flips too
        let state = RewardState::load(&path, 10).await;
        assert_eq!(state.mode, RewardMode::Expert);
    }
}
