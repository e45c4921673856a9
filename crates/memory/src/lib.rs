//! Append-only memory of successful task→tool mappings
//!
//! Each successful task leaves one JSONL record behind: the task text, the
//! tool call that solved it, a truncated result preview, and an embedding.
//! Retrieval scores every record by cosine similarity and returns the
//! top-k, most recent first on ties. Records are never mutated or deleted.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use peanut_executor::ToolCall;
use peanut_gateway::Gateway;

pub mod embedding;

pub use embedding::{cosine, hash_embedding, Embedder, FALLBACK_DIM};

/// Similarity floor below which records are not considered relevant
pub const MIN_SIMILARITY: f32 = 0.10;

/// Default number of records returned by retrieval
pub const DEFAULT_TOP_K: usize = 2;

/// Result previews are truncated to this many characters
pub const PREVIEW_CAP: usize = 600;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("memory io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embedding dimension {got} does not match store dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// One remembered success; append-only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub task: String,
    pub tool_call: ToolCall,
    pub result_preview: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        task: impl Into<String>,
        tool_call: ToolCall,
        result_preview: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let mut preview: String = result_preview.into();
        if preview.len() > PREVIEW_CAP {
            let mut cut = PREVIEW_CAP;
            while !preview.is_char_boundary(cut) {
                cut -= 1;
            }
            preview.truncate(cut);
            preview.push_str("...");
        }

        Self {
            task: task.into(),
            tool_call,
            result_preview: preview,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// JSONL-backed store with a fixed embedding dimension
pub struct MemoryStore {
    path: PathBuf,
    dim: usize,
    records: Mutex<Vec<MemoryRecord>>,
}

impl MemoryStore {
    /// Open (or create) a store. Existing records are loaded; corrupt lines
    /// and records with a different embedding dimension are skipped.
    pub async fn open(path: impl AsRef<Path>, dim: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();

        if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<MemoryRecord>(line) {
                    Ok(record) if record.embedding.len() == dim => records.push(record),
                    Ok(record) => warn!(
                        "skipping memory line {}: dimension {} != {}",
                        line_no + 1,
                        record.embedding.len(),
                        dim
                    ),
                    Err(e) => warn!("skipping corrupt memory line {}: {}", line_no + 1, e),
                }
            }
            debug!("loaded {} memory records from {:?}", records.len(), path);
        }

        Ok(Self {
            path,
            dim,
            records: Mutex::new(records),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Append one record. Rejects mismatched embedding dimensions before
    /// anything touches the file; the append is flushed before the lock is
    /// released so concurrent readers always see complete lines.
    pub async fn add(&self, record: MemoryRecord) -> Result<()> {
        if record.embedding.len() != self.dim {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dim,
                got: record.embedding.len(),
            });
        }

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut records = self.records.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        records.push(record);
        debug!("memory now holds {} records", records.len());
        Ok(())
    }

    /// Top-`k` records by cosine similarity to `embedding`, most recent
    /// first on ties. Empty store yields an empty vec, never an error.
    pub async fn retrieve(&self, embedding: &[f32], k: usize) -> Vec<MemoryRecord> {
        let records = self.records.lock().await;

        let mut scored: Vec<(usize, f32)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine(embedding, &r.embedding)))
            .filter(|(_, score)| *score >= MIN_SIMILARITY)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(b.0.cmp(&a.0))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| records[i].clone())
            .collect()
    }
}

/// Embedding dimension for a store path.
///
/// An existing store keeps the dimension of its first valid record, so a
/// store created with gateway embeddings enforces that dimension on every
/// later open regardless of gateway health. A fresh store adopts the
/// gateway's dimension, measured with one embedding call; only when no
/// gateway is given or that call fails does it fall back to
/// [`FALLBACK_DIM`].
pub async fn resolve_dimension(path: impl AsRef<Path>, gateway: Option<&dyn Gateway>) -> usize {
    if let Some(dim) = stored_dimension(path.as_ref()).await {
        debug!("memory store carries dimension {}", dim);
        return dim;
    }

    if let Some(gateway) = gateway {
        match gateway.embed("dimension check").await {
            Ok(vector) if !vector.is_empty() => {
                debug!("adopting gateway embedding dimension {}", vector.len());
                return vector.len();
            }
            Ok(_) => warn!("gateway returned an empty embedding, using fallback dimension"),
            Err(e) => warn!("gateway unreachable, using fallback dimension: {}", e),
        }
    }

    FALLBACK_DIM
}

/// Dimension of the first valid record in an existing store file
async fn stored_dimension(path: &Path) -> Option<usize> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    content
        .lines()
        .filter_map(|line| serde_json::from_str::<MemoryRecord>(line).ok())
        .map(|record| record.embedding.len())
        .next()
}

/// Render retrieved records as a hint block for the next prompt
pub fn render_hints(records: &[MemoryRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut block = String::from("Relevant past successes:\n");
    for record in records {
        block.push_str(&format!(
            "- task: {}\n  tool: {} {}\n  result: {}\n",
            record.task,
            record.tool_call.name,
            record.tool_call.arguments,
            record.result_preview
        ));
    }
    block
}
