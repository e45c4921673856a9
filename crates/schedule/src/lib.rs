//! Scheduled task registration
//!
//! Backs the `schedule_task` capability: tasks are registered with a schedule
//! and persisted to a JSON store. Execution of due jobs is the caller's
//! concern; this crate only answers "what is registered" and "what is due".

use chrono::Local;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

/// When a registered task should run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Schedule {
    /// Run once at a specific time
    #[serde(rename = "at")]
    At { at_ms: i64 },
    /// Run every N milliseconds
    #[serde(rename = "every")]
    Every { every_ms: i64 },
    /// Run on a cron expression
    #[serde(rename = "cron")]
    Cron { expr: String },
}

/// A registered task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Job ID
    pub id: String,
    /// The natural-language task to run
    pub task: String,
    /// Whether the job is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Schedule
    pub schedule: Schedule,
    /// Next scheduled run (ms since epoch)
    #[serde(default)]
    pub next_run_at_ms: Option<i64>,
    /// Last run time
    #[serde(default)]
    pub last_run_at_ms: Option<i64>,
    /// Created at (ms since epoch)
    pub created_at_ms: i64,
}

fn default_true() -> bool {
    true
}

impl Job {
    /// Create a new job
    pub fn new(task: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            id: Uuid::new_v4().to_string()[..8].to_string(),
            task: task.into(),
            enabled: true,
            schedule,
            next_run_at_ms: None,
            last_run_at_ms: None,
            created_at_ms: Local::now().timestamp_millis(),
        }
    }

    /// Compute the next run time from now
    pub fn compute_next_run(&self) -> Option<i64> {
        let now = Local::now().timestamp_millis();

        match &self.schedule {
            Schedule::At { at_ms } => {
                if *at_ms > now {
                    Some(*at_ms)
                } else {
                    None
                }
            }
            Schedule::Every { every_ms } => Some(now + every_ms),
            Schedule::Cron { expr } => cron_parser::parse(expr, Local::now())
                .ok()
                .map(|next| next.timestamp_millis()),
        }
    }

    /// Check whether the job is due at a specific time
    pub fn is_due_at(&self, timestamp_ms: i64) -> bool {
        if !self.enabled {
            return false;
        }
        self.next_run_at_ms.map(|t| timestamp_ms >= t).unwrap_or(false)
    }

    /// Check whether the job is due now
    pub fn is_due(&self) -> bool {
        self.is_due_at(Local::now().timestamp_millis())
    }
}

/// JSON-persisted job store
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JobStore {
    pub version: u32,
    pub jobs: Vec<Job>,
    #[serde(skip)]
    path: PathBuf,
}

impl JobStore {
    /// Create an empty store backed by the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            version: 1,
            jobs: Vec::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the store from disk, or return an empty one if the file is absent
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new(path));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let mut store: JobStore = serde_json::from_str(&content)?;
        store.path = path.to_path_buf();
        info!("loaded {} scheduled jobs", store.jobs.len());
        Ok(store)
    }

    /// Save the store to disk
    pub async fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&self.path, content).await?;
        debug!("saved {} scheduled jobs", self.jobs.len());
        Ok(())
    }

    /// Register a job and persist the store
    pub async fn add(&mut self, mut job: Job) -> std::io::Result<&Job> {
        job.next_run_at_ms = job.compute_next_run();
        self.jobs.push(job);
        self.save().await?;
        Ok(self.jobs.last().expect("job was just pushed"))
    }

    /// Remove a job by ID; returns whether anything was removed
    pub async fn remove(&mut self, id: &str) -> std::io::Result<bool> {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.id != id);
        let removed = self.jobs.len() < before;
        if removed {
            self.save().await?;
        }
        Ok(removed)
    }

    /// Find a job by ID
    pub fn find(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Jobs due at a specific time
    pub fn due_jobs_at(&self, timestamp_ms: i64) -> Vec<&Job> {
        self.jobs.iter().filter(|j| j.is_due_at(timestamp_ms)).collect()
    }

    /// Jobs due now
    pub fn due_jobs(&self) -> Vec<&Job> {
        self.due_jobs_at(Local::now().timestamp_millis())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============ Schedule Tests ============

    #[test]
    fn test_schedule_serialization() {
        let schedule = Schedule::Every { every_ms: 5000 };
        let json = serde_json::to_string(&schedule).unwrap();
        assert!(json.contains("\"kind\":\"every\""));
        assert!(json.contains("\"every_ms\":5000"));

        let deserialized: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule, deserialized);
    }

    #[test]
    fn test_schedule_deserialization_all_variants() {
        let at: Schedule = serde_json::from_str(r#"{"kind":"at","at_ms":1700000000000}"#).unwrap();
        assert!(matches!(at, Schedule::At { at_ms: 1700000000000 }));

        let every: Schedule = serde_json::from_str(r#"{"kind":"every","every_ms":3600000}"#).unwrap();
        assert!(matches!(every, Schedule::Every { every_ms: 3600000 }));

        let cron: Schedule = serde_json::from_str(r#"{"kind":"cron","expr":"0 0 * * *"}"#).unwrap();
        assert!(matches!(cron, Schedule::Cron { expr } if expr == "0 0 * * *"));
    }

    // ============ Job Tests ============

    #[test]
    fn test_job_new() {
        let job = Job::new("backup database", Schedule::Every { every_ms: 5000 });

        assert_eq!(job.task, "backup database");
        assert!(job.enabled);
        assert!(job.next_run_at_ms.is_none());
        assert_eq!(job.id.len(), 8);
    }

    #[test]
    fn test_compute_next_run_at() {
        let now = Local::now().timestamp_millis();

        let future = Job::new("t", Schedule::At { at_ms: now + 3_600_000 });
        assert_eq!(future.compute_next_run(), Some(now + 3_600_000));

        let past = Job::new("t", Schedule::At { at_ms: now - 3_600_000 });
        assert!(past.compute_next_run().is_none());
    }

    #[test]
    fn test_compute_next_run_every() {
        let job = Job::new("t", Schedule::Every { every_ms: 5000 });

        let before = Local::now().timestamp_millis();
        let next_run = job.compute_next_run().unwrap();
        let after = Local::now().timestamp_millis();

        assert!(next_run >= before + 5000);
        assert!(next_run <= after + 5000);
    }

    #[test]
    fn test_compute_next_run_cron() {
        let job = Job::new("t", Schedule::Cron { expr: "* * * * *".to_string() });

        let now = Local::now().timestamp_millis();
        let next_run = job.compute_next_run().unwrap();
        assert!(next_run > now);
        assert!(next_run <= now + 60_000);
    }

    #[test]
    fn test_is_due_at() {
        let mut job = Job::new("t", Schedule::Every { every_ms: 5000 });
        job.next_run_at_ms = Some(1000);

        assert!(!job.is_due_at(500));
        assert!(job.is_due_at(1000));
        assert!(job.is_due_at(1500));

        job.enabled = false;
        assert!(!job.is_due_at(1500));
    }

    #[test]
    fn test_is_due_no_next_run() {
        let job = Job::new("t", Schedule::Every { every_ms: 5000 });
        assert!(!job.is_due());
    }

    // ============ JobStore Tests ============

    #[tokio::test]
    async fn test_store_add_and_find() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("jobs.json");

        let mut store = JobStore::new(&path);
        let job = Job::new("check disk space", Schedule::Every { every_ms: 5000 });
        let id = job.id.clone();

        store.add(job).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.jobs[0].next_run_at_ms.is_some());
        assert_eq!(store.find(&id).unwrap().task, "check disk space");
        assert!(store.find("nonexistent").is_none());
    }

    #[tokio::test]
    async fn test_store_remove() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("jobs.json");

        let mut store = JobStore::new(&path);
        let job = Job::new("t", Schedule::Every { every_ms: 5000 });
        let id = job.id.clone();
        store.add(job).await.unwrap();

        assert!(store.remove(&id).await.unwrap());
        assert!(store.is_empty());
        assert!(!store.remove(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_store_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("jobs.json");

        {
            let mut store = JobStore::new(&path);
            store
                .add(Job::new("nightly report", Schedule::Cron { expr: "0 0 * * *".to_string() }))
                .await
                .unwrap();
        }

        assert!(path.exists());

        let store = JobStore::load(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.jobs[0].task, "nightly report");
    }

    #[tokio::test]
    async fn test_store_load_nonexistent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("missing").join("jobs.json");

        let store = JobStore::load(&path).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_due_jobs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("jobs.json");
        let now = Local::now().timestamp_millis();

        let mut store = JobStore::new(&path);

        let mut due = Job::new("due", Schedule::Every { every_ms: 5000 });
        due.next_run_at_ms = Some(now - 1000);
        store.jobs.push(due);

        let mut not_due = Job::new("not_due", Schedule::Every { every_ms: 5000 });
        not_due.next_run_at_ms = Some(now + 3_600_000);
        store.jobs.push(not_due);

        let mut disabled = Job::new("disabled", Schedule::Every { every_ms: 5000 });
        disabled.next_run_at_ms = Some(now - 1000);
        disabled.enabled = false;
        store.jobs.push(disabled);

        let hits = store.due_jobs_at(now);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].task, "due");
    }
}
