//! Scheduled-task registration capability

use std::path::Path;

use peanut_schedule::{Job, JobStore, Schedule};
use serde_json::Value;

use crate::{str_arg, ExecError};

pub(crate) async fn register(args: &Value, jobs_path: &Path) -> Result<String, ExecError> {
    let task = str_arg(args, "task")?;

    let schedule_value = args
        .get("schedule")
        .cloned()
        .ok_or_else(|| ExecError::InvalidArgs("missing required argument 'schedule'".to_string()))?;
    let schedule: Schedule = serde_json::from_value(schedule_value)
        .map_err(|e| ExecError::InvalidArgs(format!("invalid schedule: {}", e)))?;

    // cron-parser chokes on malformed expressions; reject before storing
    if let Schedule::Cron { ref expr } = schedule {
        if expr.split_whitespace().count() != 5 {
            return Err(ExecError::InvalidArgs(format!(
                "cron expression '{}' must have 5 fields",
                expr
            )));
        }
    }

    let mut store = JobStore::load(jobs_path)
        .await
        .map_err(|e| ExecError::Failed(format!("cannot load job store: {}", e)))?;

    let job = store
        .add(Job::new(task, schedule))
        .await
        .map_err(|e| ExecError::Failed(format!("cannot save job store: {}", e)))?;

    Ok(format!("scheduled job {} ({:?})", job.id, job.schedule))
}
