//! Peanut command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use peanut_agent::{Orchestrator, RewardMode, RewardState};
use peanut_config::{self, Config};
use peanut_executor::{Executor, Timeouts};
use peanut_gateway::{Gateway, OllamaGateway};
use peanut_memory::{resolve_dimension, Embedder, MemoryStore};
use peanut_schedule::{Job, JobStore, Schedule};

/// Initialize config and workspace
pub async fn init_command() -> Result<()> {
    let config = peanut_config::init().await?;

    println!("✓ Peanut initialized");
    println!("  Config:    {}", peanut_config::config_path().display());
    println!("  Workspace: {}", config.workspace_path().display());
    println!("  Gateway:   {}", config.gateway.base_url);
    Ok(())
}

fn build_gateway(config: &Config) -> Arc<dyn Gateway> {
    Arc::new(
        OllamaGateway::new(
            &config.gateway.base_url,
            &config.gateway.chat_model,
            &config.gateway.embed_model,
        )
        .with_timeouts(
            Duration::from_secs(config.gateway.chat_timeout_secs),
            Duration::from_secs(config.gateway.embed_timeout_secs),
        ),
    )
}

fn build_executor(config: &Config) -> Executor {
    Executor::new(config.workspace_path(), peanut_config::jobs_path()).with_timeouts(Timeouts {
        shell: Duration::from_secs(config.executor.shell_timeout_secs),
        http: Duration::from_secs(config.executor.http_timeout_secs),
        container: Duration::from_secs(config.executor.container_timeout_secs),
        remote: Duration::from_secs(config.executor.remote_timeout_secs),
    })
}

/// Run one task to a terminal outcome
pub async fn run_command(task: String) -> Result<bool> {
    let config = Config::load().await?;
    tokio::fs::create_dir_all(config.workspace_path()).await?;

    let gateway = build_gateway(&config);
    let executor = build_executor(&config);

    // an existing store keeps its dimension; a fresh one adopts the
    // gateway's, falling back to the hash dimension when it is unreachable
    let memory_path = peanut_config::memory_path();
    let dim = resolve_dimension(&memory_path, Some(gateway.as_ref())).await;
    let memory = Arc::new(MemoryStore::open(&memory_path, dim).await?);
    let embedder = Embedder::new(Arc::clone(&gateway), dim);

    let orchestrator = Orchestrator::new(gateway, executor, memory, embedder)
        .with_max_iterations(config.agent.max_iterations)
        .with_retry_ceiling(config.agent.retry_ceiling)
        .with_top_k(config.agent.memory_top_k)
        .with_expert_threshold(config.agent.expert_threshold);

    let state_path = peanut_config::state_path();
    let mut state = RewardState::load(&state_path, config.agent.expert_threshold).await;
    let peanuts_before = state.peanuts;

    info!("running task: {}", task);
    let outcome = orchestrator.run(&task, &mut state).await?;

    if state.peanuts != peanuts_before {
        state.save(&state_path).await?;
    }

    if outcome.success {
        println!("✓ Task complete ({} step(s))", outcome.iterations);
        if !outcome.summary.is_empty() {
            println!("{}", outcome.summary);
        }
        if state.peanuts != peanuts_before {
            println!("🥜 Peanuts: {}", state.peanuts);
        }
    } else {
        println!("✗ Task failed ({} step(s))", outcome.iterations);
        if let Some(kind) = outcome.error {
            println!("  Reason: {}", kind);
        }
        if !outcome.summary.is_empty() {
            println!("  {}", outcome.summary);
        }
    }

    Ok(outcome.success)
}

/// Show agent status
pub async fn status_command() -> Result<()> {
    let config = Config::load().await?;
    let state = RewardState::load(&peanut_config::state_path(), config.agent.expert_threshold).await;

    println!("🥜 Peanut Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Gateway:     {}", config.gateway.base_url);
    println!("Chat model:  {}", config.gateway.chat_model);
    println!("Embed model: {}", config.gateway.embed_model);
    println!("Workspace:   {}", config.workspace_path().display());
    println!(
        "Peanuts:     {} ({})",
        state.peanuts,
        match state.mode {
            RewardMode::Normal => "normal",
            RewardMode::Expert => "expert",
        }
    );

    let memory_path = peanut_config::memory_path();
    if memory_path.exists() {
        let dim = resolve_dimension(&memory_path, None).await;
        let store = MemoryStore::open(&memory_path, dim).await?;
        println!("Memories:    {}", store.len().await);
    } else {
        println!("Memories:    0");
    }

    Ok(())
}

/// List scheduled jobs
pub async fn jobs_list_command() -> Result<()> {
    let store = JobStore::load(peanut_config::jobs_path()).await?;

    if store.is_empty() {
        println!("No scheduled jobs");
        return Ok(());
    }

    println!("Scheduled jobs:");
    for job in &store.jobs {
        let status = if job.enabled { "enabled" } else { "disabled" };
        println!(
            "  {} - {} ({}, {})",
            job.id,
            job.task,
            status,
            match &job.schedule {
                Schedule::Every { every_ms } => format!("every {}s", every_ms / 1000),
                Schedule::Cron { expr } => format!("cron: {}", expr),
                Schedule::At { at_ms } => format!("at: {}", at_ms),
            }
        );
    }

    Ok(())
}

/// Add a scheduled job
pub async fn jobs_add_command(task: String, every: Option<u64>, cron: Option<String>) -> Result<()> {
    let schedule = if let Some(seconds) = every {
        Schedule::Every {
            every_ms: (seconds * 1000) as i64,
        }
    } else if let Some(expr) = cron {
        Schedule::Cron { expr }
    } else {
        anyhow::bail!("Either --every or --cron must be specified");
    };

    let mut store = JobStore::load(peanut_config::jobs_path()).await?;
    let job = store.add(Job::new(task, schedule)).await?;
    println!("✓ Job {} added", job.id);

    Ok(())
}

/// Remove a scheduled job
pub async fn jobs_remove_command(id: String) -> Result<()> {
    let mut store = JobStore::load(peanut_config::jobs_path()).await?;

    if store.remove(&id).await? {
        println!("✓ Job {} removed", id);
    } else {
        println!("✗ Job {} not found", id);
    }

    Ok(())
}
