//! The agent core loop
//!
//! Wires the pieces together: memory retrieval, tool-call generation through
//! the gateway, gated execution, and the reflection audit that decides
//! between retrying with a corrected input and finalizing.

use thiserror::Error;

pub mod auditor;
pub mod context;
pub mod orchestrator;
pub mod reward;

pub use auditor::{Auditor, NextAction, ReflectionVerdict};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use reward::{RewardMode, RewardState};

/// Per-task corrective-attempt ceiling
pub const RETRY_CEILING: u32 = 3;

/// Default hard bound on tool calls per task
pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("gateway error: {0}")]
    Gateway(#[from] peanut_gateway::GatewayError),

    #[error("memory error: {0}")]
    Memory(#[from] peanut_memory::MemoryError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
