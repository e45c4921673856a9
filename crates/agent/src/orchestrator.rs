//! The retrieve, propose, execute, audit loop
//!
//! One task runs as a bounded loop: retrieve similar past successes, ask the
//! gateway for a tool call, execute it through the gate, audit the outcome,
//! then either finalize or retry with a corrected call. Two independent
//! bounds guarantee termination: the per-task retry ceiling and the outer
//! iteration budget. Memory and the peanut counter advance only on an
//! audit-confirmed success whose execution actually completed.

use std::sync::Arc;

use tracing::{debug, info, warn};

use peanut_executor::{specs, ErrorKind, Executor, ToolCall, ToolResult};
use peanut_gateway::{function_tool, ChatReply, Gateway, Message, Tool};
use peanut_memory::{render_hints, Embedder, MemoryRecord, MemoryStore};

use crate::auditor::{Auditor, NextAction};
use crate::context::{retry_note, system_prompt};
use crate::reward::{RewardState, EXPERT_THRESHOLD};
use crate::{DEFAULT_MAX_ITERATIONS, RETRY_CEILING};

/// Terminal report of one task run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub summary: String,
    /// Last execution result, absent when the task finished without a tool
    pub result: Option<ToolResult>,
    pub iterations: u32,
    pub error: Option<ErrorKind>,
}

pub struct Orchestrator {
    gateway: Arc<dyn Gateway>,
    executor: Executor,
    memory: Arc<MemoryStore>,
    embedder: Embedder,
    auditor: Auditor,
    max_iterations: u32,
    retry_ceiling: u32,
    top_k: usize,
    expert_threshold: u64,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        executor: Executor,
        memory: Arc<MemoryStore>,
        embedder: Embedder,
    ) -> Self {
        let auditor = Auditor::new(Arc::clone(&gateway), RETRY_CEILING);
        Self {
            gateway,
            executor,
            memory,
            embedder,
            auditor,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            retry_ceiling: RETRY_CEILING,
            top_k: peanut_memory::DEFAULT_TOP_K,
            expert_threshold: EXPERT_THRESHOLD,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Corrective-attempt ceiling per task; the auditor enforces the same
    /// bound when normalizing verdicts
    pub fn with_retry_ceiling(mut self, retry_ceiling: u32) -> Self {
        self.retry_ceiling = retry_ceiling;
        self.auditor = Auditor::new(Arc::clone(&self.gateway), retry_ceiling);
        self
    }

    /// Number of memory records retrieved as prompt hints
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Peanut count beyond which the prompt tone flips to expert
    pub fn with_expert_threshold(mut self, expert_threshold: u64) -> Self {
        self.expert_threshold = expert_threshold;
        self
    }

    /// Run one task to a terminal outcome. The reward state advances only
    /// when the audit confirms success on a completed execution.
    pub async fn run(&self, task: &str, state: &mut RewardState) -> crate::Result<RunOutcome> {
        let query = self.embedder.embed(task).await;
        let hits = self.memory.retrieve(&query, self.top_k).await;
        if !hits.is_empty() {
            debug!("retrieved {} memory hints", hits.len());
        }
        let hints = render_hints(&hits);

        let mut messages = vec![
            Message::system(system_prompt(state.mode, &hints)),
            Message::user(task),
        ];
        let tools = advertised_tools();

        let mut retries = 0u32;
        let mut iterations = 0u32;
        let mut pending: Option<ToolCall> = None;

        while iterations < self.max_iterations {
            iterations += 1;

            let call = match pending.take() {
                Some(call) => call,
                None => {
                    let reply = self.gateway.chat(&messages, &tools).await?;
                    match proposed_call(&reply) {
                        Some(call) => {
                            messages.push(Message::assistant(format!(
                                "calling {} with {}",
                                call.name, call.arguments
                            )));
                            call
                        }
                        None if !reply.content.trim().is_empty() => {
                            // a direct answer needs no tool, no memory, no peanut
                            info!("task answered directly without a tool");
                            return Ok(RunOutcome {
                                success: true,
                                summary: reply.content,
                                result: None,
                                iterations,
                                error: None,
                            });
                        }
                        None => {
                            return Ok(RunOutcome {
                                success: false,
                                summary: "the model produced neither a tool call nor an answer"
                                    .to_string(),
                                result: None,
                                iterations,
                                error: Some(ErrorKind::MalformedOutput),
                            });
                        }
                    }
                }
            };

            // corrected calls from the audit pass through the same gate
            let result = self.executor.execute(&call).await;
            debug!(
                "executed {} in {}ms (ok: {})",
                call.name, result.duration_ms, result.ok
            );

            let verdict = self.auditor.audit(task, &call, &result, retries).await;

            if verdict.success && result.ok {
                self.remember(task, &call, &result).await;
                state.record_success(self.expert_threshold);
                info!("task complete, peanuts: {}", state.peanuts);
                return Ok(RunOutcome {
                    success: true,
                    summary: result.output.clone(),
                    result: Some(result),
                    iterations,
                    error: None,
                });
            }

            match verdict.next_action {
                NextAction::Finalize => {
                    let error = if retries >= self.retry_ceiling {
                        Some(ErrorKind::RetryCeilingExceeded)
                    } else {
                        result.error
                    };
                    return Ok(RunOutcome {
                        success: false,
                        summary: verdict.analysis,
                        result: Some(result),
                        iterations,
                        error,
                    });
                }
                NextAction::Retry => {
                    retries += 1;
                    messages.push(Message::user(retry_note(&verdict.analysis, &result)));

                    if let Some(improved) = verdict.improved_input {
                        let violation = matches!(
                            result.error,
                            Some(ErrorKind::Forbidden) | Some(ErrorKind::PathTraversal)
                        );
                        if violation && improved == call {
                            // a rejected action never runs again unchanged
                            debug!("dropping unchanged corrected call after a gate rejection");
                        } else {
                            pending = Some(improved);
                        }
                    }
                }
            }
        }

        warn!("iteration budget exhausted for task");
        Ok(RunOutcome {
            success: false,
            summary: "the iteration budget was exhausted before the task finished".to_string(),
            result: None,
            iterations,
            error: Some(ErrorKind::IterationBudgetExceeded),
        })
    }

    /// Write one success record; a failed write costs the record, not the run
    async fn remember(&self, task: &str, call: &ToolCall, result: &ToolResult) {
        let embedding = self.embedder.embed(task).await;
        let record = MemoryRecord::new(task, call.clone(), result.output.clone(), embedding);
        if let Err(e) = self.memory.add(record).await {
            warn!("failed to persist memory record: {}", e);
        }
    }
}

/// Every registered capability, in gateway wire form
fn advertised_tools() -> Vec<Tool> {
    specs()
        .into_iter()
        .map(|spec| function_tool(spec.name, spec.description, spec.parameters))
        .collect()
}

/// First proposed tool call of a reply, if any
fn proposed_call(reply: &ChatReply) -> Option<ToolCall> {
    reply
        .tool_calls
        .first()
        .map(|def| ToolCall::new(def.function.name.clone(), def.function.arguments.clone()))
}
