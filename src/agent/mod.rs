//! Per-agent iteration driver (§4.5): the ReAct loop over the seven tools.
//!
//! Grounded on the teacher's `core/runner.rs::AgentGraph::run_task` — the
//! same "iterate the model + tool calls until a final answer or a safety
//! cap" shape — generalized from a single one-shot task execution to a
//! long-running per-agent driver that repeats iterations until convergence,
//! an external stop signal, or its own iteration cap, and that summarizes
//! each iteration into a durable `SynapticEntry` rather than a one-off
//! `CogOpsContext`.

pub mod llm;
pub mod tools;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::environment::Environment;
use crate::memory::entry::{IterationAction, SynapticEntry};
use crate::memory::SynapticMemory;
use crate::validator::Validator;

use self::llm::{LlmRuntime, LlmTurn, TranscriptEntry, TranscriptRole};
use self::tools::{execute_tool, get_tool_definitions, IterationSummary, ToolContext};

const SYSTEM_PROMPT: &str = "You are one of several independent agents collaborating on a shared \
set of file artifacts. You receive no direct task assignment: perceive the shared environment, \
pick a file based on its status and work recommendation, and either submit a solution or leave \
guidance for peers. Other agents may be working the same file at the same time — check active \
agent counts before committing to one.";

/// Five-state machine from §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Running,
    StoppedByConvergence,
    StoppedByCap,
    Retired,
}

/// What an orchestrator keeps about a spawned agent without holding the
/// `AgentLoop` itself across the `tokio::spawn` boundary — the stop flag for
/// cooperative cancellation (§5, §9) and a counter used to pick a
/// `scale_down` retirement target (§4.3: "the still-running agent with the
/// fewest successful submits").
#[derive(Clone)]
pub struct AgentHandle {
    pub agent_id: String,
    stop_flag: Arc<AtomicBool>,
    successful_submits: Arc<AtomicU32>,
}

impl AgentHandle {
    /// Cooperative stop: observed at the top of the next iteration. Hard
    /// cancellation of an in-flight LLM call is the orchestrator's
    /// `AbortHandle`, held separately (§4.3 SUPPLEMENT).
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn successful_submits(&self) -> u32 {
        self.successful_submits.load(Ordering::Relaxed)
    }
}

pub struct AgentLoop {
    agent_id: String,
    environment: Arc<Environment>,
    validator: Arc<dyn Validator>,
    memory: Arc<SynapticMemory>,
    llm: Arc<dyn LlmRuntime>,
    max_iterations: u32,
    tool_call_cap: u32,
    stop_flag: Arc<AtomicBool>,
    state: Mutex<AgentState>,
    completed_iterations: AtomicU32,
    successful_submits: Arc<AtomicU32>,
}

impl AgentLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_id: String,
        environment: Arc<Environment>,
        validator: Arc<dyn Validator>,
        memory: Arc<SynapticMemory>,
        llm: Arc<dyn LlmRuntime>,
        max_iterations: u32,
        tool_call_cap: u32,
    ) -> Self {
        AgentLoop {
            agent_id,
            environment,
            validator,
            memory,
            llm,
            max_iterations,
            tool_call_cap,
            stop_flag: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(AgentState::Idle),
            completed_iterations: AtomicU32::new(0),
            successful_submits: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            agent_id: self.agent_id.clone(),
            stop_flag: self.stop_flag.clone(),
            successful_submits: self.successful_submits.clone(),
        }
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock()
    }

    pub fn completed_iterations(&self) -> u32 {
        self.completed_iterations.load(Ordering::Relaxed)
    }

    /// The "done" heuristic from §4.3: completed-iteration count >= max.
    pub fn is_done(&self) -> bool {
        self.completed_iterations() >= self.max_iterations
    }

    /// Drives iterations until convergence, a stop signal, or the iteration
    /// cap (§4.5 step 6). Never panics on a per-iteration fault — those are
    /// logged and the loop proceeds (§4.6).
    pub async fn run(&self) {
        *self.state.lock() = AgentState::Running;

        for iteration in 1..=self.max_iterations {
            if self.stop_flag.load(Ordering::SeqCst) {
                *self.state.lock() = AgentState::Retired;
                return;
            }
            if self.environment.has_converged() {
                *self.state.lock() = AgentState::StoppedByConvergence;
                return;
            }

            self.run_iteration(iteration).await;
            self.completed_iterations.fetch_add(1, Ordering::Relaxed);

            if self.stop_flag.load(Ordering::SeqCst) {
                *self.state.lock() = AgentState::Retired;
                return;
            }
            if self.environment.has_converged() {
                *self.state.lock() = AgentState::StoppedByConvergence;
                return;
            }
        }

        *self.state.lock() = AgentState::StoppedByCap;
    }

    async fn run_iteration(&self, iteration: u32) {
        let memory_block = self.memory.read_synapse(&self.agent_id).await;

        let user_message = format!(
            "Iteration {}/{}. You are agent {}. Use the tools available to you. Begin by \
             perceiving the environment.\n\n{}\n\nConsider reading trail markers for the file \
             you choose before submitting.",
            iteration, self.max_iterations, self.agent_id, memory_block,
        );

        let summary = Mutex::new(IterationSummary::default());
        let ctx = ToolContext {
            environment: self.environment.as_ref(),
            validator: self.validator.as_ref(),
            memory: self.memory.as_ref(),
            agent_id: &self.agent_id,
            iteration: &summary,
            iteration_number: iteration,
        };

        let tool_defs = get_tool_definitions();
        let mut transcript: Vec<TranscriptEntry> = Vec::new();
        let mut final_text = String::new();
        let mut turns: u32 = 0;

        loop {
            if turns >= self.tool_call_cap {
                warn!(agent = %self.agent_id, iteration, "tool-call safety cap reached");
                break;
            }
            turns += 1;

            match self
                .llm
                .next_turn(SYSTEM_PROMPT, &user_message, &tool_defs, &transcript)
                .await
            {
                Ok(LlmTurn::ToolCall { name, arguments }) => {
                    transcript.push(TranscriptEntry {
                        role: TranscriptRole::ToolCall,
                        content: format!("{name}({arguments})"),
                    });
                    let result = execute_tool(&ctx, &name, &arguments).await;
                    transcript.push(TranscriptEntry {
                        role: TranscriptRole::ToolResult,
                        content: result,
                    });
                }
                Ok(LlmTurn::FinalText(text)) => {
                    final_text = text;
                    break;
                }
                Err(e) => {
                    // §4.6: LLM transport error aborts the iteration; the
                    // next iteration still runs.
                    warn!(agent = %self.agent_id, iteration, error = %e, "llm call failed, aborting iteration");
                    return;
                }
            }
        }

        let iteration_summary = summary.lock().clone();
        if iteration_summary.last_action == Some(IterationAction::Submit) && iteration_summary.last_success {
            self.successful_submits.fetch_add(1, Ordering::Relaxed);
        }

        let approach: String = final_text.chars().take(100).collect();
        let outcome = match iteration_summary.last_action {
            Some(IterationAction::Submit) => format!(
                "quality={:.2}, {}",
                iteration_summary.last_quality,
                if iteration_summary.last_success { "compiled" } else { "failed" },
            ),
            Some(IterationAction::CompileCheck) => format!(
                "compile_check {}",
                if iteration_summary.last_success { "succeeded" } else { "failed" },
            ),
            _ => "no submission".to_string(),
        };

        let entry = SynapticEntry {
            iteration,
            timestamp: chrono::Utc::now(),
            file_path: iteration_summary.last_file.clone().unwrap_or_default(),
            action: iteration_summary.last_action.unwrap_or(IterationAction::Explore),
            quality: iteration_summary.last_quality,
            success: iteration_summary.last_success,
            errors: iteration_summary.last_errors.clone(),
            approach,
            outcome,
        };
        self.memory.append_synaptic_entry(&self.agent_id, entry);

        info!(agent = %self.agent_id, iteration, "iteration complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{FileSlotSpec, TaskSpec};
    use crate::validator::PassthroughValidator;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    struct ScriptedLlm {
        turns: StdMutex<Vec<LlmTurn>>,
    }

    #[async_trait]
    impl LlmRuntime for ScriptedLlm {
        async fn next_turn(
            &self,
            _system_prompt: &str,
            _user_message: &str,
            _tool_defs: &serde_json::Value,
            _transcript: &[TranscriptEntry],
        ) -> Result<LlmTurn, String> {
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                Ok(LlmTurn::FinalText("no more moves".to_string()))
            } else {
                Ok(turns.remove(0))
            }
        }
    }

    #[tokio::test]
    async fn one_iteration_submits_and_logs_a_synaptic_entry() {
        let env = Arc::new(Environment::new(1.0));
        env.seed(&TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![FileSlotSpec {
                file_path: "a.x".into(),
                description: "".into(),
                depends_on: vec![],
            }],
        });

        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(crate::memory::SynapticMemory::bootstrap(dir.path().to_path_buf(), true, 10, 5).await);

        let llm = Arc::new(ScriptedLlm {
            turns: StdMutex::new(vec![
                LlmTurn::ToolCall {
                    name: "submit_solution".to_string(),
                    arguments: json!({
                        "file_path": "a.x",
                        "code": "x".repeat(200),
                        "declared_exports": ["f"],
                    }),
                },
                LlmTurn::FinalText("submitted a first pass".to_string()),
            ]),
        });

        let agent = AgentLoop::new(
            "A1".to_string(),
            env.clone(),
            Arc::new(PassthroughValidator),
            memory.clone(),
            llm,
            1,
            10,
        );

        agent.run().await;
        memory.flush().await;

        assert_eq!(agent.state(), AgentState::StoppedByCap);
        assert_eq!(agent.completed_iterations(), 1);
        assert_eq!(agent.handle().successful_submits(), 1);
        assert!(env.get_best_solution("a.x").is_some());

        let rendered = memory.read_synapse("A1").await;
        assert!(rendered.contains("a.x"));
    }

    #[tokio::test]
    async fn stop_flag_retires_the_agent_before_the_cap() {
        let env = Arc::new(Environment::new(1.0));
        env.seed(&TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![FileSlotSpec {
                file_path: "a.x".into(),
                description: "".into(),
                depends_on: vec![],
            }],
        });
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(crate::memory::SynapticMemory::bootstrap(dir.path().to_path_buf(), false, 10, 5).await);
        let llm = Arc::new(ScriptedLlm {
            turns: StdMutex::new(vec![]),
        });

        let agent = AgentLoop::new(
            "A1".to_string(),
            env,
            Arc::new(PassthroughValidator),
            memory,
            llm,
            50,
            10,
        );
        agent.handle().stop();
        agent.run().await;
        assert_eq!(agent.state(), AgentState::Retired);
    }
}
