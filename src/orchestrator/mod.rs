//! The orchestrator (§4.3): lifecycle only, never assigns work itself.
//!
//! Grounded on the teacher's `core/runner.rs::AgentGraph` for two patterns:
//! a shared runtime so repeated construction doesn't exhaust OS threads
//! (here: the caller's ambient tokio runtime, since this crate is a library
//! rather than a `pyo3` extension module with its own `OnceLock<Runtime>`),
//! and the `Mutex<HashMap<TaskId, AbortHandle>>` bookkeeping used to
//! hard-kill a task mid-flight, generalized here to `tokio::task::JoinSet`
//! plus per-agent `AgentHandle` cooperative-stop flags.

pub mod config;
pub mod scaling;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time;
use tracing::{info, warn};

pub use config::HiveConfig;
use scaling::ScalingAction;

use crate::agent::llm::LlmRuntime;
use crate::agent::{AgentHandle, AgentLoop};
use crate::environment::Environment;
use crate::error::HiveResult;
use crate::memory::SynapticMemory;
use crate::task::TaskSpec;
use crate::validator::Validator;

const SWARM_MEMORY_DIR: &str = ".swarm-memory";
/// §5: "A global orchestrator wall-clock (= maxIterations × 60 000 ms)".
const WALL_CLOCK_MS_PER_ITERATION: u64 = 60_000;
/// §4.3 phase 6: "drain for a brief grace period".
const TERMINATION_GRACE_PERIOD: Duration = Duration::from_millis(200);

struct TrackedAgent {
    handle: AgentHandle,
    abort: tokio::task::AbortHandle,
}

pub struct Orchestrator {
    config: HiveConfig,
    validator: Arc<dyn Validator>,
    llm: Arc<dyn LlmRuntime>,
    environment: Arc<Environment>,
    next_agent_id: AtomicU64,
}

impl Orchestrator {
    pub fn new(config: HiveConfig, validator: Arc<dyn Validator>, llm: Arc<dyn LlmRuntime>) -> HiveResult<Self> {
        config.validate()?;
        let environment = Arc::new(Environment::new(config.global_convergence_threshold));
        Ok(Orchestrator {
            config,
            validator,
            llm,
            environment,
            next_agent_id: AtomicU64::new(0),
        })
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    fn fresh_agent_id(&self) -> String {
        let n = self.next_agent_id.fetch_add(1, Ordering::Relaxed);
        format!("agent-{n}")
    }

    /// Runs the full §4.3 lifecycle and returns `filePath -> code` for every
    /// slot that ended up with a best solution.
    pub async fn execute(&self, task: &TaskSpec) -> HashMap<String, String> {
        // Phase 1: seed.
        self.environment.seed(task);

        // Phase 2: bootstrap memory.
        let memory = Arc::new(
            SynapticMemory::bootstrap(
                self.config.memory_base_dir.join(SWARM_MEMORY_DIR),
                self.config.memory_enabled,
                self.config.max_synaptic_entries,
                self.config.max_trail_markers,
            )
            .await,
        );

        // Phase 3: spawn initial pool.
        let mut agents: HashMap<String, TrackedAgent> = HashMap::new();
        let mut joinset: JoinSet<String> = JoinSet::new();
        let initial_count = self.config.agent_count.min(self.config.max_agents);
        for _ in 0..initial_count {
            self.spawn_agent(&memory, &mut agents, &mut joinset);
        }

        // Phase 4: timers.
        let mut evaporation_timer = time::interval(Duration::from_millis(self.config.evaporation_interval_ms.max(1)));
        let mut snapshot_timer = time::interval(Duration::from_millis(self.config.snapshot_interval_ms.max(1)));
        let mut scale_timer = time::interval(Duration::from_millis(self.config.scale_check_interval_ms.max(1)));
        evaporation_timer.tick().await; // first tick fires immediately; consume it
        snapshot_timer.tick().await;
        scale_timer.tick().await;

        let deadline =
            time::Instant::now() + Duration::from_millis(self.config.max_iterations as u64 * WALL_CLOCK_MS_PER_ITERATION);

        // Phase 5: race agent completions against the monitor.
        loop {
            if self.environment.has_converged() {
                info!("environment converged, stopping orchestrator");
                break;
            }
            if agents.is_empty() {
                info!("all agents finished, stopping orchestrator");
                break;
            }
            if time::Instant::now() >= deadline {
                warn!("orchestrator wall-clock exceeded, stopping");
                break;
            }

            tokio::select! {
                Some(joined) = joinset.join_next() => {
                    match joined {
                        Ok(agent_id) => {
                            agents.remove(&agent_id);
                            self.environment.deregister_agent(&agent_id);
                            info!(agent = %agent_id, "agent finished");
                        }
                        Err(e) => {
                            warn!(error = %e, "agent task ended abnormally");
                        }
                    }
                }
                _ = evaporation_timer.tick() => {
                    self.environment.evaporate(self.config.evaporation_rate);
                }
                _ = snapshot_timer.tick() => {
                    memory.snapshot_hive_state(&self.environment);
                    memory.snapshot_dependency_map(&self.environment);
                }
                _ = scale_timer.tick() => {
                    self.run_scaling_check(&memory, &mut agents, &mut joinset);
                }
            }
        }

        // Phase 6: termination.
        for (agent_id, tracked) in agents.drain() {
            tracked.handle.stop();
            tracked.abort.abort();
            self.environment.deregister_agent(&agent_id);
        }
        time::sleep(TERMINATION_GRACE_PERIOD).await;

        // Phase 7: collect.
        let results = self.environment.get_context_files();

        // Phase 8: final snapshot & flush.
        memory.snapshot_hive_state(&self.environment);
        memory.snapshot_dependency_map(&self.environment);
        memory.flush().await;

        results
    }

    fn spawn_agent(
        &self,
        memory: &Arc<SynapticMemory>,
        agents: &mut HashMap<String, TrackedAgent>,
        joinset: &mut JoinSet<String>,
    ) {
        let agent_id = self.fresh_agent_id();
        let agent_loop = Arc::new(AgentLoop::new(
            agent_id.clone(),
            self.environment.clone(),
            self.validator.clone(),
            memory.clone(),
            self.llm.clone(),
            self.config.max_iterations,
            self.config.tool_call_cap,
        ));
        let handle = agent_loop.handle();
        let id_for_task = agent_id.clone();
        let abort = joinset.spawn(async move {
            agent_loop.run().await;
            id_for_task
        });
        agents.insert(agent_id, TrackedAgent { handle, abort });
    }

    fn run_scaling_check(
        &self,
        memory: &Arc<SynapticMemory>,
        agents: &mut HashMap<String, TrackedAgent>,
        joinset: &mut JoinSet<String>,
    ) {
        let advice = self.environment.get_scaling_advice(agents.len());
        info!(?advice, active_agents = agents.len(), "scaling check");

        match scaling::decide(advice, agents.len(), self.config.min_agents, self.config.max_agents) {
            ScalingAction::SpawnAgent => self.spawn_agent(memory, agents, joinset),
            ScalingAction::RetireAgent => {
                let victim = agents
                    .iter()
                    .min_by_key(|(_, tracked)| tracked.handle.successful_submits())
                    .map(|(id, _)| id.clone());
                if let Some(victim) = victim {
                    if let Some(tracked) = agents.remove(&victim) {
                        info!(agent = %victim, "retiring agent on scale_down");
                        tracked.handle.stop();
                        tracked.abort.abort();
                        self.environment.deregister_agent(&victim);
                    }
                }
            }
            ScalingAction::Hold => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{LlmTurn, TranscriptEntry};
    use crate::task::FileSlotSpec;
    use crate::validator::PassthroughValidator;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Submits one solution on its first tool call, then finishes — enough
    /// to drive an `Orchestrator::execute` end to end with a single agent.
    struct OneShotLlm {
        submitted: StdMutex<bool>,
    }

    #[async_trait]
    impl LlmRuntime for OneShotLlm {
        async fn next_turn(
            &self,
            _system_prompt: &str,
            _user_message: &str,
            _tool_defs: &serde_json::Value,
            _transcript: &[TranscriptEntry],
        ) -> Result<LlmTurn, String> {
            let mut submitted = self.submitted.lock().unwrap();
            if *submitted {
                Ok(LlmTurn::FinalText("done".to_string()))
            } else {
                *submitted = true;
                Ok(LlmTurn::ToolCall {
                    name: "submit_solution".to_string(),
                    arguments: json!({
                        "file_path": "a.x",
                        "code": "x".repeat(200),
                        "declared_exports": ["f"],
                    }),
                })
            }
        }
    }

    #[tokio::test]
    async fn end_to_end_single_agent_converges_and_is_collected() {
        let dir = tempfile::tempdir().unwrap();
        let config = HiveConfig {
            agent_count: 1,
            min_agents: 1,
            max_agents: 1,
            max_iterations: 1,
            tool_call_cap: 10,
            evaporation_interval_ms: 3_600_000,
            snapshot_interval_ms: 3_600_000,
            scale_check_interval_ms: 3_600_000,
            global_convergence_threshold: 0.5,
            memory_enabled: false,
            memory_base_dir: dir.path().to_path_buf(),
            ..HiveConfig::default()
        };

        let orchestrator = Orchestrator::new(
            config,
            Arc::new(PassthroughValidator),
            Arc::new(OneShotLlm {
                submitted: StdMutex::new(false),
            }),
        )
        .unwrap();

        let task = TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![FileSlotSpec {
                file_path: "a.x".into(),
                description: "".into(),
                depends_on: vec![],
            }],
        };

        let results = orchestrator.execute(&task).await;
        assert_eq!(results.get("a.x").map(|c| c.len()), Some(200));
        assert!(orchestrator.environment().has_converged());
    }
}
