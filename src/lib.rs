//! HiveForge Core — a decentralized multi-agent coordination engine for
//! generating sets of inter-dependent file artifacts.
//!
//! Stateless worker agents observe a shared, structured [`Environment`],
//! choose work from its published status signals, deposit candidate
//! solutions, and leave stigmergic trail markers for peers via
//! [`SynapticMemory`]. The environment reinforces convergent solutions,
//! evaporates stale ones, and advises an [`Orchestrator`] on pool sizing.
//! See `SPEC_FULL.md` and `DESIGN.md` for the full design.

pub mod agent;
pub mod environment;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod task;
pub mod validator;

pub use environment::Environment;
pub use error::{HiveError, HiveResult};
pub use memory::SynapticMemory;
pub use orchestrator::{HiveConfig, Orchestrator};
pub use task::{FileSlotSpec, TaskSpec};
pub use validator::{PassthroughValidator, ValidationOutcome, Validator};

/// Initializes `tracing` for the crate's structured logs. Safe to call more
/// than once; later calls are no-ops.
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
