//! `HiveConfig` — every configuration key recognized per §6, gathered into
//! one struct in the teacher's `core::config::CogOpsConfig` style (plain
//! serde struct, a hand-written `Default`, validated at construction rather
//! than at first use).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{HiveError, HiveResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfig {
    /// Initial agent pool size (§4.3 phase 3).
    pub agent_count: usize,
    pub min_agents: usize,
    pub max_agents: usize,

    /// Per-agent iteration cap (§4.5's "done" heuristic).
    pub max_iterations: u32,
    /// Per-iteration tool-call safety cap (§4.5, default 20).
    pub tool_call_cap: u32,

    pub evaporation_rate: f64,
    pub evaporation_interval_ms: u64,

    /// Recognized per §6 but not consumed by any formula in this spec — a
    /// single file's "done" state is entirely a function of its status
    /// (§4.1.3), not a separate threshold. Carried for configuration-surface
    /// completeness and round-tripping.
    pub file_convergence_threshold: f64,
    pub global_convergence_threshold: f64,

    pub scale_check_interval_ms: u64,
    pub snapshot_interval_ms: u64,

    pub max_synaptic_entries: usize,
    pub max_trail_markers: usize,

    pub memory_enabled: bool,
    /// Base directory; synaptic memory lives under
    /// `<memory_base_dir>/.swarm-memory/` (§6).
    pub memory_base_dir: PathBuf,
}

impl Default for HiveConfig {
    fn default() -> Self {
        HiveConfig {
            agent_count: 3,
            min_agents: 1,
            max_agents: 8,
            max_iterations: 20,
            tool_call_cap: 20,
            evaporation_rate: 0.05,
            evaporation_interval_ms: 30_000,
            file_convergence_threshold: 0.65,
            global_convergence_threshold: 0.9,
            scale_check_interval_ms: 15_000,
            snapshot_interval_ms: 60_000,
            max_synaptic_entries: 10,
            max_trail_markers: 5,
            memory_enabled: true,
            memory_base_dir: PathBuf::from("."),
        }
    }
}

impl HiveConfig {
    /// Fatal-at-construction check (§7: "minAgents > maxAgents").
    pub fn validate(&self) -> HiveResult<()> {
        if self.min_agents > self.max_agents {
            return Err(HiveError::Configuration(format!(
                "min_agents ({}) must not exceed max_agents ({})",
                self.min_agents, self.max_agents
            )));
        }
        if !(0.0..=1.0).contains(&self.evaporation_rate) {
            return Err(HiveError::Configuration(format!(
                "evaporation_rate must be in [0, 1], got {}",
                self.evaporation_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.global_convergence_threshold) {
            return Err(HiveError::Configuration(format!(
                "global_convergence_threshold must be in [0, 1], got {}",
                self.global_convergence_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(HiveConfig::default().validate().is_ok());
    }

    #[test]
    fn min_agents_over_max_agents_is_fatal() {
        let config = HiveConfig {
            min_agents: 5,
            max_agents: 2,
            ..HiveConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn evaporation_rate_out_of_range_is_fatal() {
        let config = HiveConfig {
            evaporation_rate: 1.5,
            ..HiveConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
