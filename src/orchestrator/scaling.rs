//! Turns the environment's raw `ScalingAdvice` (§4.1.6) into a bounded
//! action, respecting `[minAgents, maxAgents]` (§4.3 phase 5).

use crate::environment::ScalingAdvice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingAction {
    SpawnAgent,
    RetireAgent,
    Hold,
}

pub fn decide(advice: ScalingAdvice, active_agents: usize, min_agents: usize, max_agents: usize) -> ScalingAction {
    match advice {
        ScalingAdvice::ScaleUp if active_agents < max_agents => ScalingAction::SpawnAgent,
        ScalingAdvice::ScaleDown if active_agents > min_agents => ScalingAction::RetireAgent,
        _ => ScalingAction::Hold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_up_respects_max_agents_ceiling() {
        assert_eq!(decide(ScalingAdvice::ScaleUp, 8, 1, 8), ScalingAction::Hold);
        assert_eq!(decide(ScalingAdvice::ScaleUp, 7, 1, 8), ScalingAction::SpawnAgent);
    }

    #[test]
    fn scale_down_respects_min_agents_floor() {
        assert_eq!(decide(ScalingAdvice::ScaleDown, 1, 1, 8), ScalingAction::Hold);
        assert_eq!(decide(ScalingAdvice::ScaleDown, 2, 1, 8), ScalingAction::RetireAgent);
    }

    #[test]
    fn hold_is_always_hold() {
        assert_eq!(decide(ScalingAdvice::Hold, 3, 1, 8), ScalingAction::Hold);
    }
}
