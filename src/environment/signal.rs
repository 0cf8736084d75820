//! Non-code advisory pheromones, most importantly interface mismatches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    InterfaceMismatch,
    CompilationError,
    IntegrationFailure,
    DependencyReady,
    NeedsAttention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPheromone {
    pub id: String,
    pub signal_type: SignalType,
    pub file_path: String,
    pub message: String,
    pub severity: Severity,
    pub strength: f64,
    pub created_at: DateTime<Utc>,
    pub source_agent: String,
    /// For `interface_mismatch` signals, the dependency file the mismatch
    /// concerns — lets the reverse-export check (§4.1.2) clear only the
    /// signals referring to the source it is re-checking.
    pub related_file: Option<String>,
}

impl SignalPheromone {
    pub fn new(
        id: String,
        signal_type: SignalType,
        file_path: String,
        message: String,
        severity: Severity,
        source_agent: String,
        related_file: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        SignalPheromone {
            id,
            signal_type,
            file_path,
            message,
            severity,
            strength: 1.0,
            created_at: now,
            source_agent,
            related_file,
        }
    }

    /// Apply one evaporation tick (§4.1.4, signal branch: `strength *= 1 - 2r`).
    /// Returns `false` if the signal should be dropped (`strength < 0.05`).
    pub fn evaporate(&mut self, rate: f64) -> bool {
        self.strength *= 1.0 - 2.0 * rate;
        self.strength >= 0.05
    }

    /// Whether this signal counts toward the `blocked` status override
    /// (§4.1.3): a high-severity interface mismatch with strength > 0.5.
    pub fn blocks_status(&self) -> bool {
        self.signal_type == SignalType::InterfaceMismatch
            && self.severity == Severity::High
            && self.strength > 0.5
    }
}
