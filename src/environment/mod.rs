//! The shared pheromone environment — the single shared mutable store
//! (§4.1). All public operations acquire the same `parking_lot::RwLock`
//! (writers for any mutation, readers for `perceive`/`getSignals`/etc.), so
//! steps 1-9 of the deposit algorithm execute atomically with respect to
//! every other environment operation (§5).
//!
//! Grounded on the teacher's `core/shared_memory.rs` — a single
//! `Arc<RwLock<..>>`-guarded store exposing read/write/fork methods — here
//! generalized from one flat vector to the slot/pheromone/signal/active-
//! agent state this spec requires.

pub mod compatibility;
pub mod pheromone;
pub mod quality;
pub mod signal;
pub mod slot;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HiveError, HiveResult};
use crate::task::TaskSpec;

use self::compatibility::CompatibilityOutcome;
use self::pheromone::{group_imports_by_source, ImportRef, SpatialPheromone, ValidationMetadata};
use self::signal::{Severity, SignalPheromone, SignalType};
use self::slot::{FileSlot, SlotStatus};

/// A solution an agent wants to deposit — the canonical mutation path's
/// input (§4.1).
#[derive(Debug, Clone)]
pub struct Deposit {
    pub file_path: String,
    pub agent_id: String,
    pub code: String,
    pub quality: f64,
    pub exports: HashSet<String>,
    pub imports: HashSet<ImportRef>,
    pub metadata: ValidationMetadata,
}

#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub pheromone_id: String,
    pub quality: f64,
    pub reinforced: bool,
    pub depositor_count: usize,
}

/// Per-slot snapshot returned by `perceive` (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub file_path: String,
    pub status: String,
    pub best_quality: f64,
    pub depends_on: Vec<String>,
    pub depended_by: Vec<String>,
    pub signal_count: usize,
    pub active_agent_count: usize,
    pub solution_count: usize,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalProgress {
    pub total_files: usize,
    pub solid_or_better: usize,
    pub convergence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub slots: Vec<SlotSnapshot>,
    pub global_progress: GlobalProgress,
    /// Present only when `perceive` was called with a focus file.
    pub focus: Option<SlotSnapshot>,
}

/// Advice produced by `get_scaling_advice` (§4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingAdvice {
    ScaleUp,
    ScaleDown,
    Hold,
}

struct EnvironmentState {
    slots: HashMap<String, FileSlot>,
    pheromones: HashMap<String, Vec<SpatialPheromone>>,
    signals: HashMap<String, Vec<SignalPheromone>>,
    /// agent_id -> file_path. Each agent appears at most once (invariant 5, §8).
    agent_focus: HashMap<String, String>,
}

impl EnvironmentState {
    fn new() -> Self {
        EnvironmentState {
            slots: HashMap::new(),
            pheromones: HashMap::new(),
            signals: HashMap::new(),
            agent_focus: HashMap::new(),
        }
    }

    fn active_agent_count(&self, file_path: &str) -> usize {
        self.agent_focus.values().filter(|f| f.as_str() == file_path).count()
    }

    fn best_pheromone(&self, file_path: &str) -> Option<&SpatialPheromone> {
        let id = self.slots.get(file_path)?.best_solution_id.as_ref()?;
        self.pheromones.get(file_path)?.iter().find(|p| &p.id == id)
    }

    fn best_exports(&self, file_path: &str) -> Option<HashSet<String>> {
        self.best_pheromone(file_path).map(|p| p.exports.clone())
    }
}

pub struct Environment {
    state: RwLock<EnvironmentState>,
    global_convergence_threshold: f64,
    id_counter: AtomicU64,
}

impl Environment {
    pub fn new(global_convergence_threshold: f64) -> Self {
        Environment {
            state: RwLock::new(EnvironmentState::new()),
            global_convergence_threshold,
            id_counter: AtomicU64::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.id_counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{}-{n}", Utc::now().timestamp_nanos_opt().unwrap_or(0))
    }

    /// Create slots, wire forward/reverse edges, status = empty.
    pub fn seed(&self, task: &TaskSpec) {
        let mut state = self.state.write();
        state.slots.clear();
        state.pheromones.clear();
        state.signals.clear();
        state.agent_focus.clear();

        for spec in &task.file_slots {
            state.slots.insert(
                spec.file_path.clone(),
                FileSlot::new(spec.file_path.clone(), spec.description.clone(), spec.depends_on.clone()),
            );
        }

        let edges: Vec<(String, String)> = state
            .slots
            .values()
            .flat_map(|s| s.depends_on.iter().map(|dep| (dep.clone(), s.file_path.clone())))
            .collect();
        for (dep, dependent) in edges {
            if let Some(dep_slot) = state.slots.get_mut(&dep) {
                dep_slot.depended_by.push(dependent);
            }
        }

        info!(files = state.slots.len(), "environment seeded");
    }

    // ---- perception -----------------------------------------------------

    pub fn perceive(&self, focus_file: Option<&str>) -> EnvironmentSnapshot {
        let state = self.state.read();
        let mut slots: Vec<SlotSnapshot> = state
            .slots
            .values()
            .map(|s| self.snapshot_slot(&state, s))
            .collect();
        slots.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        let focus = focus_file.and_then(|f| state.slots.get(f)).map(|s| self.snapshot_slot(&state, s));

        EnvironmentSnapshot {
            global_progress: self.global_progress(&state),
            slots,
            focus,
        }
    }

    fn snapshot_slot(&self, state: &EnvironmentState, slot: &FileSlot) -> SlotSnapshot {
        let signal_count = state.signals.get(&slot.file_path).map(|v| v.len()).unwrap_or(0);
        let active_agent_count = state.active_agent_count(&slot.file_path);
        let solution_count = state.pheromones.get(&slot.file_path).map(|v| v.len()).unwrap_or(0);
        let recommendation = recommend(slot.status, active_agent_count, signal_count);

        SlotSnapshot {
            file_path: slot.file_path.clone(),
            status: slot.status.as_str().to_string(),
            best_quality: slot.best_quality,
            depends_on: slot.depends_on.clone(),
            depended_by: slot.depended_by.clone(),
            signal_count,
            active_agent_count,
            solution_count,
            recommendation,
        }
    }

    fn global_progress(&self, state: &EnvironmentState) -> GlobalProgress {
        let total_files = state.slots.len();
        let solid_or_better = state.slots.values().filter(|s| s.status.is_solid_or_better()).count();
        let convergence = if total_files == 0 {
            0.0
        } else {
            solid_or_better as f64 / total_files as f64
        };
        GlobalProgress {
            total_files,
            solid_or_better,
            convergence,
        }
    }

    pub fn calculate_global_convergence(&self) -> f64 {
        let state = self.state.read();
        self.global_progress(&state).convergence
    }

    pub fn has_converged(&self) -> bool {
        self.calculate_global_convergence() >= self.global_convergence_threshold
    }

    pub fn get_best_solution(&self, file_path: &str) -> Option<SpatialPheromone> {
        let state = self.state.read();
        state.best_pheromone(file_path).cloned()
    }

    pub fn get_file_pheromones(&self, file_path: &str) -> Vec<SpatialPheromone> {
        let state = self.state.read();
        state.pheromones.get(file_path).cloned().unwrap_or_default()
    }

    pub fn get_signals(&self, file_path: Option<&str>) -> Vec<SignalPheromone> {
        let state = self.state.read();
        match file_path {
            Some(f) => state.signals.get(f).cloned().unwrap_or_default(),
            None => state.signals.values().flatten().cloned().collect(),
        }
    }

    pub fn get_context_files(&self) -> HashMap<String, String> {
        let state = self.state.read();
        state
            .slots
            .keys()
            .filter_map(|f| state.best_pheromone(f).map(|p| (f.clone(), p.code.clone())))
            .collect()
    }

    // ---- active agent map -------------------------------------------------

    pub fn register_agent_activity(&self, file_path: &str, agent_id: &str) {
        let mut state = self.state.write();
        state.agent_focus.insert(agent_id.to_string(), file_path.to_string());
    }

    pub fn deregister_agent(&self, agent_id: &str) {
        let mut state = self.state.write();
        state.agent_focus.remove(agent_id);
    }

    // ---- deposit ----------------------------------------------------------

    /// The canonical mutation path (§4.1 steps 1-9), executed under a single
    /// write lock so no other operation ever observes a partial deposit.
    pub fn deposit_solution(&self, deposit: Deposit) -> HiveResult<DepositOutcome> {
        let mut state = self.state.write();

        // 1. Reject unknown filePath.
        if !state.slots.contains_key(&deposit.file_path) {
            let mut valid: Vec<String> = state.slots.keys().cloned().collect();
            valid.sort();
            return Err(HiveError::UnknownFilePath {
                path: deposit.file_path.clone(),
                valid,
            });
        }

        // 2. Record agent activity; single-focus invariant.
        state.agent_focus.insert(deposit.agent_id.clone(), deposit.file_path.clone());

        let now = Utc::now();

        // 3-5. Reinforce a similar pheromone from a different agent, or insert new.
        let list = state.pheromones.entry(deposit.file_path.clone()).or_default();
        let similar_idx = list.iter().position(|p| {
            !p.depositors.contains(&deposit.agent_id) && p.is_similar_to(&deposit.exports, &deposit.code)
        });

        let (pheromone_id, quality, reinforced, depositor_count) = if let Some(idx) = similar_idx {
            let p = &mut list[idx];
            let q = p.reinforce(
                deposit.agent_id.clone(),
                deposit.quality,
                deposit.code.clone(),
                deposit.exports.clone(),
                deposit.imports.clone(),
                now,
            );
            p.metadata = deposit.metadata.clone();
            (p.id.clone(), q, true, p.depositors.len())
        } else {
            let id = self.next_id("pher");
            let p = SpatialPheromone::new(
                id.clone(),
                deposit.file_path.clone(),
                deposit.code.clone(),
                deposit.quality,
                deposit.agent_id.clone(),
                deposit.exports.clone(),
                deposit.imports.clone(),
                deposit.metadata.clone(),
                now,
            );
            let q = p.quality;
            list.push(p);
            (id, q, false, 1)
        };

        // 6. Promote to best if this pheromone now exceeds the slot's best quality.
        if let Some(slot) = state.slots.get_mut(&deposit.file_path) {
            if quality > slot.best_quality {
                slot.best_quality = quality;
                slot.best_solution_id = Some(pheromone_id.clone());
            }
        }

        // 7. Import-compatibility check for this file.
        self.run_import_compatibility_check(&mut state, &deposit.file_path, &deposit.imports);

        // 8. Reverse-export check for every dependent.
        let depended_by = state
            .slots
            .get(&deposit.file_path)
            .map(|s| s.depended_by.clone())
            .unwrap_or_default();
        for dependent in &depended_by {
            self.run_reverse_export_check(&mut state, dependent, &deposit.file_path);
        }

        // 9. Recompute this slot's status.
        self.recompute_status(&mut state, &deposit.file_path);

        info!(
            file = %deposit.file_path,
            agent = %deposit.agent_id,
            quality,
            reinforced,
            "solution deposited"
        );

        Ok(DepositOutcome {
            pheromone_id,
            quality,
            reinforced,
            depositor_count,
        })
    }

    pub fn deposit_signal(
        &self,
        signal_type: SignalType,
        file_path: &str,
        message: String,
        severity: Severity,
        source_agent: &str,
    ) {
        let mut state = self.state.write();
        let id = self.next_id("sig");
        let signal = SignalPheromone::new(
            id,
            signal_type,
            file_path.to_string(),
            message,
            severity,
            source_agent.to_string(),
            None,
            Utc::now(),
        );
        state.signals.entry(file_path.to_string()).or_default().push(signal);
        self.recompute_status(&mut state, file_path);
    }

    /// §4.1.1: clear stale mismatch signals for `file_path`, then re-derive
    /// them from its currently declared imports.
    fn run_import_compatibility_check(
        &self,
        state: &mut EnvironmentState,
        file_path: &str,
        imports: &HashSet<ImportRef>,
    ) {
        if let Some(signals) = state.signals.get_mut(file_path) {
            signals.retain(|s| s.signal_type != SignalType::InterfaceMismatch);
        }

        let grouped = group_imports_by_source(imports);
        let mut new_signals = Vec::new();
        for (source, names) in &grouped {
            let source_exports = state.best_exports(source);
            match compatibility::check(names, source_exports.as_ref()) {
                CompatibilityOutcome::NoSolutionYet { needed } => {
                    new_signals.push(SignalPheromone::new(
                        self.next_id("sig"),
                        SignalType::InterfaceMismatch,
                        file_path.to_string(),
                        format!("Dependency has no solution yet. Needed: {}", needed.join(", ")),
                        Severity::Medium,
                        "environment".to_string(),
                        Some(source.clone()),
                        Utc::now(),
                    ));
                }
                CompatibilityOutcome::MissingNames { missing, available } => {
                    new_signals.push(SignalPheromone::new(
                        self.next_id("sig"),
                        SignalType::InterfaceMismatch,
                        file_path.to_string(),
                        format!(
                            "Missing imports: {}. Available: {}",
                            missing.join(", "),
                            available.join(", ")
                        ),
                        Severity::High,
                        "environment".to_string(),
                        Some(source.clone()),
                        Utc::now(),
                    ));
                }
                CompatibilityOutcome::Ok => {}
            }
        }

        if !new_signals.is_empty() {
            state.signals.entry(file_path.to_string()).or_default().extend(new_signals);
        }
    }

    /// §4.1.2: for one dependent of a just-updated source file, clear its
    /// prior mismatches referring to that source and recompute against the
    /// source's new exports.
    fn run_reverse_export_check(&self, state: &mut EnvironmentState, dependent: &str, source: &str) {
        let imported_names: HashSet<String> = state
            .best_pheromone(dependent)
            .map(|p| {
                p.imports
                    .iter()
                    .filter(|i| i.from_file == source)
                    .map(|i| i.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        if let Some(signals) = state.signals.get_mut(dependent) {
            signals.retain(|s| {
                !(s.signal_type == SignalType::InterfaceMismatch && s.related_file.as_deref() == Some(source))
            });
        }

        if !imported_names.is_empty() {
            let source_exports = state.best_exports(source);
            if let CompatibilityOutcome::MissingNames { missing, available } =
                compatibility::check(&imported_names, source_exports.as_ref())
            {
                let signal = SignalPheromone::new(
                    self.next_id("sig"),
                    SignalType::InterfaceMismatch,
                    dependent.to_string(),
                    format!("Missing imports: {}. Available: {}", missing.join(", "), available.join(", ")),
                    Severity::High,
                    "environment".to_string(),
                    Some(source.to_string()),
                    Utc::now(),
                );
                state.signals.entry(dependent.to_string()).or_default().push(signal);
            }
        }

        self.recompute_status(state, dependent);
    }

    /// §4.1.3: base status from quality, overridden to `blocked` when a
    /// high-severity, strength>0.5 mismatch exists and quality ∈ (0, 0.65).
    fn recompute_status(&self, state: &mut EnvironmentState, file_path: &str) {
        let quality = match state.slots.get(file_path) {
            Some(s) => s.best_quality,
            None => return,
        };
        let blocked = state
            .signals
            .get(file_path)
            .map(|sigs| sigs.iter().any(|s| s.blocks_status()))
            .unwrap_or(false);

        let status = if blocked && quality > 0.0 && quality < 0.65 {
            SlotStatus::Blocked
        } else {
            SlotStatus::from_quality(quality)
        };

        if let Some(slot) = state.slots.get_mut(file_path) {
            slot.status = status;
        }
    }

    // ---- evaporation --------------------------------------------------------

    /// §4.1.4: exponential decay with removal below threshold, run as one
    /// atomic operation.
    pub fn evaporate(&self, rate: f64) {
        let mut state = self.state.write();

        let file_paths: Vec<String> = state.slots.keys().cloned().collect();
        for file_path in &file_paths {
            if let Some(list) = state.pheromones.get_mut(file_path) {
                list.retain_mut(|p| p.evaporate(rate));
            }
            // If the slot's best was dropped, recompute from survivors.
            let best_still_present = state
                .slots
                .get(file_path)
                .and_then(|s| s.best_solution_id.clone())
                .map(|id| {
                    state
                        .pheromones
                        .get(file_path)
                        .map(|list| list.iter().any(|p| p.id == id))
                        .unwrap_or(false)
                })
                .unwrap_or(true);

            if !best_still_present {
                let replacement = state
                    .pheromones
                    .get(file_path)
                    .and_then(|list| list.iter().max_by(|a, b| a.quality.total_cmp(&b.quality)))
                    .map(|p| (p.id.clone(), p.quality));

                if let Some(slot) = state.slots.get_mut(file_path) {
                    match replacement {
                        Some((id, q)) => {
                            slot.best_solution_id = Some(id);
                            slot.best_quality = q;
                        }
                        None => {
                            slot.best_solution_id = None;
                            slot.best_quality = 0.0;
                        }
                    }
                }
            }

            if let Some(signals) = state.signals.get_mut(file_path) {
                signals.retain_mut(|s| s.evaporate(rate));
            }
        }

        for file_path in &file_paths {
            self.recompute_status(&mut state, file_path);
        }

        info!(rate, "evaporation tick complete");
    }

    // ---- scaling advice -----------------------------------------------------

    /// §4.1.6.
    pub fn get_scaling_advice(&self, active_agents: usize) -> ScalingAdvice {
        let state = self.state.read();
        let progress = self.global_progress(&state);
        let unfinished = progress.total_files.saturating_sub(progress.solid_or_better);

        if unfinished > 0 && active_agents >= unfinished {
            return ScalingAdvice::Hold;
        }

        let any_unattended_empty = state.slots.values().any(|s| {
            s.status == SlotStatus::Empty && state.active_agent_count(&s.file_path) == 0
        });
        if any_unattended_empty {
            return ScalingAdvice::ScaleUp;
        }

        if progress.total_files > 0 && (progress.solid_or_better as f64) >= 0.8 * progress.total_files as f64 {
            return ScalingAdvice::ScaleDown;
        }

        ScalingAdvice::Hold
    }
}

/// Pure derivation of the work-recommendation string from
/// `(status, activeAgentCount, signalCount)` (§4.1.5).
fn recommend(status: SlotStatus, active_agent_count: usize, signal_count: usize) -> String {
    if status == SlotStatus::Excellent {
        "SKIP - already excellent".to_string()
    } else if active_agent_count >= 2 {
        "AVOID - too many agents".to_string()
    } else if status == SlotStatus::Blocked && signal_count > 0 {
        "HIGH PRIORITY - has interface mismatches".to_string()
    } else if status == SlotStatus::Empty {
        "HIGH PRIORITY - needs initial solution".to_string()
    } else if matches!(status, SlotStatus::Attempted | SlotStatus::Partial) {
        "MEDIUM - needs improvement".to_string()
    } else if status == SlotStatus::Solid {
        "LOW - already solid".to_string()
    } else {
        "NORMAL".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FileSlotSpec;

    fn task_two_files() -> TaskSpec {
        TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![
                FileSlotSpec {
                    file_path: "a.x".into(),
                    description: "a".into(),
                    depends_on: vec![],
                },
                FileSlotSpec {
                    file_path: "b.x".into(),
                    description: "b".into(),
                    depends_on: vec!["a.x".into()],
                },
            ],
        }
    }

    fn exports(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn seed_wires_reverse_edges_exactly() {
        let env = Environment::new(1.0);
        env.seed(&task_two_files());
        let snap = env.perceive(None);
        let a = snap.slots.iter().find(|s| s.file_path == "a.x").unwrap();
        assert_eq!(a.depended_by, vec!["b.x".to_string()]);
    }

    #[test]
    fn s1_single_slot_converges() {
        let env = Environment::new(1.0);
        env.seed(&TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![FileSlotSpec {
                file_path: "a.x".into(),
                description: "a".into(),
                depends_on: vec![],
            }],
        });

        let code = "x".repeat(200);
        let deposit = |agent: &str| Deposit {
            file_path: "a.x".into(),
            agent_id: agent.into(),
            code: code.clone(),
            quality: 0.7,
            exports: exports(&["f"]),
            imports: HashSet::new(),
            metadata: ValidationMetadata {
                success: true,
                errors: vec![],
            },
        };

        let first = env.deposit_solution(deposit("G1")).unwrap();
        let second = env.deposit_solution(deposit("G2")).unwrap();

        assert!(second.reinforced);
        assert!(second.quality >= first.quality);
        assert_eq!(second.depositor_count, 2);

        let best = env.get_best_solution("a.x").unwrap();
        assert!(best.depositors.contains("G1"));
        assert!(best.depositors.contains("G2"));

        assert!(env.calculate_global_convergence() >= 1.0);
        assert!(env.has_converged());
    }

    #[test]
    fn s2_dependency_mismatch_then_repair() {
        let env = Environment::new(1.0);
        env.seed(&task_two_files());

        env.deposit_solution(Deposit {
            file_path: "b.x".into(),
            agent_id: "G1".into(),
            code: "broken".into(),
            quality: 0.0,
            exports: HashSet::new(),
            imports: [ImportRef {
                name: "tok".into(),
                from_file: "a.x".into(),
            }]
            .into_iter()
            .collect(),
            metadata: ValidationMetadata {
                success: false,
                errors: vec!["boom".into()],
            },
        })
        .unwrap();

        let signals = env.get_signals(Some("b.x"));
        assert!(signals.iter().any(|s| s.message.contains("tok") && s.signal_type == SignalType::InterfaceMismatch));

        // Zero-quality deposit never promotes to best (mod.rs's `quality >
        // slot.best_quality` is strict), so the slot's quality stays 0 and
        // status is `empty` — the resolved Open Question #2 (SPEC_FULL.md
        // §4.1 / DESIGN.md): a zero-quality slot with mismatch signals is
        // not `blocked`, and it isn't `attempted` either since that base
        // status requires `quality ∈ (0, 0.4)`.
        let b_snapshot = env.perceive(Some("b.x")).focus.unwrap();
        assert_eq!(b_snapshot.status, "empty");

        env.deposit_solution(Deposit {
            file_path: "a.x".into(),
            agent_id: "G2".into(),
            code: "x".repeat(200),
            quality: 0.9,
            exports: exports(&["tok"]),
            imports: HashSet::new(),
            metadata: ValidationMetadata {
                success: true,
                errors: vec![],
            },
        })
        .unwrap();

        let signals_after = env.get_signals(Some("b.x"));
        assert!(!signals_after
            .iter()
            .any(|s| s.signal_type == SignalType::InterfaceMismatch && s.related_file.as_deref() == Some("a.x")));

        let a_snapshot = env.perceive(Some("a.x")).focus.unwrap();
        assert!(a_snapshot.status == "solid" || a_snapshot.status == "excellent");
    }

    #[test]
    fn s3_evaporation_clears_best() {
        let env = Environment::new(1.0);
        env.seed(&TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![FileSlotSpec {
                file_path: "a.x".into(),
                description: "a".into(),
                depends_on: vec![],
            }],
        });

        env.deposit_solution(Deposit {
            file_path: "a.x".into(),
            agent_id: "G1".into(),
            code: "code".into(),
            quality: 0.5,
            exports: HashSet::new(),
            imports: HashSet::new(),
            metadata: ValidationMetadata::default(),
        })
        .unwrap();

        for _ in 0..4 {
            env.evaporate(0.5);
        }

        let snap = env.perceive(Some("a.x")).focus.unwrap();
        assert_eq!(snap.status, "empty");
        assert_eq!(snap.best_quality, 0.0);
        assert!(env.get_best_solution("a.x").is_none());
    }

    #[test]
    fn s4_scaling_decisions() {
        let env = Environment::new(1.0);
        env.seed(&TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![
                FileSlotSpec {
                    file_path: "a".into(),
                    description: "".into(),
                    depends_on: vec![],
                },
                FileSlotSpec {
                    file_path: "b".into(),
                    description: "".into(),
                    depends_on: vec![],
                },
                FileSlotSpec {
                    file_path: "c".into(),
                    description: "".into(),
                    depends_on: vec![],
                },
            ],
        });

        assert_eq!(env.get_scaling_advice(0), ScalingAdvice::ScaleUp);

        for (file, agent) in [("a", "G1"), ("b", "G2"), ("c", "G3")] {
            env.register_agent_activity(file, agent);
        }
        assert_eq!(env.get_scaling_advice(3), ScalingAdvice::Hold);

        for (file, agent) in [("a", "G1"), ("b", "G2"), ("c", "G3")] {
            env.deposit_solution(Deposit {
                file_path: file.into(),
                agent_id: agent.into(),
                code: "x".repeat(200),
                quality: 0.9,
                exports: exports(&["f"]),
                imports: HashSet::new(),
                metadata: ValidationMetadata {
                    success: true,
                    errors: vec![],
                },
            })
            .unwrap();
        }
        assert_eq!(env.get_scaling_advice(3), ScalingAdvice::ScaleDown);
    }

    #[test]
    fn s5_compatibility_scoring_contributes_to_quality() {
        use self::quality::{compute_quality, ImportResolution, QualityInputs};

        let declared_imports: HashSet<ImportRef> = [ImportRef {
            name: "y".into(),
            from_file: "s.x".into(),
        }]
        .into_iter()
        .collect();
        let resolutions = vec![ImportResolution {
            has_solution: true,
            exports: exports(&["z"]),
        }];
        let inputs = QualityInputs {
            code: "line\n".repeat(20).as_str(),
            validator_success: true,
            declared_exports: &HashSet::new(),
            declared_imports: &declared_imports,
            import_resolution: &resolutions,
        };
        // compatibility contribution alone: (1.0 - 0.2) * 0.20 = 0.16
        let q = compute_quality(&inputs);
        assert!(q > 0.0);
    }
}
