//! Synaptic memory: the durable, stigmergic substrate (§4.4, §6).
//!
//! All writes are funneled through a single `tokio::mpsc` channel drained by
//! one writer task — the tokio-idiomatic rendition of "every write is
//! chained onto a single pending-promise-like channel; callers fire-and-
//! forget; `flush()` awaits drain" — generalized from the teacher's
//! in-memory single-writer `AuditLogger` (`compliance/audit.rs`) to an
//! on-disk append target.

pub mod entry;

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use crate::environment::Environment;
use entry::{IterationAction, SynapticEntry, TrailMarker};

const SYNAPSES_DIR: &str = "synapses";
const TRAILS_DIR: &str = "trails";
const HIVE_STATE_FILE: &str = "hive-state.md";
const DEPENDENCY_MAP_FILE: &str = "dependency-map.md";
const QUALITY_LOG_FILE: &str = "quality-log.md";

enum WriteJob {
    AppendSynapse { agent_id: String, entry: SynapticEntry },
    AppendTrail { file_path: String, marker: TrailMarker },
    WriteHiveState(String),
    WriteDependencyMap(String),
    AppendQualityLog(String),
    Flush(oneshot::Sender<()>),
}

/// Encodes a file path into a filesystem-safe trail-log name: `/` → `--`
/// (§6's exact persisted-layout contract).
fn encode_file_path(file_path: &str) -> String {
    file_path.replace('/', "--")
}

pub struct SynapticMemory {
    base_dir: PathBuf,
    enabled: bool,
    max_synaptic_entries: usize,
    max_trail_markers: usize,
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl SynapticMemory {
    /// Bootstraps the `.swarm-memory` directory layout (idempotent
    /// "make directory and parents if absent", §5) and starts the writer
    /// task. Must be called from within a tokio runtime.
    pub async fn bootstrap(
        base_dir: PathBuf,
        enabled: bool,
        max_synaptic_entries: usize,
        max_trail_markers: usize,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        if enabled {
            let _ = fs::create_dir_all(base_dir.join(SYNAPSES_DIR)).await;
            let _ = fs::create_dir_all(base_dir.join(TRAILS_DIR)).await;
        }

        let writer_base = base_dir.clone();
        let writer_enabled = enabled;
        tokio::spawn(run_writer(writer_base, writer_enabled, rx));

        SynapticMemory {
            base_dir,
            enabled,
            max_synaptic_entries,
            max_trail_markers,
            tx,
        }
    }

    fn send(&self, job: WriteJob) {
        if !self.enabled {
            return;
        }
        // An unbounded send only fails if the writer task has already shut
        // down; per §4.6 ("synaptic write error ... logged; never
        // propagates"), we swallow it here.
        if self.tx.send(job).is_err() {
            warn!("synaptic memory writer task is gone, dropping write");
        }
    }

    pub fn append_synaptic_entry(&self, agent_id: &str, entry: SynapticEntry) {
        self.send(WriteJob::AppendSynapse {
            agent_id: agent_id.to_string(),
            entry,
        });
    }

    pub fn append_trail_marker(&self, file_path: &str, marker: TrailMarker) {
        self.send(WriteJob::AppendTrail {
            file_path: file_path.to_string(),
            marker,
        });
    }

    pub fn append_quality_log(&self, file_path: &str, agent_id: &str, quality: f64, compiled: bool) {
        let line = format!(
            "| {} | {} | {} | {:.4} | {} |\n",
            chrono::Utc::now().to_rfc3339(),
            file_path,
            agent_id,
            quality,
            if compiled { "success" } else { "failure" }
        );
        self.send(WriteJob::AppendQualityLog(line));
    }

    pub fn snapshot_hive_state(&self, env: &Environment) {
        let snapshot = env.perceive(None);
        let mut out = String::from("# Hive State\n\n");
        out.push_str(&format!(
            "convergence: {:.4} ({}/{} solid-or-better)\n\n",
            snapshot.global_progress.convergence,
            snapshot.global_progress.solid_or_better,
            snapshot.global_progress.total_files,
        ));
        for slot in &snapshot.slots {
            out.push_str(&format!(
                "## {}\n- status: {}\n- quality: {:.4}\n- active_agents: {}\n- solutions: {}\n- signals: {}\n- depends_on: {}\n- recommendation: {}\n",
                slot.file_path,
                slot.status,
                slot.best_quality,
                slot.active_agent_count,
                slot.solution_count,
                slot.signal_count,
                slot.depends_on.join(", "),
                slot.recommendation,
            ));
        }
        self.send(WriteJob::WriteHiveState(out));
    }

    pub fn snapshot_dependency_map(&self, env: &Environment) {
        let snapshot = env.perceive(None);
        let mut out = String::from("# Dependency Map\n\n");
        for slot in &snapshot.slots {
            for dep in &slot.depends_on {
                let best = env.get_best_solution(dep);
                let pheromone = env.get_best_solution(&slot.file_path);
                let imported_names: Vec<String> = pheromone
                    .map(|p| {
                        p.imports
                            .iter()
                            .filter(|i| &i.from_file == dep)
                            .map(|i| i.name.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                let status = match &best {
                    Some(b) if imported_names.iter().all(|n| b.exports.contains(n)) => "OK",
                    Some(_) => "MISMATCH",
                    None => "NO_SOLUTION",
                };
                out.push_str(&format!(
                    "- {} imports {:?} from {} -> {}\n",
                    slot.file_path, imported_names, dep, status
                ));
            }
        }
        self.send(WriteJob::WriteDependencyMap(out));
    }

    /// Awaits drain of every write enqueued before this call.
    pub async fn flush(&self) {
        if !self.enabled {
            return;
        }
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Per-agent iteration log, last `max_synaptic_entries` entries,
    /// compactly formatted with derived repeated-failure/success patterns.
    pub async fn read_synapse(&self, agent_id: &str) -> String {
        if !self.enabled {
            return String::new();
        }
        let path = self.base_dir.join(SYNAPSES_DIR).join(format!("{agent_id}.md"));
        let text = match fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(_) => return String::new(),
        };
        let mut entries = SynapticEntry::parse_all(&text);
        let total = entries.len();
        if total > self.max_synaptic_entries {
            entries.drain(0..(total - self.max_synaptic_entries));
        }
        render_synapse_block(&entries)
    }

    /// Last `max_trail_markers` markers for one file.
    pub async fn read_trail_markers(&self, file_path: &str) -> String {
        if !self.enabled {
            return String::new();
        }
        let path = self
            .base_dir
            .join(TRAILS_DIR)
            .join(format!("{}.md", encode_file_path(file_path)));
        let text = match fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(_) => return String::new(),
        };
        let mut markers = TrailMarker::parse_all(&text);
        let total = markers.len();
        if total > self.max_trail_markers {
            markers.drain(0..(total - self.max_trail_markers));
        }
        render_trail_block(&markers)
    }
}

fn render_synapse_block(entries: &[SynapticEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut out = String::from("Recent iterations:\n");
    for e in entries {
        out.push_str(&format!(
            "- iter {} ({}): {} — quality={:.2} {}\n",
            e.iteration,
            e.file_path,
            e.action_label(),
            e.quality,
            if e.success { "compiled" } else { "failed" },
        ));
    }

    let mut by_file: HashMap<&str, (u32, u32)> = HashMap::new();
    for e in entries {
        let counter = by_file.entry(e.file_path.as_str()).or_insert((0, 0));
        if e.success {
            counter.0 += 1;
        } else {
            counter.1 += 1;
        }
    }
    let patterns: Vec<String> = by_file
        .into_iter()
        .filter_map(|(file, (successes, failures))| {
            if failures >= 2 && successes == 0 {
                Some(format!("{file}: repeated failures ({failures})"))
            } else if successes >= 2 && failures == 0 {
                Some(format!("{file}: repeated successes ({successes})"))
            } else {
                None
            }
        })
        .collect();
    if !patterns.is_empty() {
        out.push_str("Patterns:\n");
        for p in patterns {
            out.push_str(&format!("- {p}\n"));
        }
    }
    out
}

fn render_trail_block(markers: &[TrailMarker]) -> String {
    if markers.is_empty() {
        return String::new();
    }
    let mut out = String::from("Recent trail markers:\n");
    for m in markers {
        out.push_str(&format!(
            "- [{}] agent {} (quality={:.2}): {}\n",
            m.iteration, m.agent_id, m.quality, m.recommendation
        ));
    }
    out
}

impl SynapticEntry {
    fn action_label(&self) -> &'static str {
        match self.action {
            IterationAction::Explore => "explore",
            IterationAction::Submit => "submit",
            IterationAction::CompileCheck => "compile_check",
        }
    }
}

async fn run_writer(base_dir: PathBuf, enabled: bool, mut rx: mpsc::UnboundedReceiver<WriteJob>) {
    if !enabled {
        // Still drain the channel so senders never block, but do no I/O.
        while rx.recv().await.is_some() {}
        return;
    }

    while let Some(job) = rx.recv().await {
        let result = match job {
            WriteJob::AppendSynapse { agent_id, entry } => {
                append(&base_dir.join(SYNAPSES_DIR).join(format!("{agent_id}.md")), &entry.encode()).await
            }
            WriteJob::AppendTrail { file_path, marker } => {
                let name = format!("{}.md", encode_file_path(&file_path));
                append(&base_dir.join(TRAILS_DIR).join(name), &marker.encode()).await
            }
            WriteJob::WriteHiveState(content) => overwrite(&base_dir.join(HIVE_STATE_FILE), &content).await,
            WriteJob::WriteDependencyMap(content) => {
                overwrite(&base_dir.join(DEPENDENCY_MAP_FILE), &content).await
            }
            WriteJob::AppendQualityLog(line) => append(&base_dir.join(QUALITY_LOG_FILE), &line).await,
            WriteJob::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };
        if let Err(e) = result {
            error!(error = %e, "synaptic memory write failed");
        }
    }
}

async fn append(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(content.as_bytes()).await?;
    file.write_all(b"\n").await
}

async fn overwrite(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::task::{FileSlotSpec, TaskSpec};
    use chrono::Utc;

    #[tokio::test]
    async fn write_then_read_round_trips_through_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let memory = SynapticMemory::bootstrap(dir.path().to_path_buf(), true, 10, 5).await;

        memory.append_synaptic_entry(
            "A1",
            SynapticEntry {
                iteration: 1,
                timestamp: Utc::now(),
                file_path: "a.x".into(),
                action: IterationAction::Submit,
                quality: 0.6,
                success: true,
                errors: vec![],
                approach: "wrote a first pass".into(),
                outcome: "quality=0.6, compiled".into(),
            },
        );
        memory.flush().await;

        let rendered = memory.read_synapse("A1").await;
        assert!(rendered.contains("a.x"));
        assert!(rendered.contains("0.60"));
    }

    #[tokio::test]
    async fn caps_injected_history_at_max_entries() {
        let dir = tempfile::tempdir().unwrap();
        let memory = SynapticMemory::bootstrap(dir.path().to_path_buf(), true, 2, 5).await;

        for i in 0..5 {
            memory.append_synaptic_entry(
                "A1",
                SynapticEntry {
                    iteration: i,
                    timestamp: Utc::now(),
                    file_path: "a.x".into(),
                    action: IterationAction::Explore,
                    quality: 0.0,
                    success: false,
                    errors: vec![],
                    approach: "looked around".into(),
                    outcome: "no submission".into(),
                },
            );
        }
        memory.flush().await;

        let rendered = memory.read_synapse("A1").await;
        let iter_lines = rendered.lines().filter(|l| l.starts_with("- iter")).count();
        assert_eq!(iter_lines, 2);
    }

    #[tokio::test]
    async fn hive_state_snapshot_contains_every_slot() {
        let dir = tempfile::tempdir().unwrap();
        let memory = SynapticMemory::bootstrap(dir.path().to_path_buf(), true, 10, 5).await;

        let env = Environment::new(1.0);
        env.seed(&TaskSpec {
            project_name: "p".into(),
            description: "d".into(),
            file_slots: vec![FileSlotSpec {
                file_path: "a.x".into(),
                description: "".into(),
                depends_on: vec![],
            }],
        });
        memory.snapshot_hive_state(&env);
        memory.flush().await;

        let content = fs::read_to_string(dir.path().join(HIVE_STATE_FILE)).await.unwrap();
        assert!(content.contains("a.x"));
    }
}
