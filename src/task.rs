//! Input to `Environment::seed` — the task specification (§6).

use serde::{Deserialize, Serialize};

/// One requested output artifact and its dependency edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSlotSpec {
    pub file_path: String,
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// The full task handed to `Environment::seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub project_name: String,
    pub description: String,
    pub file_slots: Vec<FileSlotSpec>,
}
