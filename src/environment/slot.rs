//! File slots and their status classification.

use serde::{Deserialize, Serialize};

/// Closed status enumeration for a file slot (§4.1.3). Implemented as a
/// tagged sum type so an unhandled variant is a compile-time error (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Empty,
    Attempted,
    Partial,
    Solid,
    Excellent,
    Blocked,
}

impl SlotStatus {
    /// Maps a quality value in `[0, 1]` to its base status (§4.1.3), before
    /// the `blocked` override is considered.
    pub fn from_quality(quality: f64) -> Self {
        if quality <= 0.0 {
            SlotStatus::Empty
        } else if quality < 0.4 {
            SlotStatus::Attempted
        } else if quality < 0.65 {
            SlotStatus::Partial
        } else if quality < 0.85 {
            SlotStatus::Solid
        } else {
            SlotStatus::Excellent
        }
    }

    pub fn is_solid_or_better(&self) -> bool {
        matches!(self, SlotStatus::Solid | SlotStatus::Excellent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Empty => "empty",
            SlotStatus::Attempted => "attempted",
            SlotStatus::Partial => "partial",
            SlotStatus::Solid => "solid",
            SlotStatus::Excellent => "excellent",
            SlotStatus::Blocked => "blocked",
        }
    }
}

/// One artifact the task produces.
///
/// `depended_by` is the exact transpose of `depends_on` across all slots in
/// the environment (invariant 1, §8); it is recomputed by the environment
/// whenever slots are seeded, never mutated directly by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSlot {
    pub file_path: String,
    pub description: String,
    pub best_solution_id: Option<String>,
    pub best_quality: f64,
    pub depends_on: Vec<String>,
    pub depended_by: Vec<String>,
    pub status: SlotStatus,
}

impl FileSlot {
    pub fn new(file_path: String, description: String, depends_on: Vec<String>) -> Self {
        FileSlot {
            file_path,
            description,
            best_solution_id: None,
            best_quality: 0.0,
            depends_on,
            depended_by: Vec::new(),
            status: SlotStatus::Empty,
        }
    }
}
