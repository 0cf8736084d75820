//! Spatial pheromones — deposited candidate solutions anchored to a file.
//!
//! Grounded on the teacher's multi-channel decaying field
//! (`swarm/pheromone.rs`): the same "deposit, decay, threshold-drop" shape,
//! generalized here from a spatial grid cell to a per-file solution record.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An import declared by a file: `{name} from {fromFile}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportRef {
    pub name: String,
    pub from_file: String,
}

/// Validator outcome attached to a pheromone at deposit time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationMetadata {
    pub success: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialPheromone {
    pub id: String,
    pub file_path: String,
    pub code: String,
    pub quality: f64,
    pub strength: f64,
    pub depositors: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub exports: HashSet<String>,
    pub imports: HashSet<ImportRef>,
    pub compatibility_score: f64,
    pub metadata: ValidationMetadata,
}

impl SpatialPheromone {
    pub fn new(
        id: String,
        file_path: String,
        code: String,
        quality: f64,
        agent_id: String,
        exports: HashSet<String>,
        imports: HashSet<ImportRef>,
        metadata: ValidationMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        let mut depositors = HashSet::new();
        depositors.insert(agent_id);
        SpatialPheromone {
            id,
            file_path,
            code,
            quality: quality.clamp(0.0, 1.0),
            strength: 1.0,
            depositors,
            created_at: now,
            updated_at: now,
            exports,
            imports,
            compatibility_score: 1.0,
            metadata,
        }
    }

    /// Two pheromones are "similar" (§4.1 step 3) when they share the same
    /// export set and their code lengths are within an 0.8 ratio of each
    /// other.
    pub fn is_similar_to(&self, exports: &HashSet<String>, code: &str) -> bool {
        if &self.exports != exports {
            return false;
        }
        let a = self.code.len().max(1) as f64;
        let b = code.len().max(1) as f64;
        (a.min(b) / a.max(b)) > 0.8
    }

    /// Reinforce this pheromone with a new deposit from a different agent
    /// (§4.1 step 4). Returns the resulting quality.
    ///
    /// Open Question resolution (SPEC_FULL.md §4.1): the incoming
    /// code/exports/imports replace this pheromone's only when
    /// `incoming_quality >= self.quality` — the stricter rule the spec
    /// recommends over "within 0.1 of the reinforced quality", which can
    /// let a worse deposit overwrite a better one.
    pub fn reinforce(
        &mut self,
        agent_id: String,
        incoming_quality: f64,
        incoming_code: String,
        incoming_exports: HashSet<String>,
        incoming_imports: HashSet<ImportRef>,
        now: DateTime<Utc>,
    ) -> f64 {
        self.quality = (self.quality + 0.1).min(1.0);
        self.depositors.insert(agent_id);
        self.strength = 1.0;
        self.updated_at = now;

        if incoming_quality >= self.quality {
            self.code = incoming_code;
            self.exports = incoming_exports;
            self.imports = incoming_imports;
        }

        self.quality
    }

    /// Apply one evaporation tick (§4.1.4). Returns `false` if the
    /// pheromone should be dropped.
    pub fn evaporate(&mut self, rate: f64) -> bool {
        self.strength *= 1.0 - rate;
        self.strength >= 0.1
    }
}

/// Imports grouped by their declared source file, for the compatibility
/// checks in §4.1.1/§4.1.2.
pub fn group_imports_by_source(imports: &HashSet<ImportRef>) -> HashMap<String, HashSet<String>> {
    let mut grouped: HashMap<String, HashSet<String>> = HashMap::new();
    for imp in imports {
        grouped
            .entry(imp.from_file.clone())
            .or_default()
            .insert(imp.name.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn similar_requires_matching_exports_and_length_ratio() {
        let mut exports = HashSet::new();
        exports.insert("f".to_string());
        let p = SpatialPheromone::new(
            "p1".into(),
            "a.x".into(),
            "x".repeat(100),
            0.5,
            "G1".into(),
            exports.clone(),
            HashSet::new(),
            ValidationMetadata::default(),
            now(),
        );
        assert!(p.is_similar_to(&exports, &"x".repeat(90)));
        assert!(!p.is_similar_to(&exports, &"x".repeat(10)));
        let mut other_exports = HashSet::new();
        other_exports.insert("g".to_string());
        assert!(!p.is_similar_to(&other_exports, &"x".repeat(100)));
    }

    #[test]
    fn reinforcement_is_monotonic_and_merges_depositors() {
        let exports: HashSet<String> = ["f".to_string()].into_iter().collect();
        let mut p = SpatialPheromone::new(
            "p1".into(),
            "a.x".into(),
            "code-v1".into(),
            0.5,
            "G1".into(),
            exports.clone(),
            HashSet::new(),
            ValidationMetadata::default(),
            now(),
        );
        let first_quality = p.quality;
        let result = p.reinforce("G2".into(), 0.5, "code-v2".into(), exports, HashSet::new(), now());
        assert!(result >= first_quality);
        assert_eq!(p.depositors.len(), 2);
    }

    #[test]
    fn stricter_overwrite_rule_rejects_worse_incoming_code() {
        let exports: HashSet<String> = ["f".to_string()].into_iter().collect();
        let mut p = SpatialPheromone::new(
            "p1".into(),
            "a.x".into(),
            "good-code".into(),
            0.9,
            "G1".into(),
            exports.clone(),
            HashSet::new(),
            ValidationMetadata::default(),
            now(),
        );
        // incoming quality (0.3) straddles below the post-bump quality, so
        // the stricter rule must keep the original code.
        p.reinforce("G2".into(), 0.3, "worse-code".into(), exports, HashSet::new(), now());
        assert_eq!(p.code, "good-code");
    }

    #[test]
    fn evaporation_drops_below_threshold() {
        let exports: HashSet<String> = HashSet::new();
        let mut p = SpatialPheromone::new(
            "p1".into(),
            "a.x".into(),
            "code".into(),
            0.5,
            "G1".into(),
            exports,
            HashSet::new(),
            ValidationMetadata::default(),
            now(),
        );
        p.strength = 1.0;
        assert!(p.evaporate(0.5)); // 0.5
        assert!(p.evaporate(0.5)); // 0.25
        assert!(p.evaporate(0.5)); // 0.125
        assert!(!p.evaporate(0.5)); // 0.0625 < 0.1
    }
}
