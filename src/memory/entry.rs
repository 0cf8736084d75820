//! Durable record types and their markdown encoding (§3, §4.4, §6).
//!
//! Readers parse with tolerant regular-expression extraction and silently
//! skip malformed blocks — the same posture as the teacher's own
//! best-effort `as_str().unwrap_or(...)` JSON field access in
//! `core/tools.rs`, here applied to markdown instead of JSON.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One agent iteration, as durably logged to `synapses/<agentId>.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynapticEntry {
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,
    pub file_path: String,
    pub action: IterationAction,
    pub quality: f64,
    pub success: bool,
    pub errors: Vec<String>,
    pub approach: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationAction {
    Explore,
    Submit,
    CompileCheck,
}

impl IterationAction {
    fn as_str(&self) -> &'static str {
        match self {
            IterationAction::Explore => "explore",
            IterationAction::Submit => "submit",
            IterationAction::CompileCheck => "compile_check",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "explore" => Some(IterationAction::Explore),
            "submit" => Some(IterationAction::Submit),
            "compile_check" => Some(IterationAction::CompileCheck),
            _ => None,
        }
    }
}

impl SynapticEntry {
    pub fn encode(&self) -> String {
        let errors = if self.errors.is_empty() {
            "none".to_string()
        } else {
            self.errors.join("; ")
        };
        format!(
            "## Iteration {}\n\
             - timestamp: {}\n\
             - file: {}\n\
             - action: {}\n\
             - quality: {:.4}\n\
             - success: {}\n\
             - errors: {}\n\
             - approach: {}\n\
             - outcome: {}\n",
            self.iteration,
            self.timestamp.to_rfc3339(),
            self.file_path,
            self.action.as_str(),
            self.quality,
            self.success,
            errors,
            self.approach,
            self.outcome,
        )
    }

    /// Parse every well-formed `## Iteration N` block in `text`, skipping
    /// anything malformed.
    pub fn parse_all(text: &str) -> Vec<SynapticEntry> {
        let block_re = Regex::new(r"(?m)^## Iteration (\d+)\n((?:- .+\n?)+)").unwrap();
        let mut entries = Vec::new();
        for cap in block_re.captures_iter(text) {
            let iteration: u32 = match cap[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let body = &cap[2];
            let fields = parse_fields(body);

            let timestamp = fields
                .get("timestamp")
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&Utc));
            let file_path = fields.get("file").cloned();
            let action = fields.get("action").and_then(|s| IterationAction::parse(s));
            let quality = fields.get("quality").and_then(|s| s.trim().parse::<f64>().ok());
            let success = fields.get("success").map(|s| s.trim() == "true");

            let (timestamp, file_path, action, quality, success) =
                match (timestamp, file_path, action, quality, success) {
                    (Some(t), Some(f), Some(a), Some(q), Some(s)) => (t, f, a, q, s),
                    _ => continue,
                };

            let errors = fields
                .get("errors")
                .map(|s| parse_error_list(s))
                .unwrap_or_default();
            let approach = fields.get("approach").cloned().unwrap_or_default();
            let outcome = fields.get("outcome").cloned().unwrap_or_default();

            entries.push(SynapticEntry {
                iteration,
                timestamp,
                file_path,
                action,
                quality,
                success,
                errors,
                approach,
                outcome,
            });
        }
        entries
    }
}

/// Per-file advisory marker logged to `trails/<filePath-encoded>.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailMarker {
    pub agent_id: String,
    pub iteration: u32,
    pub quality: f64,
    pub success: bool,
    pub errors: Vec<String>,
    pub exports: Vec<String>,
    pub recommendation: String,
    pub timestamp: DateTime<Utc>,
}

impl TrailMarker {
    pub fn encode(&self) -> String {
        let errors = if self.errors.is_empty() {
            "none".to_string()
        } else {
            self.errors.join("; ")
        };
        let exports = if self.exports.is_empty() {
            "none".to_string()
        } else {
            self.exports.join(", ")
        };
        format!(
            "## Trail {}-{}\n\
             - timestamp: {}\n\
             - agent: {}\n\
             - iteration: {}\n\
             - quality: {:.4}\n\
             - success: {}\n\
             - errors: {}\n\
             - exports: {}\n\
             - recommendation: {}\n",
            self.agent_id,
            self.iteration,
            self.timestamp.to_rfc3339(),
            self.agent_id,
            self.iteration,
            self.quality,
            self.success,
            errors,
            exports,
            self.recommendation,
        )
    }

    pub fn parse_all(text: &str) -> Vec<TrailMarker> {
        let block_re = Regex::new(r"(?m)^## Trail [^\n]+\n((?:- .+\n?)+)").unwrap();
        let mut markers = Vec::new();
        for cap in block_re.captures_iter(text) {
            let body = &cap[1];
            let fields = parse_fields(body);

            let timestamp = fields
                .get("timestamp")
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&Utc));
            let agent_id = fields.get("agent").cloned();
            let iteration = fields.get("iteration").and_then(|s| s.trim().parse::<u32>().ok());
            let quality = fields.get("quality").and_then(|s| s.trim().parse::<f64>().ok());
            let success = fields.get("success").map(|s| s.trim() == "true");

            let (timestamp, agent_id, iteration, quality, success) =
                match (timestamp, agent_id, iteration, quality, success) {
                    (Some(t), Some(a), Some(i), Some(q), Some(s)) => (t, a, i, q, s),
                    _ => continue,
                };

            let errors = fields.get("errors").map(|s| parse_error_list(s)).unwrap_or_default();
            let exports = fields
                .get("exports")
                .map(|s| parse_comma_list(s))
                .unwrap_or_default();
            let recommendation = fields.get("recommendation").cloned().unwrap_or_default();

            markers.push(TrailMarker {
                agent_id,
                iteration,
                quality,
                success,
                errors,
                exports,
                recommendation,
                timestamp,
            });
        }
        markers
    }
}

fn parse_fields(body: &str) -> std::collections::HashMap<String, String> {
    let line_re = Regex::new(r"(?m)^- ([a-zA-Z_]+):\s*(.*)$").unwrap();
    let mut map = std::collections::HashMap::new();
    for cap in line_re.captures_iter(body) {
        map.insert(cap[1].to_string(), cap[2].trim().to_string());
    }
    map
}

fn parse_error_list(s: &str) -> Vec<String> {
    if s.trim() == "none" || s.trim().is_empty() {
        Vec::new()
    } else {
        s.split(';').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
    }
}

fn parse_comma_list(s: &str) -> Vec<String> {
    if s.trim() == "none" || s.trim().is_empty() {
        Vec::new()
    } else {
        s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
    }
}
