//! Crate-wide error type.
//!
//! Per-tool and per-agent faults never unwind as `Err` into the
//! orchestrator (they are reported as data, see `agent::tools`); `HiveError`
//! is reserved for faults that are fatal at construction or that the
//! orchestrator surfaces as a hard stop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HiveError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown file path: {path} (valid paths: {valid:?})")]
    UnknownFilePath { path: String, valid: Vec<String> },

    #[error("synaptic memory error: {0}")]
    Memory(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HiveResult<T> = Result<T, HiveError>;
