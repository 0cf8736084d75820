//! The only language-dependent collaborator (§6): a pluggable per-artifact
//! validator, e.g. a compiler or linter invocation.
//!
//! Grounded on the teacher's `core/storage::KeyValueStore`/`VectorStore`
//! traits (`async_trait` at an external-collaborator seam, implementors
//! swappable behind `Box<dyn Trait>`).

use std::collections::HashMap;

use async_trait::async_trait;

/// Outcome of validating one file's code against the current best solutions
/// of every other file (its compilation context).
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub success: bool,
    pub errors: Vec<String>,
}

/// `validate(filePath, code, contextFiles) -> {success, errors}` (§6).
///
/// Implementations must be deterministic given their inputs, must not mutate
/// `code` or `context_files`, and may be called concurrently from many
/// agents. A validator failure (panic, timeout) is the caller's
/// responsibility to downgrade to a non-success `ValidationOutcome` — this
/// trait itself carries no timeout; see §4.6.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        file_path: &str,
        code: &str,
        context_files: &HashMap<String, String>,
    ) -> ValidationOutcome;
}

/// The default validator when no language-specific one is supplied: always
/// succeeds with no errors (§6).
#[derive(Debug, Clone, Default)]
pub struct PassthroughValidator;

#[async_trait]
impl Validator for PassthroughValidator {
    async fn validate(
        &self,
        _file_path: &str,
        _code: &str,
        _context_files: &HashMap<String, String>,
    ) -> ValidationOutcome {
        ValidationOutcome {
            success: true,
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_always_succeeds() {
        let v = PassthroughValidator;
        let out = v.validate("a.x", "anything", &HashMap::new()).await;
        assert!(out.success);
        assert!(out.errors.is_empty());
    }
}
