//! Import-compatibility check (§4.1.1) and reverse-export check (§4.1.2).
//!
//! These are pure functions over name sets — the environment owns the
//! mutation (clearing stale signals, inserting new ones); this module only
//! decides what the outcome *is*.

use std::collections::HashSet;

/// Outcome of checking one source file's exports against a set of names a
/// dependent file imports from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityOutcome {
    /// The source file has no best solution yet.
    NoSolutionYet { needed: Vec<String> },
    /// The source has a solution, but some imported names are missing.
    MissingNames {
        missing: Vec<String>,
        available: Vec<String>,
    },
    /// Everything imported resolves.
    Ok,
}

/// Evaluate one (dependent, source) pair: `imported_names` are the names
/// the dependent declares it imports from `source`; `source_exports` is
/// `None` when the source has no best solution yet.
pub fn check(imported_names: &HashSet<String>, source_exports: Option<&HashSet<String>>) -> CompatibilityOutcome {
    match source_exports {
        None => {
            let mut needed: Vec<String> = imported_names.iter().cloned().collect();
            needed.sort();
            CompatibilityOutcome::NoSolutionYet { needed }
        }
        Some(exports) => {
            let mut missing: Vec<String> = imported_names.difference(exports).cloned().collect();
            if missing.is_empty() {
                CompatibilityOutcome::Ok
            } else {
                missing.sort();
                let mut available: Vec<String> = exports.iter().cloned().collect();
                available.sort();
                CompatibilityOutcome::MissingNames { missing, available }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_solution_reports_all_needed_names() {
        let imported: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let outcome = check(&imported, None);
        match outcome {
            CompatibilityOutcome::NoSolutionYet { needed } => assert_eq!(needed, vec!["a", "b"]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn fully_resolved_imports_are_ok() {
        let imported: HashSet<String> = ["a".to_string()].into_iter().collect();
        let exports: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        assert_eq!(check(&imported, Some(&exports)), CompatibilityOutcome::Ok);
    }

    #[test]
    fn missing_names_are_reported_with_available_set() {
        let imported: HashSet<String> = ["a".to_string(), "c".to_string()].into_iter().collect();
        let exports: HashSet<String> = ["a".to_string()].into_iter().collect();
        match check(&imported, Some(&exports)) {
            CompatibilityOutcome::MissingNames { missing, available } => {
                assert_eq!(missing, vec!["c"]);
                assert_eq!(available, vec!["a"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
