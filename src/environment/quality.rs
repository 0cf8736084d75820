//! Language-agnostic quality scoring formula (§4.2).
//!
//! All four factors reference only content length and declared names, never
//! parsing — the Quality Evaluator is a pluggable validator plus this
//! arithmetic, not a compiler front-end.

use std::collections::HashSet;

use crate::environment::pheromone::ImportRef;

/// Inputs to the quality formula, gathered at `submit_solution` time.
pub struct QualityInputs<'a> {
    pub code: &'a str,
    pub validator_success: bool,
    pub declared_exports: &'a HashSet<String>,
    pub declared_imports: &'a HashSet<ImportRef>,
    /// For each import, whether its source file has a best solution and,
    /// if so, the set of names it exports. `None` means "no solution yet".
    pub import_resolution: &'a [ImportResolution],
}

pub struct ImportResolution {
    pub has_solution: bool,
    pub exports: HashSet<String>,
}

/// Computes the four additive factors and returns their sum, clamped to
/// `[0, 1]` (the "Quality bound" law, §8).
pub fn compute_quality(inputs: &QualityInputs) -> f64 {
    let validation = validation_factor(inputs.validator_success);
    let substance = substance_factor(inputs.code, inputs.declared_exports);
    let compatibility = compatibility_factor(inputs.declared_imports, inputs.import_resolution);
    let completeness = completeness_factor(inputs.code, inputs.declared_exports);

    (validation + substance + compatibility + completeness).clamp(0.0, 1.0)
}

fn validation_factor(success: bool) -> f64 {
    if success {
        0.40
    } else {
        0.0
    }
}

fn substance_factor(code: &str, declared_exports: &HashSet<String>) -> f64 {
    let lines = code.lines().count();
    let trimmed_len = code.trim().len();

    let mut factor = 0.0;
    if lines > 5 {
        factor += 0.05;
    }
    if lines > 15 {
        factor += 0.05;
    }
    if lines > 30 {
        factor += 0.05;
    }
    if !declared_exports.is_empty() {
        factor += 0.05;
    }
    if trimmed_len > 100 {
        factor += 0.05;
    }
    factor.min(0.25)
}

/// The raw compatibility score in `[0, 1]`, before the 0.20 weighting
/// (exposed separately so callers can attach it to a pheromone's
/// `compatibility_score` field — §3's "compatibilityScore ∈ [0,1]" — rather
/// than the already-weighted quality contribution).
pub fn compatibility_score(
    declared_imports: &HashSet<ImportRef>,
    import_resolution: &[ImportResolution],
) -> f64 {
    let mut score = 1.0_f64;
    for (imp, resolution) in declared_imports.iter().zip(import_resolution.iter()) {
        if !resolution.has_solution {
            score -= 0.3;
        } else if !resolution.exports.contains(&imp.name) {
            score -= 0.2;
        }
    }
    score.clamp(0.0, 1.0)
}

fn compatibility_factor(
    declared_imports: &HashSet<ImportRef>,
    import_resolution: &[ImportResolution],
) -> f64 {
    compatibility_score(declared_imports, import_resolution) * 0.20
}

fn completeness_factor(code: &str, declared_exports: &HashSet<String>) -> f64 {
    let lines = code.lines().count();
    let trimmed_len = code.trim().len();

    let mut factor = 0.0;
    if lines > 10 && trimmed_len > 200 {
        factor += 0.08;
    }
    if !declared_exports.is_empty() {
        factor += 0.07;
    }
    factor.min(0.15)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imports(n: usize) -> HashSet<ImportRef> {
        (0..n)
            .map(|i| ImportRef {
                name: format!("x{i}"),
                from_file: "s.x".into(),
            })
            .collect()
    }

    #[test]
    fn quality_never_escapes_unit_interval() {
        let declared_imports = imports(1);
        let resolutions = vec![ImportResolution {
            has_solution: false,
            exports: HashSet::new(),
        }];
        let inputs = QualityInputs {
            code: "",
            validator_success: false,
            declared_exports: &HashSet::new(),
            declared_imports: &declared_imports,
            import_resolution: &resolutions,
        };
        let q = compute_quality(&inputs);
        assert!((0.0..=1.0).contains(&q));
    }

    #[test]
    fn full_marks_when_everything_present() {
        let exports: HashSet<String> = ["f".to_string()].into_iter().collect();
        let inputs = QualityInputs {
            code: &"line\n".repeat(50),
            validator_success: true,
            declared_exports: &exports,
            declared_imports: &HashSet::new(),
            import_resolution: &[],
        };
        let q = compute_quality(&inputs);
        // 0.40 validation + 0.25 substance (all bonuses) + 0.20 compatibility
        // (no imports => perfect score) + 0.15 completeness (both bonuses).
        assert!((q - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_dependency_solution_costs_more_than_missing_export() {
        let exports: HashSet<String> = ["f".to_string()].into_iter().collect();
        let one_import = imports(1);

        let no_solution = vec![ImportResolution {
            has_solution: false,
            exports: HashSet::new(),
        }];
        let missing_export = vec![ImportResolution {
            has_solution: true,
            exports: HashSet::new(),
        }];

        let base = |res: &[ImportResolution]| {
            compute_quality(&QualityInputs {
                code: "line\n".repeat(20).as_str(),
                validator_success: true,
                declared_exports: &exports,
                declared_imports: &one_import,
                import_resolution: res,
            })
        };

        assert!(base(&no_solution) < base(&missing_export));
    }
}
