//! 最终判定 (pass / fail + reasons)
//!
//! Two independent checks feed the verdict: the style/testing diagnostics
//! and, when the build ran, the reconciled coverage.

use serde::Serialize;

use crate::coverage::CoverageOutcome;
use crate::error::exit_code;
use crate::profile::TestingSettings;
use crate::rules::{Category, Diagnostic};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    /// Style and testing diagnostics
    pub checks_passed: bool,
    /// `None` when the coverage phase did not run
    pub coverage_passed: Option<bool>,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn decide(
        diagnostics: &[Diagnostic],
        coverage: Option<&CoverageOutcome>,
        coverage_error: Option<&str>,
        testing: &TestingSettings,
    ) -> Self {
        let mut reasons = Vec::new();

        for (category, label) in [
            (Category::Style, "style"),
            (Category::Testing, "testing"),
            (Category::Input, "input"),
        ] {
            let count = diagnostics.iter()
                .filter(|d| d.is_error() && d.category == category)
                .count();
            if count > 0 {
                reasons.push(format!("{count} {label} violation(s)"));
            }
        }
        let checks_passed = reasons.is_empty();

        let coverage_passed = match (coverage, coverage_error) {
            (_, Some(err)) => {
                reasons.push(err.to_string());
                Some(false)
            }
            (Some(outcome), None) => {
                let failures = coverage_failures(outcome, testing);
                let ok = failures.is_empty();
                reasons.extend(failures);
                Some(ok)
            }
            (None, None) => None,
        };

        Self {
            passed: checks_passed && coverage_passed != Some(false),
            checks_passed,
            coverage_passed,
            reasons,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed {
            exit_code::SUCCESS
        } else {
            exit_code::VIOLATIONS
        }
    }
}

/// Coverage requirements that are not met
pub fn coverage_failures(outcome: &CoverageOutcome, testing: &TestingSettings) -> Vec<String> {
    let mut failures = Vec::new();
    if testing.require_full_method_coverage && !outcome.method_complete() {
        failures.push(format!("Method coverage {:.1}% <100%", outcome.method.percent()));
    }
    if testing.require_full_branch_coverage && !outcome.branch_complete() {
        failures.push(format!("Branch coverage {:.1}% <100%", outcome.effective_branch_percent()));
    }
    failures
}
