//! 错误分类与退出码
//!
//! Library code returns `anyhow::Result`; the variants below are the fatal
//! conditions the CLI needs to tell apart. Rule violations are never errors,
//! they are accumulated as diagnostics.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit statuses
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// Style, testing or coverage checks failed
    pub const VIOLATIONS: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const INPUT: i32 = 3;
    pub const EXTERNAL_TOOL: i32 = 4;
    /// Standalone literal detector found an always-false condition
    pub const IMPOSSIBLE_BRANCH: i32 = 5;
}

#[derive(Debug, Error)]
pub enum PrecheckError {
    #[error("profile \"{0}\" not found")]
    UnknownProfile(String),

    #[error("invalid profile {name}: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("expected directory \"{}\"", .0.display())]
    MissingSourceDir(PathBuf),

    #[error("cannot read input: {0}")]
    Input(String),

    #[error("{tool} failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    #[error("coverage report missing at {}", .0.display())]
    MissingReport(PathBuf),
}

impl PrecheckError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PrecheckError::UnknownProfile(_)
            | PrecheckError::InvalidProfile { .. }
            | PrecheckError::InvalidSetting { .. } => exit_code::CONFIGURATION,
            PrecheckError::MissingSourceDir(_) | PrecheckError::Input(_) => exit_code::INPUT,
            PrecheckError::ExternalTool { .. } | PrecheckError::MissingReport(_) => {
                exit_code::EXTERNAL_TOOL
            }
        }
    }

    /// Fatal to the coverage phase only; style diagnostics are still reported
    pub fn is_coverage_phase(&self) -> bool {
        self.exit_code() == exit_code::EXTERNAL_TOOL
    }
}

/// Exit status for an `anyhow` error that may wrap a [`PrecheckError`]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PrecheckError>()
        .map(PrecheckError::exit_code)
        .unwrap_or(exit_code::INPUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        assert_eq!(PrecheckError::UnknownProfile("x".into()).exit_code(), 2);
        assert_eq!(PrecheckError::MissingSourceDir(PathBuf::from("p/src")).exit_code(), 3);
        assert_eq!(PrecheckError::MissingReport(PathBuf::from("j.xml")).exit_code(), 4);
        assert!(PrecheckError::ExternalTool { tool: "mvn".into(), reason: "exit 1".into() }
            .is_coverage_phase());
    }

    #[test]
    fn test_exit_code_through_anyhow() {
        let err = anyhow::Error::new(PrecheckError::Input("stdin closed".into()));
        assert_eq!(exit_code_for(&err), exit_code::INPUT);
        assert_eq!(
            PrecheckError::MissingSourceDir(PathBuf::from("proj/src")).to_string(),
            "expected directory \"proj/src\""
        );
    }
}
