//! 外部构建 / 测试执行
//!
//! The build runs once per invocation, blocking until it exits. There is no
//! timeout and no retry.

use std::path::Path;
use std::process::Command;
use anyhow::Result;
use tracing::info;

use crate::error::PrecheckError;

pub const DEFAULT_BUILD_COMMAND: &[&str] = &["mvn", "-q", "clean", "test"];
pub const DEFAULT_COMPILER_COMMAND: &[&str] = &["javac", "-Xlint:all"];

/// Run `command` in `dir`; a launch failure or non-zero exit fails the coverage phase
pub fn run_build(command: &[String], dir: &Path) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Err(PrecheckError::ExternalTool {
            tool: "build".into(),
            reason: "no build command configured".into(),
        }
        .into());
    };

    info!("running {} in {}", command.join(" "), dir.display());
    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .status()
        .map_err(|e| PrecheckError::ExternalTool {
            tool: program.clone(),
            reason: format!("cannot launch: {e}"),
        })?;

    if !status.success() {
        return Err(PrecheckError::ExternalTool {
            tool: program.clone(),
            reason: format!("exited with {status}"),
        }
        .into());
    }
    Ok(())
}

/// Split a command line on whitespace (`"mvn -q clean test"`)
pub fn split_command(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

pub fn default_command(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}
