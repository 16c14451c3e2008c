//! 编译器诊断检测器
//!
//! The compiler runs once over the whole file set in strict-warnings mode;
//! only its text output is inspected.

use std::path::PathBuf;
use std::process::Command;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{Detector, UnreachableLocation};

static UNREACHABLE_WARNING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?):(\d+): warning: unreachable code").expect("unreachable warning pattern")
});

/// `file:line: warning: unreachable code` lines of a saved compiler log
pub fn parse_compiler_output(output: &str) -> Vec<UnreachableLocation> {
    output.lines()
        .filter_map(|line| {
            let caps = UNREACHABLE_WARNING.captures(line.trim_end())?;
            let line_no = caps.get(2)?.as_str().parse().ok()?;
            Some(UnreachableLocation {
                file: PathBuf::from(caps.get(1)?.as_str()),
                line: line_no,
                expression: None,
                detector: Detector::Compiler,
            })
        })
        .collect()
}

/// Append `-cp <classpath>` so test sources that import JUnit still compile
pub fn with_classpath(mut command: Vec<String>, classpath: Option<&str>) -> Vec<String> {
    if let Some(cp) = classpath.filter(|cp| !cp.trim().is_empty()) {
        command.push("-cp".to_string());
        command.push(cp.to_string());
    }
    command
}

/// Compile every file once and collect unreachable-code warnings
///
/// `command` is the compiler plus its flags (`javac -Xlint:all`); the class
/// output goes to a scratch directory. A compiler that cannot be launched is
/// logged and yields no findings.
pub fn detect_with_compiler(command: &[String], files: &[PathBuf]) -> Vec<UnreachableLocation> {
    let Some((program, flags)) = command.split_first() else {
        warn!("no compiler configured, unreachable-code detection skipped");
        return Vec::new();
    };
    if files.is_empty() {
        return Vec::new();
    }

    let scratch = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!("cannot create compiler output directory: {e}");
            return Vec::new();
        }
    };

    info!("running {program} over {} file(s)", files.len());
    let output = Command::new(program)
        .args(flags)
        .arg("-d")
        .arg(scratch.path())
        .args(files)
        .output();

    match output {
        Ok(output) => {
            let mut log = String::from_utf8_lossy(&output.stderr).into_owned();
            log.push_str(&String::from_utf8_lossy(&output.stdout));
            let found = parse_compiler_output(&log);
            if !output.status.success() {
                // 编译错误时 javac 可能不再报告 unreachable code
                warn!(
                    "{program} exited with {}; unreachable-code findings may be incomplete (missing --classpath?)",
                    output.status
                );
            }
            debug!("{program}: {} unreachable-code warning(s)", found.len());
            found
        }
        Err(e) => {
            warn!("failed to launch {program}: {e}");
            Vec::new()
        }
    }
}
