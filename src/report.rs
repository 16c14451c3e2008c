//! 报告输出: 人类可读文本 / JSON
//!
//! stdout is the report channel; logs go to stderr.

use anyhow::Result;
use serde_json::{json, Value};

use crate::coverage::CoverageGap;
use crate::engine::{CheckReport, CoverageSection};
use crate::reachability::{Detector, UnreachableLocation};
use crate::rules::Diagnostic;

pub const PASS_MARK: &str = "✅";
pub const FAIL_MARK: &str = "❌";

/// `  • Line N: message`, line prefix omitted for file-level findings
pub fn format_diagnostic(diag: &Diagnostic) -> String {
    match diag.line {
        Some(line) => format!("  • Line {line}: {}", diag.message),
        None => format!("  • {}", diag.message),
    }
}

pub fn format_location(loc: &UnreachableLocation) -> String {
    match (&loc.expression, loc.detector) {
        (Some(expr), Detector::Literal) => {
            format!("{}:{}: condition \"{expr}\" is always false", loc.file.display(), loc.line)
        }
        _ => format!("{}:{}: unreachable code", loc.file.display(), loc.line),
    }
}

/// Gaps grouped package -> class -> method
fn render_gaps(out: &mut String, title: &str, gaps: &[CoverageGap]) {
    if gaps.is_empty() {
        return;
    }
    out.push_str(&format!("{title}:\n"));

    let mut package: Option<&str> = None;
    let mut class: Option<&str> = None;
    for gap in gaps {
        if package != Some(gap.package.as_str()) {
            let shown = if gap.package.is_empty() { "(default package)" } else { gap.package.as_str() };
            out.push_str(&format!("  {shown}\n"));
            package = Some(gap.package.as_str());
            class = None;
        }
        if class != Some(gap.class.as_str()) {
            out.push_str(&format!("    {}\n", gap.class));
            class = Some(gap.class.as_str());
        }
        let line = gap.line.map(|l| format!(" line {l}")).unwrap_or_default();
        let waived = if gap.waived { " (unreachable code in file)" } else { "" };
        out.push_str(&format!(
            "      {}{}{line}: {} missed{waived}\n",
            gap.method, gap.descriptor, gap.missed
        ));
    }
}

fn render_coverage(out: &mut String, section: &CoverageSection) {
    let outcome = &section.outcome;
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str("== coverage ==\n");
    out.push_str(&format!(
        "  • Method coverage {:.1}% ({}/{})\n",
        outcome.method.percent(),
        outcome.method.covered,
        outcome.method.total()
    ));
    out.push_str(&format!(
        "  • Branch coverage {:.1}% ({}/{})",
        outcome.branch.percent(),
        outcome.branch.covered,
        outcome.branch.total()
    ));
    if outcome.waived_branch_misses > 0 {
        out.push_str(&format!(", {:.1}% excluding unreachable code", outcome.effective_branch_percent()));
    }
    out.push('\n');
    for loc in &section.unreachable {
        out.push_str(&format!("  • {}\n", format_location(loc)));
    }
    if section.skipped_tests > 0 {
        out.push_str(&format!("  • {} test(s) skipped\n", section.skipped_tests));
    }
    for failure in &section.failures {
        out.push_str(&format!("  • {failure}\n"));
    }
    render_gaps(out, "Missed methods", &outcome.method_gaps);
    render_gaps(out, "Missed branches", &outcome.branch_gaps);
}

/// One banner line for the whole run
pub fn banner(report: &CheckReport) -> String {
    let verdict = &report.verdict;
    if verdict.passed {
        return match verdict.coverage_passed {
            Some(_) => format!("{PASS_MARK} Style/Test and coverage checks passed"),
            None => format!("{PASS_MARK} Style/Test checks passed"),
        };
    }
    if !verdict.checks_passed {
        format!("{FAIL_MARK} Style/Test checks failed")
    } else {
        format!("{FAIL_MARK} Coverage checks failed")
    }
}

pub fn render_text(report: &CheckReport) -> String {
    let mut out = String::new();
    // 只输出有诊断的文件
    for file in report.files.iter().filter(|f| !f.diagnostics.is_empty()) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("== {} ==\n", file.path.display()));
        for diag in &file.diagnostics {
            out.push_str(&format_diagnostic(diag));
            out.push('\n');
        }
    }

    if let Some(section) = &report.coverage {
        render_coverage(&mut out, section);
    }
    if let Some(err) = &report.coverage_error {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{FAIL_MARK} {err}\n"));
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&banner(report));
    out.push('\n');
    out
}

/// `{"success", "generated_at", "data"}` document
pub fn render_json(report: &CheckReport) -> Result<String> {
    let output = json!({
        "success": report.verdict.passed,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "data": report,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Error document for `--json` when the run could not complete
pub fn render_json_error(err: &anyhow::Error) -> String {
    let output: Value = json!({
        "success": false,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "error": format!("{err:#}"),
    });
    serde_json::to_string_pretty(&output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::coverage::{reconcile, Counter, CoverageReport, MethodCoverage};
    use crate::engine::FileReport;
    use crate::profile::Settings;

    fn settings() -> Settings {
        Settings::load("CS2114", &[]).unwrap()
    }

    fn files() -> Vec<FileReport> {
        vec![
            FileReport {
                path: PathBuf::from("src/Circle.java"),
                diagnostics: vec![
                    Diagnostic::for_rule("TAB_CHARACTER", "src/Circle.java", Some(4), "tab found (use spaces)"),
                    Diagnostic::for_rule("JAVADOC_AUTHOR", "src/Circle.java", None, "No JavaDoc blocks"),
                ],
            },
            FileReport {
                path: PathBuf::from("src/Shape.java"),
                diagnostics: Vec::new(),
            },
        ]
    }

    fn coverage() -> CoverageSection {
        let mut report = CoverageReport::default();
        let circle = report.class_entry("geo", "geo/Circle");
        circle.source_file = Some("Circle.java".into());
        circle.insert_method(MethodCoverage {
            name: "area".into(),
            descriptor: "()D".into(),
            line: Some(14),
            method: Counter::new(0, 1),
            branch: Counter::new(1, 3),
        });
        circle.insert_method(MethodCoverage {
            name: "unused".into(),
            descriptor: "()V".into(),
            line: Some(22),
            method: Counter::new(1, 0),
            branch: Counter::new(0, 0),
        });
        let unreachable = vec![UnreachableLocation {
            file: PathBuf::from("src/geo/Circle.java"),
            line: 17,
            expression: None,
            detector: Detector::Compiler,
        }];
        CoverageSection {
            outcome: reconcile(&report, &unreachable),
            unreachable,
            skipped_tests: 0,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_render_text_checks_only() {
        let report = CheckReport::assemble(&settings(), files(), None, None);
        insta::assert_snapshot!(render_text(&report).trim_end(), @r###"
== src/Circle.java ==
  • Line 4: tab found (use spaces)
  • No JavaDoc blocks

❌ Style/Test checks failed
"###);
    }

    #[test]
    fn test_render_text_with_coverage() {
        let report = CheckReport::assemble(&settings(), Vec::new(), Some(coverage()), None);
        insta::assert_snapshot!(render_text(&report).trim_end(), @r###"
== coverage ==
  • Method coverage 50.0% (1/2)
  • Branch coverage 75.0% (3/4), 100.0% excluding unreachable code
  • src/geo/Circle.java:17: unreachable code
  • Method coverage 50.0% <100%
Missed methods:
  geo
    Circle
      unused()V line 22: 1 missed
Missed branches:
  geo
    Circle
      area()D line 14: 1 missed (unreachable code in file)

❌ Coverage checks failed
"###);
    }

    #[test]
    fn test_clean_files_have_no_section() {
        let files = vec![
            FileReport { path: PathBuf::from("src/A.java"), diagnostics: Vec::new() },
            FileReport {
                path: PathBuf::from("src/B.java"),
                diagnostics: vec![Diagnostic::for_rule("LINE_LENGTH", "src/B.java", Some(3), "line too long")],
            },
            FileReport { path: PathBuf::from("src/C.java"), diagnostics: Vec::new() },
        ];
        let report = CheckReport::assemble(&settings(), files, None, None);
        let text = render_text(&report);

        assert!(text.starts_with("== src/B.java ==\n  • Line 3: line too long\n"));
        assert!(!text.contains("A.java"));
        assert!(!text.contains("C.java"));
    }

    #[test]
    fn test_clean_banner() {
        let clean = vec![FileReport { path: PathBuf::from("src/A.java"), diagnostics: Vec::new() }];
        let report = CheckReport::assemble(&settings(), clean, None, None);
        assert_eq!(banner(&report), "✅ Style/Test checks passed");
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_render_json() {
        let report = CheckReport::assemble(&settings(), files(), None, None);
        let value: Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["generated_at"].is_string());
        assert_eq!(value["data"]["files"][0]["diagnostics"][0]["rule_id"], "TAB_CHARACTER");
        assert_eq!(value["data"]["files"][0]["diagnostics"][1]["line"], Value::Null);
        assert_eq!(value["data"]["verdict"]["reasons"][0], "2 style violation(s)");
    }
}
