// ============================================================================
// Integration Tests - Full Project Check and Coverage Reconciliation
// ============================================================================
//
// fixtures/shapes 是一个学生项目样本:
// - src/Shape.java       干净，没有任何诊断
// - src/Circle.java      风格违规 + 缺少 @Override
// - src/CircleTest.java  assertEquals 缺 delta、测试方法命名
// - target/              预先生成的 JaCoCo / surefire 报告
// - javac.log            保存的编译器输出 (含一条 unreachable code)

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use java_precheck::coverage::{load_jacoco, reconcile};
use java_precheck::engine::{self, CheckReport, FileReport, RunOptions};
use java_precheck::error::{exit_code, exit_code_for};
use java_precheck::profile::Override;
use java_precheck::reachability::parse_compiler_output;
use java_precheck::report::render_json;

mod common {
    use std::path::PathBuf;

    pub fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    pub fn shapes() -> PathBuf {
        fixtures_dir().join("shapes")
    }
}

fn file<'a>(report: &'a CheckReport, name: &str) -> &'a FileReport {
    report.files.iter()
        .find(|f| f.path.file_name().and_then(|n| n.to_str()) == Some(name))
        .unwrap_or_else(|| panic!("no report for {name}"))
}

fn rules_at(report: &FileReport) -> BTreeSet<(String, Option<usize>)> {
    report.diagnostics.iter().map(|d| (d.rule_id.clone(), d.line)).collect()
}

fn static_only() -> RunOptions {
    RunOptions::default()
}

// ============================================================================
// 静态检查
// ============================================================================

#[test]
fn test_static_check_of_sample_project() {
    let report = engine::check_project(&common::shapes(), &static_only()).unwrap();

    let names: Vec<String> = report.files.iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["Circle.java", "CircleTest.java", "Shape.java"]);

    assert!(file(&report, "Shape.java").diagnostics.is_empty());

    let circle = rules_at(file(&report, "Circle.java"));
    let expected: BTreeSet<(String, Option<usize>)> = [
        ("GLOBAL_STATE", 8),
        ("MISSING_OVERRIDE", 25),
        ("INDENTATION", 38),
        ("EMPTY_METHOD", 41),
        ("UNUSED_PRIVATE_METHOD", 41),
    ]
    .into_iter()
    .map(|(id, line)| (id.to_string(), Some(line)))
    .collect();
    assert_eq!(circle, expected);

    let test = rules_at(file(&report, "CircleTest.java"));
    assert!(test.contains(&("ASSERT_EQUALS_DELTA".to_string(), Some(18))));
    assert!(test.contains(&("TEST_METHOD_PREFIX".to_string(), Some(25))));
    assert_eq!(test.len(), 2);

    assert!(!report.verdict.passed);
    assert_eq!(report.verdict.coverage_passed, None);
    assert_eq!(report.exit_code(), exit_code::VIOLATIONS);
}

#[test]
fn test_overrides_replace_profile_values() {
    let options = RunOptions {
        overrides: vec![
            "style.require_override=false".parse::<Override>().unwrap(),
            "style.spaces_per_indent=2".parse::<Override>().unwrap(),
        ],
        ..static_only()
    };
    let report = engine::check_project(&common::shapes(), &options).unwrap();
    let circle = rules_at(file(&report, "Circle.java"));

    assert!(!circle.iter().any(|(id, _)| id == "MISSING_OVERRIDE"));
    assert!(!circle.iter().any(|(id, _)| id == "INDENTATION"));
    assert!(circle.iter().any(|(id, _)| id == "GLOBAL_STATE"));
}

#[test]
fn test_missing_source_dir_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = engine::check_project(dir.path(), &static_only()).unwrap_err();
    assert_eq!(exit_code_for(&err), exit_code::INPUT);
}

#[test]
fn test_unknown_profile_is_configuration_error() {
    let options = RunOptions {
        profile: "no-such-profile".into(),
        ..static_only()
    };
    let err = engine::check_project(&common::shapes(), &options).unwrap_err();
    assert_eq!(exit_code_for(&err), exit_code::CONFIGURATION);
}

#[test]
fn test_stdin_unit() {
    let source = "public class A {\n\tint x;\n}\n";
    let report = engine::check_stdin(source.as_bytes(), &static_only()).unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].path, PathBuf::from("stdin.java"));
    assert!(report.diagnostics().any(|d| d.rule_id == "TAB_CHARACTER" && d.line == Some(2)));
}

// ============================================================================
// 覆盖率阶段
// ============================================================================

#[cfg(unix)]
fn with_stub_build(build: &str) -> RunOptions {
    RunOptions {
        run_tests: true,
        build_command: vec![build.to_string()],
        // 不产生任何输出的 "编译器"
        compiler_command: vec!["true".to_string()],
        ..RunOptions::default()
    }
}

#[cfg(unix)]
#[test]
fn test_coverage_phase_with_prebuilt_reports() {
    let report = engine::check_project(&common::shapes(), &with_stub_build("true")).unwrap();

    let section = report.coverage.as_ref().expect("coverage section");
    assert!(section.unreachable.is_empty());
    assert_eq!(section.outcome.remaining_branch_misses, 1);
    assert_eq!(
        section.failures,
        vec!["Method coverage 83.3% <100%", "Branch coverage 50.0% <100%"]
    );

    let failing: Vec<_> = file(&report, "CircleTest.java").diagnostics.iter()
        .filter(|d| d.rule_id == "TEST_FAILURE")
        .collect();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].line, Some(16));
    assert!(failing[0].message.starts_with("test \"testArea\" failed: expected:<3.14159>"));

    assert_eq!(report.exit_code(), exit_code::VIOLATIONS);
}

#[cfg(unix)]
#[test]
fn test_failed_build_keeps_static_diagnostics() {
    let report = engine::check_project(&common::shapes(), &with_stub_build("false")).unwrap();

    assert!(report.coverage.is_none());
    assert!(report.coverage_error.as_deref().unwrap_or("").contains("false failed"));
    assert!(report.diagnostics().any(|d| d.rule_id == "MISSING_OVERRIDE"));
    assert_eq!(report.exit_code(), exit_code::EXTERNAL_TOOL);
}

#[test]
fn test_saved_compiler_log_waives_branch_gap() {
    let root = common::shapes();
    let coverage = load_jacoco(&root.join("target/site/jacoco/jacoco.xml")).unwrap();
    let log = std::fs::read_to_string(root.join("javac.log")).unwrap();
    let unreachable = parse_compiler_output(&log);
    assert_eq!(unreachable.len(), 1);
    assert_eq!(unreachable[0].line, 27);

    let strict = reconcile(&coverage, &[]);
    assert_eq!(strict.remaining_branch_misses, 1);

    let waived = reconcile(&coverage, &unreachable);
    assert_eq!(waived.remaining_branch_misses, 0);
    assert_eq!(waived.branch_gaps.len(), 1);
    assert!(waived.branch_gaps[0].waived);
    // 方法覆盖率没有豁免
    assert!(!waived.method_complete());
    assert_eq!(waived.method_gaps[0].method, "helper");
}

// ============================================================================
// 独立的不可达分支检测
// ============================================================================

#[test]
fn test_impossible_branch_detection() {
    let units = engine::load_units(&[common::fixtures_dir().join("impossible")]).unwrap();
    let found = engine::first_impossible_branches(&units).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, 6);
    assert_eq!(found[0].expression.as_deref(), Some("10 < 3"));

    let clean = engine::load_units(&[common::shapes().join("src/Shape.java")]).unwrap();
    assert!(engine::first_impossible_branches(&clean).unwrap().is_empty());
}

#[test]
fn test_missing_input_file() {
    let err = engine::load_units(&[Path::new("/nonexistent/A.java").to_path_buf()]).unwrap_err();
    assert_eq!(exit_code_for(&err), exit_code::INPUT);
}

#[test]
fn test_json_report() {
    let report = engine::check_project(&common::shapes(), &static_only()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

    assert_eq!(value["success"], false);
    assert_eq!(value["data"]["profile"], "CS2114");
    assert_eq!(value["data"]["files"].as_array().unwrap().len(), 3);
    assert!(value["data"]["coverage"].is_null());
}
