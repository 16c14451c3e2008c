//! Surefire 测试结果解析 (`TEST-*.xml`)

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseOutcome {
    Passed,
    Failed { message: String },
    Errored { message: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub class_name: String,
    pub outcome: CaseOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteResult {
    /// Fully qualified suite name, `geo.CircleTest`
    pub name: String,
    pub report: PathBuf,
    pub cases: Vec<TestCase>,
}

impl SuiteResult {
    /// `geo.CircleTest` -> `CircleTest`
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Failed and errored cases
    pub fn problems(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter().filter(|c| {
            matches!(c.outcome, CaseOutcome::Failed { .. } | CaseOutcome::Errored { .. })
        })
    }

    pub fn skipped(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome == CaseOutcome::Skipped).count()
    }
}

impl TestCase {
    /// Report line text for a failing case
    pub fn describe(&self) -> Option<String> {
        match &self.outcome {
            CaseOutcome::Failed { message } => Some(format!("test \"{}\" failed: {message}", self.name)),
            CaseOutcome::Errored { message } => Some(format!("test \"{}\" error: {message}", self.name)),
            _ => None,
        }
    }
}

fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `message`, else the exception type
fn problem_message(e: &BytesStart) -> String {
    attr(e, "message")
        .filter(|m| !m.trim().is_empty())
        .or_else(|| attr(e, "type"))
        .unwrap_or_else(|| "no message".to_string())
}

fn new_suite(e: &BytesStart, report: &Path) -> SuiteResult {
    SuiteResult {
        name: attr(e, "name").unwrap_or_default(),
        report: report.to_path_buf(),
        cases: Vec::new(),
    }
}

/// Record a `<failure>` / `<error>` / `<skipped>` child; the first one wins
fn mark(case: &mut Option<TestCase>, e: &BytesStart) {
    let outcome = match e.name().as_ref() {
        b"failure" => CaseOutcome::Failed { message: problem_message(e) },
        b"error" => CaseOutcome::Errored { message: problem_message(e) },
        b"skipped" => CaseOutcome::Skipped,
        _ => return,
    };
    if let Some(c) = case.as_mut() {
        if c.outcome == CaseOutcome::Passed {
            c.outcome = outcome;
        }
    }
}

fn new_case(e: &BytesStart, suite: &str) -> TestCase {
    TestCase {
        name: attr(e, "name").unwrap_or_default(),
        class_name: attr(e, "classname").unwrap_or_else(|| suite.to_string()),
        outcome: CaseOutcome::Passed,
    }
}

/// One result file; a `<testsuites>` wrapper yields several suites
pub fn parse_surefire(xml: &str, report: &Path) -> Result<Vec<SuiteResult>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut suites = Vec::new();
    let mut buf = Vec::new();
    let mut suite: Option<SuiteResult> = None;
    let mut case: Option<TestCase> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"testsuite" => suite = Some(new_suite(e, report)),
                b"testcase" => {
                    let suite_name = suite.as_ref().map(|s| s.name.as_str()).unwrap_or("");
                    case = Some(new_case(e, suite_name));
                }
                _ => mark(&mut case, e),
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"testsuite" => suites.push(new_suite(e, report)),
                b"testcase" => {
                    if let Some(s) = suite.as_mut() {
                        let c = new_case(e, &s.name);
                        s.cases.push(c);
                    }
                }
                _ => mark(&mut case, e),
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"testcase" => {
                    if let (Some(s), Some(c)) = (suite.as_mut(), case.take()) {
                        s.cases.push(c);
                    }
                }
                b"testsuite" => suites.extend(suite.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("test report parse error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(suites)
}

/// Every `TEST-*.xml` in the report directory, sorted by file name
///
/// A missing directory means no tests ran; it is logged, not an error.
pub fn load_surefire_dir(dir: &Path) -> Result<Vec<SuiteResult>> {
    if !dir.is_dir() {
        warn!("no test reports at {}", dir.display());
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("TEST-") && n.ends_with(".xml"))
        })
        .collect();
    files.sort();

    let mut suites = Vec::new();
    for file in &files {
        let xml = fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let parsed = parse_surefire(&xml, file)
            .with_context(|| format!("invalid test report {}", file.display()))?;
        suites.extend(parsed);
    }

    let skipped: usize = suites.iter().map(SuiteResult::skipped).sum();
    let failing: usize = suites.iter().map(|s| s.problems().count()).sum();
    info!("{} test suite(s), {failing} failing case(s), {skipped} skipped", suites.len());
    debug!("test reports read from {}", dir.display());
    Ok(suites)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="geo.CircleTest" tests="4" failures="1" errors="1" skipped="1">
  <properties><property name="java.version" value="17"/></properties>
  <testcase name="testArea" classname="geo.CircleTest" time="0.004">
    <failure message="expected:&lt;3.14&gt; but was:&lt;3.0&gt;" type="java.lang.AssertionError">at geo.CircleTest.testArea</failure>
  </testcase>
  <testcase name="testScale" classname="geo.CircleTest" time="0.001">
    <error type="java.lang.NullPointerException"/>
  </testcase>
  <testcase name="testLater" classname="geo.CircleTest"><skipped/></testcase>
  <testcase name="testOk" classname="geo.CircleTest" time="0"/>
</testsuite>
"#;

    #[test]
    fn test_parse_suite() {
        let suites = parse_surefire(SUITE, Path::new("TEST-geo.CircleTest.xml")).unwrap();
        assert_eq!(suites.len(), 1);
        let suite = &suites[0];
        assert_eq!(suite.simple_name(), "CircleTest");
        assert_eq!(suite.cases.len(), 4);
        assert_eq!(suite.skipped(), 1);

        let problems: Vec<String> = suite.problems().filter_map(TestCase::describe).collect();
        assert_eq!(
            problems,
            vec![
                "test \"testArea\" failed: expected:<3.14> but was:<3.0>",
                "test \"testScale\" error: java.lang.NullPointerException",
            ]
        );
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let suites = load_surefire_dir(Path::new("/nonexistent/surefire-reports")).unwrap();
        assert!(suites.is_empty());

        // target/ 存在但测试没跑过
        let dir = tempfile::tempdir().unwrap();
        assert!(load_surefire_dir(&dir.path().join("surefire-reports")).unwrap().is_empty());

        // 同名的普通文件也不是报告目录
        let file = dir.path().join("surefire-reports.txt");
        fs::write(&file, "not a directory").unwrap();
        assert!(load_surefire_dir(&file).unwrap().is_empty());
    }

    #[test]
    fn test_load_dir_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("TEST-b.BTest.xml"), SUITE.replace("geo.CircleTest", "b.BTest")).unwrap();
        fs::write(dir.path().join("TEST-a.ATest.xml"), SUITE.replace("geo.CircleTest", "a.ATest")).unwrap();
        fs::write(dir.path().join("a.ATest.txt"), "plain text summary").unwrap();

        let suites = load_surefire_dir(dir.path()).unwrap();
        let names: Vec<&str> = suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a.ATest", "b.BTest"]);
    }
}
