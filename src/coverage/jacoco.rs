//! JaCoCo XML 报告解析
//!
//! Only method-scope counters are read. Class, package, report and
//! `sourcefile` totals are derived data and are ignored.

use std::fs;
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::{Counter, CoverageReport, MethodCoverage};
use crate::error::PrecheckError;

fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn counter_attrs(e: &BytesStart) -> Option<(String, Counter)> {
    let kind = attr(e, "type")?;
    let missed = attr(e, "missed")?.parse().ok()?;
    let covered = attr(e, "covered")?.parse().ok()?;
    Some((kind, Counter::new(missed, covered)))
}

fn method_attrs(e: &BytesStart) -> MethodCoverage {
    MethodCoverage {
        name: attr(e, "name").unwrap_or_default(),
        descriptor: attr(e, "desc").unwrap_or_default(),
        line: attr(e, "line").and_then(|l| l.parse().ok()),
        ..MethodCoverage::default()
    }
}

pub fn parse_jacoco(xml: &str) -> Result<CoverageReport> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut report = CoverageReport::default();
    let mut buf = Vec::new();

    // State tracking
    let mut package: Option<String> = None;
    let mut class: Option<(String, Option<String>)> = None;
    let mut method: Option<MethodCoverage> = None;
    let mut in_sourcefile = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"package" => package = attr(e, "name"),
                b"class" => class = attr(e, "name").map(|n| (n, attr(e, "sourcefilename"))),
                b"method" if class.is_some() => method = Some(method_attrs(e)),
                b"sourcefile" => in_sourcefile = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"counter" if !in_sourcefile => {
                    if let (Some(m), Some((kind, counter))) = (method.as_mut(), counter_attrs(e)) {
                        match kind.as_str() {
                            "METHOD" => m.method.add(counter),
                            "BRANCH" => m.branch.add(counter),
                            _ => {}
                        }
                    }
                }
                // 没有计数器的方法
                b"method" => {
                    if let (Some(pkg), Some((name, source))) = (&package, &class) {
                        let entry = report.class_entry(pkg, name);
                        entry.source_file = entry.source_file.take().or_else(|| source.clone());
                        entry.insert_method(method_attrs(e));
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"package" => package = None,
                b"class" => class = None,
                b"method" => {
                    if let (Some(m), Some(pkg), Some((name, source))) = (method.take(), &package, &class) {
                        let entry = report.class_entry(pkg, name);
                        entry.source_file = entry.source_file.take().or_else(|| source.clone());
                        entry.insert_method(m);
                    }
                }
                b"sourcefile" => in_sourcefile = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "JaCoCo XML parse error at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    debug!("coverage report: {} method(s)", report.methods().count());
    Ok(report)
}

/// Read the report written by the build; a missing file is an external-tool failure
pub fn load_jacoco(path: &Path) -> Result<CoverageReport> {
    if !path.is_file() {
        return Err(PrecheckError::MissingReport(path.to_path_buf()).into());
    }
    let xml = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_jacoco(&xml).with_context(|| format!("invalid coverage report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CounterKind;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="shapes">
  <sessioninfo id="host-1" start="1" dump="2"/>
  <package name="geo">
    <class name="geo/Circle" sourcefilename="Circle.java">
      <method name="&lt;init&gt;" desc="(D)V" line="9">
        <counter type="INSTRUCTION" missed="0" covered="6"/>
        <counter type="METHOD" missed="0" covered="1"/>
      </method>
      <method name="area" desc="()D" line="14">
        <counter type="BRANCH" missed="1" covered="3"/>
        <counter type="METHOD" missed="0" covered="1"/>
      </method>
      <method name="unused" desc="()V" line="22">
        <counter type="METHOD" missed="1" covered="0"/>
      </method>
      <counter type="METHOD" missed="1" covered="2"/>
    </class>
    <sourcefile name="Circle.java">
      <line nr="9" mi="0" ci="6" mb="0" cb="0"/>
      <counter type="BRANCH" missed="99" covered="0"/>
    </sourcefile>
    <counter type="BRANCH" missed="1" covered="3"/>
  </package>
  <counter type="BRANCH" missed="1" covered="3"/>
</report>
"#;

    #[test]
    fn test_parse_method_counters_only() {
        let report = parse_jacoco(REPORT).unwrap();
        let class = &report.packages["geo"].classes["geo/Circle"];

        assert_eq!(class.source_file.as_deref(), Some("Circle.java"));
        assert_eq!(class.methods.len(), 3);
        assert_eq!(class.methods["<init>(D)V"].line, Some(9));
        assert_eq!(class.methods["area()D"].branch, Counter::new(1, 3));
        assert_eq!(report.total(CounterKind::Method), Counter::new(1, 2));
        assert_eq!(report.total(CounterKind::Branch), Counter::new(1, 3));
    }

    #[test]
    fn test_malformed_report() {
        assert!(parse_jacoco("<report><package name=\"a\"></report>").is_err());
    }

    #[test]
    fn test_missing_report_is_external_failure() {
        let err = load_jacoco(Path::new("/nonexistent/jacoco.xml")).unwrap_err();
        assert_eq!(crate::error::exit_code_for(&err), crate::error::exit_code::EXTERNAL_TOOL);
    }
}
