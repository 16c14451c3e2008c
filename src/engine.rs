// ============================================================================
// 检查引擎 (Check Engine)
// ============================================================================
//
// 单线程、固定顺序的流水线:
//   Profile -> 扫描全部文件 -> 符号表 -> 逐文件规则评估
//   (可选) 构建+测试 -> JaCoCo / surefire / 编译器警告 -> 覆盖率核对
//   -> Verdict
//
// 覆盖率阶段的致命错误只终止该阶段；已得到的诊断照常输出。
//
// ============================================================================

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coverage::{self, load_jacoco, load_surefire_dir, CoverageOutcome, SuiteResult};
use crate::error::{exit_code, PrecheckError};
use crate::profile::{Override, Settings, DEFAULT_PROFILE};
use crate::project_detector::{read_stdin_unit, Project};
use crate::reachability::{detect_impossible_branches, detect_with_compiler, UnreachableLocation};
use crate::rules::{Diagnostic, RuleEvaluator};
use crate::runner::{self, DEFAULT_BUILD_COMMAND, DEFAULT_COMPILER_COMMAND};
use crate::scanner::{scan_unit, JavaTreeSitterAnalyzer, ScannedUnit, SourceUnit};
use crate::symbol_table::SymbolTable;
use crate::verdict::{coverage_failures, Verdict};

/// Everything that used to be a process-wide flag
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub profile: String,
    pub overrides: Vec<Override>,
    /// Run the build and the coverage phase after the static checks
    pub run_tests: bool,
    pub build_command: Vec<String>,
    pub compiler_command: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            overrides: Vec::new(),
            run_tests: false,
            build_command: runner::default_command(DEFAULT_BUILD_COMMAND),
            compiler_command: runner::default_command(DEFAULT_COMPILER_COMMAND),
        }
    }
}

/// Diagnostics of one file, emitted only once the file is complete
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageSection {
    pub outcome: CoverageOutcome,
    pub unreachable: Vec<UnreachableLocation>,
    pub skipped_tests: usize,
    /// Unmet coverage requirements for the active profile
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub profile: String,
    pub files: Vec<FileReport>,
    pub coverage: Option<CoverageSection>,
    /// Fatal coverage-phase error, already rendered
    pub coverage_error: Option<String>,
    #[serde(skip)]
    coverage_exit: Option<i32>,
    pub verdict: Verdict,
}

impl CheckReport {
    /// Decide the verdict over everything gathered so far
    pub fn assemble(
        settings: &Settings,
        files: Vec<FileReport>,
        mut coverage: Option<CoverageSection>,
        error: Option<anyhow::Error>,
    ) -> Self {
        let diagnostics: Vec<Diagnostic> = files.iter()
            .flat_map(|f| f.diagnostics.iter().cloned())
            .collect();
        let coverage_error = error.as_ref().map(|e| format!("{e:#}"));
        let coverage_exit = error.as_ref().map(|e| {
            e.downcast_ref::<PrecheckError>()
                .map(PrecheckError::exit_code)
                .unwrap_or(exit_code::EXTERNAL_TOOL)
        });

        if let Some(section) = coverage.as_mut() {
            section.failures = coverage_failures(&section.outcome, &settings.testing);
        }
        let verdict = Verdict::decide(
            &diagnostics,
            coverage.as_ref().map(|c| &c.outcome),
            coverage_error.as_deref(),
            &settings.testing,
        );

        Self {
            profile: settings.profile.clone(),
            files,
            coverage,
            coverage_error,
            coverage_exit,
            verdict,
        }
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    /// A coverage-phase failure outranks plain violations
    pub fn exit_code(&self) -> i32 {
        self.coverage_exit.unwrap_or_else(|| self.verdict.exit_code())
    }
}

// ============================================================================
// 静态检查
// ============================================================================

/// Scan every unit, in order
pub fn scan_all(units: Vec<SourceUnit>) -> Result<Vec<ScannedUnit>> {
    let analyzer = JavaTreeSitterAnalyzer::new()?;
    Ok(units.into_iter().map(|unit| scan_unit(&analyzer, unit)).collect())
}

/// Evaluate the configured rules over already scanned units
///
/// The symbol table is built from every unit before the first evaluation.
pub fn evaluate_all(scanned: &[ScannedUnit], settings: &Settings) -> Vec<FileReport> {
    let symbols = SymbolTable::build(scanned);
    debug!("symbol table: {} type(s)", symbols.len());

    let evaluator = RuleEvaluator::from_settings(settings);
    info!("profile {}: {} rule(s) enabled", settings.profile, evaluator.rule_ids().len());

    scanned.iter()
        .map(|unit| {
            let diagnostics = evaluator.evaluate(unit, &symbols);
            debug!("{}: {} diagnostic(s)", unit.unit.display_path(), diagnostics.len());
            FileReport {
                path: unit.unit.path.clone(),
                diagnostics,
            }
        })
        .collect()
}

/// Static checks over in-memory units
pub fn check_units(units: Vec<SourceUnit>, settings: &Settings) -> Result<Vec<FileReport>> {
    let scanned = scan_all(units)?;
    Ok(evaluate_all(&scanned, settings))
}

/// Read every source; a file that cannot be read becomes an input diagnostic
fn read_sources(paths: &[PathBuf]) -> (Vec<SourceUnit>, Vec<FileReport>) {
    let mut units = Vec::new();
    let mut unreadable = Vec::new();

    for path in paths {
        match fs::read_to_string(path) {
            Ok(text) => units.push(SourceUnit::new(path.clone(), text)),
            Err(e) => {
                warn!("cannot read {}: {e}", path.display());
                let file = path.to_string_lossy();
                unreadable.push(FileReport {
                    path: path.clone(),
                    diagnostics: vec![Diagnostic::for_rule(
                        "UNREADABLE_FILE",
                        &file,
                        None,
                        format!("cannot read file: {e}"),
                    )],
                });
            }
        }
    }
    (units, unreadable)
}

/// Static checks over one unit read from `input`
pub fn check_stdin(input: impl Read, options: &RunOptions) -> Result<CheckReport> {
    let settings = Settings::load(&options.profile, &options.overrides)?;
    let unit = read_stdin_unit(input)?;
    let files = check_units(vec![unit], &settings)?;
    Ok(CheckReport::assemble(&settings, files, None, None))
}

/// Full run over a project directory
pub fn check_project(root: &Path, options: &RunOptions) -> Result<CheckReport> {
    // 配置错误在扫描前终止
    let settings = Settings::load(&options.profile, &options.overrides)?;
    let project = Project::detect(root)?;

    let (units, unreadable) = read_sources(&project.sources);
    let scanned = scan_all(units)?;
    let mut files = evaluate_all(&scanned, &settings);
    files.extend(unreadable);
    files.sort_by(|a, b| a.path.cmp(&b.path));

    if !options.run_tests {
        return Ok(CheckReport::assemble(&settings, files, None, None));
    }

    project.check_build_for_tests();
    match coverage_phase(&project, options, &settings, &scanned) {
        Ok((section, test_diagnostics)) => {
            for diag in test_diagnostics {
                attach(&mut files, diag);
            }
            Ok(CheckReport::assemble(&settings, files, Some(section), None))
        }
        Err(e) => {
            warn!("coverage phase failed: {e:#}");
            Ok(CheckReport::assemble(&settings, files, None, Some(e)))
        }
    }
}

// ============================================================================
// 覆盖率阶段
// ============================================================================

fn coverage_phase(
    project: &Project,
    options: &RunOptions,
    settings: &Settings,
    scanned: &[ScannedUnit],
) -> Result<(CoverageSection, Vec<Diagnostic>)> {
    runner::run_build(&options.build_command, &project.root)?;

    let report = load_jacoco(&project.jacoco_report())?;
    let unreachable = detect_with_compiler(&options.compiler_command, &project.sources);
    let outcome = coverage::reconcile(&report, &unreachable);

    let suites = load_surefire_dir(&project.surefire_dir())?;
    let skipped_tests = suites.iter().map(SuiteResult::skipped).sum();
    let test_diagnostics = if settings.testing.fail_on_test_failures {
        test_failure_diagnostics(&suites, scanned)
    } else {
        Vec::new()
    };

    Ok((
        CoverageSection {
            outcome,
            unreachable,
            skipped_tests,
            failures: Vec::new(),
        },
        test_diagnostics,
    ))
}

/// Failing and erroring cases, placed on the test source when it is known
pub fn test_failure_diagnostics(suites: &[SuiteResult], scanned: &[ScannedUnit]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for suite in suites {
        let source = scanned.iter().find(|s| {
            crate::scanner::file_stem(&s.unit.path).as_deref() == Some(suite.simple_name())
        });

        for case in suite.problems() {
            let Some(message) = case.describe() else { continue };
            let diag = match source {
                Some(unit) => {
                    let line = unit.callables()
                        .find(|c| c.name == case.name)
                        .map(|c| c.line);
                    Diagnostic::for_rule("TEST_FAILURE", &unit.unit.display_path(), line, message)
                }
                None => Diagnostic::for_rule("TEST_FAILURE", &suite.report.to_string_lossy(), None, message),
            };
            diagnostics.push(diag);
        }
    }
    diagnostics
}

/// Add a diagnostic to its file's report, creating the report when needed
fn attach(files: &mut Vec<FileReport>, diag: Diagnostic) {
    let path = PathBuf::from(&diag.file);
    match files.iter_mut().find(|f| f.path == path) {
        Some(file) => file.diagnostics.push(diag),
        None => files.push(FileReport {
            path,
            diagnostics: vec![diag],
        }),
    }
}

// ============================================================================
// 独立的不可达分支检测
// ============================================================================

/// Literal-condition findings of the first unit that has any
///
/// Each finding is terminal for the standalone command, so later units are
/// not parsed.
pub fn first_impossible_branches(units: &[SourceUnit]) -> Result<Vec<UnreachableLocation>> {
    let analyzer = JavaTreeSitterAnalyzer::new()?;
    for unit in units {
        let found = detect_impossible_branches(&analyzer, unit);
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

/// Read `paths` (files or directories of `*.java`) into units, in order
pub fn load_units(paths: &[PathBuf]) -> Result<Vec<SourceUnit>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(crate::project_detector::discover_sources(path));
        } else {
            files.push(path.clone());
        }
    }

    files.into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path)
                .map_err(|e| PrecheckError::Input(format!("{}: {e}", path.display())))?;
            Ok(SourceUnit::new(path, text))
        })
        .collect()
}
