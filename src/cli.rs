//! CLI 模式处理器
//!
//! 默认输出人类可读格式，`--json` 输出 JSON。
//! Every handler returns the process exit status; errors bubble up to main.

use std::io;
use std::path::PathBuf;
use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::coverage::{load_jacoco, reconcile};
use crate::engine::{self, CheckReport, CoverageSection, RunOptions};
use crate::error::exit_code;
use crate::profile::{Group, Override, Profile, Setting, Settings, DEFAULT_PROFILE};
use crate::reachability::{detect_with_compiler, parse_compiler_output, with_classpath, UnreachableLocation};
use crate::report::{self, format_location};
use crate::rules::{registry, resolve};
use crate::runner::{self, DEFAULT_BUILD_COMMAND, DEFAULT_COMPILER_COMMAND};

/// Profile selection shared by every command that evaluates rules
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Built-in profile name or a .json / .yaml profile file
    #[arg(short, long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Explicit override, `group.key=value` (repeatable, last one wins)
    #[arg(long = "set", value_name = "GROUP.KEY=VALUE")]
    pub overrides: Vec<Override>,
}

/// Convenience switches, each one a fixed override
#[derive(Args, Debug, Clone, Default)]
pub struct RuleSwitches {
    /// Maximum line length (≤0 disables)
    #[arg(long, allow_hyphen_values = true)]
    pub max_line_length: Option<i64>,
    /// Disable JavaDoc presence checks
    #[arg(long)]
    pub no_javadoc: bool,
    /// Do not require @author
    #[arg(long)]
    pub no_author: bool,
    /// Do not require @version
    #[arg(long)]
    pub no_version: bool,
    /// Allow static fields used only once
    #[arg(long)]
    pub allow_globals: bool,
    /// Allow empty method bodies
    #[arg(long)]
    pub allow_empty: bool,
    /// Allow unused private methods
    #[arg(long)]
    pub allow_unused: bool,
    /// Do not require @Override
    #[arg(long)]
    pub no_override: bool,
    /// Do not require @Test in test files
    #[arg(long)]
    pub no_annotations: bool,
    /// Do not require a delta on decimal assertEquals
    #[arg(long)]
    pub no_delta: bool,
    /// Do not require full method coverage
    #[arg(long)]
    pub no_method_cov: bool,
    /// Do not require full branch coverage
    #[arg(long)]
    pub no_branch_cov: bool,
}

impl RuleSwitches {
    pub fn overrides(&self) -> Vec<Override> {
        let mut out = Vec::new();
        if let Some(n) = self.max_line_length {
            out.push(Override::new(Group::Style, "max_line_length", Setting::Number(n)));
        }
        let off = [
            (self.no_javadoc, Group::Style, "javadoc_required"),
            (self.no_author, Group::Style, "javadoc_require_author"),
            (self.no_version, Group::Style, "javadoc_require_version"),
            (self.allow_globals, Group::Style, "disallow_global_variables"),
            (self.allow_empty, Group::Style, "no_empty_methods"),
            (self.allow_unused, Group::Style, "no_unused_methods"),
            (self.no_override, Group::Style, "require_override"),
            (self.no_annotations, Group::Testing, "annotation_required"),
            (self.no_delta, Group::Testing, "require_assert_equals_delta"),
            (self.no_method_cov, Group::Testing, "require_full_method_coverage"),
            (self.no_branch_cov, Group::Testing, "require_full_branch_coverage"),
        ];
        for (set, group, key) in off {
            if set {
                out.push(Override::new(group, key, Setting::Bool(false)));
            }
        }
        out
    }
}

/// CLI Commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 📋 风格 / 测试检查，可选构建并核对覆盖率
    Check {
        /// Project root containing src/
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Check a single file read from standard input
        #[arg(long, conflicts_with = "run_tests")]
        stdin: bool,

        #[command(flatten)]
        profile: ProfileArgs,

        #[command(flatten)]
        switches: RuleSwitches,

        /// Run the build and the coverage checks afterwards
        #[arg(long)]
        run_tests: bool,

        /// Build/test command, run in the project root
        #[arg(long, default_value_t = DEFAULT_BUILD_COMMAND.join(" "))]
        build_command: String,

        /// Compiler used for unreachable-code warnings (sources are compiled standalone)
        #[arg(long, default_value_t = DEFAULT_COMPILER_COMMAND.join(" "))]
        compiler_command: String,

        /// Classpath for that compile; test files importing JUnit need it
        #[arg(long)]
        classpath: Option<String>,
    },

    /// 🔍 恒为 false 的字面量条件 (有发现即以状态 5 退出)
    Unreachable {
        /// Java files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Also list unreachable-code warnings from a saved compiler log
        #[arg(long)]
        compiler_log: Option<PathBuf>,
    },

    /// 📊 核对已有的 JaCoCo 报告
    Reconcile {
        /// jacoco.xml
        #[arg(long)]
        jacoco: PathBuf,

        /// Saved compiler output to take unreachable-code warnings from
        #[arg(long, conflicts_with = "sources")]
        compiler_log: Option<PathBuf>,

        /// Compile these sources to find unreachable code
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Compiler used with --sources
        #[arg(long, default_value_t = DEFAULT_COMPILER_COMMAND.join(" "))]
        compiler_command: String,

        /// Classpath for the --sources compile (JUnit jars for test files)
        #[arg(long)]
        classpath: Option<String>,

        #[command(flatten)]
        profile: ProfileArgs,

        #[command(flatten)]
        switches: RuleSwitches,
    },

    /// ⚙️ 列出所有规则及其在 profile 中的状态
    Rules {
        #[command(flatten)]
        profile: ProfileArgs,
    },
}

/// Convenience switches first, then `--set` values, so `--set` wins
fn overrides(profile: &ProfileArgs, switches: &RuleSwitches) -> Vec<Override> {
    let mut all = switches.overrides();
    all.extend(profile.overrides.iter().cloned());
    all
}

/// 处理 CLI 命令，返回退出码
pub fn handle_command(cmd: Command, json_output: bool) -> Result<i32> {
    match cmd {
        Command::Check {
            path,
            stdin,
            profile,
            switches,
            run_tests,
            build_command,
            compiler_command,
            classpath,
        } => {
            let options = RunOptions {
                profile: profile.profile.clone(),
                overrides: overrides(&profile, &switches),
                run_tests,
                build_command: runner::split_command(&build_command),
                compiler_command: with_classpath(
                    runner::split_command(&compiler_command),
                    classpath.as_deref(),
                ),
            };
            let report = if stdin {
                engine::check_stdin(io::stdin().lock(), &options)?
            } else {
                engine::check_project(&path, &options)?
            };
            print_report(&report, json_output)?;
            Ok(report.exit_code())
        }

        Command::Unreachable { paths, compiler_log } => {
            let units = engine::load_units(&paths)?;
            let found = engine::first_impossible_branches(&units)?;
            let advisory = match compiler_log {
                Some(log) => parse_compiler_output(&read_log(&log)?),
                None => Vec::new(),
            };

            if json_output {
                let output = json!({
                    "success": found.is_empty(),
                    "data": { "impossible_branches": found, "unreachable_code": advisory },
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_locations(&found);
                print_locations(&advisory);
                if found.is_empty() {
                    println!("{} No impossible branches in {} file(s)", report::PASS_MARK, units.len());
                } else {
                    println!("{} Impossible branch found", report::FAIL_MARK);
                }
            }

            Ok(if found.is_empty() { exit_code::SUCCESS } else { exit_code::IMPOSSIBLE_BRANCH })
        }

        Command::Reconcile {
            jacoco,
            compiler_log,
            sources,
            compiler_command,
            classpath,
            profile,
            switches,
        } => {
            let settings = Settings::load(&profile.profile, &overrides(&profile, &switches))?;
            let coverage = load_jacoco(&jacoco)?;

            let unreachable: Vec<UnreachableLocation> = match (compiler_log, sources) {
                (Some(log), _) => parse_compiler_output(&read_log(&log)?),
                (None, Some(dir)) => {
                    let files = crate::project_detector::discover_sources(&dir);
                    let command = with_classpath(runner::split_command(&compiler_command), classpath.as_deref());
                    detect_with_compiler(&command, &files)
                }
                (None, None) => Vec::new(),
            };

            let section = CoverageSection {
                outcome: reconcile(&coverage, &unreachable),
                unreachable,
                skipped_tests: 0,
                failures: Vec::new(),
            };
            let report = CheckReport::assemble(&settings, Vec::new(), Some(section), None);
            print_report(&report, json_output)?;
            Ok(report.exit_code())
        }

        Command::Rules { profile } => {
            let settings = Settings::load(&profile.profile, &profile.overrides)?;
            let rules = resolve(&settings);

            if json_output {
                let output = json!({
                    "success": true,
                    "data": {
                        "profile": settings.profile,
                        "builtin_profiles": Profile::builtin_names(),
                        "rules": rules,
                    },
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Profile: {}", settings.profile);
                for rule in &rules {
                    let mark = if rule.enabled { "on " } else { "off" };
                    let description = registry().get(rule.id).map(|d| d.description).unwrap_or("");
                    println!("  [{mark}] {:<22} {:<8} {description}", rule.id, rule.category.as_str());
                }
            }
            Ok(exit_code::SUCCESS)
        }
    }
}

fn read_log(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        crate::error::PrecheckError::Input(format!("{}: {e}", path.display())).into()
    })
}

fn print_locations(locations: &[UnreachableLocation]) {
    for loc in locations {
        println!("  • {}", format_location(loc));
    }
}

fn print_report(report: &CheckReport, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", report::render_json(report)?);
    } else {
        print!("{}", report::render_text(report));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Command,
    }

    #[test]
    fn test_switches_before_explicit_overrides() {
        let cli = TestCli::try_parse_from([
            "java-precheck", "check", "proj", "--no-author", "--max-line-length", "100",
            "--set", "style.javadoc_require_author=true",
        ])
        .unwrap();
        let Command::Check { path, profile, switches, .. } = cli.command else {
            panic!("expected check");
        };
        assert_eq!(path, PathBuf::from("proj"));

        let all = overrides(&profile, &switches);
        let settings = {
            let mut p = Profile::load(&profile.profile).unwrap();
            p.apply(&all);
            Settings::resolve(&p).unwrap()
        };
        assert!(settings.style.javadoc_require_author);
        assert_eq!(settings.style.max_line_length, 100);
    }

    #[test]
    fn test_classpath_option() {
        let cli = TestCli::try_parse_from([
            "java-precheck", "reconcile", "--jacoco", "jacoco.xml", "--sources", "src",
            "--classpath", "lib/junit.jar",
        ])
        .unwrap();
        let Command::Reconcile { classpath, compiler_command, .. } = cli.command else {
            panic!("expected reconcile");
        };
        let command = with_classpath(runner::split_command(&compiler_command), classpath.as_deref());
        assert_eq!(command, vec!["javac", "-Xlint:all", "-cp", "lib/junit.jar"]);
    }

    #[test]
    fn test_bad_override_rejected() {
        assert!(TestCli::try_parse_from(["java-precheck", "rules", "--set", "nonsense"]).is_err());
    }

    #[test]
    fn test_stdin_conflicts_with_run_tests() {
        assert!(TestCli::try_parse_from(["java-precheck", "check", "--stdin", "--run-tests"]).is_err());
    }
}
