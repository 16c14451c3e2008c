// ============================================================================
// 覆盖率模型 (Coverage)
// ============================================================================
//
// package -> class -> method，每个方法两组计数器 (METHOD / BRANCH)。
// 全部使用 BTreeMap，遍历顺序固定，核对结果可重复。
//
// ============================================================================

pub mod jacoco;
pub mod reconcile;
pub mod surefire;

use std::collections::BTreeMap;
use serde::Serialize;

pub use jacoco::{load_jacoco, parse_jacoco};
pub use reconcile::{reconcile, CoverageGap, CoverageOutcome};
pub use surefire::{load_surefire_dir, parse_surefire, SuiteResult};

/// missed / covered pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counter {
    pub missed: u64,
    pub covered: u64,
}

impl Counter {
    pub fn new(missed: u64, covered: u64) -> Self {
        Self { missed, covered }
    }

    pub fn total(&self) -> u64 {
        self.missed + self.covered
    }

    /// covered / total × 100; nothing to cover counts as 100%
    pub fn percent(&self) -> f64 {
        match self.total() {
            0 => 100.0,
            total => self.covered as f64 * 100.0 / total as f64,
        }
    }

    pub fn add(&mut self, other: Counter) {
        self.missed += other.missed;
        self.covered += other.covered;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Method,
    Branch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MethodCoverage {
    pub name: String,
    /// JVM descriptor, `(D)V`
    pub descriptor: String,
    pub line: Option<usize>,
    pub method: Counter,
    pub branch: Counter,
}

impl MethodCoverage {
    /// Unique within a class: overloads differ by descriptor
    pub fn key(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    pub fn counter(&self, kind: CounterKind) -> Counter {
        match kind {
            CounterKind::Method => self.method,
            CounterKind::Branch => self.branch,
        }
    }

    fn merge(&mut self, other: &MethodCoverage) {
        self.method.add(other.method);
        self.branch.add(other.branch);
        if self.line.is_none() {
            self.line = other.line;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassCoverage {
    /// VM name, `geometry/Circle$Inner`
    pub name: String,
    pub source_file: Option<String>,
    pub methods: BTreeMap<String, MethodCoverage>,
}

impl ClassCoverage {
    /// `geometry/Circle$Inner` -> `Circle$Inner`
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Source file stem used to join with file-based findings
    ///
    /// The report's `sourcefilename` wins; otherwise the outer class name.
    pub fn file_stem(&self) -> String {
        if let Some(source) = &self.source_file {
            return source.strip_suffix(".java").unwrap_or(source).to_string();
        }
        let simple = self.simple_name();
        simple.split('$').next().unwrap_or(simple).to_string()
    }

    /// Duplicate identities accumulate their counters
    pub fn insert_method(&mut self, method: MethodCoverage) {
        match self.methods.get_mut(&method.key()) {
            Some(existing) => existing.merge(&method),
            None => {
                self.methods.insert(method.key(), method);
            }
        }
    }

    pub fn total(&self, kind: CounterKind) -> Counter {
        let mut sum = Counter::default();
        for m in self.methods.values() {
            sum.add(m.counter(kind));
        }
        sum
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageCoverage {
    pub name: String,
    pub classes: BTreeMap<String, ClassCoverage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub packages: BTreeMap<String, PackageCoverage>,
}

impl CoverageReport {
    /// Get or create the class entry for `package` / `class`
    pub fn class_entry(&mut self, package: &str, class: &str) -> &mut ClassCoverage {
        let pkg = self.packages.entry(package.to_string()).or_insert_with(|| PackageCoverage {
            name: package.to_string(),
            classes: BTreeMap::new(),
        });
        pkg.classes.entry(class.to_string()).or_insert_with(|| ClassCoverage {
            name: class.to_string(),
            ..ClassCoverage::default()
        })
    }

    /// Every method with its package and class, in key order
    pub fn methods(&self) -> impl Iterator<Item = (&PackageCoverage, &ClassCoverage, &MethodCoverage)> {
        self.packages.values().flat_map(|p| {
            p.classes.values().flat_map(move |c| c.methods.values().map(move |m| (p, c, m)))
        })
    }

    pub fn total(&self, kind: CounterKind) -> Counter {
        let mut sum = Counter::default();
        for (_, _, m) in self.methods() {
            sum.add(m.counter(kind));
        }
        sum
    }
}
