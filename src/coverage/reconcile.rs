// ============================================================================
// 覆盖率核对 (Coverage Reconciliation)
// ============================================================================
//
// 动态计数器 + 编译器报告的不可达代码 -> 有效覆盖率
//
// 豁免粒度是文件级的：某个类所在文件只要有一条不可达代码记录，
// 该类所有方法的缺失分支都视为已解释。方法覆盖率没有豁免。
// 不可达记录只能移除覆盖要求，不会凭空增加已覆盖数。
//
// ============================================================================

use std::collections::BTreeSet;
use serde::Serialize;
use tracing::debug;

use super::{Counter, CounterKind, CoverageReport};
use crate::reachability::{self, UnreachableLocation};

/// A method with missed counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageGap {
    pub package: String,
    /// Simple class name (`Circle$Ring` for nested classes)
    pub class: String,
    pub method: String,
    pub descriptor: String,
    pub line: Option<usize>,
    pub kind: CounterKind,
    pub missed: u64,
    /// Explained by an unreachable-code finding in the class's file
    pub waived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageOutcome {
    pub method: Counter,
    pub branch: Counter,
    pub method_gaps: Vec<CoverageGap>,
    /// Pre-waiver gaps, printed for visibility even when waived
    pub branch_gaps: Vec<CoverageGap>,
    pub remaining_branch_misses: u64,
    pub waived_branch_misses: u64,
    /// File stems whose findings waived at least one gap
    pub waiving_files: BTreeSet<String>,
}

impl CoverageOutcome {
    pub fn method_complete(&self) -> bool {
        self.method.missed == 0
    }

    pub fn branch_complete(&self) -> bool {
        self.remaining_branch_misses == 0
    }

    /// Branch percentage once waived misses no longer count
    pub fn effective_branch_percent(&self) -> f64 {
        Counter::new(self.remaining_branch_misses, self.branch.covered).percent()
    }
}

pub fn reconcile(report: &CoverageReport, unreachable: &[UnreachableLocation]) -> CoverageOutcome {
    let stems = reachability::stems(unreachable);

    let mut method_gaps = Vec::new();
    let mut branch_gaps = Vec::new();
    let mut remaining = 0;
    let mut waived_total = 0;
    let mut waiving_files = BTreeSet::new();

    for (package, class, method) in report.methods() {
        let gap = |kind: CounterKind, missed: u64, waived: bool| CoverageGap {
            package: package.name.clone(),
            class: class.simple_name().to_string(),
            method: method.name.clone(),
            descriptor: method.descriptor.clone(),
            line: method.line,
            kind,
            missed,
            waived,
        };

        if method.method.missed > 0 {
            method_gaps.push(gap(CounterKind::Method, method.method.missed, false));
        }

        let missed = method.branch.missed;
        if missed > 0 {
            let stem = class.file_stem();
            let waived = stems.contains(&stem);
            if waived {
                waived_total += missed;
                waiving_files.insert(stem);
            } else {
                remaining += missed;
            }
            branch_gaps.push(gap(CounterKind::Branch, missed, waived));
        }
    }

    debug!(
        "reconciled: {} branch miss(es) remaining, {} waived",
        remaining, waived_total
    );

    CoverageOutcome {
        method: report.total(CounterKind::Method),
        branch: report.total(CounterKind::Branch),
        method_gaps,
        branch_gaps,
        remaining_branch_misses: remaining,
        waived_branch_misses: waived_total,
        waiving_files,
    }
}
