// ============================================================================
// 静态可达性分析 (Static Reachability)
// ============================================================================
//
// 两个互相独立的检测器，输出同一种 UnreachableLocation:
// 1. compiler - 调用外部编译器一次，从诊断输出里文本匹配 unreachable 警告
// 2. literal  - 语法树上找两侧都是字面量的比较条件，求值恒为 false 的分支
//
// 结果只作为覆盖率核对的参考；单独运行时 literal 检测器的任何发现都是终止性的。
//
// ============================================================================

pub mod compiler;
pub mod literal;

use std::collections::BTreeSet;
use std::path::PathBuf;
use serde::Serialize;

use crate::scanner::file_stem;

pub use compiler::{detect_with_compiler, parse_compiler_output, with_classpath};
pub use literal::{detect_impossible_branches, evaluate_comparison, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Detector {
    Compiler,
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnreachableLocation {
    pub file: PathBuf,
    /// 1-based
    pub line: usize,
    /// Condition text, literal detector only
    pub expression: Option<String>,
    pub detector: Detector,
}

impl UnreachableLocation {
    pub fn stem(&self) -> Option<String> {
        file_stem(&self.file)
    }
}

/// File stems that contributed at least one finding
pub fn stems(locations: &[UnreachableLocation]) -> BTreeSet<String> {
    locations.iter().filter_map(UnreachableLocation::stem).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stems_deduplicate() {
        let at = |file: &str, line| UnreachableLocation {
            file: PathBuf::from(file),
            line,
            expression: None,
            detector: Detector::Compiler,
        };
        let found = stems(&[at("src/Circle.java", 3), at("src/Circle.java", 9), at("src/a/Shape.java", 1)]);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["Circle", "Shape"]);
    }
}
