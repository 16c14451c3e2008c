// ============================================================================
// Java Pre-Submission Checker - Library Interface
// ============================================================================
//
// 模块按依赖顺序排列 (叶子在前)。main.rs 只通过 cli 使用它们。

pub mod error;
pub mod profile;
pub mod scanner;
pub mod symbol_table;
pub mod rules;
pub mod reachability;
pub mod coverage;
pub mod verdict;
pub mod project_detector;
pub mod runner;
pub mod engine;
pub mod report;
pub mod cli;
