//! 规则注册中心 (Rule Registry)
//!
//! 所有规则在 `definitions` 中集中定义；`resolve` 根据配置决定每条规则
//! 是否启用及其参数；`evaluator` 只为启用的规则实例化处理器。
//!
//! 规则之间相互独立：任何规则都不会抑制或依赖另一条规则的输出。

use std::collections::{BTreeMap, HashMap};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::profile::{Setting, Settings};

pub mod definitions;
pub mod evaluator;
pub mod javadoc;
pub mod style;
pub mod testing;

pub use evaluator::{RuleContext, RuleEvaluator};

/// 严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// 违规，导致整体失败
    Error,
    /// 仅提示，不影响结果
    Warning,
}

/// 规则类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Style,
    /// 只对测试文件生效
    Testing,
    Coverage,
    /// 文件读取问题
    Input,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Style => "style",
            Category::Testing => "testing",
            Category::Coverage => "coverage",
            Category::Input => "input",
        }
    }
}

/// 规则定义
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub description: &'static str,
    /// Profile key that enables or parameterises the rule
    pub setting: Option<&'static str>,
}

/// A rule as configured for this run
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub enabled: bool,
    pub parameters: BTreeMap<String, Setting>,
}

/// 诊断结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based; `None` for file-level findings
    pub line: Option<usize>,
    pub rule_id: String,
    pub category: Category,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(rule: &RuleDefinition, file: &str, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            line,
            rule_id: rule.id.to_string(),
            category: rule.category,
            message: message.into(),
            severity: rule.severity,
        }
    }

    /// Diagnostic for a registered rule id
    ///
    /// Unknown ids fall back to an input-category error so nothing is lost.
    pub fn for_rule(id: &str, file: &str, line: Option<usize>, message: impl Into<String>) -> Self {
        match registry().get(id) {
            Some(rule) => Self::new(rule, file, line, message),
            None => Self {
                file: file.to_string(),
                line,
                rule_id: id.to_string(),
                category: Category::Input,
                message: message.into(),
                severity: Severity::Error,
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// 规则注册表
pub struct RuleRegistry {
    /// 定义顺序即执行顺序
    ordered: Vec<RuleDefinition>,
    index: HashMap<&'static str, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        let ordered = definitions::all_rules();
        let index = ordered.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        Self { ordered, index }
    }

    pub fn get(&self, id: &str) -> Option<&RuleDefinition> {
        self.index.get(id).map(|&i| &self.ordered[i])
    }

    /// 按定义顺序返回所有规则
    pub fn all(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.ordered.iter()
    }

    pub fn by_category(&self, category: Category) -> Vec<&RuleDefinition> {
        self.ordered.iter().filter(|r| r.category == category).collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局规则注册表 (延迟初始化)
pub static REGISTRY: Lazy<RuleRegistry> = Lazy::new(RuleRegistry::new);

pub fn registry() -> &'static RuleRegistry {
    &REGISTRY
}

/// Every registered rule with its enabled flag and parameters for `settings`
pub fn resolve(settings: &Settings) -> Vec<Rule> {
    let s = &settings.style;
    let t = &settings.testing;

    registry().all().map(|def| {
        let mut parameters = BTreeMap::new();
        let enabled = match def.id {
            "INDENTATION" => {
                parameters.insert("spaces_per_indent".into(), Setting::Number(s.spaces_per_indent));
                s.spaces_per_indent > 0
            }
            "TAB_CHARACTER" => s.no_tabs,
            "MAX_LINE_LENGTH" => {
                parameters.insert("max_line_length".into(), Setting::Number(s.max_line_length));
                s.max_line_length > 0
            }
            "ONE_PUBLIC_TYPE" => s.one_public_class_per_file,
            "GLOBAL_STATE" => s.disallow_global_variables,
            "EMPTY_METHOD" => s.no_empty_methods,
            "UNUSED_PRIVATE_METHOD" => s.no_unused_methods,
            "JAVADOC_MISSING" => s.javadoc_required,
            "JAVADOC_AUTHOR" => s.javadoc_require_author,
            "JAVADOC_VERSION" => s.javadoc_require_version,
            "JAVADOC_PARAM" => s.javadoc_check_params,
            "JAVADOC_RETURN" => s.javadoc_check_return,
            "MISSING_OVERRIDE" => s.require_override,
            "CLOSING_BRACE_ALONE" => s.closing_brace_alone,
            "TEST_ANNOTATION" => t.annotation_required,
            "TEST_METHOD_PREFIX" => {
                parameters.insert("test_methods_prefix".into(), Setting::Text(t.test_methods_prefix.clone()));
                !t.test_methods_prefix.is_empty()
            }
            "ASSERT_EQUALS_DELTA" => t.require_assert_equals_delta,
            "TEST_FAILURE" => t.fail_on_test_failures,
            "METHOD_COVERAGE" => t.require_full_method_coverage,
            "BRANCH_COVERAGE" => t.require_full_branch_coverage,
            _ => true,
        };
        if def.category == Category::Testing {
            parameters.insert("test_file_suffix".into(), Setting::Text(t.test_file_suffix.clone()));
        }

        Rule {
            id: def.id,
            category: def.category,
            enabled,
            parameters,
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_initialization() {
        let registry = RuleRegistry::new();
        assert_eq!(registry.by_category(Category::Style).len(), 14);
        assert_eq!(registry.by_category(Category::Testing).len(), 4);
        assert!(registry.get("MISSING_OVERRIDE").is_some());
        assert!(registry.get("N_PLUS_ONE").is_none());
    }

    #[test]
    fn test_resolve_follows_settings() {
        let mut settings = Settings::default();
        settings.style.no_tabs = true;
        settings.style.spaces_per_indent = 0;

        let rules = resolve(&settings);
        let enabled = |id: &str| rules.iter().find(|r| r.id == id).map(|r| r.enabled);
        assert_eq!(enabled("TAB_CHARACTER"), Some(true));
        assert_eq!(enabled("INDENTATION"), Some(false));
        assert_eq!(enabled("MAX_LINE_LENGTH"), Some(false));
        assert_eq!(enabled("UNREADABLE_FILE"), Some(true));
    }

    #[test]
    fn test_diagnostic_for_rule() {
        let d = Diagnostic::for_rule("TAB_CHARACTER", "A.java", Some(3), "tab found (use spaces)");
        assert_eq!(d.category, Category::Style);
        assert!(d.is_error());
        let u = Diagnostic::for_rule("UNREADABLE_FILE", "B.java", None, "cannot read");
        assert_eq!(u.category, Category::Input);
        let unknown = Diagnostic::for_rule("NOT_A_RULE", "C.java", None, "x");
        assert_eq!(unknown.category, Category::Input);
    }
}
