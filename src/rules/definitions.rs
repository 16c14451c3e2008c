//! 规则定义
//!
//! 所有规则在此集中定义，确保单一数据源。定义顺序就是执行和报告顺序。

use super::{Category, RuleDefinition, Severity};

pub fn all_rules() -> Vec<RuleDefinition> {
    let mut rules = Vec::new();

    // === 风格规则 ===
    rules.extend(style_rules());

    // === JavaDoc 规则 ===
    rules.extend(javadoc_rules());

    // === 测试规则 ===
    rules.extend(testing_rules());

    // === 覆盖率 / 输入 ===
    rules.extend(run_rules());

    rules
}

fn style(id: &'static str, setting: &'static str, description: &'static str) -> RuleDefinition {
    RuleDefinition {
        id,
        category: Category::Style,
        severity: Severity::Error,
        description,
        setting: Some(setting),
    }
}

fn testing(id: &'static str, setting: &'static str, description: &'static str) -> RuleDefinition {
    RuleDefinition {
        id,
        category: Category::Testing,
        severity: Severity::Error,
        description,
        setting: Some(setting),
    }
}

// ============================================================================
// 风格规则
// ============================================================================

fn style_rules() -> Vec<RuleDefinition> {
    vec![
        style("INDENTATION", "spaces_per_indent",
            "Leading spaces must be a multiple of the indent unit"),
        style("TAB_CHARACTER", "no_tabs",
            "Code lines must not contain tab characters"),
        style("MAX_LINE_LENGTH", "max_line_length",
            "Lines must not exceed the configured length"),
        style("ONE_PUBLIC_TYPE", "one_public_class_per_file",
            "At most one top-level public class or interface per file"),
        style("GLOBAL_STATE", "disallow_global_variables",
            "Static fields must be referenced more than once"),
        style("EMPTY_METHOD", "no_empty_methods",
            "Methods and constructors must not have an empty body"),
        style("UNUSED_PRIVATE_METHOD", "no_unused_methods",
            "Private methods must be called somewhere in the file"),
        style("MISSING_OVERRIDE", "require_override",
            "Methods overriding a project superclass method need @Override"),
        style("CLOSING_BRACE_ALONE", "closing_brace_alone",
            "Nothing but a comment may follow the last closing brace on a line"),
    ]
}

fn javadoc_rules() -> Vec<RuleDefinition> {
    vec![
        style("JAVADOC_MISSING", "javadoc_required",
            "Public types and public/protected methods need a JavaDoc block"),
        style("JAVADOC_AUTHOR", "javadoc_require_author",
            "The first JavaDoc block must carry @author"),
        style("JAVADOC_VERSION", "javadoc_require_version",
            "The first JavaDoc block must carry @version"),
        style("JAVADOC_PARAM", "javadoc_check_params",
            "@param tags must match the declared parameters"),
        style("JAVADOC_RETURN", "javadoc_check_return",
            "Non-void methods need @return, void methods must not have one"),
    ]
}

// ============================================================================
// 测试规则 (仅测试文件)
// ============================================================================

fn testing_rules() -> Vec<RuleDefinition> {
    vec![
        testing("TEST_ANNOTATION", "annotation_required",
            "Test files must contain at least one @Test method"),
        testing("TEST_METHOD_PREFIX", "test_methods_prefix",
            "Public void test methods must start with the configured prefix"),
        testing("ASSERT_EQUALS_DELTA", "require_assert_equals_delta",
            "assertEquals on decimal values needs a tolerance argument"),
        testing("TEST_FAILURE", "fail_on_test_failures",
            "Every executed test case must pass"),
    ]
}

fn run_rules() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition {
            id: "METHOD_COVERAGE",
            category: Category::Coverage,
            severity: Severity::Error,
            description: "Every method must be executed by the tests",
            setting: Some("require_full_method_coverage"),
        },
        RuleDefinition {
            id: "BRANCH_COVERAGE",
            category: Category::Coverage,
            severity: Severity::Error,
            description: "Every reachable branch must be executed by the tests",
            setting: Some("require_full_branch_coverage"),
        },
        RuleDefinition {
            id: "UNREADABLE_FILE",
            category: Category::Input,
            severity: Severity::Error,
            description: "Source file could not be read",
            setting: None,
        },
    ]
}
