// ============================================================================
// RuleHandler Trait - 规则处理器抽象
// ============================================================================
//
// 每条规则实现自己的 Handler，RuleEvaluator 只持有启用规则的
// CompiledRule (定义 + Box<dyn RuleHandler>)。
//
// 规则从不抛错：输入再畸形，也只会返回 (可能为空的) Finding 列表。
//
// ============================================================================

use tracing::trace;

use super::{javadoc, registry, resolve, style, testing};
use super::{Category, Diagnostic, Rule, RuleDefinition};
use crate::profile::Settings;
use crate::scanner::{ScannedUnit, SourceUnit};
use crate::symbol_table::SymbolTable;

/// 规则处理上下文
pub struct RuleContext<'a> {
    pub scanned: &'a ScannedUnit,
    pub symbols: &'a SymbolTable,
    pub is_test_file: bool,
}

impl RuleContext<'_> {
    pub fn text(&self) -> &str {
        &self.scanned.unit.text
    }
}

/// One violation found by a handler, before it is tied to a rule and file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub line: Option<usize>,
    pub message: String,
}

impl Finding {
    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self { line: Some(line), message: message.into() }
    }

    pub fn file_level(message: impl Into<String>) -> Self {
        Self { line: None, message: message.into() }
    }
}

/// 规则处理器 trait
pub trait RuleHandler: Send + Sync {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding>;
}

pub struct CompiledRule {
    pub definition: &'static RuleDefinition,
    handler: Box<dyn RuleHandler>,
}

/// Handler for an enabled rule; rules evaluated elsewhere get `None`
fn handler_for(rule: &Rule, settings: &Settings) -> Option<Box<dyn RuleHandler>> {
    let s = &settings.style;
    let handler: Box<dyn RuleHandler> = match rule.id {
        "INDENTATION" => Box::new(style::IndentationHandler {
            unit: usize::try_from(s.spaces_per_indent).ok()?,
        }),
        "TAB_CHARACTER" => Box::new(style::TabHandler),
        "MAX_LINE_LENGTH" => Box::new(style::LineLengthHandler {
            max: usize::try_from(s.max_line_length).ok()?,
        }),
        "ONE_PUBLIC_TYPE" => Box::new(style::OnePublicTypeHandler),
        "GLOBAL_STATE" => Box::new(style::GlobalStateHandler),
        "EMPTY_METHOD" => Box::new(style::EmptyMethodHandler),
        "UNUSED_PRIVATE_METHOD" => Box::new(style::UnusedPrivateMethodHandler),
        "MISSING_OVERRIDE" => Box::new(style::OverrideHandler),
        "CLOSING_BRACE_ALONE" => Box::new(style::ClosingBraceHandler),
        "JAVADOC_MISSING" => Box::new(javadoc::MissingJavadocHandler),
        "JAVADOC_AUTHOR" => Box::new(javadoc::FirstBlockTagHandler {
            tag: "author",
            report_missing_blocks: true,
        }),
        // 两条规则都启用时 "No JavaDoc blocks" 只报一次
        "JAVADOC_VERSION" => Box::new(javadoc::FirstBlockTagHandler {
            tag: "version",
            report_missing_blocks: !s.javadoc_require_author,
        }),
        "JAVADOC_PARAM" => Box::new(javadoc::ParamTagHandler),
        "JAVADOC_RETURN" => Box::new(javadoc::ReturnTagHandler),
        "TEST_ANNOTATION" => Box::new(testing::TestAnnotationHandler),
        "TEST_METHOD_PREFIX" => Box::new(testing::TestMethodPrefixHandler {
            prefix: settings.testing.test_methods_prefix.clone(),
        }),
        "ASSERT_EQUALS_DELTA" => Box::new(testing::AssertEqualsDeltaHandler),
        _ => return None,
    };
    Some(handler)
}

/// The configured rule set, built once per run
pub struct RuleEvaluator {
    rules: Vec<CompiledRule>,
    test_file_suffix: String,
}

impl RuleEvaluator {
    /// Instantiate handlers for enabled rules only
    pub fn from_settings(settings: &Settings) -> Self {
        let rules = resolve(settings)
            .into_iter()
            .filter(|rule| rule.enabled)
            .filter_map(|rule| {
                let definition = registry().get(rule.id)?;
                let handler = handler_for(&rule, settings)?;
                Some(CompiledRule { definition, handler })
            })
            .collect();

        Self {
            rules,
            test_file_suffix: settings.testing.test_file_suffix.clone(),
        }
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.definition.id).collect()
    }

    pub fn is_test_file(&self, unit: &SourceUnit) -> bool {
        unit.is_test_file(&self.test_file_suffix)
    }

    /// Run every rule over one unit, in rule order
    pub fn evaluate(&self, scanned: &ScannedUnit, symbols: &SymbolTable) -> Vec<Diagnostic> {
        let ctx = RuleContext {
            scanned,
            symbols,
            is_test_file: self.is_test_file(&scanned.unit),
        };
        let file = scanned.unit.display_path();

        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            if rule.definition.category == Category::Testing && !ctx.is_test_file {
                continue;
            }
            let findings = rule.handler.check(&ctx);
            trace!("{} {}: {} finding(s)", file, rule.definition.id, findings.len());
            diagnostics.extend(findings.into_iter().map(|f| {
                Diagnostic::new(rule.definition, &file, f.line, f.message)
            }));
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{scan_unit, JavaTreeSitterAnalyzer, SourceUnit};

    #[test]
    fn test_disabled_rules_not_instantiated() {
        let mut settings = Settings::default();
        settings.testing.test_methods_prefix.clear();
        let evaluator = RuleEvaluator::from_settings(&settings);
        assert_eq!(evaluator.rule_ids(), vec!["INDENTATION"]);

        settings.style.no_tabs = true;
        settings.testing.require_full_branch_coverage = true;
        settings.testing.fail_on_test_failures = true;
        let evaluator = RuleEvaluator::from_settings(&settings);
        assert_eq!(evaluator.rule_ids(), vec!["INDENTATION", "TAB_CHARACTER"]);
    }

    #[test]
    fn test_testing_rules_skip_non_test_files() {
        let mut settings = Settings::default();
        settings.testing.annotation_required = true;
        let evaluator = RuleEvaluator::from_settings(&settings);
        let analyzer = JavaTreeSitterAnalyzer::new().unwrap();
        let symbols = SymbolTable::new();

        let plain = scan_unit(&analyzer, SourceUnit::new("src/Circle.java", "class Circle {}\n"));
        assert!(evaluator.evaluate(&plain, &symbols).is_empty());

        let test = scan_unit(&analyzer, SourceUnit::new("src/CircleTest.java", "class CircleTest {}\n"));
        let diags = evaluator.evaluate(&test, &symbols);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule_id, "TEST_ANNOTATION");
        assert_eq!(diags[0].message, "Missing @Test annotation");
        assert_eq!(diags[0].file, "src/CircleTest.java");
    }
}
