//! 测试规则 - 只对文件名以配置后缀结尾的测试文件生效

use once_cell::sync::Lazy;
use regex::Regex;

use super::evaluator::{Finding, RuleContext, RuleHandler};
use crate::scanner::text::{call_arguments, call_offsets, split_arguments};
use crate::scanner::{FeatureKind, LineClass, StructuralFeature};

/// 小数字面量: `3.14`, `2.0`, `1d`, `5f`
static DECIMAL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+\.\d+|\b\d+[dDfF]\b").expect("decimal literal pattern")
});

pub struct TestAnnotationHandler;

impl RuleHandler for TestAnnotationHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let annotated = ctx.scanned.features.iter()
            .any(|f| f.kind == FeatureKind::Annotation && f.name == "Test");
        if annotated {
            Vec::new()
        } else {
            vec![Finding::file_level("Missing @Test annotation")]
        }
    }
}

pub struct TestMethodPrefixHandler {
    pub prefix: String,
}

impl TestMethodPrefixHandler {
    /// `@Before*` / `@After*` hooks and the JUnit 3 names
    fn is_lifecycle(method: &StructuralFeature) -> bool {
        method.name == "setUp"
            || method.name == "tearDown"
            || method.annotations.iter().any(|a| a.starts_with("Before") || a.starts_with("After"))
    }
}

impl RuleHandler for TestMethodPrefixHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        ctx.scanned.methods()
            .filter(|m| m.is_public() && m.return_type() == Some("void"))
            .filter(|m| ctx.scanned.parent_of(m).is_some_and(|p| p.kind.is_type()))
            .filter(|m| !Self::is_lifecycle(m) && !m.name.starts_with(&self.prefix))
            .map(|m| Finding::at(m.line, format!("test \"{}\" must start \"{}\"", m.name, self.prefix)))
            .collect()
    }
}

/// Two-argument `assertEquals` on decimal values needs a delta
pub struct AssertEqualsDeltaHandler;

impl RuleHandler for AssertEqualsDeltaHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let text = ctx.text();
        let unit = &ctx.scanned.unit;
        let mut findings = Vec::new();

        for offset in call_offsets(text, "assertEquals") {
            let line = unit.line_of(offset);
            if ctx.scanned.line_class(line) != Some(LineClass::Code) {
                continue;
            }

            let after_name = offset + "assertEquals".len();
            let Some(open) = text[after_name..].find('(').map(|p| after_name + p) else {
                continue;
            };
            if !text[after_name..open].trim().is_empty() {
                continue;
            }
            let Some(args) = call_arguments(text, open) else {
                continue;
            };

            let args = split_arguments(args);
            if args.len() == 2 && args.iter().any(|a| DECIMAL_LITERAL.is_match(a)) {
                findings.push(Finding::at(line, "assertEquals missing delta for double"));
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{scan_unit, JavaTreeSitterAnalyzer, SourceUnit};
    use crate::symbol_table::SymbolTable;

    fn run(handler: &dyn RuleHandler, code: &str) -> Vec<String> {
        let analyzer = JavaTreeSitterAnalyzer::new().unwrap();
        let scanned = scan_unit(&analyzer, SourceUnit::new("CircleTest.java", code));
        let symbols = SymbolTable::new();
        handler.check(&RuleContext { scanned: &scanned, symbols: &symbols, is_test_file: true })
            .into_iter()
            .map(|f| match f.line {
                Some(n) => format!("{n}: {}", f.message),
                None => f.message,
            })
            .collect()
    }

    #[test]
    fn test_assert_equals_delta_scenario() {
        let code = "class CircleTest {\n    @Test\n    public void testArea() {\n        assertEquals(3.14, result);\n        assertEquals(3.14, result, 0.001);\n        assertEquals(\"a, 1.5\", name);\n        Assert.assertEquals(max(2.5, b), c);\n        assertEquals(4, count);\n        // assertEquals(1.0, x);\n    }\n}\n";
        assert_eq!(
            run(&AssertEqualsDeltaHandler, code),
            vec![
                "4: assertEquals missing delta for double",
                "6: assertEquals missing delta for double",
                "7: assertEquals missing delta for double",
            ]
        );
    }

    #[test]
    fn test_decimal_inside_string_argument() {
        // 按文本匹配: 字符串里的小数同样算数
        let code = "class CircleTest {\n    @Test\n    public void testName() {\n        assertEquals(\"1.5\", s);\n        assertEquals(\"v1, 2\", s);\n        assertEquals(\"x, 1.5\", s, \"y\");\n    }\n}\n";
        assert_eq!(run(&AssertEqualsDeltaHandler, code), vec!["4: assertEquals missing delta for double"]);
    }

    #[test]
    fn test_annotation_required() {
        assert_eq!(run(&TestAnnotationHandler, "class CircleTest {}\n"), vec!["Missing @Test annotation"]);
        assert!(run(&TestAnnotationHandler, "class CircleTest {\n    @org.junit.Test\n    public void testA() {}\n}\n").is_empty());
    }

    #[test]
    fn test_method_prefix() {
        let code = "class CircleTest {\n    @Before\n    public void init() {}\n    public void setUp() {}\n    public void testArea() {}\n    public void checkArea() {}\n    public int helper() { return 1; }\n    private void quiet() {}\n}\n";
        let handler = TestMethodPrefixHandler { prefix: "test".into() };
        assert_eq!(run(&handler, code), vec!["6: test \"checkArea\" must start \"test\""]);
    }
}
