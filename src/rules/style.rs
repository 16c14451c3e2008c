// ============================================================================
// 风格规则
// ============================================================================
//
// 行级规则 (缩进 / 制表符 / 行长 / 右花括号) 只看代码行，
// 文档块、注释行和空行一律豁免。
// 其余规则基于结构特征。
//
// ============================================================================

use super::evaluator::{Finding, RuleContext, RuleHandler};
use crate::scanner::text::{call_offsets, word_offsets};
use crate::scanner::{FeatureDetail, FeatureKind, StructuralFeature};

// ============================================================================
// 行级规则
// ============================================================================

pub struct IndentationHandler {
    pub unit: usize,
}

impl RuleHandler for IndentationHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        if self.unit == 0 {
            return Vec::new();
        }
        ctx.scanned.code_lines()
            .filter_map(|(info, raw)| {
                let spaces = raw.bytes().take_while(|b| *b == b' ').count();
                (spaces % self.unit != 0).then(|| {
                    Finding::at(info.number, format!(
                        "indent of {spaces} spaces not multiple of {}", self.unit
                    ))
                })
            })
            .collect()
    }
}

pub struct TabHandler;

impl RuleHandler for TabHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        ctx.scanned.code_lines()
            .filter(|(_, raw)| raw.contains('\t'))
            .map(|(info, _)| Finding::at(info.number, "tab found (use spaces)"))
            .collect()
    }
}

pub struct LineLengthHandler {
    pub max: usize,
}

impl RuleHandler for LineLengthHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        if self.max == 0 {
            return Vec::new();
        }
        ctx.scanned.code_lines()
            .filter_map(|(info, raw)| {
                let len = raw.trim_end_matches('\r').chars().count();
                (len > self.max).then(|| Finding::at(info.number, format!("length {len}>{}", self.max)))
            })
            .collect()
    }
}

pub struct ClosingBraceHandler;

impl RuleHandler for ClosingBraceHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        ctx.scanned.code_lines()
            .filter_map(|(info, _)| {
                // masked 形式里字符串和注释已被抹掉
                let last = info.masked.rfind('}')?;
                let rest = info.masked[last + 1..].trim();
                (!rest.is_empty()).then(|| {
                    Finding::at(info.number, format!("code after closing brace: \"{rest}\""))
                })
            })
            .collect()
    }
}

// ============================================================================
// 结构规则
// ============================================================================

pub struct OnePublicTypeHandler;

impl RuleHandler for OnePublicTypeHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let count = ctx.scanned.types()
            .filter(|t| t.parent.is_none() && t.is_public())
            .filter(|t| matches!(t.kind, FeatureKind::Class | FeatureKind::Interface))
            .count();

        if count > 1 {
            vec![Finding::file_level(format!("{count} public types in one file"))]
        } else {
            Vec::new()
        }
    }
}

/// Static fields referenced at most once beyond their declaration
pub struct GlobalStateHandler;

impl RuleHandler for GlobalStateHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        ctx.scanned.fields()
            .filter(|f| f.has_modifier("static"))
            .filter_map(|field| {
                let occurrences = word_offsets(ctx.text(), &field.name).len();
                let uses = occurrences.saturating_sub(1);
                (uses <= 1).then(|| Finding::at(field.line, format!(
                    "static field \"{}\" only used {uses} time(s)", field.name
                )))
            })
            .collect()
    }
}

/// `)` followed by whitespace only, then `{ }`
pub struct EmptyMethodHandler;

impl EmptyMethodHandler {
    fn is_empty(feature: &StructuralFeature, text: &str) -> bool {
        let FeatureDetail::Callable { params_end, body: Some((start, end)), .. } = &feature.detail else {
            return false;
        };
        let between = text.get(*params_end..*start).unwrap_or("x");
        let inner = text.get(start + 1..end.saturating_sub(1)).unwrap_or("x");
        between.trim().is_empty() && inner.trim().is_empty()
    }
}

impl RuleHandler for EmptyMethodHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        ctx.scanned.callables()
            .filter(|f| Self::is_empty(f, ctx.text()))
            .map(|f| Finding::at(f.line, "empty method body"))
            .collect()
    }
}

pub struct UnusedPrivateMethodHandler;

impl RuleHandler for UnusedPrivateMethodHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let mut findings = Vec::new();

        for method in ctx.scanned.methods().filter(|m| m.has_modifier("private")) {
            // 同名重载的声明位置都不算调用
            let declarations: Vec<usize> = ctx.scanned.methods()
                .filter(|m| m.name == method.name)
                .map(|m| m.name_offset)
                .collect();

            let used = call_offsets(ctx.text(), &method.name)
                .into_iter()
                .any(|offset| !declarations.contains(&offset));

            if !used {
                findings.push(Finding::at(method.line, format!("unused private method \"{}\"", method.name)));
            }
        }

        findings
    }
}

/// Methods matching an inherited project method must carry `@Override`
pub struct OverrideHandler;

impl RuleHandler for OverrideHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (idx, class) in ctx.scanned.features.iter().enumerate() {
            if class.kind != FeatureKind::Class {
                continue;
            }
            let Some(superclass) = class.superclass() else {
                continue;
            };
            let superclass = crate::symbol_table::simple_type_name(superclass);

            let candidates = ctx.scanned.methods()
                .filter(|m| m.parent == Some(idx))
                .filter(|m| !m.has_modifier("static") && !m.has_annotation("Override"));

            for method in candidates {
                if let Some(ancestor) = ctx.symbols.find_in_chain(&superclass, &method.signature()) {
                    tracing::debug!("{}.{} overrides {}", class.name, method.signature(), ancestor.name);
                    findings.push(Finding::at(method.line, format!("missing @Override on {}()", method.name)));
                }
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{scan_unit, JavaTreeSitterAnalyzer, ScannedUnit, SourceUnit};
    use crate::symbol_table::SymbolTable;
    use proptest::prelude::*;

    fn scan(path: &str, code: &str) -> ScannedUnit {
        let analyzer = JavaTreeSitterAnalyzer::new().unwrap();
        scan_unit(&analyzer, SourceUnit::new(path, code))
    }

    fn run(handler: &dyn RuleHandler, code: &str) -> Vec<Finding> {
        let scanned = scan("Sample.java", code);
        let symbols = SymbolTable::build([&scanned]);
        handler.check(&RuleContext { scanned: &scanned, symbols: &symbols, is_test_file: false })
    }

    fn messages(findings: &[Finding]) -> Vec<String> {
        findings.iter()
            .map(|f| match f.line {
                Some(n) => format!("{n}: {}", f.message),
                None => f.message.clone(),
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_indent_multiple_of_unit(unit in 1usize..=8, k in 0usize..6) {
            let handler = IndentationHandler { unit };
            let exact = format!("{}x = 1;\n", " ".repeat(k * unit));
            prop_assert!(run(&handler, &exact).is_empty());

            if unit > 1 {
                let off = format!("{}x = 1;\n", " ".repeat(k * unit + 1));
                prop_assert_eq!(run(&handler, &off).len(), 1);
            }
        }
    }

    #[test]
    fn test_line_rules_skip_documentation() {
        let code = "/**\n   *  odd\n\t tab\n */\nclass A {\n   int x;\n\tint y;\n    // \tcomment\n}\n";
        assert_eq!(
            messages(&run(&IndentationHandler { unit: 4 }, code)),
            vec!["6: indent of 3 spaces not multiple of 4"]
        );
        assert_eq!(messages(&run(&TabHandler, code)), vec!["7: tab found (use spaces)"]);
    }

    #[test]
    fn test_line_length() {
        let code = "class A {\n    String s = \"abcdefghij\";\n}\n";
        assert_eq!(messages(&run(&LineLengthHandler { max: 20 }, code)), vec!["2: length 28>20"]);
        assert!(run(&LineLengthHandler { max: 28 }, code).is_empty());
    }

    #[test]
    fn test_line_length_skips_doc_and_comment_lines() {
        let code = "/**\n * A very long documentation sentence that runs on.\n */\nclass A {\n    // another comment that is far too long to fit\n    int x;\n}\n";
        assert!(run(&LineLengthHandler { max: 20 }, code).is_empty());

        let long = "class A {\n    int abcdefghijklmnopqrst;\n}\n";
        assert_eq!(messages(&run(&LineLengthHandler { max: 20 }, long)), vec!["2: length 29>20"]);
    }

    #[test]
    fn test_closing_brace_alone() {
        let code = "class A {\n    void f() {\n        if (x) {\n        } else {\n        }\n        s = \"}x\"; } // done\n    }\n}\n";
        assert_eq!(
            messages(&run(&ClosingBraceHandler, code)),
            vec!["4: code after closing brace: \"else {\""]
        );
    }

    #[test]
    fn test_one_public_type_counts_top_level_only() {
        let code = "public class A {\n    public class Inner {}\n}\npublic interface B {}\n";
        assert_eq!(messages(&run(&OnePublicTypeHandler, code)), vec!["2 public types in one file"]);
        assert!(run(&OnePublicTypeHandler, "public class A { public class Inner {} }").is_empty());
    }

    #[test]
    fn test_global_state_scenario() {
        let code = "class Counter {\n    private static int total;\n    private static int seen = 0;\n    void add() {\n        total++;\n        seen++;\n        seen--;\n    }\n}\n";
        assert_eq!(
            messages(&run(&GlobalStateHandler, code)),
            vec!["2: static field \"total\" only used 1 time(s)"]
        );
    }

    #[test]
    fn test_empty_method_body() {
        let code = "abstract class A {\n    A() { }\n    void f() {}\n    void g() throws Exception {}\n    void h() { run(); }\n    abstract void i();\n    void j() { /* later */ }\n}\n";
        assert_eq!(
            messages(&run(&EmptyMethodHandler, code)),
            vec!["2: empty method body", "3: empty method body"]
        );
    }

    #[test]
    fn test_unused_private_method() {
        let code = "class A {\n    private int helper(int x) { return x; }\n    private void unused() {}\n    private void ref() {}\n    private void overload() {}\n    private void overload(int x) {}\n    void run() {\n        helper(1);\n        Runnable r = this::ref;\n    }\n}\n";
        let found = messages(&run(&UnusedPrivateMethodHandler, code));
        assert_eq!(
            found,
            vec![
                "3: unused private method \"unused\"",
                "5: unused private method \"overload\"",
                "6: unused private method \"overload\"",
            ]
        );
    }

    #[test]
    fn test_missing_override_across_files() {
        let shape = scan("Shape.java", "public class Shape {\n    public void m() {}\n    public static void s() {}\n}\n");
        let circle_src = "public class Circle extends Shape {\n    public void m() {}\n    public static void s() {}\n    public void other() {}\n}\n";
        let circle = scan("Circle.java", circle_src);
        let symbols = SymbolTable::build([&shape, &circle]);

        let ctx = RuleContext { scanned: &circle, symbols: &symbols, is_test_file: false };
        assert_eq!(messages(&OverrideHandler.check(&ctx)), vec!["2: missing @Override on m()"]);

        let fixed = scan("Circle.java", &circle_src.replace("    public void m()", "    @Override\n    public void m()"));
        let symbols = SymbolTable::build([&shape, &fixed]);
        let ctx = RuleContext { scanned: &fixed, symbols: &symbols, is_test_file: false };
        assert!(OverrideHandler.check(&ctx).is_empty());
    }

    #[test]
    fn test_override_ignores_external_parent() {
        let code = "public class Window extends JFrame {\n    public void paint() {}\n}\n";
        assert!(run(&OverrideHandler, code).is_empty());
    }
}
