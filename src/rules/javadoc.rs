//! JavaDoc 规则
//!
//! 文档块与声明的挂接在扫描阶段完成 (见 `tree_sitter_java`)，这里只读取
//! `StructuralFeature::doc`。

use std::collections::BTreeSet;

use super::evaluator::{Finding, RuleContext, RuleHandler};
use crate::scanner::{FeatureKind, ScannedUnit, StructuralFeature};

/// Declared directly in a type body (not in a method or anonymous class)
fn is_member(scanned: &ScannedUnit, feature: &StructuralFeature) -> bool {
    scanned.parent_of(feature).is_some_and(|p| p.kind.is_type())
}

fn kind_word(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::Interface => "interface",
        FeatureKind::Enum => "enum",
        _ => "class",
    }
}

/// Public types and public/protected methods need an attached block
pub struct MissingJavadocHandler;

impl RuleHandler for MissingJavadocHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let scanned = ctx.scanned;
        let mut findings = Vec::new();

        for feature in &scanned.features {
            if feature.doc.is_some() {
                continue;
            }
            match feature.kind {
                kind if kind.is_type() && feature.is_public() => {
                    findings.push(Finding::at(feature.line, format!(
                        "missing JavaDoc for {} {}", kind_word(kind), feature.name
                    )));
                }
                FeatureKind::Method
                    if (feature.is_public() || feature.has_modifier("protected"))
                        && is_member(scanned, feature) =>
                {
                    findings.push(Finding::at(feature.line, format!(
                        "missing JavaDoc for method {}()", feature.name
                    )));
                }
                _ => {}
            }
        }

        findings
    }
}

/// The first block of the file must carry `@<tag>`
pub struct FirstBlockTagHandler {
    pub tag: &'static str,
    /// Emit "No JavaDoc blocks" when the file has none
    pub report_missing_blocks: bool,
}

impl RuleHandler for FirstBlockTagHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        match ctx.scanned.docs().next() {
            None if self.report_missing_blocks => vec![Finding::file_level("No JavaDoc blocks")],
            None => Vec::new(),
            Some(block) => {
                if block.doc_tags().iter().any(|t| t.name == self.tag) {
                    Vec::new()
                } else {
                    vec![Finding::at(block.line, format!("JavaDoc missing @{}", self.tag))]
                }
            }
        }
    }
}

/// `@param` names must match the declared parameters exactly
pub struct ParamTagHandler;

impl RuleHandler for ParamTagHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let mut findings = Vec::new();

        for callable in ctx.scanned.callables() {
            let Some(doc) = ctx.scanned.doc_for(callable) else {
                continue;
            };

            // `@param <T>` 描述类型参数，忽略
            let tagged: Vec<&str> = doc.doc_tags().iter()
                .filter(|t| t.name == "param")
                .map(|t| t.argument.as_deref().unwrap_or(""))
                .filter(|arg| !arg.starts_with('<'))
                .collect();
            let declared: BTreeSet<&str> = callable.params().iter().map(|p| p.name.as_str()).collect();

            for param in callable.params() {
                if !tagged.contains(&param.name.as_str()) {
                    findings.push(Finding::at(callable.line, format!(
                        "JavaDoc for {}() missing @param {}", callable.name, param.name
                    )));
                }
            }
            for tag in tagged.iter().filter(|t| !declared.contains(*t)) {
                let message = if tag.is_empty() {
                    format!("JavaDoc for {}() has @param without a name", callable.name)
                } else {
                    format!("JavaDoc for {}() documents unknown parameter {tag}", callable.name)
                };
                findings.push(Finding::at(callable.line, message));
            }
        }

        findings
    }
}

/// Non-void methods need `@return`; void methods must not have one
pub struct ReturnTagHandler;

impl RuleHandler for ReturnTagHandler {
    fn check(&self, ctx: &RuleContext) -> Vec<Finding> {
        let mut findings = Vec::new();

        for method in ctx.scanned.methods() {
            let Some(doc) = ctx.scanned.doc_for(method) else {
                continue;
            };
            let has_return = doc.doc_tags().iter().any(|t| t.name == "return");
            let is_void = method.return_type() == Some("void");

            if is_void && has_return {
                findings.push(Finding::at(method.line, format!(
                    "JavaDoc for {}() has @return but the method is void", method.name
                )));
            } else if !is_void && !has_return {
                findings.push(Finding::at(method.line, format!(
                    "JavaDoc for {}() missing @return", method.name
                )));
            }
        }

        findings
    }
}
