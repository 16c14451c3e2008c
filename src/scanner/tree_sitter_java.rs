use super::{DocTag, FeatureDetail, FeatureKind, LineSpan, Param, StructuralFeature};
use std::cell::RefCell;
use std::collections::HashMap;
use anyhow::{Result, anyhow};
use tree_sitter::{Node, Parser, Query, QueryCursor, Tree};
use tracing::{debug, warn};

// ============================================================================
// thread_local Parser 复用
// ============================================================================
//
// Parser::new() 和 set_language() 涉及 native 层初始化和内存分配。
// 扫描是单线程顺序执行的，每个文件都会解析一次（结构提取）或两次
// （再加上字面量条件检测），所以 Parser 只初始化一次。
//
// ============================================================================

thread_local! {
    /// 线程本地 Parser 实例 (避免重复创建)
    static JAVA_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

/// 获取或初始化线程本地 Parser
fn with_parser<F, R>(language: &tree_sitter::Language, f: F) -> Result<R>
where
    F: FnOnce(&mut Parser) -> Result<R>,
{
    JAVA_PARSER.with(|cell| {
        let mut parser_opt = cell.borrow_mut();

        // 懒初始化 Parser
        if parser_opt.is_none() {
            let mut parser = Parser::new();
            parser.set_language(language)
                .map_err(|e| anyhow!("Failed to set language: {e}"))?;
            *parser_opt = Some(parser);
        }

        match parser_opt.as_mut() {
            Some(parser) => f(parser),
            None => Err(anyhow!("Java parser unavailable")),
        }
    })
}

/// Conditional statements whose condition is inspected for literal comparisons
const CONDITION_QUERY: &str = r#"
    [
        (if_statement condition: (_) @condition)
        (while_statement condition: (_) @condition)
        (do_statement condition: (_) @condition)
        (for_statement condition: (_) @condition)
    ]
"#;

const COMPARISON_OPERATORS: [&str; 6] = ["==", "!=", "<", "<=", ">", ">="];

/// One side of a comparison, as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    /// Grammar node kind (`decimal_integer_literal`, `identifier`, ...)
    pub kind: String,
    pub text: String,
}

/// A binary comparison used as the condition of a conditional statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonSite {
    pub line: usize,
    pub expression: String,
    pub operator: String,
    pub left: Operand,
    pub right: Operand,
}

pub struct JavaTreeSitterAnalyzer {
    language: tree_sitter::Language,
    /// 预编译的查询 (在 new() 时编译一次)
    condition_query: Query,
}

impl JavaTreeSitterAnalyzer {
    pub fn new() -> Result<Self> {
        let language = tree_sitter_java::language();
        let condition_query = Query::new(&language, CONDITION_QUERY)
            .map_err(|e| anyhow!("Failed to compile condition query: {e}"))?;

        Ok(Self {
            language,
            condition_query,
        })
    }

    pub fn parse(&self, code: &str) -> Result<Tree> {
        with_parser(&self.language, |parser| {
            parser.parse(code, None).ok_or_else(|| anyhow!("Failed to parse code"))
        })
    }

    /// Structural features in source order
    ///
    /// The grammar is error tolerant, so malformed input still yields the
    /// features that could be recognised. Only a parser failure produces an
    /// empty list.
    pub fn extract_features(&self, code: &str) -> Vec<StructuralFeature> {
        match self.parse(code) {
            Ok(tree) => {
                let mut collector = FeatureCollector::new(code);
                collector.visit(tree.root_node(), None);
                collector.features
            }
            Err(e) => {
                warn!("structure extraction skipped: {e}");
                Vec::new()
            }
        }
    }

    /// Comparisons used as `if` / `while` / `do` / `for` conditions
    ///
    /// A tree containing syntax errors is reported as `Err` so callers can
    /// skip the file instead of trusting a partial tree.
    pub fn comparison_sites(&self, code: &str) -> Result<Vec<ComparisonSite>> {
        let tree = self.parse(code)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(anyhow!("source contains syntax errors"));
        }

        let condition_idx = self.condition_query
            .capture_index_for_name("condition")
            .ok_or_else(|| anyhow!("condition capture missing"))?;

        let mut sites = Vec::new();
        let mut cursor = QueryCursor::new();
        for m in cursor.matches(&self.condition_query, root, code.as_bytes()) {
            for capture in m.captures {
                if capture.index == condition_idx {
                    if let Some(site) = comparison_site(capture.node, code) {
                        sites.push(site);
                    }
                }
            }
        }

        sites.sort_by_key(|s| s.line);
        debug!("found {} literal-candidate comparisons", sites.len());
        Ok(sites)
    }
}

fn node_text<'a>(node: Node, code: &'a str) -> &'a str {
    node.utf8_text(code.as_bytes()).unwrap_or("")
}

fn unwrap_parens(mut node: Node) -> Option<Node> {
    while node.kind() == "parenthesized_expression" {
        node = node.named_child(0)?;
    }
    Some(node)
}

fn comparison_site(condition: Node, code: &str) -> Option<ComparisonSite> {
    let expr = unwrap_parens(condition)?;
    if expr.kind() != "binary_expression" {
        return None;
    }

    let operator = expr.child_by_field_name("operator")?.kind();
    if !COMPARISON_OPERATORS.contains(&operator) {
        return None;
    }

    let operand = |field: &str| -> Option<Operand> {
        let node = unwrap_parens(expr.child_by_field_name(field)?)?;
        Some(Operand {
            kind: node.kind().to_string(),
            text: node_text(node, code).to_string(),
        })
    };

    Some(ComparisonSite {
        line: expr.start_position().row + 1,
        expression: node_text(expr, code).to_string(),
        operator: operator.to_string(),
        left: operand("left")?,
        right: operand("right")?,
    })
}

// ============================================================================
// 结构提取
// ============================================================================

struct FeatureCollector<'a> {
    code: &'a str,
    features: Vec<StructuralFeature>,
    /// JavaDoc 注释起始字节 -> feature 下标，用于挂接
    docs_by_start: HashMap<usize, usize>,
}

impl<'a> FeatureCollector<'a> {
    fn new(code: &'a str) -> Self {
        Self {
            code,
            features: Vec::new(),
            docs_by_start: HashMap::new(),
        }
    }

    fn visit(&mut self, node: Node, parent: Option<usize>) {
        let mut scope = parent;

        match node.kind() {
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => {
                scope = self.push_type(node, parent);
            }
            "method_declaration" | "constructor_declaration" => {
                scope = self.push_callable(node, parent);
            }
            "field_declaration" | "constant_declaration" => {
                scope = self.push_fields(node, parent).or(parent);
            }
            "block_comment" => self.push_doc(node, parent),
            "marker_annotation" | "annotation" => {
                if node.parent().map(|p| p.kind()) == Some("modifiers") {
                    self.push_annotation(node, parent);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child, scope);
        }
    }

    fn push(&mut self, feature: StructuralFeature) -> usize {
        self.features.push(feature);
        self.features.len() - 1
    }

    fn span(node: Node) -> LineSpan {
        LineSpan {
            start: node.start_position().row + 1,
            end: node.end_position().row + 1,
        }
    }

    /// JavaDoc block that is the declaration's immediate previous sibling
    ///
    /// Annotations live inside the declaration's `modifiers`, so they never
    /// separate a block from its declaration. Any other sibling does.
    fn attached_doc(&self, node: Node) -> Option<usize> {
        let prev = node.prev_sibling()?;
        if prev.kind() != "block_comment" {
            return None;
        }
        self.docs_by_start.get(&prev.start_byte()).copied()
    }

    fn modifiers(&self, node: Node) -> (Vec<String>, Vec<String>) {
        let mut modifiers = Vec::new();
        let mut annotations = Vec::new();

        let mut cursor = node.walk();
        let mods = node.children(&mut cursor).find(|c| c.kind() == "modifiers");
        if let Some(mods) = mods {
            let mut mods_cursor = mods.walk();
            for child in mods.children(&mut mods_cursor) {
                match child.kind() {
                    "marker_annotation" | "annotation" => {
                        annotations.push(self.annotation_name(child));
                    }
                    kind if !child.is_named() => modifiers.push(kind.to_string()),
                    _ => {}
                }
            }
        }

        (modifiers, annotations)
    }

    /// `@org.junit.Test` -> `Test`
    fn annotation_name(&self, node: Node) -> String {
        let name = node.child_by_field_name("name")
            .map(|n| node_text(n, self.code))
            .unwrap_or("");
        name.rsplit('.').next().unwrap_or(name).to_string()
    }

    fn push_type(&mut self, node: Node, parent: Option<usize>) -> Option<usize> {
        let kind = match node.kind() {
            "interface_declaration" | "annotation_type_declaration" => FeatureKind::Interface,
            "enum_declaration" => FeatureKind::Enum,
            _ => FeatureKind::Class,
        };
        let name_node = node.child_by_field_name("name")?;
        let (modifiers, annotations) = self.modifiers(node);
        let superclass = node.child_by_field_name("superclass")
            .and_then(|s| s.named_child(0))
            .map(|t| node_text(t, self.code).to_string());

        let doc = self.attached_doc(node);
        Some(self.push(StructuralFeature {
            kind,
            name: node_text(name_node, self.code).to_string(),
            modifiers,
            annotations,
            span: Self::span(node),
            line: name_node.start_position().row + 1,
            name_offset: name_node.start_byte(),
            parent,
            doc,
            detail: FeatureDetail::Type { superclass },
        }))
    }

    fn push_callable(&mut self, node: Node, parent: Option<usize>) -> Option<usize> {
        let kind = if node.kind() == "constructor_declaration" {
            FeatureKind::Constructor
        } else {
            FeatureKind::Method
        };
        let name_node = node.child_by_field_name("name")?;
        let params_node = node.child_by_field_name("parameters")?;
        let (modifiers, annotations) = self.modifiers(node);

        let return_type = match kind {
            FeatureKind::Method => node.child_by_field_name("type")
                .map(|t| node_text(t, self.code).to_string()),
            _ => None,
        };
        let body = node.child_by_field_name("body")
            .map(|b| (b.start_byte(), b.end_byte()));

        let doc = self.attached_doc(node);
        Some(self.push(StructuralFeature {
            kind,
            name: node_text(name_node, self.code).to_string(),
            modifiers,
            annotations,
            span: Self::span(node),
            line: name_node.start_position().row + 1,
            name_offset: name_node.start_byte(),
            parent,
            doc,
            detail: FeatureDetail::Callable {
                return_type,
                params: self.params(params_node),
                params_end: params_node.end_byte(),
                body,
            },
        }))
    }

    fn params(&self, params_node: Node) -> Vec<Param> {
        let mut params = Vec::new();
        let mut cursor = params_node.walk();

        for child in params_node.named_children(&mut cursor) {
            match child.kind() {
                "formal_parameter" => {
                    let name = child.child_by_field_name("name").map(|n| node_text(n, self.code));
                    let type_name = child.child_by_field_name("type").map(|t| node_text(t, self.code));
                    if let (Some(name), Some(type_name)) = (name, type_name) {
                        let dims = child.child_by_field_name("dimensions")
                            .map(|d| node_text(d, self.code))
                            .unwrap_or("");
                        params.push(Param {
                            name: name.to_string(),
                            type_name: format!("{type_name}{dims}"),
                        });
                    }
                }
                "spread_parameter" => {
                    // T... xs: 类型节点 + variable_declarator
                    let mut inner = child.walk();
                    let parts: Vec<Node> = child.named_children(&mut inner).collect();
                    let type_name = parts.iter()
                        .find(|n| n.kind() != "modifiers" && n.kind() != "variable_declarator")
                        .map(|n| node_text(*n, self.code));
                    let name = parts.iter()
                        .find(|n| n.kind() == "variable_declarator")
                        .and_then(|d| d.child_by_field_name("name"))
                        .map(|n| node_text(n, self.code));
                    if let (Some(name), Some(type_name)) = (name, type_name) {
                        params.push(Param {
                            name: name.to_string(),
                            type_name: format!("{type_name}..."),
                        });
                    }
                }
                _ => {}
            }
        }

        params
    }

    fn push_fields(&mut self, node: Node, parent: Option<usize>) -> Option<usize> {
        let type_name = node.child_by_field_name("type")
            .map(|t| node_text(t, self.code).to_string())
            .unwrap_or_default();
        let (modifiers, annotations) = self.modifiers(node);
        let doc = self.attached_doc(node);

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();

        let mut first = None;
        for declarator in declarators {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let idx = self.push(StructuralFeature {
                kind: FeatureKind::Field,
                name: node_text(name_node, self.code).to_string(),
                modifiers: modifiers.clone(),
                annotations: annotations.clone(),
                span: Self::span(node),
                line: name_node.start_position().row + 1,
                name_offset: name_node.start_byte(),
                parent,
                doc,
                detail: FeatureDetail::Field { type_name: type_name.clone() },
            });
            first.get_or_insert(idx);
        }

        first
    }

    fn push_doc(&mut self, node: Node, parent: Option<usize>) {
        let text = node_text(node, self.code);
        if !text.starts_with("/**") || text == "/**/" {
            return;
        }

        let idx = self.push(StructuralFeature {
            kind: FeatureKind::Javadoc,
            name: String::new(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            span: Self::span(node),
            line: node.start_position().row + 1,
            name_offset: node.start_byte(),
            parent,
            doc: None,
            detail: FeatureDetail::Javadoc { tags: parse_doc_tags(text) },
        });
        self.docs_by_start.insert(node.start_byte(), idx);
    }

    fn push_annotation(&mut self, node: Node, parent: Option<usize>) {
        let name = self.annotation_name(node);
        self.push(StructuralFeature {
            kind: FeatureKind::Annotation,
            name,
            modifiers: Vec::new(),
            annotations: Vec::new(),
            span: Self::span(node),
            line: node.start_position().row + 1,
            name_offset: node.start_byte(),
            parent,
            doc: None,
            detail: FeatureDetail::Annotation,
        });
    }
}

/// Block tags of a JavaDoc comment, in order
pub fn parse_doc_tags(text: &str) -> Vec<DocTag> {
    let body = text.trim_start_matches("/**").trim_end_matches("*/");
    let mut tags = Vec::new();

    for raw in body.lines() {
        let line = raw.trim().trim_start_matches('*').trim();
        let Some(rest) = line.strip_prefix('@') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(name) = parts.next() else {
            continue;
        };
        tags.push(DocTag {
            name: name.to_string(),
            argument: parts.next().map(str::to_string),
        });
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(code: &str) -> Vec<StructuralFeature> {
        JavaTreeSitterAnalyzer::new().unwrap().extract_features(code)
    }

    #[test]
    fn test_extracts_declarations_in_order() {
        let code = r#"
package shapes;

/**
 * A circle.
 * @author jdoe
 * @version 1.0
 */
public class Circle extends Shape {
    private static int count = 0;
    private double radius, scale;

    public Circle(double radius) {
        this.radius = radius;
    }

    /**
     * Area.
     * @return the area
     */
    @Override
    public double area() {
        return Math.PI * radius * radius;
    }

    private void grow(int by, String... names) { }
}
"#;
        let fs = features(code);
        let kinds: Vec<FeatureKind> = fs.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FeatureKind::Javadoc,
                FeatureKind::Class,
                FeatureKind::Field,
                FeatureKind::Field,
                FeatureKind::Field,
                FeatureKind::Constructor,
                FeatureKind::Javadoc,
                FeatureKind::Method,
                FeatureKind::Annotation,
                FeatureKind::Method,
            ]
        );

        let class = &fs[1];
        assert_eq!(class.name, "Circle");
        assert_eq!(class.superclass(), Some("Shape"));
        assert_eq!(class.doc, Some(0));
        assert_eq!(class.line, 9);
        assert!(class.is_public());

        assert_eq!(fs[2].name, "count");
        assert!(fs[2].has_modifier("static"));
        assert_eq!(fs[3].name, "radius");
        assert_eq!(fs[4].name, "scale");
        assert_eq!(fs[4].parent, Some(1));

        let area = &fs[7];
        assert_eq!(area.name, "area");
        assert_eq!(area.return_type(), Some("double"));
        assert!(area.has_annotation("Override"));
        assert_eq!(area.doc, Some(6));
        assert_eq!(area.line, 22);

        let grow = &fs[9];
        assert_eq!(grow.signature(), "grow(int,String...)");
        assert!(grow.doc.is_none());
        assert_eq!(fs[0].doc_tags().len(), 2);
    }

    #[test]
    fn test_line_comment_breaks_doc_attachment() {
        let code = r#"
class A {
    /** Documented. */
    // stray note
    public void run() {}
}
"#;
        let fs = features(code);
        let run = fs.iter().find(|f| f.name == "run").unwrap();
        assert!(run.doc.is_none());
    }

    #[test]
    fn test_nested_type_parent() {
        let code = "public class Outer { public static class Inner { void m() {} } }";
        let fs = features(code);
        let inner = fs.iter().position(|f| f.name == "Inner").unwrap();
        let m = fs.iter().find(|f| f.name == "m").unwrap();
        assert_eq!(m.parent, Some(inner));
        assert_eq!(fs[inner].parent, Some(0));
    }

    #[test]
    fn test_parse_doc_tags() {
        let tags = parse_doc_tags("/**\n * Sum.\n * @param a first\n * @param b\n * @return total */");
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["param", "param", "return"]);
        assert_eq!(tags[1].argument.as_deref(), Some("b"));
        assert_eq!(tags[2].argument.as_deref(), Some("total"));
    }

    #[test]
    fn test_comparison_sites() {
        let code = r#"
class A {
    void m(int x) {
        if (1 > 2) { }
        while ((x == 3)) { }
        if (x != null && x > 0) { }
        for (int i = 0; 'a' < 'b'; i++) { }
    }
}
"#;
        let analyzer = JavaTreeSitterAnalyzer::new().unwrap();
        let sites = analyzer.comparison_sites(code).unwrap();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[0].expression, "1 > 2");
        assert_eq!(sites[0].left.kind, "decimal_integer_literal");
        assert_eq!(sites[1].operator, "==");
        assert_eq!(sites[1].left.kind, "identifier");
        assert_eq!(sites[2].line, 7);
    }

    #[test]
    fn test_comparison_sites_rejects_broken_source() {
        let analyzer = JavaTreeSitterAnalyzer::new().unwrap();
        assert!(analyzer.comparison_sites("class A { void m( { if (1 > 2) }").is_err());
    }
}
