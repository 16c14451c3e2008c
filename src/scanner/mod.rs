// ============================================================================
// 源码扫描器 (Source Scanner)
// ============================================================================
//
// 把一个 Java 源文件变成两样东西：
// 1. 结构特征 (StructuralFeature) - 类 / 方法 / 字段 / JavaDoc / 注解
// 2. 行分类 (LineInfo) - 代码行 / 文档块 / 注释 / 空行
//
// 所有规则都只读取这两样东西，外加原始文本。
//
// ============================================================================

pub mod lines;
pub mod text;
pub mod tree_sitter_java;

use std::path::{Path, PathBuf};
use serde::Serialize;

pub use lines::{classify_lines, LineClass, LineInfo};
pub use tree_sitter_java::JavaTreeSitterAnalyzer;

/// One Java source file, immutable for the duration of a scan pass
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
    lines: Vec<String>,
    line_starts: Vec<usize>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.lines().map(str::to_string).collect();
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1));

        Self {
            path: path.into(),
            text,
            lines,
            line_starts,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// File name only (`Circle.java`)
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Path as shown in reports
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    pub fn is_test_file(&self, suffix: &str) -> bool {
        !suffix.is_empty() && self.file_name().ends_with(suffix)
    }

    /// 1-based line number of a byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }
}

// ============================================================================
// 结构特征
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeatureKind {
    Class,
    Interface,
    Enum,
    Method,
    Constructor,
    Field,
    Javadoc,
    Annotation,
}

impl FeatureKind {
    pub fn is_type(&self) -> bool {
        matches!(self, FeatureKind::Class | FeatureKind::Interface | FeatureKind::Enum)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, FeatureKind::Method | FeatureKind::Constructor)
    }
}

/// Inclusive 1-based line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

/// Declared method/constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

/// Block tag inside a JavaDoc comment (`@param x the value`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocTag {
    pub name: String,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub enum FeatureDetail {
    Type {
        superclass: Option<String>,
    },
    Callable {
        /// `None` for constructors
        return_type: Option<String>,
        params: Vec<Param>,
        /// Byte offset just past the closing `)` of the parameter list
        params_end: usize,
        /// Byte range of the body including braces; `None` for abstract methods
        body: Option<(usize, usize)>,
    },
    Field {
        type_name: String,
    },
    Javadoc {
        tags: Vec<DocTag>,
    },
    Annotation,
}

/// A located declaration-like construct
#[derive(Debug, Clone, Serialize)]
pub struct StructuralFeature {
    pub kind: FeatureKind,
    pub name: String,
    pub modifiers: Vec<String>,
    /// Simple names of annotations attached through the modifiers
    pub annotations: Vec<String>,
    pub span: LineSpan,
    /// Line of the name token; diagnostics are reported here
    pub line: usize,
    pub name_offset: usize,
    /// Index of the enclosing type or callable
    pub parent: Option<usize>,
    /// Index of the attached JavaDoc block
    pub doc: Option<usize>,
    pub detail: FeatureDetail,
}

impl StructuralFeature {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a == name)
    }

    pub fn is_public(&self) -> bool {
        self.has_modifier("public")
    }

    pub fn params(&self) -> &[Param] {
        match &self.detail {
            FeatureDetail::Callable { params, .. } => params,
            _ => &[],
        }
    }

    pub fn return_type(&self) -> Option<&str> {
        match &self.detail {
            FeatureDetail::Callable { return_type, .. } => return_type.as_deref(),
            _ => None,
        }
    }

    pub fn superclass(&self) -> Option<&str> {
        match &self.detail {
            FeatureDetail::Type { superclass } => superclass.as_deref(),
            _ => None,
        }
    }

    pub fn doc_tags(&self) -> &[DocTag] {
        match &self.detail {
            FeatureDetail::Javadoc { tags } => tags,
            _ => &[],
        }
    }

    /// `name(Type1,Type2)` with whitespace removed from the types
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.params().iter()
            .map(|p| text::strip_whitespace(&p.type_name))
            .collect();
        format!("{}({})", self.name, types.join(","))
    }
}

// ============================================================================
// 扫描结果
// ============================================================================

/// Scanner output for one unit
#[derive(Debug, Clone)]
pub struct ScannedUnit {
    pub unit: SourceUnit,
    pub features: Vec<StructuralFeature>,
    pub lines: Vec<LineInfo>,
}

impl ScannedUnit {
    pub fn types(&self) -> impl Iterator<Item = &StructuralFeature> {
        self.features.iter().filter(|f| f.kind.is_type())
    }

    pub fn callables(&self) -> impl Iterator<Item = &StructuralFeature> {
        self.features.iter().filter(|f| f.kind.is_callable())
    }

    pub fn methods(&self) -> impl Iterator<Item = &StructuralFeature> {
        self.features.iter().filter(|f| f.kind == FeatureKind::Method)
    }

    pub fn fields(&self) -> impl Iterator<Item = &StructuralFeature> {
        self.features.iter().filter(|f| f.kind == FeatureKind::Field)
    }

    pub fn docs(&self) -> impl Iterator<Item = &StructuralFeature> {
        self.features.iter().filter(|f| f.kind == FeatureKind::Javadoc)
    }

    pub fn doc_for(&self, feature: &StructuralFeature) -> Option<&StructuralFeature> {
        feature.doc.and_then(|idx| self.features.get(idx))
    }

    pub fn parent_of(&self, feature: &StructuralFeature) -> Option<&StructuralFeature> {
        feature.parent.and_then(|idx| self.features.get(idx))
    }

    /// Innermost type declaration enclosing `feature`
    pub fn enclosing_type(&self, feature: &StructuralFeature) -> Option<&StructuralFeature> {
        let mut current = self.parent_of(feature);
        while let Some(f) = current {
            if f.kind.is_type() {
                return Some(f);
            }
            current = self.parent_of(f);
        }
        None
    }

    /// Code lines only; doc blocks, comments and blank lines are exempt
    pub fn code_lines(&self) -> impl Iterator<Item = (&LineInfo, &str)> {
        self.lines.iter()
            .zip(self.unit.lines())
            .filter(|(info, _)| info.class == LineClass::Code)
            .map(|(info, raw)| (info, raw.as_str()))
    }

    pub fn line_class(&self, line: usize) -> Option<LineClass> {
        self.lines.get(line.checked_sub(1)?).map(|info| info.class)
    }
}

/// Scan one unit: structural features plus line classification
pub fn scan_unit(analyzer: &JavaTreeSitterAnalyzer, unit: SourceUnit) -> ScannedUnit {
    let features = analyzer.extract_features(&unit.text);
    let lines = classify_lines(unit.lines());
    ScannedUnit { unit, features, lines }
}

/// Stem of a Java file name (`src/Circle.java` -> `Circle`)
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_of_offsets() {
        let unit = SourceUnit::new("A.java", "ab\ncd\n\nef");
        assert_eq!(unit.line_of(0), 1);
        assert_eq!(unit.line_of(2), 1);
        assert_eq!(unit.line_of(3), 2);
        assert_eq!(unit.line_of(6), 3);
        assert_eq!(unit.line_of(7), 4);
        assert_eq!(unit.lines().len(), 4);
    }

    #[test]
    fn test_is_test_file() {
        assert!(SourceUnit::new("src/CircleTest.java", "").is_test_file("Test.java"));
        assert!(!SourceUnit::new("src/Circle.java", "").is_test_file("Test.java"));
        assert!(!SourceUnit::new("src/CircleTest.java", "").is_test_file(""));
    }
}
