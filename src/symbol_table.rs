// ============================================================================
// 符号表模块 - 项目级继承索引
// ============================================================================
//
// 类名 -> 父类 + 可继承方法签名
//
// 在规则执行之前，用全部扫描结果一次性构建，之后只读。
// 只追踪单继承 (extends)，接口实现不参与 @Override 判断。
//
// ============================================================================

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use serde::Serialize;
use tracing::debug;

use crate::scanner::{FeatureKind, ScannedUnit, StructuralFeature};

/// 方法信息
#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub name: String,
    /// `name(Type1,Type2)`
    pub signature: String,
    pub line: usize,
    pub is_private: bool,
    pub is_static: bool,
}

impl MethodInfo {
    fn from_feature(feature: &StructuralFeature) -> Self {
        Self {
            name: feature.name.clone(),
            signature: feature.signature(),
            line: feature.line,
            is_private: feature.has_modifier("private"),
            is_static: feature.has_modifier("static"),
        }
    }

    /// Visible to a subclass as an overridable instance method
    pub fn is_inheritable(&self) -> bool {
        !self.is_private && !self.is_static
    }
}

/// 类型信息
#[derive(Debug, Clone, Serialize)]
pub struct TypeInfo {
    pub name: String,
    /// Simple name of the `extends` target, generics stripped
    pub superclass: Option<String>,
    pub file: PathBuf,
    pub line: usize,
    /// signature -> method
    pub methods: BTreeMap<String, MethodInfo>,
}

#[derive(Debug, Default, Serialize)]
pub struct SymbolTable {
    /// 简单类名 -> 类型信息
    classes: HashMap<String, TypeInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from every scanned unit of the project
    pub fn build<'a>(units: impl IntoIterator<Item = &'a ScannedUnit>) -> Self {
        let mut table = Self::new();
        for unit in units {
            table.register_unit(unit);
        }
        debug!("symbol table: {} types", table.len());
        table
    }

    /// Register every type declared in a unit (nested types included)
    pub fn register_unit(&mut self, scanned: &ScannedUnit) {
        for (idx, feature) in scanned.features.iter().enumerate() {
            if !feature.kind.is_type() {
                continue;
            }

            let methods = scanned.features.iter()
                .filter(|m| m.kind == FeatureKind::Method && m.parent == Some(idx))
                .map(MethodInfo::from_feature)
                .map(|m| (m.signature.clone(), m))
                .collect();

            let info = TypeInfo {
                name: feature.name.clone(),
                superclass: feature.superclass().map(simple_type_name),
                file: scanned.unit.path.clone(),
                line: feature.line,
                methods,
            };

            // 同名类型：先注册者优先
            if self.classes.contains_key(&info.name) {
                debug!("duplicate type {} in {} ignored", info.name, info.file.display());
                continue;
            }
            self.classes.insert(info.name.clone(), info);
        }
    }

    pub fn get(&self, class: &str) -> Option<&TypeInfo> {
        self.classes.get(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Ancestors of a class that are present in the table, nearest first
    ///
    /// The walk stops at the first ancestor outside the project or when a
    /// cycle is detected.
    pub fn ancestors(&self, class: &str) -> Vec<&TypeInfo> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(class.to_string());

        let mut next = self.get(class).and_then(|t| t.superclass.clone());
        while let Some(name) = next {
            if !seen.insert(name.clone()) {
                break;
            }
            let Some(info) = self.get(&name) else {
                break;
            };
            chain.push(info);
            next = info.superclass.clone();
        }

        chain
    }

    /// Nearest ancestor declaring an inheritable method with this signature
    pub fn inherited_from(&self, class: &str, signature: &str) -> Option<&TypeInfo> {
        self.ancestors(class).into_iter().find(|ancestor| declares(ancestor, signature))
    }

    /// Like [`inherited_from`](Self::inherited_from), starting at the
    /// `extends` target itself
    pub fn find_in_chain(&self, superclass: &str, signature: &str) -> Option<&TypeInfo> {
        let first = self.get(superclass)?;
        if declares(first, signature) {
            return Some(first);
        }
        self.ancestors(superclass).into_iter().find(|ancestor| declares(ancestor, signature))
    }
}

fn declares(info: &TypeInfo, signature: &str) -> bool {
    info.methods.get(signature).is_some_and(MethodInfo::is_inheritable)
}

/// `java.util.List<String>` -> `List`
pub fn simple_type_name(type_text: &str) -> String {
    let base = type_text.split('<').next().unwrap_or(type_text).trim();
    base.rsplit('.').next().unwrap_or(base).to_string()
}
