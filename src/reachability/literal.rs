//! 字面量条件检测器
//!
//! Only comparisons whose two operands are both literals are evaluated.
//! Anything involving a name, a call or arithmetic is left alone; this is
//! not a constant folder.

use tracing::debug;

use super::{Detector, UnreachableLocation};
use crate::scanner::tree_sitter_java::{ComparisonSite, Operand};
use crate::scanner::{JavaTreeSitterAnalyzer, SourceUnit};

/// A literal operand value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i128),
    Float(f64),
    /// UTF-16 code unit, compared numerically like Java does
    Char(u32),
    Bool(bool),
    Str(String),
    Null,
}

impl Literal {
    pub fn from_operand(operand: &Operand) -> Option<Self> {
        let text = operand.text.trim();
        match operand.kind.as_str() {
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => parse_int(text).map(Literal::Int),
            "decimal_floating_point_literal" => parse_float(text).map(Literal::Float),
            "character_literal" => parse_char(text).map(Literal::Char),
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            "string_literal" => text.strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .map(|t| Literal::Str(t.to_string())),
            "null_literal" => Some(Literal::Null),
            // -1, -2.5
            "unary_expression" => {
                let inner = text.strip_prefix('-')?.trim();
                match parse_int(inner) {
                    Some(n) => Some(Literal::Int(-n)),
                    None => parse_float(inner).map(|f| Literal::Float(-f)),
                }
            }
            _ => None,
        }
    }

    fn as_integral(&self) -> Option<i128> {
        match self {
            Literal::Int(n) => Some(*n),
            Literal::Char(c) => Some(i128::from(*c)),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Float(f) => Some(*f),
            // i128 -> f64 精度损失对字面量比较无影响
            Literal::Int(n) => Some(*n as f64),
            Literal::Char(c) => Some(f64::from(*c)),
            _ => None,
        }
    }
}

fn parse_int(text: &str) -> Option<i128> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let digits = digits.trim_end_matches(['l', 'L']);
    let lower = digits.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i128::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

fn parse_float(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    digits.trim_end_matches(['f', 'F', 'd', 'D']).parse().ok()
}

fn parse_char(text: &str) -> Option<u32> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    if first != '\\' {
        return (chars.next().is_none()).then_some(first as u32);
    }

    let rest: String = chars.collect();
    match rest.as_str() {
        "n" => Some(0x0A),
        "t" => Some(0x09),
        "r" => Some(0x0D),
        "b" => Some(0x08),
        "f" => Some(0x0C),
        "s" => Some(0x20),
        "0" => Some(0),
        "\\" => Some(u32::from('\\')),
        "'" => Some(u32::from('\'')),
        "\"" => Some(u32::from('"')),
        esc if esc.starts_with('u') => u32::from_str_radix(esc.trim_start_matches('u'), 16).ok(),
        esc => u32::from_str_radix(esc, 8).ok(),
    }
}

/// Value of `left <op> right`; `None` when the pair is not comparable
pub fn evaluate_comparison(operator: &str, left: &Literal, right: &Literal) -> Option<bool> {
    use std::cmp::Ordering;

    let ordering: Option<Ordering> = match (left, right) {
        (Literal::Bool(a), Literal::Bool(b)) => Some(a.cmp(b)),
        (Literal::Str(a), Literal::Str(b)) => Some(a.cmp(b)),
        (Literal::Null, Literal::Null) => Some(Ordering::Equal),
        (Literal::Null, Literal::Str(_)) | (Literal::Str(_), Literal::Null) => {
            Some(Ordering::Less)
        }
        _ => match (left.as_integral(), right.as_integral()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => left.as_float()?.partial_cmp(&right.as_float()?),
        },
    };

    let numeric = left.as_float().is_some() && right.as_float().is_some();
    let ordering = match ordering {
        Some(o) => o,
        // NaN: 只有 != 为真
        None if numeric => return Some(operator == "!="),
        None => return None,
    };

    match operator {
        "==" => Some(ordering == Ordering::Equal),
        "!=" => Some(ordering != Ordering::Equal),
        // 关系运算只对数值有意义
        _ if !numeric => None,
        "<" => Some(ordering == Ordering::Less),
        "<=" => Some(ordering != Ordering::Greater),
        ">" => Some(ordering == Ordering::Greater),
        ">=" => Some(ordering != Ordering::Less),
        _ => None,
    }
}

fn is_always_false(site: &ComparisonSite) -> bool {
    let (Some(left), Some(right)) = (Literal::from_operand(&site.left), Literal::from_operand(&site.right)) else {
        return false;
    };
    evaluate_comparison(&site.operator, &left, &right) == Some(false)
}

/// Conditions in one unit that can never be true
///
/// A unit that does not parse cleanly is skipped.
pub fn detect_impossible_branches(analyzer: &JavaTreeSitterAnalyzer, unit: &SourceUnit) -> Vec<UnreachableLocation> {
    let sites = match analyzer.comparison_sites(&unit.text) {
        Ok(sites) => sites,
        Err(e) => {
            debug!("literal detector skipped {}: {e}", unit.display_path());
            return Vec::new();
        }
    };

    sites.into_iter()
        .filter(is_always_false)
        .map(|site| UnreachableLocation {
            file: unit.path.clone(),
            line: site.line,
            expression: Some(site.expression),
            detector: Detector::Literal,
        })
        .collect()
}
