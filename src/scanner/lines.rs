//! 行分类
//!
//! Line-level rules only look at code lines. Documentation text is exempt:
//! a line whose trimmed form opens a block comment starts the documentation
//! state, and the first line holding `*/` (the opening line included) ends
//! it. Nested openers are not tracked; the first close marker wins.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineClass {
    Code,
    Blank,
    /// Inside a `/* ... */` or `/** ... */` block
    DocBlock,
    /// `//` line or a stray `*` continuation line
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineInfo {
    /// 1-based
    pub number: usize,
    pub class: LineClass,
    /// Code with string/char contents and comments blanked out (same length)
    pub masked: String,
}

pub fn classify_lines(lines: &[String]) -> Vec<LineInfo> {
    let mut in_doc = false;
    let mut out = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();

        let class = if in_doc {
            if trimmed.contains("*/") {
                in_doc = false;
            }
            LineClass::DocBlock
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            in_doc = !rest.contains("*/");
            LineClass::DocBlock
        } else if trimmed.starts_with("//") || trimmed.starts_with('*') {
            LineClass::Comment
        } else if trimmed.is_empty() {
            LineClass::Blank
        } else {
            LineClass::Code
        };

        let masked = if class == LineClass::Code {
            mask_line(line)
        } else {
            String::new()
        };

        out.push(LineInfo {
            number: idx + 1,
            class,
            masked,
        });
    }

    out
}

/// Blank out literal contents and comments, keeping byte positions
///
/// Quotes themselves stay so the line shape is still readable. An
/// unterminated `/*` blanks the rest of the line.
pub fn mask_line(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' && i + 1 < bytes.len() {
                        out[i] = b' ';
                        i += 1;
                    }
                    out[i] = b' ';
                    i += 1;
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out[i..].fill(b' ');
                break;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = line[i + 2..].find("*/").map(|p| i + 2 + p + 2);
                let end = close.unwrap_or(bytes.len());
                out[i..end].fill(b' ');
                i = end;
            }
            _ => i += 1,
        }
    }

    // 只替换 ASCII 字节，多字节字符保持原样，因此仍是合法 UTF-8
    String::from_utf8(out).unwrap_or_else(|_| line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(src: &str) -> Vec<LineClass> {
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        classify_lines(&lines).into_iter().map(|l| l.class).collect()
    }

    #[test]
    fn test_doc_block_state() {
        let src = "/**\n   bad   indent\n */\nint x;\n/** one line */\nint y;";
        assert_eq!(
            classes(src),
            vec![
                LineClass::DocBlock,
                LineClass::DocBlock,
                LineClass::DocBlock,
                LineClass::Code,
                LineClass::DocBlock,
                LineClass::Code,
            ]
        );
    }

    #[test]
    fn test_first_close_marker_wins() {
        let src = "/*\n /* nested\n */\ncode();\n */";
        assert_eq!(
            classes(src),
            vec![
                LineClass::DocBlock,
                LineClass::DocBlock,
                LineClass::DocBlock,
                LineClass::Code,
                LineClass::Comment,
            ]
        );
    }

    #[test]
    fn test_comment_and_blank_lines() {
        assert_eq!(
            classes("// note\n\n   \nx = 1;"),
            vec![LineClass::Comment, LineClass::Blank, LineClass::Blank, LineClass::Code]
        );
    }

    #[test]
    fn test_mask_line() {
        assert_eq!(mask_line(r#"s = "a}b"; } // }"#), r#"s = "   "; }     "#);
        assert_eq!(mask_line("c = '}'; /* } */ }"), "c = ' ';         }");
        assert_eq!(mask_line(r#"q = "\"}";"#), r#"q = "   ";"#);
    }
}
