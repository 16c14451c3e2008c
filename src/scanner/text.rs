//! 文本工具 - word search and call-argument splitting

use memchr::memmem;

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Byte offsets of every whole-word occurrence of `word`
pub fn word_offsets(text: &str, word: &str) -> Vec<usize> {
    if word.is_empty() {
        return Vec::new();
    }
    let bytes = text.as_bytes();
    memmem::find_iter(bytes, word.as_bytes())
        .filter(|&start| {
            let end = start + word.len();
            let before_ok = start == 0 || !is_ident_byte(bytes[start - 1]);
            let after_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
            before_ok && after_ok
        })
        .collect()
}

/// Whole-word occurrences that look like a call (`name (`) or a method
/// reference (`::name`)
pub fn call_offsets(text: &str, name: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    word_offsets(text, name)
        .into_iter()
        .filter(|&start| {
            let after = text[start + name.len()..].trim_start();
            let is_call = after.starts_with('(');
            let before = text[..start].trim_end();
            let is_reference = before.ends_with("::");
            // `new Foo(` 是构造调用，不算方法调用
            let is_construction = before.ends_with("new")
                && before.len() >= 3
                && (before.len() == 3 || !is_ident_byte(bytes[before.len() - 4]));
            (is_call && !is_construction) || is_reference
        })
        .collect()
}

/// Text between the parenthesis at `open` and its matching `)`
///
/// Parentheses inside string and char literals are ignored. Returns `None`
/// when `open` is not a `(` or the call never closes.
pub fn call_arguments(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[open + 1..i]);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    None
}

/// Split an argument list on top-level commas
///
/// Commas nested in `()`, `[]`, `{}` or inside string/char literals do not
/// split. Pieces are trimmed; a trailing empty piece is dropped.
pub fn split_arguments(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in args.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}
