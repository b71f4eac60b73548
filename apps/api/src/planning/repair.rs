//! Tolerant repair of almost-JSON emitted by language models.
//!
//! One tokenizer-aware pass. Outside string literals it:
//! - quotes bare identifier keys (`{title: "x"}`),
//! - rewrites `'single quoted'` strings as double-quoted strings,
//! - unwraps redundantly escaped quotes (`{\"title\": \"x\"}`),
//! - drops trailing commas before `}` or `]`.
//!
//! Inside double-quoted strings the text is copied unchanged except that raw
//! control characters are escaped. Valid JSON passes through untouched.

#[derive(Clone, Copy, PartialEq)]
enum Delimiter {
    Double,
    Single,
    /// A string opened by `\"`, closed by the next `\"`.
    EscapedDouble,
}

pub fn repair(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => i = copy_string(&chars, i + 1, Delimiter::Double, &mut out),
            '\'' => i = copy_string(&chars, i + 1, Delimiter::Single, &mut out),
            '\\' if chars.get(i + 1) == Some(&'"') => {
                i = copy_string(&chars, i + 2, Delimiter::EscapedDouble, &mut out)
            }
            ',' => {
                let next = next_significant(&chars, i + 1);
                if !matches!(next.map(|j| chars[j]), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let is_key = next_significant(&chars, i).map(|j| chars[j]) == Some(':')
                    && matches!(last_significant(&out), Some('{') | Some(','));
                if is_key {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Copies one string literal starting just after its opening delimiter and
/// always emits it double-quoted. Returns the index after the closing delimiter.
fn copy_string(chars: &[char], mut i: usize, delimiter: Delimiter, out: &mut String) -> usize {
    out.push('"');
    while i < chars.len() {
        let c = chars[i];
        match (delimiter, c) {
            (Delimiter::EscapedDouble, '\\') if chars.get(i + 1) == Some(&'"') => {
                out.push('"');
                return i + 2;
            }
            (Delimiter::Double, '"') | (Delimiter::Single, '\'') => {
                out.push('"');
                return i + 1;
            }
            (Delimiter::Single, '\\') if chars.get(i + 1) == Some(&'\'') => {
                out.push('\'');
                i += 2;
            }
            (_, '\\') => {
                out.push('\\');
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            (Delimiter::Single | Delimiter::EscapedDouble, '"') => {
                out.push_str("\\\"");
                i += 1;
            }
            (_, '\n') => {
                out.push_str("\\n");
                i += 1;
            }
            (_, '\r') => {
                out.push_str("\\r");
                i += 1;
            }
            (_, '\t') => {
                out.push_str("\\t");
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    // Unterminated: close it so the parser reports a structural error instead.
    out.push('"');
    i
}

fn next_significant(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len()).find(|&j| !chars[j].is_whitespace())
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}
