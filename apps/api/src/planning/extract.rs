//! Locating JSON inside free-form model output.
//!
//! Models wrap JSON in prose or code fences even when told not to. These
//! helpers find candidate spans; parsing and repair happen in the normalizer.

/// Returns the body of the first triple-backtick fenced block, with any
/// language tag (`json`, `JSON`, ...) dropped. An unterminated fence yields
/// everything after the opening line.
pub fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_ticks = &text[start + 3..];

    // The tag runs to the end of the opening line; a one-line fence has no tag.
    let body_start = match after_ticks.find('\n') {
        Some(nl) if is_fence_tag(&after_ticks[..nl]) => nl + 1,
        _ => after_ticks
            .find(|c: char| !c.is_ascii_alphabetic())
            .filter(|&i| after_ticks[..i].eq_ignore_ascii_case("json"))
            .unwrap_or(0),
    };
    let body = &after_ticks[body_start..];

    let inner = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    let inner = inner.trim();
    (!inner.is_empty()).then_some(inner)
}

fn is_fence_tag(line: &str) -> bool {
    line.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Iterates over balanced top-level `{...}` spans in order of appearance.
///
/// Brace depth is only counted outside string literals. `"` always opens a
/// string; `'` only does where a key or value can start, so apostrophes in
/// prose stay literal. Backslash escapes are honoured. A `{` that never
/// balances is skipped and scanning resumes just after it.
pub fn object_spans(text: &str) -> ObjectSpans<'_> {
    ObjectSpans { text, pos: 0 }
}

pub struct ObjectSpans<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for ObjectSpans<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let rest = self.text.get(self.pos..)?;
            let start = self.pos + rest.find('{')?;
            match balanced_end(&self.text[start..]) {
                Some(len) => {
                    self.pos = start + len;
                    return Some(&self.text[start..start + len]);
                }
                None => self.pos = start + 1,
            }
        }
    }
}

/// Byte length of the balanced object starting at `s[0] == '{'`.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    // Last non-whitespace character outside a string.
    let mut prev = ' ';

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
                prev = q;
            }
            continue;
        }
        let value_can_start = matches!(prev, '{' | '[' | ':' | ',');
        if !c.is_whitespace() {
            prev = c;
        }
        match c {
            '"' => quote = Some(c),
            '\'' if value_can_start => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
