//! Formatting and verification hooks for generated JavaScript.
//!
//! Both work off a small scanner that tells code apart from string literals and comments,
//! which is all the structure either of them needs.

use crate::backends::code_generator::CodeHooks;

// Globals a query has no business reaching for
const FORBIDDEN_TOKENS: &[&str] = &[
    "eval(",
    "Function(",
    "require(",
    "import(",
    "process.",
    "globalThis",
    "setTimeout(",
    "setInterval(",
    "fetch(",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    Str(char),
    StrEscape(char),
    LineComment,
    BlockComment,
}

/// Reindents by brace depth and rejects programs that are unbalanced or touch globals.
#[derive(Debug, Clone)]
pub struct JsHooks {
    pub indent: usize,
}

impl Default for JsHooks {
    fn default() -> Self {
        JsHooks { indent: 4 }
    }
}

impl CodeHooks for JsHooks {
    fn format_code(&self, code: String) -> String {
        let mut state = ScanState::Code;
        let mut depth = 0usize;
        let mut formatted = String::with_capacity(code.len());

        for raw_line in code.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                formatted.push('\n');
                continue;
            }

            let starts_in_code = state == ScanState::Code;
            let code_chars = scan_code(line, &mut state);
            if in_unterminated_string(state) {
                state = ScanState::Code;
            }

            let leading_closers = if starts_in_code {
                code_chars
                    .chars()
                    .take_while(|ch| matches!(ch, '}' | ')' | ']'))
                    .count()
            } else {
                0
            };

            let line_depth = depth.saturating_sub(leading_closers);
            formatted.push_str(&" ".repeat(line_depth * self.indent));
            formatted.push_str(line);
            formatted.push('\n');

            let opens = code_chars
                .chars()
                .filter(|ch| matches!(ch, '{' | '(' | '['))
                .count();
            let closes = code_chars
                .chars()
                .filter(|ch| matches!(ch, '}' | ')' | ']'))
                .count();
            depth = (depth + opens).saturating_sub(closes);
        }

        formatted
    }

    fn verify_code(&self, code: &str) -> bool {
        let mut state = ScanState::Code;
        let mut code_only = String::with_capacity(code.len());
        for line in code.lines() {
            code_only.push_str(&scan_code(line, &mut state));
            code_only.push('\n');

            if in_unterminated_string(state) {
                return false;
            }
        }

        if state != ScanState::Code && state != ScanState::LineComment {
            return false;
        }

        if FORBIDDEN_TOKENS
            .iter()
            .any(|token| contains_standalone(&code_only, token))
        {
            return false;
        }

        let mut stack = Vec::new();
        for ch in code_only.chars() {
            match ch {
                '{' | '(' | '[' => stack.push(ch),
                '}' | ')' | ']' => {
                    let expected = match ch {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    if stack.pop() != Some(expected) {
                        return false;
                    }
                }
                _ => {}
            }
        }

        stack.is_empty()
    }
}

/// The characters of `line` that are code, given the state carried in from the previous
/// line. String contents and comments are dropped, the quotes themselves are kept.
fn scan_code(line: &str, state: &mut ScanState) -> String {
    let mut code = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    if *state == ScanState::LineComment {
        *state = ScanState::Code;
    }

    while let Some(ch) = chars.next() {
        match *state {
            ScanState::Code => match ch {
                '"' | '\'' | '`' => {
                    code.push(ch);
                    *state = ScanState::Str(ch);
                }
                '/' if chars.peek() == Some(&'/') => {
                    *state = ScanState::LineComment;
                    break;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    *state = ScanState::BlockComment;
                }
                _ => code.push(ch),
            },
            ScanState::Str(quote) => {
                if ch == '\\' {
                    *state = ScanState::StrEscape(quote);
                } else if ch == quote {
                    code.push(ch);
                    *state = ScanState::Code;
                }
            }
            ScanState::StrEscape(quote) => *state = ScanState::Str(quote),
            ScanState::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    *state = ScanState::Code;
                }
            }
            ScanState::LineComment => break,
        }
    }

    code
}

/// True when `token` appears in `code` as its own name, not as the tail of a longer
/// identifier (`subset_retrieval(`) or a property access (`record.eval(`).
fn contains_standalone(code: &str, token: &str) -> bool {
    code.match_indices(token).any(|(start, _)| {
        let before = code[..start].chars().next_back();
        let after = code[start + token.len()..].chars().next();

        let joined_before = before.is_some_and(|ch| is_identifier_char(ch) || ch == '.');
        let joined_after =
            token.ends_with(is_identifier_char) && after.is_some_and(is_identifier_char);

        !joined_before && !joined_after
    })
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

// Plain quotes cannot span lines, template literals can
fn in_unterminated_string(state: ScanState) -> bool {
    matches!(state, ScanState::Str(quote) | ScanState::StrEscape(quote) if quote != '`')
}
