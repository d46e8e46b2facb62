//! CHTL-JS lexer.
//!
//! Operates on the CHTL-JS fragments the scanner cut out of script bodies.
//! `{{…}}` is one token whose inner text is captured verbatim (nothing inside
//! is tokenized), `->` is its own token, balanced `(...)` argument groups are
//! captured raw, and anything else becomes opaque runs for the downstream
//! JavaScript back end.

use crate::span::{Cursor, Span};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JsTokenKind {
    /// Inner text of `{{…}}`, trimmed.
    EnhancedSelector,
    Arrow,
    Ident,
    /// Raw text between balanced parens, parens not included.
    ParenGroup,
    Equal,
    Semicolon,
    /// Anything the CHTL-JS grammar does not claim.
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsToken {
    pub kind: JsTokenKind,
    pub text: String,
    pub span: Span,
}

pub fn lex_js_fragment(text: &str, base: Span) -> Vec<JsToken> {
    let mut tokens = Vec::new();
    let mut cur = Cursor {
        offset: 0,
        line: base.start_line.max(1),
        col: base.start_col.max(1),
    };
    let file = base.file;
    let base_offset = base.offset as usize;

    fn push_token(
        tokens: &mut Vec<JsToken>,
        file: crate::span::FileId,
        base_offset: usize,
        kind: JsTokenKind,
        text: String,
        start: Cursor,
        end: Cursor,
    ) {
        let mut span = start.span_to(file, end);
        span.offset += base_offset as u32;
        tokens.push(JsToken { kind, text, span });
    }

    let mut opaque_start = cur;
    let mut opaque = String::new();

    macro_rules! flush_opaque {
        () => {
            if !opaque.is_empty() {
                push_token(
                    &mut tokens,
                    file,
                    base_offset,
                    JsTokenKind::Opaque,
                    std::mem::take(&mut opaque),
                    opaque_start,
                    cur,
                );
            }
        };
    }

    while cur.offset < text.len() {
        let rest = &text[cur.offset..];
        let start = cur;
        if rest.starts_with("{{") {
            flush_opaque!();
            match rest.find("}}") {
                Some(close) => {
                    let inner = rest[2..close].trim().to_string();
                    cur.advance_str(&rest[..close + 2]);
                    push_token(&mut tokens, file, base_offset, JsTokenKind::EnhancedSelector, inner, start, cur);
                }
                None => {
                    // Unterminated; ship the rest as opaque.
                    let rest_text = rest.to_string();
                    cur.advance_str(&rest_text);
                    push_token(
                        &mut tokens,
                        file,
                        base_offset,
                        JsTokenKind::Opaque,
                        rest_text,
                        start,
                        cur,
                    );
                }
            }
            opaque_start = cur;
            continue;
        }
        if rest.starts_with("->") {
            flush_opaque!();
            cur.advance_str("->");
            push_token(&mut tokens, file, base_offset, JsTokenKind::Arrow, "->".to_string(), start, cur);
            opaque_start = cur;
            continue;
        }
        let c = rest.chars().next().unwrap();
        match c {
            '(' => {
                flush_opaque!();
                let group = balanced_group(rest);
                let consumed = (group.len() + 2).min(rest.len());
                cur.advance_str(&rest[..consumed]);
                push_token(&mut tokens, file, base_offset, JsTokenKind::ParenGroup, group, start, cur);
                opaque_start = cur;
            }
            '=' if !rest.starts_with("==") && !rest.starts_with("=>") => {
                flush_opaque!();
                cur.advance(c);
                push_token(&mut tokens, file, base_offset, JsTokenKind::Equal, "=".to_string(), start, cur);
                opaque_start = cur;
            }
            ';' => {
                flush_opaque!();
                cur.advance(c);
                push_token(
                    &mut tokens,
                    file,
                    base_offset,
                    JsTokenKind::Semicolon,
                    ";".to_string(),
                    start,
                    cur,
                );
                opaque_start = cur;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                flush_opaque!();
                let mut end = 0;
                for ch in rest.chars() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                        end += ch.len_utf8();
                    } else {
                        break;
                    }
                }
                let word = rest[..end].to_string();
                cur.advance_str(&word);
                push_token(&mut tokens, file, base_offset, JsTokenKind::Ident, word, start, cur);
                opaque_start = cur;
            }
            c if c.is_whitespace() => {
                cur.advance(c);
            }
            _ => {
                if opaque.is_empty() {
                    opaque_start = cur;
                }
                opaque.push(c);
                cur.advance(c);
            }
        }
    }
    flush_opaque!();
    tokens
}

/// Inner text of the balanced paren group starting at `(`, honoring strings,
/// template literals and nested brackets.
fn balanced_group(rest: &str) -> String {
    debug_assert!(rest.starts_with('('));
    let bytes = rest.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    let mut in_string: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = in_string {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                in_string = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => in_string = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return rest[1..i].to_string();
                }
            }
            _ => {}
        }
        i += 1;
    }
    rest[1..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<JsToken> {
        lex_js_fragment(src, Span::dummy())
    }

    fn kinds(tokens: &[JsToken]) -> Vec<JsTokenKind> {
        tokens.iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn selector_arrow_call_shape() {
        let tokens = lex("{{.box}}->listen({click: () => { x++; }});");
        assert_eq!(
            kinds(&tokens),
            vec![
                JsTokenKind::EnhancedSelector,
                JsTokenKind::Arrow,
                JsTokenKind::Ident,
                JsTokenKind::ParenGroup,
                JsTokenKind::Semicolon,
            ]
        );
        assert_eq!(tokens[0].text, ".box");
        assert_eq!(tokens[2].text, "listen");
        assert_eq!(tokens[3].text, "{click: () => { x++; }}");
    }

    #[test]
    fn selector_inner_text_is_verbatim() {
        let tokens = lex("{{ div.item[2] }}");
        assert_eq!(tokens[0].text, "div.item[2]");
    }

    #[test]
    fn vir_declaration_shape() {
        let tokens = lex("vir V = listen({ click: f });");
        assert_eq!(
            kinds(&tokens),
            vec![
                JsTokenKind::Ident,
                JsTokenKind::Ident,
                JsTokenKind::Equal,
                JsTokenKind::Ident,
                JsTokenKind::ParenGroup,
                JsTokenKind::Semicolon,
            ]
        );
        assert_eq!(tokens[0].text, "vir");
    }

    #[test]
    fn nested_parens_and_strings_stay_balanced() {
        let tokens = lex(r#"animate({ easing: "ease(in)", cb: () => f(1, g(2)) });"#);
        assert_eq!(tokens[1].kind, JsTokenKind::ParenGroup);
        assert!(tokens[1].text.contains("g(2)"));
    }

    #[test]
    fn arrow_not_confused_with_fat_arrow() {
        let tokens = lex("{{#id}}->focus()");
        assert_eq!(tokens[1].kind, JsTokenKind::Arrow);
        let tokens = lex("{{.a}}->listen({k: x => y});");
        assert_eq!(tokens[3].text, "{k: x => y}");
    }
}
