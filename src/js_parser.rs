//! CHTL-JS parser.
//!
//! Recognizes exactly the call shapes `listen({…})`, `delegate({…})`,
//! `animate({…})`, `vir Name = listen({…});` and chained method calls on
//! enhanced selectors. Everything else is `OpaqueJs` and passes through
//! untouched — this parser makes no attempt to understand JavaScript.

use crate::ast::{
    AnimateBlock, ArrowChain, ChainCall, ChainHead, DelegateBlock, EnhancedSelector, JsNode,
    ListenBlock, OpaqueJs, Script, SelectorKind, VirDecl,
};
use crate::diagnostics::{DiagnosticKind, DiagnosticList};
use crate::js_lexer::{lex_js_fragment, JsToken, JsTokenKind};
use crate::span::Span;

/// Parse one CHTL-JS fragment (a single construct as cut by the scanner).
pub fn parse_js_fragment(text: &str, span: Span, diags: &mut DiagnosticList) -> Script {
    let tokens = lex_js_fragment(text, span);
    let mut parser = JsParser {
        tokens,
        pos: 0,
        diags,
    };
    let mut children = Vec::new();
    while !parser.at_end() {
        let before = parser.pos;
        if let Some(node) = parser.parse_construct() {
            children.push(node);
        }
        if parser.pos == before {
            // Could not make sense of the token; pass it through opaquely.
            let tok = parser.advance().clone();
            children.push(JsNode::OpaqueJs(OpaqueJs {
                text: tok.text,
                span: tok.span,
            }));
        }
    }
    Script { children }
}

/// Classify the inner text of a `{{…}}` selector.
pub fn classify_selector(raw: &str, span: Span) -> EnhancedSelector {
    let raw = raw.trim().to_string();
    // `sel[n]` → indexed access into the query result.
    let (parsed, index) = match (raw.rfind('['), raw.ends_with(']')) {
        (Some(open), true) => {
            let idx_text = &raw[open + 1..raw.len() - 1];
            match idx_text.parse::<usize>() {
                Ok(n) => (raw[..open].trim().to_string(), Some(n)),
                Err(_) => (raw.clone(), None),
            }
        }
        _ => (raw.clone(), None),
    };
    let kind = if index.is_some() {
        SelectorKind::Indexed
    } else if parsed.contains(' ') || parsed.contains('>') || parsed.contains(',') {
        SelectorKind::Complex
    } else if parsed.starts_with('.') {
        SelectorKind::Class
    } else if parsed.starts_with('#') {
        SelectorKind::Id
    } else {
        SelectorKind::Tag
    };
    EnhancedSelector {
        kind,
        raw,
        parsed,
        index,
        span,
    }
}

struct JsParser<'a> {
    tokens: Vec<JsToken>,
    pos: usize,
    diags: &'a mut DiagnosticList,
}

impl<'a> JsParser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current(&self) -> Option<&JsToken> {
        self.tokens.get(self.pos)
    }

    fn peek(&self, ahead: usize) -> Option<&JsToken> {
        self.tokens.get(self.pos + ahead)
    }

    fn advance(&mut self) -> &JsToken {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: JsTokenKind) -> bool {
        if self.current().map(|t| t.kind == kind).unwrap_or(false) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_construct(&mut self) -> Option<JsNode> {
        let tok = self.current()?.clone();
        match tok.kind {
            JsTokenKind::EnhancedSelector => {
                self.pos += 1;
                let selector = classify_selector(&tok.text, tok.span);
                if self.current().map(|t| t.kind == JsTokenKind::Arrow).unwrap_or(false) {
                    self.parse_chain(ChainHead::Selector(selector), tok.span)
                } else {
                    self.eat(JsTokenKind::Semicolon);
                    Some(JsNode::Selector(selector))
                }
            }
            JsTokenKind::Ident if tok.text == "vir" => self.parse_vir(tok.span),
            JsTokenKind::Ident if tok.text == "animate" => {
                if self.peek(1).map(|t| t.kind == JsTokenKind::ParenGroup).unwrap_or(false) {
                    self.pos += 1;
                    let args = self.advance().clone();
                    self.eat(JsTokenKind::Semicolon);
                    Some(JsNode::Animate(AnimateBlock {
                        object: args.text,
                        span: tok.span.to(args.span),
                    }))
                } else {
                    None
                }
            }
            JsTokenKind::Ident => {
                if self.peek(1).map(|t| t.kind == JsTokenKind::Arrow).unwrap_or(false) {
                    self.pos += 1;
                    self.parse_chain(
                        ChainHead::Ident {
                            name: tok.text.clone(),
                            span: tok.span,
                        },
                        tok.span,
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn parse_chain(&mut self, head: ChainHead, start: Span) -> Option<JsNode> {
        let mut calls = Vec::new();
        let mut end = start;
        while self.eat(JsTokenKind::Arrow) {
            let name_tok = match self.current() {
                Some(t) if t.kind == JsTokenKind::Ident => t.clone(),
                _ => {
                    self.diags.error(
                        DiagnosticKind::MissingToken("method name after `->`".to_string()),
                        end,
                    );
                    break;
                }
            };
            self.pos += 1;
            end = name_tok.span;
            let args = if self
                .current()
                .map(|t| t.kind == JsTokenKind::ParenGroup)
                .unwrap_or(false)
            {
                let args_tok = self.advance().clone();
                end = args_tok.span;
                Some(args_tok)
            } else {
                None
            };
            let call = match (name_tok.text.as_str(), &args) {
                ("listen", Some(args_tok)) => ChainCall::Listen(ListenBlock {
                    handlers: parse_object_entries(&args_tok.text),
                    span: args_tok.span,
                }),
                ("delegate", Some(args_tok)) => {
                    let entries = parse_object_entries(&args_tok.text);
                    let mut targets = Vec::new();
                    let mut handlers = Vec::new();
                    for (key, value) in entries {
                        if key == "target" {
                            targets.extend(extract_selector_list(&value));
                        } else {
                            handlers.push((key, value));
                        }
                    }
                    ChainCall::Delegate(DelegateBlock {
                        targets,
                        handlers,
                        span: args_tok.span,
                    })
                }
                _ => ChainCall::Method {
                    name: name_tok.text.clone(),
                    args: args.map(|a| a.text).unwrap_or_default(),
                    span: name_tok.span,
                },
            };
            calls.push(call);
        }
        self.eat(JsTokenKind::Semicolon);
        Some(JsNode::Chain(ArrowChain {
            head,
            calls,
            span: start.to(end),
        }))
    }

    /// `vir Name = listen({…});`
    fn parse_vir(&mut self, start: Span) -> Option<JsNode> {
        self.pos += 1; // `vir`
        let name_tok = match self.current() {
            Some(t) if t.kind == JsTokenKind::Ident => t.clone(),
            _ => {
                self.diags.error(
                    DiagnosticKind::MissingToken("virtual object name".to_string()),
                    start,
                );
                return None;
            }
        };
        self.pos += 1;
        if !self.eat(JsTokenKind::Equal) {
            self.diags.error(
                DiagnosticKind::MissingToken("`=` in vir declaration".to_string()),
                name_tok.span,
            );
            return None;
        }
        match (self.current().cloned(), self.peek(1).cloned()) {
            (Some(kw), Some(args))
                if kw.kind == JsTokenKind::Ident
                    && kw.text == "listen"
                    && args.kind == JsTokenKind::ParenGroup =>
            {
                self.pos += 2;
                self.eat(JsTokenKind::Semicolon);
                Some(JsNode::VirDecl(VirDecl {
                    name: name_tok.text,
                    body: ListenBlock {
                        handlers: parse_object_entries(&args.text),
                        span: args.span,
                    },
                    span: start.to(args.span),
                }))
            }
            _ => {
                self.diags.error(
                    DiagnosticKind::MissingToken("`listen({…})` after `=`".to_string()),
                    name_tok.span,
                );
                None
            }
        }
    }
}

/// Split a `{ key: value, … }` object source into top-level entries, values
/// kept raw. Keys may be identifiers or quoted strings.
pub fn parse_object_entries(src: &str) -> Vec<(String, String)> {
    let body = {
        let t = src.trim();
        let t = t.strip_prefix('{').unwrap_or(t);
        t.strip_suffix('}').unwrap_or(t)
    };
    let mut entries = Vec::new();
    for part in split_top_level(body, ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some(colon) = find_top_level(part, ':') {
            let key = part[..colon]
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string();
            let value = part[colon + 1..].trim().to_string();
            entries.push((key, value));
        }
    }
    entries
}

/// `target:` values in a `delegate` block: one selector or an array of them.
fn extract_selector_list(value: &str) -> Vec<String> {
    let value = value.trim();
    let inner = if value.starts_with('[') && value.ends_with(']') {
        &value[1..value.len() - 1]
    } else {
        value
    };
    split_top_level(inner, ',')
        .into_iter()
        .map(|v| {
            let v = v.trim();
            if let Some(stripped) = v.strip_prefix("{{") {
                stripped.strip_suffix("}}").unwrap_or(stripped).trim().to_string()
            } else {
                v.trim_matches(|c| c == '"' || c == '\'').to_string()
            }
        })
        .filter(|v| !v.is_empty())
        .collect()
}

fn split_top_level(src: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut current = String::new();
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = in_string {
            current.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            } else if c == q {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => {
                in_string = Some(c);
                current.push(c);
            }
            '{' | '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            '}' | ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// First top-level occurrence of `sep` outside strings and brackets.
fn find_top_level(src: &str, sep: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut skip_next = false;
    for (i, c) in src.char_indices() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if let Some(q) = in_string {
            if c == '\\' {
                skip_next = true;
            } else if c == q {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => in_string = Some(c),
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            c if c == sep && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (Script, DiagnosticList) {
        let mut diags = DiagnosticList::new();
        let script = parse_js_fragment(src, Span::dummy(), &mut diags);
        (script, diags)
    }

    #[test]
    fn classifies_selectors() {
        let s = classify_selector(".box", Span::dummy());
        assert_eq!(s.kind, SelectorKind::Class);
        let s = classify_selector("#app", Span::dummy());
        assert_eq!(s.kind, SelectorKind::Id);
        let s = classify_selector("div", Span::dummy());
        assert_eq!(s.kind, SelectorKind::Tag);
        let s = classify_selector("ul li a", Span::dummy());
        assert_eq!(s.kind, SelectorKind::Complex);
        let s = classify_selector(".item[2]", Span::dummy());
        assert_eq!(s.kind, SelectorKind::Indexed);
        assert_eq!(s.parsed, ".item");
        assert_eq!(s.index, Some(2));
    }

    #[test]
    fn listen_chain_parses_handlers_in_order() {
        let (script, diags) = parse("{{.box}}->listen({click: () => { x++; }, focus: f});");
        assert!(!diags.has_errors());
        let chain = match &script.children[0] {
            JsNode::Chain(c) => c,
            other => panic!("expected chain, got {:?}", other),
        };
        assert!(matches!(&chain.head, ChainHead::Selector(s) if s.raw == ".box"));
        let listen = match &chain.calls[0] {
            ChainCall::Listen(l) => l,
            _ => panic!(),
        };
        assert_eq!(listen.handlers.len(), 2);
        assert_eq!(listen.handlers[0].0, "click");
        assert_eq!(listen.handlers[0].1, "() => { x++; }");
        assert_eq!(listen.handlers[1].0, "focus");
    }

    #[test]
    fn delegate_extracts_targets() {
        let (script, _) = parse(
            "{{#menu}}->delegate({target: [{{.item}}, {{.sub}}], click: handle});",
        );
        let chain = match &script.children[0] {
            JsNode::Chain(c) => c,
            _ => panic!(),
        };
        let delegate = match &chain.calls[0] {
            ChainCall::Delegate(d) => d,
            _ => panic!(),
        };
        assert_eq!(delegate.targets, vec![".item", ".sub"]);
        assert_eq!(delegate.handlers.len(), 1);
    }

    #[test]
    fn plain_method_chain() {
        let (script, _) = parse("{{#id}}->focus()->blur()");
        let chain = match &script.children[0] {
            JsNode::Chain(c) => c,
            _ => panic!(),
        };
        assert_eq!(chain.calls.len(), 2);
        assert!(matches!(&chain.calls[0], ChainCall::Method { name, .. } if name == "focus"));
    }

    #[test]
    fn vir_declaration() {
        let (script, diags) = parse("vir V = listen({ click: f });");
        assert!(!diags.has_errors());
        let vir = match &script.children[0] {
            JsNode::VirDecl(v) => v,
            other => panic!("expected vir, got {:?}", other),
        };
        assert_eq!(vir.name, "V");
        assert_eq!(vir.body.handlers[0].0, "click");
    }

    #[test]
    fn vir_call_is_an_ident_chain() {
        let (script, _) = parse("V->run(1, 2);");
        let chain = match &script.children[0] {
            JsNode::Chain(c) => c,
            _ => panic!(),
        };
        assert!(matches!(&chain.head, ChainHead::Ident { name, .. } if name == "V"));
        assert!(matches!(&chain.calls[0], ChainCall::Method { args, .. } if args == "1, 2"));
    }

    #[test]
    fn animate_keeps_object_verbatim() {
        let (script, _) = parse("animate({ target: {{.box}}, duration: 300 });");
        let animate = match &script.children[0] {
            JsNode::Animate(a) => a,
            other => panic!("expected animate, got {:?}", other),
        };
        assert!(animate.object.contains("duration: 300"));
    }

    #[test]
    fn nested_braces_in_handler_values_survive() {
        let entries =
            parse_object_entries("{click: () => { if (a) { b(); } }, other: 1}");
        assert_eq!(entries.len(), 2);
        assert!(entries[0].1.contains("{ b(); }"));
    }

    #[test]
    fn malformed_vir_is_diagnosed() {
        let (_, diags) = parse("vir V = 5;");
        assert!(diags.has_errors());
    }
}
