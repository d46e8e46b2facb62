//! CHTL lexer.
//!
//! A conventional handwritten lexer over CHTL fragments. Keyword recognition
//! goes through the `KeywordTable` built from the active configuration, so
//! `[Name]` rebindings change what counts as a keyword without touching this
//! file. Multi-word contextuals (`at top`, `at bottom`) are collapsed into
//! single tokens with a two-word peek.
//!
//! Lexing never aborts: recoverable problems (unterminated string, bad
//! escape, unknown marker) produce diagnostics and a best-effort token.

use crate::diagnostics::{DiagnosticKind, DiagnosticList};
use crate::scanner::{Fragment, FragmentKind};
use crate::span::{Cursor, FileId, Span};
use crate::token::{KeywordTable, StringFlavor, StructuralKw, Token, TokenKind};

pub struct Lexer<'a> {
    text: &'a str,
    base: usize,
    file: FileId,
    cur: Cursor,
    table: &'a KeywordTable,
    tokens: Vec<Token>,
    /// Kind of the last emitted token; disambiguates `.x` selectors from
    /// dotted paths.
    last: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(fragment: &'a Fragment, table: &'a KeywordTable) -> Self {
        let span = fragment.span;
        Lexer {
            text: &fragment.text,
            base: span.offset as usize,
            file: span.file,
            cur: Cursor {
                offset: span.offset as usize,
                line: span.start_line.max(1),
                col: span.start_col.max(1),
            },
            table,
            tokens: Vec::new(),
            last: None,
        }
    }

    fn rel(&self) -> usize {
        self.cur.offset - self.base
    }

    fn peek(&self) -> Option<char> {
        self.text[self.rel()..].chars().next()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.text[self.rel()..].chars().nth(ahead)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.text[self.rel()..].starts_with(s)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cur.advance(c);
        Some(c)
    }

    fn emit(&mut self, kind: TokenKind, value: impl Into<String>, start: Cursor) {
        let span = start.span_to(self.file, self.cur);
        self.last = Some(kind.clone());
        self.tokens.push(Token::new(kind, value, span));
    }

    pub fn lex(mut self, diags: &mut DiagnosticList) -> Vec<Token> {
        while let Some(c) = self.peek() {
            let start = self.cur;
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.starts_with("//") => self.skip_line(),
                '/' if self.starts_with("/*") => self.skip_block_comment(),
                '-' if self.starts_with("--") => self.generator_comment(start),
                '"' | '\'' => self.string(start, diags),
                '[' => self.marker(start, diags),
                '@' => self.type_keyword(start),
                '.' => self.dot_or_class(start),
                '#' => self.hash_or_id(start),
                ':' => self.colon_or_pseudo(start),
                '{' => self.single(TokenKind::LBrace, start),
                '}' => self.single(TokenKind::RBrace, start),
                ']' => self.single(TokenKind::RBracket, start),
                '(' => self.single(TokenKind::LParen, start),
                ')' => self.single(TokenKind::RParen, start),
                ';' => self.single(TokenKind::Semicolon, start),
                '=' => self.single(TokenKind::Equal, start),
                ',' => self.single(TokenKind::Comma, start),
                '&' => self.single(TokenKind::Ampersand, start),
                '*' => self.single(TokenKind::Star, start),
                c if c.is_ascii_digit() => self.number(start),
                c if is_ident_start(c) => self.word(start),
                _ => {
                    // Unknown char: skip it; the parser reports in context.
                    self.bump();
                }
            }
        }
        self.tokens
    }

    fn single(&mut self, kind: TokenKind, start: Cursor) {
        let c = self.bump().unwrap();
        self.emit(kind, c.to_string(), start);
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        self.bump();
        self.bump();
        while !self.starts_with("*/") {
            if self.bump().is_none() {
                return;
            }
        }
        self.bump();
        self.bump();
    }

    /// `-- text` — kept as a token; the emitter turns it into an HTML comment.
    fn generator_comment(&mut self, start: Cursor) {
        self.bump();
        self.bump();
        let text_start = self.rel();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        let text = self.text[text_start..self.rel()].trim().to_string();
        self.emit(TokenKind::GeneratorComment, text, start);
    }

    fn string(&mut self, start: Cursor, diags: &mut DiagnosticList) {
        let quote = self.bump().unwrap();
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = start.span_to(self.file, self.cur);
                    diags.error(DiagnosticKind::UnterminatedString, span);
                    break;
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('0') => value.push('\0'),
                        Some(c) if c == quote || c == '"' || c == '\'' => value.push(c),
                        Some(c) => {
                            let span = start.span_to(self.file, self.cur);
                            diags.error(DiagnosticKind::InvalidEscape(c.to_string()), span);
                            value.push(c);
                        }
                        None => {
                            let span = start.span_to(self.file, self.cur);
                            diags.error(DiagnosticKind::UnterminatedString, span);
                            break;
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        self.emit(TokenKind::StringLiteral(StringFlavor::Quoted), value, start);
    }

    /// `[Word]` markers. Structural keywords come from the table; digit
    /// brackets (`[0]`) fall back to plain punctuation for index access.
    fn marker(&mut self, start: Cursor, diags: &mut DiagnosticList) {
        // Digits: emit `[` and let number/`]` lexing proceed.
        if self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.single(TokenKind::LBracket, start);
            return;
        }
        let rel_start = self.rel();
        let close = self.text[rel_start..]
            .char_indices()
            .take_while(|(_, c)| *c != '\n' && *c != '{')
            .find(|(_, c)| *c == ']')
            .map(|(i, _)| rel_start + i);
        let close = match close {
            Some(i) => i,
            None => {
                self.single(TokenKind::LBracket, start);
                return;
            }
        };
        let marker = self.text[rel_start..close + 1].to_string();
        match self.table.structural(&marker) {
            Some(kw) => {
                while self.rel() <= close {
                    self.bump();
                }
                self.emit(TokenKind::Structural(kw), marker, start);
            }
            None => {
                while self.rel() <= close {
                    self.bump();
                }
                let span = start.span_to(self.file, self.cur);
                diags.error(DiagnosticKind::UnknownMarker(marker.clone()), span);
                // Emit as an identifier so the parser can keep going.
                self.emit(TokenKind::Identifier, marker, start);
            }
        }
    }

    fn type_keyword(&mut self, start: Cursor) {
        self.bump();
        let word_start = self.rel();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let spelling = format!("@{}", &self.text[word_start..self.rel()]);
        let kw = self.table.type_keyword(&spelling);
        self.emit(TokenKind::Type(kw), spelling, start);
    }

    /// `.` is a class selector at a selector position, a path separator after
    /// an identifier.
    fn dot_or_class(&mut self, start: Cursor) {
        let after_ident = matches!(
            self.last,
            Some(TokenKind::Identifier) | Some(TokenKind::RBracket)
        );
        let next_is_ident = self.peek_at(1).map(is_ident_start).unwrap_or(false);
        if after_ident || !next_is_ident {
            self.single(TokenKind::Dot, start);
            return;
        }
        self.bump();
        let name = self.read_ident();
        self.emit(TokenKind::ClassSelector, format!(".{}", name), start);
    }

    fn hash_or_id(&mut self, start: Cursor) {
        self.bump();
        let name = self.read_ident_or_hex();
        self.emit(TokenKind::IdSelector, format!("#{}", name), start);
    }

    fn colon_or_pseudo(&mut self, start: Cursor) {
        if self.starts_with("::") {
            self.bump();
            self.bump();
            let name = self.read_ident();
            self.emit(TokenKind::PseudoElement, format!("::{}", name), start);
            return;
        }
        let after_selector = matches!(
            self.last,
            Some(TokenKind::Ampersand)
                | Some(TokenKind::ClassSelector)
                | Some(TokenKind::IdSelector)
        );
        if after_selector && self.peek_at(1).map(is_ident_start).unwrap_or(false) {
            self.bump();
            let name = self.read_ident();
            self.emit(TokenKind::PseudoClass, format!(":{}", name), start);
            return;
        }
        self.single(TokenKind::Colon, start);
    }

    /// Number with an optional unit suffix kept in the same token
    /// (`16px`, `1.5em`, `100%`).
    fn number(&mut self, start: Cursor) {
        let num_start = self.rel();
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.bump();
        }
        if self.peek() == Some('.')
            && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            self.bump();
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.bump();
            }
        }
        while self
            .peek()
            .map(|c| c.is_ascii_alphabetic() || c == '%')
            .unwrap_or(false)
        {
            self.bump();
        }
        let text = self.text[num_start..self.rel()].to_string();
        self.emit(TokenKind::NumberLiteral, text, start);
    }

    fn word(&mut self, start: Cursor) {
        let word = self.read_ident();
        // Two-word peek for `at top` / `at bottom`.
        if self.table.starts_multi_word(&word) {
            let save = self.cur;
            let mut probe = self.cur;
            let rest = &self.text[self.rel()..];
            let mut chars = rest.chars();
            let mut second = String::new();
            let mut seen_space = false;
            for c in chars.by_ref() {
                if c.is_whitespace() {
                    if !second.is_empty() {
                        break;
                    }
                    seen_space = true;
                    probe.advance(c);
                } else if is_ident_char(c) && seen_space {
                    second.push(c);
                    probe.advance(c);
                } else {
                    break;
                }
            }
            if let Some(kw) = self.table.multi_word(&word, &second) {
                self.cur = probe;
                self.emit(
                    TokenKind::Contextual(kw),
                    format!("{} {}", word, second),
                    start,
                );
                return;
            }
            self.cur = save;
        }
        match self.table.contextual(&word) {
            Some(kw) => self.emit(TokenKind::Contextual(kw), word, start),
            None => self.emit(TokenKind::Identifier, word, start),
        }
    }

    fn read_ident(&mut self) -> String {
        let start = self.rel();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.bump();
            } else if c == '-'
                && !self.starts_with("--")
                && self.peek_at(1).map(|n| n.is_alphanumeric()).unwrap_or(false)
            {
                // CSS-style identifiers: `font-size`. `--` starts a comment.
                self.bump();
            } else {
                break;
            }
        }
        self.text[start..self.rel()].to_string()
    }

    fn read_ident_or_hex(&mut self) -> String {
        let start = self.rel();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.bump();
            } else {
                break;
            }
        }
        self.text[start..self.rel()].to_string()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Lex a full fragment stream into one CHTL token stream.
///
/// CHTL fragments are lexed; cut-out bodies (script, origin, top-level CSS)
/// collapse into `FragmentRef` tokens so the parser can attach them to the
/// construct that introduced them. Consecutive JS/CHTL-JS fragments (one
/// script body) become a single reference.
pub fn lex_fragments(
    fragments: &[Fragment],
    table: &KeywordTable,
    diags: &mut DiagnosticList,
) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < fragments.len() {
        let frag = &fragments[i];
        match &frag.kind {
            FragmentKind::Chtl => {
                tokens.extend(Lexer::new(frag, table).lex(diags));
                i += 1;
            }
            FragmentKind::Js | FragmentKind::ChtlJs => {
                let first = i;
                let mut span = frag.span;
                while i < fragments.len()
                    && matches!(fragments[i].kind, FragmentKind::Js | FragmentKind::ChtlJs)
                {
                    span = span.to(fragments[i].span);
                    i += 1;
                }
                tokens.push(Token::new(
                    TokenKind::FragmentRef {
                        first,
                        last: i - 1,
                    },
                    "",
                    span,
                ));
            }
            _ => {
                tokens.push(Token::new(
                    TokenKind::FragmentRef { first: i, last: i },
                    "",
                    frag.span,
                ));
                i += 1;
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::token::{ContextualKw, TypeKw};

    fn lex(src: &str) -> (Vec<Token>, DiagnosticList) {
        let config = Configuration::default();
        let table = KeywordTable::from_config(&config);
        let frag = Fragment {
            kind: FragmentKind::Chtl,
            text: src.to_string(),
            span: Span::new(0, 0, src.len(), 1, 1, 1, 1),
        };
        let mut diags = DiagnosticList::new();
        let tokens = Lexer::new(&frag, &table).lex(&mut diags);
        (tokens, diags)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn lexes_a_template_header() {
        let (tokens, diags) = lex("[Template] @Style Theme {");
        assert!(!diags.has_errors());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Structural(StructuralKw::Template),
                TokenKind::Type(TypeKw::Style),
                TokenKind::Identifier,
                TokenKind::LBrace,
            ]
        );
        assert_eq!(tokens[2].value, "Theme");
    }

    #[test]
    fn collapses_multi_word_contextuals() {
        let (tokens, _) = lex("insert at top {");
        assert_eq!(tokens[0].kind, TokenKind::Contextual(ContextualKw::Insert));
        assert_eq!(tokens[1].kind, TokenKind::Contextual(ContextualKw::AtTop));
        assert_eq!(tokens[1].value, "at top");
    }

    #[test]
    fn at_followed_by_other_word_stays_separate() {
        let (tokens, _) = lex("at noon");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "at");
        assert_eq!(tokens[1].value, "noon");
    }

    #[test]
    fn strings_unescape_and_report_termination() {
        let (tokens, diags) = lex(r#""a\nb""#);
        assert!(!diags.has_errors());
        assert_eq!(tokens[0].value, "a\nb");

        let (_, diags) = lex("\"oops\n");
        assert!(diags.has_errors());
    }

    #[test]
    fn numbers_keep_their_unit() {
        let (tokens, _) = lex("16px 1.5em 100%");
        let values: Vec<_> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["16px", "1.5em", "100%"]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::NumberLiteral));
    }

    #[test]
    fn css_property_names_are_single_identifiers() {
        let (tokens, _) = lex("font-size: 16px;");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "font-size");
        assert_eq!(tokens[1].kind, TokenKind::Colon);
    }

    #[test]
    fn class_selector_vs_dotted_path() {
        let (tokens, _) = lex("{ .box }");
        assert_eq!(tokens[1].kind, TokenKind::ClassSelector);
        assert_eq!(tokens[1].value, ".box");

        let (tokens, _) = lex("ui.widgets");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );
    }

    #[test]
    fn pseudo_after_ampersand() {
        let (tokens, _) = lex("&:hover");
        assert_eq!(tokens[0].kind, TokenKind::Ampersand);
        assert_eq!(tokens[1].kind, TokenKind::PseudoClass);
        assert_eq!(tokens[1].value, ":hover");

        let (tokens, _) = lex("&::before");
        assert_eq!(tokens[1].kind, TokenKind::PseudoElement);
    }

    #[test]
    fn index_access_is_bracket_number_bracket() {
        let (tokens, _) = lex("div[0]");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Identifier,
                TokenKind::LBracket,
                TokenKind::NumberLiteral,
                TokenKind::RBracket
            ]
        );
    }

    #[test]
    fn unknown_marker_is_diagnosed_not_fatal() {
        let (tokens, diags) = lex("[Bogus] div");
        assert!(diags.has_errors());
        assert_eq!(tokens.last().unwrap().value, "div");
    }

    #[test]
    fn generator_comment_token_carries_text() {
        let (tokens, _) = lex("-- renders into output\ndiv");
        assert_eq!(tokens[0].kind, TokenKind::GeneratorComment);
        assert_eq!(tokens[0].value, "renders into output");
    }

    #[test]
    fn rebound_keyword_spelling_is_recognized() {
        let mut config = Configuration::default();
        let mut d = DiagnosticList::new();
        config.rebind_keyword("KEYWORD_TEMPLATE", "[Tpl]", Span::dummy(), &mut d);
        let table = KeywordTable::from_config(&config);
        let frag = Fragment {
            kind: FragmentKind::Chtl,
            text: "[Tpl] @Style X {".to_string(),
            span: Span::new(0, 0, 16, 1, 1, 1, 1),
        };
        let mut diags = DiagnosticList::new();
        let tokens = Lexer::new(&frag, &table).lex(&mut diags);
        assert_eq!(tokens[0].kind, TokenKind::Structural(StructuralKw::Template));
        assert!(!diags.has_errors());
    }

    #[test]
    fn fragment_stream_lexing_groups_script_bodies() {
        use crate::scanner::scan_source;
        let src = "div { script { let a = 1; {{.b}}->listen({c: d}); } }";
        let frags = scan_source(src, 0, &Configuration::default());
        let table = KeywordTable::from_config(&Configuration::default());
        let mut diags = DiagnosticList::new();
        let tokens = lex_fragments(&frags, &table, &mut diags);
        let refs: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::FragmentRef { .. }))
            .collect();
        assert_eq!(refs.len(), 1, "one script body, one reference");
    }
}
