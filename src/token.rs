//! CHTL token model.
//!
//! Token kinds follow the language surface: structural markers (`[Template]`
//! …), type keywords (`@Style` …), contextual keywords that are only
//! keywords in certain states (`text`, `delete`, `at top` …), literals,
//! punctuation and CSS selector fragments. Keyword spellings are not
//! hard-coded: the table is built from the active `Configuration` so `[Name]`
//! groups can rebind any of them.

use crate::config::Configuration;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructuralKw {
    Template,
    Custom,
    Origin,
    Import,
    Namespace,
    Configuration,
    Info,
    Export,
    Name,
    OriginType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKw {
    Style,
    Element,
    Var,
    Html,
    JavaScript,
    Chtl,
    CJmod,
    Config,
    /// User-defined origin type, name without the `@`.
    Custom(String),
}

impl fmt::Display for TypeKw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKw::Style => write!(f, "@Style"),
            TypeKw::Element => write!(f, "@Element"),
            TypeKw::Var => write!(f, "@Var"),
            TypeKw::Html => write!(f, "@Html"),
            TypeKw::JavaScript => write!(f, "@JavaScript"),
            TypeKw::Chtl => write!(f, "@Chtl"),
            TypeKw::CJmod => write!(f, "@CJmod"),
            TypeKw::Config => write!(f, "@Config"),
            TypeKw::Custom(name) => write!(f, "@{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextualKw {
    Text,
    Style,
    Script,
    Inherit,
    Delete,
    Insert,
    After,
    Before,
    Replace,
    AtTop,
    AtBottom,
    From,
    As,
    Except,
    Use,
    Vir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StringFlavor {
    Quoted,
    Unquoted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TokenKind {
    Identifier,
    StringLiteral(StringFlavor),
    NumberLiteral,
    Structural(StructuralKw),
    Type(TypeKw),
    Contextual(ContextualKw),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Semicolon,
    Colon,
    Equal,
    Dot,
    Comma,
    Ampersand,
    Star,
    ClassSelector,
    IdSelector,
    PseudoClass,
    PseudoElement,
    GeneratorComment,
    /// Reference into the fragment list for a body the scanner cut out
    /// (script bodies, origin bodies, top-level CSS). Inclusive range.
    FragmentRef { first: usize, last: usize },
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier => "identifier".into(),
            TokenKind::StringLiteral(_) => "string".into(),
            TokenKind::NumberLiteral => "number".into(),
            TokenKind::Structural(_) => "structural keyword".into(),
            TokenKind::Type(t) => t.to_string(),
            TokenKind::Contextual(_) => "keyword".into(),
            TokenKind::LBrace => "`{`".into(),
            TokenKind::RBrace => "`}`".into(),
            TokenKind::LBracket => "`[`".into(),
            TokenKind::RBracket => "`]`".into(),
            TokenKind::LParen => "`(`".into(),
            TokenKind::RParen => "`)`".into(),
            TokenKind::Semicolon => "`;`".into(),
            TokenKind::Colon => "`:`".into(),
            TokenKind::Equal => "`=`".into(),
            TokenKind::Dot => "`.`".into(),
            TokenKind::Comma => "`,`".into(),
            TokenKind::Ampersand => "`&`".into(),
            TokenKind::Star => "`*`".into(),
            TokenKind::ClassSelector => "class selector".into(),
            TokenKind::IdSelector => "id selector".into(),
            TokenKind::PseudoClass => "pseudo-class".into(),
            TokenKind::PseudoElement => "pseudo-element".into(),
            TokenKind::GeneratorComment => "generator comment".into(),
            TokenKind::FragmentRef { .. } => "embedded fragment".into(),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text as it appeared in the source (unescaped for strings).
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            value: value.into(),
            span,
        }
    }

    pub fn eof(span: Span) -> Self {
        Token::new(TokenKind::Eof, "", span)
    }

    pub fn is(&self, kind: &TokenKind) -> bool {
        &self.kind == kind
    }

    pub fn is_contextual(&self, kw: ContextualKw) -> bool {
        self.kind == TokenKind::Contextual(kw)
    }
}

/// Keyword spelling tables derived from the active configuration.
///
/// The lexer consults this instead of matching literal strings, so a
/// `[Name]` rebinding changes recognition everywhere at once.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    structural: HashMap<String, StructuralKw>,
    contextual: HashMap<String, ContextualKw>,
    types: HashMap<String, TypeKw>,
    /// Multi-word contextuals: first word → candidate (second word, keyword) pairs.
    multi_word: HashMap<String, Vec<(String, ContextualKw)>>,
}

impl KeywordTable {
    pub fn from_config(config: &Configuration) -> Self {
        let mut structural = HashMap::new();
        let mut contextual = HashMap::new();
        let mut types = HashMap::new();
        let mut multi_word = HashMap::new();

        let s = |id: &str| config.keyword(id).to_string();

        structural.insert(s("KEYWORD_TEMPLATE"), StructuralKw::Template);
        structural.insert(s("KEYWORD_CUSTOM"), StructuralKw::Custom);
        structural.insert(s("KEYWORD_ORIGIN"), StructuralKw::Origin);
        structural.insert(s("KEYWORD_IMPORT"), StructuralKw::Import);
        structural.insert(s("KEYWORD_NAMESPACE"), StructuralKw::Namespace);
        structural.insert(s("KEYWORD_CONFIGURATION"), StructuralKw::Configuration);
        structural.insert(s("KEYWORD_INFO"), StructuralKw::Info);
        structural.insert(s("KEYWORD_EXPORT"), StructuralKw::Export);
        structural.insert(s("KEYWORD_NAME"), StructuralKw::Name);
        structural.insert(s("KEYWORD_ORIGINTYPE"), StructuralKw::OriginType);

        let singles = [
            ("KEYWORD_TEXT", ContextualKw::Text),
            ("KEYWORD_STYLE", ContextualKw::Style),
            ("KEYWORD_SCRIPT", ContextualKw::Script),
            ("KEYWORD_INHERIT", ContextualKw::Inherit),
            ("KEYWORD_DELETE", ContextualKw::Delete),
            ("KEYWORD_INSERT", ContextualKw::Insert),
            ("KEYWORD_AFTER", ContextualKw::After),
            ("KEYWORD_BEFORE", ContextualKw::Before),
            ("KEYWORD_REPLACE", ContextualKw::Replace),
            ("KEYWORD_FROM", ContextualKw::From),
            ("KEYWORD_AS", ContextualKw::As),
            ("KEYWORD_EXCEPT", ContextualKw::Except),
            ("KEYWORD_USE", ContextualKw::Use),
            ("KEYWORD_VIR", ContextualKw::Vir),
        ];
        for (id, kw) in singles {
            contextual.insert(s(id), kw);
        }

        for (id, kw) in [
            ("KEYWORD_ATTOP", ContextualKw::AtTop),
            ("KEYWORD_ATBOTTOM", ContextualKw::AtBottom),
        ] {
            let spelling = s(id);
            let mut words = spelling.split_whitespace();
            match (words.next(), words.next()) {
                (Some(first), Some(second)) => {
                    multi_word
                        .entry(first.to_string())
                        .or_insert_with(Vec::new)
                        .push((second.to_string(), kw));
                }
                (Some(only), None) => {
                    contextual.insert(only.to_string(), kw);
                }
                _ => {}
            }
        }

        types.insert(s("KEYWORD_AT_STYLE"), TypeKw::Style);
        types.insert(s("KEYWORD_AT_ELEMENT"), TypeKw::Element);
        types.insert(s("KEYWORD_AT_VAR"), TypeKw::Var);
        types.insert(s("KEYWORD_AT_HTML"), TypeKw::Html);
        types.insert(s("KEYWORD_AT_JAVASCRIPT"), TypeKw::JavaScript);
        types.insert(s("KEYWORD_AT_CHTL"), TypeKw::Chtl);
        types.insert(s("KEYWORD_AT_CJMOD"), TypeKw::CJmod);
        types.insert(s("KEYWORD_AT_CONFIG"), TypeKw::Config);

        KeywordTable {
            structural,
            contextual,
            types,
            multi_word,
        }
    }

    pub fn structural(&self, spelling: &str) -> Option<StructuralKw> {
        self.structural.get(spelling).copied()
    }

    pub fn contextual(&self, word: &str) -> Option<ContextualKw> {
        self.contextual.get(word).copied()
    }

    /// `@`-prefixed type keyword. Unknown names become `TypeKw::Custom`.
    pub fn type_keyword(&self, spelling: &str) -> TypeKw {
        self.types
            .get(spelling)
            .cloned()
            .unwrap_or_else(|| TypeKw::Custom(spelling.trim_start_matches('@').to_string()))
    }

    /// If `first second` spells a multi-word contextual, the collapsed keyword.
    pub fn multi_word(&self, first: &str, second: &str) -> Option<ContextualKw> {
        self.multi_word.get(first).and_then(|candidates| {
            candidates
                .iter()
                .find(|(w, _)| w == second)
                .map(|(_, kw)| *kw)
        })
    }

    /// Whether `first` can begin a multi-word contextual at all.
    pub fn starts_multi_word(&self, first: &str) -> bool {
        self.multi_word.contains_key(first)
    }
}

/// Immutable token stream with peek/advance discipline.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof_span = tokens.last().map(|t| t.span).unwrap_or_else(Span::dummy);
        TokenStream {
            tokens,
            pos: 0,
            eof: Token::eof(eof_span),
        }
    }

    pub fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    pub fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    pub fn advance(&mut self) -> &Token {
        let tok = self.tokens.get(self.pos).unwrap_or(&self.eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
            || matches!(self.tokens[self.pos].kind, TokenKind::Eof)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_recognizes_core_keywords() {
        let table = KeywordTable::from_config(&Configuration::default());
        assert_eq!(table.structural("[Template]"), Some(StructuralKw::Template));
        assert_eq!(table.contextual("delete"), Some(ContextualKw::Delete));
        assert_eq!(table.type_keyword("@Style"), TypeKw::Style);
        assert_eq!(
            table.type_keyword("@Vue"),
            TypeKw::Custom("Vue".to_string())
        );
        assert_eq!(table.multi_word("at", "top"), Some(ContextualKw::AtTop));
        assert_eq!(
            table.multi_word("at", "bottom"),
            Some(ContextualKw::AtBottom)
        );
        assert_eq!(table.multi_word("at", "side"), None);
    }

    #[test]
    fn rebound_spelling_wins() {
        let mut config = Configuration::default();
        let mut diags = crate::diagnostics::DiagnosticList::new();
        config.rebind_keyword("KEYWORD_TEMPLATE", "[Tpl]", Span::dummy(), &mut diags);
        let table = KeywordTable::from_config(&config);
        assert_eq!(table.structural("[Tpl]"), Some(StructuralKw::Template));
        assert_eq!(table.structural("[Template]"), None);
    }

    #[test]
    fn stream_peeks_past_the_end_safely() {
        let mut ts = TokenStream::new(vec![Token::new(
            TokenKind::Identifier,
            "div",
            Span::dummy(),
        )]);
        assert_eq!(ts.current().value, "div");
        assert_eq!(ts.peek(5).kind, TokenKind::Eof);
        ts.advance();
        assert!(ts.at_end());
        assert_eq!(ts.advance().kind, TokenKind::Eof);
    }
}
