//! Diagnostic model for the whole pipeline.
//!
//! Each stage collects diagnostics into a `DiagnosticList` instead of
//! returning early: lexing, parsing and emission always run to completion on
//! a best-effort basis. Nothing crosses a stage boundary by panic or error
//! return except genuine I/O failures. A compile with at least one
//! error-severity entry produces no artifacts.

use crate::span::{SourceMap, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Coarse category, one per pipeline stage family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Lexical,
    Syntax,
    Semantic,
    Import,
    Module,
    Config,
    Plugin,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "diagnosticKind", rename_all = "kebab-case")]
pub enum DiagnosticKind {
    // ── lexical ────────────────────────────────────────────────────────────
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(String),
    #[error("malformed number `{0}`")]
    BadNumber(String),
    #[error("unknown marker `{0}`")]
    UnknownMarker(String),

    // ── syntax ─────────────────────────────────────────────────────────────
    #[error("unexpected token `{found}`, expected {expected}")]
    UnexpectedToken { found: String, expected: String },
    #[error("missing `{0}`")]
    MissingToken(String),
    #[error("malformed import declaration: {0}")]
    MalformedImport(String),

    // ── semantic ───────────────────────────────────────────────────────────
    #[error("unresolved {kind} `{name}`")]
    UnresolvedSymbol { kind: String, name: String },
    #[error("`{name}` is a {found}, expected a {expected}")]
    KindMismatch {
        name: String,
        found: String,
        expected: String,
    },
    #[error("`{op}` is not allowed in {context}")]
    IllegalSpecialization { op: String, context: String },
    #[error("unsupported specialization: {0}")]
    UnsupportedSpecialization(String),
    #[error("specialization target `{0}` does not exist")]
    MissingSpecTarget(String),
    #[error("duplicate declaration of `{0}`")]
    DuplicateDeclaration(String),
    #[error("custom style `{group}` requires a value for `{property}`")]
    MissingStyleValue { group: String, property: String },
    #[error("variable group `{group}` has no key `{key}`")]
    UnknownVarKey { group: String, key: String },
    #[error("namespace collision: `{0}` is defined in both merged namespaces")]
    NamespaceCollision(String),
    #[error("`{target}` is excluded by an `except` clause on this element")]
    ExceptViolation { target: String },

    // ── import ─────────────────────────────────────────────────────────────
    #[error("cannot find `{0}` in the module search paths")]
    ImportNotFound(String),
    #[error("import cycle detected: {0}")]
    ImportCycle(String),
    #[error("`{0}` is imported more than once")]
    DuplicateImport(String),
    #[error("wildcard imports are disabled by configuration")]
    WildcardDisabled,

    // ── module archive ─────────────────────────────────────────────────────
    #[error("bad module archive: {0}")]
    BadArchive(String),
    #[error("checksum mismatch for archived file `{0}`")]
    ChecksumMismatch(String),
    #[error("unsupported module archive version {0}")]
    UnsupportedVersion(u32),

    // ── configuration ──────────────────────────────────────────────────────
    #[error("unknown configuration option `{0}`")]
    UnknownOption(String),
    #[error("cannot rename keyword `{0}`")]
    IllegalKeywordRename(String),

    // ── plugin ─────────────────────────────────────────────────────────────
    #[error("plugin error: {0}")]
    Plugin(String),
}

impl DiagnosticKind {
    pub fn category(&self) -> Category {
        use DiagnosticKind::*;
        match self {
            UnterminatedString | InvalidEscape(_) | BadNumber(_) | UnknownMarker(_) => {
                Category::Lexical
            }
            UnexpectedToken { .. } | MissingToken(_) | MalformedImport(_) => Category::Syntax,
            UnresolvedSymbol { .. }
            | KindMismatch { .. }
            | IllegalSpecialization { .. }
            | UnsupportedSpecialization(_)
            | MissingSpecTarget(_)
            | DuplicateDeclaration(_)
            | MissingStyleValue { .. }
            | UnknownVarKey { .. }
            | NamespaceCollision(_)
            | ExceptViolation { .. } => Category::Semantic,
            ImportNotFound(_) | ImportCycle(_) | DuplicateImport(_) | WildcardDisabled => {
                Category::Import
            }
            BadArchive(_) | ChecksumMismatch(_) | UnsupportedVersion(_) => Category::Module,
            UnknownOption(_) | IllegalKeywordRename(_) => Category::Config,
            Plugin(_) => Category::Plugin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub span: Span,
    /// Extra lines appended after the main message.
    pub notes: Vec<String>,
    /// State-machine trace captured when DEBUG_MODE is on.
    pub state_trace: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            kind,
            span,
            notes: Vec::new(),
            state_trace: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind,
            span,
            notes: Vec::new(),
            state_trace: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// `level: file:line:col: message` plus a source excerpt with a caret.
    pub fn render(&self, sources: &SourceMap, debug_mode: bool) -> String {
        let mut out = format!(
            "{}: {}:{}:{}: {}",
            self.severity,
            sources.name(self.span.file),
            self.span.start_line,
            self.span.start_col,
            self.kind
        );
        if let Some(line) = sources.line_of(self.span) {
            out.push_str(&format!("\n  | {}\n  | ", line));
            for _ in 1..self.span.start_col {
                out.push(' ');
            }
            out.push('^');
        }
        for note in &self.notes {
            out.push_str(&format!("\n  note: {}", note));
        }
        if debug_mode {
            if let Some(trace) = &self.state_trace {
                out.push_str(&format!("\n  state stack: {}", trace));
            }
        }
        out
    }
}

/// Per-stage diagnostic sink. Stages append; the driver renders.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DiagnosticList {
    items: Vec<Diagnostic>,
}

impl DiagnosticList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        log::debug!("diagnostic: {:?}", diag.kind);
        self.items.push(diag);
    }

    pub fn error(&mut self, kind: DiagnosticKind, span: Span) {
        self.push(Diagnostic::error(kind, span));
    }

    pub fn warning(&mut self, kind: DiagnosticKind, span: Span) {
        self.push(Diagnostic::warning(kind, span));
    }

    pub fn extend(&mut self, other: DiagnosticList) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity >= Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn render_all(&self, sources: &SourceMap, debug_mode: bool) -> String {
        self.items
            .iter()
            .map(|d| d.render(sources, debug_mode))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceMap;

    #[test]
    fn categories_follow_the_taxonomy() {
        assert_eq!(
            DiagnosticKind::UnterminatedString.category(),
            Category::Lexical
        );
        assert_eq!(
            DiagnosticKind::ImportCycle("a -> b -> a".into()).category(),
            Category::Import
        );
        assert_eq!(
            DiagnosticKind::ChecksumMismatch("src/a.chtl".into()).category(),
            Category::Module
        );
    }

    #[test]
    fn render_points_at_the_column() {
        let mut sm = SourceMap::new();
        let id = sm.add_file("t.chtl", "div { oops }");
        let span = Span::new(id, 6, 4, 1, 7, 1, 11);
        let d = Diagnostic::error(
            DiagnosticKind::UnexpectedToken {
                found: "oops".into(),
                expected: "attribute or child".into(),
            },
            span,
        );
        let rendered = d.render(&sm, false);
        assert!(rendered.starts_with("error: t.chtl:1:7:"));
        assert!(rendered.contains("| div { oops }"));
        let caret_line = rendered.lines().last().unwrap();
        assert_eq!(caret_line.find('^'), Some(4 + 6));
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut list = DiagnosticList::new();
        list.warning(DiagnosticKind::DuplicateImport("Box".into()), Span::dummy());
        assert!(!list.has_errors());
        list.error(DiagnosticKind::UnterminatedString, Span::dummy());
        assert!(list.has_errors());
    }
}
