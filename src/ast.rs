//! AST types for both dialects.
//!
//! The CHTL tree is a plain sum type; nodes that reference reusable
//! definitions (uses, inherits, variable references) carry qualified names
//! resolved against the `GlobalMap` at emit time, never owning pointers, so
//! the tree stays acyclic. Script and origin bodies are fragment-index
//! ranges into the scanner output rather than inline text.

use crate::span::Span;
use crate::token::TypeKw;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// CHTL AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Element(Element),
    Text(TextNode),
    /// `--` comment, preserved into the HTML output.
    GeneratorComment(GeneratorComment),
    StyleBlock(StyleBlock),
    ScriptBlock(ScriptBlock),
    TemplateDecl(TemplateDecl),
    CustomDecl(CustomDecl),
    OriginDecl(OriginDecl),
    /// `[Origin] @Html name;` — emits a previously declared origin.
    OriginUse(OriginUse),
    ImportDecl(ImportDecl),
    NamespaceDecl(NamespaceDecl),
    ConfigurationDecl(ConfigurationDecl),
    /// `@Element Name;` / `@Style Name;` / `@Var Name;` at a child position.
    Use(Use),
    /// `use html5;`
    UseHtml5(UseHtml5),
    /// `use @Config Name;`
    UseConfig(UseConfig),
    ExceptClause(ExceptClause),
    /// `[Info] { … }` — module metadata, meaningful inside CMOD sources.
    InfoDecl(InfoDecl),
    /// `[Export] { … }` — explicit export list for wildcard imports.
    ExportDecl(ExportDecl),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(n) => n.span,
            Node::Text(n) => n.span,
            Node::GeneratorComment(n) => n.span,
            Node::StyleBlock(n) => n.span,
            Node::ScriptBlock(n) => n.span,
            Node::TemplateDecl(n) => n.span,
            Node::CustomDecl(n) => n.span,
            Node::OriginDecl(n) => n.span,
            Node::OriginUse(n) => n.span,
            Node::ImportDecl(n) => n.span,
            Node::NamespaceDecl(n) => n.span,
            Node::ConfigurationDecl(n) => n.span,
            Node::Use(n) => n.span,
            Node::UseHtml5(n) => n.span,
            Node::UseConfig(n) => n.span,
            Node::ExceptClause(n) => n.span,
            Node::InfoDecl(n) => n.span,
            Node::ExportDecl(n) => n.span,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    /// `text { "a" "b" }` holds each literal in order.
    pub values: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorComment {
    pub text: String,
    pub span: Span,
}

// ── style ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleBlock {
    /// True for `style { … }` inside an element.
    pub local: bool,
    pub items: Vec<StyleItem>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StyleItem {
    Property(StyleProperty),
    /// `@Style Name;` or `@Style Name { specialization }`
    Use(StyleGroupUse),
    /// `inherit @Style Name;`
    Inherit(QualifiedRef),
    Rule(StyleRule),
    /// Verbatim CSS body cut out by the scanner (top-level `style { … }`).
    RawFragment(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleProperty {
    pub name: String,
    pub value: StyleValue,
    pub span: Span,
}

/// A property value is a sequence of literal runs and variable-group
/// references, e.g. `1px solid Palette(line)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleValue {
    pub pieces: Vec<ValuePiece>,
}

impl StyleValue {
    pub fn literal(text: impl Into<String>) -> Self {
        StyleValue {
            pieces: vec![ValuePiece::Text(text.into())],
        }
    }

    /// Key-only entry in a `[Custom] @Style` (no value supplied yet).
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ValuePiece {
    Text(String),
    /// `Group(key)` or `Group(key = override)`
    VarRef {
        group: String,
        key: String,
        #[serde(rename = "override")]
        override_value: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRule {
    pub selector: RuleSelector,
    pub items: Vec<StyleItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleSelector {
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    /// `&`, `&:hover`, `&::before`
    SelfRef(String),
    /// Anything else, verbatim.
    Raw(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleGroupUse {
    pub target: QualifiedRef,
    pub specialization: Option<Specialization>,
    pub span: Span,
}

// ── script ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptBlock {
    pub local: bool,
    /// Inclusive range of scanner fragments forming the body.
    pub first_fragment: usize,
    pub last_fragment: usize,
    pub span: Span,
}

// ── declarations ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclKind {
    Style,
    Element,
    Var,
}

impl DeclKind {
    pub fn describe(&self) -> &'static str {
        match self {
            DeclKind::Style => "style group",
            DeclKind::Element => "element",
            DeclKind::Var => "variable group",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DeclBody {
    Style(Vec<StyleItem>),
    Element(Vec<Node>),
    Var(Vec<VarEntry>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarEntry {
    pub key: String,
    pub value: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDecl {
    pub kind: DeclKind,
    pub name: String,
    pub body: DeclBody,
    /// `inherit @Style X;` clauses found in the body, in order.
    pub inherits: Vec<QualifiedRef>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDecl {
    pub kind: DeclKind,
    pub name: String,
    pub body: DeclBody,
    /// `inherit @Style X;` clauses found in the body, in order.
    pub inherits: Vec<QualifiedRef>,
    /// Specialization operations written directly in the declaration body;
    /// they apply to the flattened inherited content.
    pub ops: Vec<SpecOp>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginDecl {
    /// Origin tag without the `@` (`Html`, `Style`, `JavaScript`, or custom).
    pub tag: String,
    pub name: Option<String>,
    /// Index of the verbatim fragment holding the body.
    pub fragment: usize,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginUse {
    pub tag: String,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDecl {
    pub kind: TypeKw,
    /// Absent for wildcard or whole-file imports.
    pub name: Option<String>,
    pub wildcard: bool,
    pub from_path: String,
    pub alias: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceDecl {
    /// Dotted path split into segments.
    pub path: Vec<String>,
    pub members: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDecl {
    /// `Some` for `[Configuration] @Config Name { … }`.
    pub name: Option<String>,
    pub entries: Vec<ConfigEntry>,
    pub name_group: Vec<ConfigEntry>,
    pub origin_types: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDecl {
    pub entries: Vec<ConfigEntry>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportItem {
    pub kind: TypeKw,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDecl {
    pub items: Vec<ExportItem>,
    pub span: Span,
}

// ── uses and specialization ────────────────────────────────────────────────

/// A possibly-qualified reference: `Button`, `ui.Button`, `Button from ui`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedRef {
    pub name: String,
    /// Explicit `from` namespace, overriding ambient resolution.
    pub from_namespace: Option<Vec<String>>,
    pub span: Span,
}

impl QualifiedRef {
    pub fn plain(name: impl Into<String>, span: Span) -> Self {
        QualifiedRef {
            name: name.into(),
            from_namespace: None,
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UseKind {
    Style,
    Element,
    Var,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Use {
    pub kind: UseKind,
    pub target: QualifiedRef,
    pub specialization: Option<Specialization>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseHtml5 {
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseConfig {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptClause {
    pub targets: Vec<SpecTarget>,
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialization {
    pub ops: Vec<SpecOp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SpecOp {
    Delete {
        targets: Vec<SpecTarget>,
        span: Span,
    },
    Insert {
        position: InsertPos,
        payload: Vec<Node>,
        span: Span,
    },
    Replace {
        target: SpecTarget,
        payload: Vec<Node>,
        span: Span,
    },
    Inherit {
        kind: UseKind,
        target: QualifiedRef,
        span: Span,
    },
    /// Property override inside a style specialization.
    OverrideProp(StyleProperty),
    /// Nested refinement of an expanded element: `div[0] { … }`.
    Refine {
        target: SpecTarget,
        attrs: Vec<Attribute>,
        body: Vec<Node>,
        span: Span,
    },
}

impl SpecOp {
    pub fn describe(&self) -> &'static str {
        match self {
            SpecOp::Delete { .. } => "delete",
            SpecOp::Insert { .. } => "insert",
            SpecOp::Replace { .. } => "replace",
            SpecOp::Inherit { .. } => "inherit",
            SpecOp::OverrideProp(_) => "override",
            SpecOp::Refine { .. } => "refine",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SpecTarget {
    /// `div` or `div[2]`
    Tag { name: String, index: Option<usize> },
    /// `.cls` / `#id`
    Selector(String),
    /// `@Style Name`
    StyleRef(String),
    /// `@Element Name`
    ElementRef(String),
    /// Bare property name (style deletes).
    Property(String),
}

impl SpecTarget {
    pub fn describe(&self) -> String {
        match self {
            SpecTarget::Tag { name, index: None } => name.clone(),
            SpecTarget::Tag {
                name,
                index: Some(i),
            } => format!("{}[{}]", name, i),
            SpecTarget::Selector(s) => s.clone(),
            SpecTarget::StyleRef(n) => format!("@Style {}", n),
            SpecTarget::ElementRef(n) => format!("@Element {}", n),
            SpecTarget::Property(p) => p.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InsertPos {
    Before(SpecTarget),
    After(SpecTarget),
    Replace(SpecTarget),
    AtTop,
    AtBottom,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHTL-JS AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub children: Vec<JsNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JsNode {
    /// Plain JavaScript, emitted verbatim.
    OpaqueJs(OpaqueJs),
    Selector(EnhancedSelector),
    Chain(ArrowChain),
    Animate(AnimateBlock),
    VirDecl(VirDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueJs {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorKind {
    Tag,
    Class,
    Id,
    Complex,
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSelector {
    pub kind: SelectorKind,
    /// Inner text of `{{…}}`, trimmed.
    pub raw: String,
    /// Selector with any `[n]` suffix removed.
    pub parsed: String,
    pub index: Option<usize>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChainHead {
    Selector(EnhancedSelector),
    /// Virtual-object or plain identifier head.
    Ident { name: String, span: Span },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChainCall {
    Listen(ListenBlock),
    Delegate(DelegateBlock),
    /// `->name(args)` — args kept verbatim.
    Method {
        name: String,
        args: String,
        span: Span,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowChain {
    pub head: ChainHead,
    pub calls: Vec<ChainCall>,
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenBlock {
    /// Event name → handler source, in declaration order.
    pub handlers: Vec<(String, String)>,
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateBlock {
    /// `target:` entries; each is a selector string.
    pub targets: Vec<String>,
    pub handlers: Vec<(String, String)>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimateBlock {
    /// Argument object source with nested `{{…}}` already lowered.
    pub object: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirDecl {
    pub name: String,
    pub body: ListenBlock,
    pub span: Span,
}
