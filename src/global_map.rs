//! GlobalMap: the compile-wide symbol table.
//!
//! A typed, namespaced registry keyed by `(kind, fully qualified name)`.
//! Bodies are stored here once; the emitter walks them by reference with a
//! fresh context per use site instead of deep-cloning at every expansion.
//!
//! Only the registration pass mutates the map. Everything after reads it as
//! immutable.

use crate::ast::{
    DeclBody, DeclKind, Document, Node, QualifiedRef, SpecOp, StyleItem, VarEntry,
};
use crate::diagnostics::{DiagnosticKind, DiagnosticList};
use crate::scanner::Fragment;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SymbolKind {
    TemplateStyle,
    TemplateElement,
    TemplateVar,
    CustomStyle,
    CustomElement,
    CustomVar,
    OriginHtml,
    OriginStyle,
    OriginJavaScript,
    OriginCustom(String),
    Namespace,
    Configuration,
}

impl SymbolKind {
    pub fn describe(&self) -> String {
        match self {
            SymbolKind::TemplateStyle => "template style group".into(),
            SymbolKind::TemplateElement => "template element".into(),
            SymbolKind::TemplateVar => "template variable group".into(),
            SymbolKind::CustomStyle => "custom style group".into(),
            SymbolKind::CustomElement => "custom element".into(),
            SymbolKind::CustomVar => "custom variable group".into(),
            SymbolKind::OriginHtml => "origin html".into(),
            SymbolKind::OriginStyle => "origin style".into(),
            SymbolKind::OriginJavaScript => "origin javascript".into(),
            SymbolKind::OriginCustom(tag) => format!("origin @{}", tag),
            SymbolKind::Namespace => "namespace".into(),
            SymbolKind::Configuration => "configuration".into(),
        }
    }

    pub fn for_decl(kind: DeclKind, custom: bool) -> SymbolKind {
        match (kind, custom) {
            (DeclKind::Style, false) => SymbolKind::TemplateStyle,
            (DeclKind::Element, false) => SymbolKind::TemplateElement,
            (DeclKind::Var, false) => SymbolKind::TemplateVar,
            (DeclKind::Style, true) => SymbolKind::CustomStyle,
            (DeclKind::Element, true) => SymbolKind::CustomElement,
            (DeclKind::Var, true) => SymbolKind::CustomVar,
        }
    }

    pub fn for_origin(tag: &str) -> SymbolKind {
        match tag {
            "Html" => SymbolKind::OriginHtml,
            "Style" => SymbolKind::OriginStyle,
            "JavaScript" => SymbolKind::OriginJavaScript,
            other => SymbolKind::OriginCustom(other.to_string()),
        }
    }

    /// Template/Custom pairs of the same sub-kind may overlay each other:
    /// registering one when the other exists is not a conflict.
    pub fn overlay_partner(&self) -> Option<SymbolKind> {
        match self {
            SymbolKind::TemplateStyle => Some(SymbolKind::CustomStyle),
            SymbolKind::CustomStyle => Some(SymbolKind::TemplateStyle),
            SymbolKind::TemplateElement => Some(SymbolKind::CustomElement),
            SymbolKind::CustomElement => Some(SymbolKind::TemplateElement),
            SymbolKind::TemplateVar => Some(SymbolKind::CustomVar),
            SymbolKind::CustomVar => Some(SymbolKind::TemplateVar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SymbolBody {
    Style(Vec<StyleItem>),
    Element(Vec<Node>),
    Var(Vec<VarEntry>),
    /// Verbatim origin text.
    Origin(String),
    /// Named configuration entries.
    Config(Vec<(String, String)>),
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub kind: SymbolKind,
    pub simple_name: String,
    pub namespace_path: Vec<String>,
    pub fully_qualified_name: String,
    pub span: Span,
    pub body: SymbolBody,
    pub exported: bool,
    pub inherits: Vec<QualifiedRef>,
    /// Declaration-body specialization ops (customs only).
    pub ops: Vec<SpecOp>,
    pub properties: HashMap<String, String>,
}

impl Symbol {
    pub fn new(
        kind: SymbolKind,
        simple_name: impl Into<String>,
        namespace_path: Vec<String>,
        span: Span,
        body: SymbolBody,
    ) -> Self {
        let simple_name = simple_name.into();
        let fully_qualified_name = qualify(&namespace_path, &simple_name);
        Symbol {
            kind,
            simple_name,
            namespace_path,
            fully_qualified_name,
            span,
            body,
            exported: false,
            inherits: Vec::new(),
            ops: Vec::new(),
            properties: HashMap::new(),
        }
    }
}

pub fn qualify(namespace_path: &[String], name: &str) -> String {
    if namespace_path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace_path.join("."), name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceInfo {
    pub path: Vec<String>,
    /// Member simple names, in registration order.
    pub members: Vec<String>,
    /// Explicit `[Export]` names; empty means "export everything".
    pub exports: Vec<String>,
}

#[derive(Debug, Default)]
pub struct GlobalMap {
    /// Deterministic iteration: BTreeMap keyed by `fqn` then kind tag.
    symbols: BTreeMap<(String, String), Symbol>,
    namespaces: BTreeMap<String, NamespaceInfo>,
    /// `[Info]` entries from module sources, last write wins.
    pub module_info: HashMap<String, String>,
}

fn kind_tag(kind: &SymbolKind) -> String {
    match kind {
        SymbolKind::OriginCustom(tag) => format!("origin:{}", tag),
        other => other.describe(),
    }
}

impl GlobalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol. Duplicate `(kind, fqn)` is a conflict; a
    /// Template/Custom overlay of the same sub-kind is not.
    pub fn register(&mut self, symbol: Symbol) -> Result<(), Box<Symbol>> {
        let key = (
            symbol.fully_qualified_name.clone(),
            kind_tag(&symbol.kind),
        );
        if let Some(existing) = self.symbols.get(&key) {
            return Err(Box::new(existing.clone()));
        }
        let ns_key = symbol.namespace_path.join(".");
        let info = self
            .namespaces
            .entry(ns_key)
            .or_insert_with(|| NamespaceInfo {
                path: symbol.namespace_path.clone(),
                ..Default::default()
            });
        info.members.push(symbol.simple_name.clone());
        log::debug!(
            "registered {} `{}`",
            symbol.kind.describe(),
            symbol.fully_qualified_name
        );
        self.symbols.insert(key, symbol);
        Ok(())
    }

    /// Resolution order for unqualified names:
    /// 1. fully qualified (contains dots) — direct;
    /// 2. `current_namespace.name`;
    /// 3. each enclosing namespace up to root;
    /// 4. root.
    /// `kinds` is tried in order at each step, so callers set priority
    /// (customs before templates at use sites).
    pub fn lookup(
        &self,
        name: &str,
        kinds: &[SymbolKind],
        current_namespace: &[String],
    ) -> Option<&Symbol> {
        if name.contains('.') {
            return self.lookup_exact(name, kinds);
        }
        let mut scope = current_namespace.to_vec();
        loop {
            let candidate = qualify(&scope, name);
            if let Some(sym) = self.lookup_exact(&candidate, kinds) {
                return Some(sym);
            }
            if scope.is_empty() {
                return None;
            }
            scope.pop();
        }
    }

    /// `from` clause resolution: only the stated namespace is searched.
    pub fn lookup_from(
        &self,
        name: &str,
        namespace_path: &[String],
        kinds: &[SymbolKind],
    ) -> Option<&Symbol> {
        let candidate = qualify(namespace_path, name);
        self.lookup_exact(&candidate, kinds)
    }

    fn lookup_exact(&self, fqn: &str, kinds: &[SymbolKind]) -> Option<&Symbol> {
        for kind in kinds {
            let key = (fqn.to_string(), kind_tag(kind));
            if let Some(sym) = self.symbols.get(&key) {
                return Some(sym);
            }
        }
        None
    }

    pub fn namespace(&self, path: &str) -> Option<&NamespaceInfo> {
        self.namespaces.get(path)
    }

    pub fn symbols_in_namespace<'a>(
        &'a self,
        path: &'a str,
    ) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.symbols.values().filter(move |s| {
            s.namespace_path.join(".") == path
        })
    }

    pub fn all_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Merge the member sets of two namespaces under `target`. Collisions
    /// (same simple name, same kind tag, both sides) are diagnostics;
    /// the diagnostic order is deterministic (sorted by name).
    pub fn merge_namespaces(
        &mut self,
        target: &str,
        source: &str,
        diags: &mut DiagnosticList,
    ) {
        let source_syms: Vec<Symbol> = self
            .symbols_in_namespace(source)
            .cloned()
            .collect();
        let target_path: Vec<String> = if target.is_empty() {
            Vec::new()
        } else {
            target.split('.').map(|s| s.to_string()).collect()
        };
        let mut moved: Vec<Symbol> = source_syms
            .into_iter()
            .map(|mut s| {
                s.namespace_path = target_path.clone();
                s.fully_qualified_name = qualify(&target_path, &s.simple_name);
                s
            })
            .collect();
        moved.sort_by(|a, b| a.simple_name.cmp(&b.simple_name));
        for sym in moved {
            let span = sym.span;
            let name = sym.fully_qualified_name.clone();
            if self.register(sym).is_err() {
                diags.error(DiagnosticKind::NamespaceCollision(name), span);
            }
        }
    }

    /// Apply an `[Export]` list to a namespace; called by the registration
    /// pass after the namespace body is registered.
    pub fn set_exports(&mut self, namespace: &str, names: Vec<String>) {
        for sym in self.symbols.values_mut() {
            if sym.namespace_path.join(".") == namespace
                && names.contains(&sym.simple_name)
            {
                sym.exported = true;
            }
        }
        let info = self
            .namespaces
            .entry(namespace.to_string())
            .or_default();
        info.exports.extend(names);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRATION PASS
// ═══════════════════════════════════════════════════════════════════════════════

/// Walk a parsed document and register every declaration, scoped by
/// namespace. `root_namespace` prefixes everything (used when a module is
/// linked under its declared name).
pub fn register_document(
    doc: &Document,
    fragments: &[Fragment],
    map: &mut GlobalMap,
    root_namespace: &[String],
    diags: &mut DiagnosticList,
) {
    let mut ns_stack: Vec<String> = root_namespace.to_vec();
    register_nodes(&doc.children, fragments, map, &mut ns_stack, diags);
}

fn register_nodes(
    nodes: &[Node],
    fragments: &[Fragment],
    map: &mut GlobalMap,
    ns_stack: &mut Vec<String>,
    diags: &mut DiagnosticList,
) {
    for node in nodes {
        match node {
            Node::TemplateDecl(decl) => {
                let kind = SymbolKind::for_decl(decl.kind, false);
                let body = body_for(&decl.body);
                let mut sym = Symbol::new(kind, &decl.name, ns_stack.clone(), decl.span, body);
                sym.inherits = decl.inherits.clone();
                register_or_diagnose(map, sym, diags);
            }
            Node::CustomDecl(decl) => {
                let kind = SymbolKind::for_decl(decl.kind, true);
                let body = body_for(&decl.body);
                let mut sym = Symbol::new(kind, &decl.name, ns_stack.clone(), decl.span, body);
                sym.inherits = decl.inherits.clone();
                sym.ops = decl.ops.clone();
                register_or_diagnose(map, sym, diags);
            }
            Node::OriginDecl(decl) => {
                if let Some(name) = &decl.name {
                    let text = fragments
                        .get(decl.fragment)
                        .map(|f| f.text.clone())
                        .unwrap_or_default();
                    let sym = Symbol::new(
                        SymbolKind::for_origin(&decl.tag),
                        name,
                        ns_stack.clone(),
                        decl.span,
                        SymbolBody::Origin(text),
                    );
                    register_or_diagnose(map, sym, diags);
                }
            }
            Node::NamespaceDecl(decl) => {
                let depth = decl.path.len();
                ns_stack.extend(decl.path.iter().cloned());
                // Merging by path: a second block with the same path simply
                // registers more members under the same prefix.
                register_nodes(&decl.members, fragments, map, ns_stack, diags);
                ns_stack.truncate(ns_stack.len() - depth);
            }
            Node::ConfigurationDecl(decl) => {
                if let Some(name) = &decl.name {
                    let entries = decl
                        .entries
                        .iter()
                        .map(|e| (e.key.clone(), e.value.clone()))
                        .collect();
                    let sym = Symbol::new(
                        SymbolKind::Configuration,
                        name,
                        ns_stack.clone(),
                        decl.span,
                        SymbolBody::Config(entries),
                    );
                    register_or_diagnose(map, sym, diags);
                }
            }
            Node::ExportDecl(decl) => {
                let ns = ns_stack.join(".");
                let names: Vec<String> = decl
                    .items
                    .iter()
                    .flat_map(|item| item.names.iter().cloned())
                    .collect();
                map.set_exports(&ns, names);
            }
            Node::InfoDecl(decl) => {
                for e in &decl.entries {
                    map.module_info.insert(e.key.clone(), e.value.clone());
                }
            }
            Node::Element(el) => {
                // Declarations can appear inside elements in module sources.
                register_nodes(&el.children, fragments, map, ns_stack, diags);
            }
            _ => {}
        }
    }
}

fn register_or_diagnose(map: &mut GlobalMap, sym: Symbol, diags: &mut DiagnosticList) {
    let span = sym.span;
    let name = sym.fully_qualified_name.clone();
    if map.register(sym).is_err() {
        diags.error(DiagnosticKind::DuplicateDeclaration(name), span);
    }
}

fn body_for(body: &DeclBody) -> SymbolBody {
    match body {
        DeclBody::Style(items) => SymbolBody::Style(items.clone()),
        DeclBody::Element(nodes) => SymbolBody::Element(nodes.clone()),
        DeclBody::Var(entries) => SymbolBody::Var(entries.clone()),
    }
}

/// Lookup kind sets used at use sites: customs take priority over templates
/// of the same sub-kind.
pub fn style_use_kinds() -> [SymbolKind; 2] {
    [SymbolKind::CustomStyle, SymbolKind::TemplateStyle]
}

pub fn element_use_kinds() -> [SymbolKind; 2] {
    [SymbolKind::CustomElement, SymbolKind::TemplateElement]
}

pub fn var_use_kinds() -> [SymbolKind; 2] {
    [SymbolKind::CustomVar, SymbolKind::TemplateVar]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(kind: SymbolKind, name: &str, ns: &[&str]) -> Symbol {
        Symbol::new(
            kind,
            name,
            ns.iter().map(|s| s.to_string()).collect(),
            Span::dummy(),
            SymbolBody::None,
        )
    }

    #[test]
    fn register_and_lookup_by_kind() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::TemplateStyle, "Theme", &[])).unwrap();
        assert!(map
            .lookup("Theme", &[SymbolKind::TemplateStyle], &[])
            .is_some());
        assert!(map
            .lookup("Theme", &[SymbolKind::TemplateElement], &[])
            .is_none());
    }

    #[test]
    fn duplicate_same_kind_conflicts() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::CustomElement, "Box", &[])).unwrap();
        assert!(map
            .register(sym(SymbolKind::CustomElement, "Box", &[]))
            .is_err());
    }

    #[test]
    fn template_custom_overlay_is_allowed() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::TemplateStyle, "Theme", &[])).unwrap();
        assert!(map
            .register(sym(SymbolKind::CustomStyle, "Theme", &[]))
            .is_ok());
        // Use-site priority: custom first.
        let found = map
            .lookup("Theme", &style_use_kinds(), &[])
            .unwrap();
        assert_eq!(found.kind, SymbolKind::CustomStyle);
    }

    #[test]
    fn resolution_walks_enclosing_namespaces() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::CustomElement, "Button", &["ui"])).unwrap();
        map.register(sym(SymbolKind::CustomElement, "Root", &[])).unwrap();

        let current = vec!["ui".to_string(), "widgets".to_string()];
        // `Button` not in ui.widgets; found one level up in ui.
        let found = map.lookup("Button", &element_use_kinds(), &current).unwrap();
        assert_eq!(found.fully_qualified_name, "ui.Button");
        // Root-level fallback.
        let found = map.lookup("Root", &element_use_kinds(), &current).unwrap();
        assert_eq!(found.fully_qualified_name, "Root");
    }

    #[test]
    fn lookup_from_ignores_current_namespace() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::CustomElement, "Button", &["ui"])).unwrap();
        map.register(sym(SymbolKind::CustomElement, "Button", &["other"])).unwrap();

        let found = map
            .lookup_from(
                "Button",
                &["other".to_string()],
                &element_use_kinds(),
            )
            .unwrap();
        assert_eq!(found.fully_qualified_name, "other.Button");
    }

    #[test]
    fn dotted_name_is_fully_qualified() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::TemplateVar, "Palette", &["theme"])).unwrap();
        let found = map
            .lookup("theme.Palette", &var_use_kinds(), &["elsewhere".to_string()])
            .unwrap();
        assert_eq!(found.simple_name, "Palette");
    }

    #[test]
    fn merge_reports_collisions_deterministically() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::CustomElement, "A", &["left"])).unwrap();
        map.register(sym(SymbolKind::CustomElement, "B", &["left"])).unwrap();
        map.register(sym(SymbolKind::CustomElement, "A", &["right"])).unwrap();
        map.register(sym(SymbolKind::CustomElement, "C", &["right"])).unwrap();

        let mut diags = DiagnosticList::new();
        map.merge_namespaces("left", "right", &mut diags);
        // `A` collides; `C` moves cleanly.
        assert_eq!(diags.len(), 1);
        assert!(map
            .lookup("C", &element_use_kinds(), &["left".to_string()])
            .is_some());
    }

    #[test]
    fn exports_mark_symbols() {
        let mut map = GlobalMap::new();
        map.register(sym(SymbolKind::CustomElement, "Pub", &["m"])).unwrap();
        map.register(sym(SymbolKind::CustomElement, "Priv", &["m"])).unwrap();
        map.set_exports("m", vec!["Pub".to_string()]);
        let pub_sym = map
            .lookup("Pub", &element_use_kinds(), &["m".to_string()])
            .unwrap();
        assert!(pub_sym.exported);
        let priv_sym = map
            .lookup("Priv", &element_use_kinds(), &["m".to_string()])
            .unwrap();
        assert!(!priv_sym.exported);
    }
}
