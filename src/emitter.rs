//! CHTL emitter: HTML and CSS generation.
//!
//! One walk over the AST writes the HTML and CSS streams in parallel and
//! queues script work for the CHTL-JS pipeline. Template and custom bodies
//! are never deep-cloned ahead of time: expansion materializes a shallow copy
//! per use site, applies the specialization, and walks the result.
//!
//! Expansion order at a use site: flatten inheritance (pre-order), apply the
//! declaration's own ops, then the call-site specialization — deletes first,
//! inserts/replaces in source order, property overrides and refinements last.

use crate::ast::*;
use crate::config::Configuration;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticList};
use crate::global_map::{
    element_use_kinds, style_use_kinds, var_use_kinds, GlobalMap, Symbol, SymbolBody,
};
use crate::scanner::Fragment;
use crate::span::Span;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Void elements rendered as `<tag …/>`.
    static ref SELF_CLOSING: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for tag in [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
            "source", "track", "wbr",
        ] {
            s.insert(tag);
        }
        s
    };
}

/// Script-side work queued during the walk, processed by the dispatcher in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum JsWork {
    /// Inclusive fragment range of a script body.
    Fragments(usize, usize),
    /// Verbatim JavaScript (origin blocks).
    Verbatim(String),
}

pub struct Emitter<'a> {
    map: &'a GlobalMap,
    config: &'a Configuration,
    fragments: &'a [Fragment],
    diags: &'a mut DiagnosticList,
    pub html: String,
    pub css: String,
    pub js_work: Vec<JsWork>,
    pub saw_doctype: bool,
    /// Auto class counters, per tag, stable by source order.
    class_counters: HashMap<String, usize>,
    current_namespace: Vec<String>,
    /// Guards against inheritance cycles during expansion.
    expanding: Vec<String>,
}

/// Fully resolved style content for one element context.
#[derive(Debug, Default)]
struct ResolvedStyle {
    /// Inline properties, first-position/last-value merged.
    props: Vec<(String, String)>,
    /// `&`-suffixed rules: (suffix like ":hover", props).
    self_rules: Vec<(String, Vec<(String, String)>)>,
    /// Named class/id/raw rules emitted as written.
    named_rules: Vec<(RuleSelector, Vec<(String, String)>)>,
}

impl ResolvedStyle {
    fn push_prop(&mut self, name: String, value: String) {
        if let Some(slot) = self.props.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.props.push((name, value));
        }
    }

    fn merge(&mut self, other: ResolvedStyle) {
        for (n, v) in other.props {
            self.push_prop(n, v);
        }
        self.self_rules.extend(other.self_rules);
        self.named_rules.extend(other.named_rules);
    }
}

impl<'a> Emitter<'a> {
    pub fn new(
        map: &'a GlobalMap,
        config: &'a Configuration,
        fragments: &'a [Fragment],
        diags: &'a mut DiagnosticList,
    ) -> Self {
        Emitter {
            map,
            config,
            fragments,
            diags,
            html: String::new(),
            css: String::new(),
            js_work: Vec::new(),
            saw_doctype: false,
            class_counters: HashMap::new(),
            current_namespace: Vec::new(),
            expanding: Vec::new(),
        }
    }

    pub fn emit_document(&mut self, doc: &Document) {
        self.emit_nodes(&doc.children, &[]);
    }

    fn error(&mut self, kind: DiagnosticKind, span: Span) {
        self.diags.push(Diagnostic::error(kind, span));
    }

    // ── node dispatch ──────────────────────────────────────────────────────

    fn emit_nodes(&mut self, nodes: &[Node], banned: &[SpecTarget]) {
        for node in nodes {
            self.emit_node(node, banned);
        }
    }

    fn emit_node(&mut self, node: &Node, banned: &[SpecTarget]) {
        match node {
            Node::UseHtml5(_) => {
                self.html.push_str("<!DOCTYPE html>");
                self.saw_doctype = true;
            }
            Node::Element(el) => {
                self.check_except(&el.tag, None, banned, el.span);
                self.emit_element(el);
            }
            Node::Text(t) => {
                for v in &t.values {
                    self.html.push_str(&escape_html(v));
                }
            }
            Node::GeneratorComment(c) => {
                self.html.push_str("<!-- ");
                self.html.push_str(&c.text);
                self.html.push_str(" -->");
            }
            Node::StyleBlock(sb) => {
                // A style block reaching this path is non-local (top level or
                // inside a namespace): raw CSS fragments pass straight
                // through; parsed items have no element to attach to.
                for item in &sb.items {
                    if let StyleItem::RawFragment(idx) = item {
                        if let Some(frag) = self.fragments.get(*idx) {
                            self.css.push_str(frag.text.trim_end());
                            self.css.push('\n');
                        }
                    }
                }
            }
            Node::ScriptBlock(sb) => {
                if sb.first_fragment != usize::MAX {
                    self.js_work
                        .push(JsWork::Fragments(sb.first_fragment, sb.last_fragment));
                }
            }
            Node::OriginDecl(decl) => {
                // Anonymous origins emit in place; named ones only define.
                if decl.name.is_none() {
                    let text = self
                        .fragments
                        .get(decl.fragment)
                        .map(|f| f.text.clone())
                        .unwrap_or_default();
                    self.emit_origin_text(&decl.tag, &text);
                }
            }
            Node::OriginUse(use_) => {
                let kind = crate::global_map::SymbolKind::for_origin(&use_.tag);
                match self
                    .map
                    .lookup(&use_.name, &[kind], &self.current_namespace)
                    .cloned()
                {
                    Some(sym) => {
                        if let SymbolBody::Origin(text) = &sym.body {
                            self.emit_origin_text(&use_.tag, text);
                        }
                    }
                    None => self.error(
                        DiagnosticKind::UnresolvedSymbol {
                            kind: format!("origin @{}", use_.tag),
                            name: use_.name.clone(),
                        },
                        use_.span,
                    ),
                }
            }
            Node::Use(u) => match u.kind {
                UseKind::Element => {
                    self.check_except(&u.target.name, Some(&u.target.name), banned, u.span);
                    self.emit_element_use(u);
                }
                UseKind::Style => {
                    // A bare `@Style X;` outside any element styles nothing.
                    self.error(
                        DiagnosticKind::KindMismatch {
                            name: u.target.name.clone(),
                            found: "style group use".to_string(),
                            expected: "an element context".to_string(),
                        },
                        u.span,
                    );
                }
                UseKind::Var => {
                    self.error(
                        DiagnosticKind::KindMismatch {
                            name: u.target.name.clone(),
                            found: "variable group use".to_string(),
                            expected: "a style value position".to_string(),
                        },
                        u.span,
                    );
                }
            },
            Node::NamespaceDecl(ns) => {
                let depth = ns.path.len();
                self.current_namespace.extend(ns.path.iter().cloned());
                self.emit_nodes(&ns.members, banned);
                let new_len = self.current_namespace.len() - depth;
                self.current_namespace.truncate(new_len);
            }
            // Declarations and directives produce no output themselves.
            Node::TemplateDecl(_)
            | Node::CustomDecl(_)
            | Node::ImportDecl(_)
            | Node::ConfigurationDecl(_)
            | Node::InfoDecl(_)
            | Node::ExportDecl(_)
            | Node::UseConfig(_)
            | Node::ExceptClause(_) => {}
        }
    }

    fn emit_origin_text(&mut self, tag: &str, text: &str) {
        match tag {
            "Style" => {
                self.css.push_str(text.trim());
                self.css.push('\n');
            }
            "JavaScript" => {
                self.js_work.push(JsWork::Verbatim(text.trim().to_string()));
            }
            // @Html and user-defined tags pass through to the HTML stream.
            _ => {
                self.html.push_str(text.trim());
            }
        }
    }

    fn check_except(
        &mut self,
        tag: &str,
        element_ref: Option<&str>,
        banned: &[SpecTarget],
        span: Span,
    ) {
        for target in banned {
            let hit = match target {
                SpecTarget::Tag { name, index: None } => name == tag,
                SpecTarget::ElementRef(name) => element_ref == Some(name.as_str()),
                _ => false,
            };
            if hit {
                self.error(
                    DiagnosticKind::ExceptViolation {
                        target: target.describe(),
                    },
                    span,
                );
            }
        }
    }

    // ── elements ───────────────────────────────────────────────────────────

    fn emit_element(&mut self, el: &Element) {
        let mut attrs: Vec<(String, String)> = el
            .attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();

        // Gather the element's style program: local style blocks plus direct
        // `@Style X;` uses in the body.
        let mut style_items: Vec<StyleItem> = Vec::new();
        let mut banned: Vec<SpecTarget> = Vec::new();
        for child in &el.children {
            match child {
                Node::StyleBlock(sb) if sb.local => style_items.extend(sb.items.iter().cloned()),
                Node::Use(u) if u.kind == UseKind::Style => {
                    style_items.push(StyleItem::Use(StyleGroupUse {
                        target: u.target.clone(),
                        specialization: u.specialization.clone(),
                        span: u.span,
                    }));
                }
                Node::ExceptClause(e) => banned.extend(e.targets.iter().cloned()),
                _ => {}
            }
        }

        if !style_items.is_empty() {
            let mut resolved = self.resolve_style_items(&style_items, el.span);
            // Properties still without a value at the element are errors.
            let missing: Vec<String> = resolved
                .props
                .iter()
                .filter(|(_, v)| v.is_empty())
                .map(|(n, _)| n.clone())
                .collect();
            for name in missing {
                resolved.props.retain(|(n, _)| *n != name);
                self.error(
                    DiagnosticKind::MissingStyleValue {
                        group: el.tag.clone(),
                        property: name,
                    },
                    el.span,
                );
            }
            self.attach_styles(&el.tag, resolved, &mut attrs);
        }

        self.html.push('<');
        self.html.push_str(&el.tag);
        for (name, value) in &attrs {
            self.html.push(' ');
            self.html.push_str(name);
            self.html.push_str("=\"");
            self.html.push_str(&escape_attr(value));
            self.html.push('"');
        }
        if SELF_CLOSING.contains(el.tag.as_str()) {
            self.html.push_str("/>");
            return;
        }
        self.html.push('>');

        for child in &el.children {
            match child {
                Node::StyleBlock(sb) if sb.local => {}
                Node::Use(u) if u.kind == UseKind::Style => {}
                Node::ExceptClause(_) => {}
                other => self.emit_node(other, &banned),
            }
        }

        self.html.push_str("</");
        self.html.push_str(&el.tag);
        self.html.push('>');
    }

    /// Write resolved style content to the CSS stream, attaching generated
    /// or named selectors to the element's attributes.
    fn attach_styles(
        &mut self,
        tag: &str,
        resolved: ResolvedStyle,
        attrs: &mut Vec<(String, String)>,
    ) {
        let needs_auto = !resolved.props.is_empty() || !resolved.self_rules.is_empty();
        let auto_class = if needs_auto {
            let counter = self.class_counters.entry(tag.to_string()).or_insert(0);
            let name = format!("chtl-{}-{}", tag, counter);
            *counter += 1;
            add_class(attrs, &name);
            Some(name)
        } else {
            None
        };

        if let Some(class) = &auto_class {
            if !resolved.props.is_empty() {
                self.write_rule(&format!(".{}", class), &resolved.props);
            }
            for (suffix, props) in &resolved.self_rules {
                self.write_rule(&format!(".{}{}", class, suffix), props);
            }
        }
        for (selector, props) in &resolved.named_rules {
            let selector_text = match selector {
                RuleSelector::Class(name) => {
                    add_class(attrs, name);
                    format!(".{}", name)
                }
                RuleSelector::Id(name) => {
                    if !attrs.iter().any(|(n, _)| n == "id") {
                        attrs.push(("id".to_string(), name.clone()));
                    }
                    format!("#{}", name)
                }
                RuleSelector::SelfRef(suffix) => match &auto_class {
                    Some(class) => format!(".{}{}", class, suffix),
                    None => format!("{}{}", tag, suffix),
                },
                RuleSelector::Raw(raw) => raw.clone(),
            };
            self.write_rule(&selector_text, props);
        }
    }

    fn write_rule(&mut self, selector: &str, props: &[(String, String)]) {
        self.css.push_str(selector);
        self.css.push_str(" { ");
        for (name, value) in props {
            self.css.push_str(name);
            self.css.push_str(": ");
            self.css.push_str(value);
            self.css.push_str("; ");
        }
        self.css.push_str("}\n");
    }

    // ── style resolution ───────────────────────────────────────────────────

    fn resolve_style_items(&mut self, items: &[StyleItem], _span: Span) -> ResolvedStyle {
        let mut out = ResolvedStyle::default();
        for item in items {
            match item {
                StyleItem::Property(p) => {
                    // Key-only entries keep an empty value here; whether that
                    // is legal depends on the consumer (a use-site
                    // specialization may still fill it in).
                    let value = if p.value.is_empty() {
                        String::new()
                    } else {
                        self.resolve_style_value(&p.value, p.span)
                    };
                    out.push_prop(p.name.clone(), value);
                }
                StyleItem::Use(u) => {
                    let expanded = self.expand_style_group(
                        &u.target,
                        u.specialization.as_ref(),
                        u.span,
                    );
                    out.merge(expanded);
                }
                StyleItem::Inherit(target) => {
                    let expanded = self.expand_style_group(target, None, target.span);
                    out.merge(expanded);
                }
                StyleItem::Rule(rule) => {
                    let inner = self.resolve_style_items(&rule.items, rule.span);
                    // Nested rules keep only their own properties; deeper
                    // nesting flattens into the same bucket.
                    let props = inner.props;
                    match &rule.selector {
                        RuleSelector::SelfRef(suffix) => {
                            out.self_rules.push((suffix.clone(), props));
                        }
                        other => out.named_rules.push((other.clone(), props)),
                    }
                    out.self_rules.extend(inner.self_rules);
                    out.named_rules.extend(inner.named_rules);
                }
                StyleItem::RawFragment(idx) => {
                    if let Some(frag) = self.fragments.get(*idx) {
                        self.css.push_str(frag.text.trim_end());
                        self.css.push('\n');
                    }
                }
            }
        }
        out
    }

    fn resolve_style_value(&mut self, value: &StyleValue, span: Span) -> String {
        let mut parts: Vec<String> = Vec::new();
        for piece in &value.pieces {
            match piece {
                ValuePiece::Text(t) => parts.push(t.clone()),
                ValuePiece::VarRef {
                    group,
                    key,
                    override_value,
                } => {
                    if let Some(v) = override_value {
                        parts.push(v.clone());
                        continue;
                    }
                    match self
                        .map
                        .lookup(group, &var_use_kinds(), &self.current_namespace)
                    {
                        Some(sym) => {
                            let found = match &sym.body {
                                SymbolBody::Var(entries) => entries
                                    .iter()
                                    .find(|e| &e.key == key)
                                    .and_then(|e| e.value.clone()),
                                _ => None,
                            };
                            match found {
                                Some(v) => parts.push(v),
                                None => self.error(
                                    DiagnosticKind::UnknownVarKey {
                                        group: group.clone(),
                                        key: key.clone(),
                                    },
                                    span,
                                ),
                            }
                        }
                        None => self.error(
                            DiagnosticKind::UnresolvedSymbol {
                                kind: "variable group".to_string(),
                                name: group.clone(),
                            },
                            span,
                        ),
                    }
                }
            }
        }
        parts.join(" ")
    }

    /// Expand a style group use: resolve, flatten inheritance pre-order,
    /// apply declaration ops, then the call-site specialization.
    fn expand_style_group(
        &mut self,
        target: &QualifiedRef,
        specialization: Option<&Specialization>,
        span: Span,
    ) -> ResolvedStyle {
        let symbol = match self.resolve_ref(target, &style_use_kinds()) {
            Some(s) => s,
            None => {
                self.error(
                    DiagnosticKind::UnresolvedSymbol {
                        kind: "style group".to_string(),
                        name: target.name.clone(),
                    },
                    span,
                );
                return ResolvedStyle::default();
            }
        };
        if self.expanding.contains(&symbol.fully_qualified_name) {
            // Inheritance cycle; already reported at the deepest repeat.
            return ResolvedStyle::default();
        }
        self.expanding.push(symbol.fully_qualified_name.clone());

        let mut out = ResolvedStyle::default();
        for parent in symbol.inherits.clone() {
            let expanded = self.expand_style_group(&parent, None, parent.span);
            out.merge(expanded);
        }
        if let SymbolBody::Style(items) = &symbol.body {
            let own = self.resolve_style_items(&items.clone(), span);
            out.merge(own);
        }
        self.apply_style_ops(&symbol.ops.clone(), &mut out, &symbol.simple_name, span);
        if let Some(spec) = specialization {
            self.apply_style_ops(&spec.ops, &mut out, &symbol.simple_name, span);
        }

        // Key-only entries may still be empty here; the element-level check
        // rejects whatever the use site failed to fill in.
        self.expanding.pop();
        out
    }

    fn apply_style_ops(
        &mut self,
        ops: &[SpecOp],
        out: &mut ResolvedStyle,
        group: &str,
        span: Span,
    ) {
        for op in ops {
            match op {
                SpecOp::Delete { targets, span } => {
                    for target in targets {
                        let name = match target {
                            SpecTarget::Property(n) => n.clone(),
                            SpecTarget::Tag { name, index: None } => name.clone(),
                            other => {
                                self.error(
                                    DiagnosticKind::MissingSpecTarget(other.describe()),
                                    *span,
                                );
                                continue;
                            }
                        };
                        let before = out.props.len();
                        out.props.retain(|(n, _)| *n != name);
                        if out.props.len() == before {
                            self.error(DiagnosticKind::MissingSpecTarget(name), *span);
                        }
                    }
                }
                SpecOp::OverrideProp(p) => {
                    let value = self.resolve_style_value(&p.value, p.span);
                    out.push_prop(p.name.clone(), value);
                }
                SpecOp::Inherit { target, .. } => {
                    let expanded = self.expand_style_group(target, None, target.span);
                    // Inherited content sits under the existing properties.
                    let mut base = expanded;
                    let own = std::mem::take(out);
                    base.merge(own);
                    *out = base;
                }
                other => {
                    self.error(
                        DiagnosticKind::IllegalSpecialization {
                            op: other.describe().to_string(),
                            context: format!("style group `{}`", group),
                        },
                        span,
                    );
                }
            }
        }
    }

    // ── element expansion ──────────────────────────────────────────────────

    fn emit_element_use(&mut self, u: &Use) {
        let nodes = self.expand_element_use(&u.target, u.specialization.as_ref(), u.span);
        self.emit_nodes(&nodes, &[]);
    }

    /// Materialize the node list for an element use, with the full expansion
    /// order applied. Resolution failures yield diagnostics, never silent
    /// drops.
    fn expand_element_use(
        &mut self,
        target: &QualifiedRef,
        specialization: Option<&Specialization>,
        span: Span,
    ) -> Vec<Node> {
        let symbol = match self.resolve_ref(target, &element_use_kinds()) {
            Some(s) => s,
            None => {
                self.error(
                    DiagnosticKind::UnresolvedSymbol {
                        kind: "element".to_string(),
                        name: target.name.clone(),
                    },
                    span,
                );
                return Vec::new();
            }
        };
        if self.expanding.contains(&symbol.fully_qualified_name) {
            return Vec::new();
        }
        self.expanding.push(symbol.fully_qualified_name.clone());

        let mut nodes: Vec<Node> = Vec::new();
        for parent in symbol.inherits.clone() {
            nodes.extend(self.expand_element_use(&parent, None, parent.span));
        }
        if let SymbolBody::Element(body) = &symbol.body {
            nodes.extend(body.clone());
        }
        let decl_ops = symbol.ops.clone();
        self.expanding.pop();

        self.apply_element_ops(&decl_ops, &mut nodes);
        if let Some(spec) = specialization {
            self.apply_element_ops(&spec.ops, &mut nodes);
        }
        nodes
    }

    /// Deletes first, then inserts/replaces in source order, refinements
    /// last. Insert positions resolve against the post-delete body, so an
    /// index written after a delete refers to the renumbered children.
    fn apply_element_ops(&mut self, ops: &[SpecOp], nodes: &mut Vec<Node>) {
        for op in ops {
            if let SpecOp::Delete { targets, span } = op {
                for target in targets {
                    match find_target_path(nodes, target) {
                        Some(path) => {
                            let (siblings, idx) = nodes_at_path(nodes, &path);
                            siblings.remove(idx);
                        }
                        None => {
                            self.error(
                                DiagnosticKind::MissingSpecTarget(target.describe()),
                                *span,
                            );
                        }
                    }
                }
            }
        }
        for op in ops {
            match op {
                SpecOp::Delete { .. } => {}
                SpecOp::Insert {
                    position,
                    payload,
                    span,
                } => match position {
                    InsertPos::AtTop => {
                        nodes.splice(0..0, payload.iter().cloned());
                    }
                    InsertPos::AtBottom => {
                        nodes.extend(payload.iter().cloned());
                    }
                    InsertPos::Before(t) | InsertPos::After(t) | InsertPos::Replace(t) => {
                        match find_target_path(nodes, t) {
                            Some(path) => {
                                let (siblings, idx) = nodes_at_path(nodes, &path);
                                match position {
                                    InsertPos::Before(_) => {
                                        siblings.splice(idx..idx, payload.iter().cloned());
                                    }
                                    InsertPos::After(_) => {
                                        siblings
                                            .splice(idx + 1..idx + 1, payload.iter().cloned());
                                    }
                                    InsertPos::Replace(_) => {
                                        siblings.splice(idx..idx + 1, payload.iter().cloned());
                                    }
                                    _ => unreachable!(),
                                }
                            }
                            None => {
                                self.error(
                                    DiagnosticKind::MissingSpecTarget(t.describe()),
                                    *span,
                                );
                            }
                        }
                    }
                },
                SpecOp::Replace {
                    target,
                    payload,
                    span,
                } => match find_target_path(nodes, target) {
                    Some(path) => {
                        let (siblings, idx) = nodes_at_path(nodes, &path);
                        siblings.splice(idx..idx + 1, payload.iter().cloned());
                    }
                    None => {
                        self.error(
                            DiagnosticKind::MissingSpecTarget(target.describe()),
                            *span,
                        );
                    }
                },
                SpecOp::Inherit { target, span, .. } => {
                    let parents = self.expand_element_use(target, None, *span);
                    nodes.splice(0..0, parents);
                }
                SpecOp::Refine {
                    target,
                    attrs,
                    body,
                    span,
                } => match find_target_path(nodes, target) {
                    Some(path) => {
                        let (siblings, idx) = nodes_at_path(nodes, &path);
                        if let Node::Element(el) = &mut siblings[idx] {
                            for attr in attrs {
                                match el.attrs.iter_mut().find(|a| a.name == attr.name) {
                                    Some(existing) => existing.value = attr.value.clone(),
                                    None => el.attrs.push(attr.clone()),
                                }
                            }
                            el.children.extend(body.iter().cloned());
                        }
                    }
                    None => {
                        self.error(
                            DiagnosticKind::MissingSpecTarget(target.describe()),
                            *span,
                        );
                    }
                },
                SpecOp::OverrideProp(p) => {
                    self.error(
                        DiagnosticKind::IllegalSpecialization {
                            op: "override".to_string(),
                            context: "element specialization".to_string(),
                        },
                        p.span,
                    );
                }
            }
        }
    }

    fn resolve_ref(
        &self,
        target: &QualifiedRef,
        kinds: &[crate::global_map::SymbolKind],
    ) -> Option<Symbol> {
        match &target.from_namespace {
            Some(ns) => self.map.lookup_from(&target.name, ns, kinds).cloned(),
            None => self
                .map
                .lookup(&target.name, kinds, &self.current_namespace)
                .cloned(),
        }
    }
}

/// Path to the node matching a specialization target, searching the expanded
/// tree depth-first. `tag[n]` counts elements of that tag in document order
/// across the whole forest — after a delete, remaining elements renumber, so
/// an index written after a `delete` addresses the post-delete body.
fn find_target_path(nodes: &[Node], target: &SpecTarget) -> Option<Vec<usize>> {
    let mut counter = 0usize;
    let mut path = Vec::new();
    if walk_for_target(nodes, target, &mut counter, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn walk_for_target(
    nodes: &[Node],
    target: &SpecTarget,
    counter: &mut usize,
    path: &mut Vec<usize>,
) -> bool {
    for (i, node) in nodes.iter().enumerate() {
        let matched = match (target, node) {
            (SpecTarget::Tag { name, index }, Node::Element(el)) if el.tag == *name => {
                let wanted = index.unwrap_or(0);
                let hit = *counter == wanted;
                *counter += 1;
                hit
            }
            (SpecTarget::Selector(sel), Node::Element(el)) => {
                let (attr, value) = if let Some(cls) = sel.strip_prefix('.') {
                    ("class", cls)
                } else if let Some(id) = sel.strip_prefix('#') {
                    ("id", id)
                } else {
                    ("", "")
                };
                !attr.is_empty()
                    && el.attrs.iter().any(|a| {
                        a.name == attr && a.value.split_whitespace().any(|v| v == value)
                    })
            }
            (SpecTarget::ElementRef(name), Node::Use(u)) => {
                u.kind == UseKind::Element && u.target.name == *name
            }
            (SpecTarget::StyleRef(name), Node::StyleBlock(sb)) => {
                sb.items.iter().any(|item| match item {
                    StyleItem::Use(u) => u.target.name == *name,
                    _ => false,
                })
            }
            _ => false,
        };
        if matched {
            path.push(i);
            return true;
        }
        if let Node::Element(el) = node {
            path.push(i);
            if walk_for_target(&el.children, target, counter, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// The sibling list containing the node addressed by `path`, plus its index.
fn nodes_at_path<'v>(nodes: &'v mut Vec<Node>, path: &[usize]) -> (&'v mut Vec<Node>, usize) {
    let (last, parents) = path.split_last().expect("target path is never empty");
    let mut current = nodes;
    for idx in parents {
        current = match &mut current[*idx] {
            Node::Element(el) => &mut el.children,
            _ => unreachable!("target paths descend only through elements"),
        };
    }
    (current, *last)
}

fn add_class(attrs: &mut Vec<(String, String)>, class: &str) {
    match attrs.iter_mut().find(|(n, _)| n == "class") {
        Some((_, value)) => {
            if !value.split_whitespace().any(|c| c == class) {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(class);
            }
        }
        None => attrs.push(("class".to_string(), class.to_string())),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global_map::register_document;
    use crate::lexer::lex_fragments;
    use crate::parser::parse_tokens;
    use crate::scanner::scan_source;
    use crate::token::KeywordTable;

    fn compile(src: &str) -> (String, String, Vec<JsWork>, DiagnosticList) {
        let config = Configuration::default();
        let table = KeywordTable::from_config(&config);
        let frags = scan_source(src, 0, &config);
        let mut diags = DiagnosticList::new();
        let tokens = lex_fragments(&frags, &table, &mut diags);
        let doc = parse_tokens(tokens, &config, &mut diags);
        let mut map = GlobalMap::new();
        register_document(&doc, &frags, &mut map, &[], &mut diags);
        let mut emitter = Emitter::new(&map, &config, &frags, &mut diags);
        emitter.emit_document(&doc);
        let html = emitter.html.clone();
        let css = emitter.css.clone();
        let js = emitter.js_work.clone();
        (html, css, js, diags)
    }

    fn compile_clean(src: &str) -> (String, String) {
        let (html, css, _, diags) = compile(src);
        assert!(!diags.has_errors(), "diagnostics: {:?}", diags);
        (html, css)
    }

    #[test]
    fn plain_element_tree() {
        let (html, _) = compile_clean(r#"div { id: main; span { text { "x" } } }"#);
        assert_eq!(html, r#"<div id="main"><span>x</span></div>"#);
    }

    #[test]
    fn self_closing_tags() {
        let (html, _) = compile_clean("div { img { src: a.png; } br { } }");
        assert!(html.contains(r#"<img src="a.png"/>"#));
        assert!(html.contains("<br/>"));
    }

    #[test]
    fn template_style_expansion_with_override() {
        // Scenario: later `color` wins, order otherwise preserved.
        let (html, css) = compile_clean(
            r#"[Template] @Style Theme { color: red; font-size: 16px; }
               div { style { @Style Theme; color: blue; } text { "hi" } }"#,
        );
        assert_eq!(html, r#"<div class="chtl-div-0">hi</div>"#);
        assert_eq!(css.trim(), ".chtl-div-0 { color: blue; font-size: 16px; }");
    }

    #[test]
    fn custom_element_delete_and_insert() {
        // The first span is deleted; the survivor renumbers to span[0] and
        // the paragraph lands after it.
        let (html, _) = compile_clean(
            r#"[Custom] @Element Box { div { span; span; } }
               body { @Element Box { delete span[0]; insert after span[0] { p { text { "x" } } } } }"#,
        );
        assert_eq!(html, "<body><div><span></span><p>x</p></div></body>");
    }

    #[test]
    fn var_group_with_override() {
        let (_, css) = compile_clean(
            r#"[Template] @Var Palette { primary: red; }
               div { style { color: Palette(primary); background: Palette(primary = blue); } }"#,
        );
        let rule = css.trim();
        assert!(rule.contains("color: red;"), "css was: {}", rule);
        assert!(rule.contains("background: blue;"), "css was: {}", rule);
    }

    #[test]
    fn namespace_with_from_clause() {
        let (html, _) = compile_clean(
            r#"[Namespace] ui { [Custom] @Element Button { button { } } }
               body { @Element Button from ui; }"#,
        );
        assert_eq!(html, "<body><button></button></body>");
    }

    #[test]
    fn unresolved_use_is_a_diagnostic_not_a_silent_drop() {
        let (_, _, _, diags) = compile("body { @Element Missing; }");
        assert!(diags.has_errors());
    }

    #[test]
    fn auto_class_counter_is_stable_by_source_order() {
        let (html, css) = compile_clean(
            "div { style { color: red; } } div { style { color: blue; } }",
        );
        assert!(html.contains("chtl-div-0"));
        assert!(html.contains("chtl-div-1"));
        let first = css.find(".chtl-div-0").unwrap();
        let second = css.find(".chtl-div-1").unwrap();
        assert!(first < second);
    }

    #[test]
    fn self_ref_rules_target_the_auto_class() {
        let (html, css) = compile_clean(
            "a { style { color: navy; &:hover { color: teal; } } }",
        );
        assert!(html.contains(r#"<a class="chtl-a-0">"#));
        assert!(css.contains(".chtl-a-0 { color: navy; }"));
        assert!(css.contains(".chtl-a-0:hover { color: teal; }"));
    }

    #[test]
    fn named_class_rule_adds_the_class() {
        let (html, css) = compile_clean("div { style { .box { margin: 0; } } }");
        assert!(html.contains(r#"class="box""#));
        assert!(css.contains(".box { margin: 0; }"));
    }

    #[test]
    fn key_only_custom_style_requires_values() {
        let (_, _, _, diags) = compile(
            r#"[Custom] @Style TextSet { color, font-size; }
               div { style { @Style TextSet; } }"#,
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn key_only_custom_style_completed_at_use_site() {
        let (_, css) = compile_clean(
            r#"[Custom] @Style TextSet { color, font-size; }
               div { style { @Style TextSet { color: red; font-size: 12px; } } }"#,
        );
        assert!(css.contains("color: red;"));
        assert!(css.contains("font-size: 12px;"));
    }

    #[test]
    fn generator_comment_survives_into_html() {
        let (html, _) = compile_clean("-- marker\ndiv { }");
        assert!(html.contains("<!-- marker -->"));
    }

    #[test]
    fn origin_html_is_verbatim() {
        let (html, _) = compile_clean(
            "[Origin] @Html Box { <b>raw & unescaped</b> } div { [Origin] @Html Box; }",
        );
        assert!(html.contains("<b>raw & unescaped</b>"));
    }

    #[test]
    fn text_is_html_escaped() {
        let (html, _) = compile_clean(r#"div { text { "a < b & c" } }"#);
        assert!(html.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn inheritance_expands_parent_first() {
        let (_, css) = compile_clean(
            r#"[Template] @Style Base { margin: 0; }
               [Template] @Style Derived { inherit @Style Base; padding: 1px; }
               div { style { @Style Derived; } }"#,
        );
        let rule = css.trim();
        let margin = rule.find("margin").unwrap();
        let padding = rule.find("padding").unwrap();
        assert!(margin < padding);
    }

    #[test]
    fn except_clause_flags_banned_children() {
        let (_, _, _, diags) = compile("div { except span; span { } }");
        assert!(diags.has_errors());
    }

    #[test]
    fn delete_of_missing_target_is_diagnosed() {
        let (_, _, _, diags) = compile(
            r#"[Custom] @Element Box { span; }
               body { @Element Box { delete p[0]; } }"#,
        );
        assert!(diags.has_errors());
    }
}
