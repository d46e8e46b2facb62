//! CHTL-JS emitter.
//!
//! Canonical lowerings:
//!
//! | construct            | JavaScript                                        |
//! |----------------------|---------------------------------------------------|
//! | `{{tag}}`            | `document.querySelectorAll('tag')`                |
//! | `{{.cls}}`           | `document.querySelectorAll('.cls')`               |
//! | `{{#id}}`            | `document.querySelector('#id')`                   |
//! | `{{sel[n]}}`         | `document.querySelectorAll('sel')[n]`             |
//! | `X->m(args)`         | `X.m(args)`                                       |
//! | `X->listen({…})`     | inlined per-event `addEventListener` loop         |
//! | `X->delegate({…})`   | delegation registry call                          |
//! | `animate({…})`       | animation runtime call                            |
//! | `vir N = listen({…})`| registry binding, identity preserved across sites |
//!
//! Opaque JavaScript is copied verbatim. Each prelude (delegate registry,
//! animation runtime, vir registry) is emitted exactly once per compilation
//! unit, ahead of the first construct that needs it.

use crate::ast::{
    ArrowChain, ChainCall, ChainHead, EnhancedSelector, JsNode, Script, SelectorKind,
};

pub const DELEGATE_PRELUDE: &str = r#"const __CHTL_DELEGATE__ = {
  register(parent, selector, event, handler) {
    parent.addEventListener(event, (e) => {
      const match = e.target.closest(selector);
      if (match && parent.contains(match)) handler.call(match, e);
    });
  }
};
"#;

pub const ANIMATE_PRELUDE: &str = r#"function __chtlAnimate(opts) {
  const targets = opts.target instanceof Element ? [opts.target]
    : opts.target ? Array.from(opts.target) : [];
  const duration = opts.duration || 0;
  const start = performance.now();
  function apply(props) {
    for (const el of targets) Object.assign(el.style, props || {});
  }
  apply(opts.begin);
  function frame(now) {
    const t = duration ? Math.min((now - start) / duration, 1) : 1;
    if (opts.when) {
      for (const key of Object.keys(opts.when)) {
        if (t >= Number(key)) apply(opts.when[key]);
      }
    }
    if (t < 1) {
      requestAnimationFrame(frame);
    } else {
      apply(opts.end);
      if (opts.loop && opts.loop-- > 1) requestAnimationFrame(frame);
      if (opts.callback) opts.callback();
    }
  }
  requestAnimationFrame(frame);
}
"#;

pub const VIR_PRELUDE: &str = "const __CHTL_VIR__ = {};\n";

/// Tracks which preludes the current compilation unit already carries.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreludeState {
    pub delegate: bool,
    pub animate: bool,
    pub vir: bool,
}

pub struct JsEmitter {
    pub out: String,
    prelude: String,
    state: PreludeState,
}

impl JsEmitter {
    pub fn new() -> Self {
        JsEmitter {
            out: String::new(),
            prelude: String::new(),
            state: PreludeState::default(),
        }
    }

    /// Final JavaScript: preludes first, then the lowered body.
    pub fn finish(self) -> String {
        let mut result = self.prelude;
        result.push_str(&self.out);
        result
    }

    pub fn emit_verbatim(&mut self, js: &str) {
        self.out.push_str(js);
    }

    pub fn emit_script(&mut self, script: &Script) {
        for node in &script.children {
            self.emit_node(node);
        }
    }

    fn need_delegate(&mut self) {
        if !self.state.delegate {
            self.state.delegate = true;
            self.prelude.push_str(DELEGATE_PRELUDE);
        }
    }

    fn need_animate(&mut self) {
        if !self.state.animate {
            self.state.animate = true;
            self.prelude.push_str(ANIMATE_PRELUDE);
        }
    }

    fn need_vir(&mut self) {
        if !self.state.vir {
            self.state.vir = true;
            self.prelude.push_str(VIR_PRELUDE);
        }
    }

    fn emit_node(&mut self, node: &JsNode) {
        match node {
            JsNode::OpaqueJs(opaque) => self.out.push_str(&opaque.text),
            JsNode::Selector(sel) => {
                self.out.push_str(&lower_selector(sel));
                self.out.push_str(";\n");
            }
            JsNode::Chain(chain) => self.emit_chain(chain),
            JsNode::Animate(block) => {
                self.need_animate();
                self.out.push_str("__chtlAnimate(");
                self.out.push_str(&lower_embedded_selectors(&block.object));
                self.out.push_str(");\n");
            }
            JsNode::VirDecl(vir) => {
                self.need_vir();
                self.out.push_str(&format!("__CHTL_VIR__['{}'] = {{", vir.name));
                for (i, (event, handler)) in vir.body.handlers.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&format!(
                        "{}: {}",
                        event,
                        lower_embedded_selectors(handler)
                    ));
                }
                self.out.push_str("};\n");
            }
        }
    }

    fn emit_chain(&mut self, chain: &ArrowChain) {
        let head = match &chain.head {
            ChainHead::Selector(sel) => lower_selector(sel),
            ChainHead::Ident { name, .. } => format!("__CHTL_VIR__['{}']", name),
        };
        if matches!(chain.head, ChainHead::Ident { .. }) {
            self.need_vir();
        }
        // Method chains apply left to right on the head expression.
        let mut expr = head.clone();
        for call in &chain.calls {
            match call {
                ChainCall::Method { name, args, .. } => {
                    expr = format!("{}.{}({})", expr, name, lower_embedded_selectors(args));
                }
                ChainCall::Listen(listen) => {
                    let target = expr.clone();
                    self.out.push_str("{\n  const __t = ");
                    self.out.push_str(&target);
                    self.out.push_str(";\n  const __h = {");
                    for (i, (event, handler)) in listen.handlers.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        self.out.push_str(&format!(
                            "{}: {}",
                            event,
                            lower_embedded_selectors(handler)
                        ));
                    }
                    self.out.push_str("};\n");
                    self.out.push_str(
                        "  const __els = __t instanceof Element ? [__t] : Array.from(__t);\n",
                    );
                    self.out.push_str(
                        "  Object.keys(__h).forEach((k) => __els.forEach((el) => el.addEventListener(k, __h[k])));\n}\n",
                    );
                    expr = String::new();
                }
                ChainCall::Delegate(delegate) => {
                    self.need_delegate();
                    let parent = expr.clone();
                    for target_sel in &delegate.targets {
                        for (event, handler) in &delegate.handlers {
                            self.out.push_str(&format!(
                                "__CHTL_DELEGATE__.register({}, '{}', '{}', {});\n",
                                parent,
                                target_sel,
                                event,
                                lower_embedded_selectors(handler)
                            ));
                        }
                    }
                    expr = String::new();
                }
            }
        }
        if !expr.is_empty() {
            self.out.push_str(&expr);
            self.out.push_str(";\n");
        }
    }
}

impl Default for JsEmitter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn lower_selector(sel: &EnhancedSelector) -> String {
    match sel.kind {
        SelectorKind::Id => format!("document.querySelector('{}')", sel.parsed),
        SelectorKind::Indexed => format!(
            "document.querySelectorAll('{}')[{}]",
            sel.parsed,
            sel.index.unwrap_or(0)
        ),
        SelectorKind::Tag | SelectorKind::Class | SelectorKind::Complex => {
            format!("document.querySelectorAll('{}')", sel.parsed)
        }
    }
}

/// Replace `{{…}}` occurrences inside raw JS (handler bodies, animate
/// objects) with their lowered query expressions.
pub fn lower_embedded_selectors(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        match rest[open + 2..].find("}}") {
            Some(close) => {
                let inner = rest[open + 2..open + 2 + close].trim();
                let sel = crate::js_parser::classify_selector(inner, crate::span::Span::dummy());
                out.push_str(&lower_selector(&sel));
                rest = &rest[open + 2 + close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticList;
    use crate::js_parser::parse_js_fragment;
    use crate::span::Span;

    fn emit(src: &str) -> String {
        let mut diags = DiagnosticList::new();
        let script = parse_js_fragment(src, Span::dummy(), &mut diags);
        assert!(!diags.has_errors(), "{:?}", diags);
        let mut emitter = JsEmitter::new();
        emitter.emit_script(&script);
        emitter.finish()
    }

    #[test]
    fn selector_lowerings_match_the_table() {
        assert!(emit("{{div}};").contains("document.querySelectorAll('div')"));
        assert!(emit("{{.box}};").contains("document.querySelectorAll('.box')"));
        assert!(emit("{{#app}};").contains("document.querySelector('#app')"));
        assert!(emit("{{.item[2]}};").contains("document.querySelectorAll('.item')[2]"));
        assert!(emit("{{ul li a}};").contains("document.querySelectorAll('ul li a')"));
    }

    #[test]
    fn method_chain_becomes_dot_call() {
        let js = emit("{{#app}}->focus()");
        assert!(js.contains("document.querySelector('#app').focus()"));
    }

    #[test]
    fn listen_attaches_each_event_to_each_element() {
        let js = emit("{{.box}}->listen({click: () => { x++; }});");
        assert!(js.contains("document.querySelectorAll('.box')"));
        assert!(js.contains("addEventListener"));
        assert!(js.contains("click: () => { x++; }"));
    }

    #[test]
    fn delegate_goes_through_the_registry() {
        let js = emit("{{#menu}}->delegate({target: {{.item}}, click: handle});");
        assert!(js.contains("__CHTL_DELEGATE__.register("));
        assert!(js.contains("'.item'"));
        assert!(js.contains("'click'"));
        assert!(js.starts_with("const __CHTL_DELEGATE__"));
    }

    #[test]
    fn delegate_prelude_emitted_once() {
        let mut diags = DiagnosticList::new();
        let mut emitter = JsEmitter::new();
        for _ in 0..3 {
            let script = parse_js_fragment(
                "{{#menu}}->delegate({target: {{.i}}, click: h});",
                Span::dummy(),
                &mut diags,
            );
            emitter.emit_script(&script);
        }
        let js = emitter.finish();
        assert_eq!(js.matches("const __CHTL_DELEGATE__").count(), 1);
        assert_eq!(js.matches("__CHTL_DELEGATE__.register(").count(), 3);
    }

    #[test]
    fn animate_lowers_nested_selectors() {
        let js = emit("animate({ target: {{.box}}, duration: 300 });");
        assert!(js.contains("__chtlAnimate({ target: document.querySelectorAll('.box'), duration: 300 })"));
        assert!(js.contains("requestAnimationFrame"));
    }

    #[test]
    fn vir_binding_and_call_share_the_registry() {
        let js = emit("vir V = listen({ click: f });");
        assert!(js.contains("__CHTL_VIR__['V'] = {click: f}"));

        let js = emit("V->run(1);");
        assert!(js.contains("__CHTL_VIR__['V'].run(1)"));
    }

    #[test]
    fn opaque_js_passes_through_verbatim() {
        let mut diags = DiagnosticList::new();
        let script = parse_js_fragment("", Span::dummy(), &mut diags);
        let mut emitter = JsEmitter::new();
        emitter.emit_script(&script);
        emitter.emit_verbatim("let untouched = `a ${b} c`;");
        assert_eq!(emitter.finish(), "let untouched = `a ${b} c`;");
    }
}
