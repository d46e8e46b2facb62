//! CJMOD extension protocol.
//!
//! Plugins extend CHTL-JS with new script-side syntax at compile time. A
//! plugin declares a pattern (`syntax_analys`), binds per-slot preprocessors
//! (`bind`) and transforms (`transform`), and registers a keyword with the
//! script scanner (`scan_keyword`). When the scanner meets the keyword it
//! hands control to the plugin, which collects argument text through
//! `peek_keyword` and the COLLECT policy, feeds values through `match_value`,
//! and returns the JavaScript to inline via `result`.
//!
//! The one essential discipline: transforms run at *match* time, never at
//! definition time — a transform must see the slot's concrete value.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticList};
use crate::span::Span;
use std::collections::HashMap;
use std::fmt;

type SlotFn = Box<dyn Fn(&str) -> String>;

/// One pattern slot: named, or a `$` placeholder identified by position.
pub struct Arg {
    name: String,
    is_placeholder: bool,
    binder: Option<SlotFn>,
    transformer: Option<SlotFn>,
    raw_value: Option<String>,
    transformed: Option<String>,
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("name", &self.name)
            .field("isPlaceholder", &self.is_placeholder)
            .field("hasBind", &self.binder.is_some())
            .field("hasTransform", &self.transformer.is_some())
            .field("value", &self.transformed)
            .finish()
    }
}

impl Arg {
    fn new(name: impl Into<String>, is_placeholder: bool) -> Self {
        Arg {
            name: name.into(),
            is_placeholder,
            binder: None,
            transformer: None,
            raw_value: None,
            transformed: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_placeholder(&self) -> bool {
        self.is_placeholder
    }

    pub fn has_bind(&self) -> bool {
        self.binder.is_some()
    }

    pub fn value(&self) -> Option<&str> {
        self.transformed.as_deref()
    }

    /// Preprocessor applied to the raw matched text, before the transform.
    pub fn bind(&mut self, f: impl Fn(&str) -> String + 'static) {
        self.binder = Some(Box::new(f));
    }

    /// Producer of the final JavaScript for this slot. Stored now, run at
    /// match time.
    pub fn transform(&mut self, f: impl Fn(&str) -> String + 'static) {
        self.transformer = Some(Box::new(f));
    }

    /// Feed a concrete value: bind runs first, then transform.
    pub fn match_value(&mut self, value: &str) {
        let bound = match &self.binder {
            Some(f) => f(value),
            None => value.to_string(),
        };
        self.raw_value = Some(bound.clone());
        self.transformed = Some(match &self.transformer {
            Some(f) => f(&bound),
            None => bound,
        });
    }
}

/// Ordered slot collection with name and placeholder addressing.
#[derive(Default)]
pub struct Args {
    args: Vec<Arg>,
    by_name: HashMap<String, usize>,
    /// Next `$` slot for placeholder-addressed bind/match.
    bind_cursor: usize,
    match_cursor: usize,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.args.iter()).finish()
    }
}

impl Args {
    fn push(&mut self, arg: Arg) {
        if !arg.is_placeholder {
            self.by_name.insert(arg.name.clone(), self.args.len());
        }
        self.args.push(arg);
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Arg> {
        self.args.get_mut(index)
    }

    /// Bind by name, or by `$`: each placeholder bind claims the next
    /// unbound placeholder slot.
    pub fn bind(&mut self, name: &str, f: impl Fn(&str) -> String + 'static) {
        if name == "$" {
            while self.bind_cursor < self.args.len() {
                let i = self.bind_cursor;
                self.bind_cursor += 1;
                if self.args[i].is_placeholder && !self.args[i].has_bind() {
                    self.args[i].bind(f);
                    return;
                }
            }
        } else if let Some(&i) = self.by_name.get(name) {
            self.args[i].bind(f);
        }
    }

    pub fn transform(&mut self, name: &str, f: impl Fn(&str) -> String + 'static) {
        if name == "$" {
            if let Some(arg) = self
                .args
                .iter_mut()
                .find(|a| a.is_placeholder && a.transformer.is_none())
            {
                arg.transform(f);
            }
        } else if let Some(&i) = self.by_name.get(name) {
            self.args[i].transform(f);
        }
    }

    /// Match by name, or by `$`: each placeholder match fills the next
    /// unfilled placeholder slot.
    pub fn match_value(&mut self, name: &str, value: &str) {
        if name == "$" {
            while self.match_cursor < self.args.len() {
                let i = self.match_cursor;
                self.match_cursor += 1;
                if self.args[i].is_placeholder {
                    self.args[i].match_value(value);
                    return;
                }
            }
        } else if let Some(&i) = self.by_name.get(name) {
            self.args[i].match_value(value);
        }
    }

    /// Concatenate every transformed slot, in pattern order.
    pub fn result(&self) -> String {
        self.args
            .iter()
            .filter_map(|a| a.transformed.clone())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Parsed pattern: the plugin's view of one syntax extension.
#[derive(Debug)]
pub struct Syntax {
    pub args: Args,
    pattern: String,
}

impl Syntax {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn result(&self) -> String {
        self.args.result()
    }
}

/// Parse a pattern like `"printMylove({ url: $, mode: $ })"` into named and
/// placeholder slots. `ignore_chars` lists separator characters that never
/// become slots (typically `",:{};()"`).
pub fn syntax_analys(pattern: &str, ignore_chars: &str) -> Result<Syntax, String> {
    if pattern.trim().is_empty() {
        return Err("empty pattern".to_string());
    }
    let mut args = Args::default();
    let mut word = String::new();
    let mut flush = |word: &mut String, args: &mut Args| {
        if word.is_empty() {
            return;
        }
        if word == "$" {
            let index = args.len();
            args.push(Arg::new(format!("${}", index), true));
        } else {
            args.push(Arg::new(word.clone(), false));
        }
        word.clear();
    };
    for c in pattern.chars() {
        if c.is_whitespace() || ignore_chars.contains(c) {
            flush(&mut word, &mut args);
        } else {
            word.push(c);
        }
    }
    flush(&mut word, &mut args);
    if args.is_empty() {
        return Err(format!("pattern `{}` has no slots", pattern));
    }
    Ok(Syntax {
        args,
        pattern: pattern.to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER POLICIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Tokenize and emit.
    Normal,
    /// Accumulate raw text into a buffer for the plugin.
    Collect,
    /// Drop tokens until the end trigger.
    Skip,
}

#[derive(Debug)]
struct PolicyFrame {
    trigger: String,
    policy: Policy,
    buffer: String,
}

/// Token-level scanner handed to plugin callbacks. Works over the word
/// tokens of one script construct; policies form a stack so nested COLLECTs
/// compose.
pub struct CjmodScanner {
    tokens: Vec<String>,
    pos: usize,
    policy_stack: Vec<PolicyFrame>,
}

impl CjmodScanner {
    pub fn new(source: &str) -> Self {
        CjmodScanner {
            tokens: tokenize_script(source),
            pos: 0,
            policy_stack: Vec::new(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Relative token access: `peek_keyword(0)` is the current token,
    /// negative offsets look back. Out of range yields an empty string.
    pub fn peek_keyword(&self, offset: i64) -> String {
        let index = self.pos as i64 + offset;
        if index < 0 {
            return String::new();
        }
        self.tokens
            .get(index as usize)
            .cloned()
            .unwrap_or_default()
    }

    pub fn advance(&mut self) -> Option<&str> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    /// Push a policy; with COLLECT, tokens accumulate from the next token
    /// after `trigger` is seen.
    pub fn policy_change_begin(&mut self, trigger: &str, policy: Policy) {
        self.policy_stack.push(PolicyFrame {
            trigger: trigger.to_string(),
            policy,
            buffer: String::new(),
        });
    }

    /// Run the active policy until `end_trigger` at nesting depth zero, pop
    /// the frame and return the collected buffer (empty for SKIP/NORMAL).
    pub fn policy_change_end(&mut self, end_trigger: &str, _next: Policy) -> String {
        let frame = match self.policy_stack.pop() {
            Some(f) => f,
            None => return String::new(),
        };
        let mut buffer = frame.buffer;
        let mut depth = 0i64;
        let opener = matching_opener(end_trigger);
        while let Some(tok) = self.tokens.get(self.pos) {
            if let Some(open) = opener {
                if tok == open {
                    depth += 1;
                }
            }
            if tok == end_trigger {
                if depth == 0 {
                    self.pos += 1;
                    break;
                }
                depth -= 1;
            }
            if frame.policy == Policy::Collect {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(tok);
            }
            self.pos += 1;
        }
        buffer
    }

    pub fn current_policy(&self) -> Policy {
        self.policy_stack
            .last()
            .map(|f| f.policy)
            .unwrap_or(Policy::Normal)
    }

    /// `{ … }` shaped content?
    pub fn is_object(&self, content: &str) -> bool {
        let t = content.trim();
        t.starts_with('{') && t.ends_with('}')
    }

    /// Function-expression shaped content?
    pub fn is_function(&self, content: &str) -> bool {
        let t = content.trim();
        t.starts_with("function")
            || t.contains("=>")
            || (t.starts_with('(') && t.contains(')'))
    }
}

fn matching_opener(closer: &str) -> Option<&'static str> {
    match closer {
        "}" => Some("{"),
        ")" => Some("("),
        "]" => Some("["),
        _ => None,
    }
}

/// Word/punct tokenization for plugin scanning. Strings stay single tokens.
fn tokenize_script(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut word = String::new();
    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' || c == '$' {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if c.is_whitespace() {
            continue;
        }
        if c == '"' || c == '\'' || c == '`' {
            let mut s = String::new();
            s.push(c);
            while let Some(&n) = chars.peek() {
                s.push(n);
                chars.next();
                if n == '\\' {
                    if let Some(&esc) = chars.peek() {
                        s.push(esc);
                        chars.next();
                    }
                    continue;
                }
                if n == c {
                    break;
                }
            }
            tokens.push(s);
            continue;
        }
        tokens.push(c.to_string());
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTENSION REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// One loaded script-side extension. Implementations usually close over a
/// `Syntax` built with `syntax_analys`.
pub trait CjmodExtension {
    fn name(&self) -> &str;
    /// Keywords the scanner should hand to this extension.
    fn keywords(&self) -> Vec<String>;
    /// Called with a scanner positioned at the keyword. Returns the
    /// JavaScript to inline in place of the construct.
    fn expand(&self, scanner: &mut CjmodScanner) -> Result<String, String>;
}

/// Extension declared by a `.syntax` file inside a CJMOD archive.
///
/// The declaration is one pattern line followed by a JavaScript template:
///
/// ```text
/// printMylove({ url: $, mode: $ })
/// console.log('loving', $1, $2);
/// ```
///
/// At match time the construct's argument object is collected through the
/// COLLECT policy; each `$` placeholder takes the value of the key named
/// before it in the pattern, and the template's `$1`…`$n` (or `$key`)
/// references are substituted with the concrete values.
pub struct DeclaredExtension {
    name: String,
    keyword: String,
    pattern: String,
    template: String,
}

impl DeclaredExtension {
    pub fn parse(name: &str, source: &str) -> Result<DeclaredExtension, String> {
        let mut lines = source.lines();
        let pattern = loop {
            match lines.next() {
                Some(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with("//") {
                        continue;
                    }
                    break trimmed.to_string();
                }
                None => return Err(format!("`{}`: empty syntax declaration", name)),
            }
        };
        let template = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        if template.is_empty() {
            return Err(format!("`{}`: missing JavaScript template", name));
        }
        let keyword: String = pattern
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
            .collect();
        if keyword.is_empty() {
            return Err(format!("`{}`: pattern has no leading keyword", name));
        }
        Ok(DeclaredExtension {
            name: name.to_string(),
            keyword,
            pattern,
            template,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Placeholder keys in pattern order: each `$` is keyed by the name that
    /// precedes it (`url` for the first `$` of `f({ url: $ })`).
    fn placeholder_keys(&self, syntax: &Syntax) -> Vec<String> {
        let mut keys = Vec::new();
        let mut pending: Option<String> = None;
        // Slot 0 is the keyword itself.
        for i in 1..syntax.args.len() {
            let arg = syntax.args.get(i).expect("index within len");
            if arg.is_placeholder() {
                keys.push(pending.take().unwrap_or_default());
            } else {
                pending = Some(arg.name().to_string());
            }
        }
        keys
    }
}

impl CjmodExtension for DeclaredExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn keywords(&self) -> Vec<String> {
        vec![self.keyword.clone()]
    }

    fn expand(&self, scanner: &mut CjmodScanner) -> Result<String, String> {
        let syntax = syntax_analys(&self.pattern, ",:{};()")?;
        let keys = self.placeholder_keys(&syntax);

        // Position at the argument object and collect its body.
        while scanner.peek_keyword(0) != "{" {
            if scanner.advance().is_none() {
                return Err(format!("`{}` expects an argument object", self.keyword));
            }
        }
        scanner.advance();
        scanner.policy_change_begin("{", Policy::Collect);
        let body = scanner.policy_change_end("}", Policy::Normal);
        let pairs = crate::js_parser::parse_object_entries(&body);

        let mut js = self.template.clone();
        for (index, key) in keys.iter().enumerate() {
            let value = pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            js = js.replace(&format!("${}", index + 1), &value);
            if !key.is_empty() {
                js = js.replace(&format!("${}", key), &value);
            }
        }
        Ok(js)
    }
}

/// Registry of loaded extensions, consulted by the dispatcher for every
/// CHTL-JS fragment that starts with a registered keyword.
#[derive(Default)]
pub struct CjmodRegistry {
    extensions: Vec<Box<dyn CjmodExtension>>,
    by_keyword: HashMap<String, usize>,
}

impl CjmodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: Box<dyn CjmodExtension>) {
        let index = self.extensions.len();
        for kw in extension.keywords() {
            self.by_keyword.insert(kw, index);
        }
        log::debug!("registered cjmod extension `{}`", extension.name());
        self.extensions.push(extension);
    }

    pub fn keywords(&self) -> impl Iterator<Item = &String> {
        self.by_keyword.keys()
    }

    pub fn handles(&self, keyword: &str) -> bool {
        self.by_keyword.contains_key(keyword)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Expand a construct whose first word is a registered keyword.
    /// Failures are plugin diagnostics; the construct passes through
    /// verbatim so the output is still inspectable.
    pub fn expand(
        &self,
        keyword: &str,
        source: &str,
        span: Span,
        diags: &mut DiagnosticList,
    ) -> Option<String> {
        let &index = self.by_keyword.get(keyword)?;
        let mut scanner = CjmodScanner::new(source);
        match self.extensions[index].expand(&mut scanner) {
            Ok(js) => Some(js),
            Err(message) => {
                diags.push(Diagnostic::error(DiagnosticKind::Plugin(message), span));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_slots_are_named_and_positional() {
        let syntax = syntax_analys("printMylove({ url: $, mode: $ })", ",:{};()").unwrap();
        assert_eq!(syntax.args.len(), 5);
        assert_eq!(syntax.args.get(0).unwrap().name(), "printMylove");
        assert!(!syntax.args.get(0).unwrap().is_placeholder());
        assert!(syntax.args.get(2).unwrap().is_placeholder());
        assert!(syntax.args.get(4).unwrap().is_placeholder());
    }

    #[test]
    fn placeholder_bind_claims_slots_in_order() {
        let mut syntax = syntax_analys("f($, $)", ",()").unwrap();
        syntax.args.bind("$", |v| format!("[{}]", v));
        syntax.args.bind("$", |v| format!("<{}>", v));
        syntax.args.match_value("$", "a");
        syntax.args.match_value("$", "b");
        // Slot 0 is the name `f`, untouched; the placeholders got distinct
        // binders in order.
        assert_eq!(syntax.args.get(1).unwrap().value(), Some("[a]"));
        assert_eq!(syntax.args.get(2).unwrap().value(), Some("<b>"));
    }

    #[test]
    fn transform_runs_at_match_time_not_definition_time() {
        let mut syntax = syntax_analys("f($)", "()").unwrap();
        syntax
            .args
            .transform("$", |v| format!("console.log({});", v));
        // Nothing has run yet.
        assert_eq!(syntax.args.get(1).unwrap().value(), None);
        syntax.args.match_value("$", "42");
        assert_eq!(
            syntax.args.get(1).unwrap().value(),
            Some("console.log(42);")
        );
    }

    /// §8 property: `match(slot, v)` equals `transform(slot, bind(slot, v))`
    /// for every v.
    #[test]
    fn match_composes_bind_then_transform() {
        for v in ["x", "1 + 2", "'s'", ""] {
            let mut via_match = Arg::new("$0", true);
            via_match.bind(|s| format!("({})", s));
            via_match.transform(|s| format!("run{}", s));
            via_match.match_value(v);

            let bound = format!("({})", v);
            let expected = format!("run{}", bound);
            assert_eq!(via_match.value(), Some(expected.as_str()));
        }
    }

    #[test]
    fn result_concatenates_transformed_slots() {
        let mut syntax = syntax_analys("go($ $)", "()").unwrap();
        syntax.args.match_value("go", "");
        syntax.args.transform("$", |v| format!("a={};", v));
        syntax.args.transform("$", |v| format!("b={};", v));
        syntax.args.match_value("$", "1");
        syntax.args.match_value("$", "2");
        assert_eq!(syntax.result(), "a=1;b=2;");
    }

    #[test]
    fn peek_keyword_is_relative_and_bounded() {
        let mut scanner = CjmodScanner::new("printMylove ( { url : a , mode : b } )");
        assert_eq!(scanner.peek_keyword(0), "printMylove");
        assert_eq!(scanner.peek_keyword(-1), "");
        scanner.set_position(3);
        assert_eq!(scanner.peek_keyword(0), "url");
        assert_eq!(scanner.peek_keyword(-1), "{");
        assert_eq!(scanner.peek_keyword(2), "a");
        assert_eq!(scanner.peek_keyword(100), "");
    }

    #[test]
    fn collect_policy_accumulates_until_trigger() {
        let mut scanner = CjmodScanner::new("f({ url: http , x: 1 });");
        // Advance past `f ( {`.
        scanner.set_position(3);
        scanner.policy_change_begin("{", Policy::Collect);
        let collected = scanner.policy_change_end("}", Policy::Normal);
        assert_eq!(collected, "url : http , x : 1");
    }

    #[test]
    fn nested_collect_respects_inner_braces() {
        let mut scanner = CjmodScanner::new("{ a { b } c } tail");
        scanner.set_position(1);
        scanner.policy_change_begin("{", Policy::Collect);
        let collected = scanner.policy_change_end("}", Policy::Normal);
        assert_eq!(collected, "a { b } c");
        assert_eq!(scanner.peek_keyword(0), "tail");
    }

    #[test]
    fn skip_policy_drops_tokens() {
        let mut scanner = CjmodScanner::new("junk junk junk ; keep");
        scanner.policy_change_begin(";", Policy::Skip);
        let collected = scanner.policy_change_end(";", Policy::Normal);
        assert_eq!(collected, "");
        assert_eq!(scanner.peek_keyword(0), "keep");
    }

    #[test]
    fn registry_expands_keywords() {
        struct Print;
        impl CjmodExtension for Print {
            fn name(&self) -> &str {
                "printMylove"
            }
            fn keywords(&self) -> Vec<String> {
                vec!["printMylove".to_string()]
            }
            fn expand(&self, scanner: &mut CjmodScanner) -> Result<String, String> {
                let mut syntax =
                    syntax_analys("printMylove({ url: $, mode: $ })", ",:{};()")?;
                // Skip `printMylove ( {`.
                scanner.set_position(3);
                scanner.policy_change_begin("{", Policy::Collect);
                let body = scanner.policy_change_end("}", Policy::Normal);
                let mut url = String::new();
                let mut mode = String::new();
                for pair in body.split(',') {
                    let mut kv = pair.splitn(2, ':');
                    let key = kv.next().unwrap_or("").trim().to_string();
                    let value = kv.next().unwrap_or("").trim().to_string();
                    if key == "url" {
                        url = value;
                    } else if key == "mode" {
                        mode = value;
                    }
                }
                syntax.args.transform("$", move |v| {
                    format!("console.log('loving', '{}');", v)
                });
                syntax.args.transform("$", |v| format!("/* mode: {} */", v));
                syntax.args.match_value("$", &url);
                syntax.args.match_value("$", &mode);
                Ok(syntax.result())
            }
        }

        let mut registry = CjmodRegistry::new();
        registry.register(Box::new(Print));
        assert!(registry.handles("printMylove"));

        let mut diags = DiagnosticList::new();
        let js = registry
            .expand(
                "printMylove",
                "printMylove({ url: heart , mode: fast });",
                Span::dummy(),
                &mut diags,
            )
            .unwrap();
        assert!(js.contains("console.log('loving', 'heart');"));
        assert!(!diags.has_errors());
    }

    #[test]
    fn declared_extension_parses_pattern_and_template() {
        let ext = DeclaredExtension::parse(
            "printMylove",
            "// loving printer\nprintMylove({ url: $, mode: $ })\nconsole.log('loving', $1, $2);\n",
        )
        .unwrap();
        assert_eq!(ext.keyword(), "printMylove");

        assert!(DeclaredExtension::parse("x", "").is_err());
        assert!(DeclaredExtension::parse("x", "f({ a: $ })").is_err());
    }

    #[test]
    fn declared_extension_substitutes_positional_and_named() {
        let ext = DeclaredExtension::parse(
            "printMylove",
            "printMylove({ url: $, mode: $ })\nconsole.log('loving', $url, $2);",
        )
        .unwrap();
        let mut scanner = CjmodScanner::new("printMylove({ url: heart , mode: fast });");
        let js = ext.expand(&mut scanner).unwrap();
        assert_eq!(js, "console.log('loving', heart, fast);");
    }

    #[test]
    fn declared_extension_via_registry() {
        let ext = DeclaredExtension::parse(
            "greet",
            "greet({ who: $ })\nalert('hi ' + $1);",
        )
        .unwrap();
        let mut registry = CjmodRegistry::new();
        registry.register(Box::new(ext));
        assert!(registry.handles("greet"));

        let mut diags = DiagnosticList::new();
        let js = registry
            .expand("greet", "greet({ who: \"you\" });", Span::dummy(), &mut diags)
            .unwrap();
        assert_eq!(js, "alert('hi ' + \"you\");");
        assert!(!diags.has_errors());
    }
}
