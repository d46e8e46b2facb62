//! Dispatcher and merger.
//!
//! Drives one compilation unit through the full pipeline: configuration
//! pre-pass, scan, lex, parse, symbol registration, import linking, then the
//! two emitters. CSS and JS outputs concatenate in declaration order; the
//! merger wraps them in `<style>`/`<script>` and attaches them to the
//! discovered `head`/`body`, or at the document tail when the source had
//! neither.
//!
//! Everything here shares one mutable compile context per unit; a second
//! unit gets a fresh context, which is what makes multi-file compilation
//! embarrassingly parallel.

use crate::ast::{Document, Node};
use crate::cjmod::{CjmodRegistry, DeclaredExtension};
use crate::cmod::CmodManager;
use crate::config::Configuration;
use crate::diagnostics::DiagnosticList;
use crate::emitter::{Emitter, JsWork};
use crate::global_map::{register_document, GlobalMap, SymbolBody, SymbolKind};
use crate::js_emitter::JsEmitter;
use crate::js_parser::parse_js_fragment;
use crate::lexer::lex_fragments;
use crate::parser::parse_tokens;
use crate::scanner::{Fragment, FragmentKind, Scanner};
use crate::span::SourceMap;
use crate::token::KeywordTable;
use crate::resolver::Importer;
use std::path::Path;

/// The three artifacts of one compilation unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl Artifacts {
    /// Single-file output: CSS and JS inlined into the HTML document.
    pub fn merged(&self) -> String {
        let mut html = self.html.clone();
        if !self.css.trim().is_empty() {
            let style = format!("<style>\n{}</style>", ensure_newline(&self.css));
            html = insert_before_close(&html, "</head>", &style);
        }
        if !self.js.trim().is_empty() {
            let script = format!("<script>\n{}</script>", ensure_newline(&self.js));
            html = insert_before_close(&html, "</body>", &script);
        }
        html
    }
}

fn ensure_newline(s: &str) -> String {
    if s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{}\n", s)
    }
}

fn insert_before_close(html: &str, close_tag: &str, content: &str) -> String {
    match html.find(close_tag) {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + content.len());
            out.push_str(&html[..at]);
            out.push_str(content);
            out.push_str(&html[at..]);
            out
        }
        None => {
            let mut out = html.to_string();
            out.push_str(content);
            out
        }
    }
}

/// One compilation unit's shared mutable state.
pub struct CompileUnit<'a> {
    pub config: Configuration,
    pub sources: SourceMap,
    pub map: GlobalMap,
    pub diags: DiagnosticList,
    pub manager: &'a mut CmodManager,
    /// Script-side extensions. Host code may pre-register handlers;
    /// `[Import] @CJmod` declarations add theirs during the compile.
    pub plugins: CjmodRegistry,
}

impl<'a> CompileUnit<'a> {
    pub fn new(manager: &'a mut CmodManager) -> Self {
        CompileUnit {
            config: Configuration::default(),
            sources: SourceMap::new(),
            map: GlobalMap::new(),
            diags: DiagnosticList::new(),
            manager,
            plugins: CjmodRegistry::new(),
        }
    }

    /// Full pipeline for one source text. `base_dir` anchors relative
    /// imports. Artifacts are produced even when diagnostics carry errors —
    /// the driver decides whether to publish them.
    pub fn compile(&mut self, source: &str, file_name: &str, base_dir: &Path) -> Artifacts {
        // Configuration first: everything downstream reads from it.
        let file = self.sources.add_file(file_name, source);
        let text = self.sources.text(file).to_string();
        self.config
            .apply_source_blocks(&text, file, &mut self.diags);

        // CJMOD imports next: registered keywords change where the scanner
        // draws fragment boundaries, so their archives load before scanning.
        self.preload_cjmod_imports(&text, base_dir);

        let plugin_keywords = self.plugins.keywords().cloned().collect();
        let fragments = Scanner::new(&text, file, &self.config)
            .with_plugin_keywords(plugin_keywords)
            .scan();

        let table = KeywordTable::from_config(&self.config);
        let tokens = lex_fragments(&fragments, &table, &mut self.diags);
        let doc = parse_tokens(tokens, &self.config, &mut self.diags);

        register_document(&doc, &fragments, &mut self.map, &[], &mut self.diags);

        let mut importer = Importer::new(&self.config, self.manager, &mut self.plugins);
        importer.begin_root(&base_dir.join(file_name));
        importer.process_imports(
            &doc,
            base_dir,
            &mut self.map,
            &mut self.sources,
            &mut self.diags,
        );

        // After imports: a `use @Config` may select a configuration that an
        // import just linked.
        self.apply_named_configurations(&doc);

        self.emit(&doc, &fragments)
    }

    /// Pre-scan pass over `[Import] @CJmod …` declarations. Loading is
    /// silent here — resolution failures and bad declarations are reported
    /// by the real import pass, which covers the same ground.
    fn preload_cjmod_imports(&mut self, source: &str, base_dir: &Path) {
        let pattern = format!(
            r#"{}\s*{}\s*([A-Za-z_][A-Za-z0-9_]*)?\s*{}\s*"?([^";\s]+)"?"#,
            regex::escape(self.config.keyword("KEYWORD_IMPORT")),
            regex::escape(self.config.keyword("KEYWORD_AT_CJMOD")),
            regex::escape(self.config.keyword("KEYWORD_FROM")),
        );
        let re = match regex::Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => return,
        };
        for cap in re.captures_iter(source) {
            let from_path = cap[2].to_string();
            let name = cap
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| {
                    Path::new(&from_path)
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_else(|| from_path.clone())
                });
            let mut scratch = DiagnosticList::new();
            let direct = base_dir.join(&from_path);
            let module = if direct.is_file() {
                self.manager.load_path(&direct, &name, &mut scratch)
            } else {
                self.manager.load(&name, &mut scratch).cloned()
            };
            let module = match module {
                Some(m) => m,
                None => continue,
            };
            for (stem, text) in &module.syntax_sources {
                if let Ok(extension) = DeclaredExtension::parse(stem, text) {
                    if !self.plugins.handles(extension.keyword()) {
                        self.plugins.register(Box::new(extension));
                    }
                }
            }
        }
    }

    /// `use @Config Name;` selects a registered named configuration; its
    /// entries apply to this compile's options.
    fn apply_named_configurations(&mut self, doc: &Document) {
        for node in &doc.children {
            if let Node::UseConfig(use_config) = node {
                let found = self
                    .map
                    .lookup(&use_config.name, &[SymbolKind::Configuration], &[])
                    .cloned();
                match found {
                    Some(symbol) => {
                        if let SymbolBody::Config(entries) = &symbol.body {
                            for (key, value) in entries {
                                self.config.set_option(
                                    key,
                                    value,
                                    use_config.span,
                                    &mut self.diags,
                                );
                            }
                        }
                    }
                    None => {
                        self.diags.error(
                            crate::diagnostics::DiagnosticKind::UnresolvedSymbol {
                                kind: "configuration".to_string(),
                                name: use_config.name.clone(),
                            },
                            use_config.span,
                        );
                    }
                }
            }
        }
    }

    fn emit(&mut self, doc: &Document, fragments: &[Fragment]) -> Artifacts {
        let mut emitter = Emitter::new(&self.map, &self.config, fragments, &mut self.diags);
        emitter.emit_document(doc);
        let html = std::mem::take(&mut emitter.html);
        let css = std::mem::take(&mut emitter.css);
        let js_work = std::mem::take(&mut emitter.js_work);
        drop(emitter);

        let js = self.run_script_pipeline(&js_work, fragments);
        Artifacts { html, css, js }
    }

    /// Compile queued script work in declaration order. JS fragments pass
    /// through verbatim; CHTL-JS fragments go to the plugin registry first,
    /// then the CHTL-JS parser. The output is pure JavaScript.
    fn run_script_pipeline(&mut self, work: &[JsWork], fragments: &[Fragment]) -> String {
        let mut js = JsEmitter::new();
        for item in work {
            match item {
                JsWork::Verbatim(text) => {
                    js.emit_verbatim(text);
                    js.emit_verbatim("\n");
                }
                JsWork::Fragments(first, last) => {
                    for index in *first..=*last {
                        let fragment = match fragments.get(index) {
                            Some(f) => f,
                            None => continue,
                        };
                        match &fragment.kind {
                            FragmentKind::Js => js.emit_verbatim(&fragment.text),
                            FragmentKind::ChtlJs => {
                                self.compile_chtljs_fragment(fragment, &mut js);
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
        js.finish()
    }

    fn compile_chtljs_fragment(&mut self, fragment: &Fragment, js: &mut JsEmitter) {
        // Plugin keywords claim the construct before the built-in grammar.
        let first_word: String = fragment
            .text
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
            .collect();
        if !first_word.is_empty() && self.plugins.handles(&first_word) {
            if let Some(expanded) = self.plugins.expand(
                &first_word,
                &fragment.text,
                fragment.span,
                &mut self.diags,
            ) {
                js.emit_verbatim(&expanded);
                js.emit_verbatim("\n");
                return;
            }
            // Plugin failed: fall through so the construct is still visible.
            js.emit_verbatim(&fragment.text);
            return;
        }
        let script = parse_js_fragment(&fragment.text, fragment.span, &mut self.diags);
        js.emit_script(&script);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cjmod::{CjmodExtension, CjmodScanner};

    fn compile(src: &str) -> (Artifacts, DiagnosticList) {
        let mut manager = CmodManager::new();
        let mut unit = CompileUnit::new(&mut manager);
        let artifacts = unit.compile(src, "test.chtl", Path::new("."));
        (artifacts, unit.diags)
    }

    #[test]
    fn artifacts_split_into_three_streams() {
        let (artifacts, diags) = compile(
            r#"div {
                style { color: red; }
                script { let n = 1; }
                text { "hi" }
            }"#,
        );
        assert!(!diags.has_errors(), "{:?}", diags);
        assert!(artifacts.html.contains("hi"));
        assert!(artifacts.css.contains("color: red;"));
        assert!(artifacts.js.contains("let n = 1;"));
    }

    #[test]
    fn chtljs_lowering_flows_into_js_stream() {
        let (artifacts, diags) = compile(
            "div { script { {{.box}}->listen({click: () => { x++; }}); } }",
        );
        assert!(!diags.has_errors(), "{:?}", diags);
        assert!(artifacts.js.contains("document.querySelectorAll('.box')"));
        assert!(artifacts.js.contains("addEventListener"));
        // No CHTL-JS syntax survives into the artifact.
        assert!(!artifacts.js.contains("{{"));
        assert!(!artifacts.js.contains("->"));
    }

    #[test]
    fn merged_output_appends_style_and_script_at_tail() {
        let (artifacts, _) = compile(
            "div { style { color: red; } script { let a = 1; } }",
        );
        let merged = artifacts.merged();
        let div = merged.find("<div").unwrap();
        let style = merged.find("<style>").unwrap();
        let script = merged.find("<script>").unwrap();
        assert!(div < style && style < script);
    }

    #[test]
    fn merged_output_respects_explicit_head_and_body() {
        let (artifacts, _) = compile(
            r#"html {
                head { title { text { "t" } } }
                body { div { style { color: red; } script { let a = 1; } } }
            }"#,
        );
        let merged = artifacts.merged();
        let style = merged.find("<style>").unwrap();
        let head_close = merged.find("</head>").unwrap();
        assert!(style < head_close);
        let script = merged.find("<script>").unwrap();
        let body_close = merged.find("</body>").unwrap();
        assert!(script < body_close);
    }

    #[test]
    fn named_configuration_applies_via_use() {
        let (_, diags) = compile(
            r#"[Configuration] @Config Strict { NO_SUCH_OPTION = on; }
               use @Config Strict;
               div { }"#,
        );
        // The unknown option inside the selected configuration surfaces.
        assert!(diags.has_errors());
    }

    #[test]
    fn plugin_keyword_expands_before_builtin_grammar() {
        struct Hello;
        impl CjmodExtension for Hello {
            fn name(&self) -> &str {
                "hello"
            }
            fn keywords(&self) -> Vec<String> {
                vec!["helloChtl".to_string()]
            }
            fn expand(&self, _scanner: &mut CjmodScanner) -> Result<String, String> {
                Ok("console.log('hello from plugin');".to_string())
            }
        }
        let mut manager = CmodManager::new();
        let mut unit = CompileUnit::new(&mut manager);
        unit.plugins.register(Box::new(Hello));
        let artifacts = unit.compile(
            "div { script { helloChtl({ x: 1 }); } }",
            "t.chtl",
            Path::new("."),
        );
        assert!(
            artifacts.js.contains("console.log('hello from plugin');"),
            "js was: {}",
            artifacts.js
        );
        assert!(!unit.diags.has_errors());
    }

    #[test]
    fn cjmod_import_makes_its_keyword_live() {
        use crate::cmod::{pack_directory, ModuleKind};
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("printMylove");
        fs::create_dir_all(module_dir.join("src")).unwrap();
        fs::write(
            module_dir.join("info.chtl"),
            "[Info] { name = \"printMylove\"; }",
        )
        .unwrap();
        fs::write(
            module_dir.join("src/printMylove.syntax"),
            "printMylove({ url: $, mode: $ })\nconsole.log('loving', $1, $2);",
        )
        .unwrap();
        let bytes = pack_directory(&module_dir, ModuleKind::Cjmod, true).unwrap();
        fs::write(dir.path().join("printMylove.cjmod"), bytes).unwrap();

        let src = "[Import] @CJmod printMylove from \"printMylove.cjmod\";\n\
                   div { script { printMylove({ url: heart, mode: fast }); } }";
        let mut manager = CmodManager::new();
        let mut unit = CompileUnit::new(&mut manager);
        let artifacts = unit.compile(src, "main.chtl", dir.path());
        assert!(!unit.diags.has_errors(), "{:?}", unit.diags);
        assert!(
            artifacts.js.contains("console.log('loving', heart, fast);"),
            "js was: {}",
            artifacts.js
        );
        assert!(unit.plugins.handles("printMylove"));
    }

    #[test]
    fn generator_comments_reach_html_others_do_not() {
        let (artifacts, _) = compile(
            "-- kept\n// dropped\ndiv { }",
        );
        assert!(artifacts.html.contains("<!-- kept -->"));
        assert!(!artifacts.html.contains("dropped"));
    }
}
