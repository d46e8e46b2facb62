//! Import and namespace resolution.
//!
//! Turns `[Import]` declarations into loaded, registered symbols:
//!
//! - relative paths resolve against the importing file's directory;
//! - bare names search the module search paths in order, first match wins;
//! - `.chtl` sources load directly, `.cmod`/`.cjmod` go through the module
//!   manager;
//! - a whole-file import links the file's symbols under a namespace named
//!   after the file; named imports additionally surface one symbol at the
//!   importing file's root; wildcards surface every `[Export]`ed symbol (or
//!   everything, when no export list exists);
//! - `as alias` surfaces the symbol under the alias — local to this compile,
//!   never written back into the source namespace.
//!
//! Cycles: the loader keeps the active DFS stack; an edge closing a cycle is
//! a warning and the second visit is skipped. Duplicate imports of the same
//! symbol are warnings too — both leave the artifacts flowing.

use crate::ast::{Document, ImportDecl, Node};
use crate::cjmod::{CjmodRegistry, DeclaredExtension};
use crate::cmod::{CmodManager, LoadedModule, ModuleKind};
use crate::config::Configuration;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticList};
use crate::global_map::{register_document, GlobalMap, Symbol, SymbolBody, SymbolKind};
use crate::lexer::lex_fragments;
use crate::parser::parse_tokens;
use crate::scanner::scan_source;
use crate::span::{SourceMap, Span};
use crate::token::{KeywordTable, TypeKw};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Importer<'a> {
    config: &'a Configuration,
    manager: &'a mut CmodManager,
    /// Script-side extension registry; `[Import] @CJmod` populates it.
    plugins: &'a mut CjmodRegistry,
    /// Files currently being loaded (DFS stack), canonicalized.
    loading: Vec<PathBuf>,
    /// Files already linked once.
    loaded: HashSet<PathBuf>,
    /// `(kind tag, name)` pairs surfaced into the root file.
    surfaced: HashSet<(String, String)>,
}

impl<'a> Importer<'a> {
    pub fn new(
        config: &'a Configuration,
        manager: &'a mut CmodManager,
        plugins: &'a mut CjmodRegistry,
    ) -> Self {
        Importer {
            config,
            manager,
            plugins,
            loading: Vec::new(),
            loaded: HashSet::new(),
            surfaced: HashSet::new(),
        }
    }

    /// Mark the entry file as being loaded so cycles back into it are caught.
    pub fn begin_root(&mut self, path: &Path) {
        let canonical = canonical(path);
        self.loading.push(canonical);
    }

    /// Process every `[Import]` in `doc`, loading and linking into `map`.
    pub fn process_imports(
        &mut self,
        doc: &Document,
        base_dir: &Path,
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) {
        let imports = collect_imports(doc);
        for import in imports {
            self.process_one(&import, base_dir, map, sources, diags);
        }
    }

    fn process_one(
        &mut self,
        import: &ImportDecl,
        base_dir: &Path,
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) {
        match &import.kind {
            // Symbol-kind imports share the source-loading and surfacing
            // path: the kind only narrows what `surface_for_import` links.
            TypeKw::Chtl | TypeKw::Config | TypeKw::Style | TypeKw::Element | TypeKw::Var => {
                self.import_chtl(import, base_dir, map, sources, diags);
            }
            TypeKw::Html | TypeKw::JavaScript => {
                self.import_raw(import, base_dir, map, diags);
            }
            TypeKw::CJmod => {
                self.import_cjmod(import, base_dir, diags);
            }
            TypeKw::Custom(tag) => {
                let tag = tag.clone();
                if self.config.is_known_origin_type(&tag) {
                    self.import_raw(import, base_dir, map, diags);
                } else {
                    diags.error(
                        DiagnosticKind::MalformedImport(format!("unknown import kind @{}", tag)),
                        import.span,
                    );
                }
            }
        }
    }

    // ── .chtl / module loading ─────────────────────────────────────────────

    fn import_chtl(
        &mut self,
        import: &ImportDecl,
        base_dir: &Path,
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) {
        let path = match self.resolve_source_path(&import.from_path, base_dir) {
            Some(p) => p,
            None => {
                // Not a loose source; a packed module may carry the name.
                if self.link_module(&import.from_path, import, map, sources, diags) {
                    return;
                }
                diags.error(
                    DiagnosticKind::ImportNotFound(import.from_path.clone()),
                    import.span,
                );
                return;
            }
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("cmod") | Some("cjmod") => {
                let name = module_name_of(&path);
                if let Some(module) = self.manager.load_path(&path, &name, diags) {
                    self.link_loaded_module(&module, import, map, sources, diags);
                }
            }
            // `@Style theme.css` and friends embed the file verbatim.
            Some("css") | Some("js") | Some("html") | Some("htm") => {
                self.import_raw(import, base_dir, map, diags);
            }
            _ => {
                self.link_source_file(&path, import, map, sources, diags);
            }
        }
    }

    fn link_module(
        &mut self,
        name: &str,
        import: &ImportDecl,
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) -> bool {
        let module = match self.manager.load(name, &mut DiagnosticList::new()) {
            Some(m) => m.clone(),
            None => return false,
        };
        self.link_loaded_module(&module, import, map, sources, diags);
        true
    }

    fn link_loaded_module(
        &mut self,
        module: &crate::cmod::LoadedModule,
        import: &ImportDecl,
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) {
        if module.kind == ModuleKind::Cjmod {
            // Script-side extensions, whatever import kind found the archive.
            self.register_cjmod_extensions(module, import.span, diags);
            return;
        }
        let ns = vec![module.name.clone()];
        for (name, text) in &module.sources {
            let virtual_name = format!("{}:{}", module.name, name);
            self.link_source_text(&virtual_name, text, &ns, map, sources, diags);
        }
        // Wildcards surface the export list (or everything when absent).
        if import.wildcard {
            let exported = module.export.all_names();
            self.surface_namespace(&module.name, &exported, import, map, diags);
        } else if let Some(symbol_name) = &import.name {
            self.surface_symbol(&module.name, symbol_name, import, map, diags);
        }
    }

    fn link_source_file(
        &mut self,
        path: &Path,
        import: &ImportDecl,
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) {
        let canonical_path = canonical(path);
        if self.loading.contains(&canonical_path) {
            let chain = self
                .loading
                .iter()
                .map(|p| module_name_of(p))
                .chain(std::iter::once(module_name_of(&canonical_path)))
                .collect::<Vec<_>>()
                .join(" -> ");
            diags.push(Diagnostic::warning(
                DiagnosticKind::ImportCycle(chain),
                import.span,
            ));
            return;
        }
        let ns_name = module_name_of(path);
        if self.loaded.contains(&canonical_path) {
            // Already linked; only surfacing may remain.
            self.surface_for_import(&ns_name, import, map, diags);
            return;
        }
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                diags.error(
                    DiagnosticKind::ImportNotFound(format!("{}: {}", path.display(), e)),
                    import.span,
                );
                return;
            }
        };
        self.loading.push(canonical_path.clone());
        let ns = vec![ns_name.clone()];
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        self.link_source_text_with_imports(
            &path.display().to_string(),
            &text,
            &ns,
            &dir,
            map,
            sources,
            diags,
        );
        self.loading.pop();
        self.loaded.insert(canonical_path);
        self.surface_for_import(&ns_name, import, map, diags);
    }

    fn link_source_text(
        &mut self,
        name: &str,
        text: &str,
        namespace: &[String],
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) {
        let file = sources.add_file(name, text);
        let text = sources.text(file).to_string();
        let fragments = scan_source(&text, file, self.config);
        let table = KeywordTable::from_config(self.config);
        let tokens = lex_fragments(&fragments, &table, diags);
        let doc = parse_tokens(tokens, self.config, diags);
        register_document(&doc, &fragments, map, namespace, diags);
    }

    fn link_source_text_with_imports(
        &mut self,
        name: &str,
        text: &str,
        namespace: &[String],
        dir: &Path,
        map: &mut GlobalMap,
        sources: &mut SourceMap,
        diags: &mut DiagnosticList,
    ) {
        let file = sources.add_file(name, text);
        let text = sources.text(file).to_string();
        let fragments = scan_source(&text, file, self.config);
        let table = KeywordTable::from_config(self.config);
        let tokens = lex_fragments(&fragments, &table, diags);
        let doc = parse_tokens(tokens, self.config, diags);
        register_document(&doc, &fragments, map, namespace, diags);
        // The imported file's own imports load before its symbols are used.
        self.process_imports(&doc, dir, map, sources, diags);
    }

    // ── named / wildcard surfacing ─────────────────────────────────────────

    fn surface_for_import(
        &mut self,
        ns_name: &str,
        import: &ImportDecl,
        map: &mut GlobalMap,
        diags: &mut DiagnosticList,
    ) {
        if import.wildcard {
            let info = map.namespace(ns_name);
            let names: Vec<String> = match info {
                Some(info) if !info.exports.is_empty() => info.exports.clone(),
                _ => map
                    .symbols_in_namespace(ns_name)
                    .map(|s| s.simple_name.clone())
                    .collect(),
            };
            self.surface_namespace(ns_name, &names, import, map, diags);
        } else if let Some(symbol_name) = &import.name {
            self.surface_symbol(ns_name, symbol_name, import, map, diags);
        }
        // A plain whole-file import leaves symbols addressable via
        // `from <ns>` only.
    }

    fn surface_namespace(
        &mut self,
        ns_name: &str,
        names: &[String],
        import: &ImportDecl,
        map: &mut GlobalMap,
        diags: &mut DiagnosticList,
    ) {
        if !self.config.allow_wildcard_import {
            diags.error(DiagnosticKind::WildcardDisabled, import.span);
            return;
        }
        let mut sorted: Vec<String> = names.to_vec();
        sorted.sort();
        sorted.dedup();
        for name in sorted {
            self.surface_symbol(ns_name, &name, import, map, diags);
        }
    }

    /// Clone one symbol from a module namespace to the root of the current
    /// compile, honoring the alias.
    fn surface_symbol(
        &mut self,
        ns_name: &str,
        symbol_name: &str,
        import: &ImportDecl,
        map: &mut GlobalMap,
        diags: &mut DiagnosticList,
    ) {
        let ns_path = vec![ns_name.to_string()];
        let kinds = kinds_for_import(&import.kind);
        let found = kinds
            .iter()
            .find_map(|k| map.lookup_from(symbol_name, &ns_path, std::slice::from_ref(k)))
            .cloned();
        let symbol = match found {
            Some(s) => s,
            None => {
                diags.error(
                    DiagnosticKind::UnresolvedSymbol {
                        kind: format!("{}", import.kind),
                        name: format!("{}.{}", ns_name, symbol_name),
                    },
                    import.span,
                );
                return;
            }
        };
        let surfaced_name = import
            .alias
            .clone()
            .unwrap_or_else(|| symbol.simple_name.clone());
        let key = (symbol.kind.describe(), surfaced_name.clone());
        if !self.surfaced.insert(key) {
            diags.push(Diagnostic::warning(
                DiagnosticKind::DuplicateImport(surfaced_name.clone()),
                import.span,
            ));
            return;
        }
        let mut clone = symbol;
        clone.simple_name = surfaced_name.clone();
        clone.namespace_path = Vec::new();
        clone.fully_qualified_name = surfaced_name;
        // Inherits inside the module still resolve there: qualify them.
        for parent in &mut clone.inherits {
            if parent.from_namespace.is_none() && !parent.name.contains('.') {
                parent.from_namespace = Some(ns_path.clone());
            }
        }
        let span = clone.span;
        let name = clone.fully_qualified_name.clone();
        if map.register(clone).is_err() {
            diags.error(DiagnosticKind::DuplicateDeclaration(name), span);
        }
    }

    // ── raw (origin) imports ───────────────────────────────────────────────

    fn import_raw(
        &mut self,
        import: &ImportDecl,
        base_dir: &Path,
        map: &mut GlobalMap,
        diags: &mut DiagnosticList,
    ) {
        let path = match self.resolve_source_path(&import.from_path, base_dir) {
            Some(p) => p,
            None => {
                diags.error(
                    DiagnosticKind::ImportNotFound(import.from_path.clone()),
                    import.span,
                );
                return;
            }
        };
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                diags.error(
                    DiagnosticKind::ImportNotFound(format!("{}: {}", path.display(), e)),
                    import.span,
                );
                return;
            }
        };
        let tag = match &import.kind {
            TypeKw::Html => "Html",
            TypeKw::JavaScript => "JavaScript",
            TypeKw::Style => "Style",
            TypeKw::Custom(tag) => tag.as_str(),
            _ => "Html",
        };
        let name = import
            .alias
            .clone()
            .or_else(|| import.name.clone())
            .unwrap_or_else(|| module_name_of(&path));
        let symbol = Symbol::new(
            SymbolKind::for_origin(tag),
            &name,
            Vec::new(),
            import.span,
            SymbolBody::Origin(text),
        );
        if map.register(symbol).is_err() {
            diags.error(DiagnosticKind::DuplicateDeclaration(name), import.span);
        }
    }

    fn import_cjmod(&mut self, import: &ImportDecl, base_dir: &Path, diags: &mut DiagnosticList) {
        let name = import
            .name
            .clone()
            .unwrap_or_else(|| module_name_of(Path::new(&import.from_path)));
        let module = match self.resolve_source_path(&import.from_path, base_dir) {
            Some(path) => self.manager.load_path(&path, &name, diags),
            None => self.manager.load(&name, diags).cloned(),
        };
        let module = match module {
            Some(m) => m,
            None => return,
        };
        log::info!("cjmod `{}` loaded", module.name);
        self.register_cjmod_extensions(&module, import.span, diags);
    }

    /// Register every syntax declaration a CJMOD carries as a live handler.
    /// Keywords already claimed (by the pre-scan pass or a host extension)
    /// are left alone.
    fn register_cjmod_extensions(
        &mut self,
        module: &LoadedModule,
        span: Span,
        diags: &mut DiagnosticList,
    ) {
        for (stem, text) in &module.syntax_sources {
            match DeclaredExtension::parse(stem, text) {
                Ok(extension) => {
                    if !self.plugins.handles(extension.keyword()) {
                        self.plugins.register(Box::new(extension));
                    }
                }
                Err(message) => diags.error(DiagnosticKind::Plugin(message), span),
            }
        }
    }

    // ── path resolution ────────────────────────────────────────────────────

    /// Relative path first, then the module search paths, trying the path
    /// as written plus `.chtl`, `.cmod` and `.cjmod` suffixes.
    fn resolve_source_path(&self, from_path: &str, base_dir: &Path) -> Option<PathBuf> {
        let candidates = |base: &Path| -> Option<PathBuf> {
            let direct = base.join(from_path);
            if direct.is_file() {
                return Some(direct);
            }
            for ext in ["chtl", "cmod", "cjmod"] {
                let with_ext = base.join(format!("{}.{}", from_path, ext));
                if with_ext.is_file() {
                    return Some(with_ext);
                }
            }
            None
        };
        if let Some(found) = candidates(base_dir) {
            return Some(found);
        }
        for search in self.manager.search_paths().to_vec() {
            if let Some(found) = candidates(&search) {
                return Some(found);
            }
        }
        None
    }
}

fn collect_imports(doc: &Document) -> Vec<ImportDecl> {
    let mut imports = Vec::new();
    fn walk(nodes: &[Node], imports: &mut Vec<ImportDecl>) {
        for node in nodes {
            match node {
                Node::ImportDecl(i) => imports.push(i.clone()),
                Node::NamespaceDecl(ns) => walk(&ns.members, imports),
                _ => {}
            }
        }
    }
    walk(&doc.children, &mut imports);
    imports
}

fn kinds_for_import(kind: &TypeKw) -> Vec<SymbolKind> {
    match kind {
        TypeKw::Style => vec![SymbolKind::CustomStyle, SymbolKind::TemplateStyle],
        TypeKw::Element => vec![SymbolKind::CustomElement, SymbolKind::TemplateElement],
        TypeKw::Var => vec![SymbolKind::CustomVar, SymbolKind::TemplateVar],
        TypeKw::Config => vec![SymbolKind::Configuration],
        _ => vec![
            SymbolKind::CustomStyle,
            SymbolKind::TemplateStyle,
            SymbolKind::CustomElement,
            SymbolKind::TemplateElement,
            SymbolKind::CustomVar,
            SymbolKind::TemplateVar,
            SymbolKind::Configuration,
        ],
    }
}

fn module_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global_map::element_use_kinds;
    use std::fs;

    fn parse_doc(src: &str, config: &Configuration) -> Document {
        let frags = scan_source(src, 0, config);
        let table = KeywordTable::from_config(config);
        let mut diags = DiagnosticList::new();
        let tokens = lex_fragments(&frags, &table, &mut diags);
        parse_tokens(tokens, config, &mut diags)
    }

    fn run_imports(
        src: &str,
        dir: &Path,
    ) -> (GlobalMap, DiagnosticList) {
        let (map, diags, _) = run_imports_with_plugins(src, dir);
        (map, diags)
    }

    fn run_imports_with_plugins(
        src: &str,
        dir: &Path,
    ) -> (GlobalMap, DiagnosticList, CjmodRegistry) {
        let config = Configuration::default();
        let doc = parse_doc(src, &config);
        let mut manager = CmodManager::new();
        let mut plugins = CjmodRegistry::new();
        let mut map = GlobalMap::new();
        let mut sources = SourceMap::new();
        let mut diags = DiagnosticList::new();
        let mut importer = Importer::new(&config, &mut manager, &mut plugins);
        importer.process_imports(&doc, dir, &mut map, &mut sources, &mut diags);
        (map, diags, plugins)
    }

    #[test]
    fn named_import_surfaces_one_symbol() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.chtl"),
            "[Custom] @Element Button { button { } } [Custom] @Element Hidden { i { } }",
        )
        .unwrap();

        let (map, diags) = run_imports(
            "[Import] @Element Button from \"lib.chtl\";",
            dir.path(),
        );
        assert!(!diags.has_errors(), "{:?}", diags);
        // Surfaced at root.
        assert!(map.lookup("Button", &element_use_kinds(), &[]).is_some());
        // The sibling stayed inside the module namespace.
        assert!(map.lookup("Hidden", &element_use_kinds(), &[]).is_none());
        assert!(map
            .lookup_from("Hidden", &["lib".to_string()], &element_use_kinds())
            .is_some());
    }

    #[test]
    fn alias_is_local_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.chtl"),
            "[Custom] @Element Button { button { } }",
        )
        .unwrap();

        let (map, _) = run_imports(
            "[Import] @Element Button from \"lib.chtl\" as Btn;",
            dir.path(),
        );
        assert!(map.lookup("Btn", &element_use_kinds(), &[]).is_some());
        assert!(map.lookup("Button", &element_use_kinds(), &[]).is_none());
        // The source namespace is untouched by the alias.
        assert!(map
            .lookup_from("Button", &["lib".to_string()], &element_use_kinds())
            .is_some());
    }

    #[test]
    fn wildcard_honors_export_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.chtl"),
            "[Export] { @Element Pub; }\n\
             [Custom] @Element Pub { b { } } [Custom] @Element Priv { i { } }",
        )
        .unwrap();

        let (map, diags) = run_imports(
            "[Import] @Chtl * from \"lib.chtl\";",
            dir.path(),
        );
        assert!(!diags.has_errors(), "{:?}", diags);
        assert!(map.lookup("Pub", &element_use_kinds(), &[]).is_some());
        assert!(map.lookup("Priv", &element_use_kinds(), &[]).is_none());
    }

    #[test]
    fn wildcard_without_exports_takes_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.chtl"),
            "[Custom] @Element A { b { } } [Custom] @Element B { i { } }",
        )
        .unwrap();

        let (map, _) = run_imports("[Import] @Chtl * from \"lib.chtl\";", dir.path());
        assert!(map.lookup("A", &element_use_kinds(), &[]).is_some());
        assert!(map.lookup("B", &element_use_kinds(), &[]).is_some());
    }

    #[test]
    fn cycle_is_one_warning_and_content_still_links() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.chtl"),
            "[Import] @Chtl * from \"b.chtl\";\n[Custom] @Element FromA { b { } }",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.chtl"),
            "[Import] @Chtl * from \"a.chtl\";\n[Custom] @Element FromB { i { } }",
        )
        .unwrap();

        let (map, diags) = run_imports("[Import] @Chtl * from \"a.chtl\";", dir.path());
        // Not fatal: artifacts may still be produced.
        assert!(!diags.has_errors(), "{:?}", diags);
        let cycle_count = diags
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::ImportCycle(_)))
            .count();
        assert_eq!(cycle_count, 1);
        assert!(map.lookup("FromA", &element_use_kinds(), &[]).is_some());
        assert!(map.lookup("FromB", &element_use_kinds(), &[]).is_some());
    }

    #[test]
    fn duplicate_import_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.chtl"),
            "[Custom] @Element Button { button { } }",
        )
        .unwrap();

        let (_, diags) = run_imports(
            "[Import] @Element Button from \"lib.chtl\";\n\
             [Import] @Element Button from \"lib.chtl\";",
            dir.path(),
        );
        assert!(!diags.has_errors());
        assert!(diags
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::DuplicateImport(_))));
    }

    #[test]
    fn missing_file_is_an_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, diags) = run_imports("[Import] @Chtl from \"nope.chtl\";", dir.path());
        assert!(diags.has_errors());
    }

    #[test]
    fn cjmod_import_registers_declared_keywords() {
        use crate::cmod::{pack_directory, ModuleKind};

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

        let (_, diags, plugins) = run_imports_with_plugins(
            "[Import] @CJmod printMylove from \"printMylove.cjmod\";",
            dir.path(),
        );
        assert!(!diags.has_errors(), "{:?}", diags);
        assert!(plugins.handles("printMylove"));
    }

    #[test]
    fn html_import_becomes_an_origin_symbol() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("banner.html"), "<header>hi</header>").unwrap();

        let (map, diags) = run_imports(
            "[Import] @Html from \"banner.html\" as Banner;",
            dir.path(),
        );
        assert!(!diags.has_errors(), "{:?}", diags);
        let sym = map
            .lookup("Banner", &[SymbolKind::OriginHtml], &[])
            .unwrap();
        assert!(matches!(&sym.body, SymbolBody::Origin(t) if t.contains("<header>")));
    }
}
