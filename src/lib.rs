//! # CHTL Compiler
//!
//! One source language, three artifacts: CHTL unifies HTML structure, CSS
//! styling and an extended scripting dialect (CHTL-JS); this crate compiles
//! it into HTML, CSS and JavaScript that together form a runnable page.
//!
//! ## Pipeline Invariants
//!
//! 1. **Scanner first, byte-faithful**: the unified scanner slices mixed
//!    source into typed fragments on grammatically complete seams;
//!    concatenating fragment texts reproduces the source byte for byte.
//!
//! 2. **Configuration before everything**: `[Configuration]` blocks are read
//!    in a pre-pass because they can rebind keyword spellings; the lexer's
//!    keyword tables are built from the resulting configuration.
//!
//! 3. **Symbols registered once, read immutably**: the GlobalMap is mutated
//!    only by the registration pass and the import linker; the emitters walk
//!    registered bodies with a fresh context per use site.
//!
//! 4. **Diagnostics are values**: stages collect into a `DiagnosticList` and
//!    keep going. A compile with error-severity diagnostics never publishes
//!    artifacts; warnings ship artifacts plus the list.
//!
//! 5. **Script output is pure JavaScript**: every CHTL-JS construct has one
//!    canonical lowering; no `{{…}}` or `->` ever reaches the artifact.
//!
//! 6. **Units are independent**: one compile context per source file, no
//!    shared mutable state — multi-file builds parallelize trivially.

pub mod ast;
pub mod cache;
pub mod cjmod;
pub mod cmod;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod emitter;
pub mod global_map;
pub mod js_emitter;
pub mod js_lexer;
pub mod js_parser;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod span;
pub mod state;
pub mod token;

#[cfg(test)]
mod pipeline_tests;

use cache::IncrementalCache;
use cjmod::CjmodRegistry;
use cmod::CmodManager;
use dispatcher::{Artifacts, CompileUnit};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Options for one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Module search paths, in priority order.
    pub module_paths: Vec<PathBuf>,
    /// Verbose diagnostics (also set by `DEBUG_MODE` in the source).
    pub debug: bool,
    /// Reuse cached artifacts for unchanged, self-contained sources.
    pub use_cache: bool,
}

/// Result of one compilation unit.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub html: String,
    pub css: String,
    pub js: String,
    /// Single-file output with CSS and JS inlined.
    pub merged: String,
    pub has_errors: bool,
    /// Rendered diagnostics, errors and warnings alike.
    pub diagnostics: Vec<String>,
    /// `SPLIT_OUTPUT` was set: write `.css`/`.js` siblings next to the HTML.
    pub split_output: bool,
}

/// Compile one source text. `file_name` is used in diagnostics; `base_dir`
/// anchors relative imports.
pub fn compile_source(
    source: &str,
    file_name: &str,
    base_dir: &Path,
    options: &CompileOptions,
) -> CompileResult {
    compile_with_plugins(source, file_name, base_dir, options, CjmodRegistry::new())
}

/// Compile with script-side extensions pre-registered. The unit takes
/// ownership of the registry; `[Import] @CJmod` declarations in the source
/// add their handlers to it during the compile.
pub fn compile_with_plugins(
    source: &str,
    file_name: &str,
    base_dir: &Path,
    options: &CompileOptions,
    plugins: CjmodRegistry,
) -> CompileResult {
    let mut manager = CmodManager::new();
    for path in &options.module_paths {
        manager.add_search_path(path.clone());
    }

    let mut unit = CompileUnit::new(&mut manager);
    unit.plugins = plugins;
    unit.config.debug_mode |= options.debug;
    let artifacts = unit.compile(source, file_name, base_dir);

    let has_errors = unit.diags.has_errors();
    let debug = unit.config.debug_mode;
    let diagnostics: Vec<String> = unit
        .diags
        .iter()
        .map(|d| d.render(&unit.sources, debug))
        .collect();

    let (html, css, js, merged) = if has_errors {
        // Errors suppress artifacts entirely.
        (String::new(), String::new(), String::new(), String::new())
    } else {
        let merged = artifacts.merged();
        (artifacts.html, artifacts.css, artifacts.js, merged)
    };
    CompileResult {
        html,
        css,
        js,
        merged,
        has_errors,
        diagnostics,
        split_output: unit.config.split_output,
    }
}

/// Compile a file from disk, with the cache consulted for self-contained
/// sources when enabled.
pub fn compile_file(path: &Path, options: &CompileOptions) -> std::io::Result<CompileResult> {
    compile_file_with_plugins(path, options, CjmodRegistry::new())
}

/// `compile_file` with a caller-supplied extension registry. The registry is
/// handed to the compile unit, which also fills it from `[Import] @CJmod`
/// declarations it encounters.
pub fn compile_file_with_plugins(
    path: &Path,
    options: &CompileOptions,
    plugins: CjmodRegistry,
) -> std::io::Result<CompileResult> {
    let source = std::fs::read_to_string(path)?;
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

    let cacheable = options.use_cache && !source.contains("[Import]");
    let cache_key = path.display().to_string();
    if cacheable {
        let cache = IncrementalCache::new();
        if let Some(artifacts) = cache.get(&cache_key, &source) {
            log::debug!("cache hit for {}", cache_key);
            let merged = artifacts.merged();
            return Ok(CompileResult {
                html: artifacts.html,
                css: artifacts.css,
                js: artifacts.js,
                merged,
                has_errors: false,
                diagnostics: Vec::new(),
                split_output: false,
            });
        }
    }

    let result = compile_with_plugins(&source, &file_name, &base_dir, options, plugins);
    if cacheable && !result.has_errors && result.diagnostics.is_empty() {
        let cache = IncrementalCache::new();
        cache.set(
            &cache_key,
            &source,
            &Artifacts {
                html: result.html.clone(),
                css: result.css.clone(),
                js: result.js.clone(),
            },
        );
    }
    Ok(result)
}

/// Compile many independent files, one pipeline per file.
pub fn compile_files(
    paths: &[PathBuf],
    options: &CompileOptions,
) -> Vec<(PathBuf, std::io::Result<CompileResult>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), compile_file(path, options)))
        .collect()
}
