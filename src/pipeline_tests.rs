//! End-to-end pipeline tests.
//!
//! These exercise the documented compiler scenarios through the public API:
//! template expansion with overrides, custom specialization, variable
//! groups, CHTL-JS lowering, namespaces with `from`, and import cycles —
//! plus the cross-cutting invariants (byte-faithful scanning, no CHTL-JS
//! syntax in artifacts, errors suppress artifacts).

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::scanner::scan_source;
    use crate::{compile_source, CompileOptions};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;

    fn compile(src: &str) -> crate::CompileResult {
        compile_source(src, "test.chtl", Path::new("."), &CompileOptions::default())
    }

    fn compile_ok(src: &str) -> crate::CompileResult {
        let result = compile(src);
        assert!(
            !result.has_errors,
            "unexpected errors: {:#?}",
            result.diagnostics
        );
        result
    }

    // ── Scenario A: template expansion with override ───────────────────────

    #[test]
    fn template_expansion_with_override() {
        let result = compile_ok(
            r#"[Template] @Style Theme { color: red; font-size: 16px; }
div { style { @Style Theme; color: blue; } text { "hi" } }"#,
        );
        assert_eq!(result.html, r#"<div class="chtl-div-0">hi</div>"#);
        assert_eq!(
            result.css.trim(),
            ".chtl-div-0 { color: blue; font-size: 16px; }"
        );
    }

    // ── Scenario B: custom element with delete and insert ──────────────────

    #[test]
    fn custom_element_with_delete_and_insert() {
        let result = compile_ok(
            r#"[Custom] @Element Box { div { span; span; } }
body { @Element Box { delete span[0]; insert after span[0] { p { text { "x" } } } } }"#,
        );
        assert_eq!(
            result.html,
            "<body><div><span></span><p>x</p></div></body>"
        );
    }

    // ── Scenario C: variable group with override ───────────────────────────

    #[test]
    fn variable_group_with_override() {
        let result = compile_ok(
            r#"[Template] @Var Palette { primary: red; }
div { style { color: Palette(primary); background: Palette(primary = blue); } }"#,
        );
        let css = result.css.trim();
        assert!(css.contains("color: red;"), "css: {}", css);
        assert!(css.contains("background: blue;"), "css: {}", css);
    }

    // ── Scenario D: CHTL-JS lowering ───────────────────────────────────────

    #[test]
    fn chtljs_listen_lowering() {
        let result = compile_ok(
            "div { script { {{.box}}->listen({click: () => { x++; }}); } }",
        );
        assert!(result.js.contains("document.querySelectorAll('.box')"));
        assert!(result.js.contains("addEventListener"));
        // The handler body is preserved verbatim.
        assert!(result.js.contains("x++;"));
        // A script block produces pure JavaScript: no enhanced-selector or
        // arrow syntax survives. (`}}` alone is legal JS and may appear.)
        assert!(!result.js.contains("{{"));
        assert!(!result.js.contains("->"));
    }

    // ── Scenario E: namespace with `from` ──────────────────────────────────

    #[test]
    fn namespace_with_from_clause() {
        let result = compile_ok(
            r#"[Namespace] ui { [Custom] @Element Button { button; } }
body { @Element Button from ui; }"#,
        );
        assert_eq!(result.html, "<body><button></button></body>");
    }

    // ── Scenario F: import cycle ───────────────────────────────────────────

    #[test]
    fn import_cycle_is_one_diagnostic_and_artifacts_still_emit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.chtl"),
            "[Import] @Chtl * from \"b.chtl\";\n[Custom] @Element FromA { i; }",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.chtl"),
            "[Import] @Chtl * from \"a.chtl\";\n[Custom] @Element FromB { b; }",
        )
        .unwrap();
        fs::write(
            dir.path().join("main.chtl"),
            "[Import] @Chtl * from \"a.chtl\";\nbody { @Element FromA; @Element FromB; }",
        )
        .unwrap();

        let result = crate::compile_file(
            &dir.path().join("main.chtl"),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(!result.has_errors, "{:#?}", result.diagnostics);
        let cycles = result
            .diagnostics
            .iter()
            .filter(|d| d.contains("import cycle"))
            .count();
        assert_eq!(cycles, 1, "{:#?}", result.diagnostics);
        assert_eq!(result.html, "<body><i></i><b></b></body>");
    }

    // ── universal invariants ───────────────────────────────────────────────

    #[test]
    fn fragment_concatenation_reproduces_source() {
        let src = r#"
[Template] @Style S { color: red; }
div {
    style { @Style S; }
    script {
        let a = "{ not a brace }";
        {{.x}}->listen({ click: () => a });
    }
}
[Origin] @Html raw { <b>&</b> }
"#;
        let fragments = scan_source(src, 0, &Configuration::default());
        let rebuilt: String = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn resolvable_style_use_connects_html_and_css() {
        // The element gets at least one class the emitted CSS addresses.
        let result = compile_ok(
            r#"[Template] @Style S { color: red; }
div { style { @Style S; } }"#,
        );
        let class_start = result.html.find("class=\"").unwrap() + 7;
        let class_end = result.html[class_start..].find('"').unwrap() + class_start;
        let class = &result.html[class_start..class_end];
        assert!(
            result.css.contains(&format!(".{}", class)),
            "class {} not addressed by css {}",
            class,
            result.css
        );
    }

    #[test]
    fn deleted_target_never_reaches_the_html() {
        let result = compile_ok(
            r#"[Custom] @Element Box { div { span; em; } }
body { @Element Box { delete em; } }"#,
        );
        assert!(!result.html.contains("<em>"));
        assert!(result.html.contains("<span>"));
    }

    #[test]
    fn errors_suppress_artifacts() {
        let result = compile("body { @Element Missing; }");
        assert!(result.has_errors);
        assert!(result.html.is_empty());
        assert!(result.css.is_empty());
        assert!(result.js.is_empty());
        assert!(result.merged.is_empty());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn warnings_ship_artifacts_plus_the_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.chtl"),
            "[Custom] @Element B { b; }",
        )
        .unwrap();
        fs::write(
            dir.path().join("main.chtl"),
            "[Import] @Element B from \"lib.chtl\";\n\
             [Import] @Element B from \"lib.chtl\";\n\
             body { @Element B; }",
        )
        .unwrap();
        let result = crate::compile_file(
            &dir.path().join("main.chtl"),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(!result.has_errors);
        assert!(!result.diagnostics.is_empty());
        assert!(result.html.contains("<b></b>"));
    }

    #[test]
    fn diagnostics_render_with_location_and_caret() {
        let result = compile("body { @Element Missing; }");
        let rendered = &result.diagnostics[0];
        assert!(rendered.starts_with("error: test.chtl:1:"), "{}", rendered);
        assert!(rendered.contains('^'), "{}", rendered);
    }

    #[test]
    fn keyword_renaming_via_configuration() {
        let result = compile_ok(
            r#"[Configuration] { [Name] { KEYWORD_TEMPLATE = "[Tpl]"; } }
[Tpl] @Style S { color: red; }
div { style { @Style S; } }"#,
        );
        assert!(result.css.contains("color: red;"));
    }

    #[test]
    fn index_initial_count_shifts_indices() {
        let result = compile_ok(
            r#"[Configuration] { INDEX_INITIAL_COUNT = 1; }
[Custom] @Element Box { div { span; em; } }
body { @Element Box { delete span[1]; } }"#,
        );
        // With base 1, span[1] is the first span.
        assert!(!result.html.contains("<span>"));
        assert!(result.html.contains("<em>"));
    }

    #[test]
    fn use_html5_emits_doctype() {
        let result = compile_ok("use html5; html { body { div; } }");
        assert!(result.html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn merged_single_file_output_contains_all_three() {
        let result = compile_ok(
            r#"div { style { color: red; } script { let a = 1; } text { "t" } }"#,
        );
        assert!(result.merged.contains("<div"));
        assert!(result.merged.contains("<style>"));
        assert!(result.merged.contains("<script>"));
    }

    #[test]
    fn custom_style_inherit_overlay() {
        let result = compile_ok(
            r#"[Template] @Style Base { color: red; margin: 0; }
[Custom] @Style Fancy { inherit @Style Base; color: blue; }
div { style { @Style Fancy; } }"#,
        );
        let css = result.css.trim();
        assert!(css.contains("color: blue;"), "css: {}", css);
        assert!(css.contains("margin: 0;"), "css: {}", css);
        assert!(!css.contains("color: red;"), "css: {}", css);
    }

    #[test]
    fn delegate_and_animate_runtime_preludes_present() {
        let result = compile_ok(
            r#"div {
    script {
        {{#menu}}->delegate({target: {{.item}}, click: handle});
        animate({ target: {{.box}}, duration: 200 });
    }
}"#,
        );
        assert!(result.js.contains("__CHTL_DELEGATE__"));
        assert!(result.js.contains("__chtlAnimate"));
        assert!(result.js.contains("requestAnimationFrame"));
    }

    #[test]
    fn cjmod_import_expands_through_the_file_pipeline() {
        use crate::cmod::{pack_directory, ModuleKind};

        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("printMylove");
        fs::create_dir_all(module_dir.join("src")).unwrap();
        fs::write(
            module_dir.join("info.chtl"),
            "[Info] { name = \"printMylove\"; version = \"1.0.0\"; }",
        )
        .unwrap();
        fs::write(
            module_dir.join("src/printMylove.syntax"),
            "printMylove({ url: $, mode: $ })\nconsole.log('loving', $1, $2);",
        )
        .unwrap();
        let bytes = pack_directory(&module_dir, ModuleKind::Cjmod, true).unwrap();
        fs::write(dir.path().join("printMylove.cjmod"), bytes).unwrap();

        fs::write(
            dir.path().join("main.chtl"),
            "[Import] @CJmod printMylove from \"printMylove.cjmod\";\n\
             div { script { printMylove({ url: heart, mode: fast }); } }",
        )
        .unwrap();

        let result = crate::compile_file(
            &dir.path().join("main.chtl"),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(!result.has_errors, "{:#?}", result.diagnostics);
        assert!(
            result.js.contains("console.log('loving', heart, fast);"),
            "js: {}",
            result.js
        );
        // The plugin's construct never leaks into the artifact.
        assert!(!result.js.contains("printMylove("));
    }

    #[test]
    fn vir_identity_preserved_across_call_sites() {
        let result = compile_ok(
            r#"div {
    script {
        vir V = listen({ click: f });
        V->click();
        V->click();
    }
}"#,
        );
        assert!(result.js.contains("__CHTL_VIR__['V'] = {click: f}"));
        assert_eq!(result.js.matches("__CHTL_VIR__['V'].click()").count(), 2);
    }
}
