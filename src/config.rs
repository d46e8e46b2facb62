//! Per-compile configuration.
//!
//! `[Configuration]` blocks are read in a pre-pass before any other parsing,
//! because they can rebind keyword spellings (`[Name]`) and register
//! user-defined origin tags (`[OriginType]`) that the lexer and scanner need.
//! All downstream components read from the resulting `Configuration`.

use crate::diagnostics::{DiagnosticKind, DiagnosticList};
use crate::span::{Cursor, FileId, Span};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Stable identifiers for every rebindable keyword.
/// The `[Name]` group addresses keywords by these names.
pub const KEYWORD_DEFAULTS: &[(&str, &str)] = &[
    ("KEYWORD_TEMPLATE", "[Template]"),
    ("KEYWORD_CUSTOM", "[Custom]"),
    ("KEYWORD_ORIGIN", "[Origin]"),
    ("KEYWORD_IMPORT", "[Import]"),
    ("KEYWORD_NAMESPACE", "[Namespace]"),
    ("KEYWORD_CONFIGURATION", "[Configuration]"),
    ("KEYWORD_INFO", "[Info]"),
    ("KEYWORD_EXPORT", "[Export]"),
    ("KEYWORD_NAME", "[Name]"),
    ("KEYWORD_ORIGINTYPE", "[OriginType]"),
    ("KEYWORD_TEXT", "text"),
    ("KEYWORD_STYLE", "style"),
    ("KEYWORD_SCRIPT", "script"),
    ("KEYWORD_INHERIT", "inherit"),
    ("KEYWORD_DELETE", "delete"),
    ("KEYWORD_INSERT", "insert"),
    ("KEYWORD_AFTER", "after"),
    ("KEYWORD_BEFORE", "before"),
    ("KEYWORD_REPLACE", "replace"),
    ("KEYWORD_ATTOP", "at top"),
    ("KEYWORD_ATBOTTOM", "at bottom"),
    ("KEYWORD_FROM", "from"),
    ("KEYWORD_AS", "as"),
    ("KEYWORD_EXCEPT", "except"),
    ("KEYWORD_USE", "use"),
    ("KEYWORD_VIR", "vir"),
    ("KEYWORD_AT_STYLE", "@Style"),
    ("KEYWORD_AT_ELEMENT", "@Element"),
    ("KEYWORD_AT_VAR", "@Var"),
    ("KEYWORD_AT_HTML", "@Html"),
    ("KEYWORD_AT_JAVASCRIPT", "@JavaScript"),
    ("KEYWORD_AT_CHTL", "@Chtl"),
    ("KEYWORD_AT_CJMOD", "@CJmod"),
    ("KEYWORD_AT_CONFIG", "@Config"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub debug_mode: bool,
    /// Base for `tag[n]` index access.
    pub index_initial_count: i64,
    /// When set, `[Name]` groups are rejected.
    pub disable_name_group: bool,
    pub allow_wildcard_import: bool,
    /// Keep `//` and `/* */` comments in emitted output.
    pub preserve_comments: bool,
    /// Write `.css`/`.js` siblings next to the `.html` artifact.
    pub split_output: bool,
    /// Rebindings applied by `[Name]`, keyed by `KEYWORD_*` id.
    keyword_spellings: HashMap<String, String>,
    /// User-defined origin tags registered via `[OriginType]`, without the `@`.
    origin_types: HashSet<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            debug_mode: false,
            index_initial_count: 0,
            disable_name_group: false,
            allow_wildcard_import: true,
            preserve_comments: false,
            split_output: false,
            keyword_spellings: KEYWORD_DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            origin_types: HashSet::new(),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current spelling for a keyword id, e.g. `KEYWORD_TEMPLATE` → `"[Template]"`.
    pub fn keyword(&self, id: &str) -> &str {
        self.keyword_spellings
            .get(id)
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Reverse lookup: which keyword id is spelled `spelling`?
    pub fn keyword_id_of(&self, spelling: &str) -> Option<&str> {
        self.keyword_spellings
            .iter()
            .find(|(_, v)| v.as_str() == spelling)
            .map(|(k, _)| k.as_str())
    }

    pub fn rebind_keyword(
        &mut self,
        id: &str,
        spelling: &str,
        span: Span,
        diags: &mut DiagnosticList,
    ) {
        if self.disable_name_group {
            diags.error(DiagnosticKind::IllegalKeywordRename(id.to_string()), span);
            return;
        }
        if spelling.is_empty() || !self.keyword_spellings.contains_key(id) {
            diags.error(DiagnosticKind::IllegalKeywordRename(id.to_string()), span);
            return;
        }
        self.keyword_spellings
            .insert(id.to_string(), spelling.to_string());
    }

    pub fn register_origin_type(&mut self, tag: &str) {
        self.origin_types.insert(tag.trim_start_matches('@').to_string());
    }

    /// Built-in origin tags plus everything `[OriginType]` registered.
    pub fn is_known_origin_type(&self, tag: &str) -> bool {
        matches!(tag, "Html" | "Style" | "JavaScript") || self.origin_types.contains(tag)
    }

    pub fn set_option(&mut self, key: &str, value: &str, span: Span, diags: &mut DiagnosticList) {
        let truthy = matches!(value, "true" | "1" | "on" | "yes");
        match key {
            "DEBUG_MODE" => self.debug_mode = truthy,
            "INDEX_INITIAL_COUNT" => match value.parse::<i64>() {
                Ok(n) => self.index_initial_count = n,
                Err(_) => diags.error(DiagnosticKind::BadNumber(value.to_string()), span),
            },
            "DISABLE_NAME_GROUP" => self.disable_name_group = truthy,
            "ALLOW_WILDCARD_IMPORT" => self.allow_wildcard_import = truthy,
            "PRESERVE_COMMENTS" => self.preserve_comments = truthy,
            "SPLIT_OUTPUT" => self.split_output = truthy,
            _ => diags.error(DiagnosticKind::UnknownOption(key.to_string()), span),
        }
    }

    /// Pre-pass: apply every unnamed `[Configuration] { … }` block found in
    /// `source`. Named blocks (`[Configuration] @Config Foo`) are registered
    /// later by the parser and only take effect through `use @Config Foo;` or
    /// an import.
    pub fn apply_source_blocks(
        &mut self,
        source: &str,
        file: FileId,
        diags: &mut DiagnosticList,
    ) {
        let marker = "[Configuration]";
        let mut search_from = 0;
        while let Some(rel) = source[search_from..].find(marker) {
            let at = search_from + rel;
            let after = &source[at + marker.len()..];
            let body_open = match after.find('{') {
                Some(i) => i,
                None => break,
            };
            // Skip the named form; everything before `{` must be whitespace.
            let head = after[..body_open].trim();
            if !head.is_empty() {
                search_from = at + marker.len();
                continue;
            }
            let body_start = at + marker.len() + body_open + 1;
            let body_end = match find_matching_brace(source, body_start - 1) {
                Some(end) => end,
                None => break,
            };
            let body = &source[body_start..body_end];
            self.apply_block_body(body, file, body_start, diags);
            search_from = body_end + 1;
        }
    }

    fn apply_block_body(
        &mut self,
        body: &str,
        file: FileId,
        body_offset: usize,
        diags: &mut DiagnosticList,
    ) {
        let mut rest = body;
        let mut offset = body_offset;
        while let Some(open) = rest.find('[') {
            let (head, tail) = rest.split_at(open);
            self.apply_plain_entries(head, file, offset, diags);
            let close = match tail.find(']') {
                Some(i) => i,
                None => break,
            };
            let group = &tail[1..close];
            let after = &tail[close + 1..];
            let brace = match after.find('{') {
                Some(i) => i,
                None => break,
            };
            let group_body_start = open + close + 1 + brace + 1;
            let group_body_end =
                match find_matching_brace(rest, open + close + 1 + brace) {
                    Some(end) => end,
                    None => break,
                };
            let group_body = &rest[group_body_start..group_body_end];
            match group {
                "Name" => {
                    self.apply_name_group(group_body, file, offset + group_body_start, diags)
                }
                "OriginType" => self.apply_origin_type_group(group_body),
                other => diags.error(
                    DiagnosticKind::UnknownOption(format!("[{}]", other)),
                    span_at(file, body, offset, body_offset),
                ),
            }
            offset += group_body_end + 1;
            rest = &rest[group_body_end + 1..];
        }
        self.apply_plain_entries(rest, file, offset, diags);
    }

    fn apply_plain_entries(
        &mut self,
        text: &str,
        file: FileId,
        offset: usize,
        diags: &mut DiagnosticList,
    ) {
        for entry in text.split(';') {
            let entry = strip_comment_lines(entry);
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if let Some((key, value)) = split_entry(entry) {
                let span = span_at(file, entry, offset, offset);
                self.set_option(key.trim(), unquote(value.trim()), span, diags);
            }
        }
    }

    fn apply_name_group(
        &mut self,
        text: &str,
        file: FileId,
        offset: usize,
        diags: &mut DiagnosticList,
    ) {
        for entry in text.split(';') {
            let entry = strip_comment_lines(entry);
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if let Some((key, value)) = split_entry(entry) {
                let span = span_at(file, entry, offset, offset);
                self.rebind_keyword(key.trim(), unquote(value.trim()), span, diags);
            }
        }
    }

    fn apply_origin_type_group(&mut self, text: &str) {
        for entry in text.split(';') {
            let entry = entry.trim();
            if let Some(tag) = entry.strip_prefix('@') {
                if !tag.is_empty() {
                    self.register_origin_type(tag);
                }
            }
        }
    }
}

/// `KEY = value` or `KEY : value`.
fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let eq = entry.find('=');
    let colon = entry.find(':');
    let split = match (eq, colon) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&entry[..split], &entry[split + 1..]))
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn strip_comment_lines(entry: &str) -> String {
    entry
        .lines()
        .map(|l| match l.find("//") {
            Some(i) => &l[..i],
            None => l,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn span_at(file: FileId, _fragment: &str, offset: usize, _base: usize) -> Span {
    let mut c = Cursor::start();
    c.offset = offset;
    Span::new(file, offset, 1, c.line, c.col, c.line, c.col)
}

/// Index of the `}` matching the `{` at `open`, honoring strings.
pub fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    debug_assert_eq!(bytes.get(open), Some(&b'{'));
    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = in_string {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                in_string = None;
            }
        } else {
            match b {
                b'"' | b'\'' => in_string = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Configuration::default();
        assert_eq!(c.keyword("KEYWORD_TEMPLATE"), "[Template]");
        assert_eq!(c.index_initial_count, 0);
        assert!(c.allow_wildcard_import);
        assert!(!c.debug_mode);
    }

    #[test]
    fn pre_pass_reads_options_and_name_group() {
        let src = r#"
            [Configuration] {
                DEBUG_MODE = true;
                INDEX_INITIAL_COUNT = 1;
                [Name] {
                    KEYWORD_TEMPLATE = "[Tpl]";
                }
            }
            div { }
        "#;
        let mut c = Configuration::default();
        let mut diags = DiagnosticList::new();
        c.apply_source_blocks(src, 0, &mut diags);
        assert!(!diags.has_errors(), "{:?}", diags);
        assert!(c.debug_mode);
        assert_eq!(c.index_initial_count, 1);
        assert_eq!(c.keyword("KEYWORD_TEMPLATE"), "[Tpl]");
    }

    #[test]
    fn origin_type_group_registers_tags() {
        let src = "[Configuration] { [OriginType] { @Vue; @Markdown; } }";
        let mut c = Configuration::default();
        let mut diags = DiagnosticList::new();
        c.apply_source_blocks(src, 0, &mut diags);
        assert!(c.is_known_origin_type("Vue"));
        assert!(c.is_known_origin_type("Markdown"));
        assert!(c.is_known_origin_type("Html"));
        assert!(!c.is_known_origin_type("Tex"));
    }

    #[test]
    fn unknown_option_is_a_config_diagnostic() {
        let src = "[Configuration] { NO_SUCH_OPTION = 1; }";
        let mut c = Configuration::default();
        let mut diags = DiagnosticList::new();
        c.apply_source_blocks(src, 0, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn name_group_rejected_when_disabled() {
        let src = r#"
            [Configuration] {
                DISABLE_NAME_GROUP = true;
                [Name] { KEYWORD_CUSTOM = "[C]"; }
            }
        "#;
        let mut c = Configuration::default();
        let mut diags = DiagnosticList::new();
        c.apply_source_blocks(src, 0, &mut diags);
        assert!(diags.has_errors());
        assert_eq!(c.keyword("KEYWORD_CUSTOM"), "[Custom]");
    }

    #[test]
    fn named_configuration_blocks_are_skipped_by_the_pre_pass() {
        let src = "[Configuration] @Config Strict { DEBUG_MODE = true; }";
        let mut c = Configuration::default();
        let mut diags = DiagnosticList::new();
        c.apply_source_blocks(src, 0, &mut diags);
        assert!(!c.debug_mode);
    }
}
