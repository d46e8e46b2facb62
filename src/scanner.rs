//! Unified scanner: elastic slicing of mixed-language source.
//!
//! One `.chtl` file interleaves CHTL structure, CSS (`style { … }` bodies),
//! JavaScript and CHTL-JS (`script { … }` bodies, `{{…}}`, `->`) and verbatim
//! origin blocks. The identity of a `{` depends on what precedes it, so the
//! scanner keeps a small mode stack and slices the source into typed
//! fragments whose boundaries always fall on grammatically complete seams.
//!
//! The source is consumed through a sliding window: start with a 512-byte
//! slice, and whenever the window would end inside an incomplete construct
//! (open string, half of `{{` or `->`, the middle of a structural marker),
//! double it, up to 64 KiB. Scan state persists across windows, so the
//! fragment sequence is independent of where the windows land.
//!
//! Output guarantee: concatenating fragment texts in order reproduces the
//! source byte-for-byte. Comments are preserved inside the fragment where
//! they start; dropping them is the lexers' business, not the scanner's.

use crate::config::Configuration;
use crate::span::{Cursor, FileId, Span};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const INITIAL_SLICE_SIZE: usize = 512;
pub const MAX_SLICE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FragmentKind {
    Chtl,
    ChtlJs,
    Css,
    Js,
    Html,
    Text,
    Origin { tag: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
    pub span: Span,
}

/// Sub-context pushed on top of the base CHTL mode.
#[derive(Debug, Clone, PartialEq)]
enum Mode {
    /// Base structural mode. `depth` counts `{` nesting (element depth).
    Chtl { depth: u32 },
    /// Inside `script { … }`; emits Js / ChtlJs fragments.
    Script { depth: u32 },
    /// Inside a top-level `style { … }`; body is plain CSS.
    Css { depth: u32 },
    /// Inside `[Origin] @Tag { … }`; body is verbatim.
    Origin { tag: String, depth: u32 },
}

/// Signalled when a decision needs bytes past the current window.
struct NeedMore;

pub struct Scanner<'a> {
    src: &'a str,
    file: FileId,
    style_kw: String,
    script_kw: String,
    origin_marker: String,
    vir_kw: String,
    /// Script-side keywords claimed by CJMOD plugins.
    plugin_keywords: HashSet<String>,
    cancelled: Option<&'a std::sync::atomic::AtomicBool>,

    modes: Vec<Mode>,
    fragments: Vec<Fragment>,
    /// Start of the fragment currently being accumulated.
    frag_start: Cursor,
    frag_kind: FragmentKind,
    cur: Cursor,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str, file: FileId, config: &Configuration) -> Self {
        Scanner {
            src,
            file,
            style_kw: config.keyword("KEYWORD_STYLE").to_string(),
            script_kw: config.keyword("KEYWORD_SCRIPT").to_string(),
            origin_marker: config.keyword("KEYWORD_ORIGIN").to_string(),
            vir_kw: config.keyword("KEYWORD_VIR").to_string(),
            plugin_keywords: HashSet::new(),
            cancelled: None,
            modes: vec![Mode::Chtl { depth: 0 }],
            fragments: Vec::new(),
            frag_start: Cursor::start(),
            frag_kind: FragmentKind::Chtl,
            cur: Cursor::start(),
        }
    }

    pub fn with_plugin_keywords(mut self, keywords: HashSet<String>) -> Self {
        self.plugin_keywords = keywords;
        self
    }

    /// Cooperative cancellation, checked between fragments.
    pub fn with_cancel_flag(mut self, flag: &'a std::sync::atomic::AtomicBool) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn scan(mut self) -> Vec<Fragment> {
        let mut slice_size = INITIAL_SLICE_SIZE;
        while self.cur.offset < self.src.len() {
            if let Some(flag) = self.cancelled {
                if flag.load(std::sync::atomic::Ordering::Relaxed) {
                    break;
                }
            }
            let limit = char_floor(self.src, (self.cur.offset + slice_size).min(self.src.len()));
            let before = self.cur.offset;
            match self.scan_window(limit) {
                Ok(()) => {
                    if self.cur.offset == before {
                        // No progress inside this window: the tail sits in an
                        // incomplete construct. Grow and retry.
                        if slice_size < MAX_SLICE_SIZE {
                            slice_size *= 2;
                        } else {
                            // Construct larger than the elastic maximum: scan
                            // the rest unbounded.
                            self.scan_window(self.src.len()).ok();
                            break;
                        }
                    } else {
                        slice_size = INITIAL_SLICE_SIZE;
                    }
                }
                Err(NeedMore) => {
                    if slice_size < MAX_SLICE_SIZE {
                        slice_size *= 2;
                    } else {
                        self.scan_window(self.src.len()).ok();
                        break;
                    }
                }
            }
        }
        self.flush_fragment(self.cur);
        self.fragments
    }

    // ── window scanning ────────────────────────────────────────────────────

    /// Scan forward until `limit`. Returns `Err(NeedMore)` when a decision
    /// needs more bytes than the window holds (and the window can grow).
    fn scan_window(&mut self, limit: usize) -> Result<(), NeedMore> {
        while self.cur.offset < limit {
            let mode = self.modes.last().cloned().expect("mode stack is never empty");
            match mode {
                Mode::Chtl { .. } => self.step_chtl(limit)?,
                Mode::Script { .. } => self.step_script(limit)?,
                Mode::Css { .. } => self.step_css(limit)?,
                Mode::Origin { .. } => self.step_origin(limit)?,
            }
        }
        Ok(())
    }

    fn step_chtl(&mut self, limit: usize) -> Result<(), NeedMore> {
        let ch = match self.peek_char() {
            Some(c) => c,
            None => return Ok(()),
        };
        match ch {
            '"' | '\'' => self.consume_string(limit),
            '/' => self.consume_slash_comment_or_char(limit),
            '-' => {
                // `--` generator comment; a lone `-` is ordinary text.
                if self.peek_str("--") {
                    self.consume_line(limit)
                } else {
                    self.bump();
                    Ok(())
                }
            }
            '{' => {
                self.bump();
                if let Some(Mode::Chtl { depth }) = self.modes.last_mut() {
                    *depth += 1;
                }
                Ok(())
            }
            '}' => {
                self.bump();
                if let Some(Mode::Chtl { depth }) = self.modes.last_mut() {
                    *depth = depth.saturating_sub(1);
                }
                Ok(())
            }
            '[' => self.chtl_marker(limit),
            c if is_ident_start(c) => self.chtl_word(limit),
            _ => {
                self.bump();
                Ok(())
            }
        }
    }

    /// `[Origin]`-style structural markers need a decision: an origin block
    /// with a body opens a verbatim sub-mode.
    fn chtl_marker(&mut self, limit: usize) -> Result<(), NeedMore> {
        let start = self.cur;
        let marker_end = match find_marker_end(self.src, start.offset, limit) {
            FindResult::Found(end) => end,
            FindResult::NeedMore => return self.need_more_or_bump(limit),
            FindResult::NotFound => {
                self.bump();
                return Ok(());
            }
        };
        let marker = &self.src[start.offset..marker_end];
        if marker != self.origin_marker {
            // Other markers stay in the CHTL stream untouched.
            self.advance_to(marker_end);
            return Ok(());
        }
        // `[Origin] @Tag [name] {` opens a verbatim body; `[Origin] @Tag name;`
        // is a use of a named origin and stays structural.
        let mut probe = match skip_ws_and_comments(self.src, marker_end, limit) {
            Some(p) => p,
            None => return self.need_more_or_bump(limit),
        };
        let tag = match read_at_tag(self.src, probe, limit) {
            FindResult::Found(end) => {
                let t = self.src[probe + 1..end].to_string();
                probe = end;
                t
            }
            FindResult::NeedMore => return self.need_more_or_bump(limit),
            FindResult::NotFound => {
                self.advance_to(marker_end);
                return Ok(());
            }
        };
        probe = match skip_ws_and_comments(self.src, probe, limit) {
            Some(p) => p,
            None => return self.need_more_or_bump(limit),
        };
        // Optional name.
        if self
            .src[probe..]
            .chars()
            .next()
            .map(is_ident_start)
            .unwrap_or(false)
        {
            while probe < self.src.len()
                && self.src[probe..]
                    .chars()
                    .next()
                    .map(is_ident_char)
                    .unwrap_or(false)
            {
                probe += self.src[probe..].chars().next().unwrap().len_utf8();
            }
            probe = match skip_ws_and_comments(self.src, probe, limit) {
                Some(p) => p,
                None => return self.need_more_or_bump(limit),
            };
        }
        if probe >= limit {
            return self.need_more_or_bump(limit);
        }
        if self.src.as_bytes()[probe] == b'{' {
            // Keep `[Origin] @Tag name {` in the CHTL fragment, then cut the
            // body out as a verbatim fragment.
            self.advance_to(probe + 1);
            self.flush_fragment(self.cur);
            self.frag_kind = FragmentKind::Origin { tag: tag.clone() };
            self.modes.push(Mode::Origin { tag, depth: 1 });
        } else {
            self.advance_to(probe);
        }
        Ok(())
    }

    fn chtl_word(&mut self, limit: usize) -> Result<(), NeedMore> {
        let start = self.cur.offset;
        let word_end = match read_word(self.src, start, limit) {
            FindResult::Found(end) => end,
            FindResult::NeedMore => return self.need_more_or_bump(limit),
            FindResult::NotFound => unreachable!("chtl_word called on ident start"),
        };
        let word = &self.src[start..word_end];
        let depth = match self.modes.last() {
            Some(Mode::Chtl { depth }) => *depth,
            _ => 0,
        };

        if word == self.script_kw {
            // `script` + `{` opens a JS/CHTL-JS body at any depth.
            match next_nonspace(self.src, word_end, limit) {
                Some(p) if self.src.as_bytes()[p] == b'{' => {
                    self.advance_to(p + 1);
                    self.flush_fragment(self.cur);
                    self.frag_kind = FragmentKind::Js;
                    self.modes.push(Mode::Script { depth: 1 });
                    return Ok(());
                }
                Some(_) => {
                    self.advance_to(word_end);
                    return Ok(());
                }
                None => return self.need_more_or_bump(limit),
            }
        }
        if word == self.style_kw && depth == 0 {
            // A style body outside any element holds no CHTL extensions; it
            // goes to the CSS stream verbatim. Local style blocks stay in the
            // CHTL fragment for the parser (they may carry variable-group
            // references and `&` selectors).
            match next_nonspace(self.src, word_end, limit) {
                Some(p) if self.src.as_bytes()[p] == b'{' => {
                    self.advance_to(p + 1);
                    self.flush_fragment(self.cur);
                    self.frag_kind = FragmentKind::Css;
                    self.modes.push(Mode::Css { depth: 1 });
                    return Ok(());
                }
                Some(_) => {
                    self.advance_to(word_end);
                    return Ok(());
                }
                None => return self.need_more_or_bump(limit),
            }
        }
        self.advance_to(word_end);
        Ok(())
    }

    fn step_css(&mut self, limit: usize) -> Result<(), NeedMore> {
        let ch = match self.peek_char() {
            Some(c) => c,
            None => return Ok(()),
        };
        match ch {
            '"' | '\'' => self.consume_string(limit),
            '/' => self.consume_slash_comment_or_char(limit),
            '{' => {
                self.bump();
                if let Some(Mode::Css { depth }) = self.modes.last_mut() {
                    *depth += 1;
                }
                Ok(())
            }
            '}' => {
                let closes = matches!(self.modes.last(), Some(Mode::Css { depth: 1 }));
                if closes {
                    // Body ends before the `}`; the brace returns to CHTL.
                    self.flush_fragment(self.cur);
                    self.frag_kind = FragmentKind::Chtl;
                    self.modes.pop();
                    self.bump();
                } else {
                    self.bump();
                    if let Some(Mode::Css { depth }) = self.modes.last_mut() {
                        *depth -= 1;
                    }
                }
                Ok(())
            }
            _ => {
                self.bump();
                Ok(())
            }
        }
    }

    fn step_origin(&mut self, limit: usize) -> Result<(), NeedMore> {
        let ch = match self.peek_char() {
            Some(c) => c,
            None => return Ok(()),
        };
        match ch {
            '"' | '\'' => self.consume_string(limit),
            '{' => {
                self.bump();
                if let Some(Mode::Origin { depth, .. }) = self.modes.last_mut() {
                    *depth += 1;
                }
                Ok(())
            }
            '}' => {
                let closes = matches!(self.modes.last(), Some(Mode::Origin { depth: 1, .. }));
                if closes {
                    self.flush_fragment(self.cur);
                    self.frag_kind = FragmentKind::Chtl;
                    self.modes.pop();
                    self.bump();
                } else {
                    self.bump();
                    if let Some(Mode::Origin { depth, .. }) = self.modes.last_mut() {
                        *depth -= 1;
                    }
                }
                Ok(())
            }
            _ => {
                self.bump();
                Ok(())
            }
        }
    }

    fn step_script(&mut self, limit: usize) -> Result<(), NeedMore> {
        let ch = match self.peek_char() {
            Some(c) => c,
            None => return Ok(()),
        };
        match ch {
            '"' | '\'' | '`' => self.consume_string(limit),
            '/' => self.consume_slash_comment_or_char(limit),
            '{' => {
                if self.peek_str("{{") {
                    return self.script_chtljs_construct(limit);
                }
                self.bump();
                if let Some(Mode::Script { depth }) = self.modes.last_mut() {
                    *depth += 1;
                }
                Ok(())
            }
            '}' => {
                let closes = matches!(self.modes.last(), Some(Mode::Script { depth: 1 }));
                if closes {
                    self.flush_fragment(self.cur);
                    self.frag_kind = FragmentKind::Chtl;
                    self.modes.pop();
                    self.bump();
                } else {
                    self.bump();
                    if let Some(Mode::Script { depth }) = self.modes.last_mut() {
                        *depth -= 1;
                    }
                }
                Ok(())
            }
            c if is_ident_start(c) => self.script_word(limit),
            _ => {
                self.bump();
                Ok(())
            }
        }
    }

    /// A `{{…}}` selector, possibly extended by an arrow chain.
    fn script_chtljs_construct(&mut self, limit: usize) -> Result<(), NeedMore> {
        let start = self.cur.offset;
        let end = match scan_chtljs_construct(self.src, start, limit) {
            FindResult::Found(end) => end,
            FindResult::NeedMore => return self.need_more_or_bump(limit),
            FindResult::NotFound => {
                // Unterminated selector: leave the rest to the JS stream.
                self.bump();
                return Ok(());
            }
        };
        self.flush_fragment(self.cur);
        self.frag_kind = FragmentKind::ChtlJs;
        self.advance_to(end);
        self.flush_fragment(self.cur);
        self.frag_kind = FragmentKind::Js;
        Ok(())
    }

    fn script_word(&mut self, limit: usize) -> Result<(), NeedMore> {
        let start = self.cur.offset;
        let word_end = match read_word(self.src, start, limit) {
            FindResult::Found(end) => end,
            FindResult::NeedMore => return self.need_more_or_bump(limit),
            FindResult::NotFound => unreachable!(),
        };
        let word = &self.src[start..word_end];

        let is_construct_head = word == self.vir_kw
            || word == "animate"
            || self.plugin_keywords.contains(word);
        // `Name->…` extends into CHTL-JS as well (virtual-object calls).
        let arrow_follows = match next_nonspace(self.src, word_end, limit) {
            Some(p) => self.src[p..].starts_with("->"),
            None => {
                if limit < self.src.len() {
                    return Err(NeedMore);
                }
                false
            }
        };

        if !is_construct_head && !arrow_follows {
            self.advance_to(word_end);
            return Ok(());
        }

        let end = match scan_statement_end(self.src, start, limit) {
            FindResult::Found(end) => end,
            FindResult::NeedMore => return self.need_more_or_bump(limit),
            FindResult::NotFound => {
                self.advance_to(word_end);
                return Ok(());
            }
        };
        self.flush_fragment(self.cur);
        self.frag_kind = FragmentKind::ChtlJs;
        self.advance_to(end);
        self.flush_fragment(self.cur);
        self.frag_kind = FragmentKind::Js;
        Ok(())
    }

    // ── low-level helpers ──────────────────────────────────────────────────

    fn peek_char(&self) -> Option<char> {
        self.src[self.cur.offset..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.src[self.cur.offset..].starts_with(s)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.cur.advance(c);
        }
    }

    fn advance_to(&mut self, offset: usize) {
        while self.cur.offset < offset {
            self.bump();
        }
    }

    /// A whole quoted string (or template literal). Strings never produce
    /// boundaries; they only shield their content from brace tracking.
    fn consume_string(&mut self, limit: usize) -> Result<(), NeedMore> {
        let quote = self.peek_char().unwrap();
        let start = self.cur.offset;
        let mut i = start + quote.len_utf8();
        let bytes = self.src.as_bytes();
        while i < self.src.len() {
            let b = bytes[i];
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote as u8 {
                i += 1;
                if i > limit && limit < self.src.len() {
                    return Err(NeedMore);
                }
                self.advance_to(i);
                return Ok(());
            }
            if b == b'\n' && quote != '`' {
                // Unterminated on this line; the lexer will diagnose.
                break;
            }
            i += 1;
        }
        if i >= limit && limit < self.src.len() {
            return Err(NeedMore);
        }
        self.advance_to(i.min(self.src.len()));
        Ok(())
    }

    fn consume_slash_comment_or_char(&mut self, limit: usize) -> Result<(), NeedMore> {
        if self.peek_str("//") {
            return self.consume_line(limit);
        }
        if self.peek_str("/*") {
            if let Some(end) = self.src[self.cur.offset + 2..].find("*/") {
                let end_abs = self.cur.offset + 2 + end + 2;
                if end_abs > limit && limit < self.src.len() {
                    return Err(NeedMore);
                }
                self.advance_to(end_abs);
            } else {
                if limit < self.src.len() {
                    return Err(NeedMore);
                }
                self.advance_to(self.src.len());
            }
            return Ok(());
        }
        self.bump();
        Ok(())
    }

    fn consume_line(&mut self, limit: usize) -> Result<(), NeedMore> {
        match self.src[self.cur.offset..].find('\n') {
            Some(rel) => {
                let end = self.cur.offset + rel;
                if end > limit && limit < self.src.len() {
                    return Err(NeedMore);
                }
                self.advance_to(end);
            }
            None => {
                if limit < self.src.len() {
                    return Err(NeedMore);
                }
                self.advance_to(self.src.len());
            }
        }
        Ok(())
    }

    /// Either ask the caller for a bigger window, or (when the window already
    /// covers the whole source) give up on the construct and move one char.
    fn need_more_or_bump(&mut self, limit: usize) -> Result<(), NeedMore> {
        if limit < self.src.len() {
            Err(NeedMore)
        } else {
            self.bump();
            Ok(())
        }
    }

    fn flush_fragment(&mut self, end: Cursor) {
        if end.offset > self.frag_start.offset {
            let span = self.frag_start.span_to(self.file, end);
            self.fragments.push(Fragment {
                kind: self.frag_kind.clone(),
                text: self.src[self.frag_start.offset..end.offset].to_string(),
                span,
            });
        }
        self.frag_start = end;
    }
}

enum FindResult {
    Found(usize),
    NeedMore,
    NotFound,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '-'
}

/// Largest char boundary ≤ `at`.
fn char_floor(s: &str, mut at: usize) -> usize {
    while at < s.len() && !s.is_char_boundary(at) {
        at -= 1;
    }
    at.min(s.len())
}

/// End offset (exclusive) of the identifier word starting at `start`.
fn read_word(src: &str, start: usize, limit: usize) -> FindResult {
    let mut i = start;
    for c in src[start..].chars() {
        if (i == start && !is_ident_start(c)) || (i > start && !is_ident_char(c)) {
            return FindResult::Found(i);
        }
        i += c.len_utf8();
        if i >= limit && limit < src.len() {
            return FindResult::NeedMore;
        }
    }
    if limit < src.len() {
        FindResult::NeedMore
    } else {
        FindResult::Found(i)
    }
}

/// `[Word]` marker at `start`; end offset is after the `]`.
fn find_marker_end(src: &str, start: usize, limit: usize) -> FindResult {
    debug_assert_eq!(src.as_bytes().get(start), Some(&b'['));
    let mut i = start + 1;
    let bytes = src.as_bytes();
    while i < src.len() {
        match bytes[i] {
            b']' => {
                if i + 1 > limit && limit < src.len() {
                    return FindResult::NeedMore;
                }
                return FindResult::Found(i + 1);
            }
            b'\n' | b'{' | b'}' => return FindResult::NotFound,
            _ => i += 1,
        }
        if i >= limit && limit < src.len() {
            return FindResult::NeedMore;
        }
    }
    FindResult::NotFound
}

/// `@Tag` at `start`; end offset is after the tag word.
fn read_at_tag(src: &str, start: usize, limit: usize) -> FindResult {
    if src.as_bytes().get(start) != Some(&b'@') {
        return FindResult::NotFound;
    }
    match read_word(src, start + 1, limit) {
        FindResult::Found(end) if end > start + 1 => FindResult::Found(end),
        FindResult::NeedMore => FindResult::NeedMore,
        _ => FindResult::NotFound,
    }
}

fn next_nonspace(src: &str, mut i: usize, limit: usize) -> Option<usize> {
    while i < src.len() {
        let c = src[i..].chars().next().unwrap();
        if !c.is_whitespace() {
            return Some(i);
        }
        i += c.len_utf8();
        if i >= limit && limit < src.len() {
            return None;
        }
    }
    if limit < src.len() {
        None
    } else {
        Some(src.len())
    }
}

fn skip_ws_and_comments(src: &str, mut i: usize, limit: usize) -> Option<usize> {
    loop {
        i = next_nonspace(src, i, limit)?;
        if src[i..].starts_with("//") {
            i = src[i..].find('\n').map(|r| i + r)?;
        } else if src[i..].starts_with("/*") {
            i = src[i + 2..].find("*/").map(|r| i + 2 + r + 2)?;
        } else {
            return Some(i);
        }
        if i >= limit && limit < src.len() {
            return None;
        }
    }
}

/// `{{…}}` plus any `->method(args)` chain. End offset is after the last
/// chained call (or the `}}` when no arrow follows).
fn scan_chtljs_construct(src: &str, start: usize, limit: usize) -> FindResult {
    debug_assert!(src[start..].starts_with("{{"));
    let close = match src[start + 2..].find("}}") {
        Some(rel) => start + 2 + rel + 2,
        None => {
            return if limit < src.len() {
                FindResult::NeedMore
            } else {
                FindResult::NotFound
            }
        }
    };
    if close > limit && limit < src.len() {
        return FindResult::NeedMore;
    }
    scan_arrow_chain(src, close, limit)
}

/// Zero or more `->name(balanced-args)` continuations from `from`.
fn scan_arrow_chain(src: &str, from: usize, limit: usize) -> FindResult {
    let mut end = from;
    loop {
        let probe = match next_nonspace(src, end, limit) {
            Some(p) => p,
            None => return FindResult::NeedMore,
        };
        if !src[probe..].starts_with("->") {
            // A trailing `;` belongs to the construct.
            if src.as_bytes().get(probe) == Some(&b';') {
                return FindResult::Found(probe + 1);
            }
            return FindResult::Found(end);
        }
        if probe + 2 >= limit && limit < src.len() {
            return FindResult::NeedMore;
        }
        let name_end = match read_word(src, probe + 2, limit) {
            FindResult::Found(e) => e,
            FindResult::NeedMore => return FindResult::NeedMore,
            FindResult::NotFound => return FindResult::Found(end),
        };
        let after = match next_nonspace(src, name_end, limit) {
            Some(p) => p,
            None => return FindResult::NeedMore,
        };
        if src.as_bytes().get(after) == Some(&b'(') {
            match scan_balanced(src, after, b'(', b')', limit) {
                FindResult::Found(e) => end = e,
                other => return other,
            }
        } else {
            end = name_end;
        }
    }
}

/// A statement-shaped construct: from `start` to the `;` that closes it at
/// zero bracket depth (or the end of the last balanced group).
fn scan_statement_end(src: &str, start: usize, limit: usize) -> FindResult {
    let bytes = src.as_bytes();
    let mut i = start;
    let mut paren = 0i32;
    let mut brace = 0i32;
    while i < src.len() {
        let b = bytes[i];
        match b {
            b'"' | b'\'' | b'`' => match skip_string(src, i, limit) {
                FindResult::Found(e) => {
                    i = e;
                    continue;
                }
                other => return other,
            },
            b'(' => paren += 1,
            b')' => paren -= 1,
            b'{' => brace += 1,
            b'}' => {
                brace -= 1;
                if brace < 0 {
                    // Statement ran into the end of the script block.
                    return FindResult::Found(i);
                }
            }
            b';' => {
                if paren == 0 && brace == 0 {
                    return FindResult::Found(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
        if i >= limit && limit < src.len() {
            return FindResult::NeedMore;
        }
    }
    FindResult::Found(i)
}

fn scan_balanced(src: &str, open: usize, open_b: u8, close_b: u8, limit: usize) -> FindResult {
    let bytes = src.as_bytes();
    debug_assert_eq!(bytes.get(open), Some(&open_b));
    let mut depth = 0i32;
    let mut i = open;
    while i < src.len() {
        let b = bytes[i];
        if b == b'"' || b == b'\'' || b == b'`' {
            match skip_string(src, i, limit) {
                FindResult::Found(e) => {
                    i = e;
                    continue;
                }
                other => return other,
            }
        }
        if b == open_b {
            depth += 1;
        } else if b == close_b {
            depth -= 1;
            if depth == 0 {
                if i + 1 > limit && limit < src.len() {
                    return FindResult::NeedMore;
                }
                return FindResult::Found(i + 1);
            }
        }
        i += 1;
        if i >= limit && limit < src.len() {
            return FindResult::NeedMore;
        }
    }
    FindResult::NotFound
}

fn skip_string(src: &str, start: usize, limit: usize) -> FindResult {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < src.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if i + 1 > limit && limit < src.len() {
                return FindResult::NeedMore;
            }
            return FindResult::Found(i + 1);
        }
        i += 1;
        if i >= limit && limit < src.len() {
            return FindResult::NeedMore;
        }
    }
    FindResult::Found(src.len())
}

/// Convenience wrapper used by the pipeline.
pub fn scan_source(src: &str, file: FileId, config: &Configuration) -> Vec<Fragment> {
    Scanner::new(src, file, config).scan()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> Vec<Fragment> {
        scan_source(src, 0, &Configuration::default())
    }

    fn concat(frags: &[Fragment]) -> String {
        frags.iter().map(|f| f.text.as_str()).collect()
    }

    #[test]
    fn plain_chtl_is_one_fragment() {
        let src = "div { color: red; span { } }";
        let frags = scan(src);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].kind, FragmentKind::Chtl);
        assert_eq!(concat(&frags), src);
    }

    #[test]
    fn script_body_becomes_js_fragments() {
        let src = "div { script { let x = 1; } }";
        let frags = scan(src);
        let kinds: Vec<_> = frags.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![FragmentKind::Chtl, FragmentKind::Js, FragmentKind::Chtl]
        );
        assert!(frags[0].text.ends_with("script {"));
        assert_eq!(frags[1].text, " let x = 1; ");
        assert!(frags[2].text.starts_with('}'));
        assert_eq!(concat(&frags), src);
    }

    #[test]
    fn enhanced_selector_splits_the_script_body() {
        let src = "div { script { {{.box}}->listen({click: () => { x++; }}); let y = 2; } }";
        let frags = scan(src);
        let kinds: Vec<_> = frags.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                FragmentKind::Chtl,
                FragmentKind::Js,
                FragmentKind::ChtlJs,
                FragmentKind::Js,
                FragmentKind::Chtl
            ]
        );
        let js_frag = &frags[2];
        assert!(js_frag.text.starts_with("{{.box}}"));
        assert!(js_frag.text.ends_with(';'));
        assert_eq!(concat(&frags), src);
    }

    #[test]
    fn nested_braces_do_not_close_the_script_block() {
        let src = "div { script { if (a) { b(); } } }";
        let frags = scan(src);
        assert_eq!(frags.len(), 3);
        assert_eq!(frags[1].kind, FragmentKind::Js);
        assert_eq!(frags[1].text, " if (a) { b(); } ");
        assert_eq!(concat(&frags), src);
    }

    #[test]
    fn origin_body_is_verbatim() {
        let src = "[Origin] @Html Box { <b>raw { not chtl }</b> } div { }";
        let frags = scan(src);
        let kinds: Vec<_> = frags.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                FragmentKind::Chtl,
                FragmentKind::Origin {
                    tag: "Html".to_string()
                },
                FragmentKind::Chtl
            ]
        );
        assert_eq!(frags[1].text, " <b>raw { not chtl }</b> ");
        assert_eq!(concat(&frags), src);
    }

    #[test]
    fn local_style_stays_in_the_chtl_fragment() {
        let src = "div { style { color: red; &:hover { color: blue; } } }";
        let frags = scan(src);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].kind, FragmentKind::Chtl);
    }

    #[test]
    fn vir_statement_is_a_chtljs_fragment() {
        let src = "div { script { vir Handlers = listen({ click: f }); } }";
        let frags = scan(src);
        let chtljs: Vec<_> = frags
            .iter()
            .filter(|f| f.kind == FragmentKind::ChtlJs)
            .collect();
        assert_eq!(chtljs.len(), 1);
        assert!(chtljs[0].text.starts_with("vir "));
        assert!(chtljs[0].text.ends_with(';'));
        assert_eq!(concat(&frags), src);
    }

    #[test]
    fn strings_shield_braces() {
        let src = "div { script { let s = \"} not a close {\"; } }";
        let frags = scan(src);
        assert_eq!(frags.len(), 3);
        assert_eq!(frags[1].kind, FragmentKind::Js);
        assert_eq!(concat(&frags), src);
    }

    #[test]
    fn concat_reproduces_source_byte_for_byte() {
        let src = r#"
[Template] @Style Theme { color: red; }
-- generated marker
div {
    id: main;
    style { @Style Theme; }
    script {
        let n = 0;
        {{#main}}->listen({ click: () => { n++; } });
    }
    text { "hello" }
}
"#;
        let frags = scan(src);
        assert_eq!(concat(&frags), src);
    }

    /// The doubling-slice policy must not change the fragment sequence: a
    /// source scanned with tiny windows equals the whole-file scan.
    #[test]
    fn window_size_does_not_change_fragments() {
        let src = r#"
div {
    style { width: 100%; }
    script {
        const items = [1, 2, 3];
        {{.item}}->listen({ mouseover: e => e.target.focus() });
        vir V = listen({ click: () => {} });
    }
}
[Origin] @Style G { .g { color: green; } }
"#;
        let whole = scan(src);
        // Force pathological windows by scanning a source longer than the
        // initial slice: pad with comments so multiple windows are used.
        let padding = "// pad\n".repeat(200);
        let padded = format!("{}{}", padding, src);
        let padded_frags = scan(&padded);
        assert_eq!(
            concat(&padded_frags),
            padded,
            "padded scan must reproduce input"
        );
        let tail_kinds: Vec<_> = padded_frags
            .iter()
            .map(|f| f.kind.clone())
            .collect();
        let whole_kinds: Vec<_> = whole.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(tail_kinds, whole_kinds);
    }
}
