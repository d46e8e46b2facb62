//! CMOD/CJMOD module archives.
//!
//! Binary container layout (fixed so modules are portable):
//!
//! ```text
//! 8  bytes  magic: "CHTLCMOD" | "CHTLCJMD"
//! 4  bytes  LE version
//! 4  bytes  LE file count
//! 4  bytes  LE flags (bit 0: per-file deflate)
//! per file:
//!   4 bytes LE name length, name bytes (UTF-8, `/` separators)
//!   4 bytes LE payload length
//!   4 bytes LE uncompressed length
//!   4 bytes LE checksum (first 4 LE bytes of SHA-256 of the uncompressed payload)
//!   payload bytes
//! ```
//!
//! A CMOD carries `.chtl` sources plus an `info.chtl` with `[Info]` and
//! `[Export]` blocks; a CJMOD carries script-extension declarations. Archives
//! are read fully into memory and closed before any parsing begins.

use crate::diagnostics::{DiagnosticKind, DiagnosticList};
use crate::span::Span;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CMOD_MAGIC: &[u8; 8] = b"CHTLCMOD";
pub const CJMOD_MAGIC: &[u8; 8] = b"CHTLCJMD";
pub const ARCHIVE_VERSION: u32 = 1;
const FLAG_COMPRESSED: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleKind {
    Cmod,
    Cjmod,
}

impl ModuleKind {
    pub fn magic(&self) -> &'static [u8; 8] {
        match self {
            ModuleKind::Cmod => CMOD_MAGIC,
            ModuleKind::Cjmod => CJMOD_MAGIC,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ModuleKind::Cmod => "cmod",
            ModuleKind::Cjmod => "cjmod",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveFile {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ModuleArchive {
    pub kind: ModuleKind,
    pub files: Vec<ArchiveFile>,
}

fn checksum(data: &[u8]) -> u32 {
    let digest = Sha256::digest(data);
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

impl ModuleArchive {
    pub fn new(kind: ModuleKind) -> Self {
        ModuleArchive {
            kind,
            files: Vec::new(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.files.push(ArchiveFile {
            name: name.into(),
            data,
        });
    }

    pub fn file(&self, name: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Every `.chtl` source in the archive, as (name, text), skipping
    /// non-UTF8 payloads.
    pub fn chtl_sources(&self) -> Vec<(String, String)> {
        self.files
            .iter()
            .filter(|f| f.name.ends_with(".chtl"))
            .filter_map(|f| {
                String::from_utf8(f.data.clone())
                    .ok()
                    .map(|text| (f.name.clone(), text))
            })
            .collect()
    }

    pub fn write(&self, compress: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.kind.magic());
        out.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.files.len() as u32).to_le_bytes());
        let flags = if compress { FLAG_COMPRESSED } else { 0 };
        out.extend_from_slice(&flags.to_le_bytes());
        for file in &self.files {
            let name_bytes = file.name.as_bytes();
            let sum = checksum(&file.data);
            let payload: Vec<u8> = if compress {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&file.data).expect("in-memory write");
                encoder.finish().expect("in-memory finish")
            } else {
                file.data.clone()
            };
            out.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(name_bytes);
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(file.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&sum.to_le_bytes());
            out.extend_from_slice(&payload);
        }
        out
    }

    /// Parse an archive. Structural problems and checksum mismatches are
    /// module diagnostics; a best-effort archive is still returned when at
    /// least the header was intact.
    pub fn read(bytes: &[u8], diags: &mut DiagnosticList) -> Option<ModuleArchive> {
        let mut reader = ByteReader::new(bytes);
        let magic = match reader.take(8) {
            Some(m) => m,
            None => {
                diags.error(
                    DiagnosticKind::BadArchive("truncated header".to_string()),
                    Span::dummy(),
                );
                return None;
            }
        };
        let kind = if magic == CMOD_MAGIC {
            ModuleKind::Cmod
        } else if magic == CJMOD_MAGIC {
            ModuleKind::Cjmod
        } else {
            diags.error(
                DiagnosticKind::BadArchive("bad magic".to_string()),
                Span::dummy(),
            );
            return None;
        };
        let version = reader.u32()?;
        if version > ARCHIVE_VERSION {
            diags.error(DiagnosticKind::UnsupportedVersion(version), Span::dummy());
            return None;
        }
        let count = reader.u32()?;
        let flags = reader.u32()?;
        let compressed = flags & FLAG_COMPRESSED != 0;

        let mut archive = ModuleArchive::new(kind);
        for _ in 0..count {
            let name_len = reader.u32()? as usize;
            let name_bytes = match reader.take(name_len) {
                Some(b) => b,
                None => {
                    diags.error(
                        DiagnosticKind::BadArchive("truncated file entry".to_string()),
                        Span::dummy(),
                    );
                    break;
                }
            };
            let name = String::from_utf8_lossy(name_bytes).to_string();
            let payload_len = reader.u32()? as usize;
            let uncompressed_len = reader.u32()? as usize;
            let expected_sum = reader.u32()?;
            let payload = match reader.take(payload_len) {
                Some(b) => b.to_vec(),
                None => {
                    diags.error(
                        DiagnosticKind::BadArchive(format!("truncated payload for `{}`", name)),
                        Span::dummy(),
                    );
                    break;
                }
            };
            let data = if compressed {
                let mut decoder = DeflateDecoder::new(&payload[..]);
                let mut data = Vec::with_capacity(uncompressed_len);
                if decoder.read_to_end(&mut data).is_err() {
                    diags.error(
                        DiagnosticKind::BadArchive(format!("cannot inflate `{}`", name)),
                        Span::dummy(),
                    );
                    continue;
                }
                data
            } else {
                payload
            };
            if data.len() != uncompressed_len {
                diags.error(
                    DiagnosticKind::BadArchive(format!(
                        "size mismatch for `{}`: {} != {}",
                        name,
                        data.len(),
                        uncompressed_len
                    )),
                    Span::dummy(),
                );
                continue;
            }
            if checksum(&data) != expected_sum {
                diags.error(DiagnosticKind::ChecksumMismatch(name), Span::dummy());
                continue;
            }
            archive.files.push(ArchiveFile { name, data });
        }
        Some(archive)
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return None;
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INFO / EXPORT BLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmodInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub dependencies: String,
    pub category: String,
    pub min_chtl_version: String,
    pub max_chtl_version: String,
}

lazy_static! {
    static ref BLOCK_RE: Regex = Regex::new(r"(?s)\[(Info|Export)\]\s*\{(.*?)\}").unwrap();
    static ref ENTRY_RE: Regex =
        Regex::new(r#"(?m)^\s*([A-Za-z][A-Za-z0-9_-]*)\s*[:=]\s*"?([^";\n]*)"?\s*;"#).unwrap();
    static ref EXPORT_LINE_RE: Regex =
        Regex::new(r"(?m)(@[A-Za-z][A-Za-z0-9]*)\s+([A-Za-z0-9_,\s]+);").unwrap();
}

impl CmodInfo {
    /// Extract the `[Info]` block from an `info.chtl` source.
    pub fn parse(source: &str) -> CmodInfo {
        let mut info = CmodInfo::default();
        for cap in BLOCK_RE.captures_iter(source) {
            if &cap[1] != "Info" {
                continue;
            }
            for entry in ENTRY_RE.captures_iter(&cap[2]) {
                let key = entry[1].to_lowercase();
                let value = entry[2].trim().to_string();
                match key.as_str() {
                    "name" => info.name = value,
                    "version" => info.version = value,
                    "description" => info.description = value,
                    "author" => info.author = value,
                    "license" => info.license = value,
                    "dependencies" => info.dependencies = value,
                    "category" => info.category = value,
                    "minchtlversion" | "min-chtl-version" => info.min_chtl_version = value,
                    "maxchtlversion" | "max-chtl-version" => info.max_chtl_version = value,
                    _ => {}
                }
            }
        }
        info
    }

    pub fn serialize(&self) -> String {
        let mut out = String::from("[Info] {\n");
        let mut push = |key: &str, value: &str| {
            if !value.is_empty() {
                out.push_str(&format!("    {} = \"{}\";\n", key, value));
            }
        };
        push("name", &self.name);
        push("version", &self.version);
        push("description", &self.description);
        push("author", &self.author);
        push("license", &self.license);
        push("dependencies", &self.dependencies);
        push("category", &self.category);
        push("minCHTLVersion", &self.min_chtl_version);
        push("maxCHTLVersion", &self.max_chtl_version);
        out.push_str("}\n");
        out
    }
}

/// `[Export]` block: symbol names listed by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmodExport {
    /// kind spelling (`@Style`, `@Element`, …) → names.
    pub by_kind: HashMap<String, Vec<String>>,
}

impl CmodExport {
    pub fn parse(source: &str) -> CmodExport {
        let mut export = CmodExport::default();
        for cap in BLOCK_RE.captures_iter(source) {
            if &cap[1] != "Export" {
                continue;
            }
            for line in EXPORT_LINE_RE.captures_iter(&cap[2]) {
                let kind = line[1].to_string();
                let names: Vec<String> = line[2]
                    .split(',')
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect();
                export.by_kind.entry(kind).or_default().extend(names);
            }
        }
        export
    }

    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_kind.values().flatten().cloned().collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PACK / UNPACK
// ═══════════════════════════════════════════════════════════════════════════════

/// Pack a module directory into archive bytes. Every regular file under
/// `dir` is included with its forward-slash relative path.
pub fn pack_directory(dir: &Path, kind: ModuleKind, compress: bool) -> std::io::Result<Vec<u8>> {
    let mut archive = ModuleArchive::new(kind);
    let mut entries: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    entries.sort();
    for path in entries {
        let rel = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        let data = fs::read(&path)?;
        archive.add_file(rel, data);
    }
    Ok(archive.write(compress))
}

/// Unpack archive bytes into a directory tree.
pub fn unpack_to_directory(
    bytes: &[u8],
    out_dir: &Path,
    diags: &mut DiagnosticList,
) -> std::io::Result<Option<ModuleKind>> {
    let archive = match ModuleArchive::read(bytes, diags) {
        Some(a) => a,
        None => return Ok(None),
    };
    for file in &archive.files {
        // Reject entries that would escape the output directory.
        if file.name.split('/').any(|seg| seg == "..") {
            diags.error(
                DiagnosticKind::BadArchive(format!("unsafe path `{}`", file.name)),
                Span::dummy(),
            );
            continue;
        }
        let target = out_dir.join(&file.name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, &file.data)?;
    }
    Ok(Some(archive.kind))
}

// ═══════════════════════════════════════════════════════════════════════════════
// MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub name: String,
    pub kind: ModuleKind,
    pub info: CmodInfo,
    pub export: CmodExport,
    /// `.chtl` sources as (archive path, text), `info.chtl` excluded.
    pub sources: Vec<(String, String)>,
    /// `.syntax` extension declarations as (file stem, text) — the script
    /// syntax a CJMOD wants to handle.
    pub syntax_sources: Vec<(String, String)>,
}

/// Finds and loads module archives from the search paths. Loaded modules are
/// cached by name; linking into the GlobalMap is the import resolver's job.
#[derive(Debug, Default)]
pub struct CmodManager {
    search_paths: Vec<PathBuf>,
    loaded: HashMap<String, LoadedModule>,
}

impl CmodManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First match across the search paths: `<name>.cmod`, `<name>.cjmod`,
    /// or a module directory `<name>/`.
    pub fn find_module(&self, name: &str) -> Option<PathBuf> {
        for base in &self.search_paths {
            for ext in ["cmod", "cjmod"] {
                let candidate = base.join(format!("{}.{}", name, ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            let dir = base.join(name);
            if dir.is_dir() {
                return Some(dir);
            }
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<&LoadedModule> {
        self.loaded.get(name)
    }

    /// Load a module by name (cached) or return the previously loaded one.
    pub fn load(&mut self, name: &str, diags: &mut DiagnosticList) -> Option<&LoadedModule> {
        if !self.loaded.contains_key(name) {
            let path = match self.find_module(name) {
                Some(p) => p,
                None => {
                    diags.error(
                        DiagnosticKind::ImportNotFound(name.to_string()),
                        Span::dummy(),
                    );
                    return None;
                }
            };
            let module = self.load_path(&path, name, diags)?;
            self.loaded.insert(name.to_string(), module);
        }
        self.loaded.get(name)
    }

    pub fn load_path(
        &self,
        path: &Path,
        name: &str,
        diags: &mut DiagnosticList,
    ) -> Option<LoadedModule> {
        let archive = if path.is_dir() {
            let kind = ModuleKind::Cmod;
            let bytes = pack_directory(path, kind, false).ok()?;
            ModuleArchive::read(&bytes, diags)?
        } else {
            let bytes = match fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    diags.error(
                        DiagnosticKind::BadArchive(format!("{}: {}", path.display(), e)),
                        Span::dummy(),
                    );
                    return None;
                }
            };
            ModuleArchive::read(&bytes, diags)?
        };
        Some(Self::module_from_archive(name, archive))
    }

    fn module_from_archive(name: &str, archive: ModuleArchive) -> LoadedModule {
        let info_source = archive
            .files
            .iter()
            .find(|f| f.name == "info.chtl" || f.name.ends_with("/info.chtl"))
            .and_then(|f| String::from_utf8(f.data.clone()).ok())
            .unwrap_or_default();
        let info = CmodInfo::parse(&info_source);
        let export = CmodExport::parse(&info_source);
        let sources = archive
            .chtl_sources()
            .into_iter()
            .filter(|(n, _)| n != "info.chtl" && !n.ends_with("/info.chtl"))
            .collect();
        let syntax_sources = archive
            .files
            .iter()
            .filter(|f| f.name.ends_with(".syntax"))
            .filter_map(|f| {
                let stem = f
                    .name
                    .rsplit('/')
                    .next()
                    .unwrap_or(&f.name)
                    .trim_end_matches(".syntax")
                    .to_string();
                String::from_utf8(f.data.clone()).ok().map(|text| (stem, text))
            })
            .collect();
        let module_name = if info.name.is_empty() {
            name.to_string()
        } else {
            info.name.clone()
        };
        LoadedModule {
            name: module_name,
            kind: archive.kind,
            info,
            export,
            sources,
            syntax_sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_archive(compress: bool) -> (ModuleArchive, Vec<u8>) {
        let mut archive = ModuleArchive::new(ModuleKind::Cmod);
        archive.add_file(
            "info.chtl",
            b"[Info] { name = \"widgets\"; version = \"1.0.0\"; }".to_vec(),
        );
        archive.add_file(
            "src/button.chtl",
            b"[Custom] @Element Button { button { } }".to_vec(),
        );
        let bytes = archive.write(compress);
        (archive, bytes)
    }

    #[test]
    fn header_layout_is_fixed() {
        let (_, bytes) = sample_archive(false);
        assert_eq!(&bytes[0..8], CMOD_MAGIC);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 0);
    }

    #[test]
    fn round_trip_uncompressed() {
        let (archive, bytes) = sample_archive(false);
        let mut diags = DiagnosticList::new();
        let read = ModuleArchive::read(&bytes, &mut diags).unwrap();
        assert!(!diags.has_errors());
        assert_eq!(read.kind, ModuleKind::Cmod);
        assert_eq!(read.files, archive.files);
    }

    #[test]
    fn round_trip_compressed() {
        let (archive, bytes) = sample_archive(true);
        let mut diags = DiagnosticList::new();
        let read = ModuleArchive::read(&bytes, &mut diags).unwrap();
        assert!(!diags.has_errors());
        assert_eq!(read.files, archive.files);
    }

    #[test]
    fn corrupted_payload_is_a_checksum_diagnostic() {
        let (_, mut bytes) = sample_archive(false);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let mut diags = DiagnosticList::new();
        let read = ModuleArchive::read(&bytes, &mut diags).unwrap();
        assert!(diags.has_errors());
        // The intact first file still loads.
        assert_eq!(read.files.len(), 1);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut diags = DiagnosticList::new();
        assert!(ModuleArchive::read(b"NOTCHTL!rest", &mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn future_version_is_rejected() {
        let (_, mut bytes) = sample_archive(false);
        bytes[8..12].copy_from_slice(&99u32.to_le_bytes());
        let mut diags = DiagnosticList::new();
        assert!(ModuleArchive::read(&bytes, &mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn info_block_parsing() {
        let source = r#"
            [Info] {
                name = "Chtholly";
                version = "1.2.3";
                author = "someone";
                license = "MIT";
                minCHTLVersion = "1.0.0";
            }
            [Export] {
                @Style ThemeA, ThemeB;
                @Element Card;
            }
        "#;
        let info = CmodInfo::parse(source);
        assert_eq!(info.name, "Chtholly");
        assert_eq!(info.version, "1.2.3");
        assert_eq!(info.min_chtl_version, "1.0.0");

        let export = CmodExport::parse(source);
        assert_eq!(
            export.by_kind.get("@Style"),
            Some(&vec!["ThemeA".to_string(), "ThemeB".to_string()])
        );
        assert_eq!(export.all_names(), vec!["Card", "ThemeA", "ThemeB"]);
    }

    #[test]
    fn info_serialize_round_trips() {
        let mut info = CmodInfo::default();
        info.name = "w".to_string();
        info.version = "0.1.0".to_string();
        let text = info.serialize();
        let parsed = CmodInfo::parse(&text);
        assert_eq!(parsed, info);
    }

    #[test]
    fn pack_and_unpack_directory() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("widgets");
        fs::create_dir_all(module_dir.join("src")).unwrap();
        fs::write(
            module_dir.join("info.chtl"),
            "[Info] { name = \"widgets\"; }",
        )
        .unwrap();
        fs::write(module_dir.join("src/a.chtl"), "div { }").unwrap();

        let bytes = pack_directory(&module_dir, ModuleKind::Cmod, true).unwrap();
        let out = dir.path().join("out");
        let mut diags = DiagnosticList::new();
        let kind = unpack_to_directory(&bytes, &out, &mut diags).unwrap();
        assert_eq!(kind, Some(ModuleKind::Cmod));
        assert!(!diags.has_errors());
        assert_eq!(
            fs::read_to_string(out.join("src/a.chtl")).unwrap(),
            "div { }"
        );
    }

    #[test]
    fn manager_finds_and_loads_modules() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("widgets");
        fs::create_dir_all(module_dir.join("src")).unwrap();
        fs::write(
            module_dir.join("info.chtl"),
            "[Info] { name = \"widgets\"; version = \"1.0.0\"; }\n[Export] { @Element Button; }",
        )
        .unwrap();
        fs::write(
            module_dir.join("src/button.chtl"),
            "[Custom] @Element Button { button { } }",
        )
        .unwrap();

        let mut manager = CmodManager::new();
        manager.add_search_path(dir.path());
        let mut diags = DiagnosticList::new();
        let module = manager.load("widgets", &mut diags).unwrap();
        assert_eq!(module.name, "widgets");
        assert_eq!(module.sources.len(), 1);
        assert_eq!(module.export.all_names(), vec!["Button"]);
        assert!(!diags.has_errors());
    }

    #[test]
    fn cjmod_syntax_declarations_are_collected() {
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
            "printMylove({ url: $ })\nconsole.log($1);",
        )
        .unwrap();

        let bytes = pack_directory(&module_dir, ModuleKind::Cjmod, true).unwrap();
        let archive_path = dir.path().join("printMylove.cjmod");
        fs::write(&archive_path, bytes).unwrap();

        let manager = CmodManager::new();
        let mut diags = DiagnosticList::new();
        let module = manager
            .load_path(&archive_path, "printMylove", &mut diags)
            .unwrap();
        assert_eq!(module.kind, ModuleKind::Cjmod);
        assert_eq!(module.syntax_sources.len(), 1);
        assert_eq!(module.syntax_sources[0].0, "printMylove");
        assert!(module.syntax_sources[0].1.starts_with("printMylove({"));
    }

    #[test]
    fn missing_module_is_an_import_diagnostic() {
        let mut manager = CmodManager::new();
        let mut diags = DiagnosticList::new();
        assert!(manager.load("nope", &mut diags).is_none());
        assert!(diags.has_errors());
    }
}
