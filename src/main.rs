//! CHTL compiler command-line interface.
//!
//! ```text
//! chtl <input> [-o <output>] [-d|--debug] [-m|--module <path>]*
//!      [--pack <dir>] [--pack-cjmod <dir>] [--unpack <file>] [--unpack-cjmod <file>]
//! ```
//!
//! Exit codes: 0 success, 1 usage or compile error, 2 I/O error.

use anyhow::Context;
use chtl_compiler::cjmod::CjmodRegistry;
use chtl_compiler::cmod::{pack_directory, unpack_to_directory, ModuleKind};
use chtl_compiler::diagnostics::DiagnosticList;
use chtl_compiler::{compile_file_with_plugins, CompileOptions};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_IO: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "chtl",
    version,
    about = "Compile CHTL sources into HTML, CSS and JavaScript"
)]
struct Cli {
    /// Input `.chtl` file.
    input: Option<PathBuf>,

    /// Output file (defaults to `<input>.html` next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose diagnostics.
    #[arg(short, long)]
    debug: bool,

    /// Module search directory (repeatable).
    #[arg(short, long = "module")]
    module: Vec<PathBuf>,

    /// Pack a module directory into a `.cmod` archive.
    #[arg(long, value_name = "DIR")]
    pack: Option<PathBuf>,

    /// Pack a module directory into a `.cjmod` archive.
    #[arg(long = "pack-cjmod", value_name = "DIR")]
    pack_cjmod: Option<PathBuf>,

    /// Unpack a `.cmod`/`.cjmod` archive (auto-detected by magic).
    #[arg(long, value_name = "FILE")]
    unpack: Option<PathBuf>,

    /// Unpack a `.cjmod` archive.
    #[arg(long = "unpack-cjmod", value_name = "FILE")]
    unpack_cjmod: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests are success; everything else is a
            // usage error.
            if e.use_stderr() {
                eprint!("{}", e);
                return ExitCode::from(EXIT_ERROR);
            }
            print!("{}", e);
            return ExitCode::from(EXIT_OK);
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(if cli.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_IO)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    if let Some(dir) = &cli.pack {
        return pack(dir, ModuleKind::Cmod, cli.output.as_deref());
    }
    if let Some(dir) = &cli.pack_cjmod {
        return pack(dir, ModuleKind::Cjmod, cli.output.as_deref());
    }
    if let Some(file) = cli.unpack.as_ref().or(cli.unpack_cjmod.as_ref()) {
        return unpack(file, cli.output.as_deref());
    }

    let input = match &cli.input {
        Some(p) => p.clone(),
        None => {
            eprintln!("error: no input file");
            return Ok(EXIT_ERROR);
        }
    };
    if !input.exists() {
        eprintln!("error: input file does not exist: {}", input.display());
        return Ok(EXIT_IO);
    }

    let mut options = CompileOptions {
        module_paths: cli.module.clone(),
        debug: cli.debug,
        use_cache: true,
    };
    // Default search paths after the explicit ones: the executable's
    // `module/` sibling and `./module`.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            options.module_paths.push(dir.join("module"));
        }
    }
    options.module_paths.push(PathBuf::from("./module"));

    log::info!("compiling {}", input.display());
    // The registry travels into the compile unit; `[Import] @CJmod`
    // declarations in the source register their script-side syntax into it.
    let plugins = CjmodRegistry::new();
    let result = compile_file_with_plugins(&input, &options, plugins)
        .with_context(|| format!("cannot read {}", input.display()))?;

    for diagnostic in &result.diagnostics {
        eprintln!("{}", diagnostic);
    }
    if result.has_errors {
        eprintln!("compilation failed");
        return Ok(EXIT_ERROR);
    }

    let output = cli
        .output
        .unwrap_or_else(|| input.with_extension("html"));
    std::fs::write(&output, &result.merged)
        .with_context(|| format!("cannot write {}", output.display()))?;
    log::info!("wrote {}", output.display());

    // `.css`/`.js` siblings are configuration-controlled (SPLIT_OUTPUT).
    if result.split_output {
        if !result.css.trim().is_empty() {
            let css_path = output.with_extension("css");
            std::fs::write(&css_path, &result.css)
                .with_context(|| format!("cannot write {}", css_path.display()))?;
        }
        if !result.js.trim().is_empty() {
            let js_path = output.with_extension("js");
            std::fs::write(&js_path, &result.js)
                .with_context(|| format!("cannot write {}", js_path.display()))?;
        }
    }
    Ok(EXIT_OK)
}

fn pack(dir: &Path, kind: ModuleKind, output: Option<&Path>) -> anyhow::Result<u8> {
    if !dir.is_dir() {
        eprintln!("error: not a directory: {}", dir.display());
        return Ok(EXIT_ERROR);
    }
    let bytes = pack_directory(dir, kind, true)
        .with_context(|| format!("cannot pack {}", dir.display()))?;
    let target = match output {
        Some(o) => o.to_path_buf(),
        None => dir.with_extension(kind.extension()),
    };
    std::fs::write(&target, bytes)
        .with_context(|| format!("cannot write {}", target.display()))?;
    println!("packed {} -> {}", dir.display(), target.display());
    Ok(EXIT_OK)
}

fn unpack(file: &Path, output: Option<&Path>) -> anyhow::Result<u8> {
    let bytes =
        std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
    let out_dir = match output {
        Some(o) => o.to_path_buf(),
        None => file.with_extension(""),
    };
    let mut diags = DiagnosticList::new();
    let kind = unpack_to_directory(&bytes, &out_dir, &mut diags)
        .with_context(|| format!("cannot unpack into {}", out_dir.display()))?;
    for d in diags.iter() {
        eprintln!("{}", d.kind);
    }
    match kind {
        Some(kind) if !diags.has_errors() => {
            println!(
                "unpacked {} ({}) -> {}",
                file.display(),
                kind.extension(),
                out_dir.display()
            );
            Ok(EXIT_OK)
        }
        _ => {
            eprintln!("error: bad module archive: {}", file.display());
            Ok(EXIT_ERROR)
        }
    }
}
