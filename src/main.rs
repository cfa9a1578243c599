//! The `emu32basm` build driver (spec.md §6, SPEC_FULL.md §4.9): drives source files
//! through tokenizer → preprocessor → assembler → linker, then optionally loads and runs
//! the resulting executable on the emulator.
//!
//! Behavior is selected by which flags are present rather than a subcommand: `-c` alone
//! stops after emitting object files, `-makelib` archives them instead of linking, and
//! `-run` (an ambient convenience beyond the distilled CLI surface — spec.md §1 says the
//! system "runs that executable" but never wires a flag for it) boots the emulator on the
//! linked result.

#![warn(clippy::all)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use object::{ObjectFile, StaticLibrary};
use std::fs;
use std::path::{Path, PathBuf};
use tokenizer::{Tokenizer, TokenKind};

/// Build and optionally run EMU32 assembly sources.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source (`.basm`) files to assemble.
    inputs: Vec<PathBuf>,

    /// Stop after emitting object files; don't link.
    #[arg(short = 'c', long = "compile")]
    compile_only: bool,

    /// Archive the compiled objects into a static library instead of linking.
    #[arg(long)]
    makelib: bool,

    /// Output base path; extension is chosen per artifact kind.
    #[arg(short = 'o', long = "output", alias = "out")]
    output: Option<PathBuf>,

    /// Directory for intermediate and final artifacts.
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Add a directory to the `#include <...>` search path.
    #[arg(short = 'I', long = "include", alias = "inc")]
    include_dirs: Vec<PathBuf>,

    /// Link in a static library.
    #[arg(short = 'l', long = "lib")]
    libs: Vec<PathBuf>,

    /// Link in every `.ba` file found directly under a directory.
    #[arg(short = 'L', long = "libdir")]
    libdirs: Vec<PathBuf>,

    /// Define a preprocessor symbol, `KEY` or `KEY=VALUE`.
    #[arg(short = 'D', value_name = "KEY[=VALUE]")]
    defines: Vec<String>,

    /// Keep intermediate `.bi` (preprocessed) files.
    #[arg(long)]
    kp: bool,

    /// Load and run the linked executable after a successful build.
    #[arg(long)]
    run: bool,

    /// RAM size, in 4 KiB pages, for `-run`.
    #[arg(long, default_value_t = 16)]
    ram_pages: u32,

    /// Disk size, in 4 KiB pages, for `-run`.
    #[arg(long, default_value_t = 256)]
    disk_pages: u32,

    /// Backing file for the paged disk, for `-run`.
    #[arg(long)]
    disk_file: Option<PathBuf>,

    /// ROM image file, mapped read-mostly above RAM, for `-run`.
    #[arg(long)]
    rom: Option<PathBuf>,
}

/// Assembly targets this driver emits (spec.md has no multi-architecture concept; this
/// is simply the one target machine id this toolchain's objects carry).
const TARGET_MACHINE: u16 = 1;

fn parse_define(raw: &str) -> (String, String) {
    match raw.split_once('=') {
        Some((k, v)) => (k.to_string(), v.to_string()),
        None => (raw.to_string(), String::new()),
    }
}

fn artifact_path(outdir: Option<&Path>, stem: &str, ext: &str) -> PathBuf {
    let name = format!("{stem}.{ext}");
    match outdir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Resolves the final output path for a link/archive artifact: `-o` names the base path
/// directly (it is not combined with `-outdir`); otherwise the artifact lands under
/// `-outdir` (or the working directory) under `default_stem`.
fn output_path(args: &Args, default_stem: &str, ext: &str) -> PathBuf {
    match &args.output {
        Some(base) => base.with_extension(ext),
        None => artifact_path(args.outdir.as_deref(), default_stem, ext),
    }
}

/// Tokenizes, preprocesses, and assembles one source file into a relocatable object,
/// logging any accumulated [`assembler::AssemblerWarning`]s.
fn build_one(path: &Path, args: &Args) -> Result<ObjectFile> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut tok = Tokenizer::new(&source, false).with_context(|| format!("tokenizing {}", path.display()))?;
    tok.filter_all(&[TokenKind::WhitespaceSpace, TokenKind::WhitespaceTab]);

    let defines = args.defines.iter().map(|d| parse_define(d)).collect();
    let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let mut pp = preprocessor::Preprocessor::new(defines, args.include_dirs.clone());
    pp.preprocess(&mut tok, &base_dir).with_context(|| format!("preprocessing {}", path.display()))?;

    if args.kp {
        let stem = path.file_stem().unwrap_or_default().to_string_lossy();
        let bi_path = artifact_path(args.outdir.as_deref(), &stem, "bi");
        let rendered: String = tok.live_tokens().iter().map(|t| format!("{} ", t.value)).collect();
        fs::write(&bi_path, rendered).with_context(|| format!("writing {}", bi_path.display()))?;
    }

    let (obj, warnings) = assembler::assemble(&mut tok, TARGET_MACHINE)
        .with_context(|| format!("assembling {}", path.display()))?;
    for w in &warnings {
        log::warn!("{}: line {}: `{}` clamped out of its declared range", path.display(), w.line, w.directive);
    }
    Ok(obj)
}

/// Loads every `StaticLibrary` member found in `-l`/`-L` inputs.
fn gather_library_objects(args: &Args) -> Result<Vec<ObjectFile>> {
    let mut objs = Vec::new();
    for lib_path in &args.libs {
        let bytes = fs::read(lib_path).with_context(|| format!("reading {}", lib_path.display()))?;
        objs.extend(StaticLibrary::from_bytes(&bytes)?.objects);
    }
    for dir in &args.libdirs {
        let entries = fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e == "ba") {
                let bytes = fs::read(entry.path())?;
                objs.extend(StaticLibrary::from_bytes(&bytes)?.objects);
            }
        }
    }
    Ok(objs)
}

/// Loads an executable's `.text`/`.data` payload into a freshly wired [`vm::SystemBus`]
/// and runs it to completion, per SPEC_FULL.md §4.9 step 5.
fn run_executable(exe: &ObjectFile, entry_name: &str, args: &Args) -> Result<()> {
    let disk_path = args.disk_file.clone().unwrap_or_else(|| PathBuf::from("emu32.disk"));
    let disk = vm::Disk::open(disk_path, args.disk_pages)?;
    let mmu = vm::VirtualMemory::new(0, args.ram_pages.saturating_sub(1), disk);
    let mut bus = vm::SystemBus::new(mmu);
    bus.register(Box::new(vm::Ram::new(args.ram_pages, 0)));
    if let Some(rom_path) = &args.rom {
        let len = fs::metadata(rom_path).with_context(|| format!("reading {}", rom_path.display()))?.len();
        let npages = u32::try_from(len.div_ceil(u64::from(vm::PAGE_SIZE)).max(1))?;
        let rom = vm::Rom::from_file(rom_path.clone(), npages, args.ram_pages)?;
        bus.register(Box::new(rom));
    }

    let text_section = &exe.sections[exe.section_index(object::SectionType::Text)];
    for (i, word) in exe.text_section.iter().enumerate() {
        bus.write_word(text_section.address as u32 + i as u32 * 4, *word)?;
    }
    let data_section = &exe.sections[exe.section_index(object::SectionType::Data)];
    for (i, byte) in exe.data_section.iter().enumerate() {
        bus.write_byte(data_section.address as u32 + i as u32, *byte)?;
    }

    let entry_idx = *exe
        .string_table
        .get(entry_name)
        .with_context(|| format!("entry symbol `{entry_name}` not found"))?;
    let entry = exe
        .symbol_table
        .get(&entry_idx)
        .with_context(|| format!("entry symbol `{entry_name}` has no symbol-table entry"))?;

    let mut cpu = cpu::Cpu::new();
    cpu.set_pc(entry.value as u32);
    match cpu.run(&mut bus, 0) {
        None => log::info!("emulator ran out of instruction budget with no exception"),
        Some(cpu::CpuError::HaltInstr { pc }) => log::info!("halted at pc {pc:#x}"),
        Some(err) => bail!("emulator exception: {err}"),
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    if let Some(dir) = &args.outdir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut objects = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let obj = build_one(input, &args)?;
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let bo_path = artifact_path(args.outdir.as_deref(), &stem, "bo");
        fs::write(&bo_path, obj.to_bytes()?).with_context(|| format!("writing {}", bo_path.display()))?;
        objects.push(obj);
    }

    if args.makelib {
        let lib = StaticLibrary { objects };
        let ba_path = output_path(&args, "out", "ba");
        fs::write(&ba_path, lib.to_bytes()?).with_context(|| format!("writing {}", ba_path.display()))?;
        return Ok(());
    }

    if args.compile_only {
        return Ok(());
    }

    let mut inputs = objects;
    inputs.extend(gather_library_objects(&args)?);
    let script = linker::LinkerScript::default_script();
    let exe = linker::link(inputs, None)?;

    let exe_path = output_path(&args, "a", "bexe");
    fs::write(&exe_path, exe.to_bytes()?).with_context(|| format!("writing {}", exe_path.display()))?;

    if args.run {
        run_executable(&exe, &script.entry, &args)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
