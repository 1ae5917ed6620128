//! Source preprocessor: scans a C file for `GLOBAL_ASM` blocks, drives
//! the analyzer on each one, and produces a rewritten C file plus a
//! sidecar assembly file for the external assembler to consume.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::asm::{Function, GlobalAsmBlock, GlobalState};
use crate::atomic_write::write_atomic;
use crate::config::Config;
use crate::encoding;
use crate::error::{Error, ErrorContext, Result};
use crate::fixup::FunctionMeta;

/// Bound on recursive `#include` expansion inside an asm sidecar file.
const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What [`preprocess`] did with the source. Distinguishes a pass-through
/// (no blocks found) from a genuine rewrite, so callers can skip writing
/// identical output and a build system can skip re-assembling.
pub enum PreprocessStatus {
    /// The source contained no `GLOBAL_ASM` blocks; the output is the
    /// input, unchanged.
    NoAsmBlocks,
    /// At least one block was found and rewritten.
    Processed,
}

#[derive(Debug, Clone)]
/// Everything [`preprocess`] produced from one source file.
pub struct PreprocessOutput {
    /// Whether any blocks were found.
    pub status: PreprocessStatus,
    /// The C source with each `GLOBAL_ASM` block replaced by its stub.
    pub rewritten_c: String,
    /// `None` when `status == NoAsmBlocks` — there is nothing for the
    /// assembler to build.
    pub sidecar_asm: Option<String>,
    /// One entry per analyzed block, in source order.
    pub functions: Vec<Function>,
}

/// Read, preprocess, and atomically write the outputs for `source_path`.
/// The rewritten C file replaces `source_path` in place (the compiler
/// reads the same path next); the sidecar assembly is written to
/// `source_path` with its extension replaced by `s`.
pub fn run(source_path: &Path, config: &Config, global: &GlobalState) -> Result<PreprocessOutput> {
    let context = ErrorContext::path(source_path);
    let raw = std::fs::read(source_path).map_err(|e| Error::io(context.clone(), e))?;
    let input_enc = encoding::lookup(&config.input_enc)?;
    let text = encoding::decode(&raw, input_enc, &context)?;

    let output = preprocess(&text, source_path, config, global)?;

    let output_enc = encoding::lookup(&config.output_enc)?;
    let rewritten_bytes = encoding::encode(&output.rewritten_c, output_enc, &context)?;
    write_atomic(source_path, &rewritten_bytes)?;

    if let Some(sidecar) = &output.sidecar_asm {
        let sidecar_path = source_path.with_extension("s");
        write_atomic(&sidecar_path, sidecar.as_bytes())?;
        info!("{}: wrote sidecar assembly to {}", source_path.display(), sidecar_path.display());
    }

    Ok(output)
}

/// Core preprocessing logic, independent of where the source came from
/// or where the outputs go (kept separate from [`run`] so it can be
/// exercised without touching the filesystem).
pub fn preprocess(
    text: &str,
    source_path: &Path,
    config: &Config,
    global: &GlobalState,
) -> Result<PreprocessOutput> {
    let mut rewritten = String::with_capacity(text.len());
    let mut sidecar = String::new();
    let mut functions = Vec::new();
    let mut any_late_rodata = false;

    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;

        if let Some(inline_start) = find_global_asm_call(line) {
            let (block_lines, consumed, closed_on_line) =
                collect_inline_block(&lines, i, inline_start, source_path)?;
            let function = analyze_block(&block_lines, line_no, source_path, global)?;
            emit_function(&function, &mut rewritten, &mut sidecar, &mut any_late_rodata);
            functions.push(function);
            i += consumed;
            let _ = closed_on_line;
            continue;
        }

        if let Some(path_literal) = find_pragma_global_asm(line) {
            let asm_path = resolve_relative(source_path, &path_literal);
            let asm_text = read_with_includes(&asm_path, &mut HashSet::new(), 0, &ErrorContext::line(source_path, line_no))?;
            let block_lines: Vec<&str> = asm_text.lines().collect();
            let function = analyze_block(&block_lines, 1, &asm_path, global)?;
            emit_function(&function, &mut rewritten, &mut sidecar, &mut any_late_rodata);
            functions.push(function);
            i += 1;
            continue;
        }

        rewritten.push_str(line);
        rewritten.push('\n');
        i += 1;
    }

    if functions.is_empty() {
        return Ok(PreprocessOutput {
            status: PreprocessStatus::NoAsmBlocks,
            rewritten_c: text.to_string(),
            sidecar_asm: None,
            functions,
        });
    }

    let mut full_sidecar = String::new();
    full_sidecar.push_str(".set noat\n.set noreorder\n");
    if global.mips1 {
        full_sidecar.push_str(".set mips1\n");
    }
    if global.kpic {
        full_sidecar.push_str(".set pic2\n");
    }
    if any_late_rodata {
        if let Some(prelude_path) = &config.asm_prelude {
            if let Ok(prelude) = std::fs::read_to_string(prelude_path) {
                full_sidecar.push_str(&prelude);
                full_sidecar.push('\n');
            }
        }
    }
    full_sidecar.push_str(&sidecar);

    info!(
        "{}: processed {} GLOBAL_ASM block(s)",
        source_path.display(),
        functions.len()
    );

    Ok(PreprocessOutput {
        status: PreprocessStatus::Processed,
        rewritten_c: rewritten,
        sidecar_asm: Some(full_sidecar),
        functions,
    })
}

fn analyze_block(
    block_lines: &[&str],
    start_line: usize,
    path: &Path,
    global: &GlobalState,
) -> Result<Function> {
    debug!("{}:{start_line}: analyzing GLOBAL_ASM block", path.display());
    GlobalAsmBlock.analyze(block_lines, start_line, path, global)
}

fn emit_function(function: &Function, rewritten: &mut String, sidecar: &mut String, any_late_rodata: &mut bool) {
    for (_, _, stub) in &function.data {
        if !stub.is_empty() {
            rewritten.push_str(stub);
            rewritten.push('\n');
        }
    }
    sidecar.push_str(&format!("# {}\n", function.fn_desc));
    for line in &function.asm_conts {
        sidecar.push_str(line);
        sidecar.push('\n');
    }
    for line in &function.late_rodata_asm_conts {
        sidecar.push_str(line);
        sidecar.push('\n');
    }
    if !function.late_rodata_dummy_bytes.is_empty() {
        *any_late_rodata = true;
    }
}

/// Find `GLOBAL_ASM(` in `line`, returning the byte offset right after
/// the opening parenthesis.
fn find_global_asm_call(line: &str) -> Option<usize> {
    let idx = line.find("GLOBAL_ASM(")?;
    Some(idx + "GLOBAL_ASM(".len())
}

/// Find `#pragma GLOBAL_ASM "path"`, returning the quoted path.
fn find_pragma_global_asm(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("#pragma")?.trim_start().strip_prefix("GLOBAL_ASM")?;
    let rest = rest.trim();
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.to_string())
}

/// Collect the lines making up an inline `GLOBAL_ASM(...)` call, which
/// may span multiple source lines before its closing `)`. Returns the
/// assembly lines (the quoted literal's content, one assembly line per
/// `\n` in the literal, or the path's file contents if the literal looks
/// like a bare path), the number of source lines consumed, and the
/// 0-indexed line the call closed on.
fn collect_inline_block(
    lines: &[&str],
    start_idx: usize,
    after_paren: usize,
    source_path: &Path,
) -> Result<(Vec<String>, usize, usize)> {
    let mut raw = lines[start_idx][after_paren..].to_string();
    let mut end_idx = start_idx;
    while !raw.trim_end().ends_with(')') && !raw.contains(')') {
        end_idx += 1;
        if end_idx >= lines.len() {
            return Err(Error::AsmSyntax {
                context: ErrorContext::line(source_path, start_idx + 1),
                message: "unterminated GLOBAL_ASM(...) call".to_string(),
            });
        }
        raw.push('\n');
        raw.push_str(lines[end_idx]);
    }
    let close = raw.rfind(')').unwrap_or(raw.len());
    let literal = raw[..close].trim();
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let unescaped = inner.replace("\\n", "\n").replace("\\\"", "\"");
    let block_lines: Vec<String> = unescaped.lines().map(str::to_string).collect();
    Ok((block_lines, end_idx - start_idx + 1, end_idx))
}

fn resolve_relative(source_path: &Path, literal: &str) -> PathBuf {
    let candidate = PathBuf::from(literal);
    if candidate.is_absolute() {
        return candidate;
    }
    source_path.parent().map(|dir| dir.join(&candidate)).unwrap_or(candidate)
}

/// Read `path`, expanding `#include "..."` lines recursively up to
/// [`MAX_INCLUDE_DEPTH`], rejecting cycles via `visited`.
fn read_with_includes(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
    depth: usize,
    context: &ErrorContext,
) -> Result<String> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::AsmSyntax {
            context: context.clone(),
            message: format!("#include nesting exceeds {MAX_INCLUDE_DEPTH} levels"),
        });
    }
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical.clone()) {
        return Err(Error::AsmSyntax {
            context: context.clone(),
            message: format!("#include cycle detected at '{}'", path.display()),
        });
    }

    let raw = std::fs::read(path).map_err(|e| Error::io(ErrorContext::path(path), e))?;
    let text = encoding::decode(&raw, encoding_rs::WINDOWS_1252, context)?;

    let mut out = String::new();
    for line in text.lines() {
        if let Some(included) = line.trim_start().strip_prefix("#include") {
            if let Some(included_path) = included.trim().strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                let resolved = resolve_relative(path, included_path);
                let expanded = read_with_includes(&resolved, visited, depth + 1, context)?;
                out.push_str(&expanded);
                out.push('\n');
                continue;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    visited.remove(&canonical);
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    fn config() -> Config {
        Config::builder().source(PathBuf::from("test.c")).build()
    }

    #[test]
    fn passthrough_when_no_blocks() {
        let global = GlobalState::builder().build();
        let text = "int main(void) { return 0; }\n";
        let out = preprocess(text, Path::new("test.c"), &config(), &global).unwrap();
        assert_eq!(out.status, PreprocessStatus::NoAsmBlocks);
        assert_eq!(out.rewritten_c, text);
        assert!(out.sidecar_asm.is_none());
    }

    #[test]
    fn processes_inline_block() {
        let global = GlobalState::builder().build();
        let text = "GLOBAL_ASM(\"glabel my_func\\naddu $t0, $t1, $t2\\njr $ra\")\n";
        let out = preprocess(text, Path::new("test.c"), &config(), &global).unwrap();
        assert_eq!(out.status, PreprocessStatus::Processed);
        assert_eq!(out.functions.len(), 1);
        assert_eq!(out.functions[0].fn_desc, "my_func");
        assert!(out.sidecar_asm.unwrap().contains("my_func"));
        assert!(out.rewritten_c.contains("my_func"));
    }
}
