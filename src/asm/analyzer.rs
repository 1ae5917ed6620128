//! The `GLOBAL_ASM` block analyzer: walks one block's lines and figures
//! out, without ever invoking an assembler, how many bytes it will
//! contribute to each output section and what stub C code the compiler
//! needs to see to reserve matching space.

use std::path::Path;

use super::directive::{classify, Directive};
use super::function::Function;
use super::state::{AnalyzerState, CurrentSection, GlobalState};
use crate::error::{Error, ErrorContext, Result};

/// Directives this analyzer has no byte-accounting opinion on and simply
/// ignores wherever they appear.
const IGNORABLE_DIRECTIVES: &[&str] = &[".set", ".frame", ".mask", ".fmask", ".insn", ".previous"];

/// Directives only accepted when [`GlobalState::pascal`] is set.
const PASCAL_DIRECTIVES: &[&str] = &[".ent", ".end"];

#[derive(Debug, Default)]
/// Stateless analyzer entry point. A new [`AnalyzerState`] is created for
/// every call to [`GlobalAsmBlock::analyze`]; nothing here is reused
/// across blocks.
pub struct GlobalAsmBlock;

impl GlobalAsmBlock {
    /// Analyze one block's source text (already split into lines by the
    /// preprocessor) and produce its [`Function`] record.
    ///
    /// `start_line` is the 1-indexed line in `path` the block's first
    /// line of assembly corresponds to, used only for diagnostics.
    pub fn analyze(
        &self,
        lines: &[&str],
        start_line: usize,
        path: &Path,
        global: &GlobalState,
    ) -> Result<Function> {
        let mut state = AnalyzerState::new(start_line);
        let mut text_only = true;
        let mut late_rodata_bytes = 0usize;
        let mut late_rodata_has_double = false;
        let mut late_rodata_label_emitted = false;

        let fn_desc = lines
            .iter()
            .filter_map(|line| match classify(line) {
                Directive::LabelDirective(name)
                    if line.trim_start().starts_with("glabel")
                        || line.contains(".globl")
                        || line.contains(".global") =>
                {
                    Some(name)
                }
                _ => None,
            })
            .next()
            .unwrap_or_else(|| format!("block_{start_line}"));
        let ident = sanitize_ident(&fn_desc);

        for (offset, raw_line) in lines.iter().copied().enumerate() {
            state.line_number = start_line + offset;
            let context = ErrorContext::line(path, state.line_number);
            let directive = classify(raw_line);

            if let Directive::SectionDirective(name) = &directive {
                let section = CurrentSection::from_name(name);
                if !matches!(section, CurrentSection::Text) {
                    text_only = false;
                }
                state.current_section = section;
                state.current_section_name = name.clone();
            }

            // Late-rodata lines are held back from `asm_conts` and emitted
            // together, after it, matching where the compiler's own rodata
            // contributions land relative to the late-rodata region.
            if matches!(state.current_section, CurrentSection::LateRodata) {
                if !late_rodata_label_emitted {
                    late_rodata_label_emitted = true;
                    state.function.late_rodata_asm_conts.push(format!("glabel {ident}_late_rodata"));
                }
                state.function.late_rodata_asm_conts.push(raw_line.to_string());
            } else {
                state.function.asm_conts.push(raw_line.to_string());
            }

            match directive {
                Directive::Unknown(text) if text.is_empty() => {}
                Directive::Unknown(text) => {
                    self.check_known_directive(&text, global, &context)?;
                }
                Directive::SectionDirective(_) => {}
                Directive::LabelDirective(name) => {
                    let is_global_label =
                        raw_line.trim_start().starts_with("glabel") || raw_line.contains(".globl") || raw_line.contains(".global");
                    if is_global_label && matches!(state.current_section, CurrentSection::Text) {
                        if state.function.text_glabels.contains(&name) {
                            return Err(Error::AsmSyntax {
                                context,
                                message: format!("duplicate entry label '{name}'"),
                            });
                        }
                        state.function.text_glabels.push(name);
                    }
                }
                Directive::Instruction => {
                    if !matches!(state.current_section, CurrentSection::Text) {
                        text_only = false;
                    }
                    self.add_bytes(&mut state, 4);
                }
                Directive::DataDirective(size) => {
                    if !matches!(state.current_section, CurrentSection::Text) {
                        text_only = false;
                    }
                    if self.is_jump_table_entry(raw_line) {
                        if global.use_jtbl_for_rodata {
                            state.function.jtbl_rodata_size += size;
                            state.function.add_section_bytes(".rodata", size, String::new());
                        } else {
                            late_rodata_bytes += size;
                            state.function.add_section_bytes(".late_rodata", size, String::new());
                        }
                    } else if matches!(state.current_section, CurrentSection::LateRodata) {
                        late_rodata_bytes += size;
                        if size >= 8 && size % 8 == 0 {
                            late_rodata_has_double = true;
                        }
                        state.function.add_section_bytes(".late_rodata", size, String::new());
                    } else {
                        self.add_bytes(&mut state, size);
                    }
                }
                Directive::AlignDirective(power) => {
                    let boundary = 1usize << power;
                    let name = state.current_section.canonical_name(&state.current_section_name);
                    let current = state.function.section_bytes(&name).unwrap_or(0);
                    let padded = current.div_ceil(boundary) * boundary;
                    if padded > current {
                        state.function.add_section_bytes(&name, padded - current, String::new());
                        if matches!(state.current_section, CurrentSection::LateRodata) {
                            late_rodata_bytes += padded - current;
                        }
                    }
                }
            }
        }

        if late_rodata_bytes > global.prelude_if_late_rodata {
            return Err(Error::AsmSyntax {
                context: ErrorContext::line(path, start_line),
                message: format!(
                    "late rodata of {late_rodata_bytes} bytes exceeds the declared budget of {}",
                    global.prelude_if_late_rodata
                ),
            });
        }

        let text_bytes = state.function.section_bytes(".text").unwrap_or(0);
        let instr_count = text_bytes / 4;
        if text_only && instr_count.saturating_sub(global.skip_instr_count) < global.min_instr_count {
            return Err(Error::AsmSyntax {
                context: ErrorContext::line(path, start_line),
                message: format!(
                    "block contributes {instr_count} instructions, fewer than the required minimum {}",
                    global.min_instr_count
                ),
            });
        }

        state.function.fn_desc = fn_desc;

        self.finish_late_rodata(&mut state.function, late_rodata_bytes, late_rodata_has_double);
        self.emit_stubs(&mut state.function, &ident, global, instr_count);

        Ok(state.function)
    }

    fn add_bytes(&self, state: &mut AnalyzerState, bytes: usize) {
        let name = state.current_section.canonical_name(&state.current_section_name);
        state.function.add_section_bytes(&name, bytes, String::new());
    }

    fn check_known_directive(&self, text: &str, global: &GlobalState, context: &ErrorContext) -> Result<()> {
        let directive = text.split_whitespace().next().unwrap_or(text);
        if IGNORABLE_DIRECTIVES.contains(&directive) {
            return Ok(());
        }
        if PASCAL_DIRECTIVES.contains(&directive) {
            if global.pascal {
                return Ok(());
            }
            return Err(Error::AsmSyntax {
                context: context.clone(),
                message: format!("'{directive}' requires --pascal"),
            });
        }
        Err(Error::AsmSyntax {
            context: context.clone(),
            message: format!("unrecognized directive '{text}'"),
        })
    }

    /// A `.word` (or equivalent) directive whose operands are bare
    /// identifiers rather than numeric literals is a jump table entry,
    /// not a plain data word: switch-statement jump tables reference
    /// `.text` labels this way.
    fn is_jump_table_entry(&self, raw_line: &str) -> bool {
        let trimmed = raw_line.trim();
        let Some(rest) = trimmed.strip_prefix(".word").or_else(|| trimmed.strip_prefix(".int")) else {
            return false;
        };
        let args: Vec<&str> = rest.split(',').map(str::trim).filter(|a| !a.is_empty()).collect();
        !args.is_empty() && args.iter().all(|a| a.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '.'))
    }

    /// Convert the accumulated late-rodata byte count into 4-byte dummy
    /// placeholders, applying the 8-byte alignment rule: if any 8-byte
    /// entity appeared, the dummy count must be even so the real bytes
    /// land on an 8-byte boundary once spliced in.
    fn finish_late_rodata(&self, function: &mut Function, late_rodata_bytes: usize, has_double: bool) {
        if late_rodata_bytes == 0 {
            return;
        }
        let mut dummy_count = late_rodata_bytes.div_ceil(4);
        if has_double && dummy_count % 2 != 0 {
            dummy_count += 1;
        }
        function.late_rodata_dummy_bytes = vec![[0u8; 4]; dummy_count];
    }

    /// Regenerate each recorded section's stub expression now that final
    /// sizes are known, and populate `late_rodata_asm_conts`.
    fn emit_stubs(&self, function: &mut Function, ident: &str, global: &GlobalState, instr_count: usize) {
        for entry in function.data.iter_mut() {
            let (section, size, stub) = entry;
            *stub = match section.as_str() {
                ".text" => text_stub(ident, instr_count, global.mips1),
                ".late_rodata" => String::new(), // emitted separately below
                other => data_stub(ident, other, *size),
            };
        }

        if !function.late_rodata_dummy_bytes.is_empty() {
            let words = function.late_rodata_dummy_bytes.len();
            let symbol = stub_symbol_name(ident, ".late_rodata");
            let decl = format!("static const float {symbol}[{words}] = {{0}};");
            if let Some(entry) = function.data.iter_mut().find(|(name, _, _)| name == ".late_rodata") {
                entry.2 = decl;
            }
        }
    }
}

/// The exact symbol name the stub declares (and that the matching
/// hand-written assembly must itself export) for `section`, derived from
/// an already-[`sanitize_ident`]-ed function identifier. Shared between
/// stub generation here and symbol lookup in the post-process splicer so
/// the two sides always agree on a name.
pub fn stub_symbol_name(ident: &str, section: &str) -> String {
    match section {
        ".text" => ident.to_string(),
        ".bss" => format!("{ident}_bss"),
        ".late_rodata" => format!("{ident}_late_rodata"),
        other => format!("{ident}_{}", sanitize_ident(other.trim_start_matches('.'))),
    }
}

fn sanitize_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// MIPS1 has no guaranteed expansion for the `nop` pseudo-instruction the
/// way later ISA revisions do, so its filler reserves each instruction
/// slot with an explicit zero word instead of relying on the assembler's
/// pseudo-op table.
fn text_stub(ident: &str, instr_count: usize, mips1: bool) -> String {
    let fill = if mips1 { ".word 0x00000000" } else { "nop" };
    let mut body = String::new();
    for _ in 0..instr_count {
        body.push_str(&format!("    __asm__(\"{fill}\");\n"));
    }
    format!("void {ident}(void) {{\n{body}}}\n")
}

fn data_stub(ident: &str, section: &str, size: usize) -> String {
    let words = size.div_ceil(4);
    let symbol = stub_symbol_name(ident, section);
    if section == ".bss" {
        format!("static char {symbol}[{size}];")
    } else {
        format!("static uint32_t {symbol}[{words}];")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("test.c")
    }

    #[test]
    fn counts_text_instructions() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().min_instr_count(1).build();
        let lines = ["glabel my_func", "addu $t0, $t1, $t2", "nop", "jr $ra"];
        let f = analyzer.analyze(&lines, 1, &path(), &global).unwrap();
        assert_eq!(f.section_bytes(".text"), Some(12));
        assert_eq!(f.text_glabels, vec!["my_func"]);
        assert_eq!(f.fn_desc, "my_func");
    }

    #[test]
    fn rejects_blocks_under_min_instr_count() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().min_instr_count(5).build();
        let lines = ["glabel my_func", "nop"];
        let err = analyzer.analyze(&lines, 1, &path(), &global).unwrap_err();
        assert!(matches!(err, Error::AsmSyntax { .. }));
    }

    #[test]
    fn two_floats_reserve_eight_bytes() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().build();
        let lines = [".late_rodata", ".float 1.0", ".float 2.0"];
        let f = analyzer.analyze(&lines, 1, &path(), &global).unwrap();
        assert_eq!(f.late_rodata_dummy_bytes.len(), 2);
    }

    #[test]
    fn double_forces_even_dummy_count() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().build();
        let lines = [".late_rodata", ".double 1.0"];
        let f = analyzer.analyze(&lines, 1, &path(), &global).unwrap();
        assert_eq!(f.late_rodata_dummy_bytes.len(), 2);
    }

    #[test]
    fn jump_table_with_jtbl_rodata_goes_to_rodata() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().use_jtbl_for_rodata(true).build();
        let lines = [".late_rodata", ".word case1, case2, case3"];
        let f = analyzer.analyze(&lines, 1, &path(), &global).unwrap();
        assert_eq!(f.jtbl_rodata_size, 12);
        assert_eq!(f.section_bytes(".rodata"), Some(12));
        assert_eq!(f.section_bytes(".late_rodata"), None);
    }

    #[test]
    fn rejects_unrecognized_directive() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().build();
        let lines = [".weirdo something"];
        let err = analyzer.analyze(&lines, 1, &path(), &global).unwrap_err();
        assert!(matches!(err, Error::AsmSyntax { .. }));
    }

    #[test]
    fn pascal_directives_rejected_without_flag() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().build();
        let lines = [".ent my_func"];
        assert!(analyzer.analyze(&lines, 1, &path(), &global).is_err());
    }

    #[test]
    fn pascal_directives_accepted_with_flag() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().pascal(true).build();
        let lines = [".ent my_func", "nop", ".end my_func"];
        assert!(analyzer.analyze(&lines, 1, &path(), &global).is_ok());
    }

    #[test]
    fn rejects_duplicate_glabel() {
        let analyzer = GlobalAsmBlock;
        let global = GlobalState::builder().build();
        let lines = ["glabel dup", "nop", "glabel dup"];
        let err = analyzer.analyze(&lines, 1, &path(), &global).unwrap_err();
        assert!(matches!(err, Error::AsmSyntax { .. }));
    }
}
