//! Object fixup: the post-process half of the pipeline. Splices the
//! assembler's real bytes over the compiler's reserved stub bytes, merges
//! symbol tables and relocations, and re-serializes the combined object.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::asm::stub_symbol_name;
use crate::config::{mangle_with_filename, Config, ConvertStatics};
use crate::elf::consts::{
    ELF32_REL_SIZE, ELF32_RELA_SIZE, ELF32_SYM_SIZE, EM_MIPS, SHN_UNDEF, SHT_RELA, STB_LOCAL,
};
use crate::elf::{ElfFile, ElfFormat, ElfSection, Relocation, Symbol};
use crate::error::{Error, ErrorContext, Result};

/// One [`crate::asm::Function`]'s cross-phase record: everything the
/// post-process stage needs that isn't already recoverable from the two
/// object files themselves. Written by the preprocessor alongside the
/// sidecar `.s`, read back here.
///
/// Serialized as plain text rather than through a serialization crate:
/// the shape is a handful of scalars and a short list of (section, size)
/// pairs, and the teacher's own object model is all hand-rolled binary
/// parsing, not derive-based. A few `split`/`parse` calls cover it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionMeta {
    /// Display name for diagnostics, copied from [`crate::asm::Function::fn_desc`].
    pub fn_desc: String,
    /// Entry labels the block defined in `.text`.
    pub text_glabels: Vec<String>,
    /// Per-section byte counts, excluding `.late_rodata` (tracked
    /// separately in `late_rodata_bytes`).
    pub sections: Vec<(String, usize)>,
    /// Total late-rodata byte count (dummy placeholders, 4 bytes each).
    pub late_rodata_bytes: usize,
}

impl FunctionMeta {
    /// Build the cross-phase record for one analyzed block.
    pub fn from_function(f: &crate::asm::Function) -> Self {
        FunctionMeta {
            fn_desc: f.fn_desc.clone(),
            text_glabels: f.text_glabels.clone(),
            sections: f
                .data
                .iter()
                .filter(|(name, _, _)| name != ".late_rodata")
                .map(|(name, size, _)| (name.clone(), *size))
                .collect(),
            late_rodata_bytes: f.late_rodata_dummy_bytes.len() * 4,
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("FUNCTION {}\n", self.fn_desc));
        out.push_str(&format!("GLABELS {}\n", self.text_glabels.join(",")));
        for (name, size) in &self.sections {
            out.push_str(&format!("SECTION {name} {size}\n"));
        }
        out.push_str(&format!("LATE_RODATA {}\n", self.late_rodata_bytes));
        out.push_str("END\n");
        out
    }

    fn parse_one(lines: &[&str], context: &ErrorContext) -> Result<Self> {
        let mut fn_desc = None;
        let mut text_glabels = Vec::new();
        let mut sections = Vec::new();
        let mut late_rodata_bytes = 0usize;
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line == "END" {
                continue;
            }
            if let Some(rest) = line.strip_prefix("FUNCTION ") {
                fn_desc = Some(rest.to_string());
            } else if let Some(rest) = line.strip_prefix("GLABELS ") {
                text_glabels = rest.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect();
            } else if let Some(rest) = line.strip_prefix("SECTION ") {
                let mut parts = rest.split_whitespace();
                let name = parts.next().ok_or_else(|| malformed(context, line))?;
                let size: usize = parts.next().and_then(|s| s.parse().ok()).ok_or_else(|| malformed(context, line))?;
                sections.push((name.to_string(), size));
            } else if let Some(rest) = line.strip_prefix("LATE_RODATA ") {
                late_rodata_bytes = rest.trim().parse().map_err(|_| malformed(context, line))?;
            } else {
                return Err(malformed(context, line));
            }
        }
        Ok(FunctionMeta {
            fn_desc: fn_desc.ok_or_else(|| malformed(context, "<missing FUNCTION>"))?,
            text_glabels,
            sections,
            late_rodata_bytes,
        })
    }

    /// Serialize a list of function records to the sidecar metadata text.
    pub fn to_text_list(functions: &[FunctionMeta]) -> String {
        functions.iter().map(FunctionMeta::to_text).collect()
    }

    /// Parse the sidecar metadata text back into function records, one
    /// per `FUNCTION ... END` block.
    pub fn parse_text(text: &str, context: &ErrorContext) -> Result<Vec<FunctionMeta>> {
        let mut out = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in text.lines() {
            if line.trim() == "END" {
                current.push(line);
                out.push(FunctionMeta::parse_one(&current, context)?);
                current.clear();
            } else {
                current.push(line);
            }
        }
        Ok(out)
    }
}

fn malformed(context: &ErrorContext, line: &str) -> Error {
    Error::ParseElf {
        context: context.clone(),
        message: format!("malformed function metadata line: '{line}'"),
    }
}

/// One section's worth of splicing: where the real bytes live in the
/// assembled sidecar object, and where the stub bytes they replace live
/// in the compiler's object.
struct Splice {
    asm_section: usize,
    real_offset: usize,
    size: usize,
    obj_section: usize,
    stub_offset: usize,
    stub_symbol_name: Option<String>,
}

/// Run the post-process stage end to end: read `objfile_path` and its
/// paired assembled sidecar and metadata (named by convention from
/// `objfile_path`), fix up, and atomically overwrite `objfile_path`.
///
/// The assembled sidecar object is expected at
/// `objfile_path.with_extension("asm.o")` and the function metadata at
/// `objfile_path.with_extension("globalasm.meta")` — the preprocessor
/// writes both under those names for the same source.
pub fn run(config: &Config) -> Result<()> {
    let objfile_path = config.post_process.as_ref().ok_or_else(|| Error::ConfigError {
        message: "post-process requires --post-process PATH".to_string(),
    })?;
    let asmfile_path = objfile_path.with_extension("asm.o");
    let meta_path = objfile_path.with_extension("globalasm.meta");

    let context = ErrorContext::path(objfile_path);
    let obj_bytes = std::fs::read(objfile_path).map_err(|e| Error::io(context.clone(), e))?;
    let mut objfile = ElfFile::parse(&obj_bytes, &context)?;

    let asm_context = ErrorContext::path(&asmfile_path);
    let asm_bytes = std::fs::read(&asmfile_path).map_err(|e| Error::io(asm_context.clone(), e))?;
    let asmfile = ElfFile::parse(&asm_bytes, &asm_context)?;

    let meta_text = std::fs::read_to_string(&meta_path).map_err(|e| Error::io(ErrorContext::path(&meta_path), e))?;
    let functions = FunctionMeta::parse_text(&meta_text, &ErrorContext::path(&meta_path))?;

    fixup(&mut objfile, &asmfile, &functions, &config.source, config.convert_statics, config.drop_mdebug_gptab, &context)?;

    info!("{}: fixed up {} function(s)", objfile_path.display(), functions.len());
    objfile.write(objfile_path)
}

/// The core splice/merge/relocate/re-layout algorithm, independent of
/// where the two objects and the metadata came from.
pub fn fixup(
    objfile: &mut ElfFile,
    asmfile: &ElfFile,
    functions: &[FunctionMeta],
    source_path: &Path,
    convert_statics: ConvertStatics,
    drop_mdebug_gptab: bool,
    context: &ErrorContext,
) -> Result<()> {
    if objfile.format.is_big_endian() != asmfile.format.is_big_endian() {
        return Err(Error::InvalidElf {
            context: context.clone(),
            message: "objfile and asmfile have different byte order".to_string(),
        });
    }
    if objfile.header.e_machine != EM_MIPS || asmfile.header.e_machine != EM_MIPS {
        return Err(Error::Unsupported {
            context: context.clone(),
            message: "fixup only supports EM_MIPS objects".to_string(),
        });
    }

    let mut splices = Vec::new();
    for function in functions {
        for (section, size) in &function.sections {
            splices.push(locate_splice(objfile, asmfile, &function.fn_desc, section, *size, context)?);
        }
        if function.late_rodata_bytes > 0 {
            splices.push(locate_late_rodata_splice(objfile, asmfile, &function.fn_desc, function.late_rodata_bytes, context)?);
        }
    }

    for splice in &splices {
        apply_byte_splice(objfile, asmfile, splice);
    }

    let (obj_map, asm_map) = merge_symbol_table(objfile, asmfile, &splices, source_path, convert_statics, context)?;
    merge_relocations(objfile, asmfile, &splices, &obj_map, &asm_map, context)?;

    if drop_mdebug_gptab {
        objfile.drop_mdebug_gptab();
    }

    verify_layout(objfile, context)?;
    Ok(())
}

fn symtab_index(file: &ElfFile) -> Option<usize> {
    file.sections.iter().position(|s| s.is_symtab())
}

/// Locate the stub symbol `stub_symbol_name(ident, section)` in `objfile`
/// and the corresponding real bytes in `asmfile`.
fn locate_splice(
    objfile: &ElfFile,
    asmfile: &ElfFile,
    ident: &str,
    section: &str,
    size: usize,
    context: &ErrorContext,
) -> Result<Splice> {
    let symbol_name = stub_symbol_name(ident, section);
    let (obj_section, stub_offset, stub_size) = find_symbol_definition(objfile, &symbol_name, context)?;
    if stub_size != size {
        return Err(Error::AsmSizeMismatch {
            context: context.clone(),
            message: format!("stub symbol '{symbol_name}' is {stub_size} bytes, analyzer recorded {size}"),
        });
    }
    let (asm_section, real_offset, _) = find_symbol_definition(asmfile, &symbol_name, context)?;
    Ok(Splice {
        asm_section,
        real_offset,
        size,
        obj_section,
        stub_offset,
        stub_symbol_name: Some(symbol_name),
    })
}

/// `.late_rodata` has no single stub symbol sized to match; the stub is
/// the dummy float/double array `{ident}_late_rodata`, and the real bytes
/// are the whole of `asmfile`'s `.late_rodata` section (which the
/// analyzer's synthesized `glabel {ident}_late_rodata` line anchors at
/// offset 0 of that block).
fn locate_late_rodata_splice(
    objfile: &ElfFile,
    asmfile: &ElfFile,
    ident: &str,
    size: usize,
    context: &ErrorContext,
) -> Result<Splice> {
    let symbol_name = stub_symbol_name(ident, ".late_rodata");
    let (obj_section, stub_offset, stub_size) = find_symbol_definition(objfile, &symbol_name, context)?;
    if stub_size != size {
        return Err(Error::AsmSizeMismatch {
            context: context.clone(),
            message: format!("late-rodata stub '{symbol_name}' is {stub_size} bytes, analyzer recorded {size}"),
        });
    }
    let (asm_section, real_offset, _) = find_symbol_definition(asmfile, &symbol_name, context)?;
    Ok(Splice {
        asm_section,
        real_offset,
        size,
        obj_section,
        stub_offset,
        stub_symbol_name: Some(symbol_name),
    })
}

fn find_symbol_definition(file: &ElfFile, name: &str, context: &ErrorContext) -> Result<(usize, usize, usize)> {
    let symtab = symtab_index(file).ok_or_else(|| Error::SymbolLookup {
        context: context.clone(),
        message: "object has no symbol table".to_string(),
    })?;
    let sym = file.sections[symtab]
        .symbols
        .iter()
        .find(|s| s.name == name && s.st_shndx != SHN_UNDEF)
        .ok_or_else(|| Error::SymbolLookup {
            context: context.clone(),
            message: format!("symbol '{name}' is not defined"),
        })?;
    Ok((sym.st_shndx as usize, sym.st_value as usize, sym.st_size as usize))
}

fn apply_byte_splice(objfile: &mut ElfFile, asmfile: &ElfFile, splice: &Splice) {
    let obj_section = &objfile.sections[splice.obj_section];
    if obj_section.is_nobits() {
        // SHT_NOBITS has no backing bytes to overwrite; size was already
        // checked against the stub in locate_splice.
        return;
    }
    let real = &asmfile.sections[splice.asm_section].data[splice.real_offset..splice.real_offset + splice.size];
    let real = real.to_vec();
    objfile.sections[splice.obj_section].data[splice.stub_offset..splice.stub_offset + splice.size]
        .copy_from_slice(&real);
}

enum Origin {
    KeptObj(usize),
    ImportedAsm(usize),
}

/// Drop the compiler's stub symbols, import the hand-written
/// implementations' symbols in their place (translated to the spliced
/// offsets and target sections), apply `--convert-statics` to any
/// remaining local symbols from `asmfile` that fall within a spliced
/// range, and re-sort so all `STB_LOCAL` symbols precede the rest.
///
/// Returns (old objfile symbol index -> new index, asm symbol index ->
/// new index) so relocation translation can follow.
fn merge_symbol_table(
    objfile: &mut ElfFile,
    asmfile: &ElfFile,
    splices: &[Splice],
    source_path: &Path,
    convert_statics: ConvertStatics,
    context: &ErrorContext,
) -> Result<(Vec<Option<usize>>, HashMap<usize, usize>)> {
    let obj_symtab = symtab_index(objfile).ok_or_else(|| Error::SymbolLookup {
        context: context.clone(),
        message: "objfile has no symbol table".to_string(),
    })?;
    let asm_symtab = symtab_index(asmfile);

    let dropped_names: std::collections::HashSet<&str> =
        splices.iter().filter_map(|s| s.stub_symbol_name.as_deref()).collect();

    let old_symbols = objfile.sections[obj_symtab].symbols.clone();
    let mut entries: Vec<(Symbol, Origin)> = old_symbols
        .iter()
        .enumerate()
        .filter(|(_, s)| !dropped_names.contains(s.name.as_str()))
        .map(|(i, s)| (s.clone(), Origin::KeptObj(i)))
        .collect();

    if let Some(asm_symtab) = asm_symtab {
        for (asm_idx, sym) in asmfile.sections[asm_symtab].symbols.iter().enumerate() {
            if sym.st_shndx == SHN_UNDEF || sym.name.is_empty() {
                continue;
            }
            let Some(splice) = splices
                .iter()
                .find(|s| s.asm_section == sym.st_shndx as usize && (sym.st_value as usize) >= s.real_offset && (sym.st_value as usize) < s.real_offset + s.size)
            else {
                continue;
            };
            let translated_value = splice.stub_offset as u32 + (sym.st_value - splice.real_offset as u32);
            let mut translated = sym.clone();
            translated.st_value = translated_value;
            translated.st_shndx = splice.obj_section as u16;

            if sym.bind() == STB_LOCAL {
                match convert_statics {
                    ConvertStatics::No => continue,
                    ConvertStatics::Local => {}
                    ConvertStatics::Global => translated.set_bind_type(crate::elf::consts::STB_GLOBAL, sym.symbol_type()),
                    ConvertStatics::GlobalWithFilename => {
                        translated.name = mangle_with_filename(&sym.name, source_path);
                        translated.set_bind_type(crate::elf::consts::STB_GLOBAL, sym.symbol_type());
                    }
                }
            }
            entries.push((translated, Origin::ImportedAsm(asm_idx)));
        }
    }

    entries.sort_by_key(|(s, _)| if s.bind() == STB_LOCAL { 0 } else { 1 });
    let local_count = entries.iter().filter(|(s, _)| s.bind() == STB_LOCAL).count();

    let strtab_idx = objfile.sections[obj_symtab].sh_link as usize;
    let mut obj_map = vec![None; old_symbols.len()];
    let mut asm_map = HashMap::new();
    let mut symbols = Vec::with_capacity(entries.len());
    for (new_idx, (mut symbol, origin)) in entries.into_iter().enumerate() {
        match origin {
            Origin::KeptObj(old_idx) => obj_map[old_idx] = Some(new_idx),
            Origin::ImportedAsm(asm_idx) => {
                asm_map.insert(asm_idx, new_idx);
                symbol.st_name = objfile.sections[strtab_idx].add_str(&symbol.name);
            }
        }
        symbols.push(symbol);
    }

    objfile.sections[obj_symtab].symbols = symbols;
    objfile.sections[obj_symtab].sh_info = local_count as u32;
    rebuild_symtab_data(&mut objfile.sections[obj_symtab], objfile.format);

    Ok((obj_map, asm_map))
}

fn rebuild_symtab_data(section: &mut ElfSection, format: ElfFormat) {
    let mut data = Vec::with_capacity(section.symbols.len() * ELF32_SYM_SIZE);
    for sym in &section.symbols {
        data.extend_from_slice(&sym.serialize(&format));
    }
    section.data = data;
    section.sh_size = section.data.len() as u32;
}

fn rebuild_reloc_data(section: &mut ElfSection, format: ElfFormat) {
    let mut data = Vec::new();
    for reloc in &section.relocations {
        data.extend_from_slice(&reloc.serialize(&format));
    }
    section.data = data;
    section.sh_size = section.data.len() as u32;
}

/// Renumber every surviving `objfile` relocation's symbol index (the
/// symbol table was just reshuffled), then translate and append the
/// `asmfile` relocations that fall within a spliced range.
fn merge_relocations(
    objfile: &mut ElfFile,
    asmfile: &ElfFile,
    splices: &[Splice],
    obj_map: &[Option<usize>],
    asm_map: &HashMap<usize, usize>,
    context: &ErrorContext,
) -> Result<()> {
    let format = objfile.format;
    for section in objfile.sections.iter_mut() {
        if !section.is_rel_or_rela() || section.relocations.is_empty() {
            continue;
        }
        for reloc in section.relocations.iter_mut() {
            let old_idx = reloc.sym_index() as usize;
            let new_idx = obj_map.get(old_idx).copied().flatten().ok_or_else(|| Error::SymbolLookup {
                context: context.clone(),
                message: format!("relocation referenced symbol index {old_idx}, dropped during merge"),
            })?;
            reloc.set_sym_index(new_idx as u32);
        }
        rebuild_reloc_data(section, format);
    }

    let mut to_add: HashMap<usize, Vec<Relocation>> = HashMap::new();
    for splice in splices {
        for reloc_section in asmfile.sections.iter() {
            if reloc_section.relocated_section != Some(splice.asm_section) {
                continue;
            }
            for reloc in &reloc_section.relocations {
                let offset = reloc.r_offset as usize;
                if offset < splice.real_offset || offset >= splice.real_offset + splice.size {
                    continue;
                }
                let old_asm_idx = reloc.sym_index() as usize;
                let new_idx = asm_map.get(&old_asm_idx).copied().ok_or_else(|| Error::SymbolLookup {
                    context: context.clone(),
                    message: format!("relocation at asm offset {offset} references a symbol outside the merged set"),
                })?;
                let translated = Relocation {
                    r_offset: (splice.stub_offset + (offset - splice.real_offset)) as u32,
                    r_info: Relocation::pack_info(new_idx as u32, reloc.reloc_type()),
                    r_addend: reloc.r_addend,
                };
                to_add.entry(splice.obj_section).or_default().push(translated);
            }
        }
    }

    let symtab_idx = symtab_index(objfile).ok_or_else(|| Error::SymbolLookup {
        context: context.clone(),
        message: "objfile has no symbol table".to_string(),
    })?;
    for (target, relocs) in to_add {
        let has_addend = relocs.iter().any(|r| r.r_addend.is_some());
        let reloc_section_idx = find_or_create_reloc_section(objfile, target, has_addend, symtab_idx);
        objfile.sections[reloc_section_idx].relocations.extend(relocs);
        rebuild_reloc_data(&mut objfile.sections[reloc_section_idx], format);
    }
    Ok(())
}

fn find_or_create_reloc_section(objfile: &mut ElfFile, target: usize, rela: bool, symtab_idx: usize) -> usize {
    let wanted_type = if rela { SHT_RELA } else { crate::elf::consts::SHT_REL };
    if let Some(idx) = objfile
        .sections
        .iter()
        .position(|s| s.relocated_section == Some(target) && s.sh_type == wanted_type)
    {
        return idx;
    }
    let target_name = objfile.sections[target].name.clone();
    let prefix = if rela { ".rela" } else { ".rel" };
    let entsize = if rela { ELF32_RELA_SIZE } else { ELF32_REL_SIZE } as u32;
    let idx = objfile.add_section(
        &format!("{prefix}{target_name}"),
        wanted_type,
        0,
        symtab_idx as u32,
        target as u32,
        4,
        entsize,
        Vec::new(),
    );
    objfile.sections[idx].relocated_section = Some(target);
    idx
}

/// Byte width of the field a MIPS relocation's `r_offset` addresses,
/// used only to bound the extent check in [`verify_layout`]. Half-word
/// relocations (`HI16`/`LO16`/`GPREL16`/`16`) still patch a 16-bit field
/// inside a 32-bit instruction word, so treat unrecognized types as
/// word-sized rather than assume a smaller, possibly-unsafe width.
fn reloc_field_width(reloc: &Relocation) -> usize {
    use crate::elf::consts::{R_MIPS_16, R_MIPS_GPREL16, R_MIPS_HI16, R_MIPS_LO16, R_MIPS_NONE};
    match reloc.reloc_type() {
        R_MIPS_NONE => 0,
        R_MIPS_16 | R_MIPS_HI16 | R_MIPS_LO16 | R_MIPS_GPREL16 => 2,
        _ => 4,
    }
}

/// Sanity-check the re-laid-out object: every relocation's field lies
/// within its target section, and every symbol's `st_value + st_size`
/// lies within the section it claims (`SHN_UNDEF`/reserved indices
/// exempted).
fn verify_layout(objfile: &ElfFile, context: &ErrorContext) -> Result<()> {
    for section in &objfile.sections {
        if section.is_rel_or_rela() {
            let Some(target) = section.relocated_section else { continue };
            let Some(target_section) = objfile.sections.get(target) else { continue };
            for reloc in &section.relocations {
                let field_end = reloc.r_offset as usize + reloc_field_width(reloc);
                if field_end > target_section.sh_size as usize {
                    return Err(Error::InvalidElf {
                        context: context.clone(),
                        message: format!(
                            "relocation in '{}' at offset {} lies outside target section '{}' ({} bytes)",
                            section.name, reloc.r_offset, target_section.name, target_section.sh_size
                        ),
                    });
                }
            }
        }
        if section.is_symtab() {
            for sym in &section.symbols {
                if sym.st_shndx == SHN_UNDEF || sym.st_shndx as usize >= crate::elf::consts::SHN_LORESERVE as usize {
                    continue;
                }
                let Some(owner) = objfile.sections.get(sym.st_shndx as usize) else {
                    return Err(Error::InvalidElf {
                        context: context.clone(),
                        message: format!("symbol '{}' references nonexistent section {}", sym.name, sym.st_shndx),
                    });
                };
                if sym.st_value + sym.st_size > owner.sh_size {
                    return Err(Error::InvalidElf {
                        context: context.clone(),
                        message: format!(
                            "symbol '{}' extent [{}, {}) exceeds its section '{}' ({} bytes)",
                            sym.name,
                            sym.st_value,
                            sym.st_value + sym.st_size,
                            owner.name,
                            owner.sh_size
                        ),
                    });
                }
            }
        }
    }
    debug!("verified layout: {} sections", objfile.sections.len());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::elf::consts::{SHT_NOBITS, SHT_PROGBITS, SHT_STRTAB, SHT_SYMTAB, STT_FUNC};

    #[test]
    fn function_meta_roundtrips_through_text() {
        let meta = FunctionMeta {
            fn_desc: "my_func".to_string(),
            text_glabels: vec!["my_func".to_string()],
            sections: vec![(".text".to_string(), 8), (".bss".to_string(), 4)],
            late_rodata_bytes: 8,
        };
        let text = FunctionMeta::to_text_list(std::slice::from_ref(&meta));
        let parsed = FunctionMeta::parse_text(&text, &ErrorContext::none()).unwrap();
        assert_eq!(parsed, vec![meta]);
    }

    fn strtab(names: &[&str]) -> (ElfSection, Vec<u32>) {
        let mut section = ElfSection {
            name: ".strtab".into(),
            sh_name: 0,
            sh_type: SHT_STRTAB,
            sh_flags: 0,
            sh_addr: 0,
            sh_offset: 0,
            sh_size: 0,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 1,
            sh_entsize: 0,
            data: vec![0],
            index: 0,
            symbols: Vec::new(),
            relocations: Vec::new(),
            relocated_section: None,
        };
        let offsets = names.iter().map(|n| section.add_str(n)).collect();
        (section, offsets)
    }

    fn symbol(name: &str, shndx: u16, value: u32, size: u32, bind: u8) -> Symbol {
        let mut s = Symbol {
            st_name: 0,
            st_value: value,
            st_size: size,
            st_info: 0,
            st_other: 0,
            st_shndx: shndx,
            name: name.to_string(),
        };
        s.set_bind_type(bind, STT_FUNC);
        s
    }

    /// Build a minimal objfile with one `.text` stub (4 zero bytes) and
    /// one matching asmfile with the real 4-byte instruction, and check
    /// the splice overwrites the stub bytes and imports the real symbol.
    #[test]
    fn splices_text_stub_and_imports_symbol() {
        let format = ElfFormat::big_endian();
        let mut objfile = ElfFile::new_empty(format);
        let text_idx = objfile.add_section(".text", SHT_PROGBITS, 0, 0, 0, 4, 0, vec![0; 4]);
        let symtab_idx = objfile.add_section(".symtab", SHT_SYMTAB, 0, 0, 0, 4, ELF32_SYM_SIZE as u32, Vec::new());
        let obj_strtab_idx = objfile.sections.len();
        objfile.sections.push(strtab(&["my_func"]).0);
        objfile.header.e_shnum = objfile.sections.len() as u16;
        objfile.sections[symtab_idx].sh_link = obj_strtab_idx as u32;
        objfile.sections[symtab_idx].symbols = vec![
            symbol("", 0, 0, 0, STB_LOCAL),
            symbol("my_func", text_idx as u16, 0, 4, crate::elf::consts::STB_GLOBAL),
        ];
        rebuild_symtab_data(&mut objfile.sections[symtab_idx], format);

        let mut asmfile = ElfFile::new_empty(format);
        let asm_text_idx = asmfile.add_section(".text", SHT_PROGBITS, 0, 0, 0, 4, 0, vec![0xde, 0xad, 0xbe, 0xef]);
        let asm_symtab_idx = asmfile.add_section(".symtab", SHT_SYMTAB, 0, 0, 0, 4, ELF32_SYM_SIZE as u32, Vec::new());
        let asm_strtab_idx = asmfile.sections.len();
        asmfile.sections.push(strtab(&["my_func"]).0);
        asmfile.header.e_shnum = asmfile.sections.len() as u16;
        asmfile.sections[asm_symtab_idx].sh_link = asm_strtab_idx as u32;
        asmfile.sections[asm_symtab_idx].symbols = vec![
            symbol("", 0, 0, 0, STB_LOCAL),
            symbol("my_func", asm_text_idx as u16, 0, 4, crate::elf::consts::STB_GLOBAL),
        ];
        rebuild_symtab_data(&mut asmfile.sections[asm_symtab_idx], format);

        let meta = FunctionMeta {
            fn_desc: "my_func".to_string(),
            text_glabels: vec!["my_func".to_string()],
            sections: vec![(".text".to_string(), 4)],
            late_rodata_bytes: 0,
        };

        fixup(
            &mut objfile,
            &asmfile,
            &[meta],
            Path::new("test.c"),
            ConvertStatics::No,
            false,
            &ErrorContext::none(),
        )
        .unwrap();

        assert_eq!(objfile.sections[text_idx].data, vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(objfile.sections[symtab_idx].symbols.iter().any(|s| s.name == "my_func"));
    }

    #[test]
    fn bss_stub_splice_skips_byte_copy() {
        let format = ElfFormat::little_endian();
        let mut objfile = ElfFile::new_empty(format);
        let bss_idx = objfile.add_section(".bss", SHT_NOBITS, 0, 0, 0, 4, 0, Vec::new());
        objfile.sections[bss_idx].sh_size = 8;
        let symtab_idx = objfile.add_section(".symtab", SHT_SYMTAB, 0, 0, 0, 4, ELF32_SYM_SIZE as u32, Vec::new());
        let obj_strtab_idx = objfile.sections.len();
        objfile.sections.push(strtab(&["f_bss"]).0);
        objfile.header.e_shnum = objfile.sections.len() as u16;
        objfile.sections[symtab_idx].sh_link = obj_strtab_idx as u32;
        objfile.sections[symtab_idx].symbols =
            vec![symbol("", 0, 0, 0, STB_LOCAL), symbol("f_bss", bss_idx as u16, 0, 8, crate::elf::consts::STB_GLOBAL)];
        rebuild_symtab_data(&mut objfile.sections[symtab_idx], format);

        let mut asmfile = ElfFile::new_empty(format);
        let asm_bss_idx = asmfile.add_section(".bss", SHT_NOBITS, 0, 0, 0, 4, 0, Vec::new());
        asmfile.sections[asm_bss_idx].sh_size = 8;
        let asm_symtab_idx = asmfile.add_section(".symtab", SHT_SYMTAB, 0, 0, 0, 4, ELF32_SYM_SIZE as u32, Vec::new());
        let asm_strtab_idx = asmfile.sections.len();
        asmfile.sections.push(strtab(&["f_bss"]).0);
        asmfile.header.e_shnum = asmfile.sections.len() as u16;
        asmfile.sections[asm_symtab_idx].sh_link = asm_strtab_idx as u32;
        asmfile.sections[asm_symtab_idx].symbols =
            vec![symbol("", 0, 0, 0, STB_LOCAL), symbol("f_bss", asm_bss_idx as u16, 0, 8, crate::elf::consts::STB_GLOBAL)];
        rebuild_symtab_data(&mut asmfile.sections[asm_symtab_idx], format);

        let meta = FunctionMeta {
            fn_desc: "f".to_string(),
            text_glabels: vec!["f".to_string()],
            sections: vec![(".bss".to_string(), 8)],
            late_rodata_bytes: 0,
        };

        fixup(&mut objfile, &asmfile, &[meta], Path::new("t.c"), ConvertStatics::No, false, &ErrorContext::none()).unwrap();
        assert!(objfile.sections[bss_idx].data.is_empty());
        assert_eq!(objfile.sections[bss_idx].sh_size, 8);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let format = ElfFormat::big_endian();
        let mut objfile = ElfFile::new_empty(format);
        let text_idx = objfile.add_section(".text", SHT_PROGBITS, 0, 0, 0, 4, 0, vec![0; 4]);
        let symtab_idx = objfile.add_section(".symtab", SHT_SYMTAB, 0, 0, 0, 4, ELF32_SYM_SIZE as u32, Vec::new());
        let obj_strtab_idx = objfile.sections.len();
        objfile.sections.push(strtab(&["f"]).0);
        objfile.header.e_shnum = objfile.sections.len() as u16;
        objfile.sections[symtab_idx].sh_link = obj_strtab_idx as u32;
        objfile.sections[symtab_idx].symbols =
            vec![symbol("", 0, 0, 0, STB_LOCAL), symbol("f", text_idx as u16, 0, 4, crate::elf::consts::STB_GLOBAL)];
        rebuild_symtab_data(&mut objfile.sections[symtab_idx], format);

        let asmfile = ElfFile::new_empty(format);

        let meta = FunctionMeta {
            fn_desc: "f".to_string(),
            text_glabels: vec!["f".to_string()],
            sections: vec![(".text".to_string(), 8)], // wrong: stub is only 4 bytes
            late_rodata_bytes: 0,
        };

        let err = fixup(&mut objfile.clone(), &asmfile, &[meta], Path::new("t.c"), ConvertStatics::No, false, &ErrorContext::none())
            .unwrap_err();
        assert!(matches!(err, Error::AsmSizeMismatch { .. }));
    }
}
