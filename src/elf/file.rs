//! The top-level ELF32 relocatable object: header plus section table,
//! parsed in three passes and serialized with the atomic-write discipline.

use std::path::Path;

use super::consts::{
    ELF32_EHDR_SIZE, ELF32_SHDR_SIZE, ET_REL, EV_CURRENT, SHN_UNDEF, SHT_MIPS_DEBUG,
    SHT_MIPS_GPTAB, SHT_NOBITS, SHT_NULL, SHT_REL, SHT_RELA, SHT_STRTAB,
};
use super::format::ElfFormat;
use super::header::ElfHeader;
use super::section::{scan_cstr, ElfSection};
use crate::atomic_write::write_atomic;
use crate::error::{Error, ErrorContext, Result};

#[derive(Debug, Clone)]
/// A parsed ELF32 relocatable object file, ready for inspection or
/// mutation (adding sections, splicing bytes, dropping sections) before
/// being serialized back out.
pub struct ElfFile {
    /// The file header.
    pub header: ElfHeader,
    /// The endianness this file was parsed with (and will be serialized
    /// back with).
    pub format: ElfFormat,
    /// Sections in section-header-table order. Index 0 is always the
    /// reserved null section.
    pub sections: Vec<ElfSection>,
}

impl ElfFile {
    /// Parse a complete ELF32 object from `data`.
    ///
    /// Three passes, per the container's contract: (1) the file header,
    /// (2) each section header and its data slice, (3) name resolution
    /// followed by late-init of symbol and relocation sections, which
    /// need other sections (string tables, target sections) to already
    /// exist.
    pub fn parse(data: &[u8], context: &ErrorContext) -> Result<Self> {
        let (header, format) = ElfHeader::parse(data, context)?;

        let shentsize = header.e_shentsize as usize;
        if shentsize != 0 && shentsize != ELF32_SHDR_SIZE {
            return Err(Error::Unsupported {
                context: context.clone(),
                message: format!("non-standard section header size {shentsize}"),
            });
        }

        let mut sections = Vec::with_capacity(header.e_shnum as usize);
        for i in 0..header.e_shnum as usize {
            let at = header.e_shoff as usize + i * ELF32_SHDR_SIZE;
            if at + ELF32_SHDR_SIZE > data.len() {
                return Err(Error::ParseElf {
                    context: context.clone(),
                    message: format!("section header {i} lies past the end of the file"),
                });
            }
            let sh_type = format.unpack_u32(data, at + 4, context)?;
            let sh_offset = format.unpack_u32(data, at + 16, context)? as usize;
            let sh_size = format.unpack_u32(data, at + 20, context)? as usize;
            let section_data = if sh_type == SHT_NOBITS || sh_type == SHT_NULL {
                Vec::new()
            } else {
                data.get(sh_offset..sh_offset + sh_size)
                    .ok_or_else(|| Error::ParseElf {
                        context: context.clone(),
                        message: format!(
                            "section {i} data [{sh_offset}, {}) lies past the end of the file",
                            sh_offset + sh_size
                        ),
                    })?
                    .to_vec()
            };
            sections.push(ElfSection::parse_header(data, at, i, section_data, &format, context)?);
        }

        let mut file = ElfFile {
            header,
            format,
            sections,
        };
        file.resolve_names(context)?;
        file.late_init(context)?;
        Ok(file)
    }

    fn resolve_names(&mut self, context: &ErrorContext) -> Result<()> {
        let shstrtab_data = self
            .sections
            .get(self.header.e_shstrndx as usize)
            .map(|s| s.data.clone())
            .unwrap_or_default();
        for section in self.sections.iter_mut() {
            section.name = scan_cstr(&shstrtab_data, section.sh_name as usize, "shstrtab", context)?;
        }
        Ok(())
    }

    fn late_init(&mut self, context: &ErrorContext) -> Result<()> {
        for i in 0..self.sections.len() {
            if self.sections[i].is_symtab() {
                let mut symbols = self.sections[i].parse_symbols(&self.format, context)?;
                let strtab_idx = self.sections[i].sh_link as usize;
                let strtab = self.sections.get(strtab_idx).ok_or_else(|| Error::InvalidElf {
                    context: context.clone(),
                    message: format!("symbol table '{}' has no linked string table", self.sections[i].name),
                })?;
                for sym in symbols.iter_mut() {
                    sym.resolve_name(strtab, context)?;
                }
                self.sections[i].symbols = symbols;
            } else if self.sections[i].is_rel_or_rela() {
                let relocations = self.sections[i].parse_relocations(&self.format, context)?;
                self.sections[i].relocations = relocations;
                self.sections[i].relocated_section = Some(self.sections[i].sh_info as usize);
            }
        }
        Ok(())
    }

    /// Find a section by exact name.
    pub fn find_section(&self, name: &str) -> Option<&ElfSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Find a section by exact name, mutably.
    pub fn find_section_mut(&mut self, name: &str) -> Option<&mut ElfSection> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Index of the section-header string table.
    fn shstrtab_index(&self) -> usize {
        self.header.e_shstrndx as usize
    }

    /// Append a new section, registering `name` in `.shstrtab`. Returns
    /// the new section's index.
    #[allow(clippy::too_many_arguments)]
    pub fn add_section(
        &mut self,
        name: &str,
        sh_type: u32,
        sh_flags: u32,
        sh_link: u32,
        sh_info: u32,
        sh_addralign: u32,
        sh_entsize: u32,
        data: Vec<u8>,
    ) -> usize {
        let index = self.sections.len();
        let shstrtab_index = self.shstrtab_index();
        let sh_name = self.sections[shstrtab_index].add_str(name);
        let sh_size = data.len() as u32;
        self.sections.push(ElfSection {
            name: name.to_string(),
            sh_name,
            sh_type,
            sh_flags,
            sh_addr: 0,
            sh_offset: 0,
            sh_size,
            sh_link,
            sh_info,
            sh_addralign,
            sh_entsize,
            data,
            index,
            symbols: Vec::new(),
            relocations: Vec::new(),
            relocated_section: None,
        });
        self.header.e_shnum = self.sections.len() as u16;
        index
    }

    /// Remove `SHT_MIPS_DEBUG` and `SHT_MIPS_GPTAB` sections (IRIX-era
    /// debug info this tool has no use for), any relocation section that
    /// targets one of them, and renumber every surviving `sh_link`,
    /// `sh_info`, `st_shndx`, `relocated_section`, and `e_shstrndx`
    /// reference to match.
    pub fn drop_mdebug_gptab(&mut self) {
        let directly_dropped: std::collections::HashSet<usize> = self
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.sh_type == SHT_MIPS_DEBUG || s.sh_type == SHT_MIPS_GPTAB)
            .map(|(i, _)| *i)
            .collect();
        if directly_dropped.is_empty() {
            return;
        }
        let dropped: std::collections::HashSet<usize> = self
            .sections
            .iter()
            .enumerate()
            .filter(|(i, s)| {
                directly_dropped.contains(i)
                    || ((s.sh_type == SHT_REL || s.sh_type == SHT_RELA)
                        && directly_dropped.contains(&(s.sh_info as usize)))
            })
            .map(|(i, _)| *i)
            .collect();

        // Old index -> new index, for everything that survives.
        let mut remap = vec![None; self.sections.len()];
        let mut next = 0usize;
        for (i, slot) in remap.iter_mut().enumerate() {
            if !dropped.contains(&i) {
                *slot = Some(next);
                next += 1;
            }
        }

        let old_shstrndx = self.header.e_shstrndx as usize;
        let mut kept: Vec<ElfSection> = Vec::with_capacity(next);
        for (i, mut section) in std::mem::take(&mut self.sections).into_iter().enumerate() {
            if dropped.contains(&i) {
                continue;
            }
            // `i` was just excluded from `dropped`, so its remap slot was
            // populated by the loop above.
            let Some(new_index) = remap[i] else {
                continue;
            };
            section.index = new_index;
            if let Some(new_link) = remap[section.sh_link as usize] {
                section.sh_link = new_link as u32;
            }
            if section.sh_type == SHT_REL || section.sh_type == SHT_RELA {
                if let Some(new_info) = remap[section.sh_info as usize] {
                    section.sh_info = new_info as u32;
                }
                section.relocated_section = section.relocated_section.and_then(|old| remap[old]);
            }
            for sym in section.symbols.iter_mut() {
                let shndx = sym.st_shndx as usize;
                if shndx != SHN_UNDEF as usize && shndx < remap.len() {
                    if let Some(new_shndx) = remap[shndx] {
                        sym.st_shndx = new_shndx as u16;
                    }
                }
            }
            kept.push(section);
        }
        self.sections = kept;
        self.header.e_shnum = self.sections.len() as u16;
        if let Some(new_shstrndx) = remap[old_shstrndx] {
            self.header.e_shstrndx = new_shstrndx as u16;
        }
    }

    /// Re-serialize this object: header, then section data (padded to
    /// each section's `sh_addralign`, `SHT_NOBITS` sections contributing
    /// no bytes), then the section header table aligned to 4 bytes.
    /// `sh_offset`/`e_shoff`/`e_shnum`/`e_shstrndx` are recomputed from
    /// the current section list.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![0u8; ELF32_EHDR_SIZE];
        let mut offsets = vec![0u32; self.sections.len()];

        for (i, section) in self.sections.iter().enumerate() {
            if section.is_nobits() || section.sh_type == SHT_NULL {
                offsets[i] = out.len() as u32;
                continue;
            }
            let align = section.sh_addralign.max(1) as usize;
            let pad = (align - out.len() % align) % align;
            out.resize(out.len() + pad, 0);
            offsets[i] = out.len() as u32;
            out.extend_from_slice(&section.data);
        }

        let shtab_align = 4usize;
        let pad = (shtab_align - out.len() % shtab_align) % shtab_align;
        out.resize(out.len() + pad, 0);
        let shoff = out.len() as u32;

        for (i, section) in self.sections.iter().enumerate() {
            let mut header = section.clone();
            header.sh_offset = offsets[i];
            out.extend_from_slice(&header.serialize_header(&self.format));
        }

        let mut header = self.header.clone();
        header.e_shoff = shoff;
        header.e_shnum = self.sections.len() as u16;
        let header_bytes = header.serialize(&self.format);
        out[0..ELF32_EHDR_SIZE].copy_from_slice(&header_bytes);

        out
    }

    /// Serialize and atomically write this object to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.serialize())
    }

    /// Build a fresh, mostly-empty ELF32 MIPS relocatable object: the
    /// null section and an empty `.shstrtab`.
    pub fn new_empty(format: ElfFormat) -> Self {
        let header = ElfHeader {
            e_ident_data: format.ei_data(),
            e_ident_osabi: 0,
            e_ident_abiversion: 0,
            e_type: ET_REL,
            e_machine: super::consts::EM_MIPS,
            e_version: EV_CURRENT as u32,
            e_entry: 0,
            e_phoff: 0,
            e_shoff: 0,
            e_flags: 0,
            e_ehsize: ELF32_EHDR_SIZE as u16,
            e_phentsize: 0,
            e_phnum: 0,
            e_shentsize: ELF32_SHDR_SIZE as u16,
            e_shnum: 0,
            e_shstrndx: 0,
        };
        let mut file = ElfFile {
            header,
            format,
            sections: vec![ElfSection {
                name: String::new(),
                sh_name: 0,
                sh_type: SHT_NULL,
                sh_flags: 0,
                sh_addr: 0,
                sh_offset: 0,
                sh_size: 0,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 0,
                sh_entsize: 0,
                data: Vec::new(),
                index: 0,
                symbols: Vec::new(),
                relocations: Vec::new(),
                relocated_section: None,
            }],
        };
        let shstrtab_index = file.add_section(".shstrtab", SHT_STRTAB, 0, 0, 0, 1, 0, vec![0]);
        file.header.e_shstrndx = shstrtab_index as u16;
        file
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip_empty_object() {
        let file = ElfFile::new_empty(ElfFormat::big_endian());
        let bytes = file.serialize();
        let parsed = ElfFile::parse(&bytes, &ErrorContext::none()).unwrap();
        assert_eq!(parsed.sections.len(), file.sections.len());
        assert_eq!(parsed.find_section(".shstrtab").unwrap().name, ".shstrtab");
    }

    #[test]
    fn add_section_then_find() {
        let mut file = ElfFile::new_empty(ElfFormat::little_endian());
        file.add_section(".text", super::super::consts::SHT_PROGBITS, 0, 0, 0, 4, 0, vec![1, 2, 3, 4]);
        let bytes = file.serialize();
        let parsed = ElfFile::parse(&bytes, &ErrorContext::none()).unwrap();
        let text = parsed.find_section(".text").unwrap();
        assert_eq!(text.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn drop_mdebug_gptab_renumbers_links() {
        let mut file = ElfFile::new_empty(ElfFormat::big_endian());
        file.add_section(".text", super::super::consts::SHT_PROGBITS, 0, 0, 0, 4, 0, vec![0; 4]);
        let mdebug = file.add_section(".mdebug", SHT_MIPS_DEBUG, 0, 0, 0, 1, 0, vec![1, 2, 3]);
        file.add_section(
            ".rel.mdebug",
            SHT_REL,
            0,
            0,
            mdebug as u32,
            4,
            8,
            Vec::new(),
        );
        let after_text_count_before = file.sections.len();
        file.drop_mdebug_gptab();
        assert!(file.sections.len() < after_text_count_before);
        assert!(file.find_section(".mdebug").is_none());
        assert!(file.find_section(".rel.mdebug").is_none());
        assert!(file.find_section(".text").is_some());
    }
}
