//! The ELF32 section header, together with the bytes it describes and the
//! specialized views (string table, symbol table, relocation table) built
//! on top of them.

use super::consts::{ELF32_SHDR_SIZE, SHT_NOBITS, SHT_RELA, SHT_STRTAB, SHT_SYMTAB};
use super::format::ElfFormat;
use super::relocation::Relocation;
use super::symbol::Symbol;
use crate::error::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// One section: its header fields, the bytes it owns, and (once
/// [`super::file::ElfFile`] has finished its late-init pass) the parsed
/// symbol or relocation entries for `SHT_SYMTAB`/`SHT_REL`/`SHT_RELA`
/// sections.
pub struct ElfSection {
    /// Section name, resolved from `sh_name` against the section-header
    /// string table during [`super::file::ElfFile`] parsing.
    pub name: String,
    /// Byte offset of `name` in the section-header string table.
    pub sh_name: u32,
    /// Section type (`SHT_*`).
    pub sh_type: u32,
    /// Section attribute flags (`SHF_*`).
    pub sh_flags: u32,
    /// Virtual address this section would be loaded at, or 0.
    pub sh_addr: u32,
    /// File byte offset of this section's data; recomputed on write.
    pub sh_offset: u32,
    /// Size in bytes of this section's data (its notional extent for
    /// `SHT_NOBITS`, which has no backing file bytes).
    pub sh_size: u32,
    /// Section-type-dependent link, e.g. the linked string table for a
    /// symbol table, or the linked symbol table for a relocation section.
    pub sh_link: u32,
    /// Section-type-dependent extra info, e.g. the local-symbol count for
    /// a symbol table, or the target section index for a relocation
    /// section.
    pub sh_info: u32,
    /// Required alignment of this section's data, in bytes (0 or 1 means
    /// unaligned).
    pub sh_addralign: u32,
    /// Size in bytes of one entry, for sections holding a fixed-size
    /// entry table (0 otherwise).
    pub sh_entsize: u32,
    /// The section's raw bytes. Empty (but `sh_size` may still be
    /// nonzero) for `SHT_NOBITS` sections.
    pub data: Vec<u8>,
    /// This section's own index in the section header table.
    pub index: usize,
    /// Parsed entries, populated by [`super::file::ElfFile`]'s late-init
    /// pass for `SHT_SYMTAB` sections.
    pub symbols: Vec<Symbol>,
    /// Parsed entries, populated by [`super::file::ElfFile`]'s late-init
    /// pass for `SHT_REL`/`SHT_RELA` sections.
    pub relocations: Vec<Relocation>,
    /// The index of the section this relocation section applies to
    /// (`sh_info`, resolved during late-init). `None` for non-relocation
    /// sections.
    pub relocated_section: Option<usize>,
}

/// Scan `data` for a NUL-terminated string starting at `offset`. Shared by
/// [`ElfSection::lookup_str`] and [`super::file::ElfFile`]'s name
/// resolution pass, which needs to read a string table's bytes before
/// `ElfSection`'s own `name` field (and hence `is_strtab`) is populated.
pub(crate) fn scan_cstr(
    data: &[u8],
    offset: usize,
    section_name: &str,
    context: &ErrorContext,
) -> Result<String> {
    let bytes = data.get(offset..).ok_or_else(|| Error::ParseElf {
        context: context.clone(),
        message: format!(
            "string table offset {offset} is out of bounds for section '{section_name}' ({} bytes)",
            data.len()
        ),
    })?;
    let end = bytes.iter().position(|&b| b == 0).ok_or_else(|| Error::ParseElf {
        context: context.clone(),
        message: format!("unterminated string at offset {offset} in '{section_name}'"),
    })?;
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

impl ElfSection {
    /// Parse one 40-byte section header at byte offset `at` in `header_data`.
    /// `data` (the section's content bytes) is supplied separately since it
    /// lives at `sh_offset` in the whole file, not contiguous with the header.
    #[allow(clippy::too_many_arguments)]
    pub fn parse_header(
        header_data: &[u8],
        at: usize,
        index: usize,
        data: Vec<u8>,
        format: &ElfFormat,
        context: &ErrorContext,
    ) -> Result<Self> {
        Ok(ElfSection {
            name: String::new(),
            sh_name: format.unpack_u32(header_data, at, context)?,
            sh_type: format.unpack_u32(header_data, at + 4, context)?,
            sh_flags: format.unpack_u32(header_data, at + 8, context)?,
            sh_addr: format.unpack_u32(header_data, at + 12, context)?,
            sh_offset: format.unpack_u32(header_data, at + 16, context)?,
            sh_size: format.unpack_u32(header_data, at + 20, context)?,
            sh_link: format.unpack_u32(header_data, at + 24, context)?,
            sh_info: format.unpack_u32(header_data, at + 28, context)?,
            sh_addralign: format.unpack_u32(header_data, at + 32, context)?,
            sh_entsize: format.unpack_u32(header_data, at + 36, context)?,
            data,
            index,
            symbols: Vec::new(),
            relocations: Vec::new(),
            relocated_section: None,
        })
    }

    /// Serialize the 40-byte section header. Does not include `data`,
    /// which [`super::file::ElfFile::write`] places separately.
    pub fn serialize_header(&self, format: &ElfFormat) -> [u8; ELF32_SHDR_SIZE] {
        let mut out = [0u8; ELF32_SHDR_SIZE];
        format.pack_u32(&mut out, 0, self.sh_name);
        format.pack_u32(&mut out, 4, self.sh_type);
        format.pack_u32(&mut out, 8, self.sh_flags);
        format.pack_u32(&mut out, 12, self.sh_addr);
        format.pack_u32(&mut out, 16, self.sh_offset);
        format.pack_u32(&mut out, 20, self.sh_size);
        format.pack_u32(&mut out, 24, self.sh_link);
        format.pack_u32(&mut out, 28, self.sh_info);
        format.pack_u32(&mut out, 32, self.sh_addralign);
        format.pack_u32(&mut out, 36, self.sh_entsize);
        out
    }

    /// Whether this section is `SHT_NOBITS` (occupies no file space).
    pub fn is_nobits(&self) -> bool {
        self.sh_type == SHT_NOBITS
    }

    /// Whether this section is a string table (`SHT_STRTAB`).
    pub fn is_strtab(&self) -> bool {
        self.sh_type == SHT_STRTAB
    }

    /// Whether this section is a symbol table (`SHT_SYMTAB`).
    pub fn is_symtab(&self) -> bool {
        self.sh_type == SHT_SYMTAB
    }

    /// Whether this section is a relocation table (`SHT_REL` or `SHT_RELA`).
    pub fn is_rel_or_rela(&self) -> bool {
        self.sh_type == super::consts::SHT_REL || self.sh_type == SHT_RELA
    }

    /// Look up the NUL-terminated string starting at byte `offset` in this
    /// string table section's data.
    pub fn lookup_str(&self, offset: usize, context: &ErrorContext) -> Result<String> {
        if !self.is_strtab() {
            return Err(Error::InvalidElf {
                context: context.clone(),
                message: format!("section '{}' is not a string table", self.name),
            });
        }
        scan_cstr(&self.data, offset, &self.name, context)
    }

    /// Append `s` (NUL-terminated) to this string table and return the
    /// offset it was written at.
    ///
    /// This is append-only: every offset ever returned by `add_str` stays
    /// valid for the lifetime of the section, because later calls can
    /// only grow `data`, never rewrite or relocate the bytes a prior
    /// caller may already have cached. There is therefore nothing a
    /// consumer's cached offset could be invalidated by.
    pub fn add_str(&mut self, s: &str) -> u32 {
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        offset
    }

    /// Parse this section's bytes as a sequence of `Elf32_Sym` entries.
    /// Names are left unresolved (empty); call [`Symbol::resolve_name`]
    /// (or [`super::file::ElfFile`]'s late-init pass) afterwards.
    pub fn parse_symbols(&self, format: &ElfFormat, context: &ErrorContext) -> Result<Vec<Symbol>> {
        const ENTSIZE: usize = super::consts::ELF32_SYM_SIZE;
        if self.data.len() % ENTSIZE != 0 {
            return Err(Error::ParseElf {
                context: context.clone(),
                message: format!(
                    "symbol table '{}' size {} is not a multiple of {ENTSIZE}",
                    self.name,
                    self.data.len()
                ),
            });
        }
        (0..self.data.len() / ENTSIZE)
            .map(|i| Symbol::parse(&self.data, i * ENTSIZE, format, context))
            .collect()
    }

    /// Parse this section's bytes as a sequence of relocation entries,
    /// using `Elf32_Rela` layout if `self.sh_type == SHT_RELA`.
    pub fn parse_relocations(
        &self,
        format: &ElfFormat,
        context: &ErrorContext,
    ) -> Result<Vec<Relocation>> {
        let has_addend = self.sh_type == SHT_RELA;
        let entsize = if has_addend {
            super::consts::ELF32_RELA_SIZE
        } else {
            super::consts::ELF32_REL_SIZE
        };
        if self.data.len() % entsize != 0 {
            return Err(Error::ParseElf {
                context: context.clone(),
                message: format!(
                    "relocation section '{}' size {} is not a multiple of {entsize}",
                    self.name,
                    self.data.len()
                ),
            });
        }
        (0..self.data.len() / entsize)
            .map(|i| Relocation::parse(&self.data, i * entsize, has_addend, format, context))
            .collect()
    }

    /// Symbols with `LOCAL` binding, in table order. Valid only once
    /// `self.symbols` has been populated.
    pub fn local_symbols(&self) -> &[Symbol] {
        let split = self
            .symbols
            .iter()
            .position(|s| s.bind() != crate::elf::consts::STB_LOCAL)
            .unwrap_or(self.symbols.len());
        &self.symbols[..split]
    }

    /// Symbols with non-`LOCAL` binding, in table order.
    pub fn global_symbols(&self) -> &[Symbol] {
        let split = self
            .symbols
            .iter()
            .position(|s| s.bind() != crate::elf::consts::STB_LOCAL)
            .unwrap_or(self.symbols.len());
        &self.symbols[split..]
    }

    /// Find a symbol by name, returning its index in `self.symbols` and
    /// its `st_value`.
    pub fn find_symbol(&self, name: &str) -> Option<(usize, u32)> {
        self.symbols
            .iter()
            .position(|s| s.name == name)
            .map(|i| (i, self.symbols[i].st_value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn strtab() -> ElfSection {
        ElfSection {
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
        }
    }

    #[test]
    fn add_str_then_lookup() {
        let mut tab = strtab();
        let off_a = tab.add_str("foo");
        let off_b = tab.add_str("barbaz");
        assert_eq!(tab.lookup_str(off_a as usize, &ErrorContext::none()).unwrap(), "foo");
        assert_eq!(
            tab.lookup_str(off_b as usize, &ErrorContext::none()).unwrap(),
            "barbaz"
        );
        // Earlier offsets remain valid after later appends.
        assert_eq!(tab.lookup_str(off_a as usize, &ErrorContext::none()).unwrap(), "foo");
    }

    #[test]
    fn lookup_str_out_of_bounds() {
        let tab = strtab();
        assert!(tab.lookup_str(100, &ErrorContext::none()).is_err());
    }

    #[test]
    fn symbol_partitioning() {
        let mut sec = strtab();
        sec.sh_type = SHT_SYMTAB;
        let mut local = Symbol {
            st_name: 0,
            st_value: 0,
            st_size: 0,
            st_info: 0,
            st_other: 0,
            st_shndx: 0,
            name: "local".into(),
        };
        local.set_bind_type(crate::elf::consts::STB_LOCAL, 0);
        let mut global = Symbol {
            st_name: 0,
            st_value: 0,
            st_size: 0,
            st_info: 0,
            st_other: 0,
            st_shndx: 0,
            name: "global".into(),
        };
        global.set_bind_type(crate::elf::consts::STB_GLOBAL, 0);
        sec.symbols = vec![local.clone(), global.clone()];
        assert_eq!(sec.local_symbols(), &[local]);
        assert_eq!(sec.global_symbols(), &[global]);
    }

    #[test]
    fn find_symbol_by_name() {
        let mut sec = strtab();
        sec.sh_type = SHT_SYMTAB;
        sec.symbols = vec![Symbol {
            st_name: 0,
            st_value: 0x40,
            st_size: 4,
            st_info: 0,
            st_other: 0,
            st_shndx: 1,
            name: "func".into(),
        }];
        assert_eq!(sec.find_symbol("func"), Some((0, 0x40)));
        assert_eq!(sec.find_symbol("missing"), None);
    }
}
