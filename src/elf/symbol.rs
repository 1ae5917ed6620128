//! The ELF32 symbol table entry.

use super::consts::{ELF32_SYM_SIZE, SHN_XINDEX};
use super::format::ElfFormat;
use super::section::ElfSection;
use crate::error::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// One `Elf32_Sym` entry. `name` is populated separately, by
/// [`Symbol::resolve_name`], once the owning section's linked string
/// table is known.
pub struct Symbol {
    /// Byte offset of this symbol's name in the linked string table.
    pub st_name: u32,
    /// The symbol's value: a section-relative offset for a defined
    /// symbol, or an absolute value / size for other symbol types.
    pub st_value: u32,
    /// Size in bytes of the object the symbol describes, or 0 if unknown.
    pub st_size: u32,
    /// Binding (upper 4 bits) and type (lower 4 bits); see [`Symbol::bind`]
    /// and [`Symbol::symbol_type`].
    pub st_info: u8,
    /// Symbol visibility; unused by this tool beyond round-tripping.
    pub st_other: u8,
    /// Index of the section this symbol is defined in, or one of the
    /// reserved `SHN_*` values.
    pub st_shndx: u16,
    /// The symbol's name, resolved from `st_name` by [`Symbol::resolve_name`].
    /// Empty until resolution has run.
    pub name: String,
}

impl Symbol {
    /// Parse one symbol entry at byte offset `at` in `data`.
    ///
    /// Rejects `st_shndx == SHN_XINDEX`: this tool does not support the
    /// extended-index scheme (objects with more than 0xff00 sections),
    /// per spec.
    pub fn parse(data: &[u8], at: usize, format: &ElfFormat, context: &ErrorContext) -> Result<Self> {
        let st_name = format.unpack_u32(data, at, context)?;
        let st_value = format.unpack_u32(data, at + 4, context)?;
        let st_size = format.unpack_u32(data, at + 8, context)?;
        let st_info = *data.get(at + 8 + 4).ok_or_else(|| Error::ParseElf {
            context: context.clone(),
            message: "truncated symbol entry".into(),
        })?;
        let st_other = *data.get(at + 8 + 5).ok_or_else(|| Error::ParseElf {
            context: context.clone(),
            message: "truncated symbol entry".into(),
        })?;
        let st_shndx = format.unpack_u16(data, at + 8 + 6, context)?;

        if st_shndx == SHN_XINDEX {
            return Err(Error::Unsupported {
                context: context.clone(),
                message: "SHN_XINDEX (extended section indices) is not supported".into(),
            });
        }

        Ok(Symbol {
            st_name,
            st_value,
            st_size,
            st_info,
            st_other,
            st_shndx,
            name: String::new(),
        })
    }

    /// Serialize this symbol to exactly 16 bytes.
    pub fn serialize(&self, format: &ElfFormat) -> [u8; ELF32_SYM_SIZE] {
        let mut out = [0u8; ELF32_SYM_SIZE];
        format.pack_u32(&mut out, 0, self.st_name);
        format.pack_u32(&mut out, 4, self.st_value);
        format.pack_u32(&mut out, 8, self.st_size);
        out[12] = self.st_info;
        out[13] = self.st_other;
        format.pack_u16(&mut out, 14, self.st_shndx);
        out
    }

    /// The binding (upper 4 bits of `st_info`).
    pub fn bind(&self) -> u8 {
        self.st_info >> 4
    }

    /// The type (lower 4 bits of `st_info`).
    pub fn symbol_type(&self) -> u8 {
        self.st_info & 0xf
    }

    /// Set binding and type, repacking `st_info`.
    pub fn set_bind_type(&mut self, bind: u8, symbol_type: u8) {
        self.st_info = (bind << 4) | (symbol_type & 0xf);
    }

    /// Resolve `name` from `st_name` against `strtab`, which must be the
    /// string table section this symbol's table is linked to.
    pub fn resolve_name(&mut self, strtab: &ElfSection, context: &ErrorContext) -> Result<()> {
        self.name = strtab.lookup_str(self.st_name as usize, context)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Symbol {
        Symbol {
            st_name: 1,
            st_value: 0x100,
            st_size: 16,
            st_info: 0,
            st_other: 0,
            st_shndx: 1,
            name: String::new(),
        }
    }

    #[test]
    fn roundtrip() {
        let format = ElfFormat::big_endian();
        let mut sym = sample();
        sym.set_bind_type(1, 2); // GLOBAL FUNC
        let bytes = sym.serialize(&format);
        let parsed = Symbol::parse(&bytes, 0, &format, &ErrorContext::none()).unwrap();
        assert_eq!(parsed.st_value, 0x100);
        assert_eq!(parsed.bind(), 1);
        assert_eq!(parsed.symbol_type(), 2);
    }

    #[test]
    fn rejects_shn_xindex() {
        let format = ElfFormat::little_endian();
        let mut sym = sample();
        sym.st_shndx = SHN_XINDEX;
        let bytes = sym.serialize(&format);
        let err = Symbol::parse(&bytes, 0, &format, &ErrorContext::none()).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
