//! ELF32 relocation entries, both the implicit-addend (`Elf32_Rel`,
//! `SHT_REL`) and explicit-addend (`Elf32_Rela`, `SHT_RELA`) forms.

use super::format::ElfFormat;
use crate::error::{ErrorContext, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One relocation entry. `r_addend` is `Some` iff this entry came from (or
/// will be written to) an `SHT_RELA` section; `None` means `SHT_REL`.
pub struct Relocation {
    /// Byte offset within the relocated section this entry applies to.
    pub r_offset: u32,
    /// Packed symbol index (upper 24 bits) and relocation type (lower 8
    /// bits); see [`Relocation::sym_index`] and [`Relocation::reloc_type`].
    pub r_info: u32,
    /// Explicit addend, present iff this entry is `Elf32_Rela`
    /// (`SHT_RELA`); `None` for `Elf32_Rel` (`SHT_REL`).
    pub r_addend: Option<i32>,
}

impl Relocation {
    /// Parse one relocation at byte offset `at` in `data`. `has_addend`
    /// selects the 12-byte `Elf32_Rela` layout over the 8-byte `Elf32_Rel`
    /// layout.
    pub fn parse(
        data: &[u8],
        at: usize,
        has_addend: bool,
        format: &ElfFormat,
        context: &ErrorContext,
    ) -> Result<Self> {
        let r_offset = format.unpack_u32(data, at, context)?;
        let r_info = format.unpack_u32(data, at + 4, context)?;
        let r_addend = if has_addend {
            Some(format.unpack_i32(data, at + 8, context)?)
        } else {
            None
        };
        Ok(Relocation {
            r_offset,
            r_info,
            r_addend,
        })
    }

    /// Serialize this relocation. Emits 12 bytes if `r_addend` is `Some`,
    /// otherwise 8 bytes.
    pub fn serialize(&self, format: &ElfFormat) -> Vec<u8> {
        let mut out = Vec::with_capacity(if self.r_addend.is_some() { 12 } else { 8 });
        format.push_u32(&mut out, self.r_offset);
        format.push_u32(&mut out, self.r_info);
        if let Some(addend) = self.r_addend {
            format.push_u32(&mut out, addend as u32);
        }
        out
    }

    /// The symbol table index (upper 24 bits of `r_info`).
    pub fn sym_index(&self) -> u32 {
        self.r_info >> 8
    }

    /// The relocation type (lower 8 bits of `r_info`).
    pub fn reloc_type(&self) -> u8 {
        (self.r_info & 0xff) as u8
    }

    /// Build `r_info` from a symbol index and relocation type.
    pub fn pack_info(sym_index: u32, reloc_type: u8) -> u32 {
        (sym_index << 8) | reloc_type as u32
    }

    /// Replace the symbol index while keeping the relocation type.
    pub fn set_sym_index(&mut self, sym_index: u32) {
        self.r_info = Self::pack_info(sym_index, self.reloc_type());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip_rel() {
        let format = ElfFormat::big_endian();
        let reloc = Relocation {
            r_offset: 0x10,
            r_info: Relocation::pack_info(3, 4),
            r_addend: None,
        };
        let bytes = reloc.serialize(&format);
        assert_eq!(bytes.len(), 8);
        let parsed = Relocation::parse(&bytes, 0, false, &format, &ErrorContext::none()).unwrap();
        assert_eq!(parsed, reloc);
        assert_eq!(parsed.sym_index(), 3);
        assert_eq!(parsed.reloc_type(), 4);
    }

    #[test]
    fn roundtrip_rela() {
        let format = ElfFormat::little_endian();
        let reloc = Relocation {
            r_offset: 0x20,
            r_info: Relocation::pack_info(7, 2),
            r_addend: Some(-4),
        };
        let bytes = reloc.serialize(&format);
        assert_eq!(bytes.len(), 12);
        let parsed = Relocation::parse(&bytes, 0, true, &format, &ErrorContext::none()).unwrap();
        assert_eq!(parsed, reloc);
    }

    #[test]
    fn set_sym_index_preserves_type() {
        let mut reloc = Relocation {
            r_offset: 0,
            r_info: Relocation::pack_info(1, 5),
            r_addend: None,
        };
        reloc.set_sym_index(9);
        assert_eq!(reloc.sym_index(), 9);
        assert_eq!(reloc.reloc_type(), 5);
    }
}
