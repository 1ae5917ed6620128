//! The ELF32 file header.

use super::consts::{ELF32_EHDR_SIZE, ELF_MAGIC, ELFCLASS32, EM_MIPS, EV_CURRENT};
use super::format::ElfFormat;
use crate::error::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// The fixed 52-byte ELF32 header. Every field here round-trips exactly:
/// parsing a header and serializing it back produces the original bytes,
/// except for `e_shoff`/`e_shnum`/`e_shstrndx` which [`super::file::ElfFile`]
/// recomputes whenever the section table changes.
pub struct ElfHeader {
    /// `e_ident[EI_DATA]`: 1 for little-endian, 2 for big-endian.
    pub e_ident_data: u8,
    /// `e_ident[EI_OSABI]`.
    pub e_ident_osabi: u8,
    /// `e_ident[EI_ABIVERSION]`.
    pub e_ident_abiversion: u8,
    /// Object file type (`ET_REL` for the relocatable objects this tool
    /// reads and writes).
    pub e_type: u16,
    /// Target machine; always `EM_MIPS` after [`ElfHeader::parse`] succeeds.
    pub e_machine: u16,
    /// Object file version; always `EV_CURRENT` after parsing succeeds.
    pub e_version: u32,
    /// Entry point virtual address (unused by relocatable objects).
    pub e_entry: u32,
    /// File offset of the program header table (unused; always 0).
    pub e_phoff: u32,
    /// File offset of the section header table.
    pub e_shoff: u32,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size in bytes of this header.
    pub e_ehsize: u16,
    /// Size in bytes of one program header entry (unused; always 0).
    pub e_phentsize: u16,
    /// Number of program header entries (unused; always 0).
    pub e_phnum: u16,
    /// Size in bytes of one section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Index of the section header string table in the section header
    /// table.
    pub e_shstrndx: u16,
}

impl ElfHeader {
    /// Parse the 52-byte ELF32 header from the start of `data`, deriving
    /// an [`ElfFormat`] from `e_ident[EI_DATA]` along the way.
    ///
    /// Validates the magic, class, version, and machine fields; any other
    /// byte-slice is rejected with [`Error::InvalidElf`].
    pub fn parse(data: &[u8], context: &ErrorContext) -> Result<(Self, ElfFormat)> {
        if data.len() < ELF32_EHDR_SIZE {
            return Err(Error::ParseElf {
                context: context.clone(),
                message: format!(
                    "file is {} bytes, shorter than the {ELF32_EHDR_SIZE}-byte ELF32 header",
                    data.len()
                ),
            });
        }
        if data[0..4] != ELF_MAGIC {
            return Err(Error::InvalidElf {
                context: context.clone(),
                message: "bad ELF magic".into(),
            });
        }
        let class = data[4];
        if class != ELFCLASS32 {
            return Err(Error::InvalidElf {
                context: context.clone(),
                message: format!("unsupported ELF class {class:#x}, only ELF32 is supported"),
            });
        }
        let format = ElfFormat::from_ei_data(data[5], context)?;
        let ei_version = data[6];
        if ei_version != EV_CURRENT {
            return Err(Error::InvalidElf {
                context: context.clone(),
                message: format!("unsupported e_ident[EI_VERSION] {ei_version}"),
            });
        }
        let osabi = data[7];
        let abiversion = data[8];

        let e_type = format.unpack_u16(data, 16, context)?;
        let e_machine = format.unpack_u16(data, 18, context)?;
        if e_machine != EM_MIPS {
            return Err(Error::InvalidElf {
                context: context.clone(),
                message: format!(
                    "unsupported e_machine {e_machine}, only EM_MIPS ({EM_MIPS}) is supported"
                ),
            });
        }
        let e_version = format.unpack_u32(data, 20, context)?;
        if e_version != EV_CURRENT as u32 {
            return Err(Error::InvalidElf {
                context: context.clone(),
                message: format!("unsupported e_version {e_version}"),
            });
        }

        let header = ElfHeader {
            e_ident_data: data[5],
            e_ident_osabi: osabi,
            e_ident_abiversion: abiversion,
            e_type,
            e_machine,
            e_version,
            e_entry: format.unpack_u32(data, 24, context)?,
            e_phoff: format.unpack_u32(data, 28, context)?,
            e_shoff: format.unpack_u32(data, 32, context)?,
            e_flags: format.unpack_u32(data, 36, context)?,
            e_ehsize: format.unpack_u16(data, 40, context)?,
            e_phentsize: format.unpack_u16(data, 42, context)?,
            e_phnum: format.unpack_u16(data, 44, context)?,
            e_shentsize: format.unpack_u16(data, 46, context)?,
            e_shnum: format.unpack_u16(data, 48, context)?,
            e_shstrndx: format.unpack_u16(data, 50, context)?,
        };

        Ok((header, format))
    }

    /// Serialize this header back to exactly 52 bytes.
    pub fn serialize(&self, format: &ElfFormat) -> Vec<u8> {
        let mut out = vec![0u8; ELF32_EHDR_SIZE];
        out[0..4].copy_from_slice(&ELF_MAGIC);
        out[4] = ELFCLASS32;
        out[5] = self.e_ident_data;
        out[6] = EV_CURRENT;
        out[7] = self.e_ident_osabi;
        out[8] = self.e_ident_abiversion;
        // out[9..16] is padding, left zeroed.
        format.pack_u16(&mut out, 16, self.e_type);
        format.pack_u16(&mut out, 18, self.e_machine);
        format.pack_u32(&mut out, 20, self.e_version);
        format.pack_u32(&mut out, 24, self.e_entry);
        format.pack_u32(&mut out, 28, self.e_phoff);
        format.pack_u32(&mut out, 32, self.e_shoff);
        format.pack_u32(&mut out, 36, self.e_flags);
        format.pack_u16(&mut out, 40, self.e_ehsize);
        format.pack_u16(&mut out, 42, self.e_phentsize);
        format.pack_u16(&mut out, 44, self.e_phnum);
        format.pack_u16(&mut out, 46, self.e_shentsize);
        format.pack_u16(&mut out, 48, self.e_shnum);
        format.pack_u16(&mut out, 50, self.e_shstrndx);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_header_bytes() -> Vec<u8> {
        let format = ElfFormat::little_endian();
        let header = ElfHeader {
            e_ident_data: 1,
            e_ident_osabi: 0,
            e_ident_abiversion: 0,
            e_type: ET_REL_FOR_TEST,
            e_machine: EM_MIPS,
            e_version: EV_CURRENT as u32,
            e_entry: 0,
            e_phoff: 0,
            e_shoff: 0x1234,
            e_flags: 0,
            e_ehsize: ELF32_EHDR_SIZE as u16,
            e_phentsize: 0,
            e_phnum: 0,
            e_shentsize: 40,
            e_shnum: 5,
            e_shstrndx: 4,
        };
        header.serialize(&format)
    }

    const ET_REL_FOR_TEST: u16 = 1;

    #[test]
    fn roundtrip() {
        let bytes = sample_header_bytes();
        let (header, format) = ElfHeader::parse(&bytes, &ErrorContext::none()).unwrap();
        assert_eq!(header.serialize(&format), bytes);
        assert_eq!(header.e_shoff, 0x1234);
        assert_eq!(header.e_shnum, 5);
        assert!(!format.is_big_endian());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_header_bytes();
        bytes[0] = 0;
        let err = ElfHeader::parse(&bytes, &ErrorContext::none()).unwrap_err();
        assert!(matches!(err, Error::InvalidElf { .. }));
    }

    #[test]
    fn rejects_wrong_class() {
        let mut bytes = sample_header_bytes();
        bytes[4] = 2; // ELFCLASS64
        let err = ElfHeader::parse(&bytes, &ErrorContext::none()).unwrap_err();
        assert!(matches!(err, Error::InvalidElf { .. }));
    }

    #[test]
    fn rejects_wrong_machine() {
        let format = ElfFormat::little_endian();
        let mut bytes = sample_header_bytes();
        format.pack_u16(&mut bytes, 18, 3); // EM_386
        let err = ElfHeader::parse(&bytes, &ErrorContext::none()).unwrap_err();
        assert!(matches!(err, Error::InvalidElf { .. }));
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = &sample_header_bytes()[..10];
        let err = ElfHeader::parse(bytes, &ErrorContext::none()).unwrap_err();
        assert!(matches!(err, Error::ParseElf { .. }));
    }
}
