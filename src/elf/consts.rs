//! Numeric constants from the System V gABI and its MIPS processor
//! supplement. Kept as plain `u32`/`u8` constants rather than typed enums:
//! this crate only ever needs to compare and re-emit these values, never
//! to exhaustively match on them.

#![allow(missing_docs)]

/// Inactive section header, no associated section.
pub const SHT_NULL: u32 = 0;
/// Program-defined contents (code or initialized data).
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_HASH: u32 = 5;
pub const SHT_DYNAMIC: u32 = 6;
pub const SHT_NOTE: u32 = 7;
/// Occupies no file space; `sh_size` still names its notional extent.
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;
pub const SHT_SHLIB: u32 = 10;
pub const SHT_DYNSYM: u32 = 11;

/// MIPS register usage information, consumed only by the IRIX linker.
pub const SHT_MIPS_REGINFO: u32 = 0x70000006;
/// MIPS `.options` section.
pub const SHT_MIPS_OPTIONS: u32 = 0x7000000d;
/// Symbol table index remapping for GP-relative addressing, produced by
/// the IRIX compiler and meaningless to this tool beyond needing removal
/// when `--drop-mdebug-gptab` is requested.
pub const SHT_MIPS_GPTAB: u32 = 0x70000003;
/// The symbolic debugging information section IRIX-era compilers emit;
/// opaque to this tool beyond needing removal on request.
pub const SHT_MIPS_DEBUG: u32 = 0x70000005;

/// ELF magic number, the first four bytes of every ELF file.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
/// `EI_CLASS` value for 32-bit objects; the only class this tool supports.
pub const ELFCLASS32: u8 = 1;
/// `EI_VERSION` / `e_version` value for the only defined ELF version.
pub const EV_CURRENT: u8 = 1;
/// `e_machine` value for MIPS; this tool rejects every other machine.
pub const EM_MIPS: u16 = 8;
/// `e_type` value for a relocatable object file, the only type this tool
/// reads or writes.
pub const ET_REL: u16 = 1;

/// Size in bytes of the ELF32 file header.
pub const ELF32_EHDR_SIZE: usize = 52;
/// Size in bytes of one ELF32 section header entry.
pub const ELF32_SHDR_SIZE: usize = 40;
/// Size in bytes of one ELF32 symbol table entry.
pub const ELF32_SYM_SIZE: usize = 16;
/// Size in bytes of one ELF32 `Elf32_Rel` entry (no addend).
pub const ELF32_REL_SIZE: usize = 8;
/// Size in bytes of one ELF32 `Elf32_Rela` entry (explicit addend).
pub const ELF32_RELA_SIZE: usize = 12;

/// Reserved `st_shndx` value meaning "the real index is too large to fit
/// here; consult `.symtab_shndx`". This crate does not support it.
pub const SHN_XINDEX: u16 = 0xffff;
pub const SHN_UNDEF: u16 = 0;
/// Lower bound of the reserved `st_shndx` range, below which an index
/// names a real section.
pub const SHN_LORESERVE: u16 = 0xff00;
pub const SHN_ABS: u16 = 0xfff1;
pub const SHN_COMMON: u16 = 0xfff2;

/// Symbol binding: not visible outside the object file that defines it.
pub const STB_LOCAL: u8 = 0;
/// Symbol binding: visible to all object files being combined.
pub const STB_GLOBAL: u8 = 1;
pub const STB_WEAK: u8 = 2;

pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;
pub const STT_SECTION: u8 = 3;
pub const STT_FILE: u8 = 4;

/// MIPS relocation types this tool's test suite and fixup logic name
/// directly; the type is otherwise treated as an opaque byte that is
/// copied verbatim when translating a relocation between objects.
pub const R_MIPS_NONE: u8 = 0;
pub const R_MIPS_16: u8 = 1;
pub const R_MIPS_32: u8 = 2;
pub const R_MIPS_REL32: u8 = 3;
pub const R_MIPS_26: u8 = 4;
pub const R_MIPS_HI16: u8 = 5;
pub const R_MIPS_LO16: u8 = 6;
pub const R_MIPS_GPREL16: u8 = 7;
