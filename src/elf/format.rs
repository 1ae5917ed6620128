//! Endian-aware packing and unpacking of the primitive integers that make
//! up every ELF32 record.

use crate::error::{Error, ErrorContext, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Carries the single piece of information needed to interpret the
/// multi-byte fields of an ELF32 file: its byte order. Constructed once
/// when a file's header is parsed and passed by reference (or by value,
/// being `Copy`) to every subsequent pack/unpack call for that file.
pub struct ElfFormat {
    big_endian: bool,
}

impl ElfFormat {
    /// A format for little-endian ELF32 files.
    pub fn little_endian() -> Self {
        Self { big_endian: false }
    }

    /// A format for big-endian ELF32 files.
    pub fn big_endian() -> Self {
        Self { big_endian: true }
    }

    /// Build a format from the `EI_DATA` byte of an ELF identifier
    /// (1 = little-endian, 2 = big-endian).
    pub fn from_ei_data(ei_data: u8, context: &ErrorContext) -> Result<Self> {
        match ei_data {
            1 => Ok(Self::little_endian()),
            2 => Ok(Self::big_endian()),
            other => Err(Error::InvalidElf {
                context: context.clone(),
                message: format!("unrecognized EI_DATA value {other:#x}"),
            }),
        }
    }

    /// Whether this format is big-endian.
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// The `EI_DATA` byte this format corresponds to.
    pub fn ei_data(&self) -> u8 {
        if self.big_endian {
            2
        } else {
            1
        }
    }

    fn need(data: &[u8], at: usize, len: usize, context: &ErrorContext) -> Result<()> {
        if at.checked_add(len).map(|end| end > data.len()).unwrap_or(true) {
            return Err(Error::ParseElf {
                context: context.clone(),
                message: format!(
                    "need {len} bytes at offset {at} but only {} available",
                    data.len().saturating_sub(at)
                ),
            });
        }
        Ok(())
    }

    /// Unpack a `u16` at byte offset `at` in `data`.
    pub fn unpack_u16(&self, data: &[u8], at: usize, context: &ErrorContext) -> Result<u16> {
        Self::need(data, at, 2, context)?;
        let bytes = [data[at], data[at + 1]];
        Ok(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    /// Unpack a `u32` at byte offset `at` in `data`.
    pub fn unpack_u32(&self, data: &[u8], at: usize, context: &ErrorContext) -> Result<u32> {
        Self::need(data, at, 4, context)?;
        let bytes = [data[at], data[at + 1], data[at + 2], data[at + 3]];
        Ok(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    /// Unpack an `i32` at byte offset `at` in `data`.
    pub fn unpack_i32(&self, data: &[u8], at: usize, context: &ErrorContext) -> Result<i32> {
        self.unpack_u32(data, at, context).map(|v| v as i32)
    }

    /// Pack a `u16` into `data` at byte offset `at`. `data` must already
    /// be at least `at + 2` bytes long.
    pub fn pack_u16(&self, data: &mut [u8], at: usize, value: u16) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        data[at..at + 2].copy_from_slice(&bytes);
    }

    /// Pack a `u32` into `data` at byte offset `at`. `data` must already
    /// be at least `at + 4` bytes long.
    pub fn pack_u32(&self, data: &mut [u8], at: usize, value: u32) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        data[at..at + 4].copy_from_slice(&bytes);
    }

    /// Pack an `i32` into `data` at byte offset `at`.
    pub fn pack_i32(&self, data: &mut [u8], at: usize, value: i32) {
        self.pack_u32(data, at, value as u32);
    }

    /// Append a packed `u16` to `out`.
    pub fn push_u16(&self, out: &mut Vec<u8>, value: u16) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }

    /// Append a packed `u32` to `out`.
    pub fn push_u32(&self, out: &mut Vec<u8>, value: u32) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip_u16_little_endian() {
        let fmt = ElfFormat::little_endian();
        let mut buf = [0u8; 4];
        fmt.pack_u16(&mut buf, 1, 0x1234);
        assert_eq!(buf, [0, 0x34, 0x12, 0]);
        assert_eq!(
            fmt.unpack_u16(&buf, 1, &ErrorContext::none()).unwrap(),
            0x1234
        );
    }

    #[test]
    fn roundtrip_u32_big_endian() {
        let fmt = ElfFormat::big_endian();
        let mut buf = [0u8; 4];
        fmt.pack_u32(&mut buf, 0, 0xdeadbeef);
        assert_eq!(buf, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            fmt.unpack_u32(&buf, 0, &ErrorContext::none()).unwrap(),
            0xdeadbeef
        );
    }

    #[test]
    fn unpack_short_slice_errors() {
        let fmt = ElfFormat::little_endian();
        let buf = [0u8; 1];
        assert!(fmt.unpack_u32(&buf, 0, &ErrorContext::none()).is_err());
    }

    #[test]
    fn from_ei_data_rejects_unknown_values() {
        assert!(ElfFormat::from_ei_data(0, &ErrorContext::none()).is_err());
        assert!(ElfFormat::from_ei_data(3, &ErrorContext::none()).is_err());
        assert!(ElfFormat::from_ei_data(1, &ErrorContext::none())
            .unwrap()
            .is_big_endian()
            == false);
        assert!(ElfFormat::from_ei_data(2, &ErrorContext::none())
            .unwrap()
            .is_big_endian());
    }
}
