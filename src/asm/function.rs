//! The analyzer's per-GLOBAL_ASM-block output record.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Everything the preprocessor and the fixup stage need to know about one
/// analyzed `GLOBAL_ASM` block.
pub struct Function {
    /// Names introduced by `glabel`/`.globl` while the analyzer was in
    /// `.text`, in the order they appeared. The first entry is also
    /// `fn_desc` unless the block never left `.text`.
    pub text_glabels: Vec<String>,
    /// The block's assembly, as given to the preprocessor, to be written
    /// verbatim to the sidecar `.s` file.
    pub asm_conts: Vec<String>,
    /// The late-rodata payload, 4 bytes at a time, in emission order.
    pub late_rodata_dummy_bytes: Vec<[u8; 4]>,
    /// Byte count of jump-table entries when `use_jtbl_for_rodata` routes
    /// them into early rodata instead of late rodata.
    pub jtbl_rodata_size: usize,
    /// Sidecar assembly specific to the late-rodata payload (emitted
    /// after the block's main `asm_conts`).
    pub late_rodata_asm_conts: Vec<String>,
    /// Display name for diagnostics: the first glabel seen, or
    /// `block_<lineno>` if the block never defined one.
    pub fn_desc: String,
    /// Per-section byte counts and stub C expressions, in the order
    /// sections were first touched. Kept as a `Vec` rather than a map so
    /// iteration order — and therefore generated stub order — is always
    /// the order sections were encountered, never hash order.
    pub data: Vec<(String, usize, String)>,
}

impl Function {
    /// Record (or accumulate into) the byte count for `section`, and set
    /// its stub expression. Preserves first-touched order.
    pub fn add_section_bytes(&mut self, section: &str, bytes: usize, stub_expr: String) {
        if let Some(entry) = self.data.iter_mut().find(|(name, _, _)| name == section) {
            entry.1 += bytes;
            entry.2 = stub_expr;
        } else {
            self.data.push((section.to_string(), bytes, stub_expr));
        }
    }

    /// The byte count recorded for `section`, if any.
    pub fn section_bytes(&self, section: &str) -> Option<usize> {
        self.data.iter().find(|(name, _, _)| name == section).map(|(_, size, _)| *size)
    }

    /// Total instruction count in `.text` (bytes / 4), used for the
    /// `min_instr_count` guardrail.
    pub fn text_instr_count(&self) -> usize {
        self.section_bytes(".text").unwrap_or(0) / 4
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_section_bytes_accumulates() {
        let mut f = Function::default();
        f.add_section_bytes(".text", 4, "stub1".into());
        f.add_section_bytes(".text", 8, "stub2".into());
        assert_eq!(f.section_bytes(".text"), Some(12));
        assert_eq!(f.data.len(), 1);
    }

    #[test]
    fn preserves_first_touched_order() {
        let mut f = Function::default();
        f.add_section_bytes(".rodata", 4, "r".into());
        f.add_section_bytes(".text", 8, "t".into());
        f.add_section_bytes(".bss", 1, "b".into());
        let order: Vec<&str> = f.data.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(order, vec![".rodata", ".text", ".bss"]);
    }
}
