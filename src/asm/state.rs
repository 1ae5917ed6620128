//! Analyzer configuration and per-block mutable state.
//!
//! These are two different things kept in two different types on
//! purpose: [`GlobalState`] is parsed once from CLI flags and never
//! changes; [`AnalyzerState`] is created fresh for every `GLOBAL_ASM`
//! block and mutates line by line. Neither lives in a process-wide
//! static — both are threaded explicitly through every call that needs
//! them.

use typed_builder::TypedBuilder;

use super::function::Function;

#[derive(Debug, Clone, TypedBuilder)]
/// Per-invocation analyzer configuration, parsed once from CLI flags.
pub struct GlobalState {
    /// Minimum instruction count a `.text`-only block must contribute,
    /// below which the block is rejected.
    #[builder(default = 0)]
    pub min_instr_count: usize,
    /// Instructions the caller already knows about and wants discounted
    /// from `min_instr_count` accounting (e.g. a known prologue).
    #[builder(default = 0)]
    pub skip_instr_count: usize,
    /// Route jump-table bytes into early `.rodata` instead of
    /// `.late_rodata`.
    #[builder(default = false)]
    pub use_jtbl_for_rodata: bool,
    /// Byte budget for late rodata; exceeding it is a hard error.
    #[builder(default = usize::MAX)]
    pub prelude_if_late_rodata: usize,
    /// Restrict generated stub instructions to the MIPS1 subset.
    #[builder(default = false)]
    pub mips1: bool,
    /// Accept Pascal-origin source conventions (`.ent`/`.end`, string
    /// length prefixes).
    #[builder(default = false)]
    pub pascal: bool,
    /// Generated stubs should preserve a frame pointer.
    #[builder(default = false)]
    pub framepointer: bool,
    /// Generated stubs should be position-independent.
    #[builder(default = false)]
    pub kpic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The section an analyzer is currently accumulating bytes into.
pub enum CurrentSection {
    /// `.text`: executable instructions.
    Text,
    /// `.data`: initialized writable data.
    Data,
    /// `.rodata`: initialized read-only data emitted immediately.
    Rodata,
    /// `.bss`: uninitialized data, no backing bytes.
    Bss,
    /// `.late_rodata`: read-only data deferred and dummy-byte accounted,
    /// per spec section 4.6.
    LateRodata,
    /// Any other named section (`.section NAME`): tracked but not given
    /// special late-rodata treatment.
    Other,
}

impl CurrentSection {
    /// Classify a `.section`-style directive argument (e.g. `.text`,
    /// `.late_rodata`) into its tracked variant.
    pub fn from_name(name: &str) -> Self {
        match name {
            ".text" => Self::Text,
            ".data" => Self::Data,
            ".rodata" => Self::Rodata,
            ".bss" => Self::Bss,
            ".late_rodata" => Self::LateRodata,
            _ => Self::Other,
        }
    }

    /// The canonical directive name for this section, falling back to
    /// `other_name` for [`Self::Other`].
    pub fn canonical_name(&self, other_name: &str) -> String {
        match self {
            Self::Text => ".text".to_string(),
            Self::Data => ".data".to_string(),
            Self::Rodata => ".rodata".to_string(),
            Self::Bss => ".bss".to_string(),
            Self::LateRodata => ".late_rodata".to_string(),
            Self::Other => other_name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
/// Mutable state threaded through one block's line-by-line analysis.
/// Built fresh per block; never reused or shared.
pub struct AnalyzerState {
    /// The section the line currently being analyzed accumulates into.
    pub current_section: CurrentSection,
    /// The raw directive argument backing `current_section`, preserved
    /// verbatim for [`CurrentSection::Other`].
    pub current_section_name: String,
    /// The output record being built for this block.
    pub function: Function,
    /// Accumulated late-rodata bytes, 4 at a time, not yet flushed into
    /// `function.late_rodata_dummy_bytes`.
    pub late_rodata_pending: Vec<u8>,
    /// Source line number of the line currently being analyzed, for
    /// diagnostics.
    pub line_number: usize,
}

impl AnalyzerState {
    /// Build fresh analyzer state for a block starting at `start_line`,
    /// defaulting to `.text`.
    pub fn new(start_line: usize) -> Self {
        AnalyzerState {
            current_section: CurrentSection::Text,
            current_section_name: ".text".to_string(),
            function: Function::default(),
            late_rodata_pending: Vec::new(),
            line_number: start_line,
        }
    }
}
