//! GLOBAL_ASM block analysis: turning a block of MIPS assembly into a
//! byte-accounted [`function::Function`] record without ever invoking an
//! assembler.

pub mod analyzer;
pub mod directive;
pub mod function;
pub mod state;

pub use analyzer::{stub_symbol_name, GlobalAsmBlock};
pub use directive::Directive;
pub use function::Function;
pub use state::{AnalyzerState, CurrentSection, GlobalState};
