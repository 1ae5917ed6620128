//! A two-phase compiler adjunct that lets a C compiler with no inline-asm
//! support produce MIPS object files containing hand-written assembly
//! whose section placement, symbol visibility, and relocations are
//! preserved exactly.
//!
//! The pre-process phase ([`preprocess`]) rewrites `GLOBAL_ASM` blocks in
//! a C source into stub declarations the compiler can size correctly,
//! and emits a sidecar assembly file for a real assembler to build. The
//! post-process phase ([`fixup`]) splices the assembler's object back
//! into the compiler's object, merging symbols and relocations into a
//! single final ELF.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

pub mod asm;
pub mod atomic_write;
pub mod config;
pub mod elf;
pub mod encoding;
pub mod error;
pub mod fixup;
pub mod preprocess;
