//! The error taxonomy shared by every fallible operation in this crate.

use std::fmt;
use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Where an error occurred: a source path plus, when known, a line number
/// and/or byte offset into that source. Used to render the one-line
/// diagnostics required of the entry point.
pub struct ErrorContext {
    /// The file the error is attributed to, if any.
    pub path: Option<PathBuf>,
    /// The 1-indexed line number within `path`, if known.
    pub line: Option<usize>,
    /// The byte offset within `path`'s contents, if known.
    pub offset: Option<usize>,
}

impl ErrorContext {
    /// An empty context: no location information available.
    pub fn none() -> Self {
        Self::default()
    }

    /// A context naming only a path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            line: None,
            offset: None,
        }
    }

    /// A context naming a path and a line number.
    pub fn line(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: Some(path.into()),
            line: Some(line),
            offset: None,
        }
    }

    /// A context naming a path and a byte offset.
    pub fn offset(path: impl Into<PathBuf>, offset: usize) -> Self {
        Self {
            path: Some(path.into()),
            line: None,
            offset: Some(offset),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{line}", path.display()),
            (Some(path), None) => write!(f, "{}", path.display()),
            (None, _) => write!(f, "<unknown>"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
/// Error type for every fallible operation in this crate.
pub enum Error {
    #[error("{context}: I/O error: {source}")]
    /// An underlying I/O operation failed.
    Io {
        /// Location the error is attributed to.
        context: ErrorContext,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: malformed ELF structure: {message}")]
    /// A byte sequence could not be decoded as the expected ELF record.
    ParseElf {
        /// Location the error is attributed to.
        context: ErrorContext,
        /// Human-readable description of what failed to parse.
        message: String,
    },

    #[error("{context}: invalid ELF file: {message}")]
    /// An ELF file was structurally parseable but violates an invariant
    /// this crate requires (bad magic, wrong class, wrong machine, ...).
    InvalidElf {
        /// Location the error is attributed to.
        context: ErrorContext,
        /// Human-readable description of the violated invariant.
        message: String,
    },

    #[error("{context}: assembly syntax error: {message}")]
    /// A GLOBAL_ASM block contained a directive or construct the analyzer
    /// does not understand.
    AsmSyntax {
        /// Location the error is attributed to.
        context: ErrorContext,
        /// Human-readable description of the syntax problem.
        message: String,
    },

    #[error("{context}: assembled size does not match the reserved stub: {message}")]
    /// The assembler's output for a spliced symbol was not the same size
    /// as the stub the compiler reserved for it.
    AsmSizeMismatch {
        /// Location the error is attributed to.
        context: ErrorContext,
        /// Human-readable description, naming the symbol and both sizes.
        message: String,
    },

    #[error("{context}: symbol lookup failed: {message}")]
    /// A symbol named by a `Function` record could not be found in the
    /// object where it was expected.
    SymbolLookup {
        /// Location the error is attributed to.
        context: ErrorContext,
        /// Human-readable description naming the missing symbol.
        message: String,
    },

    #[error("{context}: unsupported: {message}")]
    /// A construct this crate deliberately does not support was
    /// encountered (e.g. `SHN_XINDEX`, a non-MIPS machine type).
    Unsupported {
        /// Location the error is attributed to.
        context: ErrorContext,
        /// Human-readable description of the unsupported construct.
        message: String,
    },

    #[error("configuration error: {message}")]
    /// The CLI flags or derived configuration were inconsistent.
    ConfigError {
        /// Human-readable description of the problem.
        message: String,
    },
}

impl Error {
    /// Render this error as the one-line diagnostic the entry point prints
    /// on exit code 1.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }

    /// Build an [`Error::Io`] from an underlying I/O error and a context.
    pub fn io(context: ErrorContext, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}
