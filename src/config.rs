//! Ambient, per-invocation configuration: the CLI-derived settings that
//! steer the outer pipeline (encodings, the assembler command, output
//! handling) but never influence the analyzer's byte-counting math —
//! that lives in [`crate::asm::GlobalState`] instead.

use std::path::PathBuf;
use std::str::FromStr;

use typed_builder::TypedBuilder;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// `--convert-statics` mode: how `asmfile`-local (static) symbols are
/// exposed in the final merged object.
pub enum ConvertStatics {
    /// Leave static symbols local; they are not visible outside the
    /// final object.
    No,
    /// Import as LOCAL symbols, same visibility as in `asmfile`.
    Local,
    /// Promote to GLOBAL, unqualified.
    Global,
    /// Promote to GLOBAL, with the source file's stem appended so
    /// statics from different translation units cannot collide.
    GlobalWithFilename,
}

impl FromStr for ConvertStatics {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(Self::No),
            "local" => Ok(Self::Local),
            "global" => Ok(Self::Global),
            "global-with-filename" => Ok(Self::GlobalWithFilename),
            other => Err(Error::ConfigError {
                message: format!(
                    "invalid --convert-statics value '{other}', expected no/local/global/global-with-filename"
                ),
            }),
        }
    }
}

/// Turn a static symbol's name into the form `--convert-statics
/// global-with-filename` exposes it under: the original name, an
/// underscore, then the source file's stem with every non-identifier
/// byte replaced by `_` so the result is always a legal assembler-visible
/// symbol.
pub fn mangle_with_filename(symbol: &str, source_path: &std::path::Path) -> String {
    let stem = source_path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown");
    let mangled_stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{symbol}_{mangled_stem}")
}

#[derive(Debug, Clone, TypedBuilder)]
/// Settings that do not feed the analyzer but do shape the rest of the
/// pipeline: encodings, the assembler invocation, output discipline.
pub struct Config {
    /// Path to the C source this invocation targets.
    pub source: PathBuf,
    /// `--post-process PATH`: when set, fix up the named object instead
    /// of running the preprocessor.
    #[builder(default)]
    pub post_process: Option<PathBuf>,
    /// `--assembler CMD`.
    #[builder(default)]
    pub assembler: Option<String>,
    /// `--asm-prelude PATH`.
    #[builder(default)]
    pub asm_prelude: Option<PathBuf>,
    /// `--input-enc`, default `latin-1`.
    #[builder(default = "latin-1".to_string())]
    pub input_enc: String,
    /// `--output-enc`, default `latin-1`.
    #[builder(default = "latin-1".to_string())]
    pub output_enc: String,
    /// `--drop-mdebug-gptab`.
    #[builder(default = false)]
    pub drop_mdebug_gptab: bool,
    /// `--convert-statics`, default `no`.
    #[builder(default = ConvertStatics::No)]
    pub convert_statics: ConvertStatics,
    /// `--force`: ignore checksum caching.
    #[builder(default = false)]
    pub force: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_convert_statics_modes() {
        assert_eq!("no".parse::<ConvertStatics>().unwrap(), ConvertStatics::No);
        assert_eq!("local".parse::<ConvertStatics>().unwrap(), ConvertStatics::Local);
        assert_eq!("global".parse::<ConvertStatics>().unwrap(), ConvertStatics::Global);
        assert_eq!(
            "global-with-filename".parse::<ConvertStatics>().unwrap(),
            ConvertStatics::GlobalWithFilename
        );
        assert!("bogus".parse::<ConvertStatics>().is_err());
    }

    #[test]
    fn mangle_replaces_non_identifier_chars() {
        let path = std::path::Path::new("my-file v2.c");
        assert_eq!(mangle_with_filename("foo", path), "foo_my_file_v2");
    }

    #[test]
    fn config_defaults() {
        let config = Config::builder().source(PathBuf::from("a.c")).build();
        assert_eq!(config.input_enc, "latin-1");
        assert_eq!(config.convert_statics, ConvertStatics::No);
        assert!(!config.force);
    }
}
