//! The command-line front end: a thin `structopt` shell that parses the
//! flag table this crate exposes, builds the two configuration objects
//! the library needs ([`mipsasm_adjunct::config::Config`] and
//! [`mipsasm_adjunct::asm::GlobalState`]), and dispatches to the
//! pre-process or post-process phase depending on whether
//! `--post-process` was given.

use std::path::PathBuf;
use std::process::exit;

use structopt::StructOpt;

use mipsasm_adjunct::asm::GlobalState;
use mipsasm_adjunct::config::{Config, ConvertStatics};
use mipsasm_adjunct::error::Error;
use mipsasm_adjunct::{fixup, preprocess};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "mipsasm-adjunct",
    about = "Splices hand-written MIPS assembly into objects produced by a compiler with no inline-asm support"
)]
struct CommandLine {
    /// Path to the C source this invocation targets.
    #[structopt(name = "filename")]
    filename: PathBuf,

    /// Post-process the given object file in place instead of
    /// pre-processing `filename`.
    #[structopt(long = "post-process", name = "PATH")]
    post_process: Option<PathBuf>,

    /// Command used to assemble the sidecar `.s` (recorded for the
    /// outer build driver; this crate never invokes it).
    #[structopt(long)]
    assembler: Option<String>,

    /// File prepended to every emitted sidecar `.s` when any block
    /// produced late rodata.
    #[structopt(long = "asm-prelude", name = "PATH")]
    asm_prelude: Option<PathBuf>,

    /// Text encoding of the input C source.
    #[structopt(long = "input-enc", default_value = "latin-1")]
    input_enc: String,

    /// Text encoding of the rewritten C source.
    #[structopt(long = "output-enc", default_value = "latin-1")]
    output_enc: String,

    /// Remove `SHT_MIPS_DEBUG`/`SHT_MIPS_GPTAB` sections during
    /// post-process.
    #[structopt(long = "drop-mdebug-gptab")]
    drop_mdebug_gptab: bool,

    /// How static symbols from the assembled sidecar are renamed or
    /// exposed in the final object: `no` / `local` / `global` /
    /// `global-with-filename`.
    #[structopt(long = "convert-statics", default_value = "no")]
    convert_statics: ConvertStatics,

    /// Ignore checksum caching and reprocess unconditionally.
    #[structopt(long)]
    force: bool,

    /// Compiler optimization level, attached as `-O0`/`-O1`/`-O2`;
    /// influences stub generation heuristics.
    #[structopt(short = "O", possible_values = &["0", "1", "2"], default_value = "2")]
    opt_level: String,

    /// `-g`: compiler debug-info hint.
    #[structopt(short = "g")]
    debug: bool,

    /// `--g3`: compiler debug-info hint requesting macro information.
    #[structopt(long = "g3")]
    debug3: bool,

    /// Emit MIPS1-compatible stub instructions.
    #[structopt(long)]
    mips1: bool,

    /// Accept Pascal-origin source conventions (`.ent`/`.end`, string
    /// length prefixes).
    #[structopt(long)]
    pascal: bool,

    /// Generated stubs should preserve a frame pointer.
    #[structopt(long)]
    framepointer: bool,

    /// Generated stubs should be position-independent.
    #[structopt(long)]
    kpic: bool,

    /// Minimum instruction count a text-only block must contribute.
    #[structopt(long = "min-instr-count", default_value = "0")]
    min_instr_count: usize,

    /// Instructions to discount from `--min-instr-count` accounting.
    #[structopt(long = "skip-instr-count", default_value = "0")]
    skip_instr_count: usize,

    /// Route jump-table bytes into early `.rodata` instead of
    /// `.late_rodata`.
    #[structopt(long = "use-jtbl-for-rodata")]
    use_jtbl_for_rodata: bool,

    /// Byte budget for late rodata; exceeding it is a hard error.
    #[structopt(long = "late-rodata-prelude-bytes")]
    late_rodata_prelude_bytes: Option<usize>,
}

fn main() {
    env_logger::init();
    let args = CommandLine::from_args();

    log::debug!(
        "opt_level=-O{} debug={} debug3={}",
        args.opt_level,
        args.debug,
        args.debug3
    );

    let config = Config::builder()
        .source(args.filename.clone())
        .post_process(args.post_process.clone())
        .assembler(args.assembler.clone())
        .asm_prelude(args.asm_prelude.clone())
        .input_enc(args.input_enc.clone())
        .output_enc(args.output_enc.clone())
        .drop_mdebug_gptab(args.drop_mdebug_gptab)
        .convert_statics(args.convert_statics)
        .force(args.force)
        .build();

    let global = GlobalState::builder()
        .min_instr_count(args.min_instr_count)
        .skip_instr_count(args.skip_instr_count)
        .use_jtbl_for_rodata(args.use_jtbl_for_rodata)
        .prelude_if_late_rodata(args.late_rodata_prelude_bytes.unwrap_or(usize::MAX))
        .mips1(args.mips1)
        .pascal(args.pascal)
        .framepointer(args.framepointer)
        .kpic(args.kpic)
        .build();

    let result = run(&config, &global);
    if let Err(err) = result {
        eprintln!("{}", err.diagnostic());
        exit(1);
    }
    exit(0);
}

fn run(config: &Config, global: &GlobalState) -> Result<(), Error> {
    if config.post_process.is_some() {
        fixup::run(config)
    } else {
        preprocess::run(&config.source, config, global).map(|_| ())
    }
}
