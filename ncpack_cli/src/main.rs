use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use ncpack_cli::{human_bytes, init_logging, resolve_output};
use ncpack_quant::{history_entry, pack_file, ClassifierKind, PackConfig, PackOptions};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ncpack",
    about = "Quantize floating-point variables to 16/32-bit integers with scale_factor/add_offset and repack with chunked compression",
    version
)]
struct Cli {
    /// Input NCPK1 file
    infile: PathBuf,
    /// Output file (default: <dir of INFILE>/compress/<name of INFILE>)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Replace the input file in place (overrides -o)
    #[arg(short = 'W', long)]
    overwrite: bool,
    /// Variable to pack; repeatable. Without it every candidate is packed
    #[arg(short = 'v', long = "var", value_name = "NAME")]
    vars: Vec<String>,
    /// Codec for packed variables: deflate | zstd | lz4 | passthrough
    #[arg(short, long, default_value = "deflate")]
    codec: String,
    /// Compression level for packed variables (overrides the config file)
    #[arg(short, long)]
    level: Option<u32>,
    /// JSON file with packing settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Coordinate classifier: static-names | axis-attribute | units-token; repeatable
    #[arg(long = "classifier", value_name = "KIND")]
    classifiers: Vec<ClassifierKind>,
    /// Compare decoded values of every variable after writing
    #[arg(long)]
    check: bool,
    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn usage_error(message: impl std::fmt::Display) -> ! {
    Cli::command().error(ErrorKind::ValueValidation, message).exit()
}

fn build_config(cli: &Cli) -> anyhow::Result<PackConfig> {
    let mut config = match &cli.config {
        Some(path) => PackConfig::from_json_file(path)?,
        None => PackConfig::default(),
    };
    if let Some(level) = cli.level {
        config.compression_level = level;
    }
    if !cli.classifiers.is_empty() {
        config.classifiers = cli.classifiers.clone();
    }
    if !cli.vars.is_empty() {
        config = config.with_targets(cli.vars.clone());
    }
    config.validate()?;
    Ok(config)
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = build_config(&cli).unwrap_or_else(|e| usage_error(format!("{e:#}")));
    let target = resolve_output(&cli.infile, cli.output.as_deref(), cli.overwrite)
        .unwrap_or_else(|e| usage_error(format!("{e:#}")));
    if let Err(e) = ncpack_codecs::codec_by_name(&cli.codec) {
        usage_error(e);
    }

    let argv: Vec<String> = std::env::args().collect();
    let options = PackOptions {
        config,
        codec: cli.codec.clone(),
        history: Some(history_entry(&Local::now(), &argv)),
        verify: cli.check,
    };

    let t0 = Instant::now();
    let report = pack_file(&cli.infile, &target, &options)?;
    let elapsed = t0.elapsed();

    eprintln!("  output      : {}", report.output.display());
    eprintln!("  codec       : {}", options.codec);
    eprintln!("  copied      : {}", report.copied.len());
    for p in &report.packed {
        let d = &p.descriptor;
        eprintln!(
            "  packed      : {} as {} (scale_factor={:e}, add_offset={})",
            p.name,
            d.encoding.dtype(),
            d.scale_factor,
            d.add_offset
        );
    }
    eprintln!("  chunks      : {}", report.chunks);
    eprintln!("  input size  : {}", human_bytes(report.input_bytes));
    eprintln!("  output size : {}", human_bytes(report.output_bytes));
    eprintln!("  ratio       : {:.2}x", report.ratio());
    if report.verified {
        eprintln!("  verified    : yes");
    }
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}
