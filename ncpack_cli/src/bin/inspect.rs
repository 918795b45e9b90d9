use std::path::PathBuf;

use clap::Parser;

use ncpack_cli::human_bytes;
use ncpack_codecs::codec_by_id;
use ncpack_core::{Attributes, StoreRead};
use ncpack_quant::open_store;

/// Print the header of an NCPK1 file: dimensions, variables, attributes and
/// storage statistics.
#[derive(Parser)]
#[command(name = "ncpack-inspect", version)]
struct Cli {
    /// NCPK1 file to inspect
    file: PathBuf,
    /// Print per-chunk details
    #[arg(long)]
    chunks: bool,
}

fn print_attributes(indent: &str, prefix: &str, attrs: &Attributes) {
    for attr in attrs.iter() {
        println!("{indent}{prefix}{} = {} ;", attr.name, attr.value);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let reader = open_store(&cli.file)?;
    let file_size = std::fs::metadata(&cli.file)?.len();

    println!("=== NCPK1 File: {:?} ===", cli.file);
    println!();
    println!("  format version : {}", reader.header.version);
    let codec = codec_by_id(reader.header.codec_id)?;
    println!("  codec          : {} (id={})", codec.name(), reader.header.codec_id);
    println!("  variables      : {}", reader.variables().len());
    println!("  chunk count    : {}", reader.chunk_count());
    println!("  raw size       : {}", human_bytes(reader.raw_size()));
    println!("  stored         : {}", human_bytes(reader.stored_size()));
    println!("  file on disk   : {}", human_bytes(file_size));
    println!("  ratio          : {:.2}x", reader.ratio());
    println!("  flags          : 0x{:016x}", reader.header.flags);

    println!();
    println!("dimensions:");
    for dim in reader.dimensions() {
        if dim.unlimited {
            println!("\t{} = UNLIMITED ; // ({} currently)", dim.name, dim.len);
        } else {
            println!("\t{} = {} ;", dim.name, dim.len);
        }
    }

    println!("variables:");
    for var in reader.variables() {
        println!("\t{} {}({}) ;", var.dtype, var.name, var.dims.join(", "));
        print_attributes("\t\t", &format!("{}:", var.name), &var.attributes);
        if let Some(chunk) = &var.chunk_shape {
            println!("\t\t// chunks {:?}", chunk);
        }
        if let Some(level) = var.compression_level {
            let (raw, stored) = reader.variable_sizes(&var.name);
            println!(
                "\t\t// compressed level {} : {} -> {}",
                level,
                human_bytes(raw),
                human_bytes(stored)
            );
        }
    }

    println!();
    println!("// global attributes:");
    print_attributes("\t\t", ":", reader.global_attributes());

    if cli.chunks {
        println!();
        println!(
            "  {:>8}  {:>14}  {:>12}  {:>12}  {:>5}  {:>16}",
            "chunk", "file offset", "stored", "raw", "comp", "checksum"
        );
        println!("  {}", "-".repeat(73));
        for (i, e) in reader.entries().iter().enumerate() {
            println!(
                "  {:>8}  {:>14}  {:>12}  {:>12}  {:>5}  {:016x}",
                i,
                e.offset,
                human_bytes(e.stored_len as u64),
                human_bytes(e.raw_len as u64),
                if e.compressed { "yes" } else { "no" },
                e.checksum
            );
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    run(Cli::parse())
}
