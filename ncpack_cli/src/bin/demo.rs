//! ncpack demo
//!
//! Writes a synthetic daily precipitation file (float32 `pr` over
//! time/lat/lon plus coordinates), packs it with every codec, verifies the
//! decoded values and prints what each step bought.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;

use ncpack_cli::human_bytes;
use ncpack_codecs::PassThroughCodec;
use ncpack_core::{ArrayData, AttrValue, DataType, StoreRead, StoreWrite, VariableSpec, Writer};
use ncpack_quant::{open_store, pack_file, OutputTarget, PackConfig, PackOptions};

// ── constants ──────────────────────────────────────────────────────────────

const NT: usize = 30;
const NLAT: usize = 90;
const NLON: usize = 180;

// ── data generator ─────────────────────────────────────────────────────────

/// Deterministic rain field in [0, 50] mm/day: mostly dry, a band of
/// moderate rain along the equator and a few storm cells.
fn rain(t: usize, y: usize, x: usize) -> f32 {
    let lat = -89.0 + 2.0 * y as f64;
    let lon = 2.0 * x as f64;
    let band = (-(lat / 12.0).powi(2)).exp() * 6.0;
    let wave = ((lon / 57.3 * 3.0 + t as f64 * 0.4).sin() * 0.5 + 0.5) * band;
    let cell = ((t * 31 + y * 17 + x * 7) % 997) as f64;
    let storm = if cell < 3.0 { 50.0 - cell * 10.0 } else { 0.0 };
    let v = (wave + storm).clamp(0.0, 50.0);
    // quantize to 0.01 mm like gauge data
    ((v * 100.0).round() / 100.0) as f32
}

fn write_input(path: &Path) -> Result<()> {
    let mut w = Writer::create(path, Box::new(PassThroughCodec))?;
    w.set_global_attribute("title", AttrValue::from("ncpack demo precipitation"))?;
    w.set_global_attribute("Conventions", AttrValue::from("CF-1.6"))?;
    w.set_global_attribute("history", AttrValue::from("created by ncpack-demo"))?;
    w.add_dimension("time", None)?;
    w.add_dimension("lat", Some(NLAT))?;
    w.add_dimension("lon", Some(NLON))?;

    let mut time = w.add_variable(VariableSpec::new("time", DataType::F64, &["time"]))?;
    time.set_attribute("units", "days since 1950-01-01")?;
    time.set_attribute("calendar", "standard")?;
    time.put_values(ArrayData::F64((0..NT).map(|t| 27_000.5 + t as f64).collect()))?;

    let mut lat = w.add_variable(VariableSpec::new("lat", DataType::F64, &["lat"]))?;
    lat.set_attribute("units", "degrees_north")?;
    lat.put_values(ArrayData::F64((0..NLAT).map(|y| -89.0 + 2.0 * y as f64).collect()))?;

    let mut lon = w.add_variable(VariableSpec::new("lon", DataType::F64, &["lon"]))?;
    lon.set_attribute("units", "degrees_east")?;
    lon.put_values(ArrayData::F64((0..NLON).map(|x| 2.0 * x as f64).collect()))?;

    let mut values = Vec::with_capacity(NT * NLAT * NLON);
    for t in 0..NT {
        for y in 0..NLAT {
            for x in 0..NLON {
                values.push(rain(t, y, x));
            }
        }
    }
    let mut pr = w.add_variable(VariableSpec::new("pr", DataType::F32, &["time", "lat", "lon"]))?;
    pr.set_attribute("standard_name", "precipitation_flux")?;
    pr.set_attribute("units", "mm/day")?;
    pr.put_values(ArrayData::F32(values))?;

    w.finish()?;
    Ok(())
}

fn section(title: &str) {
    println!("━━━ {title} {}", "━".repeat(70usize.saturating_sub(title.len() + 5)));
}

// ── demo runner ────────────────────────────────────────────────────────────

fn run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("pr_day.ncpk");

    println!();
    section("0 · INPUT");
    let t0 = Instant::now();
    write_input(&input)?;
    let raw_size = std::fs::metadata(&input)?.len();
    let mut src = open_store(&input)?;
    println!("  file          : {}", input.display());
    println!("  size          : {}", human_bytes(raw_size));
    println!("  grid          : {NT} × {NLAT} × {NLON} float32");
    println!("  written in    : {:.2}s", t0.elapsed().as_secs_f64());
    println!();

    section("1 · PACK pr");
    println!(
        "  {:<12} {:>12}  {:>8}  {:>8}  {:>10}",
        "codec", "size", "ratio", "type", "elapsed"
    );
    println!("  {}", "─".repeat(58));
    for codec in ["deflate", "zstd", "lz4", "passthrough"] {
        let output = dir.path().join(format!("pr_day.{codec}.ncpk"));
        let options = PackOptions {
            config: PackConfig::default().with_targets(vec!["pr".to_string()]),
            codec: codec.to_string(),
            history: Some(format!("ncpack-demo --codec {codec}")),
            verify: true,
        };
        let t = Instant::now();
        let report = pack_file(&input, &OutputTarget::Path(output), &options)?;
        let encoding = report
            .packed
            .first()
            .map(|p| p.descriptor.encoding.dtype().to_string())
            .unwrap_or_default();
        println!(
            "  {:<12} {:>12}  {:>7.1}x  {:>8}  {:>8.2}s",
            codec,
            human_bytes(report.output_bytes),
            report.ratio(),
            encoding,
            t.elapsed().as_secs_f64()
        );
    }
    println!();

    section("2 · PACKED VARIABLE");
    let packed_path = dir.path().join("pr_day.deflate.ncpk");
    let mut out = open_store(&packed_path)?;
    let pr = out
        .variable("pr")
        .ok_or_else(|| anyhow::anyhow!("packed file has no 'pr'"))?
        .clone();
    for attr in pr.attributes.iter() {
        println!("  pr:{:<14} = {}", attr.name, attr.value);
    }
    println!("  chunk shape       = {:?}", pr.chunk_shape.unwrap_or_default());

    let original = src.read_unpacked("pr")?;
    let decoded = out.read_unpacked("pr")?;
    let max_err = original
        .iter()
        .zip(&decoded)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f64, f64::max);
    println!("  max abs error     = {:e}", max_err);
    println!();

    section("3 · HISTORY");
    if let Some(history) = out.global_attributes().get("history").and_then(|h| h.as_text()) {
        for line in history.lines() {
            println!("  {line}");
        }
    }
    println!();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
