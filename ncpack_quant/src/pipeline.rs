//! File-level pipeline: open an NCPK1 input, pack it into a new container,
//! optionally verify, and in overwrite mode replace the input atomically.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ncpack_codecs::{codec_by_id, codec_by_name};
use ncpack_core::{peek_codec_id, Codec, Reader, Writer};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::PackConfig;
use crate::copy::{copy_all, CopySummary};
use crate::history::update_history;
use crate::quantize::{PackedVariable, Quantizer};
use crate::select::resolve_targets;
use crate::verify::check_all;

/// Where the packed container goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Path(PathBuf),
    /// Write a temporary file next to the input, verify it, then rename it
    /// over the input.
    Overwrite,
}

#[derive(Debug, Clone)]
pub struct PackOptions {
    pub config: PackConfig,
    /// Codec name for packed variables, see `ncpack_codecs::codec_by_name`.
    pub codec: String,
    /// Entry prepended to the `history` global attribute.
    pub history: Option<String>,
    /// Compare decoded values after writing. Always done in overwrite mode.
    pub verify: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            config: PackConfig::default(),
            codec: "deflate".to_string(),
            history: None,
            verify: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub copied: Vec<String>,
    pub packed: Vec<PackedVariable>,
    pub chunks: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub verified: bool,
}

impl PackReport {
    /// input size / output size
    pub fn ratio(&self) -> f64 {
        if self.output_bytes == 0 {
            return 1.0;
        }
        self.input_bytes as f64 / self.output_bytes as f64
    }
}

/// Open an NCPK1 file with the codec named in its header.
pub fn open_store(path: impl AsRef<Path>) -> anyhow::Result<Reader> {
    let path = path.as_ref();
    let codec = codec_by_id(peek_codec_id(path)?)?;
    Reader::open(path, codec)
}

/// Pack `input` into `output`.
pub fn pack_file(input: &Path, output: &OutputTarget, options: &PackOptions) -> anyhow::Result<PackReport> {
    options.config.validate()?;
    let input_bytes = std::fs::metadata(input)
        .with_context(|| format!("reading metadata of {:?}", input))?
        .len();
    let mut src = open_store(input)?;
    let targets = resolve_targets(&src, &options.config)?;
    debug!(?targets, "resolved pack targets");

    let (output_path, summary, packed, chunks, verified) = match output {
        OutputTarget::Path(path) => {
            if is_same_file(input, path) {
                anyhow::bail!("output {:?} is the input file; use overwrite mode instead", path);
            }
            let file = File::create(path).with_context(|| format!("creating output file {:?}", path))?;
            let (summary, packed, chunks) = write_packed(&mut src, file, &targets, options)?;
            if options.verify {
                verify_output(&mut src, path, &packed)?;
            }
            (path.clone(), summary, packed, chunks, options.verify)
        }
        OutputTarget::Overwrite => {
            let dir = match input.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let tmp = NamedTempFile::new_in(&dir)
                .with_context(|| format!("creating temporary file in {:?}", dir))?;
            let file = tmp.as_file().try_clone()?;
            let (summary, packed, chunks) = write_packed(&mut src, file, &targets, options)?;
            verify_output(&mut src, tmp.path(), &packed)?;
            drop(src);
            tmp.persist(input)
                .map_err(|e| e.error)
                .with_context(|| format!("replacing {:?}", input))?;
            info!("replaced {} in place", input.display());
            (input.to_path_buf(), summary, packed, chunks, true)
        }
    };

    let output_bytes = std::fs::metadata(&output_path)?.len();
    info!(
        "wrote {} ({} copied, {} packed, {} chunks)",
        output_path.display(),
        summary.copied.len(),
        packed.len(),
        chunks
    );
    Ok(PackReport {
        input: input.to_path_buf(),
        output: output_path,
        copied: summary.copied,
        packed,
        chunks,
        input_bytes,
        output_bytes,
        verified,
    })
}

fn write_packed(
    src: &mut Reader,
    file: File,
    targets: &BTreeSet<String>,
    options: &PackOptions,
) -> anyhow::Result<(CopySummary, Vec<PackedVariable>, u64)> {
    let codec: Box<dyn Codec> = codec_by_name(&options.codec)?;
    let mut dst = Writer::from_file(file, codec)?;
    let mut quantizer = Quantizer::new(&options.config);
    let summary = copy_all(src, &mut dst, targets, &mut quantizer)?;
    if let Some(entry) = &options.history {
        update_history(&mut dst, entry)?;
    }
    let chunks = dst.finish()?;
    Ok((summary, quantizer.into_packed(), chunks))
}

fn verify_output(src: &mut Reader, path: &Path, packed: &[PackedVariable]) -> anyhow::Result<()> {
    let mut out = open_store(path).with_context(|| format!("reopening {:?} for verification", path))?;
    let names: BTreeSet<String> = packed.iter().map(|p| p.name.clone()).collect();
    check_all(src, &mut out, &names)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
