//! Helpers shared by the `ncpack`, `ncpack-inspect` and `ncpack-demo`
//! binaries.

use std::path::{Path, PathBuf};

use ncpack_quant::OutputTarget;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Directory, next to the input, that receives packed files by default.
pub const DEFAULT_OUTPUT_DIR: &str = "compress";

/// Install the stderr log subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `<dir(input)>/compress/<basename(input)>`.
pub fn default_output(input: &Path) -> anyhow::Result<PathBuf> {
    let name = input
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("input path {:?} has no file name", input))?;
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(DEFAULT_OUTPUT_DIR).join(name))
}

/// Decide where the packed file goes. `overwrite` wins over `output`.
///
/// An explicit output's parent directory must exist; the default
/// `compress/` directory is created when missing.
pub fn resolve_output(input: &Path, output: Option<&Path>, overwrite: bool) -> anyhow::Result<OutputTarget> {
    if !input.is_file() {
        anyhow::bail!("input file {:?} does not exist", input);
    }
    if overwrite {
        return Ok(OutputTarget::Overwrite);
    }
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.is_dir() {
                    anyhow::bail!("output directory {:?} does not exist", parent);
                }
            }
            Ok(OutputTarget::Path(path.to_path_buf()))
        }
        None => {
            let path = default_output(input)?;
            if let Some(dir) = path.parent() {
                if !dir.is_dir() {
                    std::fs::create_dir_all(dir)?;
                    info!("created output directory {}", dir.display());
                }
            }
            Ok(OutputTarget::Path(path))
        }
    }
}

pub fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_is_sibling_compress_dir() {
        let out = default_output(Path::new("/data/cordex/pr_day.ncpk")).unwrap();
        assert_eq!(out, PathBuf::from("/data/cordex/compress/pr_day.ncpk"));
        let out = default_output(Path::new("pr.ncpk")).unwrap();
        assert_eq!(out, PathBuf::from("compress/pr.ncpk"));
    }

    #[test]
    fn test_resolve_creates_default_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ncpk");
        std::fs::write(&input, b"x").unwrap();

        let target = resolve_output(&input, None, false).unwrap();
        assert_eq!(target, OutputTarget::Path(dir.path().join("compress").join("in.ncpk")));
        assert!(dir.path().join("compress").is_dir());
    }

    #[test]
    fn test_overwrite_wins_over_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ncpk");
        std::fs::write(&input, b"x").unwrap();
        let target = resolve_output(&input, Some(&dir.path().join("out.ncpk")), true).unwrap();
        assert_eq!(target, OutputTarget::Overwrite);
    }

    #[test]
    fn test_missing_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ncpk");
        assert!(resolve_output(&input, None, false).is_err());

        std::fs::write(&input, b"x").unwrap();
        let out = dir.path().join("nope").join("out.ncpk");
        let err = resolve_output(&input, Some(&out), false).unwrap_err().to_string();
        assert!(err.contains("does not exist"), "got: {err}");
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(1536), "1.50 KB");
    }
}
