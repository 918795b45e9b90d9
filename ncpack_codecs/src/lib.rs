mod deflate_codec;
mod lz4_codec;
mod passthrough;
mod zstd_codec;

pub use deflate_codec::DeflateCodec;
pub use lz4_codec::Lz4Codec;
pub use passthrough::PassThroughCodec;
pub use zstd_codec::ZstdCodec;

use ncpack_core::format::{CODEC_DEFLATE, CODEC_LZ4, CODEC_PASSTHROUGH, CODEC_ZSTD};
use ncpack_core::Codec;
use std::sync::Arc;

/// Resolve a codec from its on-disk `codec_id`.
///
/// Called when opening an existing NCPK1 file, so the reader can be
/// initialized with the right codec automatically.
pub fn codec_by_id(id: u16) -> anyhow::Result<Arc<dyn Codec>> {
    match id {
        CODEC_PASSTHROUGH => Ok(Arc::new(PassThroughCodec)),
        CODEC_DEFLATE => Ok(Arc::new(DeflateCodec)),
        CODEC_ZSTD => Ok(Arc::new(ZstdCodec)),
        CODEC_LZ4 => Ok(Arc::new(Lz4Codec)),
        _ => anyhow::bail!(
            "unknown codec id {}; supported: 0 (passthrough), 1 (deflate), 2 (zstd), 3 (lz4)",
            id
        ),
    }
}

/// Resolve a codec from its CLI name.
pub fn codec_by_name(name: &str) -> anyhow::Result<Box<dyn Codec>> {
    match name {
        "passthrough" | "pass" | "none" => Ok(Box::new(PassThroughCodec)),
        "deflate" | "zlib" => Ok(Box::new(DeflateCodec)),
        "zstd" | "z" => Ok(Box::new(ZstdCodec)),
        "lz4" | "l" => Ok(Box::new(Lz4Codec)),
        other => anyhow::bail!(
            "unknown codec '{}'. Valid options: deflate, zstd, lz4, passthrough",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_bytes() -> Vec<u8> {
        // a smooth u16 field, like a quantized horizontal slice
        (0..4096u32)
            .flat_map(|i| ((i / 64 + i % 64) as u16).to_le_bytes())
            .collect()
    }

    #[test]
    fn test_every_codec_is_lossless() {
        let raw = field_bytes();
        for id in [CODEC_PASSTHROUGH, CODEC_DEFLATE, CODEC_ZSTD, CODEC_LZ4] {
            let codec = codec_by_id(id).unwrap();
            assert_eq!(codec.id(), id);
            let stored = codec.compress_chunk(&raw, 9).unwrap();
            let back = codec.decompress_chunk(&stored, raw.len()).unwrap();
            assert_eq!(back, raw, "codec {} must be lossless", codec.name());
        }
    }

    #[test]
    fn test_deflate_shrinks_smooth_field() {
        let raw = field_bytes();
        let stored = DeflateCodec.compress_chunk(&raw, 9).unwrap();
        assert!(stored.len() < raw.len() / 2);
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(codec_by_name("zlib").unwrap().id(), CODEC_DEFLATE);
        assert!(codec_by_name("bzip2").is_err());
        assert!(codec_by_id(99).is_err());
    }
}
