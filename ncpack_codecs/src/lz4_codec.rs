use ncpack_core::codec::Codec;
use ncpack_core::format::CODEC_LZ4;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

/// LZ4 chunk codec.
///
/// Fastest decompression of all bundled codecs, weakest ratio. Ignores the
/// compression level.
///
/// Best for: scratch outputs that are read back many times.
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn id(&self) -> u16 {
        CODEC_LZ4
    }

    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress_chunk(&self, raw: &[u8], _level: u32) -> anyhow::Result<Vec<u8>> {
        Ok(compress_prepend_size(raw))
    }

    fn decompress_chunk(&self, stored: &[u8], _raw_len: usize) -> anyhow::Result<Vec<u8>> {
        let raw = decompress_size_prepended(stored)
            .map_err(|e| anyhow::anyhow!("lz4 decompress error: {}", e))?;
        Ok(raw)
    }
}
