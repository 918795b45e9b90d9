use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ncpack_core::codec::Codec;
use ncpack_core::format::CODEC_DEFLATE;

/// zlib (deflate) chunk codec.
///
/// The default for packed variables: the same block compression netCDF-4
/// files use, at levels 0–9 (higher levels are clamped to 9).
///
/// Best for: quantized integer fields, where byte-level redundancy is high.
pub struct DeflateCodec;

impl Codec for DeflateCodec {
    fn id(&self) -> u16 {
        CODEC_DEFLATE
    }

    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress_chunk(&self, raw: &[u8], level: u32) -> anyhow::Result<Vec<u8>> {
        let mut enc = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::new(level.min(9)));
        enc.write_all(raw)?;
        Ok(enc.finish()?)
    }

    fn decompress_chunk(&self, stored: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(raw_len);
        ZlibDecoder::new(stored)
            .read_to_end(&mut raw)
            .map_err(|e| anyhow::anyhow!("deflate decompress error: {}", e))?;
        Ok(raw)
    }
}
