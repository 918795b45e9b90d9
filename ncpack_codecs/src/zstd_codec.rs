use ncpack_core::codec::Codec;
use ncpack_core::format::CODEC_ZSTD;

/// Zstandard chunk codec.
///
/// Each chunk is compressed independently. The requested level is clamped
/// to zstd's 1–22 range, so the default level 9 means the same thing here
/// as it does for deflate: slow, small output.
pub struct ZstdCodec;

impl Codec for ZstdCodec {
    fn id(&self) -> u16 {
        CODEC_ZSTD
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress_chunk(&self, raw: &[u8], level: u32) -> anyhow::Result<Vec<u8>> {
        let level = level.clamp(1, 22) as i32;
        let compressed = zstd::bulk::compress(raw, level)?;
        Ok(compressed)
    }

    fn decompress_chunk(&self, stored: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>> {
        // raw_len from the chunk index is the exact decoded size
        let raw = zstd::bulk::decompress(stored, raw_len)?;
        Ok(raw)
    }
}
