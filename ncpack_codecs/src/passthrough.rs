use ncpack_core::codec::Codec;
use ncpack_core::format::CODEC_PASSTHROUGH;

/// No-op codec: stores chunks verbatim.
///
/// Useful for checking the quantization step independently of any
/// compressor, and for measuring how much of the size reduction comes from
/// narrowing the element type alone.
pub struct PassThroughCodec;

impl Codec for PassThroughCodec {
    fn id(&self) -> u16 {
        CODEC_PASSTHROUGH
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn compress_chunk(&self, raw: &[u8], _level: u32) -> anyhow::Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decompress_chunk(&self, stored: &[u8], _raw_len: usize) -> anyhow::Result<Vec<u8>> {
        Ok(stored.to_vec())
    }
}
