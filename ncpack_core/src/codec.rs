/// Core compression abstraction for chunk payloads.
///
/// Each `Codec` implementation:
/// - Is identified by a stable numeric `id()` stored in the NCPK1 header.
/// - Must compress/decompress individual chunks independently. No cross-chunk
///   state is permitted, so any chunk can be decoded on its own.
/// - Is lossless. Lossy reduction happens before the codec, in quantization.
pub trait Codec: Send + Sync {
    /// Stable codec ID stored in the NCPK1 file header.
    fn id(&self) -> u16;

    /// Human-readable codec name for CLI display.
    fn name(&self) -> &'static str;

    /// Compress a single independent chunk at `level`. Codecs without levels
    /// ignore it; codecs with a narrower range clamp it.
    fn compress_chunk(&self, raw: &[u8], level: u32) -> anyhow::Result<Vec<u8>>;

    /// Decompress a single independent chunk. `raw_len` is the size recorded
    /// in the chunk index and may be used as a capacity hint.
    fn decompress_chunk(&self, stored: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>>;
}
