use serde::{Deserialize, Serialize};

use crate::model::{Attributes, Dimension, VariableDef};

/// Magic bytes for NCPK version 1 files.
/// 14 bytes: "NCPK1\n" followed by 8 null bytes.
pub const MAGIC: &[u8; 14] = b"NCPK1\n\x00\x00\x00\x00\x00\x00\x00\x00";

/// Fixed size of the NCPK1 file header in bytes.
///   magic[14] + version:u16 + codec_id:u16 + reserved:u32
///   + variable_count:u64 + chunk_count:u64 + flags:u64 + reserved[10]
///   = 14 + 2 + 2 + 4 + 8 + 8 + 8 + 10 = 56
pub const HEADER_SIZE: u64 = 56;

/// Size of each ChunkEntry in the chunk index, in bytes.
///   offset:u64 + stored_len:u32 + raw_len:u32
///   + checksum:u64 + compressed:u8 + _pad[7]
///   = 8 + 4 + 4 + 8 + 1 + 7 = 32
pub const CHUNK_ENTRY_SIZE: u64 = 32;

/// Size of the footer in bytes: index offset, metadata offset, metadata length.
pub const FOOTER_SIZE: u64 = 24;

pub const FORMAT_VERSION: u16 = 1;

// ── Flags ──────────────────────────────────────────────────────────────────

/// Each chunk carries an xxhash3-64 checksum of its stored bytes.
pub const FLAG_HAS_CHECKSUM: u64 = 1 << 0;

// ── Codec IDs ──────────────────────────────────────────────────────────────

pub const CODEC_PASSTHROUGH: u16 = 0;
pub const CODEC_DEFLATE: u16 = 1;
pub const CODEC_ZSTD: u16 = 2;
pub const CODEC_LZ4: u16 = 3;

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 56-byte NCPK1 file header.
#[derive(Debug, Clone)]
pub struct Ncpk1Header {
    pub version: u16,
    /// Codec used for every compressed variable in the file.
    pub codec_id: u16,
    pub variable_count: u64,
    pub chunk_count: u64,
    pub flags: u64,
}

impl Ncpk1Header {
    /// Serialize to exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[..14].copy_from_slice(MAGIC);
        buf[14..16].copy_from_slice(&self.version.to_le_bytes());
        buf[16..18].copy_from_slice(&self.codec_id.to_le_bytes());
        // buf[18..22] reserved
        buf[22..30].copy_from_slice(&self.variable_count.to_le_bytes());
        buf[30..38].copy_from_slice(&self.chunk_count.to_le_bytes());
        buf[38..46].copy_from_slice(&self.flags.to_le_bytes());
        buf
    }

    /// Deserialize from `HEADER_SIZE` bytes, checking the magic.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE as usize]) -> anyhow::Result<Self> {
        if &buf[..14] != MAGIC {
            anyhow::bail!("invalid NCPK magic bytes, not an NCPK1 file");
        }
        Ok(Self {
            version: u16::from_le_bytes(buf[14..16].try_into()?),
            codec_id: u16::from_le_bytes(buf[16..18].try_into()?),
            variable_count: u64::from_le_bytes(buf[22..30].try_into()?),
            chunk_count: u64::from_le_bytes(buf[30..38].try_into()?),
            flags: u64::from_le_bytes(buf[38..46].try_into()?),
        })
    }

    pub fn has_flag(&self, flag: u64) -> bool {
        self.flags & flag != 0
    }
}

// ── Chunk index entry ───────────────────────────────────────────────────────

/// One entry in the chunk index: locates and describes a single stored chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkEntry {
    /// Byte offset of this chunk from the start of the file.
    pub offset: u64,
    /// Bytes of the chunk as stored on disk.
    pub stored_len: u32,
    /// Bytes of the chunk once decompressed.
    pub raw_len: u32,
    /// xxhash3-64 of the stored bytes.
    pub checksum: u64,
    /// Whether the stored bytes went through the file's codec.
    pub compressed: bool,
}

impl ChunkEntry {
    /// Serialize to exactly `CHUNK_ENTRY_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; CHUNK_ENTRY_SIZE as usize] {
        let mut buf = [0u8; CHUNK_ENTRY_SIZE as usize];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.stored_len.to_le_bytes());
        buf[12..16].copy_from_slice(&self.raw_len.to_le_bytes());
        buf[16..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf[24] = self.compressed as u8;
        buf
    }

    /// Deserialize from `CHUNK_ENTRY_SIZE` bytes.
    pub fn from_bytes(buf: &[u8; CHUNK_ENTRY_SIZE as usize]) -> anyhow::Result<Self> {
        Ok(Self {
            offset: u64::from_le_bytes(buf[0..8].try_into()?),
            stored_len: u32::from_le_bytes(buf[8..12].try_into()?),
            raw_len: u32::from_le_bytes(buf[12..16].try_into()?),
            checksum: u64::from_le_bytes(buf[16..24].try_into()?),
            compressed: buf[24] != 0,
        })
    }
}

// ── Footer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Footer {
    pub index_offset: u64,
    pub metadata_offset: u64,
    pub metadata_len: u64,
}

impl Footer {
    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE as usize] {
        let mut buf = [0u8; FOOTER_SIZE as usize];
        buf[0..8].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[8..16].copy_from_slice(&self.metadata_offset.to_le_bytes());
        buf[16..24].copy_from_slice(&self.metadata_len.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; FOOTER_SIZE as usize]) -> anyhow::Result<Self> {
        Ok(Self {
            index_offset: u64::from_le_bytes(buf[0..8].try_into()?),
            metadata_offset: u64::from_le_bytes(buf[8..16].try_into()?),
            metadata_len: u64::from_le_bytes(buf[16..24].try_into()?),
        })
    }
}

// ── Metadata section ───────────────────────────────────────────────────────

/// Where a variable's values live in the chunk index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLayout {
    /// Shape the values were written with. Differs from the current shape
    /// only along a grown unlimited dimension.
    pub shape: Vec<usize>,
    pub first_chunk: u64,
    pub chunk_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRecord {
    #[serde(flatten)]
    pub def: VariableDef,
    /// `None` if the variable was declared but never written.
    pub layout: Option<StoredLayout>,
}

/// The JSON metadata section: the full structural graph of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub attributes: Attributes,
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<VariableRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes_roundtrip_and_magic_check() {
        let header = Ncpk1Header {
            version: FORMAT_VERSION,
            codec_id: CODEC_DEFLATE,
            variable_count: 4,
            chunk_count: 17,
            flags: FLAG_HAS_CHECKSUM,
        };
        let mut bytes = header.to_bytes();
        let back = Ncpk1Header::from_bytes(&bytes).unwrap();
        assert_eq!(back.chunk_count, 17);
        assert!(back.has_flag(FLAG_HAS_CHECKSUM));

        bytes[0] = b'X';
        assert!(Ncpk1Header::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_chunk_entry_keeps_compressed_flag() {
        let entry = ChunkEntry {
            offset: 56,
            stored_len: 10,
            raw_len: 40,
            checksum: 0xABCD,
            compressed: true,
        };
        let back = ChunkEntry::from_bytes(&entry.to_bytes()).unwrap();
        assert!(back.compressed);
        assert_eq!(back.raw_len, 40);
    }
}
