use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use xxhash_rust::xxh3::xxh3_64;

use crate::chunk::ChunkGrid;
use crate::codec::Codec;
use crate::format::{
    ChunkEntry, FileMetadata, Footer, Ncpk1Header, StoredLayout, CHUNK_ENTRY_SIZE,
    FLAG_HAS_CHECKSUM, FOOTER_SIZE, FORMAT_VERSION, HEADER_SIZE,
};
use crate::model::{ArrayData, Attributes, Dimension, VariableDef};
use crate::store::{complete_to_shape, StoreRead};

/// Read only the header of an NCPK1 file and return its codec id, so the
/// caller can pick the codec to open it with.
pub fn peek_codec_id(path: impl AsRef<Path>) -> anyhow::Result<u16> {
    let path = path.as_ref();
    let mut f = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let mut buf = [0u8; HEADER_SIZE as usize];
    f.read_exact(&mut buf)
        .with_context(|| format!("reading NCPK1 header of {:?}", path))?;
    Ok(Ncpk1Header::from_bytes(&buf)?.codec_id)
}

/// Reader for NCPK1 files.
///
/// # Open sequence
/// 1. Read the 56-byte header (magic check, version, codec_id, chunk_count).
/// 2. Seek to `file_end - 24`, read the footer.
/// 3. Load the chunk index and parse the metadata section.
///
/// Variable values are read on demand: [`read_values`] seeks to each of the
/// variable's chunks, verifies its checksum, decodes it and places it into
/// the full array.
///
/// [`read_values`]: StoreRead::read_values
pub struct Reader {
    file: File,
    pub header: Ncpk1Header,
    attributes: Attributes,
    dimensions: Vec<Dimension>,
    variables: Vec<VariableDef>,
    layouts: HashMap<String, StoredLayout>,
    entries: Vec<ChunkEntry>,
    codec: Arc<dyn Codec>,
}

impl Reader {
    /// Open an NCPK1 file.
    ///
    /// `codec` must match the `codec_id` stored in the file header. Use
    /// [`peek_codec_id`] with `ncpack_codecs::codec_by_id` to pick it.
    pub fn open(path: impl AsRef<Path>, codec: Arc<dyn Codec>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).with_context(|| format!("opening input file {:?}", path))?;

        // ── Read and validate header ────────────────────────────────────────
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header_buf)?;
        let header = Ncpk1Header::from_bytes(&header_buf)?;

        if header.version != FORMAT_VERSION {
            anyhow::bail!(
                "unsupported NCPK version {} (only version {} is supported)",
                header.version,
                FORMAT_VERSION
            );
        }
        if header.codec_id != codec.id() {
            anyhow::bail!(
                "codec mismatch: file uses codec {} but provided codec has id {}",
                header.codec_id,
                codec.id()
            );
        }

        // ── Footer ─────────────────────────────────────────────────────────
        let file_len = file.metadata()?.len();
        if file_len < HEADER_SIZE + FOOTER_SIZE {
            anyhow::bail!("file is too short ({} bytes) to be NCPK1", file_len);
        }
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer_buf = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer_buf)?;
        let footer = Footer::from_bytes(&footer_buf)?;

        // ── Chunk index ─────────────────────────────────────────────────────
        let index_end = header
            .chunk_count
            .checked_mul(CHUNK_ENTRY_SIZE)
            .and_then(|len| len.checked_add(footer.index_offset));
        if index_end.map_or(true, |end| end > file_len) {
            anyhow::bail!(
                "chunk index of {} entries at offset {} does not fit in a {}-byte file",
                header.chunk_count,
                footer.index_offset,
                file_len
            );
        }
        file.seek(SeekFrom::Start(footer.index_offset))?;
        let mut entries = Vec::with_capacity(header.chunk_count as usize);
        let mut entry_buf = [0u8; CHUNK_ENTRY_SIZE as usize];
        for _ in 0..header.chunk_count {
            file.read_exact(&mut entry_buf)?;
            entries.push(ChunkEntry::from_bytes(&entry_buf)?);
        }

        // ── Metadata ───────────────────────────────────────────────────────
        let metadata_end = footer.metadata_offset.checked_add(footer.metadata_len);
        if metadata_end.map_or(true, |end| end > file_len) {
            anyhow::bail!(
                "metadata section of {} bytes at offset {} does not fit in a {}-byte file",
                footer.metadata_len,
                footer.metadata_offset,
                file_len
            );
        }
        file.seek(SeekFrom::Start(footer.metadata_offset))?;
        let mut json = vec![0u8; footer.metadata_len as usize];
        file.read_exact(&mut json)?;
        let metadata: FileMetadata =
            serde_json::from_slice(&json).context("parsing NCPK1 metadata section")?;

        if metadata.variables.len() as u64 != header.variable_count {
            anyhow::bail!(
                "header lists {} variables but metadata describes {}",
                header.variable_count,
                metadata.variables.len()
            );
        }

        let mut layouts = HashMap::new();
        let mut variables = Vec::with_capacity(metadata.variables.len());
        for record in metadata.variables {
            if let Some(layout) = record.layout {
                if layout.first_chunk + layout.chunk_count > entries.len() as u64 {
                    anyhow::bail!(
                        "variable '{}' references chunks beyond the index",
                        record.def.name
                    );
                }
                layouts.insert(record.def.name.clone(), layout);
            }
            variables.push(record.def);
        }

        Ok(Self {
            file,
            header,
            attributes: metadata.attributes,
            dimensions: metadata.dimensions,
            variables,
            layouts,
            entries,
            codec,
        })
    }

    /// Total number of chunks in the file.
    #[inline]
    pub fn chunk_count(&self) -> u64 {
        self.header.chunk_count
    }

    /// Access the raw `ChunkEntry` slice (for inspection).
    pub fn entries(&self) -> &[ChunkEntry] {
        &self.entries
    }

    /// Storage layout of a written variable.
    pub fn layout(&self, name: &str) -> Option<&StoredLayout> {
        self.layouts.get(name)
    }

    /// Uncompressed and stored byte totals over the chunks of `name`.
    pub fn variable_sizes(&self, name: &str) -> (u64, u64) {
        match self.layouts.get(name) {
            Some(layout) => {
                let range = layout.first_chunk as usize..(layout.first_chunk + layout.chunk_count) as usize;
                self.entries[range].iter().fold((0, 0), |(raw, stored), e| {
                    (raw + e.raw_len as u64, stored + e.stored_len as u64)
                })
            }
            None => (0, 0),
        }
    }

    /// Total uncompressed size of all chunks in bytes.
    pub fn raw_size(&self) -> u64 {
        self.entries.iter().map(|e| e.raw_len as u64).sum()
    }

    /// Total stored size of all chunks in bytes (excluding index/metadata).
    pub fn stored_size(&self) -> u64 {
        self.entries.iter().map(|e| e.stored_len as u64).sum()
    }

    /// Compression ratio (raw / stored).
    pub fn ratio(&self) -> f64 {
        let stored = self.stored_size();
        if stored == 0 {
            return 1.0;
        }
        self.raw_size() as f64 / stored as f64
    }

    /// Read, verify and decode the chunk at index `idx`.
    pub fn read_chunk(&mut self, idx: u64) -> anyhow::Result<Vec<u8>> {
        let entry = self
            .entries
            .get(idx as usize)
            .ok_or_else(|| anyhow::anyhow!("chunk index {} out of range (total {})", idx, self.header.chunk_count))?
            .clone();

        self.file.seek(SeekFrom::Start(entry.offset))?;
        let mut stored = vec![0u8; entry.stored_len as usize];
        self.file.read_exact(&mut stored)?;

        if self.header.has_flag(FLAG_HAS_CHECKSUM) {
            let computed = xxh3_64(&stored);
            if computed != entry.checksum {
                anyhow::bail!(
                    "chunk {} checksum mismatch: expected {:016x}, got {:016x}",
                    idx,
                    entry.checksum,
                    computed
                );
            }
        }

        let raw = if entry.compressed {
            self.codec.decompress_chunk(&stored, entry.raw_len as usize)?
        } else {
            stored
        };

        if raw.len() != entry.raw_len as usize {
            anyhow::bail!(
                "chunk {} decoded to {} bytes but index says {}",
                idx,
                raw.len(),
                entry.raw_len
            );
        }
        Ok(raw)
    }
}

impl StoreRead for Reader {
    fn global_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    fn read_values(&mut self, name: &str) -> anyhow::Result<ArrayData> {
        let def = self
            .variable(name)
            .ok_or_else(|| anyhow::anyhow!("no variable named '{}'", name))?
            .clone();
        let shape = self.shape(&def)?;

        let stored = match self.layouts.get(name).cloned() {
            Some(layout) => {
                let grid = ChunkGrid::for_storage(&layout.shape, def.chunk_shape.as_deref())?;
                if grid.chunk_count() as u64 != layout.chunk_count {
                    anyhow::bail!(
                        "variable '{}' expects {} chunks but the index holds {}",
                        name,
                        grid.chunk_count(),
                        layout.chunk_count
                    );
                }
                let elem_size = def.dtype.size();
                let total: usize = layout.shape.iter().product();
                let mut bytes = vec![0u8; total * elem_size];
                for (i, origin) in grid.origins().iter().enumerate() {
                    let chunk = self.read_chunk(layout.first_chunk + i as u64)?;
                    let expected = grid.extent(origin).iter().product::<usize>() * elem_size;
                    if chunk.len() != expected {
                        anyhow::bail!(
                            "variable '{}' chunk {} holds {} bytes, expected {}",
                            name,
                            i,
                            chunk.len(),
                            expected
                        );
                    }
                    grid.scatter(&mut bytes, elem_size, origin, &chunk);
                }
                Some(ArrayData::from_le_bytes(def.dtype, &bytes)?)
            }
            None => None,
        };

        complete_to_shape(&def, &shape, stored)
    }
}
