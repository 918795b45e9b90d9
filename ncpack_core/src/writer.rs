use std::collections::HashMap;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::Context;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::chunk::ChunkGrid;
use crate::codec::Codec;
use crate::format::{
    ChunkEntry, FileMetadata, Footer, Ncpk1Header, StoredLayout, VariableRecord,
    FLAG_HAS_CHECKSUM, FORMAT_VERSION, HEADER_SIZE,
};
use crate::model::{ArrayData, AttrValue, Attributes};
use crate::store::{Schema, StoreWrite, VariableSpec};

/// Writer for NCPK1 files.
///
/// # Write contract
/// Define dimensions and variables, then call [`put_values`] once per
/// variable with its full array. Values are cut into chunks and appended to
/// the file immediately; attributes may still change until [`finish`].
/// Call [`finish`] to append the chunk index, the metadata section and the
/// footer, and to write back the final header.
///
/// # Format layout written
/// ```text
/// [HEADER: 56 bytes placeholder]
/// [CHUNK 0] [CHUNK 1] ... [CHUNK N-1]      ← independent stored chunks
/// [CHUNK INDEX: 32 bytes × N]
/// [METADATA: JSON]
/// [FOOTER: 24 bytes]
/// ← seek back to 0, overwrite header with real values
/// ```
///
/// [`put_values`]: StoreWrite::put_values
/// [`finish`]: Writer::finish
pub struct Writer {
    file: File,
    codec: Box<dyn Codec>,
    schema: Schema,
    layouts: HashMap<String, StoredLayout>,
    /// In-memory chunk index, appended to file on `finish()`.
    entries: Vec<ChunkEntry>,
    /// Current write position in the file (mirrors the file cursor).
    current_offset: u64,
}

impl Writer {
    /// Create a new NCPK1 file at `path`, overwriting any existing file.
    ///
    /// `codec` compresses every variable declared with a compression level;
    /// the rest are stored raw.
    pub fn create(path: impl AsRef<Path>, codec: Box<dyn Codec>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("creating output file {:?}", path))?;
        Self::from_file(file, codec)
    }

    /// Write into an already-open, empty file (e.g. a temporary file that is
    /// persisted after verification).
    pub fn from_file(mut file: File, codec: Box<dyn Codec>) -> anyhow::Result<Self> {
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        // Write placeholder header (will be overwritten in finish())
        file.write_all(&[0u8; HEADER_SIZE as usize])?;
        Ok(Self {
            file,
            codec,
            schema: Schema::default(),
            layouts: HashMap::new(),
            entries: Vec::new(),
            current_offset: HEADER_SIZE,
        })
    }

    /// Store `raw` as a single chunk and return its index.
    fn flush_chunk(&mut self, raw: &[u8], level: Option<u32>) -> anyhow::Result<u64> {
        let stored = match level {
            Some(level) => self.codec.compress_chunk(raw, level)?,
            None => raw.to_vec(),
        };
        let stored_len = u32::try_from(stored.len())
            .map_err(|_| anyhow::anyhow!("chunk of {} bytes exceeds the 4 GiB limit", stored.len()))?;
        let raw_len = u32::try_from(raw.len())
            .map_err(|_| anyhow::anyhow!("chunk of {} bytes exceeds the 4 GiB limit", raw.len()))?;

        self.file.write_all(&stored)?;
        self.entries.push(ChunkEntry {
            offset: self.current_offset,
            stored_len,
            raw_len,
            checksum: xxh3_64(&stored),
            compressed: level.is_some(),
        });
        self.current_offset += stored_len as u64;
        Ok(self.entries.len() as u64 - 1)
    }

    /// Write the chunk index, metadata and footer, and seal the file by
    /// writing the final header.
    ///
    /// Returns the number of chunks written.
    pub fn finish(mut self) -> anyhow::Result<u64> {
        // ── Chunk index ────────────────────────────────────────────────────
        let index_offset = self.current_offset;
        for entry in &self.entries {
            self.file.write_all(&entry.to_bytes())?;
        }
        self.current_offset += self.entries.len() as u64 * crate::format::CHUNK_ENTRY_SIZE;

        // ── Metadata ───────────────────────────────────────────────────────
        let variable_count = self.schema.variables.len() as u64;
        let metadata = FileMetadata {
            attributes: self.schema.attributes.clone(),
            dimensions: self.schema.dimensions.clone(),
            variables: self
                .schema
                .variables
                .iter()
                .map(|def| VariableRecord {
                    def: def.clone(),
                    layout: self.layouts.get(&def.name).cloned(),
                })
                .collect(),
        };
        let json = serde_json::to_vec(&metadata)?;
        let metadata_offset = self.current_offset;
        self.file.write_all(&json)?;

        // ── Footer ─────────────────────────────────────────────────────────
        let footer = Footer {
            index_offset,
            metadata_offset,
            metadata_len: json.len() as u64,
        };
        self.file.write_all(&footer.to_bytes())?;

        // ── Seek back to 0 and write the real header ────────────────────────
        let chunk_count = self.entries.len() as u64;
        let header = Ncpk1Header {
            version: FORMAT_VERSION,
            codec_id: self.codec.id(),
            variable_count,
            chunk_count,
            flags: FLAG_HAS_CHECKSUM,
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.flush()?;
        self.file.sync_all()?;

        debug!(chunks = chunk_count, variables = variable_count, "sealed NCPK1 file");
        Ok(chunk_count)
    }
}

impl StoreWrite for Writer {
    fn global_attribute(&self, name: &str) -> Option<&AttrValue> {
        self.schema.attributes.get(name)
    }

    fn set_global_attribute(&mut self, name: &str, value: AttrValue) -> anyhow::Result<()> {
        self.schema.attributes.set(name, value);
        Ok(())
    }

    fn add_dimension(&mut self, name: &str, len: Option<usize>) -> anyhow::Result<()> {
        self.schema.add_dimension(name, len)
    }

    fn grow_dimension(&mut self, name: &str, len: usize) -> anyhow::Result<()> {
        self.schema.grow_dimension(name, len)
    }

    fn define_variable(&mut self, spec: VariableSpec) -> anyhow::Result<()> {
        self.schema.define_variable(spec)
    }

    fn variable_attributes(&self, var: &str) -> Option<&Attributes> {
        self.schema.variable(var).map(|v| &v.attributes)
    }

    fn set_variable_attribute(&mut self, var: &str, name: &str, value: AttrValue) -> anyhow::Result<()> {
        self.schema.set_variable_attribute(var, name, value)
    }

    fn set_auto_mask_and_scale(&mut self, var: &str, enabled: bool) -> anyhow::Result<()> {
        self.schema.set_auto_mask_and_scale(var, enabled)
    }

    fn put_values(&mut self, var: &str, values: ArrayData) -> anyhow::Result<()> {
        if self.layouts.contains_key(var) {
            anyhow::bail!("variable '{}' was already written", var);
        }
        let (stored, shape) = self.schema.prepare_put(var, values)?;
        let def = self
            .schema
            .variable(var)
            .ok_or_else(|| anyhow::anyhow!("no variable named '{}'", var))?;
        let level = def.compression_level;
        let grid = ChunkGrid::for_storage(&shape, def.chunk_shape.as_deref())?;

        let bytes = stored.to_le_bytes();
        let elem_size = stored.dtype().size();
        let first_chunk = self.entries.len() as u64;
        for origin in grid.origins() {
            let raw = grid.gather(&bytes, elem_size, &origin);
            self.flush_chunk(&raw, level)?;
        }
        let chunk_count = self.entries.len() as u64 - first_chunk;

        debug!(var, ?shape, chunk_shape = ?grid.chunk_shape(), chunks = chunk_count, "wrote variable");
        self.layouts.insert(
            var.to_string(),
            StoredLayout {
                shape,
                first_chunk,
                chunk_count,
            },
        );
        Ok(())
    }
}
