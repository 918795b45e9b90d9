pub mod chunk;
pub mod codec;
pub mod format;
pub mod memory;
pub mod model;
pub mod packing;
pub mod reader;
pub mod store;
pub mod writer;

pub use codec::Codec;
pub use format::{ChunkEntry, Ncpk1Header, StoredLayout, HEADER_SIZE, MAGIC};
pub use memory::MemoryStore;
pub use model::{ArrayData, AttrValue, Attribute, Attributes, DataType, Dimension, VariableDef};
pub use reader::{peek_codec_id, Reader};
pub use store::{StoreRead, StoreWrite, VariableMut, VariableSpec};
pub use writer::Writer;
