//! Quantize floating-point variables of a gridded array store into 16- or
//! 32-bit unsigned integers with `scale_factor`/`add_offset`, and repack the
//! whole store around them with chunked lossless compression.

pub mod classify;
pub mod config;
pub mod copy;
pub mod history;
pub mod pipeline;
pub mod quantize;
pub mod select;
pub mod stats;
pub mod verify;

pub use classify::{AnyOf, AxisAttribute, CoordinateClassifier, StaticNames, UnitsToken};
pub use config::{ClassifierKind, PackConfig, TargetSelection};
pub use copy::{copy_all, CopySummary, VariableTransform};
pub use history::{history_entry, update_history};
pub use pipeline::{open_store, pack_file, OutputTarget, PackOptions, PackReport};
pub use quantize::{chunk_shape, compress, Encoding, PackedDescriptor, PackedVariable, Quantizer};
pub use select::{resolve_targets, select_candidates};
pub use stats::Distribution;
pub use verify::{check_all, check_values, Tolerance};
