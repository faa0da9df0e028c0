//! Chunked N-dimensional array hierarchies in the Zarr V2 and V3 formats.
//!
//! A [`Hierarchy`] binds a [`Storage`](storage::Storage) to one format version
//! and a [`CodecRegistry`](codec::CodecRegistry).
//! Groups and arrays are created and opened by path;
//! an [`Array`] handle reads and writes regions chunk by chunk.
//!
//! ```no_run
//! use zarrs_hier::{
//!     Array, ArrayOptions, Hierarchy, codec::{CodecConfig, CodecRegistry},
//!     data_type::DataType, zarr_version::ZarrVersion,
//! };
//!
//! # fn main() -> zarrs_hier::Result<()> {
//! let hierarchy = Hierarchy::create("data/example.zr", ZarrVersion::V2, CodecRegistry::builtin())?;
//! let array: Array = hierarchy.create_array(
//!     "/gzip",
//!     vec![250, 250, 1],
//!     vec![100, 100, 1],
//!     DataType::UInt8,
//!     ArrayOptions::new().with_codec(CodecConfig::Gzip { level: 1 }),
//! )?;
//! array.write_all(&vec![1; 250 * 250])?;
//! # Ok(())
//! # }
//! ```

pub mod array;
pub mod chunk;
pub mod chunk_key_encoding;
pub mod codec;
pub mod data_type;
mod error;
pub mod fixtures;
pub mod hierarchy;
pub mod metadata;
pub mod node;
pub mod storage;
pub mod zarr_version;

pub use array::{Array, ArrayOptions};
pub use error::{Error, Result};
pub use hierarchy::{Hierarchy, HierarchyKind};
