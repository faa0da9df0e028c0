//! Arrays: creation options and chunked region reads and writes.
//!
//! A region write splits the caller's buffer into chunk-aligned tiles.
//! Each tile is stored with the full chunk shape; elements outside the region
//! keep their previous value (or the fill value if the chunk was never written),
//! and elements past the array shape are always the fill value.
//! A region read assembles the output from every present chunk and leaves the
//! fill value wherever a chunk is absent.

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    Error, Result,
    chunk::{ArraySubset, ChunkGrid, copy_region},
    chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator},
    codec::{CodecConfig, CodecRegistry},
    data_type::{DataType, Element, FillValue},
    metadata::{ArrayMetadata, Attributes},
    node::NodePath,
    storage::{Storage, StoreKey},
    zarr_version::ZarrVersion,
};

/// Optional parameters for creating an array.
///
/// The default has a zero fill value, the `raw` codec and flat (`.`) chunk keys.
#[derive(Debug, Clone, Default)]
pub struct ArrayOptions {
    fill_value: Option<(DataType, FillValue)>,
    codec: CodecConfig,
    separator: ChunkKeySeparator,
    attributes: Attributes,
}

impl ArrayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill_value<T: Element>(mut self, fill_value: T) -> Self {
        self.fill_value = Some((T::DATA_TYPE, FillValue::from_element(fill_value)));
        self
    }

    pub fn with_codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    /// Ignored by Zarr V3 arrays, whose chunk keys are always nested.
    pub fn with_separator(mut self, separator: ChunkKeySeparator) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn codec(&self) -> &CodecConfig {
        &self.codec
    }

    /// Resolve these options into the metadata of a new array.
    pub(crate) fn into_metadata(
        self,
        version: ZarrVersion,
        shape: Vec<u64>,
        chunk_shape: Vec<u64>,
        data_type: DataType,
    ) -> Result<ArrayMetadata> {
        ChunkGrid::new(shape.clone(), chunk_shape.clone())?;
        let fill_value = match self.fill_value {
            None => FillValue::zero(data_type),
            Some((dt, value)) if dt == data_type => value,
            Some((got, _)) => {
                return Err(Error::IncompatibleElementType {
                    expected: data_type,
                    got,
                });
            }
        };
        let codec = match self.codec {
            CodecConfig::Blosc(mut config) if config.typesize == 0 => {
                config.typesize = data_type.size();
                CodecConfig::Blosc(config)
            }
            codec => codec,
        };
        let separator = match version {
            ZarrVersion::V2 => self.separator,
            ZarrVersion::V3 => ChunkKeySeparator::Slash,
        };
        Ok(ArrayMetadata {
            shape,
            chunk_shape,
            data_type,
            fill_value,
            codec,
            separator,
            attributes: self.attributes,
        })
    }
}

/// A handle to an array in a hierarchy.
///
/// The handle holds the metadata read when it was opened.
#[derive(Clone)]
pub struct Array {
    store: Storage,
    registry: Arc<CodecRegistry>,
    version: ZarrVersion,
    path: NodePath,
    metadata: ArrayMetadata,
    grid: ChunkGrid,
    key_encoding: ChunkKeyEncoding,
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array")
            .field("store_kind", &self.store.kind())
            .field("version", &self.version)
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl Array {
    pub(crate) fn new(
        store: Storage,
        registry: Arc<CodecRegistry>,
        version: ZarrVersion,
        path: NodePath,
        metadata: ArrayMetadata,
    ) -> Result<Self> {
        let grid = metadata.chunk_grid()?;
        let key_encoding = metadata.chunk_key_encoding(version);
        Ok(Self {
            store,
            registry,
            version,
            path,
            metadata,
            grid,
            key_encoding,
        })
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn version(&self) -> ZarrVersion {
        self.version
    }

    pub fn metadata(&self) -> &ArrayMetadata {
        &self.metadata
    }

    pub fn shape(&self) -> &[u64] {
        &self.metadata.shape
    }

    pub fn chunk_shape(&self) -> &[u64] {
        &self.metadata.chunk_shape
    }

    pub fn data_type(&self) -> DataType {
        self.metadata.data_type
    }

    pub fn fill_value(&self) -> &FillValue {
        &self.metadata.fill_value
    }

    pub fn codec(&self) -> &CodecConfig {
        &self.metadata.codec
    }

    pub fn separator(&self) -> ChunkKeySeparator {
        self.key_encoding.separator()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.metadata.attributes
    }

    pub fn chunk_grid(&self) -> &ChunkGrid {
        &self.grid
    }

    pub fn num_chunks(&self) -> u64 {
        self.grid.num_chunks()
    }

    /// The store key of the chunk at `chunk_indices`.
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> Result<StoreKey> {
        self.grid.check_chunk_indices(chunk_indices)?;
        self.path.key(&self.key_encoding.encode(chunk_indices))
    }

    /// Write `bytes`, the little-endian C-order elements of the region at `offset` with `shape`.
    pub fn write(&self, offset: &[u64], shape: &[u64], bytes: &[u8]) -> Result<()> {
        let region = self.region(offset, shape)?;
        let expected = self.byte_len(region.num_elements())?;
        if bytes.len() != expected {
            return Err(Error::shape_mismatch(format!(
                "region {shape:?} of {} needs {expected} bytes, got {}",
                self.data_type(),
                bytes.len()
            )));
        }
        let element_size = self.data_type().size();
        for chunk_indices in self.grid.chunks_in_subset(&region) {
            let chunk = self.grid.chunk_subset(&chunk_indices);
            let Some(overlap) = chunk.overlap(&region) else {
                continue;
            };
            let mut tile = if overlap == self.grid.chunk_subset_bounded(&chunk_indices) {
                self.fill_tile()?
            } else {
                match self.retrieve_chunk(&chunk_indices)? {
                    Some(tile) => tile,
                    None => self.fill_tile()?,
                }
            };
            copy_region(
                bytes,
                region.shape(),
                &overlap.relative_start(region.start()),
                &mut tile,
                chunk.shape(),
                &overlap.relative_start(chunk.start()),
                overlap.shape(),
                element_size,
            );
            self.store_chunk(&chunk_indices, &tile)?;
        }
        Ok(())
    }

    /// Read the little-endian C-order elements of the region at `offset` with `shape`.
    pub fn read(&self, offset: &[u64], shape: &[u64]) -> Result<Vec<u8>> {
        let region = self.region(offset, shape)?;
        let mut out = self.fill(region.num_elements())?;
        let element_size = self.data_type().size();
        for chunk_indices in self.grid.chunks_in_subset(&region) {
            let chunk = self.grid.chunk_subset(&chunk_indices);
            let Some(overlap) = chunk.overlap(&region) else {
                continue;
            };
            let Some(tile) = self.retrieve_chunk(&chunk_indices)? else {
                continue;
            };
            copy_region(
                &tile,
                chunk.shape(),
                &overlap.relative_start(chunk.start()),
                &mut out,
                region.shape(),
                &overlap.relative_start(region.start()),
                overlap.shape(),
                element_size,
            );
        }
        Ok(out)
    }

    pub fn write_all(&self, bytes: &[u8]) -> Result<()> {
        let shape = self.metadata.shape.clone();
        self.write(&vec![0; shape.len()], &shape, bytes)
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        let shape = self.metadata.shape.clone();
        self.read(&vec![0; shape.len()], &shape)
    }

    pub fn write_elements<T: Element>(
        &self,
        offset: &[u64],
        shape: &[u64],
        elements: &[T],
    ) -> Result<()> {
        self.check_element::<T>()?;
        self.write(offset, shape, &T::to_bytes(elements))
    }

    pub fn read_elements<T: Element>(&self, offset: &[u64], shape: &[u64]) -> Result<Vec<T>> {
        self.check_element::<T>()?;
        Ok(T::from_bytes(&self.read(offset, shape)?))
    }

    fn check_element<T: Element>(&self) -> Result<()> {
        if T::DATA_TYPE == self.data_type() {
            Ok(())
        } else {
            Err(Error::IncompatibleElementType {
                expected: self.data_type(),
                got: T::DATA_TYPE,
            })
        }
    }

    fn region(&self, offset: &[u64], shape: &[u64]) -> Result<ArraySubset> {
        let region = ArraySubset::new_with_start_shape(offset.to_vec(), shape.to_vec())?;
        self.grid.check_subset(&region)?;
        Ok(region)
    }

    fn byte_len(&self, num_elements: u64) -> Result<usize> {
        usize::try_from(num_elements)
            .ok()
            .and_then(|n| n.checked_mul(self.data_type().size()))
            .ok_or_else(|| Error::shape_mismatch(format!("{num_elements} elements do not fit in memory")))
    }

    fn fill(&self, num_elements: u64) -> Result<Vec<u8>> {
        let len = self.byte_len(num_elements)?;
        let element = self.metadata.fill_value.as_bytes();
        Ok(element.repeat(len / element.len().max(1)))
    }

    fn fill_tile(&self) -> Result<Vec<u8>> {
        self.fill(self.grid.chunk_num_elements())
    }

    /// The decoded chunk at `chunk_indices`, or [`None`] if it has never been written.
    fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Option<Vec<u8>>> {
        let key = self.chunk_key(chunk_indices)?;
        let Some(encoded) = self.store.get(&key)? else {
            log::trace!("chunk {key} absent");
            return Ok(None);
        };
        log::trace!("retrieve chunk {key} ({} bytes)", encoded.len());
        let expected = self.byte_len(self.grid.chunk_num_elements())?;
        self.registry
            .decompress(
                self.store.kind(),
                &self.metadata.codec,
                &key,
                &encoded,
                expected,
            )
            .map(Some)
    }

    fn store_chunk(&self, chunk_indices: &[u64], tile: &[u8]) -> Result<()> {
        let key = self.chunk_key(chunk_indices)?;
        let encoded = self
            .registry
            .compress(self.store.kind(), &self.metadata.codec, tile)?;
        log::trace!(
            "store chunk {key} ({} bytes, {} encoded)",
            tile.len(),
            encoded.len()
        );
        self.store.set(&key, Bytes::from(encoded))
    }
}
