//! Group and array metadata, and their Zarr V2 / V3 documents.
//!
//! [`ArrayMetadata`] and [`GroupMetadata`] are version-independent;
//! [`MetadataCodec`] reads and writes them as the documents of one format version.
//! Metadata is re-read from the store on every access and never cached.

pub mod v2;
pub mod v3;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::{
    Error, Result,
    chunk::ChunkGrid,
    chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator},
    codec::CodecConfig,
    data_type::{DataType, FillValue},
    node::NodePath,
    storage::{Storage, StoreKey},
    zarr_version::ZarrVersion,
};

/// Unstructured user attributes.
pub type Attributes = Map<String, Value>;

/// Representation of node metadata, either an array or a group.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeMetadata {
    Array(ArrayMetadata),
    Group(GroupMetadata),
}

impl From<ArrayMetadata> for NodeMetadata {
    fn from(value: ArrayMetadata) -> Self {
        Self::Array(value)
    }
}

impl From<GroupMetadata> for NodeMetadata {
    fn from(value: GroupMetadata) -> Self {
        Self::Group(value)
    }
}

impl NodeMetadata {
    pub fn is_array(&self) -> bool {
        matches!(self, NodeMetadata::Array(_))
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            NodeMetadata::Array(m) => &m.attributes,
            NodeMetadata::Group(m) => &m.attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupMetadata {
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayMetadata {
    pub shape: Vec<u64>,
    /// Same dimensionality as `shape`, all extents positive.
    pub chunk_shape: Vec<u64>,
    pub data_type: DataType,
    pub fill_value: FillValue,
    pub codec: CodecConfig,
    /// Zarr V3 arrays always use [`ChunkKeySeparator::Slash`].
    pub separator: ChunkKeySeparator,
    pub attributes: Attributes,
}

impl ArrayMetadata {
    pub fn chunk_grid(&self) -> Result<ChunkGrid> {
        ChunkGrid::new(self.shape.clone(), self.chunk_shape.clone())
    }

    pub fn chunk_key_encoding(&self, version: ZarrVersion) -> ChunkKeyEncoding {
        ChunkKeyEncoding::new(version, self.separator)
    }

    /// Check internal consistency, as required of any document that is read or written.
    fn validate(&self) -> std::result::Result<(), String> {
        if self.shape.len() != self.chunk_shape.len() {
            return Err(format!(
                "shape {:?} and chunk shape {:?} have different dimensionality",
                self.shape, self.chunk_shape
            ));
        }
        if self.chunk_shape.contains(&0) {
            return Err(format!("chunk shape {:?} has a zero extent", self.chunk_shape));
        }
        if !self.fill_value.matches(self.data_type) {
            return Err(format!(
                "fill value {:?} does not match data type {}",
                self.fill_value.as_bytes(),
                self.data_type
            ));
        }
        self.codec.validate().map_err(|e| e.to_string())
    }
}

/// Reads and writes node metadata documents for one format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataCodec {
    version: ZarrVersion,
}

impl MetadataCodec {
    pub fn new(version: ZarrVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ZarrVersion {
        self.version
    }

    /// Every metadata document key this version may use for a node at `path`.
    pub fn metadata_keys(&self, path: &NodePath) -> Result<Vec<StoreKey>> {
        match self.version {
            ZarrVersion::V2 => [v2::ZARRAY, v2::ZGROUP, v2::ZATTRS]
                .into_iter()
                .map(|name| path.key(name))
                .collect(),
            ZarrVersion::V3 => Ok(vec![path.key(v3::ZARR_JSON)?]),
        }
    }

    pub fn write_group_metadata(
        &self,
        store: &Storage,
        path: &NodePath,
        metadata: &GroupMetadata,
    ) -> Result<()> {
        match self.version {
            ZarrVersion::V2 => {
                put_json(store, &path.key(v2::ZGROUP)?, &v2::GroupMetadataV2::default())?;
                v2::write_attributes(store, path, &metadata.attributes)
            }
            ZarrVersion::V3 => put_json(
                store,
                &path.key(v3::ZARR_JSON)?,
                &v3::GroupMetadataV3::new(metadata.attributes.clone()),
            ),
        }
    }

    pub fn write_array_metadata(
        &self,
        store: &Storage,
        path: &NodePath,
        metadata: &ArrayMetadata,
    ) -> Result<()> {
        let key = match self.version {
            ZarrVersion::V2 => path.key(v2::ZARRAY)?,
            ZarrVersion::V3 => path.key(v3::ZARR_JSON)?,
        };
        metadata.validate().map_err(|reason| Error::corrupt(&key, reason))?;
        match self.version {
            ZarrVersion::V2 => {
                put_json(store, &key, &v2::ArrayMetadataV2::from(metadata))?;
                v2::write_attributes(store, path, &metadata.attributes)
            }
            ZarrVersion::V3 => put_json(store, &key, &v3::ArrayMetadataV3::try_from(metadata)?),
        }
    }

    /// Read whichever node is at `path`, or [`None`] if there is none.
    pub fn read_node_metadata(
        &self,
        store: &Storage,
        path: &NodePath,
    ) -> Result<Option<NodeMetadata>> {
        match self.version {
            ZarrVersion::V2 => v2::read_node_metadata(store, path),
            ZarrVersion::V3 => v3::read_node_metadata(store, path),
        }
    }

    pub fn read_group_metadata(&self, store: &Storage, path: &NodePath) -> Result<GroupMetadata> {
        match self.read_node_metadata(store, path)? {
            Some(NodeMetadata::Group(m)) => Ok(m),
            _ => Err(Error::NotFound(format!("group {path}"))),
        }
    }

    pub fn read_array_metadata(&self, store: &Storage, path: &NodePath) -> Result<ArrayMetadata> {
        match self.read_node_metadata(store, path)? {
            Some(NodeMetadata::Array(m)) => Ok(m),
            _ => Err(Error::NotFound(format!("array {path}"))),
        }
    }

    /// Replace the attributes of the node at `path`.
    pub fn write_attributes(
        &self,
        store: &Storage,
        path: &NodePath,
        attributes: Attributes,
    ) -> Result<()> {
        match self.read_node_metadata(store, path)? {
            None => Err(Error::NotFound(path.to_string())),
            Some(NodeMetadata::Group(_)) => {
                self.write_group_metadata(store, path, &GroupMetadata { attributes })
            }
            Some(NodeMetadata::Array(mut m)) => {
                m.attributes = attributes;
                self.write_array_metadata(store, path, &m)
            }
        }
    }
}

fn put_json<T: serde::Serialize>(store: &Storage, key: &StoreKey, document: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(document)?;
    store.set(key, Bytes::from(bytes))
}

/// Parse a metadata document into a JSON object.
fn parse_object(key: &StoreKey, bytes: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::corrupt(key, "document is not a JSON object")),
        Err(e) => Err(Error::corrupt(key, e.to_string())),
    }
}

/// Check the `zarr_format` field of a parsed document.
fn check_zarr_format(
    key: &StoreKey,
    document: &Map<String, Value>,
    version: ZarrVersion,
) -> Result<()> {
    match document.get("zarr_format") {
        None => Err(Error::corrupt(key, "missing field `zarr_format`")),
        Some(v) if v.as_u64() == Some(version.zarr_format()) => Ok(()),
        Some(v) => Err(Error::UnsupportedVersion(v.to_string())),
    }
}

/// Deserialize a checked document into its typed form.
fn from_document<T: serde::de::DeserializeOwned>(
    key: &StoreKey,
    document: Map<String, Value>,
) -> Result<T> {
    serde_json::from_value(Value::Object(document)).map_err(|e| Error::corrupt(key, e.to_string()))
}
