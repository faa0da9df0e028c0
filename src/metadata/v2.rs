//! Zarr V2 documents: `.zgroup`, `.zarray` and `.zattrs`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ArrayMetadata, Attributes, GroupMetadata, NodeMetadata, check_zarr_format, from_document,
    parse_object, put_json,
};
use crate::{
    Error, Result,
    chunk_key_encoding::ChunkKeySeparator,
    codec::{BloscCompressor, BloscConfiguration, BloscShuffleMode, CodecConfig},
    data_type::{DataType, FillValue},
    node::NodePath,
    storage::{Storage, StoreKey},
    zarr_version::ZarrVersion,
};

pub const ZGROUP: &str = ".zgroup";
pub const ZARRAY: &str = ".zarray";
pub const ZATTRS: &str = ".zattrs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetadataV2 {
    pub zarr_format: u64,
}

impl Default for GroupMetadataV2 {
    fn default() -> Self {
        Self { zarr_format: 2 }
    }
}

/// The `compressor` field of `.zarray`, as written by numcodecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "lowercase")]
pub enum CompressorV2 {
    Gzip {
        level: u32,
    },
    Zlib {
        level: u32,
    },
    Blosc {
        cname: BloscCompressor,
        clevel: u8,
        shuffle: i64,
        #[serde(default)]
        blocksize: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayMetadataV2 {
    pub zarr_format: u64,
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    pub dtype: String,
    pub compressor: Option<CompressorV2>,
    pub fill_value: Value,
    pub order: String,
    pub filters: Option<Vec<Value>>,
    #[serde(default)]
    pub dimension_separator: ChunkKeySeparator,
}

impl From<&ArrayMetadata> for ArrayMetadataV2 {
    fn from(metadata: &ArrayMetadata) -> Self {
        let compressor = match &metadata.codec {
            CodecConfig::Raw => None,
            CodecConfig::Gzip { level } => Some(CompressorV2::Gzip { level: *level }),
            CodecConfig::Zlib { level } => Some(CompressorV2::Zlib { level: *level }),
            CodecConfig::Blosc(c) => Some(CompressorV2::Blosc {
                cname: c.cname,
                clevel: c.clevel,
                shuffle: c.shuffle.as_v2(),
                blocksize: c.blocksize,
            }),
        };
        Self {
            zarr_format: ZarrVersion::V2.zarr_format(),
            shape: metadata.shape.clone(),
            chunks: metadata.chunk_shape.clone(),
            dtype: metadata.data_type.name_v2().to_string(),
            compressor,
            fill_value: metadata.fill_value.to_json(metadata.data_type),
            order: "C".to_string(),
            filters: None,
            dimension_separator: metadata.separator,
        }
    }
}

impl ArrayMetadataV2 {
    fn into_metadata(self, key: &StoreKey, attributes: Attributes) -> Result<ArrayMetadata> {
        if self.order != "C" {
            return Err(Error::corrupt(
                key,
                format!("unsupported memory order {:?}", self.order),
            ));
        }
        if self.filters.as_ref().is_some_and(|f| !f.is_empty()) {
            return Err(Error::corrupt(key, "filters are not supported"));
        }
        let data_type = DataType::from_v2(&self.dtype)?;
        let fill_value = FillValue::from_json(data_type, &self.fill_value)
            .map_err(|reason| Error::corrupt(key, reason))?;
        let codec = match self.compressor {
            None => CodecConfig::Raw,
            Some(CompressorV2::Gzip { level }) => CodecConfig::Gzip { level },
            Some(CompressorV2::Zlib { level }) => CodecConfig::Zlib { level },
            Some(CompressorV2::Blosc {
                cname,
                clevel,
                shuffle,
                blocksize,
            }) => {
                let shuffle = BloscShuffleMode::from_v2(shuffle, data_type.size()).ok_or_else(
                    || Error::corrupt(key, format!("invalid blosc shuffle {shuffle}")),
                )?;
                let mut config = BloscConfiguration::new(cname, clevel, shuffle, data_type.size());
                config.blocksize = blocksize;
                CodecConfig::Blosc(config)
            }
        };
        let metadata = ArrayMetadata {
            shape: self.shape,
            chunk_shape: self.chunks,
            data_type,
            fill_value,
            codec,
            separator: self.dimension_separator,
            attributes,
        };
        metadata
            .validate()
            .map_err(|reason| Error::corrupt(key, reason))?;
        Ok(metadata)
    }
}

/// Write `.zattrs`, or remove it when there are no attributes.
pub(super) fn write_attributes(
    store: &Storage,
    path: &NodePath,
    attributes: &Attributes,
) -> Result<()> {
    let key = path.key(ZATTRS)?;
    if attributes.is_empty() {
        store.erase(&key)
    } else {
        put_json(store, &key, attributes)
    }
}

fn read_attributes(store: &Storage, path: &NodePath) -> Result<Attributes> {
    let key = path.key(ZATTRS)?;
    match store.get(&key)? {
        Some(bytes) => parse_object(&key, &bytes),
        None => Ok(Attributes::new()),
    }
}

pub(super) fn read_node_metadata(
    store: &Storage,
    path: &NodePath,
) -> Result<Option<NodeMetadata>> {
    let key = path.key(ZARRAY)?;
    if let Some(bytes) = store.get(&key)? {
        let document = parse_object(&key, &bytes)?;
        check_zarr_format(&key, &document, ZarrVersion::V2)?;
        let array: ArrayMetadataV2 = from_document(&key, document)?;
        let attributes = read_attributes(store, path)?;
        return Ok(Some(array.into_metadata(&key, attributes)?.into()));
    }

    let key = path.key(ZGROUP)?;
    if let Some(bytes) = store.get(&key)? {
        let document = parse_object(&key, &bytes)?;
        check_zarr_format(&key, &document, ZarrVersion::V2)?;
        let attributes = read_attributes(store, path)?;
        return Ok(Some(GroupMetadata { attributes }.into()));
    }
    Ok(None)
}
