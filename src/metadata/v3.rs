//! Zarr V3 documents: one `zarr.json` per node.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use super::{
    ArrayMetadata, Attributes, GroupMetadata, NodeMetadata, check_zarr_format, from_document,
    parse_object,
};
use crate::{
    Error, Result,
    chunk_key_encoding::ChunkKeySeparator,
    codec::{BloscConfiguration, CodecConfig},
    data_type::{DataType, FillValue},
    node::NodePath,
    storage::{Storage, StoreKey},
    zarr_version::ZarrVersion,
};

pub const ZARR_JSON: &str = "zarr.json";

const NODE_TYPE_ARRAY: &str = "array";
const NODE_TYPE_GROUP: &str = "group";

/// A `{"name": ..., "configuration": {...}}` metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedConfiguration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

impl NamedConfiguration {
    fn new(name: &str, configuration: Value) -> Self {
        Self {
            name: name.to_string(),
            configuration: Some(configuration),
        }
    }

    fn parse<T: DeserializeOwned>(&self, key: &StoreKey) -> Result<T> {
        let configuration = self.configuration.clone().unwrap_or_else(|| json!({}));
        serde_json::from_value(configuration)
            .map_err(|e| Error::corrupt(key, format!("{} configuration: {e}", self.name)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetadataV3 {
    pub zarr_format: u64,
    pub node_type: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl GroupMetadataV3 {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            zarr_format: ZarrVersion::V3.zarr_format(),
            node_type: NODE_TYPE_GROUP.to_string(),
            attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayMetadataV3 {
    pub zarr_format: u64,
    pub node_type: String,
    pub shape: Vec<u64>,
    pub data_type: String,
    pub chunk_grid: NamedConfiguration,
    pub chunk_key_encoding: NamedConfiguration,
    pub fill_value: Value,
    pub codecs: Vec<NamedConfiguration>,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Deserialize)]
struct RegularChunkGrid {
    chunk_shape: Vec<u64>,
}

fn default_separator() -> ChunkKeySeparator {
    ChunkKeySeparator::Slash
}

#[derive(Deserialize)]
struct DefaultChunkKeyEncoding {
    #[serde(default = "default_separator")]
    separator: ChunkKeySeparator,
}

#[derive(Deserialize)]
struct BytesCodec {
    endian: Option<String>,
}

#[derive(Deserialize)]
struct LevelCodec {
    level: u32,
}

impl TryFrom<&ArrayMetadata> for ArrayMetadataV3 {
    type Error = serde_json::Error;

    fn try_from(metadata: &ArrayMetadata) -> Result<Self, Self::Error> {
        let mut codecs = vec![NamedConfiguration::new(
            "bytes",
            json!({"endian": "little"}),
        )];
        match &metadata.codec {
            CodecConfig::Raw => {}
            CodecConfig::Gzip { level } => {
                codecs.push(NamedConfiguration::new("gzip", json!({"level": level})));
            }
            CodecConfig::Zlib { level } => {
                codecs.push(NamedConfiguration::new("zlib", json!({"level": level})));
            }
            CodecConfig::Blosc(c) => {
                codecs.push(NamedConfiguration::new("blosc", serde_json::to_value(c)?));
            }
        }
        Ok(Self {
            zarr_format: ZarrVersion::V3.zarr_format(),
            node_type: NODE_TYPE_ARRAY.to_string(),
            shape: metadata.shape.clone(),
            data_type: metadata.data_type.name_v3().to_string(),
            chunk_grid: NamedConfiguration::new(
                "regular",
                json!({"chunk_shape": metadata.chunk_shape}),
            ),
            chunk_key_encoding: NamedConfiguration::new("default", json!({"separator": "/"})),
            fill_value: metadata.fill_value.to_json(metadata.data_type),
            codecs,
            attributes: metadata.attributes.clone(),
        })
    }
}

impl ArrayMetadataV3 {
    fn into_metadata(self, key: &StoreKey) -> Result<ArrayMetadata> {
        let data_type = DataType::from_v3(&self.data_type)?;
        let fill_value = FillValue::from_json(data_type, &self.fill_value)
            .map_err(|reason| Error::corrupt(key, reason))?;

        if self.chunk_grid.name != "regular" {
            return Err(Error::corrupt(
                key,
                format!("unsupported chunk grid {:?}", self.chunk_grid.name),
            ));
        }
        let chunk_shape = self.chunk_grid.parse::<RegularChunkGrid>(key)?.chunk_shape;

        if self.chunk_key_encoding.name != "default" {
            return Err(Error::corrupt(
                key,
                format!(
                    "unsupported chunk key encoding {:?}",
                    self.chunk_key_encoding.name
                ),
            ));
        }
        let encoding: DefaultChunkKeyEncoding = self.chunk_key_encoding.parse(key)?;
        if encoding.separator != ChunkKeySeparator::Slash {
            return Err(Error::corrupt(key, "chunk keys must be separated by '/'"));
        }

        let mut codec = None;
        for entry in &self.codecs {
            let config = match entry.name.as_str() {
                "bytes" => {
                    let bytes: BytesCodec = entry.parse(key)?;
                    if bytes.endian.as_deref() == Some("big") && data_type.size() > 1 {
                        return Err(Error::corrupt(key, "big endian data is not supported"));
                    }
                    continue;
                }
                "gzip" => CodecConfig::Gzip {
                    level: entry.parse::<LevelCodec>(key)?.level,
                },
                "zlib" => CodecConfig::Zlib {
                    level: entry.parse::<LevelCodec>(key)?.level,
                },
                "blosc" => {
                    let mut config: BloscConfiguration = entry.parse(key)?;
                    if config.typesize == 0 {
                        config.typesize = data_type.size();
                    }
                    CodecConfig::Blosc(config)
                }
                name => return Err(Error::corrupt(key, format!("unsupported codec {name:?}"))),
            };
            if codec.replace(config).is_some() {
                return Err(Error::corrupt(key, "more than one compression codec"));
            }
        }

        let metadata = ArrayMetadata {
            shape: self.shape,
            chunk_shape,
            data_type,
            fill_value,
            codec: codec.unwrap_or_default(),
            separator: ChunkKeySeparator::Slash,
            attributes: self.attributes,
        };
        metadata
            .validate()
            .map_err(|reason| Error::corrupt(key, reason))?;
        Ok(metadata)
    }
}

pub(super) fn read_node_metadata(
    store: &Storage,
    path: &NodePath,
) -> Result<Option<NodeMetadata>> {
    let key = path.key(ZARR_JSON)?;
    let Some(bytes) = store.get(&key)? else {
        return Ok(None);
    };
    let document = parse_object(&key, &bytes)?;
    check_zarr_format(&key, &document, ZarrVersion::V3)?;
    let node_type = document
        .get("node_type")
        .and_then(Value::as_str)
        .map(str::to_string);
    match node_type.as_deref() {
        Some(NODE_TYPE_ARRAY) => {
            let array: ArrayMetadataV3 = from_document(&key, document)?;
            Ok(Some(array.into_metadata(&key)?.into()))
        }
        Some(NODE_TYPE_GROUP) => {
            let group: GroupMetadataV3 = from_document(&key, document)?;
            Ok(Some(
                GroupMetadata {
                    attributes: group.attributes,
                }
                .into(),
            ))
        }
        Some(other) => Err(Error::corrupt(&key, format!("unknown node type {other:?}"))),
        None => Err(Error::corrupt(&key, "missing field `node_type`")),
    }
}
