use zarrs_filesystem::FilesystemStoreCreateError;
use zarrs_storage::{StorageError, StoreKeyError, StorePrefixError};

use crate::{codec::CodecError, data_type::DataType, node::NodePath, storage::StoreKey};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No compress/decompress routines are registered for this codec and store kind.
    #[error("codec {codec} is not registered for {store_kind} stores")]
    UnregisteredCodec {
        codec: &'static str,
        store_kind: &'static str,
    },
    #[error("unsupported format version {0}")]
    UnsupportedVersion(String),
    #[error("corrupt metadata at {key}: {reason}")]
    CorruptMetadata { key: StoreKey, reason: String },
    #[error("a node already exists at {0}")]
    PathExists(NodePath),
    #[error("cannot create {path}: ancestor {ancestor} is an array")]
    PathConflict { path: NodePath, ancestor: NodePath },
    #[error("nothing found at {0}")]
    NotFound(String),
    #[error("{0} is not a zarr hierarchy")]
    NotAHierarchy(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("chunk {key} could not be decoded with codec {codec}: {source}")]
    CodecMismatch {
        key: StoreKey,
        codec: &'static str,
        #[source]
        source: CodecError,
    },
    #[error("codec {codec} failed to encode a chunk: {source}")]
    EncodeFailed {
        codec: &'static str,
        #[source]
        source: CodecError,
    },
    #[error("chunk {key} decoded to {actual} bytes, expected {expected}")]
    TruncatedChunk {
        key: StoreKey,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),
    #[error("array has data type {expected}, got elements of type {got}")]
    IncompatibleElementType { expected: DataType, got: DataType },
    #[error("invalid node path {0:?}")]
    InvalidPath(String),
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
    #[error(transparent)]
    InvalidStorePrefix(#[from] StorePrefixError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    StoreCreate(#[from] FilesystemStoreCreateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error("{0}")]
    General(String),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(message.into())
    }

    pub(crate) fn corrupt(key: &StoreKey, reason: impl Into<String>) -> Self {
        Self::CorruptMetadata {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch(message.into())
    }
}
