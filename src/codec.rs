//! Chunk compression codecs and the registry that dispatches to them.
//!
//! Built-in codecs submit a [`CodecPlugin`] through [`inventory`].
//! Nothing is usable until it is registered in a [`CodecRegistry`], which is an explicit value
//! owned by each hierarchy. The `raw` codec is always available.

mod blosc;
mod gzip;
mod raw;
mod zlib;

use std::{collections::HashMap, fmt::Display};

pub use blosc::{BloscCompressor, BloscConfiguration, BloscShuffleMode};

use crate::{
    Error, Result,
    storage::{StoreKey, StoreKind},
};

/// Identifies a codec independent of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodecId {
    Raw,
    Gzip,
    Zlib,
    Blosc,
}

impl CodecId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecId::Raw => "raw",
            CodecId::Gzip => "gzip",
            CodecId::Zlib => "zlib",
            CodecId::Blosc => "blosc",
        }
    }
}

impl Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compressor and its parameters, as recorded in array metadata.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CodecConfig {
    /// Uncompressed.
    #[default]
    Raw,
    Gzip {
        /// 0 to 9.
        level: u32,
    },
    Zlib {
        /// 0 to 9.
        level: u32,
    },
    Blosc(BloscConfiguration),
}

impl CodecConfig {
    pub fn id(&self) -> CodecId {
        match self {
            CodecConfig::Raw => CodecId::Raw,
            CodecConfig::Gzip { .. } => CodecId::Gzip,
            CodecConfig::Zlib { .. } => CodecId::Zlib,
            CodecConfig::Blosc(_) => CodecId::Blosc,
        }
    }

    /// Check parameters are in range.
    pub fn validate(&self) -> Result<(), CodecError> {
        match self {
            CodecConfig::Raw => Ok(()),
            CodecConfig::Gzip { level } | CodecConfig::Zlib { level } if *level > 9 => {
                Err(CodecError::InvalidConfiguration(format!(
                    "{} level {level} is not in 0..=9",
                    self.id()
                )))
            }
            CodecConfig::Gzip { .. } | CodecConfig::Zlib { .. } => Ok(()),
            CodecConfig::Blosc(c) => c.validate(),
        }
    }
}

/// A failure inside a codec routine.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("blosc: {0}")]
    Blosc(String),
    #[error("{0}")]
    InvalidConfiguration(String),
    #[error("routine for {routine} was given a {given} configuration")]
    WrongConfiguration {
        routine: CodecId,
        given: CodecId,
    },
}

/// Compress a decoded chunk.
pub type CompressFn = fn(&CodecConfig, &[u8]) -> Result<Vec<u8>, CodecError>;

/// Decompress an encoded chunk, given the expected decoded length.
pub type DecompressFn = fn(&CodecConfig, &[u8], usize) -> Result<Vec<u8>, CodecError>;

/// A built-in codec available for registration.
#[derive(Debug)]
pub struct CodecPlugin {
    id: CodecId,
    compress: CompressFn,
    decompress: DecompressFn,
}

impl CodecPlugin {
    pub const fn new(id: CodecId, compress: CompressFn, decompress: DecompressFn) -> Self {
        Self {
            id,
            compress,
            decompress,
        }
    }
}

inventory::collect!(CodecPlugin);

#[derive(Debug, Clone, Copy)]
struct CodecRoutines {
    compress: CompressFn,
    decompress: DecompressFn,
}

const RAW_ROUTINES: CodecRoutines = CodecRoutines {
    compress: raw::compress,
    decompress: raw::decompress,
};

/// Compress/decompress routines by store kind and codec.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<(StoreKind, CodecId), CodecRoutines>,
}

impl CodecRegistry {
    /// A registry knowing only the `raw` codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in codec registered for the filesystem and memory stores.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_builtin(StoreKind::Filesystem);
        registry.register_builtin(StoreKind::Memory);
        registry
    }

    /// Register routines for `codec` on `store_kind`.
    ///
    /// Registering an already-registered pair is a no-op; returns whether anything was added.
    pub fn register(
        &mut self,
        store_kind: StoreKind,
        codec: CodecId,
        compress: CompressFn,
        decompress: DecompressFn,
    ) -> bool {
        let mut added = false;
        self.codecs.entry((store_kind, codec)).or_insert_with(|| {
            added = true;
            CodecRoutines {
                compress,
                decompress,
            }
        });
        if added {
            log::debug!("registered codec {codec} for {store_kind} stores");
        }
        added
    }

    /// Register every built-in [`CodecPlugin`] for `store_kind`.
    pub fn register_builtin(&mut self, store_kind: StoreKind) {
        for plugin in inventory::iter::<CodecPlugin> {
            self.register(store_kind, plugin.id, plugin.compress, plugin.decompress);
        }
    }

    pub fn is_registered(&self, store_kind: StoreKind, codec: CodecId) -> bool {
        codec == CodecId::Raw || self.codecs.contains_key(&(store_kind, codec))
    }

    fn routines(&self, store_kind: StoreKind, codec: CodecId) -> Result<CodecRoutines> {
        match self.codecs.get(&(store_kind, codec)) {
            Some(r) => Ok(*r),
            None if codec == CodecId::Raw => Ok(RAW_ROUTINES),
            None => Err(Error::UnregisteredCodec {
                codec: codec.as_str(),
                store_kind: store_kind.as_str(),
            }),
        }
    }

    /// Fail with [`Error::UnregisteredCodec`] unless `config` can be used on `store_kind`.
    pub fn ensure_registered(&self, store_kind: StoreKind, config: &CodecConfig) -> Result<()> {
        self.routines(store_kind, config.id()).map(|_| ())
    }

    pub fn compress(
        &self,
        store_kind: StoreKind,
        config: &CodecConfig,
        decoded: &[u8],
    ) -> Result<Vec<u8>> {
        let routines = self.routines(store_kind, config.id())?;
        (routines.compress)(config, decoded).map_err(|source| Error::EncodeFailed {
            codec: config.id().as_str(),
            source,
        })
    }

    /// Decompress the chunk stored at `key`.
    ///
    /// Fails with [`Error::CodecMismatch`] if the payload cannot be decoded
    /// and [`Error::TruncatedChunk`] if it does not decode to exactly `expected_len` bytes.
    pub fn decompress(
        &self,
        store_kind: StoreKind,
        config: &CodecConfig,
        key: &StoreKey,
        encoded: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>> {
        let routines = self.routines(store_kind, config.id())?;
        let decoded = (routines.decompress)(config, encoded, expected_len).map_err(|source| {
            Error::CodecMismatch {
                key: key.clone(),
                codec: config.id().as_str(),
                source,
            }
        })?;
        if decoded.len() != expected_len {
            return Err(Error::TruncatedChunk {
                key: key.clone(),
                expected: expected_len,
                actual: decoded.len(),
            });
        }
        Ok(decoded)
    }
}

fn wrong_configuration(routine: CodecId, config: &CodecConfig) -> CodecError {
    CodecError::WrongConfiguration {
        routine,
        given: config.id(),
    }
}
