//! Key-value storage underlying a hierarchy.
//!
//! Every metadata document and chunk is a single value addressed by a [`StoreKey`].
//! Absent values are not errors: [`Storage::get`] returns [`None`] for them, which is how
//! sparse chunks are distinguished from chunks stored with the `raw` codec.
//!
//! The stores themselves are [`zarrs_storage`] stores; [`Storage`] pairs one with the
//! [`StoreKind`] its codec routines are registered under.

use std::{fmt::Display, path::Path, sync::Arc};

pub use zarrs_filesystem::FilesystemStore;
pub use zarrs_storage::{
    Bytes, MaybeBytes, ReadableWritableListableStorage, ReadableWritableListableStorageTraits,
    StorageError, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix, store::MemoryStore,
};

use crate::Result;

/// The kind of storage backing a hierarchy.
///
/// Codec routines are registered per store kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKind {
    Filesystem,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Filesystem => "filesystem",
            StoreKind::Memory => "memory",
        }
    }
}

impl Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shared store and its [`StoreKind`].
#[derive(Clone)]
pub struct Storage {
    store: ReadableWritableListableStorage,
    kind: StoreKind,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Storage {
    pub fn new(store: ReadableWritableListableStorage, kind: StoreKind) -> Self {
        Self { store, kind }
    }

    /// A [`FilesystemStore`] rooted at `location`.
    pub fn filesystem(location: impl AsRef<Path>) -> Result<Self> {
        let store = FilesystemStore::new(location)?;
        Ok(Self::new(Arc::new(store), StoreKind::Filesystem))
    }

    /// An empty [`MemoryStore`].
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), StoreKind::Memory)
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn store(&self) -> &ReadableWritableListableStorage {
        &self.store
    }

    /// Retrieve the value at `key`, or [`None`] if it is absent.
    pub fn get(&self, key: &StoreKey) -> Result<MaybeBytes> {
        Ok(self.store.get(key)?)
    }

    /// Store `value` at `key`, replacing any existing value.
    pub fn set(&self, key: &StoreKey, value: Bytes) -> Result<()> {
        Ok(self.store.set(key, value)?)
    }

    /// Remove the value at `key`; removing an absent key succeeds.
    pub fn erase(&self, key: &StoreKey) -> Result<()> {
        Ok(self.store.erase(key)?)
    }

    pub fn list(&self) -> Result<StoreKeys> {
        Ok(self.store.list()?)
    }

    /// Keys and prefixes directly under `prefix`.
    pub fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes> {
        Ok(self.store.list_dir(prefix)?)
    }

    pub fn exists(&self, key: &StoreKey) -> Result<bool> {
        Ok(self.store.size_key(key)?.is_some())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.list()?.is_empty())
    }
}
