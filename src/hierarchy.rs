//! Hierarchies of groups and arrays.

use std::{io::ErrorKind, path::Path, sync::Arc};

use crate::{
    Error, Result,
    array::{Array, ArrayOptions},
    codec::CodecRegistry,
    data_type::DataType,
    metadata::{Attributes, GroupMetadata, MetadataCodec, NodeMetadata, v2, v3},
    node::NodePath,
    storage::{Storage, StoreKey},
    zarr_version::ZarrVersion,
};

/// How a hierarchy is laid out in its store, resolved once when it is created or opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HierarchyKind {
    /// Zarr V2: `.zgroup`/`.zarray` documents per node directory.
    V2Directory,
    /// Zarr V3: one container with a `zarr.json` per node and chunks under `c/`.
    V3Container,
}

impl HierarchyKind {
    pub fn version(&self) -> ZarrVersion {
        match self {
            HierarchyKind::V2Directory => ZarrVersion::V2,
            HierarchyKind::V3Container => ZarrVersion::V3,
        }
    }

    pub fn from_version(version: ZarrVersion) -> Self {
        match version {
            ZarrVersion::V2 => HierarchyKind::V2Directory,
            ZarrVersion::V3 => HierarchyKind::V3Container,
        }
    }

    /// Inspect the documents at the root of `store`.
    fn detect(store: &Storage) -> Result<Option<Self>> {
        if store.exists(&StoreKey::new(v3::ZARR_JSON)?)? {
            return Ok(Some(HierarchyKind::V3Container));
        }
        for name in [v2::ZGROUP, v2::ZARRAY] {
            if store.exists(&StoreKey::new(name)?)? {
                return Ok(Some(HierarchyKind::V2Directory));
            }
        }
        Ok(None)
    }
}

/// The root handle of one tree of groups and arrays in one store.
///
/// Nothing but the store, the layout and the codec registry is held;
/// every node operation re-reads metadata from the store.
#[derive(Clone)]
pub struct Hierarchy {
    store: Storage,
    kind: HierarchyKind,
    registry: Arc<CodecRegistry>,
}

impl std::fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hierarchy")
            .field("store_kind", &self.store.kind())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Hierarchy {
    /// Create a hierarchy in the directory `location`, which must be absent or empty.
    pub fn create(
        location: impl AsRef<Path>,
        version: ZarrVersion,
        registry: impl Into<Arc<CodecRegistry>>,
    ) -> Result<Self> {
        let location = location.as_ref();
        if location.is_file() || location.read_dir().is_ok_and(|mut d| d.next().is_some()) {
            return Err(std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} exists and is not an empty directory", location.display()),
            )
            .into());
        }
        std::fs::create_dir_all(location)?;
        log::debug!("creating {version} hierarchy at {}", location.display());
        Self::create_in_store(Storage::filesystem(location)?, version, registry)
    }

    /// Open the hierarchy in the directory `location`, inferring its format version.
    pub fn open(
        location: impl AsRef<Path>,
        registry: impl Into<Arc<CodecRegistry>>,
    ) -> Result<Self> {
        let location = location.as_ref();
        if !location.exists() {
            return Err(Error::NotFound(location.display().to_string()));
        }
        if !location.is_dir() {
            return Err(Error::NotAHierarchy(location.display().to_string()));
        }
        let store = Storage::filesystem(location)?;
        let kind = HierarchyKind::detect(&store)?
            .ok_or_else(|| Error::NotAHierarchy(location.display().to_string()))?;
        log::debug!("opened {} hierarchy at {}", kind.version(), location.display());
        Ok(Self {
            store,
            kind,
            registry: registry.into(),
        })
    }

    /// Create a hierarchy with an empty root group in `store`, which must be empty.
    pub fn create_in_store(
        store: Storage,
        version: ZarrVersion,
        registry: impl Into<Arc<CodecRegistry>>,
    ) -> Result<Self> {
        if !store.is_empty()? {
            return Err(std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} store is not empty", store.kind()),
            )
            .into());
        }
        let hierarchy = Self {
            store,
            kind: HierarchyKind::from_version(version),
            registry: registry.into(),
        };
        hierarchy.metadata_codec().write_group_metadata(
            &hierarchy.store,
            &NodePath::root(),
            &GroupMetadata::default(),
        )?;
        Ok(hierarchy)
    }

    /// Open the hierarchy in `store`, inferring its format version.
    pub fn open_store(
        store: Storage,
        registry: impl Into<Arc<CodecRegistry>>,
    ) -> Result<Self> {
        let kind = HierarchyKind::detect(&store)?
            .ok_or_else(|| Error::NotAHierarchy(format!("{} store", store.kind())))?;
        Ok(Self {
            store,
            kind,
            registry: registry.into(),
        })
    }

    pub fn kind(&self) -> HierarchyKind {
        self.kind
    }

    pub fn version(&self) -> ZarrVersion {
        self.kind.version()
    }

    pub fn store(&self) -> &Storage {
        &self.store
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    fn metadata_codec(&self) -> MetadataCodec {
        MetadataCodec::new(self.version())
    }

    fn node(&self, path: &NodePath) -> Result<Option<NodeMetadata>> {
        self.metadata_codec()
            .read_node_metadata(&self.store, path)
    }

    /// Check a node can be created at `path`, returning the ancestors that do not exist yet.
    fn check_new_node(&self, path: &NodePath) -> Result<Vec<NodePath>> {
        if self.node(path)?.is_some() {
            return Err(Error::PathExists(path.clone()));
        }
        let mut missing = Vec::new();
        for ancestor in path.ancestors() {
            match self.node(&ancestor)? {
                Some(NodeMetadata::Array(_)) => {
                    return Err(Error::PathConflict {
                        path: path.clone(),
                        ancestor,
                    });
                }
                Some(NodeMetadata::Group(_)) => {}
                None => missing.push(ancestor),
            }
        }
        Ok(missing)
    }

    fn create_groups(&self, paths: &[NodePath]) -> Result<()> {
        for path in paths {
            log::debug!("creating implicit group {path}");
            self.metadata_codec().write_group_metadata(
                &self.store,
                path,
                &GroupMetadata::default(),
            )?;
        }
        Ok(())
    }

    /// Create an empty group at `path`, and any missing groups above it.
    pub fn create_group(&self, path: &str) -> Result<()> {
        let path = NodePath::new(path)?;
        let missing = self.check_new_node(&path)?;
        self.create_groups(&missing)?;
        log::debug!("creating group {path}");
        self.metadata_codec().write_group_metadata(
            &self.store,
            &path,
            &GroupMetadata::default(),
        )
    }

    /// Create an array at `path`, and any missing groups above it.
    ///
    /// No chunks are written; the new array reads as its fill value.
    pub fn create_array(
        &self,
        path: &str,
        shape: Vec<u64>,
        chunk_shape: Vec<u64>,
        data_type: DataType,
        options: ArrayOptions,
    ) -> Result<Array> {
        let path = NodePath::new(path)?;
        self.registry
            .ensure_registered(self.store.kind(), options.codec())?;
        let metadata = options.into_metadata(self.version(), shape, chunk_shape, data_type)?;
        let missing = self.check_new_node(&path)?;
        self.create_groups(&missing)?;
        log::debug!(
            "creating array {path} with shape {:?}, chunks {:?}, {} codec",
            metadata.shape,
            metadata.chunk_shape,
            metadata.codec.id()
        );
        self.metadata_codec()
            .write_array_metadata(&self.store, &path, &metadata)?;
        Array::new(
            self.store.clone(),
            self.registry.clone(),
            self.version(),
            path,
            metadata,
        )
    }

    /// Open the array at `path`.
    pub fn get_array(&self, path: &str) -> Result<Array> {
        let path = NodePath::new(path)?;
        let metadata = self
            .metadata_codec()
            .read_array_metadata(&self.store, &path)?;
        Array::new(
            self.store.clone(),
            self.registry.clone(),
            self.version(),
            path,
            metadata,
        )
    }

    pub fn get_group(&self, path: &str) -> Result<GroupMetadata> {
        let path = NodePath::new(path)?;
        self.metadata_codec()
            .read_group_metadata(&self.store, &path)
    }

    pub fn node_exists(&self, path: &str) -> Result<bool> {
        Ok(self.node(&NodePath::new(path)?)?.is_some())
    }

    /// Names of the groups and arrays directly under the group at `path`, sorted.
    pub fn children(&self, path: &str) -> Result<Vec<String>> {
        let path = NodePath::new(path)?;
        match self.node(&path)? {
            Some(NodeMetadata::Group(_)) => {}
            _ => return Err(Error::NotFound(format!("group {path}"))),
        }
        let listing = self.store.list_dir(&path.prefix()?)?;
        let mut names = Vec::new();
        for prefix in listing.prefixes() {
            let name = prefix
                .as_str()
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default();
            let Ok(child) = path.child(name) else {
                continue;
            };
            if self.node(&child)?.is_some() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn attributes(&self, path: &str) -> Result<Attributes> {
        let path = NodePath::new(path)?;
        match self.node(&path)? {
            Some(node) => Ok(node.attributes().clone()),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    /// Replace the attributes of the group or array at `path`.
    pub fn set_attributes(&self, path: &str, attributes: Attributes) -> Result<()> {
        let path = NodePath::new(path)?;
        self.metadata_codec()
            .write_attributes(&self.store, &path, attributes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hierarchy(version: ZarrVersion) -> Hierarchy {
        Hierarchy::create_in_store(Storage::memory(), version, CodecRegistry::builtin()).unwrap()
    }

    #[test]
    fn detect_kind() {
        for version in [ZarrVersion::V2, ZarrVersion::V3] {
            let h = hierarchy(version);
            let reopened = Hierarchy::open_store(h.store().clone(), CodecRegistry::new()).unwrap();
            assert_eq!(reopened.kind(), HierarchyKind::from_version(version));
        }
        assert!(matches!(
            Hierarchy::open_store(Storage::memory(), CodecRegistry::new()),
            Err(Error::NotAHierarchy(_))
        ));
    }

    #[test]
    fn implicit_groups_and_children() {
        for version in [ZarrVersion::V2, ZarrVersion::V3] {
            let h = hierarchy(version);
            h.create_array("/blosc/lz4", vec![4], vec![2], DataType::UInt8, ArrayOptions::new())
                .unwrap();
            h.create_group("labels").unwrap();
            h.create_array("raw", vec![4], vec![2], DataType::UInt8, ArrayOptions::new())
                .unwrap()
                .write_all(&[1, 2, 3, 4])
                .unwrap();
            assert!(h.get_group("/blosc").is_ok());
            assert_eq!(h.children("/").unwrap(), vec!["blosc", "labels", "raw"]);
            assert_eq!(h.children("/blosc").unwrap(), vec!["lz4"]);
            assert!(matches!(h.children("/raw"), Err(Error::NotFound(_))));
        }
    }

    #[test]
    fn path_errors() {
        let h = hierarchy(ZarrVersion::V2);
        h.create_array("raw", vec![4], vec![2], DataType::UInt8, ArrayOptions::new())
            .unwrap();
        assert!(matches!(h.create_group("raw"), Err(Error::PathExists(_))));
        assert!(matches!(h.create_group("/"), Err(Error::PathExists(_))));
        assert!(matches!(
            h.create_group("raw/inner/deeper"),
            Err(Error::PathConflict { ancestor, .. }) if ancestor.as_str() == "/raw"
        ));
        assert!(!h.node_exists("raw/inner").unwrap());
        assert!(matches!(h.get_array("gzip"), Err(Error::NotFound(_))));
        assert!(matches!(h.get_array("/"), Err(Error::NotFound(_))));
        assert!(matches!(h.get_group("raw"), Err(Error::NotFound(_))));
    }

    #[test]
    fn unregistered_codec_at_creation() {
        let h = Hierarchy::create_in_store(Storage::memory(), ZarrVersion::V3, CodecRegistry::new())
            .unwrap();
        let options = ArrayOptions::new().with_codec(crate::codec::CodecConfig::Gzip { level: 5 });
        assert!(matches!(
            h.create_array("gzip", vec![4], vec![2], DataType::UInt8, options),
            Err(Error::UnregisteredCodec { .. })
        ));
        assert!(!h.node_exists("gzip").unwrap());
    }

    #[test]
    fn node_attributes() {
        let h = hierarchy(ZarrVersion::V2);
        h.create_array("raw", vec![4], vec![2], DataType::UInt8, ArrayOptions::new())
            .unwrap();
        let mut attributes = Attributes::new();
        attributes.insert("resolution".into(), json!([4.0, 4.0, 40.0]));
        h.set_attributes("raw", attributes.clone()).unwrap();
        assert_eq!(h.attributes("raw").unwrap(), attributes);
        assert_eq!(h.get_array("raw").unwrap().attributes(), &attributes);
        assert!(h.attributes("/").unwrap().is_empty());
        assert!(matches!(
            h.set_attributes("missing", Attributes::new()),
            Err(Error::NotFound(_))
        ));
    }
}
