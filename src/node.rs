use std::fmt::Display;

use crate::{
    Error, Result,
    storage::{StoreKey, StorePrefix},
};

/// The absolute path of a group or array within a hierarchy.
///
/// `"raw"`, `"/raw"` and `"/raw/"` all name the same node; `""` and `"/"` name the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        Self("/".into())
    }

    pub fn new(path: &str) -> Result<Self> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let valid = trimmed.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment != "zarr.json"
                && !segment.starts_with(".z")
        });
        if !valid {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(Self(format!("/{trimmed}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// The last segment; empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(_, n)| n)
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        let (parent, _) = self.0.rsplit_once('/')?;
        if parent.is_empty() {
            Some(Self::root())
        } else {
            Some(Self(parent.to_string()))
        }
    }

    /// Strict ancestors, nearest to the root first.
    pub fn ancestors(&self) -> Vec<NodePath> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(p) = current {
            current = p.parent();
            out.push(p);
        }
        out.reverse();
        out
    }

    pub fn child(&self, name: &str) -> Result<NodePath> {
        Self::new(&format!("{}/{name}", self.0))
    }

    /// The store prefix under which this node's documents and chunks live.
    pub fn prefix(&self) -> Result<StorePrefix> {
        if self.is_root() {
            Ok(StorePrefix::root())
        } else {
            Ok(StorePrefix::new(format!("{}/", &self.0[1..]))?)
        }
    }

    /// The key of `name` (a metadata document or chunk key) under this node.
    pub fn key(&self, name: &str) -> Result<StoreKey> {
        Ok(StoreKey::new(format!("{}{name}", self.prefix()?.as_str()))?)
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for NodePath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}
