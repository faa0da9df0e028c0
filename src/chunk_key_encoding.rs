//! Mapping chunk grid indices to the chunk's key relative to its array.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Result, chunk::ChunkGrid, zarr_version::ZarrVersion};

/// The character placed between chunk indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChunkKeySeparator {
    /// Flat keys such as `1.2.0`.
    #[default]
    #[serde(rename = ".")]
    Dot,
    /// Nested keys such as `1/2/0`, one directory level per axis.
    #[serde(rename = "/")]
    Slash,
}

impl ChunkKeySeparator {
    pub fn as_char(&self) -> char {
        match self {
            ChunkKeySeparator::Dot => '.',
            ChunkKeySeparator::Slash => '/',
        }
    }
}

impl Display for ChunkKeySeparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The chunk key scheme of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKeyEncoding {
    /// Indices joined by the separator; a zero-dimensional chunk is `0`.
    V2 { separator: ChunkKeySeparator },
    /// `c` followed by each index, all joined by `/`; a zero-dimensional chunk is `c`.
    V3Default,
}

const V3_CHUNK_PREFIX: &str = "c";
const V2_SCALAR_KEY: &str = "0";

impl ChunkKeyEncoding {
    /// The encoding for `version`. Zarr V3 keys are always nested, so `separator` only applies to Zarr V2.
    pub fn new(version: ZarrVersion, separator: ChunkKeySeparator) -> Self {
        match version {
            ZarrVersion::V2 => Self::V2 { separator },
            ZarrVersion::V3 => Self::V3Default,
        }
    }

    pub fn separator(&self) -> ChunkKeySeparator {
        match self {
            ChunkKeyEncoding::V2 { separator } => *separator,
            ChunkKeyEncoding::V3Default => ChunkKeySeparator::Slash,
        }
    }

    pub fn encode(&self, chunk_grid_indices: &[u64]) -> String {
        let indices = chunk_grid_indices.iter().map(u64::to_string);
        match self {
            ChunkKeyEncoding::V2 { separator } => {
                if chunk_grid_indices.is_empty() {
                    V2_SCALAR_KEY.to_string()
                } else {
                    indices
                        .collect::<Vec<_>>()
                        .join(&separator.as_char().to_string())
                }
            }
            ChunkKeyEncoding::V3Default => std::iter::once(V3_CHUNK_PREFIX.to_string())
                .chain(indices)
                .collect::<Vec<_>>()
                .join("/"),
        }
    }
}

/// The key of the chunk at `chunk_grid_indices`, relative to the array.
///
/// Fails if the indices are not within the chunk grid of `shape` and `chunk_shape`.
pub fn chunk_key(
    shape: &[u64],
    chunk_shape: &[u64],
    chunk_grid_indices: &[u64],
    version: ZarrVersion,
    separator: ChunkKeySeparator,
) -> Result<String> {
    let grid = ChunkGrid::new(shape.to_vec(), chunk_shape.to_vec())?;
    grid.check_chunk_indices(chunk_grid_indices)?;
    Ok(ChunkKeyEncoding::new(version, separator).encode(chunk_grid_indices))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::Error;

    const DOT: ChunkKeyEncoding = ChunkKeyEncoding::V2 {
        separator: ChunkKeySeparator::Dot,
    };
    const SLASH: ChunkKeyEncoding = ChunkKeyEncoding::V2 {
        separator: ChunkKeySeparator::Slash,
    };

    #[test]
    fn v2_keys() {
        assert_eq!(DOT.encode(&[1, 2, 0]), "1.2.0");
        assert_eq!(SLASH.encode(&[1, 2, 0]), "1/2/0");
        assert_eq!(DOT.encode(&[1, 0, 0]), "1.0.0");
        assert_eq!(SLASH.encode(&[1, 0, 0]), "1/0/0");
        assert_eq!(DOT.encode(&[]), "0");
        assert_eq!(SLASH.encode(&[]), "0");
    }

    #[test]
    fn v3_keys() {
        let enc = ChunkKeyEncoding::new(ZarrVersion::V3, ChunkKeySeparator::Dot);
        assert_eq!(enc, ChunkKeyEncoding::V3Default);
        assert_eq!(enc.separator(), ChunkKeySeparator::Slash);
        assert_eq!(enc.encode(&[1, 23, 45]), "c/1/23/45");
        assert_eq!(enc.encode(&[]), "c");
    }

    #[test]
    fn keys_are_unique() {
        for enc in [DOT, SLASH, ChunkKeyEncoding::V3Default] {
            for ndim in 0..=4u32 {
                let n_chunks = 11u64.pow(ndim);
                let mut seen = HashSet::new();
                for flat in 0..n_chunks {
                    let mut rem = flat;
                    let indices: Vec<u64> = (0..ndim)
                        .map(|_| {
                            let i = rem % 11;
                            rem /= 11;
                            i
                        })
                        .collect();
                    assert!(seen.insert(enc.encode(&indices)), "{enc:?} {indices:?}");
                }
                assert_eq!(seen.len() as u64, n_chunks);
            }
        }
    }

    #[test]
    fn keys_are_deterministic() {
        let key = || {
            chunk_key(
                &[250, 250, 1],
                &[100, 100, 1],
                &[2, 1, 0],
                ZarrVersion::V2,
                ChunkKeySeparator::Dot,
            )
            .unwrap()
        };
        assert_eq!(key(), "2.1.0");
        assert_eq!(key(), key());
    }

    #[test]
    fn key_outside_grid() {
        let shape = [250, 250, 1];
        let chunk_shape = [100, 100, 1];
        let key = |indices: &[u64]| {
            chunk_key(
                &shape,
                &chunk_shape,
                indices,
                ZarrVersion::V3,
                ChunkKeySeparator::Slash,
            )
        };
        assert_eq!(key(&[2, 2, 0]).unwrap(), "c/2/2/0");
        assert!(matches!(key(&[3, 0, 0]), Err(Error::ShapeMismatch(_))));
        assert!(matches!(key(&[0, 0]), Err(Error::ShapeMismatch(_))));
    }
}
