use std::fmt::Display;

/// A Zarr format generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZarrVersion {
    V2,
    V3,
}

impl ZarrVersion {
    /// The value of the `zarr_format` metadata field.
    pub fn zarr_format(&self) -> u64 {
        match self {
            ZarrVersion::V2 => 2,
            ZarrVersion::V3 => 3,
        }
    }
}

impl Display for ZarrVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.zarr_format())
    }
}
