//! Fixture hierarchies for cross-implementation tests, and exporting their arrays.
//!
//! [`generate_fixtures`] writes one reference image as `/raw`, `/gzip`, `/zlib` and `/blosc/lz4`
//! into a hierarchy per format version and chunk key layout.
//! [`export_dataset`] reads one of those arrays back and hands it to an [`ExportSink`].

use std::path::{Path, PathBuf};

use crate::{
    Result,
    array::ArrayOptions,
    chunk_key_encoding::ChunkKeySeparator,
    codec::{BloscCompressor, BloscConfiguration, BloscShuffleMode, CodecConfig, CodecRegistry},
    data_type::DataType,
    hierarchy::Hierarchy,
    zarr_version::ZarrVersion,
};

/// Stem of the generated hierarchy names.
pub const FIXTURE_NAME: &str = "zarrs_hier";

/// The suffix marking a Zarr V3 container.
pub const V3_SUFFIX: &str = ".zr3";

/// The suffix of a Zarr V2 fixture directory.
pub const V2_SUFFIX: &str = ".zr";

/// Chunk shape of every fixture array.
pub const FIXTURE_CHUNK_SHAPE: [u64; 3] = [100, 100, 1];

/// An 8-bit image, C order, usually shaped `[height, width, channels]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub pixels: Vec<u8>,
    pub shape: Vec<u64>,
}

/// Supplies the image written into every fixture array.
pub trait ImageSource {
    fn load(&self) -> Result<ImageBuffer>;
}

/// A deterministic RGB-style gradient, for when no reference image is at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticImage {
    pub height: u64,
    pub width: u64,
    pub channels: u64,
}

impl ImageSource for SyntheticImage {
    fn load(&self) -> Result<ImageBuffer> {
        let mut pixels = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                for c in 0..self.channels {
                    pixels.push(((x + 2 * y + 85 * c) % 256) as u8);
                }
            }
        }
        Ok(ImageBuffer {
            pixels,
            shape: vec![self.height, self.width, self.channels],
        })
    }
}

/// Receives an array read out of a hierarchy.
pub trait ExportSink {
    /// `bytes` are the little-endian C-order elements of an array of `shape` and `data_type`.
    fn export(&mut self, name: &str, bytes: &[u8], shape: &[u64], data_type: DataType)
    -> Result<()>;
}

/// Writes each exported array to `<directory>/<name>.npy`.
#[cfg(feature = "npy")]
#[derive(Debug, Clone)]
pub struct NpyExportSink {
    directory: PathBuf,
}

#[cfg(feature = "npy")]
impl NpyExportSink {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.npy"))
    }

    fn write<T>(path: &Path, bytes: &[u8], shape: &[u64]) -> Result<()>
    where
        T: crate::data_type::Element + npyz::AutoSerialize,
    {
        use npyz::WriterBuilder;

        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        let mut writer = npyz::WriteOptions::<T>::new()
            .default_dtype()
            .shape(shape)
            .writer(file)
            .begin_nd()?;
        writer.extend(T::from_bytes(bytes))?;
        writer.finish()?;
        Ok(())
    }
}

#[cfg(feature = "npy")]
impl ExportSink for NpyExportSink {
    fn export(
        &mut self,
        name: &str,
        bytes: &[u8],
        shape: &[u64],
        data_type: DataType,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.path(name);
        log::debug!("exporting {data_type} array of shape {shape:?} to {}", path.display());
        match data_type {
            DataType::Bool => Self::write::<bool>(&path, bytes, shape),
            DataType::Int8 => Self::write::<i8>(&path, bytes, shape),
            DataType::Int16 => Self::write::<i16>(&path, bytes, shape),
            DataType::Int32 => Self::write::<i32>(&path, bytes, shape),
            DataType::Int64 => Self::write::<i64>(&path, bytes, shape),
            DataType::UInt8 => Self::write::<u8>(&path, bytes, shape),
            DataType::UInt16 => Self::write::<u16>(&path, bytes, shape),
            DataType::UInt32 => Self::write::<u32>(&path, bytes, shape),
            DataType::UInt64 => Self::write::<u64>(&path, bytes, shape),
            DataType::Float32 => Self::write::<f32>(&path, bytes, shape),
            DataType::Float64 => Self::write::<f64>(&path, bytes, shape),
        }
    }
}

/// The codecs of the fixture arrays, by array path.
pub fn fixture_codecs() -> Vec<(&'static str, CodecConfig)> {
    vec![
        ("/raw", CodecConfig::Raw),
        ("/gzip", CodecConfig::Gzip { level: 1 }),
        ("/zlib", CodecConfig::Zlib { level: 1 }),
        (
            "/blosc/lz4",
            CodecConfig::Blosc(BloscConfiguration::new(
                BloscCompressor::LZ4,
                5,
                BloscShuffleMode::Shuffle,
                1,
            )),
        ),
    ]
}

/// Write the fixture hierarchies under `data_dir`, replacing any previous ones.
///
/// Returns the hierarchy locations: V2 then V3, each flat then nested.
pub fn generate_fixtures(
    data_dir: impl AsRef<Path>,
    image: &dyn ImageSource,
    registry: &CodecRegistry,
) -> Result<Vec<PathBuf>> {
    let data_dir = data_dir.as_ref();
    let image = image.load()?;
    let mut locations = Vec::new();
    for (version, suffix) in [(ZarrVersion::V2, V2_SUFFIX), (ZarrVersion::V3, V3_SUFFIX)] {
        for (layout, separator) in [
            ("flat", ChunkKeySeparator::Dot),
            ("nested", ChunkKeySeparator::Slash),
        ] {
            let location = data_dir.join(format!("{FIXTURE_NAME}_{layout}{suffix}"));
            if location.exists() {
                std::fs::remove_dir_all(&location)?;
            }
            let hierarchy = Hierarchy::create(&location, version, registry.clone())?;
            for (path, codec) in fixture_codecs() {
                let options = ArrayOptions::new()
                    .with_fill_value(0u8)
                    .with_codec(codec)
                    .with_separator(separator);
                hierarchy
                    .create_array(
                        path,
                        image.shape.clone(),
                        FIXTURE_CHUNK_SHAPE.to_vec(),
                        DataType::UInt8,
                        options,
                    )?
                    .write_all(&image.pixels)?;
            }
            log::debug!("wrote fixtures to {}", location.display());
            locations.push(location);
        }
    }
    Ok(locations)
}

/// Read `dataset` from the hierarchy at `hierarchy_path` and export it under the name `a`.
///
/// A path ending in [`V3_SUFFIX`] is a V3 container holding `/<dataset>`;
/// any other path is a V2 directory whose `<dataset>` subdirectory is itself
/// a hierarchy rooted at the array.
pub fn export_dataset(
    hierarchy_path: impl AsRef<Path>,
    dataset: &str,
    registry: &CodecRegistry,
    sink: &mut dyn ExportSink,
) -> Result<()> {
    let hierarchy_path = hierarchy_path.as_ref();
    let is_v3 = hierarchy_path
        .to_str()
        .is_some_and(|p| p.trim_end_matches('/').ends_with(V3_SUFFIX));
    let (location, array_path) = if is_v3 {
        (hierarchy_path.to_path_buf(), format!("/{dataset}"))
    } else {
        (hierarchy_path.join(dataset), String::from("/"))
    };
    let hierarchy = Hierarchy::open(&location, registry.clone())?;
    let array = hierarchy.get_array(&array_path)?;
    let bytes = array.read_all()?;
    sink.export("a", &bytes, array.shape(), array.data_type())
}
