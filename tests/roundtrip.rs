use std::path::Path;

use zarrs_hier::{
    ArrayOptions, Hierarchy,
    chunk_key_encoding::{ChunkKeySeparator, chunk_key},
    codec::{BloscCompressor, BloscConfiguration, BloscShuffleMode, CodecConfig, CodecRegistry},
    data_type::DataType,
    storage::{Storage, StoreKey},
    zarr_version::ZarrVersion,
};

fn init() {
    env_logger::try_init().ok();
}

/// A pattern with no two adjacent elements equal.
fn image(shape: &[u64]) -> Vec<u8> {
    let n: u64 = shape.iter().product();
    (0..n).map(|i| ((i * 7 + i / 250) % 251) as u8).collect()
}

fn codecs() -> Vec<(&'static str, CodecConfig)> {
    vec![
        ("raw", CodecConfig::Raw),
        ("gzip", CodecConfig::Gzip { level: 5 }),
        ("zlib", CodecConfig::Zlib { level: 5 }),
        (
            "blosc",
            CodecConfig::Blosc(BloscConfiguration::new(
                BloscCompressor::LZ4,
                5,
                BloscShuffleMode::Shuffle,
                1,
            )),
        ),
    ]
}

fn layouts() -> Vec<(ZarrVersion, ChunkKeySeparator)> {
    vec![
        (ZarrVersion::V2, ChunkKeySeparator::Dot),
        (ZarrVersion::V2, ChunkKeySeparator::Slash),
        (ZarrVersion::V3, ChunkKeySeparator::Slash),
    ]
}

fn create(dir: &Path, version: ZarrVersion) -> Hierarchy {
    Hierarchy::create(dir, version, CodecRegistry::builtin()).expect("create hierarchy")
}

#[test]
fn round_trip_every_codec_and_layout() {
    init();
    let shape = vec![250, 250, 1];
    let data = image(&shape);
    for (version, separator) in layouts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let location = dir.path().join("h");
        let h = create(&location, version);
        for (name, codec) in codecs() {
            let options = ArrayOptions::new()
                .with_codec(codec.clone())
                .with_separator(separator);
            h.create_array(name, shape.clone(), vec![100, 100, 1], DataType::UInt8, options)
                .expect("create array")
                .write_all(&data)
                .expect("write");
        }

        let reopened = Hierarchy::open(&location, CodecRegistry::builtin()).expect("open");
        assert_eq!(reopened.version(), version);
        for (name, codec) in codecs() {
            let array = reopened.get_array(name).expect("get array");
            assert_eq!(array.codec(), &codec);
            assert_eq!(array.separator(), separator);
            assert_eq!(array.num_chunks(), 9);
            assert_eq!(array.read_all().expect("read"), data, "{version} {separator} {name}");
        }
    }
}

#[test]
fn round_trip_memory_store_typed() {
    init();
    let h = Hierarchy::create_in_store(
        Storage::memory(),
        ZarrVersion::V3,
        CodecRegistry::builtin(),
    )
    .expect("create");
    let array = h
        .create_array(
            "volume/f64",
            vec![7, 5, 3],
            vec![3, 2, 2],
            DataType::Float64,
            ArrayOptions::new()
                .with_fill_value(f64::NAN)
                .with_codec(CodecConfig::Zlib { level: 9 }),
        )
        .expect("create array");
    let values: Vec<f64> = (0..105).map(|i| f64::from(i) * 0.5 - 10.0).collect();
    array
        .write_elements(&[0, 0, 0], &[7, 5, 3], &values)
        .expect("write");
    let read: Vec<f64> = h
        .get_array("/volume/f64")
        .expect("get")
        .read_elements(&[0, 0, 0], &[7, 5, 3])
        .expect("read");
    assert_eq!(read, values);
}

#[test]
fn ragged_boundary_is_real_data() {
    init();
    let dir = tempfile::tempdir().expect("tempdir");
    let h = create(&dir.path().join("h.zr"), ZarrVersion::V2);
    let shape = vec![250, 250, 1];
    let data = image(&shape);
    let array = h
        .create_array(
            "raw",
            shape.clone(),
            vec![100, 100, 1],
            DataType::UInt8,
            ArrayOptions::new().with_fill_value(255u8),
        )
        .expect("create array");
    array.write_all(&data).expect("write");
    let read = array.read_all().expect("read");
    assert_eq!(read, data);

    let key = array.chunk_key(&[2, 2, 0]).expect("key");
    let tile = h.store().get(&key).expect("get").expect("chunk stored");
    assert_eq!(tile.len(), 100 * 100);
}

#[test]
fn ragged_boundary_tile_is_fill_past_shape() {
    init();
    let h = Hierarchy::create_in_store(
        Storage::memory(),
        ZarrVersion::V2,
        CodecRegistry::builtin(),
    )
    .expect("create");
    let shape = vec![230, 230, 1];
    let data = image(&shape);
    let array = h
        .create_array(
            "raw",
            shape.clone(),
            vec![100, 100, 1],
            DataType::UInt8,
            ArrayOptions::new().with_fill_value(42u8),
        )
        .expect("create array");
    array.write_all(&data).expect("write");
    assert_eq!(array.read_all().expect("read"), data);

    let key = array.chunk_key(&[2, 2, 0]).expect("key");
    let tile = h.store().get(&key).expect("get").expect("chunk stored");
    assert_eq!(tile.len(), 100 * 100);
    for y in 0..100 {
        for x in 0..100 {
            let v = tile[y * 100 + x];
            if y >= 30 || x >= 30 {
                assert_eq!(v, 42, "({y}, {x}) is past the array shape");
            } else {
                assert_eq!(v, data[(200 + y) * 230 + 200 + x]);
            }
        }
    }
}

#[test]
fn never_written_chunks_read_as_fill() {
    init();
    for (version, separator) in layouts() {
        let h = Hierarchy::create_in_store(
            Storage::memory(),
            version,
            CodecRegistry::builtin(),
        )
        .expect("create");
        let array = h
            .create_array(
                "sparse",
                vec![250, 250],
                vec![100, 100],
                DataType::UInt16,
                ArrayOptions::new()
                    .with_fill_value(7u16)
                    .with_separator(separator)
                    .with_codec(CodecConfig::Gzip { level: 1 }),
            )
            .expect("create array");
        let empty: Vec<u16> = array.read_elements(&[0, 0], &[250, 250]).expect("read");
        assert!(empty.iter().all(|v| *v == 7));

        array
            .write_elements(&[0, 0], &[100, 100], &vec![1u16; 100 * 100])
            .expect("write");
        assert!(!h.store().exists(&array.chunk_key(&[1, 1]).expect("key")).expect("exists"));
        let read: Vec<u16> = array.read_elements(&[50, 50], &[100, 100]).expect("read");
        for (i, v) in read.iter().enumerate() {
            let (y, x) = (i / 100, i % 100);
            let expected = if y < 50 && x < 50 { 1 } else { 7 };
            assert_eq!(*v, expected, "({y}, {x})");
        }
    }
}

#[test]
fn codecs_differ_in_size_not_content() {
    init();
    let h = Hierarchy::create_in_store(
        Storage::memory(),
        ZarrVersion::V2,
        CodecRegistry::builtin(),
    )
    .expect("create");
    let shape = vec![200, 200];
    let data: Vec<u8> = (0..40_000u32).map(|i| (i / 200 % 4) as u8).collect();
    let mut sizes = Vec::new();
    for (name, codec) in codecs() {
        let array = h
            .create_array(
                name,
                shape.clone(),
                vec![100, 100],
                DataType::UInt8,
                ArrayOptions::new().with_codec(codec),
            )
            .expect("create array");
        array.write_all(&data).expect("write");
        assert_eq!(array.read_all().expect("read"), data);
        let key = array.chunk_key(&[0, 0]).expect("key");
        sizes.push(h.store().get(&key).expect("get").expect("stored").len());
    }
    assert_eq!(sizes[0], 100 * 100);
    for size in &sizes[1..] {
        assert!(*size < sizes[0]);
    }
    assert_ne!(sizes[1], sizes[2], "gzip and zlib framing differ");
}

#[test]
fn flat_and_nested_keys() {
    init();
    let dir = tempfile::tempdir().expect("tempdir");
    let shape = vec![250, 250, 1];
    let data = image(&shape);
    for (separator, relative) in [
        (ChunkKeySeparator::Dot, "raw/1.0.0"),
        (ChunkKeySeparator::Slash, "raw/1/0/0"),
    ] {
        let location = dir.path().join(format!("{separator:?}.zr"));
        let h = create(&location, ZarrVersion::V2);
        let array = h
            .create_array(
                "raw",
                shape.clone(),
                vec![100, 100, 1],
                DataType::UInt8,
                ArrayOptions::new().with_separator(separator),
            )
            .expect("create array");
        array.write_all(&data).expect("write");
        assert_eq!(array.chunk_key(&[1, 0, 0]).expect("key").as_str(), relative);
        assert!(location.join(relative).is_file());
        assert_eq!(array.read_all().expect("read"), data);
    }
    assert!(dir.path().join("Slash.zr/raw/1/0").is_dir());

    assert_eq!(
        chunk_key(&shape, &[100, 100, 1], &[1, 0, 0], ZarrVersion::V3, ChunkKeySeparator::Dot)
            .expect("key"),
        "c/1/0/0"
    );
}

#[test]
fn partial_region_writes() {
    init();
    let h = Hierarchy::create_in_store(
        Storage::memory(),
        ZarrVersion::V3,
        CodecRegistry::builtin(),
    )
    .expect("create");
    let array = h
        .create_array(
            "raw",
            vec![10, 10],
            vec![4, 4],
            DataType::Int32,
            ArrayOptions::new()
                .with_fill_value(-1i32)
                .with_codec(CodecConfig::Blosc(BloscConfiguration::new(
                    BloscCompressor::Zstd,
                    3,
                    BloscShuffleMode::BitShuffle,
                    0,
                ))),
        )
        .expect("create array");
    array
        .write_elements(&[3, 3], &[5, 2], &[1i32, 2, 3, 4, 5, 6, 7, 8, 9, 10])
        .expect("write");
    array
        .write_elements(&[4, 4], &[1, 1], &[100i32])
        .expect("write");
    let read: Vec<i32> = array.read_elements(&[0, 0], &[10, 10]).expect("read");
    for y in 0..10 {
        for x in 0..10 {
            let expected = match (y, x) {
                (4, 4) => 100,
                (3..8, 3..5) => (y as i32 - 3) * 2 + (x as i32 - 3) + 1,
                _ => -1,
            };
            assert_eq!(read[y * 10 + x], expected, "({y}, {x})");
        }
    }
    assert_eq!(array.num_chunks(), 9);
    let written = h.store().list().expect("list").len();
    // metadata of the root group and the array, plus chunks (0..2, 0..2)
    assert_eq!(written, 2 + 4);
    assert!(h.store().exists(&StoreKey::new("raw/c/1/1").expect("key")).expect("exists"));
}
