use std::path::Path;

use npyz::NpyFile;
use zarrs_hier::{
    Hierarchy,
    codec::CodecRegistry,
    data_type::DataType,
    fixtures::{
        ExportSink, FIXTURE_NAME, ImageSource, NpyExportSink, SyntheticImage, export_dataset,
        fixture_codecs, generate_fixtures,
    },
};

const IMAGE: SyntheticImage = SyntheticImage {
    height: 230,
    width: 250,
    channels: 3,
};

fn init() {
    env_logger::try_init().ok();
}

/// Get shape and values from an exported npy file.
fn read_npy(path: &Path) -> (Vec<u64>, Vec<u8>) {
    let bytes = std::fs::read(path).expect("read npy");
    let f = NpyFile::new(bytes.as_slice()).expect("should be valid");
    let shape = f.shape().to_vec();
    let data = f.into_vec::<u8>().expect("should be able to read data to vec");
    (shape, data)
}

#[derive(Default)]
struct Collect {
    exported: Vec<(String, Vec<u8>, Vec<u64>, DataType)>,
}

impl ExportSink for Collect {
    fn export(
        &mut self,
        name: &str,
        bytes: &[u8],
        shape: &[u64],
        data_type: DataType,
    ) -> zarrs_hier::Result<()> {
        self.exported
            .push((name.to_string(), bytes.to_vec(), shape.to_vec(), data_type));
        Ok(())
    }
}

#[test]
fn generate_all_fixtures() {
    init();
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = CodecRegistry::builtin();
    let image = IMAGE.load().expect("image");
    let locations = generate_fixtures(dir.path(), &IMAGE, &registry).expect("generate");
    let names: Vec<String> = locations
        .iter()
        .map(|l| l.file_name().expect("name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        [
            format!("{FIXTURE_NAME}_flat.zr"),
            format!("{FIXTURE_NAME}_nested.zr"),
            format!("{FIXTURE_NAME}_flat.zr3"),
            format!("{FIXTURE_NAME}_nested.zr3"),
        ]
    );
    for location in &locations {
        let h = Hierarchy::open(location, registry.clone()).expect("open");
        for (path, codec) in fixture_codecs() {
            let array = h.get_array(path).expect("get array");
            assert_eq!(array.codec(), &codec);
            assert_eq!(array.shape(), image.shape.as_slice());
            assert_eq!(array.read_all().expect("read"), image.pixels);
        }
    }
    assert!(dir.path().join(format!("{FIXTURE_NAME}_flat.zr/gzip/1.2.0")).is_file());
    assert!(dir.path().join(format!("{FIXTURE_NAME}_nested.zr/gzip/1/2/0")).is_file());
    assert!(dir.path().join(format!("{FIXTURE_NAME}_flat.zr3/gzip/c/1/2/0")).is_file());

    // regenerating replaces the previous fixtures
    generate_fixtures(dir.path(), &IMAGE, &registry).expect("regenerate");
}

#[test]
fn export_v2_and_v3() {
    init();
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = CodecRegistry::builtin();
    let image = IMAGE.load().expect("image");
    generate_fixtures(dir.path(), &IMAGE, &registry).expect("generate");

    for (hierarchy, dataset) in [
        (format!("{FIXTURE_NAME}_flat.zr"), "raw"),
        (format!("{FIXTURE_NAME}_nested.zr"), "blosc/lz4"),
        (format!("{FIXTURE_NAME}_flat.zr3"), "gzip"),
        (format!("{FIXTURE_NAME}_nested.zr3"), "blosc/lz4"),
    ] {
        let mut sink = Collect::default();
        export_dataset(dir.path().join(&hierarchy), dataset, &registry, &mut sink)
            .expect("export");
        let [(name, bytes, shape, data_type)] = sink.exported.as_slice() else {
            panic!("expected one export from {hierarchy}");
        };
        assert_eq!(name, "a");
        assert_eq!(bytes, &image.pixels);
        assert_eq!(shape, &image.shape);
        assert_eq!(*data_type, DataType::UInt8);
    }
}

#[test]
fn export_npy() {
    init();
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = CodecRegistry::builtin();
    let image = IMAGE.load().expect("image");
    generate_fixtures(dir.path(), &IMAGE, &registry).expect("generate");

    let out = dir.path().join("out");
    let mut sink = NpyExportSink::new(&out);
    export_dataset(
        dir.path().join(format!("{FIXTURE_NAME}_nested.zr3")),
        "zlib",
        &registry,
        &mut sink,
    )
    .expect("export");
    let (shape, data) = read_npy(&sink.path("a"));
    assert_eq!(shape, image.shape);
    assert_eq!(data, image.pixels);
}

#[test]
fn export_missing_dataset() {
    init();
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = CodecRegistry::builtin();
    let mut sink = Collect::default();
    let err = export_dataset(dir.path().join("missing.zr"), "raw", &registry, &mut sink)
        .expect_err("nothing to export");
    assert!(matches!(err, zarrs_hier::Error::NotFound(_)), "{err}");
    assert!(sink.exported.is_empty());
}
