use std::path::Path;
use std::sync::Arc;

use zarrs::filesystem::FilesystemStore;
use zarrs_hier::{
    codec::CodecRegistry,
    fixtures::{FIXTURE_NAME, ImageSource, SyntheticImage, fixture_codecs, generate_fixtures},
};

const IMAGE: SyntheticImage = SyntheticImage {
    height: 230,
    width: 250,
    channels: 3,
};

/// Get shape and values of an array through the zarrs reader.
fn read_with_zarrs(location: &Path, path: &str) -> (Vec<u64>, Vec<u8>) {
    let store = Arc::new(FilesystemStore::new(location).expect("should be able to create store"));
    let array = zarrs::array::Array::open(store, path).expect("open array");
    let shape = array.shape().to_vec();
    let data: Vec<u8> = array
        .retrieve_array_subset(&array.subset_all())
        .expect("retrieve all data");
    (shape, data)
}

#[test]
fn v2_fixtures_read_by_zarrs() {
    env_logger::try_init().ok();
    let dir = tempfile::tempdir().expect("tempdir");
    let image = IMAGE.load().expect("image");
    generate_fixtures(dir.path(), &IMAGE, &CodecRegistry::builtin()).expect("generate");

    for hierarchy in [format!("{FIXTURE_NAME}_flat.zr"), format!("{FIXTURE_NAME}_nested.zr")] {
        let location = dir.path().join(&hierarchy);
        for (path, _) in fixture_codecs() {
            let (shape, data) = read_with_zarrs(&location, path);
            assert_eq!(shape, image.shape, "{hierarchy}{path}");
            assert!(data == image.pixels, "{hierarchy}{path}: pixels differ");
        }
    }
}
