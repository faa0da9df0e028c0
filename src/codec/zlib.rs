//! The `zlib` codec.

use std::io::{Read, Write};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use super::{CodecConfig, CodecError, CodecId, CodecPlugin, wrong_configuration};

inventory::submit! {
    CodecPlugin::new(CodecId::Zlib, compress, decompress)
}

fn compress(config: &CodecConfig, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
    let CodecConfig::Zlib { level } = config else {
        return Err(wrong_configuration(CodecId::Zlib, config));
    };
    config.validate()?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(*level));
    encoder.write_all(decoded)?;
    Ok(encoder.finish()?)
}

fn decompress(
    config: &CodecConfig,
    encoded: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, CodecError> {
    if !matches!(config, CodecConfig::Zlib { .. }) {
        return Err(wrong_configuration(CodecId::Zlib, config));
    }
    // stop one byte past the expected length
    let mut out = Vec::with_capacity(expected_len);
    ZlibDecoder::new(encoded)
        .take((expected_len as u64).saturating_add(1))
        .read_to_end(&mut out)?;
    Ok(out)
}
