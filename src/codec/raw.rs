//! The `raw` codec: chunks are stored uncompressed.

use super::{CodecConfig, CodecError, CodecId, CodecPlugin, wrong_configuration};

inventory::submit! {
    CodecPlugin::new(CodecId::Raw, compress, decompress)
}

pub(super) fn compress(config: &CodecConfig, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
    if *config != CodecConfig::Raw {
        return Err(wrong_configuration(CodecId::Raw, config));
    }
    Ok(decoded.to_vec())
}

pub(super) fn decompress(
    config: &CodecConfig,
    encoded: &[u8],
    _expected_len: usize,
) -> Result<Vec<u8>, CodecError> {
    if *config != CodecConfig::Raw {
        return Err(wrong_configuration(CodecId::Raw, config));
    }
    Ok(encoded.to_vec())
}
