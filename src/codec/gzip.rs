//! The `gzip` codec.

use std::io::{Read, Write};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};

use super::{CodecConfig, CodecError, CodecId, CodecPlugin, wrong_configuration};

inventory::submit! {
    CodecPlugin::new(CodecId::Gzip, compress, decompress)
}

fn compress(config: &CodecConfig, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
    let CodecConfig::Gzip { level } = config else {
        return Err(wrong_configuration(CodecId::Gzip, config));
    };
    config.validate()?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(*level));
    encoder.write_all(decoded)?;
    Ok(encoder.finish()?)
}

fn decompress(
    config: &CodecConfig,
    encoded: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, CodecError> {
    if !matches!(config, CodecConfig::Gzip { .. }) {
        return Err(wrong_configuration(CodecId::Gzip, config));
    }
    // stop one byte past the expected length
    let mut out = Vec::with_capacity(expected_len);
    GzDecoder::new(encoded)
        .take((expected_len as u64).saturating_add(1))
        .read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_gzip_round_trip() {
        let bytes: Vec<u8> = (0..64).collect();
        let config = CodecConfig::Gzip { level: 1 };
        let encoded = compress(&config, &bytes).unwrap();
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
        assert_eq!(decompress(&config, &encoded, bytes.len()).unwrap(), bytes);
    }

    #[test]
    fn codec_gzip_invalid_level() {
        assert!(compress(&CodecConfig::Gzip { level: 10 }, &[0]).is_err());
    }

    #[test]
    fn codec_gzip_wrong_configuration() {
        assert!(matches!(
            compress(&CodecConfig::Raw, &[0]),
            Err(CodecError::WrongConfiguration { .. })
        ));
    }
}
