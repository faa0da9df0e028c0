//! The `blosc` codec.
//!
//! It uses the [blosc](https://www.blosc.org/) container format via the bundled c-blosc library.

use std::ffi::{CStr, c_int, c_void};

use blosc_src::{
    BLOSC_MAX_OVERHEAD, blosc_cbuffer_validate, blosc_compress_ctx, blosc_decompress_ctx,
    blosc_get_complib_info,
};
use serde::{Deserialize, Serialize};

use super::{CodecConfig, CodecError, CodecId, CodecPlugin, wrong_configuration};

inventory::submit! {
    CodecPlugin::new(CodecId::Blosc, compress, decompress)
}

/// The compressor used inside blosc blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    BloscLZ,
    LZ4,
    LZ4HC,
    Snappy,
    Zlib,
    Zstd,
}

impl BloscCompressor {
    fn as_cstr(&self) -> &'static CStr {
        match self {
            BloscCompressor::BloscLZ => c"blosclz",
            BloscCompressor::LZ4 => c"lz4",
            BloscCompressor::LZ4HC => c"lz4hc",
            BloscCompressor::Snappy => c"snappy",
            BloscCompressor::Zlib => c"zlib",
            BloscCompressor::Zstd => c"zstd",
        }
    }
}

/// Byte or bit shuffling applied before compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloscShuffleMode {
    NoShuffle = 0,
    Shuffle = 1,
    BitShuffle = 2,
}

impl BloscShuffleMode {
    /// The integer used in Zarr V2 (numcodecs) metadata.
    pub fn as_v2(&self) -> i64 {
        *self as i64
    }

    /// Parse the Zarr V2 (numcodecs) integer; `-1` selects a mode from the element size.
    pub fn from_v2(value: i64, typesize: usize) -> Option<Self> {
        match value {
            -1 if typesize == 1 => Some(Self::BitShuffle),
            -1 => Some(Self::Shuffle),
            0 => Some(Self::NoShuffle),
            1 => Some(Self::Shuffle),
            2 => Some(Self::BitShuffle),
            _ => None,
        }
    }
}

/// Parameters of the `blosc` codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloscConfiguration {
    pub cname: BloscCompressor,
    /// 0 to 9.
    pub clevel: u8,
    pub shuffle: BloscShuffleMode,
    /// Element size in bytes, used for shuffling.
    #[serde(default)]
    pub typesize: usize,
    /// Compression block size; chosen automatically if 0.
    #[serde(default)]
    pub blocksize: usize,
}

impl BloscConfiguration {
    pub fn new(
        cname: BloscCompressor,
        clevel: u8,
        shuffle: BloscShuffleMode,
        typesize: usize,
    ) -> Self {
        Self {
            cname,
            clevel,
            shuffle,
            typesize,
            blocksize: 0,
        }
    }

    pub(super) fn validate(&self) -> Result<(), CodecError> {
        if self.clevel > 9 {
            return Err(CodecError::InvalidConfiguration(format!(
                "blosc clevel {} is not in 0..=9",
                self.clevel
            )));
        }
        if self.shuffle != BloscShuffleMode::NoShuffle && self.typesize == 0 {
            return Err(CodecError::InvalidConfiguration(
                "blosc typesize must be positive if shuffling is enabled".into(),
            ));
        }
        // SAFETY: the name is a static nul-terminated string and null out-pointers are skipped
        let support = unsafe {
            blosc_get_complib_info(
                self.cname.as_cstr().as_ptr(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if support < 0 {
            return Err(CodecError::InvalidConfiguration(format!(
                "blosc compressor {:?} is not supported",
                self.cname
            )));
        }
        Ok(())
    }
}

fn compress(config: &CodecConfig, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
    let CodecConfig::Blosc(config) = config else {
        return Err(wrong_configuration(CodecId::Blosc, config));
    };
    config.validate()?;
    let destsize = decoded.len() + BLOSC_MAX_OVERHEAD as usize;
    let mut dest: Vec<u8> = Vec::with_capacity(destsize);
    // SAFETY: `decoded` is readable for its length, `dest` has capacity `destsize`
    // and the compressor name is a static nul-terminated string
    let written = unsafe {
        blosc_compress_ctx(
            c_int::from(config.clevel),
            config.shuffle as c_int,
            config.typesize.max(1),
            decoded.len(),
            decoded.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            destsize,
            config.cname.as_cstr().as_ptr(),
            config.blocksize,
            1,
        )
    };
    let written = usize::try_from(written)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| CodecError::Blosc(format!("compression failed with code {written}")))?;
    // SAFETY: blosc wrote `written` <= `destsize` bytes
    unsafe { dest.set_len(written) };
    Ok(dest)
}

/// The decoded size recorded in a valid blosc header.
fn validate(encoded: &[u8]) -> Option<usize> {
    let mut nbytes: usize = 0;
    // SAFETY: `encoded` is readable for its length and `nbytes` is a valid out-pointer
    let valid = unsafe {
        blosc_cbuffer_validate(
            encoded.as_ptr().cast::<c_void>(),
            encoded.len(),
            &raw mut nbytes,
        )
    } == 0;
    valid.then_some(nbytes)
}

fn decompress(
    config: &CodecConfig,
    encoded: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, CodecError> {
    if !matches!(config, CodecConfig::Blosc(_)) {
        return Err(wrong_configuration(CodecId::Blosc, config));
    }
    let nbytes = validate(encoded)
        .ok_or_else(|| CodecError::Blosc("encoded value is not a valid blosc buffer".into()))?;
    if nbytes > expected_len {
        return Err(CodecError::Blosc(format!(
            "buffer decodes to {nbytes} bytes, more than the expected {expected_len}"
        )));
    }
    if nbytes == 0 {
        return Ok(Vec::new());
    }
    let mut dest: Vec<u8> = Vec::with_capacity(nbytes);
    // SAFETY: `encoded` holds a validated blosc buffer decoding to `nbytes` bytes,
    // and `dest` has capacity `nbytes`
    let written = unsafe {
        blosc_decompress_ctx(
            encoded.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            nbytes,
            1,
        )
    };
    let written = usize::try_from(written)
        .ok()
        .filter(|n| *n > 0 && *n <= nbytes)
        .ok_or_else(|| CodecError::Blosc(format!("decompression failed with code {written}")))?;
    // SAFETY: blosc wrote `written` <= `nbytes` bytes
    unsafe { dest.set_len(written) };
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_VALID: &str = r#"{
        "cname": "lz4",
        "clevel": 5,
        "shuffle": "shuffle",
        "typesize": 2,
        "blocksize": 0
    }"#;

    #[test]
    fn codec_blosc_configuration() {
        let configuration: BloscConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        assert_eq!(configuration.cname, BloscCompressor::LZ4);
        assert_eq!(configuration.shuffle, BloscShuffleMode::Shuffle);
        assert!(configuration.validate().is_ok());
        assert!(serde_json::from_str::<BloscConfiguration>(r#"{"cname": "lz5", "clevel": 1, "shuffle": "shuffle"}"#).is_err());
    }

    #[test]
    fn codec_blosc_round_trip() {
        let elements: Vec<u16> = (0..512).collect();
        let bytes: Vec<u8> = elements.iter().flat_map(|e| e.to_le_bytes()).collect();
        for (cname, shuffle) in [
            (BloscCompressor::LZ4, BloscShuffleMode::Shuffle),
            (BloscCompressor::Zstd, BloscShuffleMode::BitShuffle),
            (BloscCompressor::BloscLZ, BloscShuffleMode::NoShuffle),
        ] {
            let config = CodecConfig::Blosc(BloscConfiguration::new(cname, 5, shuffle, 2));
            let encoded = compress(&config, &bytes).unwrap();
            assert_eq!(validate(&encoded), Some(bytes.len()));
            let decoded = decompress(&config, &encoded, bytes.len()).unwrap();
            assert_eq!(decoded, bytes);
        }
    }

    #[test]
    fn codec_blosc_invalid_buffer() {
        let config = CodecConfig::Blosc(BloscConfiguration::new(
            BloscCompressor::LZ4,
            5,
            BloscShuffleMode::NoShuffle,
            1,
        ));
        assert!(decompress(&config, b"definitely not blosc", 100).is_err());
    }

    #[test]
    fn shuffle_v2() {
        assert_eq!(BloscShuffleMode::from_v2(-1, 1), Some(BloscShuffleMode::BitShuffle));
        assert_eq!(BloscShuffleMode::from_v2(-1, 4), Some(BloscShuffleMode::Shuffle));
        assert_eq!(BloscShuffleMode::from_v2(0, 4), Some(BloscShuffleMode::NoShuffle));
        assert_eq!(BloscShuffleMode::from_v2(3, 4), None);
        assert_eq!(BloscShuffleMode::BitShuffle.as_v2(), 2);
    }
}
