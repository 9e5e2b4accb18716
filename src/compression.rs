//! Pluggable compression for the file container payload.
//!
//! The container's meta byte stores the algorithm id used for the encoded
//! stream, so a reader can pick the matching decompressor without any other
//! negotiation. Id 0 is reserved for pass-through.

use crate::error::{PagepackError, Result};
use std::borrow::Cow;

/// Interface for compression algorithms.
///
/// Each compressor is identified by a unique ID stored in the container's
/// meta byte (bits 0-2).
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// Returns the unique ID. 0 is reserved for no compression.
    fn id(&self) -> u8;

    /// Compresses the data.
    ///
    /// Returns a `Cow<[u8]>` which may borrow the input when no
    /// transformation is performed.
    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;

    /// Decompresses the data.
    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;
}

/// A compressor that performs no compression (pass-through).
///
/// This is the default strategy (ID 0).
#[derive(Debug, Clone, Copy)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn id(&self) -> u8 {
        0
    }

    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }

    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }
}

/// A compressor using the LZ4 algorithm.
///
/// Available when the `lz4_flex` feature is enabled. The compressed block
/// carries its decompressed size prepended, the `lz4_flex` framing default.
#[cfg(feature = "lz4_flex")]
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor;

#[cfg(feature = "lz4_flex")]
impl Compressor for Lz4Compressor {
    fn id(&self) -> u8 {
        1
    }

    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Owned(lz4_flex::compress_prepend_size(data)))
    }

    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        lz4_flex::decompress_size_prepended(data)
            .map(Cow::Owned)
            .map_err(|e| PagepackError::Protocol(format!("LZ4 decompression failed: {e}")))
    }
}

/// Resolves a decompressor from a meta-byte algorithm id.
pub(crate) fn for_id(id: u8) -> Result<&'static dyn Compressor> {
    match id {
        0 => Ok(&NoCompression),
        #[cfg(feature = "lz4_flex")]
        1 => Ok(&Lz4Compressor),
        other => Err(PagepackError::Protocol(format!(
            "unknown compression algorithm id {other}"
        ))),
    }
}
