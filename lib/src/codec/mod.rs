//! Back-end codecs: Zstandard-family and LZ4-family frame compression.
//!
//! A codec here works in genuine codec-level frames, not whole STE groups: the writer calls
//! [`FrameCompressor::update`] as bytes arrive and [`FrameCompressor::end_frame`] once
//! `min_frame_size` has been reached, and several of those frames are concatenated on disk under
//! one seek-table entry. The reader mirrors this with [`FrameDecompressor::decompress_into`],
//! which may have to walk more than one concatenated codec frame to satisfy one STE's worth of
//! decompression.

pub(crate) mod lz4;
pub(crate) mod zstd;

use crate::error::Result;

/// The standard Zstandard frame magic number.
pub(crate) const ZSTD_FRAME_MAGIC: u32 = 0xFD2F_B528;
/// The standard LZ4 frame magic number.
pub(crate) const LZ4_FRAME_MAGIC: u32 = 0x184D_2204;

/// Which back-end codec a seekable archive's frames are encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Zstd,
    Lz4,
}

impl Codec {
    /// Detects the codec from the leading 4 bytes of a compressed file, which must be the magic
    /// number of the first codec-level frame.
    pub(crate) fn detect(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(crate::error::Error::unexpected_eof());
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic == ZSTD_FRAME_MAGIC {
            Ok(Self::Zstd)
        } else if magic == LZ4_FRAME_MAGIC {
            Ok(Self::Lz4)
        } else {
            Err(crate::error::Error::unrecognized_format())
        }
    }
}

/// Drives one codec-level frame's compression, possibly across several calls.
pub(crate) trait FrameCompressor {
    /// Feeds `input` into the currently open frame, appending whatever compressed bytes that
    /// produces to `out`. Does not close the frame.
    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()>;

    /// Closes the open frame, appending any remaining compressed bytes (including the frame
    /// trailer) to `out`. The next `update` call starts a fresh frame.
    fn end_frame(&mut self, out: &mut Vec<u8>) -> Result<()>;

    /// Bytes already given to `update` but not yet reflected in compressed output, because this
    /// codec can't stream below a whole-frame granularity. Zero for a codec that emits as it goes.
    fn buffered_bytes(&self) -> usize {
        0
    }
}

/// Decompresses one or more concatenated codec-level frames back to uncompressed bytes.
pub(crate) trait FrameDecompressor {
    /// Decompresses `input` into `out`, stopping once `out.len()` reaches `limit` or the whole
    /// `expected_size` bytes have been produced, whichever comes first. `input` may hold several
    /// concatenated codec frames grouped under one STE; if the first frame alone doesn't reach
    /// `limit`, decoding continues into the next one.
    fn decompress_into(
        &mut self,
        input: &[u8],
        expected_size: usize,
        limit: usize,
        out: &mut Vec<u8>,
    ) -> Result<()>;
}
