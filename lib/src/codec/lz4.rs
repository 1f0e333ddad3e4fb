//! LZ4 back end, built on `lz4_flex`'s frame API so the on-disk bytes are standard LZ4 frames
//! (magic `0x184D2204`), not `lz4_flex`'s own non-standard block format.

use std::io::Read;
use std::io::Write;

use lz4_flex::frame::{FrameDecoder, FrameEncoder, FrameInfo};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::params::Lz4Params;

use super::{FrameCompressor, FrameDecompressor};

/// Scratch chunk size for draining a `FrameDecoder` incrementally.
const CHUNK: usize = 64 * 1024;

pub(crate) struct Lz4Compressor {
    level: u32,
    /// `lz4_flex`'s frame API has no split fast path: its encoder owns the whole frame's
    /// lifetime and only emits the trailer on `finish`. Bytes are staged here across `update`
    /// calls and the whole frame is compressed in one shot at `end_frame`.
    pending: Buffer,
}

impl Lz4Compressor {
    pub(crate) fn new(params: &Lz4Params) -> Self {
        Self {
            level: params.level,
            pending: Buffer::new(),
        }
    }
}

impl FrameCompressor for Lz4Compressor {
    fn update(&mut self, input: &[u8], _out: &mut Vec<u8>) -> Result<()> {
        self.pending.extend_from_slice(input);
        Ok(())
    }

    fn end_frame(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let mut info = FrameInfo::default();
        if self.level > 0 {
            info.content_size = Some(self.pending.len() as u64);
        }
        let mut encoder = FrameEncoder::with_frame_info(info, Vec::new());
        encoder
            .write_all(self.pending.as_slice())
            .map_err(|e| Error::compress_failed(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| Error::compress_failed(e.to_string()))?;
        out.extend_from_slice(&compressed);
        self.pending.clear();
        Ok(())
    }

    fn buffered_bytes(&self) -> usize {
        self.pending.len()
    }
}

pub(crate) struct Lz4Decompressor;

impl Lz4Decompressor {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl FrameDecompressor for Lz4Decompressor {
    fn decompress_into(
        &mut self,
        input: &[u8],
        expected_size: usize,
        limit: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let limit = limit.min(expected_size);
        let mut remaining = input;

        while out.len() < limit && !remaining.is_empty() {
            let before = remaining.len();
            // `lz4_flex`'s `FrameDecoder` carries no explicit "reset" call; a fresh decoder over
            // whatever of `remaining` the last one didn't consume is the equivalent of resetting
            // the codec context once one inner frame's end marker is hit and another follows.
            let mut decoder = FrameDecoder::new(&mut remaining);
            let mut chunk = [0u8; CHUNK];
            loop {
                if out.len() >= limit {
                    break;
                }
                let n = decoder
                    .read(&mut chunk)
                    .map_err(|e| Error::decompress_failed(e.to_string()))?;
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&chunk[..n]);
            }
            drop(decoder);
            if remaining.len() == before {
                break;
            }
        }
        Ok(())
    }
}
