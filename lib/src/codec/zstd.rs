//! Zstandard back end, built directly on `zstd-safe`'s streaming API, the same way the teacher's
//! `RawEncoder`/`Decoder` drive `CCtx`/`DCtx`.

use zstd_safe::{CCtx, CParameter, DCtx, InBuffer, OutBuffer, zstd_sys::ZSTD_EndDirective};

use crate::error::{Error, Result};
use crate::params::ZstdParams;

use super::{FrameCompressor, FrameDecompressor};

/// Scratch chunk size used to drain `compress_stream2`/`decompress_stream` incrementally.
const CHUNK: usize = 64 * 1024;

pub(crate) struct ZstdCompressor<'a> {
    cctx: CCtx<'a>,
}

impl ZstdCompressor<'_> {
    pub(crate) fn new(params: &ZstdParams) -> Result<Self> {
        let mut cctx = CCtx::create();
        cctx.set_parameter(CParameter::CompressionLevel(params.level))
            .map_err(|e| Error::compress_failed(e.to_string()))?;
        if let Some(strategy) = params.strategy {
            cctx.set_parameter(CParameter::Strategy(strategy))
                .map_err(|e| Error::compress_failed(e.to_string()))?;
        }
        #[cfg(feature = "zstdmt")]
        if params.nb_workers > 0 {
            cctx.set_parameter(CParameter::NbWorkers(params.nb_workers))
                .map_err(|e| Error::compress_failed(e.to_string()))?;
        }
        Ok(Self { cctx })
    }
}

impl FrameCompressor for ZstdCompressor<'_> {
    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let mut in_buf = InBuffer::around(input);
        let mut chunk = vec![0u8; CHUNK];

        while in_buf.pos() < input.len() {
            let mut out_buf = OutBuffer::around(&mut chunk);
            self.cctx
                .compress_stream2(&mut out_buf, &mut in_buf, ZSTD_EndDirective::ZSTD_e_continue)
                .map_err(|e| Error::compress_failed(e.to_string()))?;
            out.extend_from_slice(&chunk[..out_buf.pos()]);
        }
        Ok(())
    }

    fn end_frame(&mut self, out: &mut Vec<u8>) -> Result<()> {
        // Explicit end-of-frame flush: blocks until all previously dispatched data (including any
        // internal worker-pool output when `zstdmt` is enabled) is fully flushed.
        let mut chunk = vec![0u8; CHUNK];
        loop {
            let mut in_buf = InBuffer::around(&[][..]);
            let mut out_buf = OutBuffer::around(&mut chunk);
            let remaining = self
                .cctx
                .compress_stream2(&mut out_buf, &mut in_buf, ZSTD_EndDirective::ZSTD_e_end)
                .map_err(|e| Error::compress_failed(e.to_string()))?;
            out.extend_from_slice(&chunk[..out_buf.pos()]);
            if remaining == 0 {
                break;
            }
        }
        self.cctx
            .reset(zstd_safe::ResetDirective::SessionOnly)
            .map_err(|e| Error::compress_failed(e.to_string()))?;
        Ok(())
    }
}

pub(crate) struct ZstdDecompressor<'a> {
    dctx: DCtx<'a>,
}

impl ZstdDecompressor<'_> {
    pub(crate) fn new() -> Self {
        Self {
            dctx: DCtx::create(),
        }
    }
}

impl FrameDecompressor for ZstdDecompressor<'_> {
    fn decompress_into(
        &mut self,
        input: &[u8],
        expected_size: usize,
        limit: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let limit = limit.min(expected_size);
        let mut in_buf = InBuffer::around(input);

        while out.len() < limit && in_buf.pos() < input.len() {
            let want = (limit - out.len()).min(CHUNK);
            let mut chunk = vec![0u8; want];
            let mut out_buf = OutBuffer::around(&mut chunk);
            let n = self
                .dctx
                .decompress_stream(&mut out_buf, &mut in_buf)
                .map_err(|e| Error::decompress_failed(e.to_string()))?;
            out.extend_from_slice(&chunk[..out_buf.pos()]);
            if n == 0 && in_buf.pos() < input.len() {
                // One codec-level frame ended but more frames follow in this STE group.
                self.dctx
                    .reset(zstd_safe::ResetDirective::SessionOnly)
                    .map_err(|e| Error::decompress_failed(e.to_string()))?;
            }
        }

        self.dctx
            .reset(zstd_safe::ResetDirective::SessionOnly)
            .map_err(|e| Error::decompress_failed(e.to_string()))?;
        Ok(())
    }
}
