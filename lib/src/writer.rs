//! Sequential writer: emits codec-level frames at `min_frame_size` granularity and groups
//! `frames_per_ste` of them into one seek-table entry (STE), appending the seek table to the
//! output when closed.
//!
//! A frame closes once its accumulated uncompressed bytes reach `min_frame_size`; every
//! `frames_per_ste` frames closed (or sooner, if doing so would push a group's uncompressed size
//! past [`crate::SEEKABLE_MAX_FRAME_SIZE`]), the group's combined sizes are logged as one STE.
//! `close` force-flushes a partial trailing frame and a partial trailing STE group, so no data is
//! ever dropped regardless of where the last `write` call left the counters.

use xxhash_rust::xxh64::Xxh64;

use crate::codec::lz4::Lz4Compressor;
use crate::codec::zstd::ZstdCompressor;
use crate::codec::FrameCompressor;
use crate::error::{Error, Result};
use crate::io::WriteFile;
use crate::params::{CompressionParams, Lz4Params, ZstdParams};
use crate::seek_table::{Format, SeekTable};
use crate::{DEFAULT_FRAMES_PER_STE, DEFAULT_MIN_FRAME_SIZE, SEEKABLE_MAX_FRAME_SIZE};

/// Configuration for an [`EncodeOptions`]-built [`Writer`].
pub struct EncodeOptions {
    params: CompressionParams,
    min_frame_size: u32,
    frames_per_ste: u32,
    checksum_flag: bool,
    format: Format,
}

impl EncodeOptions {
    /// Configures a Zstandard-family writer.
    pub fn zstd(params: ZstdParams) -> Self {
        Self::with_params(CompressionParams::Zstd(params))
    }

    /// Configures an LZ4-family writer.
    pub fn lz4(params: Lz4Params) -> Self {
        Self::with_params(CompressionParams::Lz4(params))
    }

    fn with_params(params: CompressionParams) -> Self {
        Self {
            params,
            min_frame_size: DEFAULT_MIN_FRAME_SIZE,
            frames_per_ste: DEFAULT_FRAMES_PER_STE,
            checksum_flag: false,
            format: Format::Foot,
        }
    }

    /// Sets the minimum number of uncompressed bytes accumulated before a codec-level frame is
    /// closed.
    pub fn min_frame_size(mut self, n: u32) -> Self {
        self.min_frame_size = n.max(1);
        self
    }

    /// Sets the number of codec-level frames grouped under one seek-table entry.
    pub fn frames_per_ste(mut self, n: u32) -> Self {
        self.frames_per_ste = n.max(1);
        self
    }

    /// Whether to compute and store a 32 bit XXH64-derived checksum per STE.
    pub fn checksum_flag(mut self, flag: bool) -> Self {
        self.checksum_flag = flag;
        self
    }

    /// Sets the seek-table serialization format. Defaults to [`Format::Foot`], the layout
    /// expected when the seek table is appended directly to the compressed archive.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Builds a [`Writer`] over `write_file`.
    ///
    /// # Errors
    ///
    /// Fails if the back-end codec's compression context cannot be created.
    pub fn into_writer<W: WriteFile>(self, write_file: W) -> Result<Writer<W>> {
        let compressor: Box<dyn FrameCompressor> = match &self.params {
            CompressionParams::Zstd(p) => Box::new(ZstdCompressor::new(p)?),
            CompressionParams::Lz4(p) => Box::new(Lz4Compressor::new(p)),
        };

        Ok(Writer {
            write_file,
            compressor,
            checksum_flag: self.checksum_flag,
            format: self.format,
            min_frame_size: u64::from(self.min_frame_size),
            frames_per_ste: self.frames_per_ste,
            frame_uc: 0,
            frame_cm: 0,
            ste_frames: 0,
            ste_uc: 0,
            ste_cm: 0,
            ste_hasher: self.checksum_flag.then(|| Xxh64::new(0)),
            total_frames: 0,
            total_cm: 0,
            seek_table: SeekTable::new(self.checksum_flag),
            closed: false,
        })
    }
}

/// Statistics about a [`Writer`]'s progress, useful for logging or metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterStats {
    /// The on-disk size the seek table would occupy if serialized right now.
    pub seek_table_size: usize,
    /// The in-memory footprint of the seek table built so far.
    pub seek_table_memory: usize,
    /// The number of genuine codec-level frames emitted so far (including one still open).
    pub frames: u32,
    /// Total compressed bytes written for frame data, excluding the seek table.
    pub compressed_size: u64,
    /// Bytes staged inside the codec for the still-open frame but not yet reflected in
    /// `compressed_size` (always `0` for a codec that streams as it goes).
    pub buffer_size: usize,
}

/// Accepts sequential writes and produces a seekable compressed archive.
pub struct Writer<W: WriteFile> {
    write_file: W,
    compressor: Box<dyn FrameCompressor>,
    checksum_flag: bool,
    format: Format,
    min_frame_size: u64,
    frames_per_ste: u32,

    /// Uncompressed bytes fed to the codec for the currently open frame.
    frame_uc: u64,
    /// Compressed bytes emitted so far for the currently open frame.
    frame_cm: u64,
    /// Frames closed so far in the currently open STE group.
    ste_frames: u32,
    /// Uncompressed bytes spanned by the currently open STE group.
    ste_uc: u64,
    /// Compressed bytes spanned by the currently open STE group.
    ste_cm: u64,
    /// Incrementally hashes the open STE group's uncompressed bytes across its constituent
    /// frames; `None` when checksums are disabled.
    ste_hasher: Option<Xxh64>,

    total_frames: u32,
    total_cm: u64,
    seek_table: SeekTable,
    closed: bool,
}

impl<W: WriteFile> Writer<W> {
    /// Writes `buf`, splitting it into codec-level frames at `min_frame_size` boundaries and
    /// grouping closed frames into STEs as the configured counts are reached.
    ///
    /// # Errors
    ///
    /// Fails if the writer is already closed, or if the codec or underlying sink fails.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::closed());
        }

        let mut remaining = buf;
        while !remaining.is_empty() {
            let room = (self.min_frame_size - self.frame_uc) as usize;
            let take = room.min(remaining.len());
            let (chunk, rest) = remaining.split_at(take);

            let mut compressed = Vec::new();
            self.compressor.update(chunk, &mut compressed)?;
            self.emit(&compressed)?;
            self.frame_cm += compressed.len() as u64;
            self.frame_uc += chunk.len() as u64;
            if let Some(hasher) = &mut self.ste_hasher {
                hasher.update(chunk);
            }

            if self.frame_uc >= self.min_frame_size {
                self.end_current_frame()?;
            }
            remaining = rest;
        }

        Ok(buf.len())
    }

    /// Closes the writer: flushes a partial open frame and a partial open STE group, if any, then
    /// appends the seek table.
    ///
    /// This always runs to completion, continuing through cleanup even after the first error, and
    /// returns that first error if one occurred.
    ///
    /// # Errors
    ///
    /// Fails if flushing the last frame/STE or writing the seek table fails.
    pub fn close(mut self) -> Result<WriterStats> {
        let mut first_err = None;

        if self.frame_uc > 0 {
            if let Err(e) = self.end_current_frame() {
                first_err.get_or_insert(e);
            }
        }
        if self.ste_frames > 0 {
            if let Err(e) = self.flush_ste() {
                first_err.get_or_insert(e);
            }
        }

        let mut ser = self.seek_table.clone().into_format_serializer(self.format);
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = ser.write_into(&mut buf);
            if n == 0 {
                break;
            }
            if let Err(e) = self.write_file.write_all(&buf[..n]) {
                first_err.get_or_insert(e);
                break;
            }
        }

        self.closed = true;
        let stats = self.stats();
        log::debug!(
            "writer closed: {} stes, {} frames, {} bytes compressed",
            self.seek_table.num_ste(),
            stats.frames,
            stats.compressed_size
        );

        match first_err {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// A snapshot of this writer's progress so far.
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            seek_table_size: self.seek_table.encoded_size(),
            seek_table_memory: self.seek_table.memory_usage(),
            frames: self.total_frames + u32::from(self.frame_uc > 0),
            compressed_size: self.total_cm,
            buffer_size: self.compressor.buffered_bytes(),
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.write_file.write_all(bytes)?;
        self.total_cm += bytes.len() as u64;
        Ok(())
    }

    /// Closes the currently open frame, after which `frame_uc == 0 && frame_cm == 0`.
    fn end_current_frame(&mut self) -> Result<()> {
        let mut compressed = Vec::new();
        self.compressor.end_frame(&mut compressed)?;
        self.emit(&compressed)?;
        self.frame_cm += compressed.len() as u64;

        self.total_frames += 1;
        self.ste_frames += 1;
        self.ste_uc += self.frame_uc;
        self.ste_cm += self.frame_cm;
        self.frame_uc = 0;
        self.frame_cm = 0;

        if self.ste_frames >= self.frames_per_ste || self.ste_uc >= SEEKABLE_MAX_FRAME_SIZE as u64
        {
            self.flush_ste()?;
        }
        Ok(())
    }

    fn flush_ste(&mut self) -> Result<()> {
        let checksum = self.ste_hasher.take().map(|hasher| hasher.digest() as u32);
        self.seek_table
            .log_frame(self.ste_cm as u32, self.ste_uc as u32, checksum)?;
        log::debug!(
            "flushed ste {}: {} frames, {} bytes uncompressed -> {} bytes compressed",
            self.seek_table.num_ste() - 1,
            self.ste_frames,
            self.ste_uc,
            self.ste_cm
        );

        self.ste_frames = 0;
        self.ste_uc = 0;
        self.ste_cm = 0;
        if self.checksum_flag {
            self.ste_hasher = Some(Xxh64::new(0));
        }
        Ok(())
    }
}
