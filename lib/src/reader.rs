//! Random-access reader.
//!
//! A single [`std::sync::Mutex`] guards both the frame cache and a persistent codec-decompression
//! context, reflecting the spec's single per-reader lock governing cache access and
//! decompression-context use. A cache hit still needs the lock to promote its LRU position, so a
//! `pread` locks, checks the cache, and releases before decompressing a miss without holding the
//! lock; it then relocks to re-check and insert, so two concurrent misses for the same STE don't
//! race to decompress it twice. With the cache disabled, `pread` instead locks for the whole
//! operation and streams the covering frame(s) through the shared decompressor, discarding
//! whatever prefix it doesn't need.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::cache::FrameCache;
use crate::codec::lz4::Lz4Decompressor;
use crate::codec::zstd::ZstdDecompressor;
use crate::codec::{Codec, FrameDecompressor};
use crate::error::{Error, Result};
use crate::io::ReadFile;
use crate::seek_table::SeekTable;
use crate::SEEK_TABLE_INTEGRITY_SIZE;

/// The default frame cache size: 64 decompressed STE payloads.
const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Configuration for a [`DecodeOptions`]-built [`Reader`].
pub struct DecodeOptions {
    cache_capacity: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Sets the frame cache's capacity, as a count of decompressed STE payloads. `0` disables the
    /// cache: every read decompresses its STE, even if another call just fetched it.
    pub fn cache_capacity(mut self, entries: usize) -> Self {
        self.cache_capacity = entries;
        self
    }

    /// Builds a [`Reader`] over `read_file`, reading and parsing the trailing seek table and
    /// detecting the back-end codec from the leading frame's magic number.
    ///
    /// # Errors
    ///
    /// Fails if the file is too short to hold a seek table, the seek table fails integrity
    /// checks, or the leading bytes don't match a supported codec's magic number.
    pub fn into_reader<R: ReadFile>(self, read_file: R) -> Result<Reader<R>> {
        let file_size = read_file.file_size()?;
        if file_size < SEEK_TABLE_INTEGRITY_SIZE as u64 {
            return Err(Error::unexpected_eof());
        }

        let mut integrity = [0u8; SEEK_TABLE_INTEGRITY_SIZE];
        read_file.pread(&mut integrity, file_size - SEEK_TABLE_INTEGRITY_SIZE as u64)?;

        // Re-derive the seek table's total size from the integrity footer alone, then fetch
        // exactly that many trailing bytes in one shot.
        let num_ste = u32::from_le_bytes([integrity[0], integrity[1], integrity[2], integrity[3]]);
        let with_checksum = (integrity[4] & (1 << 7)) > 0;
        let size_per_ste = if with_checksum { 12 } else { 8 };
        let seek_table_size = num_ste as u64 * size_per_ste as u64
            + crate::SKIPPABLE_HEADER_SIZE as u64
            + SEEK_TABLE_INTEGRITY_SIZE as u64;
        if seek_table_size > file_size {
            return Err(Error::length_mismatch());
        }

        let mut tail = vec![0u8; seek_table_size as usize];
        read_file.pread(&mut tail, file_size - seek_table_size)?;
        let seek_table = SeekTable::parse_foot(&tail)?;

        // An empty archive has no codec frames at all: the file is just the seek table, so its
        // leading bytes are a skippable frame header, not a codec magic number. There's nothing
        // to ever decompress in that case, so the codec choice is moot; default to `Zstd`.
        let codec = if seek_table.num_ste() == 0 {
            Codec::Zstd
        } else {
            let mut head = [0u8; 4];
            let head_len = read_file.pread(&mut head, 0)?;
            Codec::detect(&head[..head_len])?
        };

        let decompressor: Box<dyn FrameDecompressor> = match codec {
            Codec::Zstd => Box::new(ZstdDecompressor::new()),
            Codec::Lz4 => Box::new(Lz4Decompressor::new()),
        };

        Ok(Reader {
            read_file,
            seek_table,
            codec,
            state: Mutex::new(SharedState {
                cache: FrameCache::new(self.cache_capacity),
                decompressor,
                scratch: Vec::new(),
            }),
            cursor: Mutex::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }
}

/// Statistics about a [`Reader`], useful for logging or metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderStats {
    /// The in-memory footprint of the parsed seek table.
    pub seek_table_memory: usize,
    /// The number of seek-table entries (STEs); unlike [`crate::WriterStats::frames`], this
    /// counts STEs rather than genuine codec-level frames, since the wire format has no room to
    /// record a per-STE frame count and a reader never needs one.
    pub frames: u32,
    /// The total decompressed size of the archive.
    pub decompressed_size: u64,
    /// Total decompressed bytes currently held in the frame cache.
    pub cache_memory: usize,
    /// The number of STEs currently cached.
    pub cached_frames: usize,
    /// The capacity of the shared scratch buffer used for no-cache streaming reads.
    pub buffer_size: usize,
}

struct SharedState {
    cache: FrameCache,
    decompressor: Box<dyn FrameDecompressor>,
    /// Reused across no-cache streaming reads to avoid reallocating on every call.
    scratch: Vec<u8>,
}

/// Presents a compressed archive as a random-access byte stream.
pub struct Reader<R: ReadFile> {
    read_file: R,
    seek_table: SeekTable,
    codec: Codec,
    state: Mutex<SharedState>,
    cursor: Mutex<u64>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: ReadFile> Reader<R> {
    /// Reads up to `buf.len()` bytes starting at the decompressed `offset`.
    ///
    /// Returns `0` if `offset` is at or past the end of the decompressed data; this is not an
    /// error. Otherwise returns at least one byte. A single call never crosses an STE boundary,
    /// even if `buf` has room for more: callers reading a range spanning multiple STEs must loop,
    /// advancing `offset` by the returned count each time.
    ///
    /// # Errors
    ///
    /// Fails if the underlying source returns an error, or if decompression of the covering STE
    /// fails.
    pub fn pread(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if buf.is_empty() || offset >= self.seek_table.size_decomp() {
            return Ok(0);
        }

        let ste_index = self.seek_table.ste_index_decomp(offset);
        let ste_start = self.seek_table.frame_start_decomp(ste_index)?;
        let within = (offset - ste_start) as usize;

        let cache_enabled = {
            let state = self.state.lock().expect("reader lock poisoned");
            state.cache.is_enabled()
        };

        if cache_enabled {
            let payload = self.fetch_ste(ste_index)?;
            let available = payload.len().saturating_sub(within);
            let n = buf.len().min(available);
            buf[..n].copy_from_slice(&payload[within..within + n]);
            Ok(n)
        } else {
            self.read_streaming(ste_index, within, buf)
        }
    }

    /// Reads sequentially from an internal cursor, advancing it by the number of bytes read.
    /// Fills `buf` entirely unless the end of the decompressed data is reached first.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`Self::pread`].
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut pos = self.cursor.lock().expect("cursor lock poisoned");
        let mut total = 0;
        while total < buf.len() {
            let n = self.pread(&mut buf[total..], *pos)?;
            if n == 0 {
                break;
            }
            total += n;
            *pos += n as u64;
        }
        Ok(total)
    }

    /// Seeks the internal cursor used by [`Self::read`] to `offset`.
    pub fn seek_to(&self, offset: u64) {
        *self.cursor.lock().expect("cursor lock poisoned") = offset;
    }

    /// The seek table backing this reader.
    pub fn seek_table(&self) -> &SeekTable {
        &self.seek_table
    }

    /// A snapshot of this reader's statistics.
    pub fn stats(&self) -> ReaderStats {
        let state = self.state.lock().expect("reader lock poisoned");
        ReaderStats {
            seek_table_memory: self.seek_table.memory_usage(),
            frames: self.seek_table.num_ste(),
            decompressed_size: self.seek_table.size_decomp(),
            cache_memory: state.cache.used_bytes(),
            cached_frames: state.cache.len(),
            buffer_size: state.scratch.capacity(),
        }
    }

    /// Returns the decompressed bytes of `ste_index`, consulting and populating the cache.
    fn fetch_ste(&self, ste_index: u32) -> Result<Vec<u8>> {
        {
            let mut state = self.state.lock().expect("reader lock poisoned");
            if let Some(hit) = state.cache.get(u64::from(ste_index)) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(hit.to_vec());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let decompressed = self.decompress_ste_whole(ste_index)?;

        let mut state = self.state.lock().expect("reader lock poisoned");
        // Re-check: another thread may have raced us and already inserted this STE.
        if let Some(hit) = state.cache.get(u64::from(ste_index)) {
            return Ok(hit.to_vec());
        }
        state.cache.insert(u64::from(ste_index), decompressed.clone());
        Ok(decompressed)
    }

    /// Decompresses `ste_index` in full, independent of the shared decompressor/cache state.
    /// Used for cache fills, where a throwaway codec context avoids holding the shared lock for
    /// the whole decompression.
    fn decompress_ste_whole(&self, ste_index: u32) -> Result<Vec<u8>> {
        let (compressed, d_size) = self.read_compressed(ste_index)?;

        let mut decompressor: Box<dyn FrameDecompressor> = match self.codec {
            Codec::Zstd => Box::new(ZstdDecompressor::new()),
            Codec::Lz4 => Box::new(Lz4Decompressor::new()),
        };
        let mut out = Vec::with_capacity(d_size);
        decompressor.decompress_into(&compressed, d_size, d_size, &mut out)?;
        log::trace!("decompressed ste {ste_index}: {} -> {} bytes", compressed.len(), out.len());
        Ok(out)
    }

    /// The no-cache streaming read path: decompresses only as much of `ste_index` as needed to
    /// discard the `within`-byte prefix and fill `buf`, without ever materializing the whole STE.
    fn read_streaming(&self, ste_index: u32, within: usize, buf: &mut [u8]) -> Result<usize> {
        let (compressed, d_size) = self.read_compressed(ste_index)?;
        let limit = within.saturating_add(buf.len()).min(d_size);

        let mut state = self.state.lock().expect("reader lock poisoned");
        state.scratch.clear();
        state
            .decompressor
            .decompress_into(&compressed, d_size, limit, &mut state.scratch)?;

        let available = state.scratch.len().saturating_sub(within);
        let n = buf.len().min(available);
        buf[..n].copy_from_slice(&state.scratch[within..within + n]);
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::trace!("streamed ste {ste_index}: discarded {within} bytes, returned {n}");
        Ok(n)
    }

    /// Reads `ste_index`'s compressed bytes off the source, returning them alongside the STE's
    /// declared decompressed size.
    fn read_compressed(&self, ste_index: u32) -> Result<(Vec<u8>, usize)> {
        let c_start = self.seek_table.frame_start_comp(ste_index)?;
        let c_size = self.seek_table.frame_size_comp(ste_index)? as usize;
        let d_size = self.seek_table.frame_size_decomp(ste_index)? as usize;

        let mut compressed = vec![0u8; c_size];
        let mut read = 0;
        while read < c_size {
            let n = self.read_file.pread(&mut compressed[read..], c_start + read as u64)?;
            if n == 0 {
                return Err(Error::unexpected_eof());
            }
            read += n;
        }
        Ok((compressed, d_size))
    }
}
