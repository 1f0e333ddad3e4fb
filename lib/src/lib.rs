//! Presents a compressed file made of independently compressed frames, plus a trailing seek
//! table, as a random-access byte stream.
//!
//! The underlying frames may be either Zstandard frames (grouped into a Zstandard skippable
//! frame seek table, compatible with the [Zstandard Seekable Format]) or LZ4 frames. Frames are
//! grouped into seek-table entries ("STEs"); an STE is the unit of random access a [`Reader`]
//! actually fetches and caches.
//!
//! # Getting started
//!
//! - [`EncodeOptions`] configures and builds a [`Writer`], which accepts sequential writes and
//!   appends a seek table on [`Writer::close`].
//! - [`DecodeOptions`] configures and builds a [`Reader`], which performs positional
//!   (`pread`-style) or cursor-based reads over the compressed file.
//!
//! [Zstandard Seekable Format]: https://github.com/facebook/zstd/blob/dev/contrib/seekable_format/zstd_seekable_compression_format.md

mod buffer;
mod cache;
pub mod codec;
mod error;
mod io;
mod params;
mod reader;
mod seek_table;
mod writer;

pub use error::{Error, Result};
pub use io::{ReadFile, SliceReadFile, VecWriteFile, WriteFile};
pub use params::{Lz4Params, ZstdParams};
pub use reader::{DecodeOptions, Reader, ReaderStats};
pub use seek_table::{Format, SeekTable};
pub use writer::{EncodeOptions, Writer, WriterStats};

/// The magic number of the seek table integrity field.
pub const SEEKABLE_MAGIC_NUMBER: u32 = 0x8F92_EAB1;
/// The maximum number of frames (STEs) in a seek table.
pub const SEEKABLE_MAX_FRAMES: u32 = 0x0800_0000;
/// The size of the seek table integrity field, without the checksum descriptor bit's effect on
/// per-entry size: 4 bytes frame count + 1 byte descriptor + 4 bytes magic number.
pub const SEEK_TABLE_INTEGRITY_SIZE: usize = 9;
/// The maximum size of the uncompressed data of a single STE.
pub const SEEKABLE_MAX_FRAME_SIZE: usize = 0x4000_0000;
/// The size of a Zstandard skippable frame header: magic number (4 bytes) + frame size (4 bytes).
pub(crate) const SKIPPABLE_HEADER_SIZE: usize = 8;
/// The default number of codec-level frames grouped under a single seek-table entry.
pub const DEFAULT_FRAMES_PER_STE: u32 = 10;
/// The default minimum number of uncompressed bytes accumulated before a frame is closed.
pub const DEFAULT_MIN_FRAME_SIZE: u32 = 0x20_0000;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{SliceReadFile, VecWriteFile};
    use proptest::prelude::*;

    fn encode_zstd(data: &[u8], min_frame_size: u32, frames_per_ste: u32, checksum: bool) -> Vec<u8> {
        let (archive, _stats) = encode_zstd_stats(data, min_frame_size, frames_per_ste, checksum);
        archive
    }

    fn encode_zstd_stats(
        data: &[u8],
        min_frame_size: u32,
        frames_per_ste: u32,
        checksum: bool,
    ) -> (Vec<u8>, WriterStats) {
        let mut sink = VecWriteFile::new();
        let mut writer = EncodeOptions::zstd(ZstdParams::default())
            .min_frame_size(min_frame_size)
            .frames_per_ste(frames_per_ste)
            .checksum_flag(checksum)
            .into_writer(&mut sink)
            .unwrap();
        writer.write(data).unwrap();
        let stats = writer.close().unwrap();
        (sink.data, stats)
    }

    fn encode_lz4(data: &[u8], min_frame_size: u32) -> Vec<u8> {
        let mut sink = VecWriteFile::new();
        let mut writer = EncodeOptions::lz4(Lz4Params::default())
            .min_frame_size(min_frame_size)
            .into_writer(&mut sink)
            .unwrap();
        writer.write(data).unwrap();
        writer.close().unwrap();
        sink.data
    }

    fn read_all(archive: &[u8], cache_capacity: usize) -> Vec<u8> {
        let reader = DecodeOptions::new()
            .cache_capacity(cache_capacity)
            .into_reader(SliceReadFile::new(archive))
            .unwrap();
        let mut out = Vec::new();
        let mut pos = 0u64;
        let mut buf = [0u8; 777];
        loop {
            let n = reader.pread(&mut buf, pos).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            pos += n as u64;
        }
        out
    }

    #[test]
    fn round_trip_hello_world() {
        let data = b"Hello, world!\n";
        let archive = encode_zstd(data, 0x20_0000, 10, false);
        assert_eq!(read_all(&archive, 8), data);
    }

    #[test]
    fn round_trip_one_meg_of_constant_byte() {
        let data = vec![0xAAu8; 1024 * 1024];
        let archive = encode_zstd(&data, 4096, 4, true);
        assert_eq!(read_all(&archive, 16), data);
    }

    /// 1 MiB at a 64 KiB frame boundary must emit at least 16 genuine codec-level frames, not one
    /// per STE: this is the case the old size-multiplier `frames_per_ste` implementation failed.
    #[test]
    fn constant_byte_frame_count_matches_min_frame_size() {
        let data = vec![0xAAu8; 1024 * 1024];
        let (archive, stats) = encode_zstd_stats(&data, 64 * 1024, 10, false);
        assert!(stats.frames >= 16, "expected >= 16 frames, got {}", stats.frames);
        assert_eq!(read_all(&archive, 8), data);
    }

    #[test]
    fn round_trip_i_mod_251() {
        let data: Vec<u8> = (0..500_000u32).map(|i| (i % 251) as u8).collect();
        let archive = encode_zstd(&data, 8192, 2, false);
        assert_eq!(read_all(&archive, 32), data);
    }

    #[test]
    fn round_trip_three_chunk_writes() {
        let chunk_a = vec![1u8; 10_000];
        let chunk_b = vec![2u8; 20_000];
        let chunk_c = vec![3u8; 5_000];
        let mut sink = VecWriteFile::new();
        let mut writer = EncodeOptions::zstd(ZstdParams::default())
            .min_frame_size(4096)
            .into_writer(&mut sink)
            .unwrap();
        writer.write(&chunk_a).unwrap();
        writer.write(&chunk_b).unwrap();
        writer.write(&chunk_c).unwrap();
        writer.close().unwrap();

        let mut expected = chunk_a;
        expected.extend(chunk_b);
        expected.extend(chunk_c);
        assert_eq!(read_all(&sink.data, 8), expected);
    }

    #[test]
    fn round_trip_lz4() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 97) as u8).collect();
        let archive = encode_lz4(&data, 8192);
        assert_eq!(read_all(&archive, 16), data);
    }

    #[test]
    fn corrupted_footer_magic_is_rejected() {
        let data = b"some archive content that spans a couple stes worth of bytes";
        let mut archive = encode_zstd(data, 16, 2, false);
        let len = archive.len();
        // Flip a byte inside the integrity footer's magic number field.
        archive[len - 1] ^= 0xFF;

        let err = DecodeOptions::new()
            .into_reader(SliceReadFile::new(&archive))
            .unwrap_err();
        assert!(err.is_bad_magic());
    }

    #[test]
    fn cache_capacity_zero_still_reads_correctly() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 200) as u8).collect();
        let archive = encode_zstd(&data, 4096, 2, false);
        assert_eq!(read_all(&archive, 0), data);
    }

    #[test]
    fn random_access_matches_sequential_read() {
        let data: Vec<u8> = (0..300_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let archive = encode_zstd(&data, 4096, 3, false);
        let reader = DecodeOptions::new()
            .cache_capacity(4)
            .into_reader(SliceReadFile::new(&archive))
            .unwrap();

        for &offset in &[0usize, 1, 4095, 4096, 150_000, 299_999] {
            let mut buf = [0u8; 64];
            let n = reader.pread(&mut buf, offset as u64).unwrap();
            assert!(n > 0);
            assert_eq!(&buf[..n], &data[offset..offset + n]);
        }
    }

    #[test]
    fn pread_past_end_returns_zero() {
        let data = b"short";
        let archive = encode_zstd(data, 4096, 1, false);
        let reader = DecodeOptions::new()
            .into_reader(SliceReadFile::new(&archive))
            .unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(reader.pread(&mut buf, data.len() as u64).unwrap(), 0);
        assert_eq!(reader.pread(&mut buf, 10_000).unwrap(), 0);
    }

    #[test]
    fn sequential_cursor_read_matches_pread() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 199) as u8).collect();
        let archive = encode_zstd(&data, 2048, 2, false);
        let reader = DecodeOptions::new()
            .into_reader(SliceReadFile::new(&archive))
            .unwrap();

        let mut out = Vec::new();
        let mut buf = [0u8; 333];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn close_with_no_data_produces_empty_readable_archive() {
        let mut sink = VecWriteFile::new();
        let writer = EncodeOptions::zstd(ZstdParams::default())
            .into_writer(&mut sink)
            .unwrap();
        let stats = writer.close().unwrap();
        assert_eq!(stats.frames, 0);
        assert_eq!(read_all(&sink.data, 4), Vec::<u8>::new());
    }

    #[test]
    fn concurrent_readers_agree_with_sequential_decode() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 229) as u8).collect();
        let archive = encode_zstd(&data, 2048, 2, false);

        let reader = DecodeOptions::new()
            .cache_capacity(4)
            .into_reader(SliceReadFile::new(&archive))
            .unwrap();

        std::thread::scope(|scope| {
            for t in 0..8u64 {
                let reader = &reader;
                let data = &data;
                scope.spawn(move || {
                    let offset = (t as usize * 17_000) % data.len();
                    let mut buf = [0u8; 512];
                    let n = reader.pread(&mut buf, offset as u64).unwrap();
                    assert!(n > 0);
                    assert_eq!(&buf[..n], &data[offset..offset + n]);
                });
            }
        });

        let stats = reader.stats();
        assert!(stats.cached_frames > 0);
        assert!(stats.cached_frames <= 4);
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary_bytes(
            data in proptest::collection::vec(any::<u8>(), 0..20_000),
            min_frame_size in 1u32..5000,
            frames_per_ste in 1u32..5,
            checksum in any::<bool>(),
        ) {
            let archive = encode_zstd(&data, min_frame_size, frames_per_ste, checksum);
            prop_assert_eq!(read_all(&archive, 4), data);
        }

        #[test]
        fn random_access_offset_matches_full_decode(
            data in proptest::collection::vec(any::<u8>(), 1..20_000),
            offset_frac in 0u32..100,
        ) {
            let archive = encode_zstd(&data, 777, 2, false);
            let reader = DecodeOptions::new()
                .cache_capacity(4)
                .into_reader(SliceReadFile::new(&archive))
                .unwrap();
            let offset = (data.len() as u64 * u64::from(offset_frac)) / 100;
            let mut buf = vec![0u8; data.len()];
            let n = reader.pread(&mut buf, offset).unwrap();
            prop_assert_eq!(&buf[..n], &data[offset as usize..offset as usize + n]);
        }
    }
}
