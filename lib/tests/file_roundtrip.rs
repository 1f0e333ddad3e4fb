//! Exercises the `std::fs::File` `ReadFile`/`WriteFile` impls end to end, rather than the
//! in-memory `SliceReadFile`/`VecWriteFile` pair the unit tests mostly use.

use std::fs::File;

use frameseek::{DecodeOptions, EncodeOptions, Lz4Params, ZstdParams};
use tempfile::NamedTempFile;

fn roundtrip_through_file(data: &[u8], encode: EncodeOptions) {
    let compressed = NamedTempFile::new().unwrap();

    let file = File::create(compressed.path()).unwrap();
    let mut writer = encode.into_writer(file).unwrap();
    writer.write(data).unwrap();
    writer.close().unwrap();

    let file = File::open(compressed.path()).unwrap();
    let reader = DecodeOptions::new().into_reader(file).unwrap();

    let mut out = Vec::new();
    let mut pos = 0u64;
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.pread(&mut buf, pos).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
        pos += n as u64;
    }

    assert_eq!(out, data);
}

#[test]
fn zstd_roundtrip_through_real_file() {
    let data: Vec<u8> = (0..400_000u32).map(|i| (i % 211) as u8).collect();
    roundtrip_through_file(
        &data,
        EncodeOptions::zstd(ZstdParams::default()).min_frame_size(16 * 1024),
    );
}

#[test]
fn lz4_roundtrip_through_real_file() {
    let data: Vec<u8> = (0..400_000u32).map(|i| (i * 3 % 197) as u8).collect();
    roundtrip_through_file(
        &data,
        EncodeOptions::lz4(Lz4Params::default()).min_frame_size(16 * 1024),
    );
}

#[test]
fn empty_file_roundtrip() {
    roundtrip_through_file(b"", EncodeOptions::zstd(ZstdParams::default()));
}
