#![no_main]

use frameseek::{DecodeOptions, EncodeOptions, SliceReadFile, VecWriteFile, ZstdParams};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u32, u32, Vec<u8>)| {
    let (offset0, offset1, data) = input;
    if data.is_empty() {
        return;
    }

    let mut sink = VecWriteFile::new();
    let mut writer = EncodeOptions::zstd(ZstdParams::default())
        .min_frame_size(97)
        .frames_per_ste(3)
        .into_writer(&mut sink)
        .unwrap();
    writer.write(&data).unwrap();
    writer.close().unwrap();

    let reader = DecodeOptions::new()
        .cache_capacity(8)
        .into_reader(SliceReadFile::new(&sink.data))
        .unwrap();

    for offset in [offset0 as usize % data.len(), offset1 as usize % data.len()] {
        let mut out = Vec::new();
        let mut pos = offset as u64;
        let mut buf = [0u8; 997];
        loop {
            let n = reader.pread(&mut buf, pos).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            pos += n as u64;
        }
        assert_eq!(&data[offset..], &out[..]);
    }
});
