#![no_main]

use frameseek::{DecodeOptions, EncodeOptions, SliceReadFile, VecWriteFile, ZstdParams};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut sink = VecWriteFile::new();
    let mut writer = EncodeOptions::zstd(ZstdParams::default())
        .min_frame_size(97)
        .into_writer(&mut sink)
        .unwrap();
    writer.write(data).unwrap();
    writer.close().unwrap();

    let reader = DecodeOptions::new()
        .into_reader(SliceReadFile::new(&sink.data))
        .unwrap();

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

    assert_eq!(data, &out[..]);
});
