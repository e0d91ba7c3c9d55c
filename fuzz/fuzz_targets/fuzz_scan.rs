#![no_main]

use libfuzzer_sys::fuzz_target;
use motion_photo::jpeg;

fuzz_target!(|data: &[u8]| {
    // Scanning and splicing must NEVER panic, only return errors
    if let Ok(at) = jpeg::find_insertion_point(data) {
        assert!(at <= data.len());

        let out = jpeg::embed_xmp(data, b"<x:xmpmeta/>").expect("valid SOI was checked");
        assert_eq!(&out[..at], &data[..at]);
        assert_eq!(&out[out.len() - (data.len() - at)..], &data[at..]);
    }

    if let Ok(segments) = jpeg::segments(data) {
        for segment in segments {
            let _ = segment.payload(data);
            let _ = segment.label();
        }
    }
});
