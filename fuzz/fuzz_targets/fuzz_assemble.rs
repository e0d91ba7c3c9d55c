#![no_main]

use libfuzzer_sys::fuzz_target;
use motion_photo::{assemble_motion_photo, MotionPhoto};

fuzz_target!(|data: &[u8]| {
    // Split the input into cover / video / thumbnail using the first two bytes
    if data.len() < 2 {
        return;
    }
    let rest = &data[2..];
    let a = (data[0] as usize * rest.len()) / 256;
    let b = a + ((data[1] as usize * (rest.len() - a)) / 256);
    let (cover, video, thumbnail) = (&rest[..a], &rest[a..b], &rest[b..]);

    if let Ok(out) = assemble_motion_photo(cover, video, thumbnail, 1000) {
        // Reading our own output must not panic
        if let Ok(photo) = MotionPhoto::parse(&out) {
            let _ = photo.video();
            let _ = photo.thumbnail();
        }
    }
});
