#![no_main]

use libfuzzer_sys::fuzz_target;
use motion_photo::{MotionPhoto, MotionPhotoMetadata};

fuzz_target!(|data: &[u8]| {
    // Reading arbitrary files should NEVER panic, only return errors
    if let Ok(photo) = MotionPhoto::parse(data) {
        let _ = photo.metadata();
        let _ = photo.cover();
        let _ = photo.video();
        let _ = photo.thumbnail();
    }

    if let Ok(xmp) = std::str::from_utf8(data) {
        let _ = MotionPhotoMetadata::parse(xmp);
    }
});
