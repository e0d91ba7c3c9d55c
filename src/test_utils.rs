//! Test utilities for building synthetic inputs.
//!
//! Real camera JPEGs are not needed to exercise the marker walk: everything
//! here produces small, structurally valid marker streams with deterministic
//! contents.
//!
//! # Usage
//!
//! ```
//! use motion_photo::test_utils::*;
//!
//! // Baseline-shaped JPEG with APP0, DQT, SOF0, SOS and 128 bytes of scan data
//! let cover = sample_jpeg(128);
//! assert_eq!(&cover[..2], &[0xFF, 0xD8]);
//!
//! // Or build one marker by marker
//! let custom = JpegBuilder::new()
//!     .app(0xE1, b"Exif\0\0")
//!     .scan(&[0x12, 0x34])
//!     .finish();
//! assert_eq!(&custom[custom.len() - 2..], &[0xFF, 0xD9]);
//! ```

use byteorder::{BigEndian, ByteOrder};

/// Builder for synthetic JPEG marker streams
#[derive(Debug, Clone)]
pub struct JpegBuilder {
    data: Vec<u8>,
}

impl JpegBuilder {
    /// Start a stream with the SOI marker
    pub fn new() -> Self {
        Self {
            data: vec![0xFF, 0xD8],
        }
    }

    /// Append a segment whose length field covers `payload`
    ///
    /// # Panics
    /// If `payload` is longer than 65533 bytes.
    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        let length = u16::try_from(payload.len() + 2)
            .unwrap_or_else(|_| panic!("segment payload too large: {} bytes", payload.len()));
        let mut length_field = [0u8; 2];
        BigEndian::write_u16(&mut length_field, length);

        self.data.extend_from_slice(&[0xFF, marker]);
        self.data.extend_from_slice(&length_field);
        self.data.extend_from_slice(payload);
        self
    }

    /// Append an APPn segment
    pub fn app(self, marker: u8, payload: &[u8]) -> Self {
        self.segment(marker, payload)
    }

    /// Append an SOS header followed by entropy-coded bytes
    pub fn scan(mut self, entropy: &[u8]) -> Self {
        self = self.segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
        self.data.extend_from_slice(entropy);
        self
    }

    /// Append raw bytes without framing
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Close the stream with EOI
    pub fn finish(mut self) -> Vec<u8> {
        self.data.extend_from_slice(&[0xFF, 0xD9]);
        self.data
    }

    /// Return the bytes without appending EOI
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Default for JpegBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic bytes that never contain `0xFF`
pub fn pattern_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 31 + seed as usize) % 0xFF) as u8)
        .collect()
}

/// JFIF APP0 payload
pub fn jfif_payload() -> Vec<u8> {
    let mut payload = b"JFIF\0".to_vec();
    payload.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    payload
}

/// Baseline-shaped JPEG: APP0, DQT, SOF0, SOS, `scan_len` scan bytes, EOI
pub fn sample_jpeg(scan_len: usize) -> Vec<u8> {
    let mut dqt = vec![0x00];
    dqt.extend(pattern_bytes(64, 1).iter().map(|b| b / 2 + 1));

    JpegBuilder::new()
        .app(0xE0, &jfif_payload())
        .segment(0xDB, &dqt)
        .segment(0xC0, &[0x08, 0x00, 0x10, 0x00, 0x10, 0x01, 0x01, 0x11, 0x00])
        .scan(&pattern_bytes(scan_len, 7))
        .finish()
}

/// Fake video payload of `len` bytes (an `ftyp` box followed by filler)
pub fn sample_video(len: usize) -> Vec<u8> {
    let mut video = vec![0x00, 0x00, 0x00, 0x18];
    video.extend_from_slice(b"ftypisom");
    video.extend(pattern_bytes(len.saturating_sub(video.len()), 3));
    video.truncate(len);
    video
}
