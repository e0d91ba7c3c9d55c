//! Error types for motion-photo

use std::io;

/// Result type for motion-photo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling or reading a motion photo
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input is not a well-formed JPEG (missing SOI marker)
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Segment length exceeds what the 2-byte length field can carry
    #[error("Data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: usize, max: usize },

    /// Invalid segment or out-of-range offset
    #[error("Invalid segment at offset {offset}: {reason}")]
    InvalidSegment { offset: u64, reason: String },

    /// No motion photo XMP found in the leading APP segments
    #[error("XMP data not found")]
    XmpNotFound,

    /// Malformed XMP document
    #[cfg(feature = "xmp")]
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
