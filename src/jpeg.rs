//! JPEG marker scanning and APP1 segment splicing
//!
//! This is not a full JPEG parser. The scanner is a tolerant forward walk over
//! the leading marker segments: it skips over APPn segments using their
//! length field, stops at the first SOS or EOI marker, and steps one byte at a
//! time over anything else. New metadata goes right in front of that SOS or
//! EOI, which is after every existing application segment.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::Write;
use std::ops::Range;

// JPEG markers
pub const SOI: u8 = 0xD8; // Start of Image
pub const EOI: u8 = 0xD9; // End of Image
pub const SOS: u8 = 0xDA; // Start of Scan (image data follows)
pub const APP0: u8 = 0xE0;
pub const APP1: u8 = 0xE1; // XMP / EXIF
pub const APP15: u8 = 0xEF;

/// Signature that prefixes the XMP packet inside an APP1 segment
pub const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Largest value the 2-byte segment length field can hold
pub const MAX_SEGMENT_LENGTH: usize = 0xFFFF;

/// Get human-readable label for a JPEG marker
pub fn marker_label(marker: u8) -> &'static str {
    match marker {
        0xD8 => "SOI",
        0xD9 => "EOI",
        0xDA => "SOS",
        0xDB => "DQT",
        0xC0 => "SOF0",
        0xC4 => "DHT",
        0xE0 => "APP0",
        0xE1 => "APP1",
        0xE2 => "APP2",
        0xE3 => "APP3",
        0xE4 => "APP4",
        0xE5 => "APP5",
        0xE6 => "APP6",
        0xE7 => "APP7",
        0xE8 => "APP8",
        0xE9 => "APP9",
        0xEA => "APP10",
        0xEB => "APP11",
        0xEC => "APP12",
        0xED => "APP13",
        0xEE => "APP14",
        0xEF => "APP15",
        _ => "OTHER",
    }
}

/// Fail unless `data` starts with the JPEG SOI marker (`FF D8`).
pub fn check_soi(data: &[u8]) -> Result<()> {
    if data.len() >= 2 && data[0] == 0xFF && data[1] == SOI {
        Ok(())
    } else {
        Err(Error::InvalidFormat(format!(
            "Not a JPEG file: expected FF D8, got {:02X?}",
            &data[..data.len().min(2)]
        )))
    }
}

/// A marker located by the scanner.
///
/// APPn segments carry the value of their length field (which counts itself
/// but not the two marker bytes). SOS and EOI are reported without a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSegment {
    /// Offset of the `0xFF` byte
    pub offset: usize,
    /// Marker code (second byte)
    pub marker: u8,
    /// Declared length, if the marker has one
    pub length: Option<u16>,
}

impl MarkerSegment {
    /// Bytes spanned by the segment including the marker itself
    pub fn total_size(&self) -> usize {
        2 + self.length.map_or(0, usize::from)
    }

    /// Range of the payload following the length field
    pub fn payload_range(&self) -> Range<usize> {
        let start = self.offset + 4;
        let end = self.offset + self.total_size();
        start..end.max(start)
    }

    /// Payload bytes, or `None` if the declared length runs past the buffer
    pub fn payload<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        self.length.and_then(|_| data.get(self.payload_range()))
    }

    pub fn is_app(&self) -> bool {
        (APP0..=APP15).contains(&self.marker)
    }

    pub fn label(&self) -> &'static str {
        marker_label(self.marker)
    }
}

/// Iterator over the leading marker segments of a JPEG buffer.
///
/// Yields each APPn segment passed over, then the terminating SOS or EOI
/// marker if one is found. After exhaustion, [`insertion_point`] gives the
/// offset of that terminator, or the end of the last APPn segment when the
/// buffer has none.
///
/// [`insertion_point`]: MarkerSegments::insertion_point
#[derive(Debug, Clone)]
pub struct MarkerSegments<'a> {
    data: &'a [u8],
    pos: usize,
    insert_at: usize,
    done: bool,
}

impl<'a> MarkerSegments<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 2,
            insert_at: 2,
            done: false,
        }
    }

    /// Current insertion point, clamped to the buffer length.
    ///
    /// Only final once the iterator has been exhausted.
    pub fn insertion_point(&self) -> usize {
        self.insert_at.min(self.data.len())
    }
}

impl Iterator for MarkerSegments<'_> {
    type Item = MarkerSegment;

    fn next(&mut self) -> Option<MarkerSegment> {
        if self.done {
            return None;
        }

        let data = self.data;
        while self.pos + 1 < data.len() {
            let pos = self.pos;
            if data[pos] != 0xFF {
                self.pos += 1;
                continue;
            }

            let marker = data[pos + 1];
            match marker {
                SOS | EOI => {
                    self.insert_at = pos;
                    self.done = true;
                    return Some(MarkerSegment {
                        offset: pos,
                        marker,
                        length: None,
                    });
                }
                APP0..=APP15 if pos + 3 < data.len() => {
                    let length = BigEndian::read_u16(&data[pos + 2..pos + 4]);
                    self.pos = pos + 2 + length as usize;
                    self.insert_at = self.pos;
                    return Some(MarkerSegment {
                        offset: pos,
                        marker,
                        length: Some(length),
                    });
                }
                // Unknown marker or truncated APPn: single-byte step
                _ => self.pos += 1,
            }
        }

        self.done = true;
        None
    }
}

/// Walk the leading marker segments of a JPEG buffer.
pub fn segments(data: &[u8]) -> Result<MarkerSegments<'_>> {
    check_soi(data)?;
    Ok(MarkerSegments::new(data))
}

/// Find the offset at which a new APP segment can be inserted.
///
/// The result is the offset of the first SOS/EOI marker, which lies after
/// any leading APPn segments. If neither is found the end of the last APPn
/// segment is used.
/// A bare `FF D8` buffer yields 2.
pub fn find_insertion_point(data: &[u8]) -> Result<usize> {
    let mut walker = segments(data)?;
    for segment in walker.by_ref() {
        tracing::trace!(
            offset = segment.offset,
            marker = segment.label(),
            "Scanned marker"
        );
    }
    Ok(walker.insertion_point())
}

/// Wrap an XMP document in an APP1 segment.
///
/// Layout: `FF E1`, big-endian length (payload + 2), XMP signature, document.
pub fn package_xmp_segment(xmp: &[u8]) -> Result<Vec<u8>> {
    let length = XMP_SIGNATURE.len() + xmp.len() + 2;

    if length > MAX_SEGMENT_LENGTH {
        return Err(Error::DataTooLarge {
            size: length,
            max: MAX_SEGMENT_LENGTH,
        });
    }

    let mut segment = Vec::with_capacity(length + 2);
    segment.write_u8(0xFF)?;
    segment.write_u8(APP1)?;
    segment.write_u16::<BigEndian>(length as u16)?;
    segment.write_all(XMP_SIGNATURE)?;
    segment.write_all(xmp)?;

    Ok(segment)
}

/// Splice a pre-packaged segment into a JPEG at its insertion point.
pub fn insert_segment(jpeg: &[u8], segment: &[u8]) -> Result<Vec<u8>> {
    let at = find_insertion_point(jpeg)?;
    tracing::debug!(
        insert_at = at,
        segment_len = segment.len(),
        jpeg_len = jpeg.len(),
        "Inserting APP segment"
    );

    let mut out = Vec::with_capacity(jpeg.len() + segment.len());
    out.extend_from_slice(&jpeg[..at]);
    out.extend_from_slice(segment);
    out.extend_from_slice(&jpeg[at..]);
    Ok(out)
}

/// Package `xmp` as APP1 and insert it into `jpeg`.
pub fn embed_xmp(jpeg: &[u8], xmp: &[u8]) -> Result<Vec<u8>> {
    check_soi(jpeg)?;
    let segment = package_xmp_segment(xmp)?;
    insert_segment(jpeg, &segment)
}
