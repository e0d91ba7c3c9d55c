//! Motion photo container assembly and extraction.
//!
//! Output layout:
//!
//! ```text
//! [cover JPEG + XMP][video bytes][thumbnail JPEG + XMP]
//! ```
//!
//! A plain JPEG decoder stops at the cover's EOI. Motion-photo readers find
//! `GCamera:MicroVideoOffset` in the cover's XMP and count that many bytes
//! back from end of file to reach the video.

use crate::{
    error::Result,
    jpeg::check_soi,
    solver::{solve_offset, ConvergedOffset, SolverOptions},
    xmp::MotionPhotoXmp,
};
use std::io::Write;

/// Content type for assembled output
pub const MOTION_PHOTO_MIME: &str = "image/jpeg";

/// File extension for assembled output
pub const MOTION_PHOTO_EXTENSION: &str = "jpg";

/// Options for [`MotionPhotoParts::assemble_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleOptions {
    pub solver: SolverOptions,
}

impl AssembleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the offset solver's passes (default 5)
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.solver = self.solver.max_iterations(max_iterations);
        self
    }
}

/// Borrowed inputs for one motion photo
#[derive(Debug, Clone, Copy)]
pub struct MotionPhotoParts<'a> {
    /// Still cover JPEG
    pub cover: &'a [u8],
    /// Encoded video clip, embedded verbatim
    pub video: &'a [u8],
    /// Thumbnail JPEG appended after the video
    pub thumbnail: &'a [u8],
    /// Playback duration in milliseconds
    pub duration_ms: u64,
}

/// Cover and thumbnail with their XMP embedded, ready to concatenate
#[derive(Debug, Clone)]
pub struct PreparedParts {
    pub cover: Vec<u8>,
    pub thumbnail: Vec<u8>,
    pub offset: ConvergedOffset,
}

impl PreparedParts {
    pub fn total_len(&self, video_len: usize) -> usize {
        self.cover.len() + video_len + self.thumbnail.len()
    }
}

impl<'a> MotionPhotoParts<'a> {
    pub fn new(cover: &'a [u8], video: &'a [u8], thumbnail: &'a [u8], duration_ms: u64) -> Self {
        Self {
            cover,
            video,
            thumbnail,
            duration_ms,
        }
    }

    fn video_length(&self) -> u64 {
        self.video.len() as u64
    }

    /// Validate inputs, solve the offset, and embed XMP in cover and thumbnail.
    pub fn prepare(&self, options: &AssembleOptions) -> Result<PreparedParts> {
        check_soi(self.cover)?;
        check_soi(self.thumbnail)?;

        let offset = solve_offset(
            self.thumbnail,
            self.video_length(),
            self.duration_ms,
            &options.solver,
        )?;

        let params = MotionPhotoXmp::new(self.video_length(), self.duration_ms)
            .with_micro_video_offset(offset.micro_video_offset);

        let cover = params
            .with_thumbnail_length(offset.thumbnail_length)
            .embed_into(self.cover)?;
        let thumbnail = params.embed_into(self.thumbnail)?;

        tracing::debug!(
            cover_len = cover.len(),
            video_len = self.video.len(),
            thumbnail_len = thumbnail.len(),
            offset = offset.micro_video_offset,
            "Prepared motion photo parts"
        );

        Ok(PreparedParts {
            cover,
            thumbnail,
            offset,
        })
    }

    /// Assemble with default options.
    pub fn assemble(&self) -> Result<Vec<u8>> {
        self.assemble_with(&AssembleOptions::default())
    }

    /// Assemble into a single owned buffer.
    pub fn assemble_with(&self, options: &AssembleOptions) -> Result<Vec<u8>> {
        let prepared = self.prepare(options)?;

        let mut out = Vec::with_capacity(prepared.total_len(self.video.len()));
        out.extend_from_slice(&prepared.cover);
        out.extend_from_slice(self.video);
        out.extend_from_slice(&prepared.thumbnail);
        Ok(out)
    }

    /// Stream the assembled container to `writer`.
    ///
    /// Nothing is written unless every part was built successfully. Returns
    /// the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W, options: &AssembleOptions) -> Result<u64> {
        let prepared = self.prepare(options)?;

        writer.write_all(&prepared.cover)?;
        writer.write_all(self.video)?;
        writer.write_all(&prepared.thumbnail)?;
        writer.flush()?;

        Ok(prepared.total_len(self.video.len()) as u64)
    }
}

/// Assemble a motion photo from a cover, video, thumbnail and duration.
///
/// # Errors
/// - [`Error::InvalidFormat`](crate::Error::InvalidFormat) if the cover or
///   thumbnail does not start with `FF D8`
/// - [`Error::DataTooLarge`](crate::Error::DataTooLarge) if an XMP segment
///   would exceed 65535 bytes
pub fn assemble_motion_photo(
    cover: &[u8],
    video: &[u8],
    thumbnail: &[u8],
    duration_ms: u64,
) -> Result<Vec<u8>> {
    MotionPhotoParts::new(cover, video, thumbnail, duration_ms).assemble()
}

#[cfg(feature = "xmp")]
pub use reader::MotionPhoto;

#[cfg(feature = "xmp")]
mod reader {
    use crate::{
        error::{Error, Result},
        jpeg::{segments, APP1, XMP_SIGNATURE},
        xmp::MotionPhotoMetadata,
    };
    use std::ops::Range;

    /// A parsed motion photo container.
    ///
    /// Borrows the file bytes; accessors return sub-slices.
    #[derive(Debug, Clone)]
    pub struct MotionPhoto<'a> {
        data: &'a [u8],
        metadata: MotionPhotoMetadata,
        video: Range<usize>,
        thumbnail: Range<usize>,
    }

    impl<'a> MotionPhoto<'a> {
        /// Locate the motion photo XMP in the cover and split the container.
        ///
        /// The last APP1 XMP segment declaring `GCamera:MicroVideoOffset`
        /// wins. Packets that are not UTF-8, fail to parse, or declare no
        /// offset are skipped.
        pub fn parse(data: &'a [u8]) -> Result<Self> {
            let metadata = find_metadata(data)?;
            let len = data.len() as u64;

            let offset = metadata.micro_video_offset;
            if offset > len {
                return Err(Error::InvalidSegment {
                    offset,
                    reason: format!("MicroVideoOffset exceeds file size {}", len),
                });
            }

            let trailer = metadata.gain_map_length.unwrap_or(0);
            if trailer > offset {
                return Err(Error::InvalidSegment {
                    offset: trailer,
                    reason: format!("GainMap length exceeds MicroVideoOffset {}", offset),
                });
            }

            let video_start = (len - offset) as usize;
            let thumbnail_start = (len - trailer) as usize;

            Ok(Self {
                data,
                metadata,
                video: video_start..thumbnail_start,
                thumbnail: thumbnail_start..data.len(),
            })
        }

        pub fn metadata(&self) -> &MotionPhotoMetadata {
            &self.metadata
        }

        /// Everything before the video, i.e. the cover JPEG with its XMP
        pub fn cover(&self) -> &'a [u8] {
            &self.data[..self.video.start]
        }

        pub fn video(&self) -> &'a [u8] {
            &self.data[self.video.clone()]
        }

        /// Trailing GainMap item; empty if the XMP lists no length
        pub fn thumbnail(&self) -> &'a [u8] {
            &self.data[self.thumbnail.clone()]
        }

        pub fn video_range(&self) -> Range<usize> {
            self.video.clone()
        }

        pub fn thumbnail_range(&self) -> Range<usize> {
            self.thumbnail.clone()
        }
    }

    // The assembler inserts its packet after every existing APP segment, so
    // the last declaring packet is the current one.
    fn find_metadata(data: &[u8]) -> Result<MotionPhotoMetadata> {
        let mut found = None;

        for segment in segments(data)? {
            if segment.marker != APP1 {
                continue;
            }
            let Some(payload) = segment.payload(data) else {
                continue;
            };
            let Some(xmp) = payload.strip_prefix(XMP_SIGNATURE) else {
                continue;
            };

            let xmp = match std::str::from_utf8(xmp) {
                Ok(xmp) => xmp,
                Err(e) => {
                    tracing::debug!(
                        segment_offset = segment.offset,
                        error = %e,
                        "Skipping XMP packet that is not UTF-8"
                    );
                    continue;
                }
            };

            match MotionPhotoMetadata::parse(xmp) {
                Ok(Some(metadata)) => {
                    tracing::debug!(
                        segment_offset = segment.offset,
                        micro_video_offset = metadata.micro_video_offset,
                        "Found motion photo XMP"
                    );
                    found = Some(metadata);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        segment_offset = segment.offset,
                        error = %e,
                        "Skipping unparsable XMP packet"
                    );
                }
            }
        }

        found.ok_or(Error::XmpNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        jpeg::find_insertion_point,
        test_utils::{sample_jpeg, sample_video},
    };
    use byteorder::{BigEndian, ByteOrder};

    #[test]
    fn test_layout() {
        let cover = sample_jpeg(400);
        let thumbnail = sample_jpeg(100);
        let video = sample_video(5000);

        let parts = MotionPhotoParts::new(&cover, &video, &thumbnail, 2500);
        let prepared = parts.prepare(&AssembleOptions::default()).unwrap();
        let out = parts.assemble().unwrap();

        assert_eq!(out.len(), prepared.total_len(video.len()));
        assert_eq!(&out[..prepared.cover.len()], &prepared.cover[..]);
        assert_eq!(
            &out[prepared.cover.len()..prepared.cover.len() + video.len()],
            &video[..]
        );
        assert_eq!(&out[out.len() - prepared.thumbnail.len()..], &prepared.thumbnail[..]);
    }

    #[test]
    fn test_declared_offset_points_at_video() {
        let cover = sample_jpeg(256);
        let thumbnail = sample_jpeg(64);
        let video = sample_video(777);

        let out = assemble_motion_photo(&cover, &video, &thumbnail, 1000).unwrap();
        let prepared = MotionPhotoParts::new(&cover, &video, &thumbnail, 1000)
            .prepare(&AssembleOptions::default())
            .unwrap();

        let offset = prepared.offset.micro_video_offset as usize;
        assert_eq!(offset, video.len() + prepared.thumbnail.len());
        let start = out.len() - offset;
        assert_eq!(&out[start..start + video.len()], &video[..]);
    }

    #[test]
    fn test_cover_image_data_untouched() {
        let cover = sample_jpeg(512);
        let out = assemble_motion_photo(&cover, &sample_video(100), &sample_jpeg(32), 0).unwrap();

        let at = find_insertion_point(&cover).unwrap();
        let segment_len = 2 + BigEndian::read_u16(&out[at + 2..at + 4]) as usize;

        assert_eq!(&out[..at], &cover[..at]);
        assert_eq!(&out[at..at + 2], &[0xFF, 0xE1]);
        assert_eq!(&out[at + segment_len..at + segment_len + cover.len() - at], &cover[at..]);
    }

    #[test]
    fn test_cover_declares_thumbnail_length() {
        let cover = sample_jpeg(128);
        let thumbnail = sample_jpeg(96);
        let video = sample_video(321);
        let prepared = MotionPhotoParts::new(&cover, &video, &thumbnail, 0)
            .prepare(&AssembleOptions::default())
            .unwrap();

        let text = String::from_utf8_lossy(&prepared.cover);
        let expected = format!(r#"Item:Length="{}"/>"#, prepared.thumbnail.len());
        assert!(text.contains(&expected));

        // The thumbnail never declares its own length
        let text = String::from_utf8_lossy(&prepared.thumbnail);
        let expected = format!(r#"Item:Length="{}"/>"#, video.len());
        assert!(text.contains(&expected));
    }

    #[test]
    fn test_write_to_matches_assemble() {
        let cover = sample_jpeg(64);
        let thumbnail = sample_jpeg(64);
        let video = sample_video(2048);
        let parts = MotionPhotoParts::new(&cover, &video, &thumbnail, 3000);

        let mut written = Vec::new();
        let count = parts.write_to(&mut written, &AssembleOptions::default()).unwrap();

        assert_eq!(count as usize, written.len());
        assert_eq!(written, parts.assemble().unwrap());
    }

    #[test]
    fn test_malformed_cover_writes_nothing() {
        let cover = [0x00, 0x00, 0xFF, 0xD9];
        let thumbnail = sample_jpeg(16);
        let video = sample_video(16);
        let parts = MotionPhotoParts::new(&cover, &video, &thumbnail, 0);

        let mut written = Vec::new();
        let err = parts.write_to(&mut written, &AssembleOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert!(written.is_empty());
    }

    #[test]
    fn test_malformed_thumbnail_rejected() {
        let err = assemble_motion_photo(&sample_jpeg(16), &[1, 2, 3], &[0xFF, 0x00], 0).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_empty_video() {
        let cover = sample_jpeg(16);
        let thumbnail = sample_jpeg(16);
        let out = assemble_motion_photo(&cover, &[], &thumbnail, 0).unwrap();
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
        assert_eq!(&out[out.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_output_contract() {
        assert_eq!(MOTION_PHOTO_MIME, "image/jpeg");
        assert_eq!(MOTION_PHOTO_EXTENSION, "jpg");
    }

    #[cfg(feature = "xmp")]
    #[test]
    fn test_parse_round_trip() {
        let cover = sample_jpeg(300);
        let thumbnail = sample_jpeg(80);
        let video = sample_video(4096);
        let parts = MotionPhotoParts::new(&cover, &video, &thumbnail, 1500);
        let prepared = parts.prepare(&AssembleOptions::default()).unwrap();
        let out = parts.assemble().unwrap();

        let photo = MotionPhoto::parse(&out).unwrap();
        assert!(photo.metadata().micro_video);
        assert_eq!(photo.video(), &video[..]);
        assert_eq!(photo.thumbnail(), &prepared.thumbnail[..]);
        assert_eq!(photo.cover(), &prepared.cover[..]);
    }

    #[cfg(feature = "xmp")]
    #[test]
    fn test_parse_plain_jpeg() {
        assert!(matches!(
            MotionPhoto::parse(&sample_jpeg(32)),
            Err(Error::XmpNotFound)
        ));
    }

    #[cfg(feature = "xmp")]
    #[test]
    fn test_parse_offset_past_end() {
        let xml = crate::xmp::MotionPhotoXmp::new(1_000_000, 0)
            .with_thumbnail_length(10)
            .to_xml();
        let data = crate::jpeg::embed_xmp(&sample_jpeg(16), xml.as_bytes()).unwrap();

        assert!(matches!(
            MotionPhoto::parse(&data),
            Err(Error::InvalidSegment { offset: 1_000_000, .. })
        ));
    }
}
