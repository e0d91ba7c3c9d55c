//! Motion photo XMP
//!
//! Builds the XMP packet that motion-photo-aware galleries look for, and (with
//! the `xmp` feature) reads the relevant values back out.
//!
//! The document is a fixed dialect:
//! - `rdf:Description` carries the `GCamera:MicroVideo*` attributes, where
//!   `MicroVideoOffset` is the byte distance from end of file back to the
//!   start of the embedded video
//! - a `Container:Directory` lists exactly two items, `Primary` and `GainMap`,
//!   both `image/jpeg`, the second with an explicit `Item:Length`
//!
//! Namespace URIs and attribute names must match byte for byte.

use crate::error::Result;

pub const NS_X: &str = "adobe:ns:meta/";
pub const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const NS_HDRGM: &str = "http://ns.adobe.com/hdr-gain-map/1.0/";
pub const NS_CONTAINER: &str = "http://ns.google.com/photos/1.0/container/";
pub const NS_ITEM: &str = "http://ns.google.com/photos/1.0/container/item/";
pub const NS_GCAMERA: &str = "http://ns.google.com/photos/1.0/camera/";

const XMP_TOOLKIT: &str = "Adobe XMP Core 5.1.0-jc003";
const ITEM_MIME: &str = "image/jpeg";

/// Parameters of one motion photo XMP document.
///
/// `micro_video_offset` and `thumbnail_length` both fall back to
/// `video_length` when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionPhotoXmp {
    /// Byte count of the embedded video
    pub video_length: u64,
    /// Playback duration in milliseconds (not rendered)
    pub duration_ms: u64,
    /// Distance from end of file back to the start of the video
    pub micro_video_offset: Option<u64>,
    /// Byte count of the trailing GainMap item
    pub thumbnail_length: Option<u64>,
}

impl MotionPhotoXmp {
    pub fn new(video_length: u64, duration_ms: u64) -> Self {
        Self {
            video_length,
            duration_ms,
            micro_video_offset: None,
            thumbnail_length: None,
        }
    }

    pub fn with_micro_video_offset(mut self, offset: u64) -> Self {
        self.micro_video_offset = Some(offset);
        self
    }

    pub fn with_thumbnail_length(mut self, length: u64) -> Self {
        self.thumbnail_length = Some(length);
        self
    }

    /// Offset value that will be written
    pub fn declared_offset(&self) -> u64 {
        self.micro_video_offset.unwrap_or(self.video_length)
    }

    /// GainMap length value that will be written
    pub fn declared_thumbnail_length(&self) -> u64 {
        self.thumbnail_length.unwrap_or(self.video_length)
    }

    /// Render the XMP document.
    pub fn to_xml(&self) -> String {
        let lines = [
            format!(r#"<x:xmpmeta xmlns:x="{NS_X}" x:xmptk="{XMP_TOOLKIT}">"#),
            format!(r#"  <rdf:RDF xmlns:rdf="{NS_RDF}">"#),
            r#"    <rdf:Description rdf:about="""#.to_string(),
            format!(r#"        xmlns:hdrgm="{NS_HDRGM}""#),
            format!(r#"        xmlns:Container="{NS_CONTAINER}""#),
            format!(r#"        xmlns:Item="{NS_ITEM}""#),
            format!(r#"        xmlns:GCamera="{NS_GCAMERA}""#),
            r#"      hdrgm:Version="1.0""#.to_string(),
            r#"      GCamera:MicroVideoVersion="1""#.to_string(),
            r#"      GCamera:MicroVideo="1""#.to_string(),
            format!(
                r#"      GCamera:MicroVideoOffset="{}""#,
                self.declared_offset()
            ),
            r#"      GCamera:MicroVideoPresentationTimestampUs="0">"#.to_string(),
            "      <Container:Directory>".to_string(),
            "        <rdf:Seq>".to_string(),
            r#"          <rdf:li rdf:parseType="Resource">"#.to_string(),
            "            <Container:Item".to_string(),
            r#"              Item:Semantic="Primary""#.to_string(),
            format!(r#"              Item:Mime="{ITEM_MIME}"/>"#),
            "          </rdf:li>".to_string(),
            r#"          <rdf:li rdf:parseType="Resource">"#.to_string(),
            "            <Container:Item".to_string(),
            r#"              Item:Semantic="GainMap""#.to_string(),
            format!(r#"              Item:Mime="{ITEM_MIME}""#),
            format!(
                r#"              Item:Length="{}"/>"#,
                self.declared_thumbnail_length()
            ),
            "          </rdf:li>".to_string(),
            "        </rdf:Seq>".to_string(),
            "      </Container:Directory>".to_string(),
            "    </rdf:Description>".to_string(),
            "  </rdf:RDF>".to_string(),
            "</x:xmpmeta>".to_string(),
        ];
        lines.join("\n")
    }

    /// Build this document and embed it into `jpeg` as an APP1 segment.
    pub fn embed_into(&self, jpeg: &[u8]) -> Result<Vec<u8>> {
        crate::jpeg::embed_xmp(jpeg, self.to_xml().as_bytes())
    }
}

#[cfg(feature = "xmp")]
pub use reader::MotionPhotoMetadata;

#[cfg(feature = "xmp")]
mod reader {
    use crate::error::{Error, Result};
    use quick_xml::{events::Event, name::QName, Reader};

    const RDF_DESCRIPTION: &[u8] = b"rdf:Description";
    const CONTAINER_ITEM: &[u8] = b"Container:Item";

    /// Motion photo values read back from an XMP document
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MotionPhotoMetadata {
        /// `GCamera:MicroVideo` was `"1"`
        pub micro_video: bool,
        /// `GCamera:MicroVideoOffset`
        pub micro_video_offset: u64,
        /// `Item:Length` of the `GainMap` item, if listed
        pub gain_map_length: Option<u64>,
    }

    impl MotionPhotoMetadata {
        /// Parse an XMP document.
        ///
        /// Returns `Ok(None)` for well-formed XMP that does not declare a
        /// `GCamera:MicroVideoOffset`.
        pub fn parse(xmp: &str) -> Result<Option<Self>> {
            let mut reader = Reader::from_str(xmp);
            reader.config_mut().trim_text(true);

            let mut micro_video = false;
            let mut offset = None;
            let mut gain_map_length = None;

            loop {
                match reader.read_event()? {
                    Event::Start(ref e) | Event::Empty(ref e) => {
                        if e.name() == QName(RDF_DESCRIPTION) {
                            for attr in e.attributes() {
                                let attr = attr.map_err(|e| Error::InvalidSegment {
                                    offset: reader.buffer_position() as u64,
                                    reason: format!("XMP attribute error: {}", e),
                                })?;
                                match attr.key.as_ref() {
                                    b"GCamera:MicroVideo" => {
                                        micro_video = &*attr.value == b"1"
                                    }
                                    b"GCamera:MicroVideoOffset" => {
                                        let position = reader.buffer_position() as u64;
                                        offset = Some(parse_u64(&attr.value, position)?)
                                    }
                                    _ => {}
                                }
                            }
                        } else if e.name() == QName(CONTAINER_ITEM) {
                            let mut semantic = None;
                            let mut length = None;
                            for attr in e.attributes() {
                                let attr = attr.map_err(|e| Error::InvalidSegment {
                                    offset: reader.buffer_position() as u64,
                                    reason: format!("XMP attribute error: {}", e),
                                })?;
                                match attr.key.as_ref() {
                                    b"Item:Semantic" => semantic = Some(attr.value.into_owned()),
                                    b"Item:Length" => {
                                        let position = reader.buffer_position() as u64;
                                        length = Some(parse_u64(&attr.value, position)?)
                                    }
                                    _ => {}
                                }
                            }
                            if semantic.as_deref() == Some(&b"GainMap"[..]) {
                                gain_map_length = length;
                            }
                        }
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }

            Ok(offset.map(|micro_video_offset| Self {
                micro_video,
                micro_video_offset,
                gain_map_length,
            }))
        }
    }

    // `position` is the reader's byte position within the XMP document
    fn parse_u64(value: &[u8], position: u64) -> Result<u64> {
        std::str::from_utf8(value)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| Error::InvalidSegment {
                offset: position,
                reason: format!(
                    "Invalid numeric XMP value: {:?}",
                    String::from_utf8_lossy(value)
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_text() {
        let xml = MotionPhotoXmp::new(1234, 3000)
            .with_micro_video_offset(5678)
            .with_thumbnail_length(444)
            .to_xml();

        assert!(xml.starts_with(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Adobe XMP Core 5.1.0-jc003">"#
        ));
        assert!(xml.ends_with("</x:xmpmeta>"));
        assert!(xml.contains(r#"xmlns:GCamera="http://ns.google.com/photos/1.0/camera/""#));
        assert!(xml.contains(r#"xmlns:Container="http://ns.google.com/photos/1.0/container/""#));
        assert!(xml.contains(r#"xmlns:Item="http://ns.google.com/photos/1.0/container/item/""#));
        assert!(xml.contains(r#"xmlns:hdrgm="http://ns.adobe.com/hdr-gain-map/1.0/""#));
        assert!(xml.contains(r#"GCamera:MicroVideoVersion="1""#));
        assert!(xml.contains(r#"GCamera:MicroVideo="1""#));
        assert!(xml.contains(r#"GCamera:MicroVideoOffset="5678""#));
        assert!(xml.contains(r#"GCamera:MicroVideoPresentationTimestampUs="0">"#));
        assert!(xml.contains(r#"Item:Length="444"/>"#));
        assert!(!xml.contains("3000"));
    }

    #[test]
    fn test_item_order() {
        let xml = MotionPhotoXmp::new(10, 0).to_xml();
        let primary = xml.find(r#"Item:Semantic="Primary""#).unwrap();
        let gain_map = xml.find(r#"Item:Semantic="GainMap""#).unwrap();
        assert!(primary < gain_map);
        assert_eq!(xml.matches(r#"Item:Mime="image/jpeg""#).count(), 2);
        assert_eq!(xml.matches("<Container:Item").count(), 2);
    }

    #[test]
    fn test_defaults_fall_back_to_video_length() {
        let xml = MotionPhotoXmp::new(987, 0).to_xml();
        assert!(xml.contains(r#"GCamera:MicroVideoOffset="987""#));
        assert!(xml.contains(r#"Item:Length="987"/>"#));
    }

    #[test]
    fn test_line_structure() {
        let xml = MotionPhotoXmp::new(1, 0).to_xml();
        assert_eq!(xml.lines().count(), 30);
        assert!(!xml.ends_with('\n'));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let params = MotionPhotoXmp::new(42, 1500).with_micro_video_offset(99);
        assert_eq!(params.to_xml(), params.to_xml());
    }

    #[cfg(feature = "xmp")]
    #[test]
    fn test_parse_own_document() {
        let xml = MotionPhotoXmp::new(1000, 0)
            .with_micro_video_offset(2500)
            .with_thumbnail_length(1500)
            .to_xml();
        let meta = MotionPhotoMetadata::parse(&xml).unwrap().unwrap();
        assert!(meta.micro_video);
        assert_eq!(meta.micro_video_offset, 2500);
        assert_eq!(meta.gain_map_length, Some(1500));
    }

    #[cfg(feature = "xmp")]
    #[test]
    fn test_parse_unrelated_xmp() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
    <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
        <rdf:Description rdf:about="" dc:format="image/jpeg"/>
    </rdf:RDF>
</x:xmpmeta>"#;
        assert_eq!(MotionPhotoMetadata::parse(xml).unwrap(), None);
    }

    #[cfg(feature = "xmp")]
    #[test]
    fn test_parse_rejects_bad_number() {
        let xml = r#"<rdf:Description GCamera:MicroVideoOffset="lots"/>"#;
        assert!(matches!(
            MotionPhotoMetadata::parse(xml),
            Err(crate::Error::InvalidSegment { .. })
        ));
    }

    #[cfg(feature = "xmp")]
    #[test]
    fn test_parse_reports_bad_attribute_as_segment_error() {
        let xml = r#"<rdf:Description GCamera:MicroVideo="1" GCamera:MicroVideo="1"/>"#;
        assert!(matches!(
            MotionPhotoMetadata::parse(xml),
            Err(crate::Error::InvalidSegment { .. })
        ));
    }
}
