//! Assemble and read motion photos.
//!
//! A motion photo is a JPEG that carries a short video clip after its own
//! image data, plus XMP metadata telling motion-photo-aware galleries where
//! that clip starts. This crate builds such files from an already-encoded
//! cover JPEG, video clip and thumbnail JPEG, all held in memory.
//!
//! # Layout
//!
//! ```text
//! [cover JPEG + APP1 XMP][video bytes][thumbnail JPEG + APP1 XMP]
//! ```
//!
//! The XMP declares `GCamera:MicroVideoOffset`, the distance from end of file
//! back to the first video byte. Because the thumbnail's own XMP also holds
//! that number, its size depends on the value being declared; the offset is
//! found by a short bounded iteration (see [`solver`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use motion_photo::assemble_motion_photo;
//!
//! # fn main() -> motion_photo::Result<()> {
//! let cover = std::fs::read("cover.jpg")?;
//! let video = std::fs::read("clip.mp4")?;
//! let thumbnail = std::fs::read("thumb.jpg")?;
//!
//! let photo = assemble_motion_photo(&cover, &video, &thumbnail, 3000)?;
//! std::fs::write("motion.jpg", photo)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Options and streaming
//!
//! ```no_run
//! use motion_photo::{AssembleOptions, MotionPhotoParts};
//! use std::fs::File;
//!
//! # fn main() -> motion_photo::Result<()> {
//! # let (cover, video, thumbnail) = (Vec::<u8>::new(), Vec::<u8>::new(), Vec::<u8>::new());
//! let parts = MotionPhotoParts::new(&cover, &video, &thumbnail, 3000);
//! let options = AssembleOptions::new().max_iterations(8);
//!
//! let mut output = File::create("motion.jpg")?;
//! parts.write_to(&mut output, &options)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Reading
//!
//! With the `xmp` feature (on by default) an assembled file can be split back
//! into its parts:
//!
//! ```no_run
//! # fn main() -> motion_photo::Result<()> {
//! use motion_photo::MotionPhoto;
//!
//! let data = std::fs::read("motion.jpg")?;
//! let photo = MotionPhoto::parse(&data)?;
//! std::fs::write("clip.mp4", photo.video())?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod jpeg;
mod motion_photo;
pub mod solver;
pub mod xmp;

pub use error::{Error, Result};
pub use jpeg::{
    find_insertion_point, insert_segment, package_xmp_segment, MarkerSegment, MarkerSegments,
    MAX_SEGMENT_LENGTH, XMP_SIGNATURE,
};
#[cfg(feature = "xmp")]
pub use motion_photo::MotionPhoto;
pub use motion_photo::{
    assemble_motion_photo, AssembleOptions, MotionPhotoParts, PreparedParts,
    MOTION_PHOTO_EXTENSION, MOTION_PHOTO_MIME,
};
pub use solver::{solve_offset, ConvergedOffset, SolverOptions, DEFAULT_MAX_ITERATIONS};
#[cfg(feature = "xmp")]
pub use xmp::MotionPhotoMetadata;
pub use xmp::MotionPhotoXmp;

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
