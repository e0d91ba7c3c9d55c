//! Offset convergence for the thumbnail trailer
//!
//! `MicroVideoOffset` must equal `video_length + thumbnail_with_xmp.len()`,
//! but the thumbnail's own XMP declares that offset, so its size depends on
//! how many digits the offset has. The solver iterates the build a bounded
//! number of times and stops when the thumbnail size stops changing.

use crate::{error::Result, jpeg::check_soi, xmp::MotionPhotoXmp};

/// Default bound on solver passes
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Solver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    /// Upper bound on build passes. Reaching it is not an error.
    pub max_iterations: usize,
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Result of [`solve_offset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergedOffset {
    /// Offset to declare in both cover and thumbnail XMP
    pub micro_video_offset: u64,
    /// Size of the thumbnail with XMP embedded, from the last pass
    pub thumbnail_length: u64,
    /// Number of build passes performed
    pub iterations: usize,
    /// Whether the last pass reproduced the previous size
    pub converged: bool,
}

/// Solve for the declared `MicroVideoOffset`.
///
/// Starts from `video_length` and feeds each pass's thumbnail size back into
/// the offset. When `max_iterations` runs out the last offset is accepted.
pub fn solve_offset(
    thumbnail: &[u8],
    video_length: u64,
    duration_ms: u64,
    options: &SolverOptions,
) -> Result<ConvergedOffset> {
    check_soi(thumbnail)?;

    let mut micro_video_offset = video_length;
    let mut thumbnail_length = 0u64;
    let mut previous = 0u64;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        let params =
            MotionPhotoXmp::new(video_length, duration_ms).with_micro_video_offset(micro_video_offset);
        thumbnail_length = params.embed_into(thumbnail)?.len() as u64;

        tracing::debug!(
            iteration = iterations,
            offset = micro_video_offset,
            thumbnail_length,
            "Offset solver pass"
        );

        if thumbnail_length == previous {
            converged = true;
            break;
        }
        previous = thumbnail_length;
        micro_video_offset = video_length + thumbnail_length;
    }

    if !converged {
        tracing::warn!(
            iterations,
            offset = micro_video_offset,
            "MicroVideoOffset did not converge, using last value"
        );
    }

    Ok(ConvergedOffset {
        micro_video_offset,
        thumbnail_length,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, test_utils::sample_jpeg};

    #[test]
    fn test_offset_is_self_consistent() {
        let thumbnail = sample_jpeg(300);
        let result = solve_offset(&thumbnail, 12_345, 1000, &SolverOptions::default()).unwrap();

        assert!(result.converged);
        assert_eq!(result.micro_video_offset, 12_345 + result.thumbnail_length);

        let rebuilt = MotionPhotoXmp::new(12_345, 1000)
            .with_micro_video_offset(result.micro_video_offset)
            .embed_into(&thumbnail)
            .unwrap();
        assert_eq!(rebuilt.len() as u64, result.thumbnail_length);
    }

    #[test]
    fn test_digit_boundary_converges() {
        // First pass declares 9 digits, the answer needs 10
        let thumbnail = sample_jpeg(500);
        let video_length = 999_999_994;
        let result =
            solve_offset(&thumbnail, video_length, 0, &SolverOptions::default()).unwrap();

        assert!(result.converged);
        assert!(result.iterations <= DEFAULT_MAX_ITERATIONS);
        assert_eq!(result.micro_video_offset, video_length + result.thumbnail_length);
        assert!(result.micro_video_offset >= 1_000_000_000);
    }

    #[test]
    fn test_small_video_converges_in_three_passes() {
        // Pass 1 declares 3 digits, pass 2 grows to 4, pass 3 confirms
        let result = solve_offset(&sample_jpeg(64), 100, 0, &SolverOptions::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_iteration_bound_is_not_an_error() {
        let thumbnail = sample_jpeg(64);
        let result =
            solve_offset(&thumbnail, 100, 0, &SolverOptions::new().max_iterations(1)).unwrap();

        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        assert_eq!(result.micro_video_offset, 100 + result.thumbnail_length);
    }

    #[test]
    fn test_zero_iterations() {
        let result =
            solve_offset(&sample_jpeg(16), 77, 0, &SolverOptions::new().max_iterations(0)).unwrap();
        assert_eq!(result.micro_video_offset, 77);
        assert_eq!(result.thumbnail_length, 0);
        assert!(!result.converged);
    }

    #[test]
    fn test_rejects_non_jpeg_thumbnail() {
        let err = solve_offset(&[0x00, 0x00], 10, 0, &SolverOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
