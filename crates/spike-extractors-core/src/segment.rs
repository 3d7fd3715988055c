//! Segment index and frame window checks shared by every extractor.

use std::ops::Range;

use snafu::prelude::*;

use crate::error::{ExtractorResult, InvalidFrameRangeSnafu, SegmentIndexOutOfRangeSnafu};

/// Fail unless `segment_index < num_segments`.
pub(crate) fn check_segment_index(
    segment_index: usize,
    num_segments: usize,
) -> ExtractorResult<()> {
    ensure!(
        segment_index < num_segments,
        SegmentIndexOutOfRangeSnafu {
            segment_index,
            num_segments,
        }
    );
    Ok(())
}

/// Resolve optional `[start_frame, end_frame)` bounds against a segment
/// length. Missing bounds default to the whole segment.
pub(crate) fn resolve_frame_range(
    start_frame: Option<usize>,
    end_frame: Option<usize>,
    num_samples: usize,
) -> ExtractorResult<Range<usize>> {
    let start = start_frame.unwrap_or(0);
    let end = end_frame.unwrap_or(num_samples);
    ensure!(
        start <= end && end <= num_samples,
        InvalidFrameRangeSnafu {
            start,
            end,
            num_samples,
        }
    );
    Ok(start..end)
}

/// True when `frame` lies in the half-open window `[start, end)`; missing
/// bounds are unbounded.
pub(crate) fn frame_in_window(frame: i64, start: Option<i64>, end: Option<i64>) -> bool {
    start.is_none_or(|s| frame >= s) && end.is_none_or(|e| frame < e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractorError;

    #[test]
    fn segment_index_past_end_is_rejected() {
        assert!(check_segment_index(2, 3).is_ok());
        assert!(matches!(
            check_segment_index(3, 3),
            Err(ExtractorError::SegmentIndexOutOfRange {
                segment_index: 3,
                num_segments: 3
            })
        ));
    }

    #[test]
    fn frame_range_defaults_to_whole_segment() -> ExtractorResult<()> {
        assert_eq!(resolve_frame_range(None, None, 1000)?, 0..1000);
        assert_eq!(resolve_frame_range(Some(10), None, 1000)?, 10..1000);
        assert_eq!(resolve_frame_range(None, Some(5), 1000)?, 0..5);
        Ok(())
    }

    #[test]
    fn reversed_or_overlong_frame_range_is_rejected() {
        assert!(resolve_frame_range(Some(10), Some(5), 1000).is_err());
        assert!(resolve_frame_range(None, Some(1001), 1000).is_err());
    }

    #[test]
    fn window_is_half_open() {
        assert!(frame_in_window(10, Some(10), Some(20)));
        assert!(!frame_in_window(20, Some(10), Some(20)));
        assert!(frame_in_window(-5, None, None));
    }
}
