//! Continuous voltage traces.
//!
//! [`RecordingSource`] is the read contract downstream code uses for any
//! recording: sampling frequency, channel ids, per-segment sample counts and
//! trace retrieval over a frame window. [`NumpyRecording`] implements it over
//! traces that are already in memory, one `samples × channels` matrix per
//! segment.
//!
//! The [`folder`] submodule saves any recording to a directory of Parquet
//! files and loads it back.

pub mod folder;

use std::fmt;

use ndarray::{Array2, Axis};
use snafu::prelude::*;
use tracing::debug;

use crate::{
    error::{
        ChannelCountMismatchSnafu, ChannelIdsMismatchSnafu, ChannelIndexOutOfRangeSnafu,
        ExtractorResult, NoChannelsSnafu, NoSegmentsSnafu, check_sampling_frequency,
    },
    segment::{check_segment_index, resolve_frame_range},
};

pub use folder::{
    SaveOptions, TraceCompression, load_recording_from_folder, save_recording_to_folder,
};

/// Read contract shared by every recording extractor.
pub trait RecordingSource {
    /// Sampling frequency in Hz.
    fn sampling_frequency(&self) -> f64;

    /// Channel ids, one per trace column.
    fn channel_ids(&self) -> &[String];

    /// Number of segments.
    fn num_segments(&self) -> usize;

    /// Number of samples in `segment_index`.
    fn num_samples(&self, segment_index: usize) -> ExtractorResult<usize>;

    /// Traces of `segment_index` in `[start_frame, end_frame)`, restricted to
    /// `channel_indices` when given. Shape is `(frames, channels)`.
    fn get_traces(
        &self,
        segment_index: usize,
        start_frame: Option<usize>,
        end_frame: Option<usize>,
        channel_indices: Option<&[usize]>,
    ) -> ExtractorResult<Array2<f64>>;

    /// Number of channels.
    fn num_channels(&self) -> usize {
        self.channel_ids().len()
    }

    /// Duration of all segments together, in seconds.
    fn total_duration(&self) -> ExtractorResult<f64> {
        let mut samples = 0usize;
        for segment_index in 0..self.num_segments() {
            samples += self.num_samples(segment_index)?;
        }
        Ok(samples as f64 / self.sampling_frequency())
    }
}

/// Recording over in-memory trace matrices.
#[derive(Debug, Clone)]
pub struct NumpyRecording {
    traces_list: Vec<Array2<f64>>,
    sampling_frequency: f64,
    channel_ids: Vec<String>,
}

impl NumpyRecording {
    /// Build a recording from one `samples × channels` matrix per segment.
    ///
    /// Channel ids default to `"0"`, `"1"`, ... in column order.
    ///
    /// # Errors
    ///
    /// Fails when `traces_list` is empty or has no channels, the sampling
    /// frequency is not a positive finite number, or segments disagree on the
    /// channel count.
    pub fn new(traces_list: Vec<Array2<f64>>, sampling_frequency: f64) -> ExtractorResult<Self> {
        let num_channels = traces_list.first().map_or(0, |t| t.ncols());
        let channel_ids = (0..num_channels).map(|c| c.to_string()).collect();
        Self::with_channel_ids(traces_list, sampling_frequency, channel_ids)
    }

    /// Build a recording with explicit channel ids.
    pub fn with_channel_ids(
        traces_list: Vec<Array2<f64>>,
        sampling_frequency: f64,
        channel_ids: Vec<String>,
    ) -> ExtractorResult<Self> {
        let sampling_frequency = check_sampling_frequency(sampling_frequency)?;
        let first = traces_list.first().context(NoSegmentsSnafu)?;
        let expected = first.ncols();
        ensure!(expected > 0, NoChannelsSnafu);

        for (segment_index, traces) in traces_list.iter().enumerate() {
            ensure!(
                traces.ncols() == expected,
                ChannelCountMismatchSnafu {
                    segment_index,
                    expected,
                    actual: traces.ncols(),
                }
            );
        }

        ensure!(
            channel_ids.len() == expected,
            ChannelIdsMismatchSnafu {
                expected,
                actual: channel_ids.len(),
            }
        );

        debug!(
            num_segments = traces_list.len(),
            num_channels = expected,
            sampling_frequency,
            "built in-memory recording"
        );

        Ok(Self {
            traces_list,
            sampling_frequency,
            channel_ids,
        })
    }

    /// `(num_samples, num_channels)` of one segment.
    pub fn shape(&self, segment_index: usize) -> ExtractorResult<(usize, usize)> {
        check_segment_index(segment_index, self.traces_list.len())?;
        Ok(self.traces_list[segment_index].dim())
    }

    /// Save to `folder`; see [`save_recording_to_folder`].
    pub fn save(
        &self,
        folder: impl AsRef<std::path::Path>,
        options: &SaveOptions,
    ) -> ExtractorResult<()> {
        save_recording_to_folder(self, folder.as_ref(), options)
    }
}

impl RecordingSource for NumpyRecording {
    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn channel_ids(&self) -> &[String] {
        &self.channel_ids
    }

    fn num_segments(&self) -> usize {
        self.traces_list.len()
    }

    fn num_samples(&self, segment_index: usize) -> ExtractorResult<usize> {
        check_segment_index(segment_index, self.traces_list.len())?;
        Ok(self.traces_list[segment_index].nrows())
    }

    fn get_traces(
        &self,
        segment_index: usize,
        start_frame: Option<usize>,
        end_frame: Option<usize>,
        channel_indices: Option<&[usize]>,
    ) -> ExtractorResult<Array2<f64>> {
        check_segment_index(segment_index, self.traces_list.len())?;
        let traces = &self.traces_list[segment_index];
        let frames = resolve_frame_range(start_frame, end_frame, traces.nrows())?;
        let window = traces.slice(ndarray::s![frames, ..]);

        match channel_indices {
            None => Ok(window.to_owned()),
            Some(indices) => {
                let num_channels = traces.ncols();
                for &channel_index in indices {
                    ensure!(
                        channel_index < num_channels,
                        ChannelIndexOutOfRangeSnafu {
                            channel_index,
                            num_channels,
                        }
                    );
                }
                Ok(window.select(Axis(1), indices))
            }
        }
    }
}

/// Writes `"{name}: {n} channels - {m} segments - {f}kHz - {d}s"`.
fn fmt_recording_summary(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    recording: &dyn RecordingSource,
) -> fmt::Result {
    let duration = recording.total_duration().map_err(|_| fmt::Error)?;
    write!(
        f,
        "{name}: {} channels - {} segments - {:.1}kHz - {:.3}s",
        recording.num_channels(),
        recording.num_segments(),
        recording.sampling_frequency() / 1000.0,
        duration
    )
}

impl fmt::Display for NumpyRecording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_recording_summary(f, "NumpyRecording", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractorError;
    use ndarray::{Array2, array};

    fn zero_segments(num_segments: usize, samples: usize, channels: usize) -> Vec<Array2<f64>> {
        (0..num_segments)
            .map(|_| Array2::zeros((samples, channels)))
            .collect()
    }

    #[test]
    fn preserves_segment_count_and_shape() -> ExtractorResult<()> {
        for sampling_frequency in [1.0, 1000.0, 30_000.0] {
            for num_segments in 1..4 {
                let rec =
                    NumpyRecording::new(zero_segments(num_segments, 1000, 5), sampling_frequency)?;
                assert_eq!(rec.num_segments(), num_segments);
                assert_eq!(rec.sampling_frequency(), sampling_frequency);
                for seg in 0..num_segments {
                    assert_eq!(rec.shape(seg)?, (1000, 5));
                    assert_eq!(rec.num_samples(seg)?, 1000);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn default_channel_ids_follow_column_order() -> ExtractorResult<()> {
        let rec = NumpyRecording::new(zero_segments(1, 10, 3), 30_000.0)?;
        assert_eq!(rec.channel_ids(), ["0", "1", "2"]);
        assert_eq!(rec.num_channels(), 3);
        Ok(())
    }

    #[test]
    fn rejects_empty_and_mismatched_segments() {
        assert!(matches!(
            NumpyRecording::new(Vec::new(), 30_000.0),
            Err(ExtractorError::NoSegments)
        ));

        assert!(matches!(
            NumpyRecording::new(zero_segments(2, 10, 0), 30_000.0),
            Err(ExtractorError::NoChannels)
        ));

        let traces = vec![Array2::zeros((10, 4)), Array2::zeros((10, 5))];
        assert!(matches!(
            NumpyRecording::new(traces, 30_000.0),
            Err(ExtractorError::ChannelCountMismatch {
                segment_index: 1,
                expected: 4,
                actual: 5
            })
        ));

        assert!(matches!(
            NumpyRecording::new(zero_segments(1, 10, 2), 0.0),
            Err(ExtractorError::InvalidSamplingFrequency { .. })
        ));

        assert!(matches!(
            NumpyRecording::with_channel_ids(zero_segments(1, 10, 2), 1.0, vec!["a".into()]),
            Err(ExtractorError::ChannelIdsMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn get_traces_slices_frames_and_channels() -> ExtractorResult<()> {
        let traces = array![[0.0, 1.0, 2.0], [10.0, 11.0, 12.0], [20.0, 21.0, 22.0]];
        let rec = NumpyRecording::new(vec![traces.clone()], 1000.0)?;

        assert_eq!(rec.get_traces(0, None, None, None)?, traces);
        assert_eq!(
            rec.get_traces(0, Some(1), Some(3), Some(&[2, 0]))?,
            array![[12.0, 10.0], [22.0, 20.0]]
        );

        assert!(matches!(
            rec.get_traces(0, None, None, Some(&[3])),
            Err(ExtractorError::ChannelIndexOutOfRange { .. })
        ));
        assert!(matches!(
            rec.get_traces(1, None, None, None),
            Err(ExtractorError::SegmentIndexOutOfRange { .. })
        ));
        Ok(())
    }

    #[test]
    fn display_summarizes_recording() -> ExtractorResult<()> {
        let rec = NumpyRecording::new(zero_segments(3, 1000, 5), 30_000.0)?;
        assert_eq!(
            rec.to_string(),
            "NumpyRecording: 5 channels - 3 segments - 30.0kHz - 0.100s"
        );
        Ok(())
    }
}
