//! Error types and SNAFU context selectors shared by every extractor.
//!
//! `ExtractorError` is the single error type of the public API. Selectors are
//! visible crate-wide so the recording, sorting and event modules attach
//! context without re-exporting them at the crate root.

use arrow::{datatypes::DataType, error::ArrowError};
use ndarray_npy::{ReadNpzError, WriteNpzError};
use parquet::errors::ParquetError;
use snafu::prelude::*;

use crate::storage::StorageError;

/// Result alias used throughout the crate.
pub type ExtractorResult<T> = Result<T, ExtractorError>;

/// Errors from building or reading extractors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExtractorError {
    /// Sampling frequency must be finite and strictly positive.
    #[snafu(display("Invalid sampling frequency {value} (expect a finite value > 0)"))]
    InvalidSamplingFrequency {
        /// The rejected value.
        value: f64,
    },

    /// A recording needs at least one segment.
    #[snafu(display("Recording has no segments"))]
    NoSegments,

    /// A recording needs at least one channel.
    #[snafu(display("Recording has no channels"))]
    NoChannels,

    /// A segment's channel count differs from the first segment.
    #[snafu(display(
        "Segment {segment_index} has {actual} channels, expected {expected}"
    ))]
    ChannelCountMismatch {
        /// Offending segment.
        segment_index: usize,
        /// Channel count of the first segment.
        expected: usize,
        /// Channel count found.
        actual: usize,
    },

    /// Supplied channel ids do not match the trace columns.
    #[snafu(display("Got {actual} channel ids for {expected} channels"))]
    ChannelIdsMismatch {
        /// Number of trace columns.
        expected: usize,
        /// Number of channel ids supplied.
        actual: usize,
    },

    /// Segment index past the last segment.
    #[snafu(display(
        "Segment index {segment_index} out of range (extractor has {num_segments} segments)"
    ))]
    SegmentIndexOutOfRange {
        /// Requested segment.
        segment_index: usize,
        /// Number of segments available.
        num_segments: usize,
    },

    /// Frame window outside `[0, num_samples]` or reversed.
    #[snafu(display(
        "Invalid frame range: start={start}, end={end} (segment has {num_samples} samples)"
    ))]
    InvalidFrameRange {
        /// Requested start frame.
        start: usize,
        /// Requested end frame (exclusive).
        end: usize,
        /// Samples in the segment.
        num_samples: usize,
    },

    /// Channel index past the last channel.
    #[snafu(display(
        "Channel index {channel_index} out of range (recording has {num_channels} channels)"
    ))]
    ChannelIndexOutOfRange {
        /// Requested channel index.
        channel_index: usize,
        /// Channels available.
        num_channels: usize,
    },

    /// Spike times and labels of one segment have different lengths.
    #[snafu(display(
        "Segment {segment_index}: {times} spike times but {labels} labels"
    ))]
    LengthMismatch {
        /// Offending segment.
        segment_index: usize,
        /// Number of spike times.
        times: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Different number of times and labels arrays.
    #[snafu(display("Got {times} times arrays but {labels} labels arrays"))]
    SegmentListMismatch {
        /// Number of times arrays.
        times: usize,
        /// Number of labels arrays.
        labels: usize,
    },

    /// Unit id not part of the sorting.
    #[snafu(display("Unknown unit id {unit_id}"))]
    UnknownUnit {
        /// Requested unit.
        unit_id: i64,
    },

    /// Event channel not present in the requested segment.
    #[snafu(display("Unknown event channel {channel} in segment {segment_index}"))]
    UnknownChannel {
        /// Requested channel.
        channel: String,
        /// Segment that was searched.
        segment_index: usize,
    },

    /// Plain event values or a `times` field with a non-numeric type.
    #[snafu(display("Event times must be numeric, got {data_type}"))]
    NonNumericEventValues {
        /// The rejected Arrow type.
        data_type: DataType,
    },

    /// Structured event values without a `times` field.
    #[snafu(display("Structured events have no `times` field (fields: {fields:?})"))]
    MissingTimesField {
        /// Fields that were present.
        fields: Vec<String>,
    },

    /// Arrow compute or construction error.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// Parquet read or write error.
    #[snafu(display("Parquet error: {source}"))]
    Parquet {
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// JSON encode or decode error for folder metadata.
    #[snafu(display("Metadata JSON error at {path}: {source}"))]
    Json {
        /// File being read or written.
        path: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Filesystem failure.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// Underlying storage error.
        #[snafu(source, backtrace)]
        source: StorageError,
    },

    /// NPZ archive could not be read.
    #[snafu(display("Failed to read NPZ sorting {path}: {source}"))]
    NpzRead {
        /// Archive path.
        path: String,
        /// Underlying ndarray-npy error.
        source: ReadNpzError,
    },

    /// NPZ archive could not be written.
    #[snafu(display("Failed to write NPZ sorting {path}: {source}"))]
    NpzWrite {
        /// Archive path.
        path: String,
        /// Underlying ndarray-npy error.
        source: WriteNpzError,
    },

    /// A required array is absent from the NPZ archive.
    #[snafu(display("NPZ sorting {path} has no `{key}` array"))]
    NpzMissingKey {
        /// Archive path.
        path: String,
        /// Missing key, without the `.npy` suffix.
        key: String,
    },

    /// An NPZ array has an unexpected shape or value.
    #[snafu(display("NPZ sorting {path} is malformed: {detail}"))]
    NpzShape {
        /// Archive path.
        path: String,
        /// What was wrong.
        detail: String,
    },

    /// A saved recording folder does not match its metadata.
    #[snafu(display("Recording folder {path} is malformed: {detail}"))]
    FolderFormat {
        /// Folder or file path.
        path: String,
        /// What was wrong.
        detail: String,
    },
}

/// Reject non-finite or non-positive sampling frequencies.
pub(crate) fn check_sampling_frequency(value: f64) -> ExtractorResult<f64> {
    ensure!(
        value.is_finite() && value > 0.0,
        InvalidSamplingFrequencySnafu { value }
    );
    Ok(value)
}
