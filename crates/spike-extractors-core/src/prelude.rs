//! Convenience prelude.
//!
//! Brings the extractor types and their read traits into scope, so trait
//! methods such as `num_segments` resolve without extra imports.

pub use crate::{
    EventChannels, EventSource, EventValues, ExtractorError, ExtractorResult, NpzSortingExtractor,
    NumpyEvent, NumpyRecording, NumpySorting, RecordingSource, SaveOptions, SortingSource,
    TraceCompression, UnitSpikeTrains, load_recording_from_folder, save_recording_to_folder,
    write_sorting_npz,
};
