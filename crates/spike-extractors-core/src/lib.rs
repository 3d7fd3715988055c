//! In-memory and file-backed extractors for electrophysiology data.
//!
//! Three kinds of data share one shape: a list of independently indexed
//! segments, read through a small trait.
//!
//! - Continuous traces: [`RecordingSource`], implemented by
//!   [`NumpyRecording`] over `ndarray` matrices (`recording` module). Any
//!   recording can be saved to a folder of Parquet files and loaded back
//!   (`recording::folder`).
//! - Spike sortings: [`SortingSource`], implemented by [`NumpySorting`] in
//!   memory and by [`NpzSortingExtractor`] over NumPy `.npz` archives
//!   (`sorting` module).
//! - Event channels: [`EventSource`], implemented by [`NumpyEvent`] over
//!   Arrow arrays, with [`EventValues`] distinguishing plain event times
//!   from structured events (`event` module).
//!
//! Filesystem access goes through the `storage` module, which writes every
//! file atomically.
#![deny(missing_docs)]

pub mod error;
pub mod event;
pub mod prelude;
pub mod recording;
mod segment;
pub mod sorting;
pub mod storage;

pub use error::{ExtractorError, ExtractorResult};
pub use event::{EventChannels, EventSource, EventValues, NumpyEvent};
pub use recording::{
    NumpyRecording, RecordingSource, SaveOptions, TraceCompression, load_recording_from_folder,
    save_recording_to_folder,
};
pub use sorting::{
    NpzSortingExtractor, NumpySorting, SortingSource, UnitSpikeTrains, write_sorting_npz,
};
