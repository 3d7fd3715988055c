use std::num::{ParseFloatError, ParseIntError};

use snafu::Snafu;
use spike_extractors_core::ExtractorError;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display(
        "Failed to load recording folder {folder}. \
         Ensure it was written by `save_recording_to_folder`."
    ))]
    LoadRecording {
        folder: String,
        #[snafu(source(from(ExtractorError, Box::new)))]
        source: Box<ExtractorError>,
    },

    #[snafu(display("Failed to read NPZ sorting {path}"))]
    OpenSorting {
        path: String,
        #[snafu(source(from(ExtractorError, Box::new)))]
        source: Box<ExtractorError>,
    },

    #[snafu(display("Failed to build sorting from --times/--labels"))]
    BuildSorting {
        #[snafu(source(from(ExtractorError, Box::new)))]
        source: Box<ExtractorError>,
    },

    #[snafu(display("Failed to write NPZ sorting {path}"))]
    WriteSorting {
        path: String,
        #[snafu(source(from(ExtractorError, Box::new)))]
        source: Box<ExtractorError>,
    },

    #[snafu(display("Invalid integer '{value}' in --{flag}: {source}"))]
    InvalidInteger {
        flag: &'static str,
        value: String,
        source: ParseIntError,
    },

    #[snafu(display("Invalid --sampling-frequency '{value}': {source}"))]
    InvalidFrequency {
        value: String,
        source: ParseFloatError,
    },
}
