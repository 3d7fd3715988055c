//! Event channels (triggers, digital lines) with timestamps.
//!
//! Each channel of each segment holds an [`EventValues`]: either a plain
//! numeric Arrow array of event times, or a struct array with named fields
//! where the `times` field carries the event times and other fields (for
//! example `duration`) ride along. Which one a channel uses is decided per
//! channel and per segment.

mod filter;

use std::{collections::BTreeMap, fmt};

use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, StructArray},
    datatypes::DataType,
};
use snafu::prelude::*;
use tracing::debug;

use crate::{
    error::{
        ExtractorResult, MissingTimesFieldSnafu, NonNumericEventValuesSnafu, UnknownChannelSnafu,
    },
    segment::check_segment_index,
};

/// Name of the struct field holding event times.
pub const TIMES_FIELD: &str = "times";

/// Values of one event channel in one segment.
#[derive(Debug, Clone)]
pub enum EventValues {
    /// Numeric array; each value is an event time.
    Plain(ArrayRef),
    /// Named fields, one of which is [`TIMES_FIELD`].
    Structured(StructArray),
}

fn ensure_numeric(data_type: &DataType) -> ExtractorResult<()> {
    ensure!(
        data_type.is_numeric(),
        NonNumericEventValuesSnafu {
            data_type: data_type.clone(),
        }
    );
    Ok(())
}

impl EventValues {
    /// Plain event times.
    ///
    /// # Errors
    ///
    /// `NonNumericEventValues` when `array` is not a numeric type.
    pub fn plain(array: ArrayRef) -> ExtractorResult<Self> {
        ensure_numeric(array.data_type())?;
        Ok(Self::Plain(array))
    }

    /// Structured events.
    ///
    /// # Errors
    ///
    /// `MissingTimesField` when `array` has no `times` field, and
    /// `NonNumericEventValues` when that field is not numeric.
    pub fn structured(array: StructArray) -> ExtractorResult<Self> {
        let times = array
            .column_by_name(TIMES_FIELD)
            .with_context(|| MissingTimesFieldSnafu {
                fields: struct_field_names(&array),
            })?;
        ensure_numeric(times.data_type())?;
        Ok(Self::Structured(array))
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        match self {
            Self::Plain(array) => array.len(),
            Self::Structured(array) => array.len(),
        }
    }

    /// True when there are no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for the named-fields variant.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Event times: the array itself when plain, the `times` field when
    /// structured.
    pub fn times(&self) -> Option<&ArrayRef> {
        match self {
            Self::Plain(array) => Some(array),
            Self::Structured(array) => array.column_by_name(TIMES_FIELD),
        }
    }

    /// A named field of structured events; `None` for plain values.
    pub fn field(&self, name: &str) -> Option<&ArrayRef> {
        match self {
            Self::Plain(_) => None,
            Self::Structured(array) => array.column_by_name(name),
        }
    }

    /// Field names; empty for plain values.
    pub fn field_names(&self) -> Vec<String> {
        match self {
            Self::Plain(_) => Vec::new(),
            Self::Structured(array) => struct_field_names(array),
        }
    }
}

fn struct_field_names(array: &StructArray) -> Vec<String> {
    array
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

impl From<Vec<i64>> for EventValues {
    fn from(times: Vec<i64>) -> Self {
        Self::Plain(std::sync::Arc::new(Int64Array::from(times)))
    }
}

impl From<Vec<f64>> for EventValues {
    fn from(times: Vec<f64>) -> Self {
        Self::Plain(std::sync::Arc::new(Float64Array::from(times)))
    }
}

/// Channels of one segment, keyed by channel name.
pub type EventChannels = BTreeMap<String, EventValues>;

/// Read contract shared by every event extractor.
pub trait EventSource {
    /// Channel ids.
    fn channel_ids(&self) -> &[String];

    /// Number of segments.
    fn num_segments(&self) -> usize;

    /// Events of `channel` in `segment_index`.
    ///
    /// With bounds, only events whose time satisfies
    /// `start_time <= t < end_time` are kept, in their original order. The
    /// result keeps the variant and Arrow data type of the source.
    fn get_event_times(
        &self,
        channel: &str,
        segment_index: usize,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> ExtractorResult<EventValues>;
}

/// Event extractor over in-memory arrays.
#[derive(Debug, Clone)]
pub struct NumpyEvent {
    channel_ids: Vec<String>,
    segments: Vec<EventChannels>,
}

impl NumpyEvent {
    /// Single segment.
    pub fn from_dict(channels: EventChannels) -> Self {
        Self::from_dict_list(vec![channels])
    }

    /// One segment per map. Channel ids are the keys of the first segment.
    pub fn from_dict_list(segments: Vec<EventChannels>) -> Self {
        let channel_ids: Vec<String> = segments
            .first()
            .map(|channels| channels.keys().cloned().collect())
            .unwrap_or_default();

        debug!(
            num_channels = channel_ids.len(),
            num_segments = segments.len(),
            "built in-memory events"
        );

        Self {
            channel_ids,
            segments,
        }
    }

    /// Events of `channel` in segment 0, unbounded.
    pub fn event_times(&self, channel: &str) -> ExtractorResult<EventValues> {
        self.get_event_times(channel, 0, None, None)
    }
}

impl EventSource for NumpyEvent {
    fn channel_ids(&self) -> &[String] {
        &self.channel_ids
    }

    fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn get_event_times(
        &self,
        channel: &str,
        segment_index: usize,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> ExtractorResult<EventValues> {
        check_segment_index(segment_index, self.segments.len())?;
        let values = self.segments[segment_index]
            .get(channel)
            .with_context(|| UnknownChannelSnafu {
                channel,
                segment_index,
            })?;
        filter::filter_by_time(values, start_time, end_time)
    }
}

impl fmt::Display for NumpyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NumpyEvent: {} channels - {} segments",
            self.channel_ids.len(),
            self.segments.len()
        )
    }
}
