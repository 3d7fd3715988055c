//! Spike sortings: per-unit spike trains, per segment.
//!
//! [`SortingSource`] is the read contract every sorting implements, whether
//! held in memory ([`NumpySorting`]) or backed by a file
//! ([`npz::NpzSortingExtractor`]). [`NumpySorting::from_extractor`] copies any
//! source into memory through that contract.

pub mod npz;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use snafu::prelude::*;
use tracing::debug;

use crate::{
    error::{
        ExtractorResult, LengthMismatchSnafu, SegmentListMismatchSnafu, UnknownUnitSnafu,
        check_sampling_frequency,
    },
    segment::{check_segment_index, frame_in_window},
};

pub use npz::{NpzSortingExtractor, write_sorting_npz};

/// Spike trains of one segment, keyed by unit id.
pub type UnitSpikeTrains = BTreeMap<i64, Vec<i64>>;

/// Read contract shared by every sorting extractor.
pub trait SortingSource {
    /// Sampling frequency in Hz.
    fn sampling_frequency(&self) -> f64;

    /// Unit ids.
    fn unit_ids(&self) -> &[i64];

    /// Number of segments.
    fn num_segments(&self) -> usize;

    /// Spike frames of `unit_id` in `segment_index`, restricted to
    /// `[start_frame, end_frame)` when bounds are given. Order is preserved.
    fn get_unit_spike_train(
        &self,
        unit_id: i64,
        segment_index: usize,
        start_frame: Option<i64>,
        end_frame: Option<i64>,
    ) -> ExtractorResult<Vec<i64>>;

    /// Number of units.
    fn num_units(&self) -> usize {
        self.unit_ids().len()
    }

    /// Total spikes per unit across all segments.
    fn count_num_spikes_per_unit(&self) -> ExtractorResult<BTreeMap<i64, usize>> {
        let mut counts = BTreeMap::new();
        for &unit_id in self.unit_ids() {
            let mut total = 0;
            for segment_index in 0..self.num_segments() {
                total += self
                    .get_unit_spike_train(unit_id, segment_index, None, None)?
                    .len();
            }
            counts.insert(unit_id, total);
        }
        Ok(counts)
    }
}

/// Sorting held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct NumpySorting {
    sampling_frequency: f64,
    unit_ids: Vec<i64>,
    segments: Vec<UnitSpikeTrains>,
}

impl NumpySorting {
    /// Empty sorting with the given units and no segments.
    ///
    /// Unit ids are sorted and deduplicated. An empty list is valid.
    pub fn new(
        sampling_frequency: f64,
        unit_ids: impl IntoIterator<Item = i64>,
    ) -> ExtractorResult<Self> {
        let sampling_frequency = check_sampling_frequency(sampling_frequency)?;
        let unit_ids: Vec<i64> = unit_ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(Self {
            sampling_frequency,
            unit_ids,
            segments: Vec::new(),
        })
    }

    /// Append a segment. Units absent from `trains` get an empty train.
    ///
    /// # Errors
    ///
    /// [`ExtractorError::UnknownUnit`](crate::ExtractorError::UnknownUnit)
    /// when `trains` names a unit this sorting does not have.
    pub fn add_segment(&mut self, mut trains: UnitSpikeTrains) -> ExtractorResult<()> {
        if let Some(&unit_id) = trains.keys().find(|id| self.unit_ids.binary_search(id).is_err()) {
            return UnknownUnitSnafu { unit_id }.fail();
        }
        for &unit_id in &self.unit_ids {
            trains.entry(unit_id).or_default();
        }
        self.segments.push(trains);
        Ok(())
    }

    /// One segment from parallel spike `times` (frames) and unit `labels`.
    pub fn from_times_labels(
        times: &[i64],
        labels: &[i64],
        sampling_frequency: f64,
    ) -> ExtractorResult<Self> {
        Self::from_times_labels_multi(&[times], &[labels], sampling_frequency)
    }

    /// One segment per `(times, labels)` pair.
    ///
    /// Unit ids are the sorted unique labels across every segment.
    pub fn from_times_labels_multi<T, L>(
        times_list: &[T],
        labels_list: &[L],
        sampling_frequency: f64,
    ) -> ExtractorResult<Self>
    where
        T: AsRef<[i64]>,
        L: AsRef<[i64]>,
    {
        ensure!(
            times_list.len() == labels_list.len(),
            SegmentListMismatchSnafu {
                times: times_list.len(),
                labels: labels_list.len(),
            }
        );

        let mut unit_ids = BTreeSet::new();
        for (segment_index, (times, labels)) in times_list.iter().zip(labels_list).enumerate() {
            let (times, labels) = (times.as_ref(), labels.as_ref());
            ensure!(
                times.len() == labels.len(),
                LengthMismatchSnafu {
                    segment_index,
                    times: times.len(),
                    labels: labels.len(),
                }
            );
            unit_ids.extend(labels.iter().copied());
        }

        let mut sorting = Self::new(sampling_frequency, unit_ids)?;
        for (times, labels) in times_list.iter().zip(labels_list) {
            let mut trains = UnitSpikeTrains::new();
            for (&frame, &label) in times.as_ref().iter().zip(labels.as_ref()) {
                trains.entry(label).or_default().push(frame);
            }
            sorting.add_segment(trains)?;
        }

        debug!(
            num_units = sorting.unit_ids.len(),
            num_segments = sorting.segments.len(),
            "built sorting from times/labels"
        );
        Ok(sorting)
    }

    /// One segment per map of unit id to spike train.
    ///
    /// Unit ids are the union of the keys of every segment.
    pub fn from_unit_dict(
        segments: Vec<UnitSpikeTrains>,
        sampling_frequency: f64,
    ) -> ExtractorResult<Self> {
        let unit_ids: BTreeSet<i64> = segments.iter().flat_map(|s| s.keys().copied()).collect();
        let mut sorting = Self::new(sampling_frequency, unit_ids)?;
        for trains in segments {
            sorting.add_segment(trains)?;
        }
        Ok(sorting)
    }

    /// Copy every spike train of `source` into memory.
    pub fn from_extractor(source: &dyn SortingSource) -> ExtractorResult<Self> {
        let mut sorting =
            Self::new(source.sampling_frequency(), source.unit_ids().iter().copied())?;
        for segment_index in 0..source.num_segments() {
            let mut trains = UnitSpikeTrains::new();
            for &unit_id in source.unit_ids() {
                let train = source.get_unit_spike_train(unit_id, segment_index, None, None)?;
                trains.insert(unit_id, train);
            }
            sorting.add_segment(trains)?;
        }

        debug!(
            num_units = sorting.unit_ids.len(),
            num_segments = sorting.segments.len(),
            "copied sorting from extractor"
        );
        Ok(sorting)
    }
}

impl SortingSource for NumpySorting {
    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn unit_ids(&self) -> &[i64] {
        &self.unit_ids
    }

    fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn get_unit_spike_train(
        &self,
        unit_id: i64,
        segment_index: usize,
        start_frame: Option<i64>,
        end_frame: Option<i64>,
    ) -> ExtractorResult<Vec<i64>> {
        check_segment_index(segment_index, self.segments.len())?;
        let train = self.segments[segment_index]
            .get(&unit_id)
            .context(UnknownUnitSnafu { unit_id })?;
        Ok(train
            .iter()
            .copied()
            .filter(|&frame| frame_in_window(frame, start_frame, end_frame))
            .collect())
    }
}

/// Writes `"{name}: {n} units - {m} segments - {f}kHz"`.
pub(crate) fn fmt_sorting_summary(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    sorting: &dyn SortingSource,
) -> fmt::Result {
    write!(
        f,
        "{name}: {} units - {} segments - {:.1}kHz",
        sorting.num_units(),
        sorting.num_segments(),
        sorting.sampling_frequency() / 1000.0
    )
}

impl fmt::Display for NumpySorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_sorting_summary(f, "NumpySorting", self)
    }
}
