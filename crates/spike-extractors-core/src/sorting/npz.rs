//! NPZ-backed sortings.
//!
//! Layout of the archive (one `.npy` member per key):
//!
//! | key                    | dtype   | shape         |
//! |------------------------|---------|---------------|
//! | `unit_ids`             | int64   | (num_units,)  |
//! | `num_segment`          | int64   | (1,)          |
//! | `sampling_frequency`   | float64 | (1,)          |
//! | `spike_indexes_seg{i}` | int64   | (n_i,)        |
//! | `spike_labels_seg{i}`  | int64   | (n_i,)        |
//!
//! Spike `i` of segment `s` fired at frame `spike_indexes_seg{s}[i]` and
//! belongs to unit `spike_labels_seg{s}[i]`.

use std::{
    fmt,
    io::Cursor,
    path::{Path, PathBuf},
};

use ndarray::Array1;
use ndarray_npy::{NpzReader, NpzWriter};
use snafu::prelude::*;
use tracing::info;

use crate::{
    error::{
        ExtractorResult, NpzMissingKeySnafu, NpzReadSnafu, NpzShapeSnafu, NpzWriteSnafu,
        StorageSnafu, UnknownUnitSnafu, check_sampling_frequency,
    },
    segment::{check_segment_index, frame_in_window},
    sorting::{SortingSource, fmt_sorting_summary},
    storage,
};

const UNIT_IDS: &str = "unit_ids";
const NUM_SEGMENT: &str = "num_segment";
const SAMPLING_FREQUENCY: &str = "sampling_frequency";

fn spike_indexes_key(segment_index: usize) -> String {
    format!("spike_indexes_seg{segment_index}")
}

fn spike_labels_key(segment_index: usize) -> String {
    format!("spike_labels_seg{segment_index}")
}

/// One segment as stored in the archive.
#[derive(Debug, Clone)]
struct NpzSegment {
    spike_indexes: Vec<i64>,
    spike_labels: Vec<i64>,
}

/// Sorting read from an NPZ archive.
///
/// The archive is read completely when opened; spike trains are then
/// selected from the flat index/label arrays on each request.
#[derive(Debug, Clone)]
pub struct NpzSortingExtractor {
    path: PathBuf,
    sampling_frequency: f64,
    unit_ids: Vec<i64>,
    segments: Vec<NpzSegment>,
}

struct ArchiveReader<'a> {
    path: &'a Path,
    names: Vec<String>,
    npz: NpzReader<Cursor<Vec<u8>>>,
}

impl<'a> ArchiveReader<'a> {
    fn open(path: &'a Path) -> ExtractorResult<Self> {
        let bytes = storage::read_all_bytes(path).context(StorageSnafu)?;
        let mut npz = NpzReader::new(Cursor::new(bytes)).context(NpzReadSnafu {
            path: path.display().to_string(),
        })?;
        let names = npz.names().context(NpzReadSnafu {
            path: path.display().to_string(),
        })?;
        Ok(Self { path, names, npz })
    }

    /// NumPy stores `key` as `key.npy`; `names()` may report either spelling.
    fn member_name(&self, key: &str) -> ExtractorResult<String> {
        let with_suffix = format!("{key}.npy");
        self.names
            .iter()
            .find(|name| **name == with_suffix || *name == key)
            .cloned()
            .with_context(|| NpzMissingKeySnafu {
                path: self.path.display().to_string(),
                key,
            })
    }

    fn read_i64(&mut self, key: &str) -> ExtractorResult<Vec<i64>> {
        let name = self.member_name(key)?;
        let array: Array1<i64> = self.npz.by_name(&name).context(NpzReadSnafu {
            path: self.path.display().to_string(),
        })?;
        Ok(array.to_vec())
    }

    fn read_f64(&mut self, key: &str) -> ExtractorResult<Vec<f64>> {
        let name = self.member_name(key)?;
        let array: Array1<f64> = self.npz.by_name(&name).context(NpzReadSnafu {
            path: self.path.display().to_string(),
        })?;
        Ok(array.to_vec())
    }

    /// Number of `spike_indexes_seg{i}` members in the archive.
    fn count_segment_members(&self) -> usize {
        self.names
            .iter()
            .filter(|name| name.starts_with("spike_indexes_seg"))
            .count()
    }

    fn shape_error(&self, detail: String) -> crate::ExtractorError {
        NpzShapeSnafu {
            path: self.path.display().to_string(),
            detail,
        }
        .build()
    }
}

impl NpzSortingExtractor {
    /// Read the archive at `path`.
    ///
    /// # Errors
    ///
    /// Storage errors when the file cannot be read, `NpzRead` when it is not
    /// a valid archive, `NpzMissingKey`/`NpzShape` when the layout does not
    /// match the table above.
    pub fn open(path: impl AsRef<Path>) -> ExtractorResult<Self> {
        let path = path.as_ref();
        let mut archive = ArchiveReader::open(path)?;

        let unit_ids = archive.read_i64(UNIT_IDS)?;
        let num_segment = match archive.read_i64(NUM_SEGMENT)?.first() {
            Some(&n) => usize::try_from(n)
                .map_err(|_| archive.shape_error(format!("num_segment is {n}")))?,
            None => return Err(archive.shape_error("num_segment is empty".into())),
        };
        let stored = archive.count_segment_members();
        if num_segment > stored {
            return Err(archive.shape_error(format!(
                "num_segment is {num_segment} but only {stored} segments are stored"
            )));
        }
        let sampling_frequency = match archive.read_f64(SAMPLING_FREQUENCY)?.first() {
            Some(&f) => check_sampling_frequency(f)?,
            None => return Err(archive.shape_error("sampling_frequency is empty".into())),
        };

        let mut segments = Vec::with_capacity(num_segment);
        for segment_index in 0..num_segment {
            let spike_indexes = archive.read_i64(&spike_indexes_key(segment_index))?;
            let spike_labels = archive.read_i64(&spike_labels_key(segment_index))?;
            if spike_indexes.len() != spike_labels.len() {
                return Err(archive.shape_error(format!(
                    "segment {segment_index}: {} spike indexes but {} labels",
                    spike_indexes.len(),
                    spike_labels.len()
                )));
            }
            segments.push(NpzSegment {
                spike_indexes,
                spike_labels,
            });
        }

        info!(
            path = %path.display(),
            num_units = unit_ids.len(),
            num_segments = segments.len(),
            "opened NPZ sorting"
        );

        Ok(Self {
            path: path.to_path_buf(),
            sampling_frequency,
            unit_ids,
            segments,
        })
    }

    /// Path the sorting was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SortingSource for NpzSortingExtractor {
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
        ensure!(self.unit_ids.contains(&unit_id), UnknownUnitSnafu { unit_id });

        let segment = &self.segments[segment_index];
        Ok(segment
            .spike_indexes
            .iter()
            .zip(&segment.spike_labels)
            .filter(|&(&frame, &label)| {
                label == unit_id && frame_in_window(frame, start_frame, end_frame)
            })
            .map(|(&frame, _)| frame)
            .collect())
    }
}

impl fmt::Display for NpzSortingExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_sorting_summary(f, "NpzSortingExtractor", self)
    }
}

/// Write `source` to `path` in the NPZ layout above.
///
/// `NpzWriter` appends the `.npy` suffix to each key, so members come out
/// named exactly as `np.savez` names them.
///
/// Spikes of each segment are ordered by frame; spikes sharing a frame keep
/// unit-id order. The file is written atomically.
pub fn write_sorting_npz(
    source: &dyn SortingSource,
    path: impl AsRef<Path>,
) -> ExtractorResult<()> {
    let path = path.as_ref();
    let write_ctx = || NpzWriteSnafu {
        path: path.display().to_string(),
    };

    let mut npz = NpzWriter::new(Cursor::new(Vec::new()));
    npz.add_array(UNIT_IDS, &Array1::from(source.unit_ids().to_vec()))
        .context(write_ctx())?;
    npz.add_array(NUM_SEGMENT, &Array1::from(vec![source.num_segments() as i64]))
        .context(write_ctx())?;
    npz.add_array(
        SAMPLING_FREQUENCY,
        &Array1::from(vec![source.sampling_frequency()]),
    )
    .context(write_ctx())?;

    for segment_index in 0..source.num_segments() {
        let mut spikes: Vec<(i64, i64)> = Vec::new();
        for &unit_id in source.unit_ids() {
            let train = source.get_unit_spike_train(unit_id, segment_index, None, None)?;
            spikes.extend(train.into_iter().map(|frame| (frame, unit_id)));
        }
        spikes.sort_by_key(|&(frame, _)| frame);

        let (indexes, labels): (Vec<i64>, Vec<i64>) = spikes.into_iter().unzip();
        npz.add_array(spike_indexes_key(segment_index), &Array1::from(indexes))
            .context(write_ctx())?;
        npz.add_array(spike_labels_key(segment_index), &Array1::from(labels))
            .context(write_ctx())?;
    }

    let bytes = npz.finish().context(write_ctx())?.into_inner();
    storage::write_atomic(path, &bytes).context(StorageSnafu)?;

    info!(
        path = %path.display(),
        num_units = source.num_units(),
        num_segments = source.num_segments(),
        "wrote NPZ sorting"
    );
    Ok(())
}
