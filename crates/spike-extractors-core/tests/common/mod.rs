#![allow(dead_code)]

use std::{fs::File, path::Path};

use ndarray::Array1;
use ndarray_npy::NpzWriter;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Spike frames every 10 samples in `[0, 1000)`, labelled 0, 1, 2 in turn.
pub fn three_unit_times_labels() -> (Vec<i64>, Vec<i64>) {
    let times: Vec<i64> = (0..1000).step_by(10).collect();
    let labels = (0..times.len() as i64).map(|i| i % 3).collect();
    (times, labels)
}

/// Write an NPZ sorting with `num_seg` identical segments, the same way a
/// NumPy `np.savez` call would lay it out (`NpzWriter` adds the `.npy`
/// suffix to every key).
pub fn create_sorting_npz(num_seg: usize, path: &Path) -> TestResult {
    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array("unit_ids", &Array1::from(vec![0i64, 1, 2]))?;
    npz.add_array("num_segment", &Array1::from(vec![num_seg as i64]))?;
    npz.add_array("sampling_frequency", &Array1::from(vec![30_000.0f64]))?;

    let (times, labels) = three_unit_times_labels();
    for seg_index in 0..num_seg {
        npz.add_array(
            format!("spike_indexes_seg{seg_index}"),
            &Array1::from(times.clone()),
        )?;
        npz.add_array(
            format!("spike_labels_seg{seg_index}"),
            &Array1::from(labels.clone()),
        )?;
    }
    npz.finish()?;
    Ok(())
}
