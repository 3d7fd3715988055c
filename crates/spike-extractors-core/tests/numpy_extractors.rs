//! End-to-end behavior of the in-memory extractors:
//! - recordings keep their segment layout and survive a folder round trip,
//! - sortings built from times/labels, unit maps, or another extractor,
//! - event channels with plain and structured values.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, AsArray, Int64Array, StructArray},
    datatypes::{DataType, Field, Int64Type},
};
use ndarray::Array2;
use spike_extractors_core::prelude::*;
use tempfile::TempDir;

use common::{TestResult, create_sorting_npz, three_unit_times_labels};

// =============================================================================
// Recording
// =============================================================================

#[test]
fn numpy_recording_saves_to_folder() -> TestResult {
    let tmp = TempDir::new()?;
    let traces_list: Vec<Array2<f64>> = (0..3).map(|_| Array2::zeros((1000, 5))).collect();

    let rec = NumpyRecording::new(traces_list, 30_000.0)?;
    assert_eq!(rec.num_segments(), 3);
    assert_eq!(rec.num_channels(), 5);
    println!("{rec}");

    let folder = tmp.path().join("test_NumpyRecording");
    rec.save(&folder, &SaveOptions::default())?;

    let loaded = load_recording_from_folder(&folder)?;
    assert_eq!(loaded.num_segments(), 3);
    for seg in 0..3 {
        assert_eq!(loaded.shape(seg)?, (1000, 5));
    }
    assert_eq!(loaded.to_string(), rec.to_string());
    Ok(())
}

// =============================================================================
// Sorting
// =============================================================================

#[test]
fn numpy_sorting_constructors() -> TestResult {
    let sampling_frequency = 30_000.0;

    let empty = NumpySorting::new(sampling_frequency, Vec::new())?;
    assert_eq!(empty.num_units(), 0);
    assert_eq!(empty.num_segments(), 0);

    let (times, labels) = three_unit_times_labels();
    let sorting = NumpySorting::from_times_labels(&times, &labels, sampling_frequency)?;
    println!("{sorting}");
    assert_eq!(sorting.num_segments(), 1);

    let sorting = NumpySorting::from_times_labels_multi(
        &vec![times.clone(); 3],
        &vec![labels.clone(); 3],
        sampling_frequency,
    )?;
    assert_eq!(sorting.num_segments(), 3);
    Ok(())
}

#[test]
fn numpy_sorting_from_npz_extractor() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("test_NpzSortingExtractor.npz");
    create_sorting_npz(2, &path)?;

    let other = NpzSortingExtractor::open(&path)?;
    let sorting = NumpySorting::from_extractor(&other)?;

    assert_eq!(sorting.num_segments(), 2);
    assert_eq!(sorting.unit_ids(), other.unit_ids());
    assert_eq!(sorting.sampling_frequency(), 30_000.0);
    for seg in 0..2 {
        for &unit in other.unit_ids() {
            assert_eq!(
                sorting.get_unit_spike_train(unit, seg, None, None)?,
                other.get_unit_spike_train(unit, seg, None, None)?
            );
        }
    }
    assert_eq!(
        sorting.get_unit_spike_train(2, 1, None, None)?[..2],
        [20, 50]
    );
    Ok(())
}

#[test]
fn written_npz_reopens_with_same_content() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("roundtrip.npz");

    let mut trains = UnitSpikeTrains::new();
    trains.insert(4, vec![100, 300]);
    trains.insert(9, vec![200]);
    let sorting = NumpySorting::from_unit_dict(vec![trains.clone(), trains], 20_000.0)?;

    write_sorting_npz(&sorting, &path)?;
    let reopened = NumpySorting::from_extractor(&NpzSortingExtractor::open(&path)?)?;
    assert_eq!(reopened, sorting);
    Ok(())
}

// =============================================================================
// Events
// =============================================================================

fn simple_channels() -> EventChannels {
    EventChannels::from([
        ("trig0".to_string(), EventValues::from(vec![1i64, 10, 100])),
        ("trig1".to_string(), EventValues::from(vec![1i64, 50, 150])),
    ])
}

fn third_time(values: &EventValues) -> i64 {
    values
        .times()
        .expect("times")
        .as_primitive::<Int64Type>()
        .value(2)
}

#[test]
fn numpy_event_plain_and_structured_channels() -> TestResult {
    // one segment, plain values
    let event = NumpyEvent::from_dict(simple_channels());
    assert_eq!(third_time(&event.event_times("trig0")?), 100);
    assert_eq!(third_time(&event.event_times("trig1")?), 150);

    // two segments, plain values
    let event = NumpyEvent::from_dict_list(vec![simple_channels(), simple_channels()]);
    assert_eq!(third_time(&event.get_event_times("trig1", 1, None, None)?), 150);

    // two segments, one structured channel
    let mut channels = simple_channels();
    let trig3 = StructArray::from(vec![
        (
            Arc::new(Field::new("times", DataType::Int64, false)),
            Arc::new(Int64Array::from(vec![1, 50, 150])) as ArrayRef,
        ),
        (
            Arc::new(Field::new("duration", DataType::Int64, false)),
            Arc::new(Int64Array::from(vec![20, 30, 60])) as ArrayRef,
        ),
    ]);
    channels.insert("trig3".to_string(), EventValues::structured(trig3)?);
    let event = NumpyEvent::from_dict_list(vec![channels.clone(), channels]);

    assert_eq!(third_time(&event.get_event_times("trig1", 1, None, None)?), 150);

    let values = event.get_event_times("trig3", 1, None, None)?;
    assert!(values.is_structured());
    assert_eq!(third_time(&values), 150);
    let duration = values.field("duration").expect("duration field");
    assert_eq!(duration.as_primitive::<Int64Type>().value(2), 60);

    let bounded = event.get_event_times("trig3", 1, None, Some(100.0))?;
    assert_eq!(bounded.len(), 2);
    assert!(bounded.is_structured());
    Ok(())
}
