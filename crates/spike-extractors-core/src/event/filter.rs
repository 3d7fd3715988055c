//! Time-window filtering of event values.
//!
//! Times are compared as `Float64` so one code path serves every numeric
//! Arrow type, but the mask is applied to the original array: the result
//! keeps the source data type and, for structured events, every field.

use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Scalar},
    compute::{
        cast,
        filter,
        kernels::{boolean as boolean_kernels, cmp as cmp_kernels},
    },
    datatypes::DataType,
};
use snafu::prelude::*;

use crate::{
    error::{ArrowSnafu, ExtractorResult, MissingTimesFieldSnafu},
    event::EventValues,
};

/// Mask of entries with `start <= t < end`, or `None` when unbounded.
///
/// Null times compare as null and are dropped by the filter kernel.
fn time_mask(
    times: &dyn Array,
    start_time: Option<f64>,
    end_time: Option<f64>,
) -> ExtractorResult<Option<BooleanArray>> {
    if start_time.is_none() && end_time.is_none() {
        return Ok(None);
    }

    let times = cast(times, &DataType::Float64).context(ArrowSnafu)?;
    let mut mask: Option<BooleanArray> = None;

    if let Some(start) = start_time {
        let bound = Scalar::new(Float64Array::from(vec![start]));
        mask = Some(cmp_kernels::gt_eq(&times, &bound).context(ArrowSnafu)?);
    }

    if let Some(end) = end_time {
        let bound = Scalar::new(Float64Array::from(vec![end]));
        let below = cmp_kernels::lt(&times, &bound).context(ArrowSnafu)?;
        mask = Some(match mask {
            Some(above) => boolean_kernels::and(&above, &below).context(ArrowSnafu)?,
            None => below,
        });
    }

    Ok(mask)
}

/// Keep the entries of `values` whose time lies in `[start_time, end_time)`.
pub(crate) fn filter_by_time(
    values: &EventValues,
    start_time: Option<f64>,
    end_time: Option<f64>,
) -> ExtractorResult<EventValues> {
    let times = values.times().with_context(|| MissingTimesFieldSnafu {
        fields: values.field_names(),
    })?;

    let Some(mask) = time_mask(times.as_ref(), start_time, end_time)? else {
        return Ok(values.clone());
    };

    Ok(match values {
        EventValues::Plain(array) => {
            EventValues::Plain(filter(array.as_ref(), &mask).context(ArrowSnafu)?)
        }
        EventValues::Structured(array) => {
            let kept: ArrayRef = filter(array, &mask).context(ArrowSnafu)?;
            EventValues::Structured(kept.as_struct().clone())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, UInt64Array};
    use arrow::datatypes::{Int32Type, UInt64Type};
    use std::sync::Arc;

    #[test]
    fn unbounded_returns_no_mask() -> ExtractorResult<()> {
        let times = Int32Array::from(vec![1, 2, 3]);
        assert!(time_mask(&times, None, None)?.is_none());
        Ok(())
    }

    #[test]
    fn window_is_half_open() -> ExtractorResult<()> {
        let times = Float64Array::from(vec![0.5, 1.0, 1.5, 2.0]);
        let mask = time_mask(&times, Some(1.0), Some(2.0))?.expect("bounded");
        let kept: Vec<bool> = mask.iter().map(|v| v.unwrap_or(false)).collect();
        assert_eq!(kept, [false, true, true, false]);
        Ok(())
    }

    #[test]
    fn filtering_preserves_integer_type() -> ExtractorResult<()> {
        let values = EventValues::plain(Arc::new(Int32Array::from(vec![5, 50, 500])))?;
        let kept = filter_by_time(&values, None, Some(100.0))?;

        let EventValues::Plain(array) = kept else {
            panic!("plain values must stay plain");
        };
        assert_eq!(array.data_type(), &DataType::Int32);
        assert_eq!(array.as_primitive::<Int32Type>().values().to_vec(), vec![5, 50]);
        Ok(())
    }

    #[test]
    fn null_times_are_dropped() -> ExtractorResult<()> {
        let values = EventValues::plain(Arc::new(UInt64Array::from(vec![Some(1), None, Some(3)])))?;
        let kept = filter_by_time(&values, Some(0.0), None)?;
        let EventValues::Plain(array) = kept else {
            panic!("plain values must stay plain");
        };
        assert_eq!(array.as_primitive::<UInt64Type>().values().to_vec(), vec![1, 3]);
        Ok(())
    }
}
