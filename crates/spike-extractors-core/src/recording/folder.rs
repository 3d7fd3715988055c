//! Recording folders: one Parquet file per segment plus a JSON header.
//!
//! ```text
//! folder/
//!   recording.json          # sampling frequency, channel ids, samples per segment
//!   traces/
//!     seg0.parquet          # one Float64 column per channel, named by channel id
//!     seg1.parquet
//! ```
//!
//! Every file is written with [`storage::write_atomic`]. Loading reads the
//! whole folder back into a [`NumpyRecording`].

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array, RecordBatch},
    datatypes::{DataType, Field, Float64Type, Schema, SchemaRef},
};
use bytes::Bytes;
use ndarray::Array2;
use parquet::{
    arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder},
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::info;

use crate::{
    error::{
        ArrowSnafu, ExtractorResult, FolderFormatSnafu, JsonSnafu, ParquetSnafu, StorageSnafu,
    },
    recording::{NumpyRecording, RecordingSource},
    storage,
};

const META_FILE: &str = "recording.json";
const FORMAT_VERSION: u32 = 1;

/// Parquet compression used for trace files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceCompression {
    /// Uncompressed pages.
    None,
    /// Snappy (fast, modest ratio).
    #[default]
    Snappy,
    /// Zstandard at its default level.
    Zstd,
}

impl TraceCompression {
    fn to_parquet(self) -> Compression {
        match self {
            TraceCompression::None => Compression::UNCOMPRESSED,
            TraceCompression::Snappy => Compression::SNAPPY,
            TraceCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

/// Options for [`save_recording_to_folder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Replace an existing folder instead of failing.
    pub overwrite: bool,
    /// Compression codec for trace files.
    pub compression: TraceCompression,
}

impl SaveOptions {
    fn writer_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression.to_parquet())
            .build()
    }
}

/// Header stored as `recording.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FolderMeta {
    format_version: u32,
    sampling_frequency: f64,
    channel_ids: Vec<String>,
    num_samples: Vec<usize>,
}

fn segment_path(folder: &Path, segment_index: usize) -> PathBuf {
    folder
        .join("traces")
        .join(format!("seg{segment_index}.parquet"))
}

fn traces_schema(channel_ids: &[String]) -> SchemaRef {
    let fields: Vec<Field> = channel_ids
        .iter()
        .map(|id| Field::new(id.as_str(), DataType::Float64, false))
        .collect();
    Arc::new(Schema::new(fields))
}

fn encode_segment(
    schema: &SchemaRef,
    traces: &Array2<f64>,
    props: WriterProperties,
) -> ExtractorResult<Vec<u8>> {
    let columns: Vec<ArrayRef> = traces
        .columns()
        .into_iter()
        .map(|col| Arc::new(Float64Array::from(col.to_vec())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns).context(ArrowSnafu)?;

    let mut buf = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buf, schema.clone(), Some(props)).context(ParquetSnafu)?;
    writer.write(&batch).context(ParquetSnafu)?;
    writer.close().context(ParquetSnafu)?;
    Ok(buf)
}

/// Save `recording` into `folder`.
///
/// # Errors
///
/// Fails with a storage `AlreadyExists` error when the folder exists and
/// `options.overwrite` is false, and with Parquet/JSON/storage errors when
/// encoding or writing fails.
pub fn save_recording_to_folder(
    recording: &dyn RecordingSource,
    folder: &Path,
    options: &SaveOptions,
) -> ExtractorResult<()> {
    storage::prepare_empty_dir(folder, options.overwrite).context(StorageSnafu)?;

    let schema = traces_schema(recording.channel_ids());
    let props = options.writer_properties();
    let mut num_samples = Vec::with_capacity(recording.num_segments());

    for segment_index in 0..recording.num_segments() {
        let traces = recording.get_traces(segment_index, None, None, None)?;
        let bytes = encode_segment(&schema, &traces, props.clone())?;
        storage::write_atomic(&segment_path(folder, segment_index), &bytes)
            .context(StorageSnafu)?;
        num_samples.push(traces.nrows());
    }

    let meta = FolderMeta {
        format_version: FORMAT_VERSION,
        sampling_frequency: recording.sampling_frequency(),
        channel_ids: recording.channel_ids().to_vec(),
        num_samples,
    };
    let meta_path = folder.join(META_FILE);
    let json = serde_json::to_vec_pretty(&meta).context(JsonSnafu {
        path: meta_path.display().to_string(),
    })?;
    storage::write_atomic(&meta_path, &json).context(StorageSnafu)?;

    info!(
        folder = %folder.display(),
        num_segments = meta.num_samples.len(),
        num_channels = meta.channel_ids.len(),
        compression = ?options.compression,
        "saved recording"
    );
    Ok(())
}

fn read_segment(
    path: &Path,
    num_channels: usize,
    num_samples: usize,
) -> ExtractorResult<Array2<f64>> {
    let bytes = storage::read_all_bytes(path).context(StorageSnafu)?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes)).context(ParquetSnafu)?;

    let stored_rows = builder.metadata().file_metadata().num_rows();
    ensure!(
        usize::try_from(stored_rows).is_ok_and(|rows| rows == num_samples),
        FolderFormatSnafu {
            path: path.display().to_string(),
            detail: format!("{stored_rows} samples stored, header declares {num_samples}"),
        }
    );
    let reader = builder.build().context(ParquetSnafu)?;

    let mut traces = Array2::zeros((num_samples, num_channels));
    let mut row = 0usize;

    for batch_res in reader {
        let batch = batch_res.context(ArrowSnafu)?;
        ensure!(
            batch.num_columns() == num_channels,
            FolderFormatSnafu {
                path: path.display().to_string(),
                detail: format!(
                    "{} columns, expected {num_channels}",
                    batch.num_columns()
                ),
            }
        );
        ensure!(
            row + batch.num_rows() <= num_samples,
            FolderFormatSnafu {
                path: path.display().to_string(),
                detail: format!("more than the {num_samples} samples declared"),
            }
        );

        for (channel, column) in batch.columns().iter().enumerate() {
            let values = column
                .as_primitive_opt::<Float64Type>()
                .with_context(|| FolderFormatSnafu {
                    path: path.display().to_string(),
                    detail: format!(
                        "column {channel} is {}, expected Float64",
                        column.data_type()
                    ),
                })?;
            ensure!(
                values.null_count() == 0,
                FolderFormatSnafu {
                    path: path.display().to_string(),
                    detail: format!("column {channel} has {} nulls", values.null_count()),
                }
            );
            for (offset, value) in values.values().iter().enumerate() {
                traces[[row + offset, channel]] = *value;
            }
        }
        row += batch.num_rows();
    }

    ensure!(
        row == num_samples,
        FolderFormatSnafu {
            path: path.display().to_string(),
            detail: format!("{row} samples, expected {num_samples}"),
        }
    );
    Ok(traces)
}

/// Load a folder written by [`save_recording_to_folder`].
pub fn load_recording_from_folder(folder: impl AsRef<Path>) -> ExtractorResult<NumpyRecording> {
    let folder = folder.as_ref();
    let meta_path = folder.join(META_FILE);
    let raw = storage::read_all_bytes(&meta_path).context(StorageSnafu)?;
    let meta: FolderMeta = serde_json::from_slice(&raw).context(JsonSnafu {
        path: meta_path.display().to_string(),
    })?;

    ensure!(
        meta.format_version == FORMAT_VERSION,
        FolderFormatSnafu {
            path: meta_path.display().to_string(),
            detail: format!("unsupported format_version {}", meta.format_version),
        }
    );

    let traces_list = meta
        .num_samples
        .iter()
        .enumerate()
        .map(|(segment_index, &num_samples)| {
            read_segment(
                &segment_path(folder, segment_index),
                meta.channel_ids.len(),
                num_samples,
            )
        })
        .collect::<ExtractorResult<Vec<_>>>()?;

    info!(
        folder = %folder.display(),
        num_segments = traces_list.len(),
        "loaded recording"
    );

    NumpyRecording::with_channel_ids(traces_list, meta.sampling_frequency, meta.channel_ids)
}
