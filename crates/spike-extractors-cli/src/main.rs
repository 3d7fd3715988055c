//! CLI tool for inspecting saved recordings and NPZ sortings.

mod error;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use snafu::ResultExt;
use spike_extractors_core::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::{
    BuildSortingSnafu, CliResult, InvalidFrequencySnafu, InvalidIntegerSnafu, LoadRecordingSnafu,
    OpenSortingSnafu, WriteSortingSnafu,
};

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a recording folder written by `save`
    RecordingInfo {
        #[arg(long)]
        folder: PathBuf,
    },

    /// Summarize an NPZ sorting, with per-unit spike counts
    SortingInfo {
        #[arg(long)]
        npz: PathBuf,
    },

    /// Build a one-segment sorting from comma-separated frames and labels
    NpzFromTimes {
        /// e.g. 10,20,30
        #[arg(long)]
        times: String,

        /// One unit id per frame, e.g. 0,1,0
        #[arg(long)]
        labels: String,

        /// Hz
        #[arg(long = "sampling-frequency")]
        sampling_frequency: String,

        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(name = "spx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

fn parse_csv_i64(flag: &'static str, raw: &str) -> CliResult<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().context(InvalidIntegerSnafu {
                flag,
                value: s.to_string(),
            })
        })
        .collect()
}

fn cmd_recording_info(folder: &Path) -> CliResult<()> {
    let recording = load_recording_from_folder(folder).context(LoadRecordingSnafu {
        folder: folder.display().to_string(),
    })?;

    println!("{recording}");
    for segment_index in 0..recording.num_segments() {
        let num_samples = recording
            .num_samples(segment_index)
            .context(LoadRecordingSnafu {
                folder: folder.display().to_string(),
            })?;
        println!("segment {segment_index}: {num_samples} samples");
    }
    Ok(())
}

fn cmd_sorting_info(npz: &Path) -> CliResult<()> {
    let path = npz.display().to_string();
    let sorting = NpzSortingExtractor::open(npz).context(OpenSortingSnafu { path: &path })?;
    let counts = sorting
        .count_num_spikes_per_unit()
        .context(OpenSortingSnafu { path: &path })?;

    println!("{sorting}");
    for (unit_id, count) in counts {
        println!("unit {unit_id}: {count} spikes");
    }
    Ok(())
}

fn cmd_npz_from_times(
    times: &str,
    labels: &str,
    sampling_frequency: &str,
    out: &Path,
) -> CliResult<()> {
    let times = parse_csv_i64("times", times)?;
    let labels = parse_csv_i64("labels", labels)?;
    let sampling_frequency: f64 = sampling_frequency.trim().parse().context(InvalidFrequencySnafu {
        value: sampling_frequency.to_string(),
    })?;

    let sorting = NumpySorting::from_times_labels(&times, &labels, sampling_frequency)
        .context(BuildSortingSnafu)?;
    write_sorting_npz(&sorting, out).context(WriteSortingSnafu {
        path: out.display().to_string(),
    })?;

    println!("Wrote {sorting} to {}", out.display());
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::RecordingInfo { folder } => cmd_recording_info(&folder),
        Command::SortingInfo { npz } => cmd_sorting_info(&npz),
        Command::NpzFromTimes {
            times,
            labels,
            sampling_frequency,
            out,
        } => cmd_npz_from_times(&times, &labels, &sampling_frequency, &out),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("{e}");
        if let Some(source) = std::error::Error::source(&e) {
            eprintln!("  caused by: {source}");
        }
        std::process::exit(1);
    }
}
