use clap::{Args, Subcommand};
use fluotrace_common::Real;
use std::{num::NonZeroUsize, path::PathBuf};

#[derive(Clone, Debug, Subcommand)]
pub(crate) enum Mode {
    /// Index a trace and print its record count, duration and acquisition interval
    Summary(SummaryParameters),

    /// Print a decimated, smoothed window of a trace as CSV
    View(ViewParameters),

    /// Isolate the peaks of a trace and write their duration and intensity to a CSV file
    Isolate(IsolateParameters),

    /// Print the count, mean and standard error of every column of a CSV file
    Stats(StatsParameters),

    /// Write a synthetic trace with Gaussian peaks on a noisy baseline
    Simulate(SimulateParameters),
}

#[derive(Clone, Debug, Args)]
pub(crate) struct SummaryParameters {
    /// Trace file to open
    pub(crate) file: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub(crate) struct ViewParameters {
    /// Trace file to open
    pub(crate) file: PathBuf,

    /// Number of samples spread across the selection
    #[clap(long, default_value = "1000")]
    pub(crate) points: NonZeroUsize,

    /// Smoothing window, raised to the next odd value if even
    #[clap(long, default_value = "31")]
    pub(crate) window: usize,

    /// Start of the selection, in file time units
    #[clap(long, requires = "to")]
    pub(crate) from: Option<Real>,

    /// End of the selection, in file time units
    #[clap(long, requires = "from")]
    pub(crate) to: Option<Real>,
}

#[derive(Clone, Debug, Args)]
pub(crate) struct IsolateParameters {
    /// Trace file to open
    pub(crate) file: PathBuf,

    /// Smoothed fluorescence must lie strictly above this value
    #[clap(long, default_value = "2000")]
    pub(crate) threshold: Real,

    /// Smoothing window, raised to the next odd value if even
    #[clap(long, default_value = "31")]
    pub(crate) window: usize,

    /// Feature table to write, defaults to the trace file name with an `_out.csv` suffix
    #[clap(long)]
    pub(crate) output: Option<PathBuf>,
}

impl IsolateParameters {
    pub(crate) fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut name = self.file.file_stem().unwrap_or_default().to_owned();
            name.push("_out.csv");
            self.file.with_file_name(name)
        })
    }
}

#[derive(Clone, Debug, Args)]
pub(crate) struct StatsParameters {
    /// CSV file with one header row
    pub(crate) file: PathBuf,

    /// Columns with fewer values are flagged as sparse
    #[clap(long, default_value_t = trace_engine::DEFAULT_MIN_COUNT)]
    pub(crate) min_count: usize,
}

#[derive(Clone, Debug, Args)]
pub(crate) struct SimulateParameters {
    /// Trace file to write
    pub(crate) output: PathBuf,

    /// Number of records
    #[clap(long, default_value = "100000")]
    pub(crate) records: usize,

    /// Time between consecutive records, in file time units
    #[clap(long, default_value = "0.01")]
    pub(crate) interval: Real,

    /// Number of peaks to place at random times
    #[clap(long, default_value = "20")]
    pub(crate) peaks: usize,

    /// Mean fluorescence away from any peak
    #[clap(long, default_value = "500")]
    pub(crate) baseline: Real,

    /// Standard deviation of the noise added to both channels
    #[clap(long, default_value = "50")]
    pub(crate) noise: Real,

    /// Peak amplitudes are drawn uniformly from this range
    #[clap(long, default_value = "2000")]
    pub(crate) min_amplitude: Real,

    #[clap(long, default_value = "8000")]
    pub(crate) max_amplitude: Real,

    /// Peak standard deviations, in records, are drawn uniformly from this range
    #[clap(long, default_value = "5")]
    pub(crate) min_width: Real,

    #[clap(long, default_value = "40")]
    pub(crate) max_width: Real,

    /// Seed for a reproducible trace
    #[clap(long)]
    pub(crate) seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_path() {
        let parameters = IsolateParameters {
            file: PathBuf::from("/data/run7.csv"),
            threshold: 2000.0,
            window: 31,
            output: None,
        };
        assert_eq!(parameters.output_path(), PathBuf::from("/data/run7_out.csv"));
    }

    #[test]
    fn explicit_output_path() {
        let parameters = IsolateParameters {
            file: PathBuf::from("run7.csv"),
            threshold: 2000.0,
            window: 31,
            output: Some(PathBuf::from("features.csv")),
        };
        assert_eq!(parameters.output_path(), PathBuf::from("features.csv"));
    }
}
