use crate::{ReaderStrategy, TraceIndex};
use fluotrace_common::{Real, TIME_SUB_UNITS};
use std::{fmt::Display, path::PathBuf};

/// What is known about a trace once it has been indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    pub path: PathBuf,
    pub count: usize,
    /// Total acquisition time in seconds.
    pub total_time: Real,
    /// Acquisition interval in microseconds.
    pub acq_interval: Real,
    pub strategy: ReaderStrategy,
}

impl TraceSummary {
    pub fn new(index: &TraceIndex, strategy: ReaderStrategy) -> Self {
        Self {
            path: index.path().to_owned(),
            count: index.count(),
            total_time: index.span() / TIME_SUB_UNITS,
            acq_interval: index.acq_interval() * TIME_SUB_UNITS,
            strategy,
        }
    }
}

impl Display for TraceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "File: {}", self.path.display())?;
        writeln!(f, "Records: {}", self.count)?;
        writeln!(f, "Total acquisition time: {} s", self.total_time)?;
        writeln!(f, "Acquisition interval: {} us", self.acq_interval)?;
        write!(f, "Reader: {}", self.strategy)
    }
}

/// Outcome of one isolation pass.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolationSummary {
    /// Samples whose smoothed fluorescence lies above the threshold.
    pub points_above: usize,
    /// Breaks in time between consecutive samples above the threshold.
    pub raw_events: usize,
    /// Segments long enough to be kept.
    pub peaks: usize,
}

impl Display for IsolationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} points above smoothed threshold, {} events, {} peaks retained",
            self.points_above, self.raw_events, self.peaks
        )
    }
}
