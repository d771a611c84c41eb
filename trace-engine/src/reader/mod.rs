//! Reading windows of records out of an indexed trace.
//!
//! ```text
//!   TraceIndex + SelectionRange + point count
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ SampleSource │  SeekingSource: reopen file, seek per sample
//!   │              │  InMemorySource: records parsed once at open
//!   └──────────────┘
//!        │
//!        ▼
//!   SampleWindow { times, fluo, pmt }
//! ```
pub mod in_memory;
pub mod seeking;

use crate::{EngineResult, SelectionRange, TraceIndex, TraceRecord};
use fluotrace_common::{Real, RecordIndex};
use std::num::NonZeroUsize;
use strum::{Display, EnumString};

pub use in_memory::InMemorySource;
pub use seeking::SeekingSource;

/// A materialised slice of the three channels.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct SampleWindow {
    pub times: Vec<Real>,
    pub fluo: Vec<Real>,
    pub pmt: Vec<Real>,
}

impl SampleWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            times: Vec::with_capacity(capacity),
            fluo: Vec::with_capacity(capacity),
            pmt: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: TraceRecord) {
        self.times.push(record.time);
        self.fluo.push(record.fluo);
        self.pmt.push(record.pmt);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = TraceRecord> + '_ {
        self.times
            .iter()
            .zip(&self.fluo)
            .zip(&self.pmt)
            .map(|((&time, &fluo), &pmt)| TraceRecord { time, fluo, pmt })
    }

    pub fn get(&self, position: usize) -> Option<TraceRecord> {
        Some(TraceRecord {
            time: *self.times.get(position)?,
            fluo: *self.fluo.get(position)?,
            pmt: *self.pmt.get(position)?,
        })
    }

    /// Keeps only the samples at the given positions, in the given order.
    pub fn select(&self, positions: &[usize]) -> Self {
        positions.iter().filter_map(|&i| self.get(i)).collect()
    }
}

impl FromIterator<TraceRecord> for SampleWindow {
    fn from_iter<T: IntoIterator<Item = TraceRecord>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut window = Self::with_capacity(iter.size_hint().0);
        for record in iter {
            window.push(record);
        }
        window
    }
}

/// How the records of an opened trace are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ReaderStrategy {
    /// Reopen the file and seek to every requested record.
    Seeking,
    /// Parse the whole file once and serve records from memory.
    InMemory,
}

impl ReaderStrategy {
    /// Files no larger than `in_memory_limit` bytes are held in memory.
    pub fn for_file_size(file_len: u64, in_memory_limit: u64) -> Self {
        if file_len <= in_memory_limit {
            Self::InMemory
        } else {
            Self::Seeking
        }
    }
}

/// Serves windows of records from an indexed trace.
///
/// Implementations must return identical windows for identical requests, whichever
/// strategy they use, and must never return a partial window.
pub trait SampleSource: std::fmt::Debug {
    fn strategy(&self) -> ReaderStrategy;

    /// Reads `point_count` records evenly spread by index across `range`.
    ///
    /// A degenerate range yields a single record. A point count larger than the range
    /// revisits records, so the window may contain repeats.
    fn read(
        &self,
        index: &TraceIndex,
        range: SelectionRange,
        point_count: NonZeroUsize,
    ) -> EngineResult<SampleWindow>;

    /// Reads every record of the trace in order.
    fn read_all(&self, index: &TraceIndex) -> EngineResult<SampleWindow>;
}

/// Chooses and prepares the source for a freshly indexed trace.
pub fn open_source(
    index: &TraceIndex,
    strategy: ReaderStrategy,
) -> EngineResult<Box<dyn SampleSource>> {
    Ok(match strategy {
        ReaderStrategy::Seeking => Box::new(SeekingSource),
        ReaderStrategy::InMemory => Box::new(InMemorySource::load(index)?),
    })
}

/// Reads a window by seeking, without holding the trace in memory.
pub fn read_window(
    index: &TraceIndex,
    range: SelectionRange,
    point_count: NonZeroUsize,
) -> EngineResult<SampleWindow> {
    SeekingSource.read(index, range, point_count)
}

/// Record indices to visit: `point_count` positions linearly spaced from the start to the end
/// of the range (both included), truncated towards the start.
///
/// The iterator knows its exact length, which is one for a degenerate range whatever the
/// point count.
pub(crate) fn sample_positions(
    range: SelectionRange,
    point_count: NonZeroUsize,
) -> impl ExactSizeIterator<Item = RecordIndex> {
    let start = range.start();
    let span = range.end() - range.start();
    let points = if range.is_degenerate() {
        1
    } else {
        point_count.get()
    };
    let intervals = points.saturating_sub(1).max(1);
    (0..points).map(move |k| start + (k * span) / intervals)
}
