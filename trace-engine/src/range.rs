use fluotrace_common::{Real, RecordIndex};
use std::fmt::Display;

/// An inclusive range of record indices, always within `[0, max_index]` with `start <= end`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    start: RecordIndex,
    end: RecordIndex,
}

impl Display for SelectionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{0}, {1}]", self.start, self.end)
    }
}

impl SelectionRange {
    /// Builds a range clamped to `[0, max_index]`, swapping reversed bounds.
    pub fn clamped(start: RecordIndex, end: RecordIndex, max_index: RecordIndex) -> Self {
        let (start, end) = if start <= end {
            (start, end)
        } else {
            (end, start)
        };
        Self {
            start: start.min(max_index),
            end: end.min(max_index),
        }
    }

    /// The range covering every record of a trace with `count` records.
    pub fn full(count: usize) -> Self {
        Self {
            start: 0,
            end: count.saturating_sub(1),
        }
    }

    pub fn start(&self) -> RecordIndex {
        self.start
    }

    pub fn end(&self) -> RecordIndex {
        self.end
    }

    /// Number of records covered, both ends included.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Whether the range selects exactly one record.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Restricts the range to a (possibly smaller) trace.
    pub fn clamp_to(self, max_index: RecordIndex) -> Self {
        Self::clamped(self.start, self.end, max_index)
    }

    /// The range of the same length immediately after this one, stopping at `max_index`.
    pub fn next_page(self, max_index: RecordIndex) -> Self {
        let len = self.len();
        let end = self.end.saturating_add(len).min(max_index);
        let start = end.saturating_sub(len - 1).max(self.start);
        Self::clamped(start, end, max_index)
    }

    /// The range of the same length immediately before this one, stopping at zero.
    pub fn previous_page(self, max_index: RecordIndex) -> Self {
        let len = self.len();
        let start = self.start.saturating_sub(len);
        let end = (start + len - 1).min(self.end);
        Self::clamped(start, end, max_index)
    }
}

/// Converts a time-domain selection into the corresponding record range.
///
/// Both bounds are divided by the acquisition interval and truncated, so the result is only
/// close to the requested window: exact boundary samples are not guaranteed. Bounds below zero
/// clamp to the first record, bounds beyond the trace clamp to `max_index`.
pub fn to_index_range(
    time_range: (Real, Real),
    acq_interval: Real,
    max_index: RecordIndex,
) -> SelectionRange {
    let (low, high) = if time_range.0 <= time_range.1 {
        time_range
    } else {
        (time_range.1, time_range.0)
    };
    SelectionRange::clamped(
        time_to_index(low, acq_interval),
        time_to_index(high, acq_interval),
        max_index,
    )
}

/// Float to integer casts saturate, so negative and NaN positions become zero.
fn time_to_index(time: Real, acq_interval: Real) -> RecordIndex {
    (time / acq_interval).floor() as RecordIndex
}
