//! Thresholding a smoothed channel and grouping the survivors into peak segments.
//!
//! Typical usage:
//! ```rust
//! # use trace_engine::{PeakSegmenter, SmoothingWindow};
//! # let (time, fluo) = (vec![0.0, 1.0, 2.0], vec![0.0, 5000.0, 0.0]);
//! let segmenter = PeakSegmenter::new(4000.0, SmoothingWindow::new(1));
//! let segments = segmenter.segment(&time, &fluo, 1.0)?;   // runs above 4000 longer than the window
//! # assert!(segments.is_empty());
//! # Ok::<(), trace_engine::EngineError>(())
//! ```
use crate::{EngineResult, SmoothingWindow};
use fluotrace_common::{Real, TIME_SUB_UNITS};
use itertools::Itertools;
use tracing::{debug, instrument};

/// A maximal run of selected samples, contiguous in time.
///
/// Segments are only ever created longer than the smoothing window that produced them.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct PeakSegment {
    samples: Vec<(Real, Real)>,
}

impl PeakSegment {
    /// The `(time, fluo)` samples of the segment, in time order.
    pub fn samples(&self) -> &[(Real, Real)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = Real> + '_ {
        self.samples.iter().map(|&(time, _)| time)
    }

    pub fn fluo(&self) -> impl Iterator<Item = Real> + '_ {
        self.samples.iter().map(|&(_, fluo)| fluo)
    }
}

/// Decides whether the time between two selected samples breaks a run.
///
/// Deltas are compared at the truncated integer resolution of `1 / TIME_SUB_UNITS`
/// of a file-native unit: a break occurs when `trunc(delta * 1000) > trunc(interval * 1000)`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapTolerance {
    limit: i64,
}

impl GapTolerance {
    pub fn new(acq_interval: Real) -> Self {
        Self {
            limit: truncate(acq_interval),
        }
    }

    pub fn is_break(&self, delta: Real) -> bool {
        truncate(delta) > self.limit
    }

    /// Number of breaks between consecutive samples of `times`.
    pub fn count_breaks(&self, times: &[Real]) -> usize {
        times
            .iter()
            .tuple_windows()
            .filter(|(previous, next)| self.is_break(*next - *previous))
            .count()
    }
}

fn truncate(time: Real) -> i64 {
    (time * TIME_SUB_UNITS).trunc() as i64
}

/// Collects selected samples into runs, releasing a segment whenever a run closes.
#[derive(Default, Debug, Clone)]
pub struct RunAssembler {
    window: SmoothingWindow,
    gap: GapTolerance,
    run: Vec<(Real, Real)>,
    previous_time: Option<Real>,
}

impl RunAssembler {
    pub fn new(window: SmoothingWindow, gap: GapTolerance) -> Self {
        Self {
            window,
            gap,
            ..Default::default()
        }
    }

    /// Feeds the next selected sample.
    /// Returns the run closed by this sample, if it was long enough to keep.
    pub fn signal(&mut self, time: Real, fluo: Real) -> Option<PeakSegment> {
        let closed = match self.previous_time {
            Some(previous) if self.gap.is_break(time - previous) => self.close(),
            _ => None,
        };
        self.run.push((time, fluo));
        self.previous_time = Some(time);
        closed
    }

    /// Closes the final run.
    pub fn finish(&mut self) -> Option<PeakSegment> {
        self.previous_time = None;
        self.close()
    }

    fn close(&mut self) -> Option<PeakSegment> {
        let samples = std::mem::take(&mut self.run);
        (samples.len() > self.window.len()).then_some(PeakSegment { samples })
    }
}

#[derive(Clone)]
pub struct SegmentIter<I>
where
    I: Iterator<Item = (Real, Real)>,
{
    source: I,
    assembler: RunAssembler,
    finished: bool,
}

impl<I> Iterator for SegmentIter<I>
where
    I: Iterator<Item = (Real, Real)>,
{
    type Item = PeakSegment;

    fn next(&mut self) -> Option<PeakSegment> {
        while !self.finished {
            match self.source.next() {
                Some((time, fluo)) => {
                    if let Some(segment) = self.assembler.signal(time, fluo) {
                        return Some(segment);
                    }
                }
                None => {
                    self.finished = true;
                    return self.assembler.finish();
                }
            }
        }
        None
    }
}

pub trait SegmentFilter<I>
where
    I: Iterator<Item = (Real, Real)>,
{
    fn segments(self, assembler: RunAssembler) -> SegmentIter<I>;
}

impl<I> SegmentFilter<I> for I
where
    I: Iterator<Item = (Real, Real)>,
{
    fn segments(self, assembler: RunAssembler) -> SegmentIter<I> {
        SegmentIter {
            source: self,
            assembler,
            finished: false,
        }
    }
}

/// Thresholds the smoothed fluorescence and segments what survives.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct PeakSegmenter {
    threshold: Real,
    window: SmoothingWindow,
}

impl PeakSegmenter {
    pub fn new(threshold: Real, window: impl Into<SmoothingWindow>) -> Self {
        Self {
            threshold,
            window: window.into(),
        }
    }

    pub fn threshold(&self) -> Real {
        self.threshold
    }

    pub fn window(&self) -> SmoothingWindow {
        self.window
    }

    /// Positions of the samples whose smoothed value lies strictly above the threshold.
    pub fn select(&self, fluo: &[Real]) -> EngineResult<Vec<usize>> {
        Ok(self
            .window
            .smooth(fluo)?
            .into_iter()
            .positions(|smoothed| smoothed > self.threshold)
            .collect())
    }

    /// Groups already selected samples into segments.
    ///
    /// Only neighbouring selected samples are compared; samples dropped by the threshold
    /// are never looked at again.
    pub fn assemble(&self, time: &[Real], fluo: &[Real], acq_interval: Real) -> Vec<PeakSegment> {
        let assembler = RunAssembler::new(self.window, GapTolerance::new(acq_interval));
        time.iter()
            .copied()
            .zip(fluo.iter().copied())
            .segments(assembler)
            .collect()
    }

    /// Smooths, thresholds and segments a trace.
    ///
    /// # Errors
    /// [crate::EngineError::InsufficientData] if the window is longer than the trace.
    #[instrument(skip_all, fields(threshold = self.threshold, window = self.window.len()))]
    pub fn segment(
        &self,
        time: &[Real],
        fluo: &[Real],
        acq_interval: Real,
    ) -> EngineResult<Vec<PeakSegment>> {
        let selected = self.select(fluo)?;
        let (time, fluo): (Vec<Real>, Vec<Real>) = selected
            .iter()
            .filter_map(|&i| Some((*time.get(i)?, *fluo.get(i)?)))
            .unzip();
        let segments = self.assemble(&time, &fluo, acq_interval);
        debug!(
            selected = selected.len(),
            segments = segments.len(),
            "Trace segmented"
        );
        Ok(segments)
    }
}

/// Smooths `fluo` with `window`, keeps samples above `threshold` and groups them into segments.
pub fn segment(
    time: &[Real],
    fluo: &[Real],
    acq_interval: Real,
    threshold: Real,
    window: usize,
) -> EngineResult<Vec<PeakSegment>> {
    PeakSegmenter::new(threshold, window).segment(time, fluo, acq_interval)
}
