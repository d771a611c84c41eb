//! One interactive exploration of a trace file.
//!
//! ```text
//!            open                 view
//!   Empty ─────────▶ Indexed ◀─────────▶ Viewing
//!     ▲                 │ ▲                 │
//!     │ close   isolate │ │ zoom, reset     │ isolate
//!     │                 ▼ │                 │
//!     └──────────── Isolated ◀──────────────┘
//! ```
//! Every loaded state accepts `open`, `close`, `view`, `zoom`, `reset` and `isolate`.
//! The results of an isolation can only be read while the session is `Isolated`.
use crate::{
    EngineError, GapTolerance, IsolationSummary, PeakFeature, PeakSegment, PeakSegmenter,
    ReaderStrategy, SampleSource, SampleWindow, SelectionRange, SessionError, SessionResult,
    SmoothingWindow, TraceIndex, TraceSummary, export::write_features, features::extract,
    range::to_index_range, reader::open_source,
};
use fluotrace_common::{CommonEngineOpts, DEFAULT_IN_MEMORY_LIMIT, Real};
use std::{num::NonZeroUsize, path::Path};
use strum::{Display, IntoStaticStr};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Traces no larger than this many bytes are parsed into memory when opened.
    pub in_memory_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            in_memory_limit: DEFAULT_IN_MEMORY_LIMIT,
        }
    }
}

impl From<&CommonEngineOpts> for EngineConfig {
    fn from(opts: &CommonEngineOpts) -> Self {
        Self {
            in_memory_limit: opts.in_memory_limit,
        }
    }
}

/// An opened trace and the part of it currently selected.
#[derive(Debug)]
pub struct LoadedTrace {
    index: TraceIndex,
    source: Box<dyn SampleSource>,
    selection: SelectionRange,
    summary: TraceSummary,
}

impl LoadedTrace {
    pub fn index(&self) -> &TraceIndex {
        &self.index
    }

    pub fn selection(&self) -> SelectionRange {
        self.selection
    }

    pub fn summary(&self) -> &TraceSummary {
        &self.summary
    }

    pub fn strategy(&self) -> ReaderStrategy {
        self.source.strategy()
    }
}

/// A decimated window of the selection together with its smoothed channels.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub range: SelectionRange,
    pub point_count: NonZeroUsize,
    pub smoothing: SmoothingWindow,
    pub samples: SampleWindow,
    pub smoothed_fluo: Vec<Real>,
    pub smoothed_pmt: Vec<Real>,
}

impl View {
    fn read(
        trace: &LoadedTrace,
        range: SelectionRange,
        point_count: NonZeroUsize,
        smoothing: SmoothingWindow,
    ) -> Result<Self, EngineError> {
        let samples = trace.source.read(&trace.index, range, point_count)?;
        let smoothed_fluo = smoothing.smooth(&samples.fluo)?;
        let smoothed_pmt = smoothing.smooth(&samples.pmt)?;
        Ok(Self {
            range,
            point_count,
            smoothing,
            samples,
            smoothed_fluo,
            smoothed_pmt,
        })
    }
}

/// The outcome of thresholding and segmenting a whole trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Isolation {
    pub threshold: Real,
    pub window: SmoothingWindow,
    /// Every sample whose smoothed fluorescence lay above the threshold.
    pub selected: SampleWindow,
    pub segments: Vec<PeakSegment>,
    pub features: Vec<PeakFeature>,
    pub summary: IsolationSummary,
}

impl Isolation {
    #[instrument(skip_all, fields(threshold = segmenter.threshold(), window = segmenter.window().len()))]
    fn run(trace: &LoadedTrace, segmenter: PeakSegmenter) -> Result<Self, EngineError> {
        let acq_interval = trace.index.acq_interval();
        let all = trace.source.read_all(&trace.index)?;
        let selected = all.select(&segmenter.select(&all.fluo)?);
        let segments = segmenter.assemble(&selected.times, &selected.fluo, acq_interval);
        let features = extract(&segments, segmenter.window());
        let summary = IsolationSummary {
            points_above: selected.len(),
            raw_events: GapTolerance::new(acq_interval).count_breaks(&selected.times),
            peaks: segments.len(),
        };
        info!(
            points_above = summary.points_above,
            raw_events = summary.raw_events,
            peaks = summary.peaks,
            "Trace isolated"
        );
        Ok(Self {
            threshold: segmenter.threshold(),
            window: segmenter.window(),
            selected,
            segments,
            features,
            summary,
        })
    }
}

#[derive(Debug, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    #[default]
    Empty,
    Indexed(LoadedTrace),
    Viewing(LoadedTrace, View),
    Isolated(LoadedTrace, Isolation),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn loaded(&self) -> Option<&LoadedTrace> {
        match self {
            Self::Empty => None,
            Self::Indexed(trace) | Self::Viewing(trace, _) | Self::Isolated(trace, _) => {
                Some(trace)
            }
        }
    }

    fn into_loaded(self) -> Option<LoadedTrace> {
        match self {
            Self::Empty => None,
            Self::Indexed(trace) | Self::Viewing(trace, _) | Self::Isolated(trace, _) => {
                Some(trace)
            }
        }
    }
}

/// Drives one trace through indexing, viewing and isolation.
///
/// Every method takes the session exclusively; a failed operation leaves the state
/// as it was, except a selection change whose view cannot be rebuilt.
#[derive(Debug, Default)]
pub struct TraceSession {
    config: EngineConfig,
    state: SessionState,
}

impl TraceSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: SessionState::Empty,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.state.name(),
        }
    }

    fn loaded(&self, operation: &'static str) -> SessionResult<&LoadedTrace> {
        self.state.loaded().ok_or_else(|| self.invalid(operation))
    }

    /// Moves the loaded trace into a new state built around it.
    fn transition(&mut self, next: impl FnOnce(LoadedTrace) -> SessionState) {
        if let Some(trace) = std::mem::take(&mut self.state).into_loaded() {
            self.state = next(trace);
        }
    }

    /// Indexes a trace file, replacing whatever was open before.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(&mut self, path: impl AsRef<Path>) -> SessionResult<TraceSummary> {
        let index = TraceIndex::build(path)?;
        let strategy = ReaderStrategy::for_file_size(index.file_len(), self.config.in_memory_limit);
        let source = open_source(&index, strategy)?;
        let summary = TraceSummary::new(&index, strategy);
        info!(%strategy, count = index.count(), "Trace opened");
        self.state = SessionState::Indexed(LoadedTrace {
            selection: index.full_range(),
            index,
            source,
            summary: summary.clone(),
        });
        Ok(summary)
    }

    pub fn close(&mut self) -> SessionResult<()> {
        self.loaded("close")?;
        self.state = SessionState::Empty;
        debug!("Trace closed");
        Ok(())
    }

    /// Reads `point_count` samples spread over the current selection and smooths them.
    #[instrument(skip_all, fields(point_count = point_count.get()))]
    pub fn view(
        &mut self,
        point_count: NonZeroUsize,
        window: impl Into<SmoothingWindow>,
    ) -> SessionResult<&View> {
        let trace = self.loaded("view")?;
        let view = View::read(trace, trace.selection, point_count, window.into())?;
        self.transition(|trace| SessionState::Viewing(trace, view));
        self.current_view()
    }

    /// Selects the records covering a time range, re-reading the view if there is one.
    pub fn zoom(&mut self, time_range: (Real, Real)) -> SessionResult<SelectionRange> {
        let index = self.loaded("zoom")?.index();
        let range = to_index_range(time_range, index.acq_interval(), index.max_index());
        self.select("zoom", range)
    }

    /// Selects the whole trace again.
    pub fn reset(&mut self) -> SessionResult<SelectionRange> {
        let range = self.loaded("reset")?.index().full_range();
        self.select("reset", range)
    }

    pub fn next_page(&mut self) -> SessionResult<SelectionRange> {
        let trace = self.loaded("page")?;
        let range = trace.selection.next_page(trace.index.max_index());
        self.select("page", range)
    }

    pub fn previous_page(&mut self) -> SessionResult<SelectionRange> {
        let trace = self.loaded("page")?;
        let range = trace.selection.previous_page(trace.index.max_index());
        self.select("page", range)
    }

    /// Changing the selection keeps a view up to date and discards an isolation.
    ///
    /// The selection is applied even when the view cannot be rebuilt over it. The session
    /// then drops back to indexed and the view error is returned.
    #[instrument(skip(self))]
    fn select(
        &mut self,
        operation: &'static str,
        range: SelectionRange,
    ) -> SessionResult<SelectionRange> {
        let view = match &self.state {
            SessionState::Empty => return Err(self.invalid(operation)),
            SessionState::Viewing(trace, view) => Some(View::read(
                trace,
                range,
                view.point_count,
                view.smoothing,
            )),
            SessionState::Indexed(_) | SessionState::Isolated(..) => None,
        };
        let mut failure = None;
        self.transition(|mut trace| {
            trace.selection = range;
            match view {
                Some(Ok(view)) => SessionState::Viewing(trace, view),
                Some(Err(error)) => {
                    failure = Some(error);
                    SessionState::Indexed(trace)
                }
                None => SessionState::Indexed(trace),
            }
        });
        match failure {
            Some(error) => {
                warn!(%range, %error, "View dropped after selection change");
                Err(error.into())
            }
            None => Ok(range),
        }
    }

    /// Thresholds the smoothed fluorescence of the whole trace and extracts peak features.
    pub fn isolate(
        &mut self,
        threshold: Real,
        window: impl Into<SmoothingWindow>,
    ) -> SessionResult<IsolationSummary> {
        let trace = self.loaded("isolate")?;
        let isolation = Isolation::run(trace, PeakSegmenter::new(threshold, window))?;
        let summary = isolation.summary;
        self.transition(|trace| SessionState::Isolated(trace, isolation));
        Ok(summary)
    }

    pub fn trace_summary(&self) -> SessionResult<&TraceSummary> {
        Ok(self.loaded("summarise")?.summary())
    }

    pub fn current_view(&self) -> SessionResult<&View> {
        match &self.state {
            SessionState::Viewing(_, view) => Ok(view),
            _ => Err(self.invalid("read the view")),
        }
    }

    pub fn isolation(&self) -> SessionResult<&Isolation> {
        match &self.state {
            SessionState::Isolated(_, isolation) => Ok(isolation),
            _ => Err(self.invalid("read the isolation")),
        }
    }

    pub fn features(&self) -> SessionResult<&[PeakFeature]> {
        Ok(&self.isolation()?.features)
    }

    pub fn isolation_summary(&self) -> SessionResult<IsolationSummary> {
        Ok(self.isolation()?.summary)
    }

    /// Writes the features of the last isolation to `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> SessionResult<()> {
        let isolation = self.isolation().map_err(|_| self.invalid("export"))?;
        write_features(path, &isolation.features)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{export::read_features, index::tests::write_trace};
    use assert_approx_eq::assert_approx_eq;
    use tempfile::{NamedTempFile, TempDir};

    const SCENARIO: &str = "time,fluorescence,pmt\n0,5000,1\n10,5000,2\n20,5000,3\n1000,5000,4\n";

    fn points(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// One hundred records one unit apart, with a plateau of 6000 over records 40 to 59.
    fn plateau_trace() -> NamedTempFile {
        let mut contents = String::from("time,fluorescence,pmt\n");
        for i in 0..100 {
            let fluo = if (40..60).contains(&i) { 6000 } else { 100 };
            contents.push_str(&format!("{i},{fluo},{}\n", i % 7));
        }
        write_trace(&contents)
    }

    fn seeking() -> TraceSession {
        TraceSession::new(EngineConfig { in_memory_limit: 0 })
    }

    fn assert_invalid<T: std::fmt::Debug>(result: SessionResult<T>, expected: &str) {
        match result {
            Err(SessionError::InvalidState { state, .. }) => assert_eq!(state, expected),
            other => panic!("expected invalid state, got {other:?}"),
        }
    }

    #[test]
    fn empty_session_only_opens() {
        let mut session = TraceSession::default();
        assert_eq!(session.state().name(), "empty");
        assert_invalid(session.view(points(10), 1), "empty");
        assert_invalid(session.zoom((0.0, 1.0)), "empty");
        assert_invalid(session.reset(), "empty");
        assert_invalid(session.isolate(0.0, 1), "empty");
        assert_invalid(session.close(), "empty");
        assert_invalid(session.features(), "empty");
    }

    #[test]
    fn open_chooses_strategy() {
        let file = write_trace(SCENARIO);
        let mut session = TraceSession::default();
        let summary = session.open(file.path()).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.strategy, ReaderStrategy::InMemory);
        assert_eq!(session.state().name(), "indexed");

        let mut session = seeking();
        assert_eq!(session.open(file.path()).unwrap().strategy, ReaderStrategy::Seeking);
    }

    #[test]
    fn failed_open_keeps_previous_trace() {
        let file = write_trace(SCENARIO);
        let mut session = TraceSession::default();
        session.open(file.path()).unwrap();
        assert!(session.open("/nonexistent/trace.csv").is_err());
        assert_eq!(session.trace_summary().unwrap().count, 4);
    }

    #[test]
    fn features_need_isolation() {
        let file = plateau_trace();
        let mut session = seeking();
        session.open(file.path()).unwrap();
        assert_invalid(session.features(), "indexed");
        assert_invalid(session.export("unused.csv"), "indexed");
        session.view(points(10), 1).unwrap();
        assert_invalid(session.isolation_summary(), "viewing");
    }

    #[test]
    fn view_returns_requested_points() {
        let file = plateau_trace();
        let mut session = seeking();
        session.open(file.path()).unwrap();
        let view = session.view(points(11), 3).unwrap();
        assert_eq!(view.samples.len(), 11);
        assert_eq!(view.smoothed_fluo.len(), 11);
        assert_eq!(view.samples.times.first(), Some(&0.0));
        assert_eq!(view.samples.times.last(), Some(&99.0));
        assert_eq!(session.state().name(), "viewing");
    }

    #[test]
    fn view_failure_keeps_state() {
        let file = plateau_trace();
        let mut session = seeking();
        session.open(file.path()).unwrap();
        let error = session.view(points(3), 5).unwrap_err();
        assert!(matches!(
            error,
            SessionError::Engine(EngineError::InsufficientData { .. })
        ));
        assert_eq!(session.state().name(), "indexed");
    }

    #[test]
    fn zoom_rereads_view() {
        let file = plateau_trace();
        let mut session = seeking();
        session.open(file.path()).unwrap();
        session.view(points(5), 1).unwrap();
        let range = session.zoom((40.0, 59.0)).unwrap();
        assert_eq!((range.start(), range.end()), (40, 59));
        let view = session.current_view().unwrap();
        assert_eq!(view.range, range);
        assert_eq!(view.samples.len(), 5);
        assert!(view.samples.fluo.iter().all(|&f| f == 6000.0));

        let range = session.reset().unwrap();
        assert_eq!((range.start(), range.end()), (0, 99));
        assert_eq!(session.current_view().unwrap().samples.times.last(), Some(&99.0));
    }

    #[test]
    fn zoom_too_narrow_for_view_keeps_selection() {
        let file = plateau_trace();
        let mut session = seeking();
        session.open(file.path()).unwrap();
        session.view(points(100), 31).unwrap();
        let error = session.zoom((50.0, 50.5)).unwrap_err();
        assert!(matches!(
            error,
            SessionError::Engine(EngineError::InsufficientData { .. })
        ));
        assert_eq!(session.state().name(), "indexed");
        let selection = session.state().loaded().unwrap().selection();
        assert_eq!((selection.start(), selection.end()), (50, 50));
        assert!(session.current_view().is_err());

        let range = session.reset().unwrap();
        assert_eq!((range.start(), range.end()), (0, 99));
    }

    #[test]
    fn paging_moves_selection() {
        let file = plateau_trace();
        let mut session = seeking();
        session.open(file.path()).unwrap();
        session.zoom((0.0, 9.0)).unwrap();
        let range = session.next_page().unwrap();
        assert_eq!((range.start(), range.end()), (10, 19));
        let range = session.previous_page().unwrap();
        assert_eq!((range.start(), range.end()), (0, 9));
    }

    #[test]
    fn scenario_isolation() {
        let file = write_trace(SCENARIO);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("features.csv");

        let mut session = TraceSession::default();
        session.open(file.path()).unwrap();
        let summary = session.isolate(1000.0, 1).unwrap();
        assert_eq!(
            summary,
            IsolationSummary {
                points_above: 4,
                raw_events: 1,
                peaks: 1
            }
        );
        assert_eq!(session.state().name(), "isolated");

        let features = session.features().unwrap();
        assert_eq!(features.len(), 1);
        assert_approx_eq!(features[0].duration, 20.0);
        assert_approx_eq!(features[0].intensity, 5000.0);

        session.export(&output).unwrap();
        assert_eq!(read_features(&output).unwrap(), features);
    }

    #[test]
    fn isolation_covers_whole_trace() {
        let file = plateau_trace();
        let mut session = TraceSession::default();
        session.open(file.path()).unwrap();
        session.zoom((0.0, 10.0)).unwrap();
        let summary = session.isolate(3000.0, 1).unwrap();
        assert_eq!(summary.points_above, 20);
        assert_eq!(summary.peaks, 1);
        assert_approx_eq!(session.features().unwrap()[0].duration, 19.0);
    }

    #[test]
    fn nothing_above_threshold() {
        let file = write_trace(SCENARIO);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("empty.csv");
        let mut session = TraceSession::default();
        session.open(file.path()).unwrap();
        let summary = session.isolate(10_000.0, 1).unwrap();
        assert_eq!(summary, IsolationSummary::default());
        session.export(&output).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "Duration [us],Intensity []a.u]\n"
        );
    }

    #[test]
    fn reset_discards_isolation() {
        let file = write_trace(SCENARIO);
        let mut session = TraceSession::default();
        session.open(file.path()).unwrap();
        session.isolate(1000.0, 1).unwrap();
        session.reset().unwrap();
        assert_eq!(session.state().name(), "indexed");
        assert_invalid(session.features(), "indexed");
    }

    #[test]
    fn close_returns_to_empty() {
        let file = write_trace(SCENARIO);
        let mut session = TraceSession::default();
        session.open(file.path()).unwrap();
        session.isolate(1000.0, 1).unwrap();
        session.close().unwrap();
        assert_eq!(session.state().name(), "empty");
        assert_invalid(session.trace_summary(), "empty");
    }
}
