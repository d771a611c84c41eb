//! Indexing, windowed reading and peak isolation for fluorescence traces.
//!
//! A trace is a comma separated file with one header line followed by
//! `time,fluorescence,pmt` records at a near-constant acquisition interval.
//! Traces can be far larger than memory, so a file is first indexed by the
//! byte offset of every record and then read a window at a time.
//!
//! Typical usage:
//! ```no_run
//! # use trace_engine::{EngineConfig, TraceSession};
//! # use std::num::NonZeroUsize;
//! # fn main() -> Result<(), trace_engine::SessionError> {
//! let mut session = TraceSession::new(EngineConfig::default());
//! println!("{}", session.open("trace.csv")?);       // index the file
//! session.zoom((1000.0, 2000.0))?;                  // select a time range
//! let view = session.view(NonZeroUsize::MIN, 1)?;   // read and smooth a window of it
//! # let _ = view;
//! println!("{}", session.isolate(4000.0, 31)?);     // threshold and segment the whole trace
//! session.export("trace_out.csv")?;                 // write duration and intensity of each peak
//! # Ok(())
//! # }
//! ```
pub mod column_stats;
pub mod error;
pub mod export;
pub mod features;
pub mod index;
pub mod range;
pub mod reader;
pub mod record;
pub mod segmentation;
pub mod session;
pub mod smoothing;
pub mod summary;

pub use column_stats::{ColumnSummary, DEFAULT_MIN_COUNT, summarise_columns};
pub use error::{EngineError, EngineResult, SessionError, SessionResult};
pub use export::{FEATURE_HEADER, read_features, write_features};
pub use features::{PeakFeature, extract};
pub use index::TraceIndex;
pub use range::{SelectionRange, to_index_range};
pub use reader::{
    InMemorySource, ReaderStrategy, SampleSource, SampleWindow, SeekingSource, open_source,
    read_window,
};
pub use record::TraceRecord;
pub use segmentation::{GapTolerance, PeakSegment, PeakSegmenter, segment};
pub use session::{EngineConfig, Isolation, LoadedTrace, SessionState, TraceSession, View};
pub use smoothing::{SmoothingWindow, smooth};
pub use summary::{IsolationSummary, TraceSummary};

pub use fluotrace_common::Real;
