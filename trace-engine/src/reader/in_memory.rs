use super::{ReaderStrategy, SampleSource, SampleWindow, SeekingSource, sample_positions};
use crate::{EngineResult, SelectionRange, TraceIndex};
use std::num::NonZeroUsize;
use tracing::{info, instrument};

/// Holds every record of a trace, parsed once when the file is opened.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    records: SampleWindow,
}

impl InMemorySource {
    #[instrument(skip_all, fields(count = index.count()))]
    pub fn load(index: &TraceIndex) -> EngineResult<Self> {
        let records = SeekingSource.read_all(index)?;
        info!("Trace loaded into memory");
        Ok(Self { records })
    }
}

impl SampleSource for InMemorySource {
    fn strategy(&self) -> ReaderStrategy {
        ReaderStrategy::InMemory
    }

    fn read(
        &self,
        index: &TraceIndex,
        range: SelectionRange,
        point_count: NonZeroUsize,
    ) -> EngineResult<SampleWindow> {
        let positions: Vec<_> =
            sample_positions(range.clamp_to(index.max_index()), point_count).collect();
        Ok(self.records.select(&positions))
    }

    fn read_all(&self, _index: &TraceIndex) -> EngineResult<SampleWindow> {
        Ok(self.records.clone())
    }
}
