use super::{ReaderStrategy, SampleSource, SampleWindow, sample_positions};
use crate::{
    EngineError, EngineResult, SelectionRange, TraceIndex, TraceRecord,
    record::{is_blank, line_number_of, parse_bytes},
};
use fluotrace_common::RecordIndex;
use std::{
    fs::File,
    io::{BufRead, BufReader, Seek, SeekFrom},
    num::NonZeroUsize,
};
use tracing::{debug, instrument};

/// Reads records straight from disk, opening the file afresh for each request.
///
/// The handle only lives for the duration of one call and is released on every exit path,
/// including parse failures.
#[derive(Default, Debug, Clone, Copy)]
pub struct SeekingSource;

impl SeekingSource {
    fn open(index: &TraceIndex) -> EngineResult<BufReader<File>> {
        File::open(index.path())
            .map(BufReader::new)
            .map_err(EngineError::io(index.path()))
    }
}

impl SampleSource for SeekingSource {
    fn strategy(&self) -> ReaderStrategy {
        ReaderStrategy::Seeking
    }

    #[instrument(skip_all, fields(range = %range, point_count = point_count.get()))]
    fn read(
        &self,
        index: &TraceIndex,
        range: SelectionRange,
        point_count: NonZeroUsize,
    ) -> EngineResult<SampleWindow> {
        let range = range.clamp_to(index.max_index());
        let mut reader = Self::open(index)?;
        let positions = sample_positions(range, point_count);
        let mut window = SampleWindow::with_capacity(positions.len());
        let mut line = Vec::<u8>::new();
        let mut previous: Option<(RecordIndex, TraceRecord)> = None;

        for position in positions {
            let record = match previous {
                Some((previous_position, record)) if previous_position == position => record,
                _ => {
                    // Positions lie within the clamped range
                    let offset = index.offsets()[position];
                    reader
                        .seek(SeekFrom::Start(offset))
                        .map_err(EngineError::io(index.path()))?;
                    line.clear();
                    reader
                        .read_until(b'\n', &mut line)
                        .map_err(EngineError::io(index.path()))?;
                    parse_bytes(&line, position)?
                }
            };
            previous = Some((position, record));
            window.push(record);
        }
        debug!(samples = window.len(), "Window read");
        Ok(window)
    }

    #[instrument(skip_all, fields(count = index.count()))]
    fn read_all(&self, index: &TraceIndex) -> EngineResult<SampleWindow> {
        let mut reader = Self::open(index)?;
        if let Some(first) = index.offset(0) {
            reader
                .seek(SeekFrom::Start(first))
                .map_err(EngineError::io(index.path()))?;
        }
        let mut window = SampleWindow::with_capacity(index.count());
        let mut line = Vec::<u8>::new();
        while window.len() < index.count() {
            line.clear();
            let num_bytes = reader
                .read_until(b'\n', &mut line)
                .map_err(EngineError::io(index.path()))?;
            if num_bytes == 0 {
                // The file shrank since it was indexed
                return Err(EngineError::Parse {
                    line: line_number_of(window.len()),
                    reason: "unexpected end of file".to_owned(),
                });
            }
            if !is_blank(&line) {
                window.push(parse_bytes(&line, window.len())?);
            }
        }
        debug!(samples = window.len(), "Trace read");
        Ok(window)
    }
}
