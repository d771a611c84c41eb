use crate::{
    EngineError, EngineResult, SelectionRange,
    record::{is_blank, parse_bytes},
};
use fluotrace_common::{ByteOffset, Real, RecordIndex};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Byte offsets of every data line of a trace file.
///
/// The index never holds record contents, so its memory cost is one integer per record
/// regardless of how wide the lines are. It is built once when a file is opened and
/// is immutable afterwards.
#[derive(Debug, Clone)]
pub struct TraceIndex {
    path: PathBuf,
    file_len: u64,
    offsets: Vec<ByteOffset>,
    first_time: Real,
    last_time: Real,
    acq_interval: Real,
}

impl TraceIndex {
    /// Scans the file once, recording where each data line starts.
    ///
    /// The header line is skipped but its bytes still count towards the offsets.
    /// Lines containing only whitespace are not records.
    ///
    /// # Errors
    /// - [EngineError::Io] if the file cannot be read.
    /// - [EngineError::Parse] if the first or last data line is malformed.
    /// - [EngineError::DegenerateTrace] if there are fewer than two records, or
    ///   if the first and last records share the same time.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn build(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(EngineError::io(path))?;
        let file_len = file.metadata().map_err(EngineError::io(path))?.len();
        let mut reader = BufReader::new(file);

        let mut offsets = Vec::<ByteOffset>::new();
        let mut position: ByteOffset = 0;
        let mut line = Vec::<u8>::new();
        let mut last_data_line = Vec::<u8>::new();
        let mut first_time = None;

        // Header
        position += reader
            .read_until(b'\n', &mut line)
            .map_err(EngineError::io(path))? as ByteOffset;

        loop {
            line.clear();
            let num_bytes = reader
                .read_until(b'\n', &mut line)
                .map_err(EngineError::io(path))?;
            if num_bytes == 0 {
                break;
            }
            if !is_blank(&line) {
                if first_time.is_none() {
                    first_time = Some(parse_bytes(&line, 0)?.time);
                }
                offsets.push(position);
                std::mem::swap(&mut line, &mut last_data_line);
            }
            position += num_bytes as ByteOffset;
        }

        let count = offsets.len();
        let (Some(first_time), true) = (first_time, count > 1) else {
            return Err(EngineError::DegenerateTrace { count });
        };
        let last_time = parse_bytes(&last_data_line, count - 1)?.time;
        let acq_interval = (last_time - first_time) / (count - 1) as Real;
        if !(acq_interval > 0.0) {
            debug!("First and last records share time {first_time}");
            return Err(EngineError::DegenerateTrace { count });
        }

        info!(count, acq_interval, "Trace indexed");
        Ok(Self {
            path: path.to_owned(),
            file_len,
            offsets,
            first_time,
            last_time,
            acq_interval,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Number of data records, header excluded.
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// The last valid record index. An index always holds at least two records.
    pub fn max_index(&self) -> RecordIndex {
        self.offsets.len().saturating_sub(1)
    }

    pub fn offset(&self, index: RecordIndex) -> Option<ByteOffset> {
        self.offsets.get(index).copied()
    }

    pub fn offsets(&self) -> &[ByteOffset] {
        &self.offsets
    }

    pub fn first_time(&self) -> Real {
        self.first_time
    }

    pub fn last_time(&self) -> Real {
        self.last_time
    }

    /// Time between the first and last records, in file-native units.
    pub fn span(&self) -> Real {
        self.last_time - self.first_time
    }

    /// Average spacing between consecutive records, in file-native units.
    pub fn acq_interval(&self) -> Real {
        self.acq_interval
    }

    /// The selection covering every record.
    pub fn full_range(&self) -> SelectionRange {
        SelectionRange::full(self.count())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn write_trace(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn counts_data_lines() {
        let file = write_trace("time,fluo,pmt\n0,1,2\n10,1,2\n20,1,2\n1000,1,2\n");
        let index = TraceIndex::build(file.path()).unwrap();
        assert_eq!(index.count(), 4);
        assert_eq!(index.max_index(), 3);
        assert_eq!(index.first_time(), 0.0);
        assert_eq!(index.last_time(), 1000.0);
        assert_approx_eq!(index.acq_interval(), 1000.0 / 3.0);
        assert!(index.acq_interval() > 0.0);
    }

    #[test]
    fn offsets_skip_header() {
        let file = write_trace("t,f,p\n0,1,2\n10,1,2\n");
        let index = TraceIndex::build(file.path()).unwrap();
        assert_eq!(index.offsets(), &[6, 12]);
        assert_eq!(index.file_len(), 19);
    }

    #[test]
    fn crlf_and_trailing_blank_lines() {
        let file = write_trace("t,f,p\r\n0,1,2\r\n5,1,2\r\n10,1,2\r\n\r\n");
        let index = TraceIndex::build(file.path()).unwrap();
        assert_eq!(index.count(), 3);
        assert_eq!(index.offsets(), &[7, 14, 21]);
        assert_approx_eq!(index.acq_interval(), 5.0);
    }

    #[test]
    fn missing_final_newline() {
        let file = write_trace("t,f,p\n0,1,2\n4,1,2");
        let index = TraceIndex::build(file.path()).unwrap();
        assert_eq!(index.count(), 2);
        assert_eq!(index.last_time(), 4.0);
    }

    #[test]
    fn single_record_is_degenerate() {
        let file = write_trace("t,f,p\n0,1,2\n");
        let error = TraceIndex::build(file.path()).unwrap_err();
        assert!(matches!(error, EngineError::DegenerateTrace { count: 1 }));
    }

    #[test]
    fn header_only_is_degenerate() {
        let file = write_trace("t,f,p\n");
        let error = TraceIndex::build(file.path()).unwrap_err();
        assert!(matches!(error, EngineError::DegenerateTrace { count: 0 }));
    }

    #[test]
    fn zero_span_is_degenerate() {
        let file = write_trace("t,f,p\n3,1,2\n3,1,2\n");
        let error = TraceIndex::build(file.path()).unwrap_err();
        assert!(matches!(error, EngineError::DegenerateTrace { count: 2 }));
    }

    #[test]
    fn malformed_last_line() {
        let file = write_trace("t,f,p\n0,1,2\n1,1,2\nbad\n");
        let error = TraceIndex::build(file.path()).unwrap_err();
        assert!(matches!(error, EngineError::Parse { line: 4, .. }));
    }

    #[test]
    fn missing_file() {
        let error = TraceIndex::build("/nonexistent/trace.csv").unwrap_err();
        assert!(matches!(error, EngineError::Io { .. }));
    }
}
