use crate::{EngineError, EngineResult};
use fluotrace_common::{Real, RecordIndex};
use std::{fmt::Display, str::FromStr};

/// Number of leading fields each data line must carry.
const REQUIRED_FIELDS: usize = 3;

/// One line of a trace file: time, fluorescence and photomultiplier signal.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct TraceRecord {
    pub time: Real,
    pub fluo: Real,
    pub pmt: Real,
}

impl Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{0},{1},{2}", self.time, self.fluo, self.pmt)
    }
}

impl TraceRecord {
    /// Parses the leading `time,fluo,pmt` fields of a data line, ignoring any trailing fields.
    /// `line_number` is the 1-based line of the file, used to identify the offending line.
    pub fn parse(line: &str, line_number: usize) -> EngineResult<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split(',');
        let mut values = [Real::default(); REQUIRED_FIELDS];
        for (position, value) in values.iter_mut().enumerate() {
            let field = fields.next().ok_or_else(|| EngineError::Parse {
                line: line_number,
                reason: format!("expected {REQUIRED_FIELDS} fields, found {position}"),
            })?;
            *value = Real::from_str(field.trim()).map_err(|e| EngineError::Parse {
                line: line_number,
                reason: format!("field {position} '{}': {e}", field.trim()),
            })?;
        }
        let [time, fluo, pmt] = values;
        Ok(TraceRecord { time, fluo, pmt })
    }
}

/// The file line holding the given record: one for the header, one for 1-based counting.
pub(crate) fn line_number_of(index: RecordIndex) -> usize {
    index + 2
}

/// Parses a raw line known to hold the record at `index`.
pub(crate) fn parse_bytes(line: &[u8], index: RecordIndex) -> EngineResult<TraceRecord> {
    let line_number = line_number_of(index);
    let text = std::str::from_utf8(line).map_err(|e| EngineError::Parse {
        line: line_number,
        reason: e.to_string(),
    })?;
    TraceRecord::parse(text, line_number)
}

/// Whether the line carries a record at all.
pub(crate) fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_fields() {
        let record = TraceRecord::parse("10.5,4000,12\n", 2).unwrap();
        assert_eq!(
            record,
            TraceRecord {
                time: 10.5,
                fluo: 4000.0,
                pmt: 12.0
            }
        );
    }

    #[test]
    fn ignores_trailing_fields_and_crlf() {
        let record = TraceRecord::parse("1, 2 ,3,extra,more\r\n", 7).unwrap();
        assert_eq!(record.time, 1.0);
        assert_eq!(record.fluo, 2.0);
        assert_eq!(record.pmt, 3.0);
    }

    #[test]
    fn short_row_names_line() {
        let error = TraceRecord::parse("1,2", 42).unwrap_err();
        assert!(matches!(error, EngineError::Parse { line: 42, .. }));
    }

    #[test]
    fn non_numeric_field_names_line() {
        let error = TraceRecord::parse("1,abc,3", 9).unwrap_err();
        match error {
            EngineError::Parse { line, reason } => {
                assert_eq!(line, 9);
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn invalid_utf8() {
        let error = parse_bytes(&[0x31, 0x2c, 0xff, 0x2c, 0x33], 3).unwrap_err();
        assert!(matches!(error, EngineError::Parse { line: 5, .. }));
    }

    #[test]
    fn blank_lines() {
        assert!(is_blank(b"\n"));
        assert!(is_blank(b"  \r\n"));
        assert!(!is_blank(b"0,1,2\n"));
    }

    #[test]
    fn record_lines() {
        assert_eq!(line_number_of(0), 2);
        assert_eq!(line_number_of(9), 11);
    }
}
