//! Per-column statistics over feature tables gathered from many traces.
//!
//! Columns may have different lengths; a short column simply leaves its cells empty in
//! the rows beyond its end.
use crate::{EngineError, EngineResult};
use fluotrace_common::Real;
use std::{fmt::Display, fs::File, path::Path, str::FromStr};
use tracing::{instrument, warn};

/// Columns with fewer values than this are reported as sparse.
pub const DEFAULT_MIN_COUNT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    /// `NaN` for a column with no values.
    pub mean: Real,
    /// Standard error of the mean; zero with fewer than two values.
    pub sem: Real,
    pub sparse: bool,
}

impl ColumnSummary {
    fn new(name: String, values: &[Real], min_count: usize) -> Self {
        let count = values.len();
        let n = count as Real;
        let mean = values.iter().sum::<Real>() / n;
        let sem = if count < 2 {
            0.0
        } else {
            let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<Real>() / (n - 1.0);
            (variance / n).sqrt()
        };
        Self {
            name,
            count,
            mean,
            sem,
            sparse: count < min_count,
        }
    }
}

impl Display for ColumnSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: n = {}, mean = {} ± {}",
            self.name, self.count, self.mean, self.sem
        )?;
        if self.sparse {
            write!(f, " (sparse)")?;
        }
        Ok(())
    }
}

/// Summarises every column of a headed CSV file, in header order.
///
/// Empty cells are missing values. Any other cell must be numeric.
#[instrument(skip_all, fields(path = %path.as_ref().display(), min_count))]
pub fn summarise_columns(
    path: impl AsRef<Path>,
    min_count: usize,
) -> EngineResult<Vec<ColumnSummary>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(EngineError::io(path))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);
    let names: Vec<String> = reader
        .headers()
        .map_err(EngineError::csv(path))?
        .iter()
        .map(|name| name.trim().to_owned())
        .collect();
    let mut columns = vec![Vec::<Real>::new(); names.len()];

    for record in reader.records() {
        let record = record.map_err(EngineError::csv(path))?;
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or_default();
        if record.len() > names.len() {
            warn!(line, "Row has more cells than the header, extra cells ignored");
        }
        for (position, (cell, column)) in record.iter().zip(columns.iter_mut()).enumerate() {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            column.push(Real::from_str(cell).map_err(|e| EngineError::Parse {
                line,
                reason: format!("column {position} '{cell}': {e}"),
            })?);
        }
    }

    Ok(names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| ColumnSummary::new(name, &values, min_count))
        .collect())
}
