//! The feature table written after isolation, and reading it back.
use crate::{EngineError, EngineResult, PeakFeature};
use fluotrace_common::Real;
use std::{fs::File, path::Path, str::FromStr};
use tracing::{info, instrument};

/// Column titles of the feature table, kept exactly as downstream spreadsheets expect them.
pub const FEATURE_HEADER: [&str; 2] = ["Duration [us]", "Intensity []a.u]"];

/// Writes one `duration,intensity` row per feature beneath [FEATURE_HEADER].
///
/// An empty feature list still produces the header.
#[instrument(skip_all, fields(path = %path.as_ref().display(), features = features.len()))]
pub fn write_features(path: impl AsRef<Path>, features: &[PeakFeature]) -> EngineResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(EngineError::io(path))?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);
    writer
        .write_record(FEATURE_HEADER)
        .map_err(EngineError::csv(path))?;
    for feature in features {
        writer
            .write_record([feature.duration.to_string(), feature.intensity.to_string()])
            .map_err(EngineError::csv(path))?;
    }
    writer.flush().map_err(EngineError::io(path))?;
    info!("Features exported");
    Ok(())
}

/// Parses a feature table produced by [write_features].
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_features(path: impl AsRef<Path>) -> EngineResult<Vec<PeakFeature>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(EngineError::io(path))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);
    reader
        .records()
        .map(|record| {
            let record = record.map_err(EngineError::csv(path))?;
            let line = record
                .position()
                .map(|position| position.line() as usize)
                .unwrap_or_default();
            let field = |position: usize| -> EngineResult<Real> {
                let text = record.get(position).ok_or_else(|| EngineError::Parse {
                    line,
                    reason: format!("expected 2 fields, found {}", record.len()),
                })?;
                Real::from_str(text.trim()).map_err(|e| EngineError::Parse {
                    line,
                    reason: format!("field {position} '{text}': {e}"),
                })
            };
            Ok(PeakFeature {
                duration: field(0)?,
                intensity: field(1)?,
            })
        })
        .collect()
}
