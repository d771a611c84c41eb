use crate::parameters::SimulateParameters;
use anyhow::{Context, Result, ensure};
use fluotrace_common::Real;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use std::{
    fs::File,
    io::{BufWriter, Write},
};
use tracing::{debug, info, instrument};

const HEADER: &str = "time,fluorescence,pmt";

/// Ratio of the photomultiplier baseline to the fluorescence baseline.
const PMT_BASELINE_RATIO: Real = 0.1;

#[derive(Debug, Clone, Copy)]
pub(crate) struct GaussianPeak {
    /// Position of the maximum, in records.
    centre: Real,
    /// Standard deviation, in records.
    sd: Real,
    amplitude: Real,
}

impl GaussianPeak {
    fn sample<R: Rng>(parameters: &SimulateParameters, rng: &mut R) -> Self {
        Self {
            centre: rng.random_range(0.0..parameters.records as Real),
            sd: rng.random_range(parameters.min_width..=parameters.max_width),
            amplitude: rng.random_range(parameters.min_amplitude..=parameters.max_amplitude),
        }
    }

    fn value_at(&self, position: Real) -> Real {
        let z = (position - self.centre) / self.sd;
        self.amplitude * (-0.5 * z * z).exp()
    }
}

fn validate(parameters: &SimulateParameters) -> Result<()> {
    ensure!(
        parameters.records >= 2,
        "A trace needs at least two records, {} requested",
        parameters.records
    );
    ensure!(
        parameters.interval > 0.0,
        "Interval must be positive, got {}",
        parameters.interval
    );
    ensure!(
        parameters.min_amplitude <= parameters.max_amplitude,
        "Amplitude range {}..{} is empty",
        parameters.min_amplitude,
        parameters.max_amplitude
    );
    ensure!(
        0.0 < parameters.min_width && parameters.min_width <= parameters.max_width,
        "Width range {}..{} must be positive and non-empty",
        parameters.min_width,
        parameters.max_width
    );
    Ok(())
}

/// Writes a synthetic trace to `writer`, returning the peaks placed in it.
pub(crate) fn write_trace<W: Write, R: Rng>(
    writer: &mut W,
    parameters: &SimulateParameters,
    rng: &mut R,
) -> Result<Vec<GaussianPeak>> {
    validate(parameters)?;
    let noise = Normal::new(0.0, parameters.noise).context("Invalid noise level")?;
    let peaks: Vec<_> = (0..parameters.peaks)
        .map(|_| GaussianPeak::sample(parameters, rng))
        .collect();
    debug!(?peaks, "Peaks placed");

    let pmt_baseline = parameters.baseline * PMT_BASELINE_RATIO;
    writeln!(writer, "{HEADER}")?;
    for record in 0..parameters.records {
        let position = record as Real;
        let time = position * parameters.interval;
        let signal: Real = peaks.iter().map(|peak| peak.value_at(position)).sum();
        let fluo = parameters.baseline + signal + noise.sample(rng);
        let pmt = pmt_baseline + noise.sample(rng);
        writeln!(writer, "{time},{},{}", fluo.round(), pmt.round())?;
    }
    Ok(peaks)
}

#[instrument(skip_all, fields(output = %parameters.output.display(), records = parameters.records))]
pub(crate) fn simulate(parameters: &SimulateParameters) -> Result<()> {
    let mut rng = match parameters.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let file = File::create(&parameters.output)
        .with_context(|| format!("Cannot create {}", parameters.output.display()))?;
    let mut writer = BufWriter::new(file);
    let peaks = write_trace(&mut writer, parameters, &mut rng)?;
    writer.flush()?;
    info!(peaks = peaks.len(), "Trace simulated");
    Ok(())
}
