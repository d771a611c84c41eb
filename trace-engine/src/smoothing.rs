use crate::{EngineError, EngineResult};
use fluotrace_common::Real;
use std::fmt::Display;

/// Length of a degree one Savitzky-Golay smoothing window.
///
/// The length is always odd: an even request is raised to the next odd value and zero
/// becomes one. This is the only place where window lengths are corrected, callers pass
/// whatever they were given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingWindow {
    size: usize,
}

impl Default for SmoothingWindow {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Display for SmoothingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.size)
    }
}

impl From<usize> for SmoothingWindow {
    fn from(size: usize) -> Self {
        Self::new(size)
    }
}

impl SmoothingWindow {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size: if size % 2 == 0 { size + 1 } else { size },
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    fn half(&self) -> usize {
        self.size / 2
    }

    /// Smooths a channel, returning a channel of the same length.
    ///
    /// Interior samples are the centred moving average over the window. The first and last
    /// half-window samples are read off the straight line fitted by least squares to the
    /// first (respectively last) full window.
    ///
    /// # Errors
    /// [EngineError::InsufficientData] if the window is longer than the channel.
    pub fn smooth(&self, channel: &[Real]) -> EngineResult<Vec<Real>> {
        if self.size > channel.len() {
            return Err(EngineError::InsufficientData {
                window: self.size,
                available: channel.len(),
            });
        }
        Ok(self.apply(channel))
    }

    /// Smooths a channel already known to be at least one window long.
    pub(crate) fn apply(&self, channel: &[Real]) -> Vec<Real> {
        let size = self.size;
        let half = self.half();
        if size == 1 {
            return channel.to_vec();
        }
        let len = channel.len();
        let mut smoothed = Vec::with_capacity(len);

        let head = LineFit::new(&channel[..size]);
        smoothed.extend((0..half).map(|x| head.at(x)));

        let mut sum: Real = channel[..size].iter().sum();
        smoothed.push(sum / size as Real);
        for (outgoing, incoming) in channel.iter().zip(&channel[size..]) {
            sum += incoming - outgoing;
            smoothed.push(sum / size as Real);
        }

        let tail = LineFit::new(&channel[len - size..]);
        smoothed.extend((size - half..size).map(|x| tail.at(x)));
        smoothed
    }
}

/// Convenience wrapper building the window on the fly.
pub fn smooth(channel: &[Real], window: usize) -> EngineResult<Vec<Real>> {
    SmoothingWindow::new(window).smooth(channel)
}

/// Least squares line through `values` sampled at `x = 0, 1, ..., n - 1`.
struct LineFit {
    centre: Real,
    mean: Real,
    slope: Real,
}

impl LineFit {
    fn new(values: &[Real]) -> Self {
        let n = values.len() as Real;
        let centre = (n - 1.0) / 2.0;
        let mean = values.iter().sum::<Real>() / n;
        let covariance: Real = values
            .iter()
            .enumerate()
            .map(|(x, y)| (x as Real - centre) * (y - mean))
            .sum();
        let variance = n * (n * n - 1.0) / 12.0;
        Self {
            centre,
            mean,
            slope: covariance / variance,
        }
    }

    fn at(&self, x: usize) -> Real {
        self.mean + self.slope * (x as Real - self.centre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn window_is_forced_odd() {
        assert_eq!(SmoothingWindow::new(0).len(), 1);
        assert_eq!(SmoothingWindow::new(1).len(), 1);
        assert_eq!(SmoothingWindow::new(4).len(), 5);
        assert_eq!(SmoothingWindow::new(31).len(), 31);
        assert_eq!(SmoothingWindow::from(30), SmoothingWindow::new(31));
    }

    #[test]
    fn unit_window_is_identity() {
        let data = [3.0, -1.0, 7.5];
        assert_eq!(smooth(&data, 1).unwrap(), data.to_vec());
    }

    #[test]
    fn window_longer_than_channel() {
        let error = smooth(&[1.0, 2.0], 3).unwrap_err();
        assert!(matches!(
            error,
            EngineError::InsufficientData {
                window: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn even_window_checked_after_correction() {
        // 4 becomes 5, which no longer fits into four samples
        let error = smooth(&[1.0, 2.0, 3.0, 4.0], 4).unwrap_err();
        assert!(matches!(error, EngineError::InsufficientData { window: 5, .. }));
    }

    #[test]
    fn empty_channel() {
        assert!(smooth(&[], 1).is_err());
    }

    #[test]
    fn constant_data() {
        let data = [5000.0; 12];
        let output = smooth(&data, 5).unwrap();
        assert_eq!(output.len(), data.len());
        for value in output {
            assert_approx_eq!(value, 5000.0);
        }
    }

    #[test]
    fn straight_lines_are_preserved() {
        let data: Vec<Real> = (0..20).map(|i| 2.5 * i as Real - 7.0).collect();
        let output = smooth(&data, 7).unwrap();
        for (x, y) in data.iter().zip(output) {
            assert_approx_eq!(*x, y, 1e-9);
        }
    }

    #[test]
    fn moving_average_with_fitted_edges() {
        let output = smooth(&[1.0, 2.0, 3.0, 4.0, 100.0], 3).unwrap();
        assert_eq!(output.len(), 5);
        assert_approx_eq!(output[0], 1.0, 1e-9);
        assert_approx_eq!(output[1], 2.0, 1e-9);
        assert_approx_eq!(output[2], 3.0, 1e-9);
        assert_approx_eq!(output[3], 107.0 / 3.0, 1e-9);
        assert_approx_eq!(output[4], 107.0 / 3.0 + 48.5, 1e-9);
    }

    #[test]
    fn window_equal_to_length() {
        let output = smooth(&[0.0, 3.0, 0.0], 3).unwrap();
        for value in output {
            assert_approx_eq!(value, 1.0, 1e-9);
        }
    }
}
