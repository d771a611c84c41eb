use crate::{PeakSegment, SmoothingWindow};
use fluotrace_common::Real;
use std::fmt::Display;
use tracing::{instrument, trace};

/// Summary of one isolated peak.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct PeakFeature {
    /// Time from the first to the last sample of the segment, in file-native units.
    pub duration: Real,
    /// Maximum of the segment's own smoothed fluorescence.
    pub intensity: Real,
}

impl Display for PeakFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{0},{1}", self.duration, self.intensity)
    }
}

impl PeakFeature {
    /// Re-smooths the segment in isolation and measures it.
    ///
    /// Segments are built longer than the window that produced them, so a shorter one
    /// is a broken invariant rather than bad input.
    pub fn measure(segment: &PeakSegment, window: SmoothingWindow) -> Self {
        assert!(
            segment.len() >= window.len(),
            "segment of {} samples is shorter than window {window}",
            segment.len()
        );
        let fluo: Vec<Real> = segment.fluo().collect();
        let intensity = window
            .apply(&fluo)
            .into_iter()
            .fold(Real::NEG_INFINITY, Real::max);
        let duration = match segment.samples() {
            [(first, _), .., (last, _)] => last - first,
            _ => 0.0,
        };
        Self {
            duration,
            intensity,
        }
    }
}

/// One feature per segment, in segment order.
#[instrument(skip_all, fields(segments = segments.len(), window = window.len()))]
pub fn extract(segments: &[PeakSegment], window: SmoothingWindow) -> Vec<PeakFeature> {
    let features: Vec<_> = segments
        .iter()
        .map(|segment| PeakFeature::measure(segment, window))
        .collect();
    trace!(features = features.len(), "Features extracted");
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn flat_segment() {
        let segments = segment(&[0.0, 10.0, 20.0, 1000.0], &[5000.0; 4], 1000.0 / 3.0, 1000.0, 1)
            .unwrap();
        let features = extract(&segments, SmoothingWindow::new(1));
        assert_eq!(
            features,
            vec![PeakFeature {
                duration: 20.0,
                intensity: 5000.0
            }]
        );
    }

    #[test]
    fn intensity_uses_local_smoothing() {
        let time: Vec<Real> = (0..7).map(Real::from).collect();
        let fluo = [10.0, 10.0, 40.0, 10.0, 10.0, 10.0, 10.0];
        // The fitted head of the whole trace dips to 5, dropping the first sample
        let segments = segment(&time, &fluo, 1.0, 6.0, 3).unwrap();
        assert_eq!(segments.len(), 1);
        let features = extract(&segments, SmoothingWindow::new(3));
        assert_approx_eq!(features[0].intensity, 20.0, 1e-9);
        assert_approx_eq!(features[0].duration, 5.0);
    }

    #[test]
    fn no_segments_no_features() {
        assert!(extract(&[], SmoothingWindow::new(5)).is_empty());
    }

    #[test]
    fn displays_as_row() {
        let feature = PeakFeature {
            duration: 20.0,
            intensity: 5000.5,
        };
        assert_eq!(feature.to_string(), "20,5000.5");
    }
}
