//! # Background-flux integration
//!
//! Couples the geometric sweep to the external radiometric model. The model
//! itself is a collaborator behind the [`BackgroundModel`] trait: given a
//! pointing, an attitude angle, and a date window it returns a time series
//! of background flux estimates (DN/pix/ks). This module reduces each
//! series with a configured [`FluxStatistic`] and assembles a per-angle
//! [`FluxCurve`], used to rank geometrically valid angles by contamination
//! severity.
//!
//! The collaborator is the only potentially slow or failing stage of the
//! engine, so failures are isolated per angle: a call that errors or times
//! out produces a **missing sample** for that angle and the rest of the
//! curve is still computed. Calls are idempotent on the collaborator side,
//! so a bounded retry is offered.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hifitime::Epoch;
use itertools::Itertools;
use tracing::warn;

use crate::constants::Degree;
use crate::roguepath_errors::RoguePathError;

/// Date constraints handed to the background collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateWindow {
    pub start: Epoch,
    pub end: Epoch,
}

/// The external background-brightness collaborator.
///
/// Implementations must be thread safe: the integrator may issue calls from
/// a worker thread to honor its timeout.
pub trait BackgroundModel: Send + Sync {
    /// Background flux time series for a pointing at one attitude angle.
    ///
    /// Arguments
    /// ---------
    /// * `ra`, `dec`: pointing, degrees.
    /// * `angle`: attitude (V3 position angle), degrees in `[0, 360)`.
    /// * `window`: date constraints for the estimate.
    ///
    /// Return
    /// ------
    /// * A sequence of flux values (DN/pix/ks); the engine imposes no other
    ///   format requirement.
    fn flux_series(
        &self,
        ra: Degree,
        dec: Degree,
        angle: Degree,
        window: &DateWindow,
    ) -> Result<Vec<f64>, RoguePathError>;
}

/// Reducer applied to the collaborator's time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FluxStatistic {
    Minimum,
    Mean,
    Median,
    Custom(fn(&[f64]) -> f64),
}

impl FluxStatistic {
    /// Reduce a series to one value; `None` for an empty series.
    pub fn reduce(&self, series: &[f64]) -> Option<f64> {
        if series.is_empty() {
            return None;
        }
        match self {
            FluxStatistic::Minimum => series.iter().copied().reduce(f64::min),
            FluxStatistic::Mean => Some(series.iter().sum::<f64>() / series.len() as f64),
            FluxStatistic::Median => {
                let sorted: Vec<f64> = series.iter().copied().sorted_by(f64::total_cmp).collect();
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
            FluxStatistic::Custom(f) => Some(f(series)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FluxStatistic::Minimum => "min",
            FluxStatistic::Mean => "mean",
            FluxStatistic::Median => "median",
            FluxStatistic::Custom(_) => "custom",
        }
    }
}

/// One `(statistic, threshold fraction)` reduction configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxConfig {
    pub statistic: FluxStatistic,
    /// Threshold as a fraction of the statistic over the whole curve
    pub threshold_fraction: f64,
}

/// Which angles flux integration covers.
///
/// Both usages appear in practice, so the choice is explicit configuration
/// rather than a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxDomain {
    /// Only angles in the observation's supported set
    ValidOnly,
    /// Every candidate angle, contaminated or not
    FullSweep,
}

/// One point of a flux curve; `value` is `None` when the collaborator
/// failed or timed out for this angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxSample {
    pub angle: Degree,
    pub value: Option<f64>,
}

/// Per-angle threshold classification of a [`FluxCurve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMask {
    /// `fraction × statistic(curve)`; `None` when the curve has no samples
    pub threshold: Option<f64>,
    /// Per sample: `Some(true)` above threshold, `None` for missing samples
    pub above: Vec<Option<bool>>,
}

/// Reduced background flux as a function of attitude angle.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxCurve {
    pub statistic: FluxStatistic,
    pub samples: Vec<FluxSample>,
}

impl FluxCurve {
    /// Samples with a present value, as `(angle, value)` pairs.
    pub fn present(&self) -> impl Iterator<Item = (Degree, f64)> + '_ {
        self.samples
            .iter()
            .filter_map(|s| s.value.map(|v| (s.angle, v)))
    }

    /// Number of angles whose collaborator call failed or timed out.
    pub fn missing_count(&self) -> usize {
        self.samples.iter().filter(|s| s.value.is_none()).count()
    }

    /// Classify samples against `fraction × statistic(curve)`.
    ///
    /// The statistic is the same one that reduced the curve, applied over
    /// the present sample values.
    pub fn threshold_mask(&self, fraction: f64) -> ThresholdMask {
        let values: Vec<f64> = self.present().map(|(_, v)| v).collect();
        let threshold = self.statistic.reduce(&values).map(|s| s * fraction);

        let above = self
            .samples
            .iter()
            .map(|s| match (s.value, threshold) {
                (Some(v), Some(t)) => Some(v > t),
                _ => None,
            })
            .collect();

        ThresholdMask { threshold, above }
    }
}

/// Drives the background collaborator across a set of angles.
pub struct FluxIntegrator {
    model: Arc<dyn BackgroundModel + 'static>,
    window: DateWindow,
    timeout: Option<Duration>,
    retries: u32,
}

impl FluxIntegrator {
    /// Wrap a collaborator with a date window; no timeout, no retries.
    pub fn new(model: Arc<dyn BackgroundModel + 'static>, window: DateWindow) -> Self {
        FluxIntegrator {
            model,
            window,
            timeout: None,
            retries: 0,
        }
    }

    /// Give up on a single collaborator call after `timeout`; the angle's
    /// sample is then recorded as missing.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retry a failed or timed-out call up to `retries` additional times.
    /// The collaborator is idempotent, so retrying is safe.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Integrate one curve over the requested angles.
    ///
    /// Failures are isolated per angle: an error or timeout yields a
    /// missing sample and the remaining angles are still evaluated.
    pub fn integrate(
        &self,
        ra: Degree,
        dec: Degree,
        angles: &[Degree],
        statistic: FluxStatistic,
    ) -> FluxCurve {
        let samples = angles
            .iter()
            .map(|&angle| FluxSample {
                angle,
                value: self
                    .fetch_series(ra, dec, angle)
                    .and_then(|series| statistic.reduce(&series)),
            })
            .collect();

        FluxCurve { statistic, samples }
    }

    /// Integrate one curve per configuration over the same angles, fetching
    /// each angle's series from the collaborator only once.
    pub fn integrate_configs(
        &self,
        ra: Degree,
        dec: Degree,
        angles: &[Degree],
        configs: &[FluxConfig],
    ) -> Vec<FluxCurve> {
        let series_per_angle: Vec<Option<Vec<f64>>> = angles
            .iter()
            .map(|&angle| self.fetch_series(ra, dec, angle))
            .collect();

        configs
            .iter()
            .map(|config| {
                let samples = angles
                    .iter()
                    .zip(&series_per_angle)
                    .map(|(&angle, series)| FluxSample {
                        angle,
                        value: series
                            .as_deref()
                            .and_then(|s| config.statistic.reduce(s)),
                    })
                    .collect();
                FluxCurve {
                    statistic: config.statistic,
                    samples,
                }
            })
            .collect()
    }

    /// One collaborator call with retry and timeout; `None` when every
    /// attempt failed.
    fn fetch_series(&self, ra: Degree, dec: Degree, angle: Degree) -> Option<Vec<f64>> {
        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            match self.call_once(ra, dec, angle) {
                Ok(series) => return Some(series),
                Err(err) => {
                    warn!(angle, attempt, %err, "background model call failed");
                }
            }
        }
        None
    }

    fn call_once(
        &self,
        ra: Degree,
        dec: Degree,
        angle: Degree,
    ) -> Result<Vec<f64>, RoguePathError> {
        let Some(timeout) = self.timeout else {
            return self.model.flux_series(ra, dec, angle, &self.window);
        };

        let model = Arc::clone(&self.model);
        let window = self.window;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // Receiver may be gone if we already timed out; ignore the send error.
            let _ = tx.send(model.flux_series(ra, dec, angle, &window));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => Err(RoguePathError::BackgroundModelTimeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    struct ConstantModel(Vec<f64>);

    impl BackgroundModel for ConstantModel {
        fn flux_series(
            &self,
            _ra: Degree,
            _dec: Degree,
            _angle: Degree,
            _window: &DateWindow,
        ) -> Result<Vec<f64>, RoguePathError> {
            Ok(self.0.clone())
        }
    }

    /// Fails for one specific angle, succeeds elsewhere.
    struct FlakyModel {
        bad_angle: Degree,
    }

    impl BackgroundModel for FlakyModel {
        fn flux_series(
            &self,
            _ra: Degree,
            _dec: Degree,
            angle: Degree,
            _window: &DateWindow,
        ) -> Result<Vec<f64>, RoguePathError> {
            if (angle - self.bad_angle).abs() < 1e-9 {
                Err(RoguePathError::BackgroundModelFailure("ephemeris gap".into()))
            } else {
                Ok(vec![angle, angle + 1.0])
            }
        }
    }

    fn window() -> DateWindow {
        // One year starting 2025-01-01.
        DateWindow {
            start: Epoch::from_mjd_utc(60676.0),
            end: Epoch::from_mjd_utc(61041.0),
        }
    }

    #[test]
    fn test_statistics() {
        let series = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(FluxStatistic::Minimum.reduce(&series), Some(1.0));
        assert_eq!(FluxStatistic::Mean.reduce(&series), Some(2.5));
        assert_eq!(FluxStatistic::Median.reduce(&series), Some(2.5));
        assert_eq!(FluxStatistic::Median.reduce(&[5.0, 1.0, 9.0]), Some(5.0));
        assert_eq!(FluxStatistic::Mean.reduce(&[]), None);

        fn last(series: &[f64]) -> f64 {
            *series.last().unwrap()
        }
        assert_eq!(FluxStatistic::Custom(last).reduce(&series), Some(2.0));
    }

    #[test]
    fn test_fault_isolation() {
        let model = Arc::new(FlakyModel { bad_angle: 2.0 });
        let integrator = FluxIntegrator::new(model, window());

        let angles = [0.0, 1.0, 2.0, 3.0];
        let curve = integrator.integrate(10.0, -5.0, &angles, FluxStatistic::Minimum);

        assert_eq!(curve.samples.len(), 4);
        assert_eq!(curve.missing_count(), 1);
        assert_eq!(curve.samples[2].value, None);
        assert_eq!(curve.samples[3].value, Some(3.0));
    }

    #[test]
    fn test_timeout_is_a_missing_sample() {
        struct SlowModel;
        impl BackgroundModel for SlowModel {
            fn flux_series(
                &self,
                _ra: Degree,
                _dec: Degree,
                _angle: Degree,
                _window: &DateWindow,
            ) -> Result<Vec<f64>, RoguePathError> {
                thread::sleep(Duration::from_millis(200));
                Ok(vec![1.0])
            }
        }

        let integrator = FluxIntegrator::new(Arc::new(SlowModel), window())
            .with_timeout(Duration::from_millis(10));
        let curve = integrator.integrate(0.0, 0.0, &[0.0], FluxStatistic::Mean);
        assert_eq!(curve.samples[0].value, None);
    }

    #[test]
    fn test_multiple_configs_share_fetches() {
        let integrator = FluxIntegrator::new(
            Arc::new(ConstantModel(vec![2.0, 4.0, 6.0])),
            window(),
        );
        let configs = [
            FluxConfig { statistic: FluxStatistic::Minimum, threshold_fraction: 2.0 },
            FluxConfig { statistic: FluxStatistic::Mean, threshold_fraction: 1.0 },
        ];
        let curves = integrator.integrate_configs(0.0, 0.0, &[0.0, 90.0], &configs);

        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].samples[0].value, Some(2.0));
        assert_eq!(curves[1].samples[1].value, Some(4.0));
    }

    #[test]
    fn test_threshold_mask() {
        let curve = FluxCurve {
            statistic: FluxStatistic::Mean,
            samples: vec![
                FluxSample { angle: 0.0, value: Some(1.0) },
                FluxSample { angle: 1.0, value: Some(3.0) },
                FluxSample { angle: 2.0, value: None },
            ],
        };

        let mask = curve.threshold_mask(1.0);
        assert_relative_eq!(mask.threshold.unwrap(), 2.0);
        assert_eq!(mask.above, vec![Some(false), Some(true), None]);
    }
}
