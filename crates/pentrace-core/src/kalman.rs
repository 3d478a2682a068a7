//! Constant-acceleration Kalman filter for 2D pixel tracking.
//!
//! State is `[x, y, vx, vy]`. A scalar control acceleration is applied to
//! both axes each step, and process noise follows the constant-acceleration
//! model scaled by a noise magnitude. The filter holds a predicted/corrected
//! state pair: each frame must `predict()` first and then `correct()` with
//! the observed position.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

use crate::geometry::Point;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KalmanError {
    /// `correct` was called without a pending prediction.
    CorrectBeforePredict,
    /// The innovation covariance could not be inverted.
    SingularInnovation,
}

impl std::fmt::Display for KalmanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CorrectBeforePredict => write!(f, "correct called before predict"),
            Self::SingularInnovation => write!(f, "innovation covariance is singular"),
        }
    }
}

impl std::error::Error for KalmanError {}

// ── Configuration ────────────────────────────────────────────────────────

/// Filter tuning parameters.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct KalmanConfig {
    /// Time between frames in filter units.
    pub timestep: f64,
    /// Control acceleration applied to both axes each step.
    pub acceleration: f64,
    /// Process noise magnitude (standard deviation of the acceleration).
    pub accel_noise_mag: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0,
            acceleration: 0.5,
            accel_noise_mag: 1.5,
        }
    }
}

// ── Filter ───────────────────────────────────────────────────────────────

/// One state estimate: mean vector `[x, y, vx, vy]` and its covariance.
#[derive(Debug, Clone)]
pub struct KalmanState {
    pub state: Vector4<f64>,
    pub covariance: Matrix4<f64>,
}

impl KalmanState {
    /// Rounded pixel position of the state mean.
    pub fn position(&self) -> Point {
        Point::new(self.state[0].round() as i32, self.state[1].round() as i32)
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.state[2], self.state[3])
    }
}

pub struct KalmanFilter {
    transition: Matrix4<f64>,
    control: Vector4<f64>,
    process_noise: Matrix4<f64>,
    measurement_noise: Matrix2<f64>,
    measurement: Matrix2x4<f64>,
    predicted: Option<KalmanState>,
    corrected: KalmanState,
}

impl KalmanFilter {
    /// Seed the filter at `initial` with zero velocity. The initial
    /// covariance equals the process noise.
    pub fn new(initial: Point, config: &KalmanConfig) -> Self {
        let t = config.timestep;
        let transition = Matrix4::new(
            1.0, 0.0, t, 0.0, //
            0.0, 1.0, 0.0, t, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        let g = Vector4::new(t * t / 2.0, t * t / 2.0, t, t);
        let control = g * config.acceleration;

        let q = config.accel_noise_mag * config.accel_noise_mag;
        let t2 = t * t;
        let t3 = t2 * t / 2.0;
        let t4 = t2 * t2 / 4.0;
        let process_noise = Matrix4::new(
            t4, 0.0, t3, 0.0, //
            0.0, t4, 0.0, t3, //
            t3, 0.0, t2, 0.0, //
            0.0, t3, 0.0, t2,
        ) * q;

        let corrected = KalmanState {
            state: Vector4::new(initial.x as f64, initial.y as f64, 0.0, 0.0),
            covariance: process_noise,
        };

        Self {
            transition,
            control,
            process_noise,
            measurement_noise: Matrix2::identity(),
            measurement: Matrix2x4::new(1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0),
            predicted: None,
            corrected,
        }
    }

    /// Advance one step and cache the predicted state.
    pub fn predict(&mut self) -> Point {
        let state = self.transition * self.corrected.state + self.control;
        let covariance =
            self.transition * self.corrected.covariance * self.transition.transpose()
                + self.process_noise;
        let predicted = KalmanState { state, covariance };
        let position = predicted.position();
        self.predicted = Some(predicted);
        position
    }

    /// Fuse a position measurement into the pending prediction.
    pub fn correct(&mut self, measurement: Point) -> Result<Point, KalmanError> {
        let pred = self
            .predicted
            .take()
            .ok_or(KalmanError::CorrectBeforePredict)?;

        let c = self.measurement;
        let innovation_cov = c * pred.covariance * c.transpose() + self.measurement_noise;
        let innovation_inv = match innovation_cov.try_inverse() {
            Some(inv) => inv,
            None => {
                // Put the prediction back so the caller can recover.
                self.predicted = Some(pred);
                return Err(KalmanError::SingularInnovation);
            }
        };

        let gain = pred.covariance * c.transpose() * innovation_inv;
        let z = Vector2::new(measurement.x as f64, measurement.y as f64);
        let state = pred.state + gain * (z - c * pred.state);
        let covariance = (Matrix4::identity() - gain * c) * pred.covariance;
        self.corrected = KalmanState { state, covariance };
        Ok(self.corrected.position())
    }

    /// The cached prediction, if `predict` has run since the last `correct`.
    pub fn predicted(&self) -> Option<&KalmanState> {
        self.predicted.as_ref()
    }

    pub fn corrected(&self) -> &KalmanState {
        &self.corrected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn config_defaults_are_stable() {
        let cfg = KalmanConfig::default();
        assert_relative_eq!(cfg.timestep, 1.0);
        assert_relative_eq!(cfg.acceleration, 0.5);
        assert_relative_eq!(cfg.accel_noise_mag, 1.5);
    }

    #[test]
    fn correct_with_predicted_position_is_a_fixed_point() {
        // Zero control keeps the prediction at integer coordinates, so the
        // innovation is exactly zero and the position must not move.
        let cfg = KalmanConfig {
            acceleration: 0.0,
            ..KalmanConfig::default()
        };
        let mut filter = KalmanFilter::new(Point::new(50, 80), &cfg);
        let predicted = filter.predict();
        assert_eq!(predicted, Point::new(50, 80));
        let corrected = filter.correct(predicted).unwrap();
        assert_eq!(corrected, predicted);
        let state = filter.corrected().state;
        assert_relative_eq!(state[0], 50.0);
        assert_relative_eq!(state[1], 80.0);
    }

    #[test]
    fn correct_before_predict_is_a_usage_error() {
        let mut filter = KalmanFilter::new(Point::new(0, 0), &KalmanConfig::default());
        assert_eq!(
            filter.correct(Point::new(1, 1)),
            Err(KalmanError::CorrectBeforePredict)
        );
    }

    #[test]
    fn second_correct_without_predict_errors() {
        let mut filter = KalmanFilter::new(Point::new(10, 10), &KalmanConfig::default());
        filter.predict();
        filter.correct(Point::new(12, 10)).unwrap();
        assert_eq!(
            filter.correct(Point::new(12, 10)),
            Err(KalmanError::CorrectBeforePredict)
        );
    }

    #[test]
    fn converges_on_constant_velocity_motion() {
        let cfg = KalmanConfig {
            acceleration: 0.0,
            ..KalmanConfig::default()
        };
        let mut filter = KalmanFilter::new(Point::new(0, 0), &cfg);
        let mut last_error = f64::INFINITY;
        for i in 1..=20 {
            let truth = 5.0 * i as f64;
            let predicted = filter.predict();
            if i >= 15 {
                last_error = (predicted.x as f64 - truth).abs();
            }
            filter.correct(Point::new(truth as i32, 0)).unwrap();
        }
        assert!(last_error < 1.0, "late prediction error {last_error}");
        assert_relative_eq!(filter.corrected().state[1], 0.0);
    }
}
