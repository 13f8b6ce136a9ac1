//! Constant-velocity Kalman filter over the bottom-centre point of a box.
//!
//! State is `[x, y, vx, vy]` with a time step of one frame; only `(x, y)` is
//! observed. Matrices are held in ndarray, the 2x2 innovation inverse goes
//! through nalgebra.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ConfigError, EstimatorError};

const STATE_DIM: usize = 4;
const MEASUREMENT_DIM: usize = 2;

/// Noise parameters shared by every estimator of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanParams {
    /// Diagonal process-noise variance per state dimension
    pub process_noise: f64,
    /// Diagonal measurement-noise variance per observed dimension
    pub measurement_noise: f64,
    /// Upper bound on any diagonal covariance entry after prediction
    pub covariance_ceiling: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            process_noise: 0.03,
            measurement_noise: 0.5,
            covariance_ceiling: 1e4,
        }
    }
}

impl KalmanParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("kalman.process_noise", self.process_noise),
            ("kalman.measurement_noise", self.measurement_noise),
            ("kalman.covariance_ceiling", self.covariance_ceiling),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidNoise { name, value });
            }
        }
        Ok(())
    }
}

/// One filter instance, owned by exactly one track.
#[derive(Debug, Clone)]
pub struct KalmanEstimator {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_cov: Array2<f64>,
    measurement_cov: Array2<f64>,
    covariance_ceiling: f64,
}

impl KalmanEstimator {
    /// Start a filter at `measurement` with zero velocity and identity covariance.
    pub fn new(measurement: [f64; 2], params: &KalmanParams) -> Self {
        let mut motion_mat = Array2::eye(STATE_DIM);
        for i in 0..MEASUREMENT_DIM {
            motion_mat[[i, MEASUREMENT_DIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((MEASUREMENT_DIM, STATE_DIM));
        for i in 0..MEASUREMENT_DIM {
            update_mat[[i, i]] = 1.0;
        }

        let mut mean = Array1::zeros(STATE_DIM);
        mean[0] = measurement[0];
        mean[1] = measurement[1];

        Self {
            mean,
            covariance: Array2::eye(STATE_DIM),
            motion_mat,
            update_mat,
            process_cov: Array2::eye(STATE_DIM) * params.process_noise,
            measurement_cov: Array2::eye(MEASUREMENT_DIM) * params.measurement_noise,
            covariance_ceiling: params.covariance_ceiling,
        }
    }

    /// Current position estimate `(x, y)`.
    pub fn position(&self) -> (f64, f64) {
        (self.mean[0], self.mean[1])
    }

    /// Current velocity estimate `(vx, vy)` in pixels per frame.
    pub fn velocity(&self) -> (f64, f64) {
        (self.mean[2], self.mean[3])
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Advance one frame: `x' = F x`, `P' = F P F^T + Q`.
    pub fn predict(&mut self) {
        self.mean = self.motion_mat.dot(&self.mean);
        let predicted = self.motion_mat.dot(&self.covariance).dot(&self.motion_mat.t()) + &self.process_cov;
        self.covariance = self.bounded(predicted);
        trace!(x = self.mean[0], y = self.mean[1], "kalman predict");
    }

    /// Fold an observed `(x, y)` into the predicted state.
    pub fn correct(&mut self, measurement: [f64; 2]) -> Result<(), EstimatorError> {
        let projected_mean = self.update_mat.dot(&self.mean);
        let projected_cov = self.update_mat.dot(&self.covariance).dot(&self.update_mat.t()) + &self.measurement_cov;

        let innovation = Array1::from_vec(measurement.to_vec()) - projected_mean;
        let s_inv = invert_2x2(&projected_cov)?;

        // K = P * H^T * S^-1
        let pht = self.covariance.dot(&self.update_mat.t());
        let kalman_gain = pht.dot(&s_inv);

        self.mean = &self.mean + &kalman_gain.dot(&innovation);
        self.covariance = &self.covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());
        trace!(x = self.mean[0], y = self.mean[1], "kalman correct");
        Ok(())
    }

    /// Symmetrise and, past the ceiling, rescale so the largest variance equals it.
    fn bounded(&self, covariance: Array2<f64>) -> Array2<f64> {
        let symmetric = (&covariance + &covariance.t()) * 0.5;
        let largest = symmetric
            .diag()
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        if largest > self.covariance_ceiling {
            symmetric * (self.covariance_ceiling / largest)
        } else {
            symmetric
        }
    }
}

fn invert_2x2(m: &Array2<f64>) -> Result<Array2<f64>, EstimatorError> {
    let nm = nalgebra::Matrix2::new(m[[0, 0]], m[[0, 1]], m[[1, 0]], m[[1, 1]]);
    let inv = nm.try_inverse().ok_or(EstimatorError::SingularInnovation)?;
    if inv.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::SingularInnovation);
    }
    let mut res = Array2::zeros((MEASUREMENT_DIM, MEASUREMENT_DIM));
    for i in 0..MEASUREMENT_DIM {
        for j in 0..MEASUREMENT_DIM {
            res[[i, j]] = inv[(i, j)];
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_initiate() {
        let kf = KalmanEstimator::new([100.0, 200.0], &KalmanParams::default());
        assert_eq!(kf.position(), (100.0, 200.0));
        assert_eq!(kf.velocity(), (0.0, 0.0));
        assert_eq!(kf.covariance(), &Array2::<f64>::eye(4));
    }

    #[test]
    fn test_predict_moves_by_velocity() {
        let mut kf = KalmanEstimator::new([100.0, 100.0], &KalmanParams::default());
        kf.mean[2] = 10.0;
        kf.mean[3] = 5.0;
        kf.predict();

        assert_relative_eq!(kf.position().0, 110.0);
        assert_relative_eq!(kf.position().1, 105.0);
        assert_relative_eq!(kf.velocity().0, 10.0);
        // P' = F I F^T + Q: position variance picks up velocity variance
        assert_relative_eq!(kf.covariance()[[0, 0]], 2.03, epsilon = 1e-12);
        assert_relative_eq!(kf.covariance()[[2, 2]], 1.03, epsilon = 1e-12);
        assert_relative_eq!(kf.covariance()[[0, 2]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_correct_pulls_towards_measurement() {
        let mut kf = KalmanEstimator::new([100.0, 100.0], &KalmanParams::default());
        kf.predict();
        let before = kf.covariance()[[0, 0]];
        kf.correct([110.0, 104.0]).unwrap();

        let (x, y) = kf.position();
        assert!(x > 100.0 && x < 110.0);
        assert!(y > 100.0 && y < 104.0);
        assert!(kf.covariance()[[0, 0]] < before);
        assert!(kf.velocity().0 > 0.0);
    }

    #[test]
    fn test_converges_on_constant_velocity_path() {
        let mut kf = KalmanEstimator::new([100.0, 200.0], &KalmanParams::default());
        for t in 1..=20 {
            let truth = [100.0 + 10.0 * t as f64, 200.0 + 5.0 * t as f64];
            kf.predict();
            kf.correct(truth).unwrap();
            if t >= 12 {
                assert_abs_diff_eq!(kf.position().0, truth[0], epsilon = 0.5);
                assert_abs_diff_eq!(kf.position().1, truth[1], epsilon = 0.5);
            }
        }
        assert_abs_diff_eq!(kf.velocity().0, 10.0, epsilon = 0.1);
        assert_abs_diff_eq!(kf.velocity().1, 5.0, epsilon = 0.1);
    }

    #[test]
    fn test_covariance_is_bounded_under_long_miss_streak() {
        let params = KalmanParams {
            covariance_ceiling: 500.0,
            ..KalmanParams::default()
        };
        let mut kf = KalmanEstimator::new([0.0, 0.0], &params);
        for _ in 0..1000 {
            kf.predict();
        }
        let cov = kf.covariance();
        for i in 0..4 {
            assert!(cov[[i, i]] <= 500.0 + 1e-9);
            assert!(cov[[i, i]] > 0.0);
        }
        assert_relative_eq!(cov[[0, 1]], cov[[1, 0]]);
        kf.correct([3.0, 4.0]).unwrap();
        assert_abs_diff_eq!(kf.position().0, 3.0, epsilon = 0.01);
    }

    #[test]
    fn test_params_validation() {
        assert!(KalmanParams::default().validate().is_ok());
        let bad = KalmanParams {
            measurement_noise: 0.0,
            ..KalmanParams::default()
        };
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidNoise { .. })));
    }
}
