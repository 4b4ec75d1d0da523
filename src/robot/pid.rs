// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains a discrete PID controller working on joint vectors.
use nalgebra::DVector;
use serde::Deserialize;
use serde::Serialize;

use crate::exception::{LwrException, LwrResult};

/// Gains of the PID controller, applied to every joint.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PidGains {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
    /// Optional symmetric limit for every entry of the accumulated error. `None` lets the
    /// accumulated error grow without bound.
    pub integral_limit: Option<f64>,
}

impl PidGains {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        PidGains {
            k_p,
            k_i,
            k_d,
            integral_limit: None,
        }
    }
}

/// Error history of the PID controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    previous_error: DVector<f64>,
    current_error: DVector<f64>,
    total_error: DVector<f64>,
}

impl PidController {
    /// Creates a controller for `joints` joints with zeroed history.
    pub fn new(joints: usize) -> Self {
        PidController {
            previous_error: DVector::zeros(joints),
            current_error: DVector::zeros(joints),
            total_error: DVector::zeros(joints),
        }
    }

    /// Zeroes the history and resizes it to `joints` joints.
    pub fn reset(&mut self, joints: usize) {
        *self = PidController::new(joints);
    }

    pub fn nr_of_joints(&self) -> usize {
        self.current_error.len()
    }

    /// Accumulated error since the last reset.
    pub fn accumulated_error(&self) -> &DVector<f64> {
        &self.total_error
    }

    /// Runs one controller step and returns `k_p * e + k_i * sum(e) + k_d * (e - e_previous)`
    /// with `e = target - current`.
    ///
    /// # Errors
    /// * ConfigurationException if `target` or `current` do not have
    ///   [`nr_of_joints`](`Self::nr_of_joints`) entries. The history is left untouched then.
    pub fn step(
        &mut self,
        gains: &PidGains,
        target: &DVector<f64>,
        current: &DVector<f64>,
    ) -> LwrResult<DVector<f64>> {
        if target.len() != self.nr_of_joints() || current.len() != self.nr_of_joints() {
            return Err(LwrException::ConfigurationException {
                message: format!(
                    "lwr: PID controller has {} joints but got {} targets and {} values",
                    self.nr_of_joints(),
                    target.len(),
                    current.len()
                ),
            });
        }
        std::mem::swap(&mut self.previous_error, &mut self.current_error);
        self.current_error = target - current;
        self.total_error += &self.current_error;
        if let Some(limit) = gains.integral_limit {
            let limit = limit.abs();
            self.total_error.apply(|e| *e = e.clamp(-limit, limit));
        }
        Ok(&self.current_error * gains.k_p
            + &self.total_error * gains.k_i
            + (&self.current_error - &self.previous_error) * gains.k_d)
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::LwrException;
    use crate::robot::pid::{PidController, PidGains};
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn proportional_only() {
        let gains = PidGains::new(2., 0., 0.);
        let mut pid = PidController::new(4);
        let target = DVector::zeros(4);
        let current = DVector::from_element(4, 1.);
        for _ in 0..5 {
            assert_relative_eq!(
                pid.step(&gains, &target, &current).unwrap(),
                DVector::from_element(4, -2.)
            );
        }
    }

    #[test]
    fn integral_and_derivative_terms() {
        let gains = PidGains::new(0., 1., 0.);
        let mut pid = PidController::new(1);
        let target = DVector::from_element(1, 1.);
        let current = DVector::zeros(1);
        assert_relative_eq!(pid.step(&gains, &target, &current).unwrap()[0], 1.);
        assert_relative_eq!(pid.step(&gains, &target, &current).unwrap()[0], 2.);
        assert_relative_eq!(pid.step(&gains, &target, &current).unwrap()[0], 3.);
        assert_relative_eq!(pid.accumulated_error()[0], 3.);

        let gains = PidGains::new(0., 0., 1.);
        let mut pid = PidController::new(1);
        // the first derivative is taken against a zero error
        assert_relative_eq!(pid.step(&gains, &target, &current).unwrap()[0], 1.);
        assert_relative_eq!(pid.step(&gains, &target, &current).unwrap()[0], 0.);
        assert_relative_eq!(
            pid.step(&gains, &target, &DVector::from_element(1, 0.5)).unwrap()[0],
            -0.5
        );
    }

    #[test]
    fn integral_limit_clamps_accumulated_error() {
        let mut gains = PidGains::new(0., 1., 0.);
        gains.integral_limit = Some(2.5);
        let mut pid = PidController::new(2);
        let target = DVector::zeros(2);
        let current = DVector::from_row_slice(&[1., -1.]);
        for _ in 0..10 {
            pid.step(&gains, &target, &current).unwrap();
        }
        assert_relative_eq!(
            *pid.accumulated_error(),
            DVector::from_row_slice(&[-2.5, 2.5])
        );
    }

    #[test]
    fn reset_resizes_history() {
        let gains = PidGains::new(0., 1., 0.);
        let mut pid = PidController::new(3);
        pid.step(&gains, &DVector::from_element(3, 1.), &DVector::zeros(3))
            .unwrap();
        pid.reset(2);
        assert_eq!(pid.nr_of_joints(), 2);
        assert_relative_eq!(pid.accumulated_error().norm(), 0.);
    }

    #[test]
    fn mismatching_sizes_are_rejected() {
        let gains = PidGains::new(1., 1., 1.);
        let mut pid = PidController::new(3);
        pid.step(&gains, &DVector::zeros(3), &DVector::from_element(3, 1.))
            .unwrap();
        let history = pid.clone();
        assert!(matches!(
            pid.step(&gains, &DVector::zeros(4), &DVector::zeros(4)),
            Err(LwrException::ConfigurationException { .. })
        ));
        assert!(pid
            .step(&gains, &DVector::zeros(3), &DVector::zeros(2))
            .is_err());
        assert_eq!(pid, history);
    }
}
