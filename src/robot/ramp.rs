// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the RampedWrench type which holds the hand or elbow wrench and interpolates it
//! linearly after a ramp was requested.
use std::time::Duration;

use nalgebra::Vector3;

use crate::utils::Wrench;

/// Snapshot taken when a ramp starts.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RampState {
    /// Wrench at the time the ramp was requested.
    pub start_value: Wrench,
    /// Time the ramp was requested.
    pub start_time: Duration,
    /// Time until the newly set wrench is reached.
    pub duration: Duration,
}

impl RampState {
    /// Fraction of the ramp which has passed at `now`.
    ///
    /// The fraction grows beyond 1 once the duration has passed unless `clamp` is set. A ramp
    /// with zero duration jumps to the target right away.
    pub fn progress(&self, now: Duration, clamp: bool) -> f64 {
        let progress = if self.duration.is_zero() {
            1.
        } else {
            now.saturating_sub(self.start_time).as_secs_f64() / self.duration.as_secs_f64()
        };
        if clamp {
            progress.min(1.)
        } else {
            progress
        }
    }

    /// Interpolates between the start value and `target`.
    pub fn sample(&self, target: &Wrench, now: Duration, clamp: bool) -> Wrench {
        self.start_value + (target - self.start_value) * self.progress(now, clamp)
    }
}

/// Force/torque setpoint of one chain.
///
/// Once a ramp was requested the wrench stays in ramping mode for good; setting force or torque
/// components afterwards changes the target the ramp heads for.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct RampedWrench {
    wrench: Wrench,
    ramp: Option<RampState>,
}

impl RampedWrench {
    pub fn new() -> Self {
        Default::default()
    }

    /// Static wrench, i.e. the target of a running ramp.
    pub fn wrench(&self) -> &Wrench {
        &self.wrench
    }

    pub fn ramp(&self) -> Option<&RampState> {
        self.ramp.as_ref()
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Overwrites the three force components.
    pub fn set_force_axis(&mut self, x: f64, y: f64, z: f64) {
        self.wrench
            .fixed_rows_mut::<3>(0)
            .copy_from(&Vector3::new(x, y, z));
    }

    /// Overwrites the three torque components.
    pub fn set_torque_axis(&mut self, x: f64, y: f64, z: f64) {
        self.wrench
            .fixed_rows_mut::<3>(3)
            .copy_from(&Vector3::new(x, y, z));
    }

    /// Starts a ramp from the current wrench to the wrench with the new force components.
    /// The torque components keep their value.
    pub fn begin_ramp(&mut self, duration: Duration, x: f64, y: f64, z: f64, now: Duration) {
        self.ramp = Some(RampState {
            start_value: self.wrench,
            start_time: now,
            duration,
        });
        self.set_force_axis(x, y, z);
    }

    /// Wrench to apply at `now`: the interpolated value while ramping, the static wrench
    /// otherwise.
    pub fn value(&self, now: Duration, clamp: bool) -> Wrench {
        match &self.ramp {
            Some(ramp) => ramp.sample(&self.wrench, now, clamp),
            None => self.wrench,
        }
    }
}
