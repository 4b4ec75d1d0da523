// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the bang-bang controller used in position mode.
use crate::utils::{Vector7, NUMBER_OF_JOINTS};

/// Result of one positioning step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Positioning {
    /// Torque for every joint: `+torque`, `-torque` or 0.
    pub torques: Vector7,
    /// Number of joints within the tolerance band of their target.
    pub in_position: usize,
}

impl Positioning {
    /// True if every joint is within the tolerance band.
    pub fn is_finished(&self) -> bool {
        self.in_position == NUMBER_OF_JOINTS
    }
}

/// Drives every joint towards its target angle with a constant torque.
///
/// # Arguments
/// * `target` - Target joint angles in \[rad\].
/// * `current` - Measured joint angles in \[rad\].
/// * `torque` - Magnitude of the positioning torque in \[Nm\].
/// * `epsilon` - Tolerance band around the target in \[rad\].
pub fn position_step(
    target: &[f64; NUMBER_OF_JOINTS],
    current: &[f64; NUMBER_OF_JOINTS],
    torque: f64,
    epsilon: f64,
) -> Positioning {
    let mut torques = Vector7::zeros();
    let mut in_position = 0;
    for (i, (target, current)) in target.iter().zip(current.iter()).enumerate() {
        let gap = target - current;
        if gap > epsilon {
            torques[i] = torque;
        } else if gap < -epsilon {
            torques[i] = -torque;
        } else {
            in_position += 1;
        }
    }
    Positioning {
        torques,
        in_position,
    }
}
