// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains useful type definitions and conversion functions.
use nalgebra::{SMatrix, SVector, Vector6};

/// A Vector with 7 entries
pub type Vector7 = SVector<f64, 7>;
/// A Matrix with 6 rows and 6 columns
pub type Matrix6 = SMatrix<f64, 6, 6>;
/// Force (first three entries) and torque (last three entries) acting at a frame.
pub type Wrench = Vector6<f64>;

/// Number of joints of the LWR.
pub const NUMBER_OF_JOINTS: usize = 7;

/// Converts degrees to radians with the same approximation of pi the LWR tooling uses for its
/// default target angles.
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * 3.141 / 180.
}

#[cfg(test)]
mod test {
    use crate::utils::degrees_to_radians;
    use approx::assert_relative_eq;

    #[test]
    fn degrees_use_truncated_pi() {
        assert_relative_eq!(degrees_to_radians(180.), 3.141, epsilon = 1e-12);
        assert_relative_eq!(degrees_to_radians(-90.), -1.5705, epsilon = 1e-12);
    }
}
