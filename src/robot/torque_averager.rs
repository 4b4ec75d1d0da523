// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains a diagnostic accumulator which averages the commanded torques over a number of
//! cycles.
use crate::utils::Vector7;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct TorqueAverager {
    frames_total: usize,
    frames_counter: usize,
    tau_sum: Vector7,
}

impl TorqueAverager {
    pub fn new() -> Self {
        Default::default()
    }

    /// Starts averaging over the next `frames` cycles. A running average is discarded.
    /// Requesting zero frames leaves the averager idle.
    pub fn request(&mut self, frames: usize) {
        self.frames_total = frames;
        self.frames_counter = 0;
        self.tau_sum = Vector7::zeros();
    }

    /// Number of frames the running average covers, 0 if idle.
    pub fn frames_total(&self) -> usize {
        self.frames_total
    }

    pub fn is_idle(&self) -> bool {
        self.frames_total == 0
    }

    /// Feeds the torques of one cycle.
    ///
    /// Returns the mean in the first cycle after `frames` torques were accumulated. The torques
    /// of that cycle are not part of the mean and the averager goes idle afterwards.
    pub fn update(&mut self, tau: &Vector7) -> Option<Vector7> {
        if self.frames_total > self.frames_counter {
            self.tau_sum += tau;
            self.frames_counter += 1;
            None
        } else if self.frames_total > 0 {
            let average = self.tau_sum / self.frames_total as f64;
            self.frames_total = 0;
            self.frames_counter = 0;
            Some(average)
        } else {
            None
        }
    }
}
