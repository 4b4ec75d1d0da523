// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the control core: the [`TestDriver`](`driver::TestDriver`) and the controllers
//! it dispatches to.

pub mod command;
pub mod config;
pub mod control_loop;
mod control_tools;
pub mod control_types;
pub mod driver;
pub mod pid;
pub mod positioning;
pub mod ramp;
pub mod torque_averager;
pub mod torque_mapper;

pub use control_tools::{has_realtime_kernel, set_current_thread_to_highest_scheduler_priority};
