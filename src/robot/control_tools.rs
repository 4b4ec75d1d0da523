// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use std::path::Path;

use crate::exception::{LwrException, LwrResult};

/// Determines whether the current OS kernel is a realtime kernel.
///
/// On Linux, this checks for the existence of `/sys/kernel/realtime`.
pub fn has_realtime_kernel() -> bool {
    Path::new("/sys/kernel/realtime").exists()
}

fn realtime_error(message: &str) -> LwrException {
    LwrException::RealTimeException {
        message: format!("lwr: {}", message),
    }
}

/// Sets the current thread to the highest possible scheduler priority and locks the memory of
/// the process.
///
/// # Errors
/// * RealTimeException if realtime priority cannot be set for the current thread.
///
/// If the method returns an Error please check your /etc/security/limits.conf file
/// There should be a line like this:
/// ```text
///lwr_user         -       rtprio          99
/// ```
pub fn set_current_thread_to_highest_scheduler_priority() -> LwrResult<()> {
    unsafe {
        let max_priority = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if max_priority == -1 {
            return Err(realtime_error(
                "unable to get maximum possible thread priority",
            ));
        }
        // one below the maximum, the top priority is left to kernel threads
        let thread_param = libc::sched_param {
            sched_priority: max_priority - 1,
        };
        if libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &thread_param) != 0 {
            return Err(realtime_error("unable to set realtime scheduling"));
        }
        if libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) != 0 {
            return Err(realtime_error("unable to lock memory"));
        }
    }
    Ok(())
}

/// Raises the current thread to realtime priority if `enforce` is set.
///
/// # Errors
/// * RealTimeException if the kernel has no realtime capabilities or the priority cannot be set.
pub fn enforce_realtime(enforce: bool) -> LwrResult<()> {
    if !enforce {
        return Ok(());
    }
    if !has_realtime_kernel() {
        return Err(realtime_error(
            "Running kernel does not have realtime capabilities.",
        ));
    }
    set_current_thread_to_highest_scheduler_priority()
}

#[cfg(test)]
mod tests {
    use crate::robot::control_tools::enforce_realtime;

    #[test]
    fn ignoring_realtime_always_succeeds() {
        assert!(enforce_realtime(false).is_ok());
    }
}
