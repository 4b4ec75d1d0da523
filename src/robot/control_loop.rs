// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the fixed rate loop which runs the test driver.
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::exception::{create_configuration_exception, LwrException, LwrResult};
use crate::robot::command::Command;
use crate::robot::control_tools::enforce_realtime;
use crate::robot::control_types::{JointState, RealtimeConfig, Torques};
use crate::robot::driver::TestDriver;

/// Input port of the control loop.
pub trait JointStateSource {
    /// Returns the newest joint state or None if no new data arrived since the last call.
    fn read(&mut self) -> Option<JointState>;
}

impl<F: FnMut() -> Option<JointState>> JointStateSource for F {
    fn read(&mut self) -> Option<JointState> {
        self()
    }
}

/// Output port of the control loop.
pub trait TorqueSink {
    fn write(&mut self, torques: &Torques);
}

impl<F: FnMut(&Torques)> TorqueSink for F {
    fn write(&mut self, torques: &Torques) {
        self(torques)
    }
}

/// Counters of a [`ControlLoop`] run.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LoopStatistics {
    /// Executed control cycles.
    pub cycles: u64,
    /// Cycles without joint state input. Nothing was written in these cycles.
    pub no_data_cycles: u64,
    /// Commands which returned an error.
    pub failed_commands: u64,
    /// Cycles which took longer than the period.
    pub overruns: u64,
    /// Longest cycle.
    pub max_cycle_time: Duration,
}

impl LoopStatistics {
    fn record(&mut self, cycle_time: Duration, period: Duration) {
        self.cycles += 1;
        if cycle_time > self.max_cycle_time {
            self.max_cycle_time = cycle_time;
        }
        if cycle_time > period {
            self.overruns += 1;
        }
    }
}

/// Runs a [`TestDriver`] at a fixed rate.
///
/// Every cycle the loop first executes all pending commands, then reads the joint state, runs one
/// driver cycle and writes the torques. It stops after the configured number of cycles, when the
/// command channel is disconnected or when the driver fails with anything else than a
/// NoDataException.
pub struct ControlLoop<'a, S: JointStateSource, T: TorqueSink> {
    driver: &'a mut TestDriver,
    source: S,
    sink: T,
    period: Duration,
    commands: Option<Receiver<Command>>,
    max_cycles: Option<u64>,
    statistics: LoopStatistics,
}

impl<'a, S: JointStateSource, T: TorqueSink> ControlLoop<'a, S, T> {
    /// Creates a control loop.
    ///
    /// # Arguments
    /// * `driver` - A started driver.
    /// * `source` - Port the joint states are read from.
    /// * `sink` - Port the torques are written to.
    /// * `period` - Cycle time.
    /// * `realtime_config` - if set to Enforce the calling thread is raised to realtime priority.
    /// # Errors
    /// * ConfigurationException if `period` is zero.
    /// * RealTimeException if realtime priority is enforced but cannot be set.
    pub fn new(
        driver: &'a mut TestDriver,
        source: S,
        sink: T,
        period: Duration,
        realtime_config: RealtimeConfig,
    ) -> LwrResult<Self> {
        if period.is_zero() {
            return Err(create_configuration_exception(
                "lwr: the period of the control loop has to be greater than zero",
            ));
        }
        enforce_realtime(realtime_config == RealtimeConfig::Enforce)?;
        Ok(ControlLoop {
            driver,
            source,
            sink,
            period,
            commands: None,
            max_cycles: None,
            statistics: LoopStatistics::default(),
        })
    }

    /// Executes the commands sent through `commands` between the cycles.
    pub fn with_commands(mut self, commands: Receiver<Command>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Stops the loop after `max_cycles` cycles.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn statistics(&self) -> &LoopStatistics {
        &self.statistics
    }

    /// Runs until one of the stop conditions is met.
    ///
    /// # Errors
    /// * every error of [`TestDriver::update`] except NoDataException.
    pub fn run(&mut self) -> LwrResult<LoopStatistics> {
        let start = Instant::now();
        let mut next_cycle = start;
        info!("Control loop running with a period of {:?}", self.period);
        loop {
            if let Some(max_cycles) = self.max_cycles {
                if self.statistics.cycles >= max_cycles {
                    break;
                }
            }
            if !self.spin_commands(start.elapsed()) {
                info!("Command channel closed");
                break;
            }
            let cycle_start = Instant::now();
            let input = self.source.read();
            match self.driver.update(input.as_ref(), start.elapsed()) {
                Ok(torques) => self.sink.write(&torques),
                Err(LwrException::NoDataException { .. }) => self.statistics.no_data_cycles += 1,
                Err(error) => return Err(error),
            }
            self.statistics.record(cycle_start.elapsed(), self.period);

            next_cycle += self.period;
            let now = Instant::now();
            if next_cycle > now {
                thread::sleep(next_cycle - now);
            } else {
                next_cycle = now;
            }
        }
        info!(
            "Control loop finished after {} cycles ({} overruns)",
            self.statistics.cycles, self.statistics.overruns
        );
        Ok(self.statistics)
    }

    /// Executes all pending commands. Returns false if the command channel is disconnected.
    fn spin_commands(&mut self, now: Duration) -> bool {
        let commands = match &self.commands {
            Some(commands) => commands,
            None => return true,
        };
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    debug!("Received {}", command);
                    if let Err(error) = self.driver.execute(command, now) {
                        warn!("Command failed: {}", error);
                        self.statistics.failed_commands += 1;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}
