// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the test driver, the state machine which turns joint states into torques.
use std::fmt;
use std::path::Path;
use std::time::Duration;

use nalgebra::DVector;
use tracing::{debug, error, info, warn};

use crate::exception::{create_configuration_exception, LwrException, LwrResult};
use crate::model::{ChainEndpoints, Model};
use crate::robot::command::Command;
use crate::robot::config::{check_finite, check_magnitude, DriverConfig};
use crate::robot::control_types::{JointState, Mode, Torques};
use crate::robot::pid::PidController;
use crate::robot::positioning::position_step;
use crate::robot::ramp::RampedWrench;
use crate::robot::torque_averager::TorqueAverager;
use crate::robot::torque_mapper::{map_wrench, WrenchMapping};
use crate::utils::{Vector7, Wrench, NUMBER_OF_JOINTS};

/// Lifecycle state of the [`TestDriver`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DriverState {
    /// Not configured yet or cleaned up.
    Unconfigured,
    /// Configured but no cycles are run.
    Stopped,
    /// Cycles are run by [`update`](`TestDriver::update`).
    Running,
}

/// Snapshot of the values computed in the last cycle.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// Intermediate results of the last hand wrench mapping, if torque mode ran before.
    pub upper: Option<WrenchMapping>,
    /// Last torque output.
    pub torques: Torques,
    /// Number of segments of the upper chain.
    pub upper_segments: usize,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.upper {
            Some(upper) => {
                writeln!(f, "---------HTB (upper chain)--------------")?;
                write!(f, "{}", upper.htb)?;
                writeln!(f, "---------JAC (upper chain)--------------")?;
                write!(f, "{}", upper.jacobian)?;
                writeln!(f, "---------INV (upper chain)--------------")?;
                writeln!(f, "{}", upper.inverse_tip)?;
            }
            None => writeln!(f, "no torque mode cycle yet")?,
        }
        writeln!(f, "---------TAU----------------------------")?;
        writeln!(f, "{}", self.torques)?;
        writeln!(f, "---------Segments (upper chain)---------")?;
        write!(f, "{}", self.upper_segments)
    }
}

/// Computes joint torques for the LWR from one of three control policies.
///
/// The driver is configured through its setters or [`Command`]s and advanced by calling
/// [`update`](`Self::update`) once per control cycle. It does not keep time itself, every
/// time dependent operation takes the current time of a monotonic clock.
///
/// # Example
/// ```no_run
/// use lwr::{JointState, LwrResult, TestDriver};
/// use std::time::Duration;
/// # fn main() -> LwrResult<()> {
/// let mut driver = TestDriver::new(None)?;
/// driver.load_model("demos/lwr.urdf", "lwr_arm_4_link", "lwr_arm_4_link")?;
/// driver.configure()?;
/// driver.start()?;
/// driver.set_mode("torque")?;
/// driver.set_hand_forces(0., 0., 5.)?;
/// let torques = driver.update(Some(&JointState::default()), Duration::from_millis(1))?;
/// println!("{}", torques);
/// # Ok(())
/// # }
/// ```
pub struct TestDriver {
    config: DriverConfig,
    mode: Mode,
    model: Option<Model>,
    state: DriverState,
    hand: RampedWrench,
    elbow: RampedWrench,
    pid: PidController,
    averager: TorqueAverager,
    tau: Vector7,
    output: Torques,
    in_position: usize,
    last_average: Option<Vector7>,
    upper_mapping: Option<WrenchMapping>,
}

fn not_configured(message: &'static str) -> LwrException {
    LwrException::NotConfiguredException {
        message: message.to_string(),
    }
}

fn ramp_duration(duration_secs: f64) -> LwrResult<Duration> {
    check_magnitude("ramp duration", duration_secs)?;
    Duration::try_from_secs_f64(duration_secs).map_err(|e| LwrException::ConfigurationException {
        message: format!("lwr: invalid ramp duration {}: {}", duration_secs, e),
    })
}

impl TestDriver {
    /// Creates a new driver in mode "none" without a model.
    ///
    /// # Arguments
    /// * `config` - Initial configuration, [`DriverConfig::default`] if None.
    /// # Errors
    /// * ConfigurationException if the configuration is invalid.
    pub fn new<C: Into<Option<DriverConfig>>>(config: C) -> LwrResult<Self> {
        let config = config.into().unwrap_or_default();
        config.validate()?;
        info!("Test driver constructed");
        Ok(TestDriver {
            config,
            mode: Mode::None,
            model: None,
            state: DriverState::Unconfigured,
            hand: RampedWrench::new(),
            elbow: RampedWrench::new(),
            pid: PidController::new(0),
            averager: TorqueAverager::new(),
            tau: Vector7::zeros(),
            output: Torques::default(),
            in_position: 0,
            last_average: None,
            upper_mapping: None,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Static hand wrench, i.e. the target of a running hand ramp.
    pub fn hand_wrench(&self) -> &Wrench {
        self.hand.wrench()
    }

    /// Static elbow wrench, i.e. the target of a running elbow ramp.
    pub fn elbow_wrench(&self) -> &Wrench {
        self.elbow.wrench()
    }

    /// Torques written in the last cycle.
    pub fn output(&self) -> &Torques {
        &self.output
    }

    /// Number of joints within the tolerance band in the last position mode cycle.
    pub fn in_position(&self) -> usize {
        self.in_position
    }

    /// Last reported torque average.
    pub fn last_average(&self) -> Option<&Vector7> {
        self.last_average.as_ref()
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// Switches the control mode.
    ///
    /// # Arguments
    /// * `mode` - "none", "position" or "torque"
    /// # Errors
    /// * ConfigurationException if `mode` names no mode. The mode stays unchanged.
    pub fn set_mode(&mut self, mode: &str) -> LwrResult<()> {
        match mode.parse::<Mode>() {
            Ok(mode) => {
                info!("Switching to mode {}", mode);
                self.mode = mode;
                Ok(())
            }
            Err(e) => {
                error!("Available modes are position, torque and none");
                Err(e)
            }
        }
    }

    pub fn set_hand_forces(&mut self, x: f64, y: f64, z: f64) -> LwrResult<()> {
        check_finite("hand forces", &[x, y, z])?;
        self.hand.set_force_axis(x, y, z);
        Ok(())
    }

    pub fn set_elbow_forces(&mut self, x: f64, y: f64, z: f64) -> LwrResult<()> {
        check_finite("elbow forces", &[x, y, z])?;
        self.elbow.set_force_axis(x, y, z);
        Ok(())
    }

    pub fn set_hand_torques(&mut self, x: f64, y: f64, z: f64) -> LwrResult<()> {
        check_finite("hand torques", &[x, y, z])?;
        self.hand.set_torque_axis(x, y, z);
        Ok(())
    }

    pub fn set_elbow_torques(&mut self, x: f64, y: f64, z: f64) -> LwrResult<()> {
        check_finite("elbow torques", &[x, y, z])?;
        self.elbow.set_torque_axis(x, y, z);
        Ok(())
    }

    /// Ramps the hand forces from their current value to `x`, `y`, `z` within `duration`.
    ///
    /// The hand wrench is ramped from then on; later ramps start from the static hand wrench.
    pub fn ramp_hand_forces(
        &mut self,
        duration: Duration,
        x: f64,
        y: f64,
        z: f64,
        now: Duration,
    ) -> LwrResult<()> {
        check_finite("hand forces", &[x, y, z])?;
        self.hand.begin_ramp(duration, x, y, z, now);
        Ok(())
    }

    /// Ramps the elbow forces from their current value to `x`, `y`, `z` within `duration`.
    ///
    /// see [`ramp_hand_forces`](`Self::ramp_hand_forces`)
    pub fn ramp_elbow_forces(
        &mut self,
        duration: Duration,
        x: f64,
        y: f64,
        z: f64,
        now: Duration,
    ) -> LwrResult<()> {
        check_finite("elbow forces", &[x, y, z])?;
        self.elbow.begin_ramp(duration, x, y, z, now);
        Ok(())
    }

    /// Averages the torques of the next `frames` cycles and logs the result.
    pub fn average_tau(&mut self, frames: usize) {
        self.averager.request(frames);
    }

    pub fn set_positioning_torque(&mut self, torque: f64) -> LwrResult<()> {
        check_magnitude("positioning_torque", torque)?;
        self.config.positioning_torque = torque;
        Ok(())
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> LwrResult<()> {
        check_magnitude("epsilon", epsilon)?;
        self.config.epsilon = epsilon;
        Ok(())
    }

    /// Sets the target angles of position mode in \[rad\].
    pub fn set_target_angles(&mut self, angles: [f64; NUMBER_OF_JOINTS]) -> LwrResult<()> {
        check_finite("target_angles", &angles)?;
        self.config.target_angles = angles;
        Ok(())
    }

    /// Sets the PID gains. An integral limit stays in place.
    pub fn set_pid_gains(&mut self, k_p: f64, k_i: f64, k_d: f64) -> LwrResult<()> {
        check_finite("pid gains", &[k_p, k_i, k_d])?;
        self.config.pid.k_p = k_p;
        self.config.pid.k_i = k_i;
        self.config.pid.k_d = k_d;
        Ok(())
    }

    pub fn enable_pid(&mut self, enable: bool) {
        self.config.enable_pid = enable;
    }

    pub fn enable_elbow_to_base(&mut self, enable: bool) {
        self.config.enable_elbow_to_base = enable;
    }

    pub fn clamp_ramp(&mut self, enable: bool) {
        self.config.clamp_ramp = enable;
    }

    /// Loads the lower and upper chain from a URDF file.
    ///
    /// The lower chain runs from the configured root link to `lower_tip_link`, the upper chain
    /// from `upper_root_link` to the configured tip link. The current model is dropped first,
    /// so after a failed load the driver cannot run cycles until a model was loaded
    /// successfully.
    /// # Errors
    /// * ModelException if the file cannot be loaded or the lower chain cannot be extracted.
    pub fn load_model<P: AsRef<Path>>(
        &mut self,
        path: P,
        lower_tip_link: &str,
        upper_root_link: &str,
    ) -> LwrResult<()> {
        self.model = None;
        let endpoints = ChainEndpoints {
            lower_root_link: self.config.lower_root_link.clone(),
            lower_tip_link: lower_tip_link.to_string(),
            upper_root_link: upper_root_link.to_string(),
            upper_tip_link: self.config.upper_tip_link.clone(),
        };
        let model = Model::from_urdf_file(path.as_ref(), &endpoints)?;
        info!("Loaded model from {} ({})", path.as_ref().display(), endpoints);
        self.set_model(model);
        Ok(())
    }

    /// Replaces the model. The PID history is reset if the lower chain changed its size.
    pub fn set_model(&mut self, model: Model) {
        let lower_joints = model.lower().nr_of_joints();
        if self.pid.nr_of_joints() != lower_joints {
            self.pid.reset(lower_joints);
        }
        debug!("{:?}", model);
        self.upper_mapping = None;
        self.model = Some(model);
    }

    /// Zeroes the output and checks that a model is loaded.
    /// # Errors
    /// * NotConfiguredException if no model is loaded.
    pub fn configure(&mut self) -> LwrResult<()> {
        self.output = Torques::default();
        if self.model.is_none() {
            error!("No model loaded");
            return Err(not_configured("lwr: no model loaded"));
        }
        self.state = DriverState::Stopped;
        info!("Test driver configured");
        Ok(())
    }

    /// Zeroes the torques and the PID history and starts running cycles.
    /// # Errors
    /// * NotConfiguredException if the driver is not configured or has no model.
    pub fn start(&mut self) -> LwrResult<()> {
        if self.state == DriverState::Unconfigured {
            return Err(not_configured("lwr: driver has to be configured before start"));
        }
        let lower_joints = match &self.model {
            Some(model) => model.lower().nr_of_joints(),
            None => {
                error!("No model loaded");
                return Err(not_configured("lwr: no model loaded"));
            }
        };
        self.tau = Vector7::zeros();
        self.output = Torques::default();
        self.pid.reset(lower_joints);
        self.state = DriverState::Running;
        info!("Test driver started");
        Ok(())
    }

    /// Runs one control cycle.
    ///
    /// # Arguments
    /// * `input` - Joint state of this cycle, None if no new data arrived.
    /// * `now` - Current time of the clock used for ramps.
    /// # Return
    /// Torques to write to the robot. In mode "none" the torques of the previous cycle are
    /// returned.
    /// # Errors
    /// * NotConfiguredException if the driver is not running or has no model.
    /// * NoDataException if `input` is None. The output stays unchanged.
    /// * the error of a chain solver or the PID controller if they reject the joint state.
    pub fn update(&mut self, input: Option<&JointState>, now: Duration) -> LwrResult<Torques> {
        if self.state != DriverState::Running {
            return Err(not_configured("lwr: driver is not running"));
        }
        let model = match &self.model {
            Some(model) => model,
            None => return Err(not_configured("lwr: no model loaded")),
        };
        let input = match input {
            Some(input) => input,
            None => {
                error!("No joint state input");
                return Err(LwrException::NoDataException {
                    message: "lwr: no joint state input".to_string(),
                });
            }
        };

        let lower_joints = model.lower().nr_of_joints();
        let upper_joints = model.upper().nr_of_joints();
        let upper_start = NUMBER_OF_JOINTS - upper_joints;

        match self.mode {
            Mode::Torque => {
                self.tau = Vector7::zeros();
                let q_lower = DVector::from_row_slice(&input.angles[..lower_joints]);
                let q_upper = DVector::from_row_slice(&input.angles[upper_start..]);

                let lower_torques = if self.config.enable_pid {
                    let velocities = DVector::from_row_slice(&input.velocities[..lower_joints]);
                    self.pid.step(
                        &self.config.pid,
                        &DVector::zeros(lower_joints),
                        &velocities,
                    )?
                } else {
                    let elbow = self.elbow.value(now, self.config.clamp_ramp);
                    map_wrench(
                        model.lower(),
                        &q_lower,
                        &elbow,
                        self.config.enable_elbow_to_base,
                    )?
                    .torques
                };
                self.tau.rows_mut(0, lower_joints).copy_from(&lower_torques);

                let hand = self.hand.value(now, self.config.clamp_ramp);
                let upper = map_wrench(model.upper(), &q_upper, &hand, true)?;
                self.tau
                    .rows_mut(upper_start, upper_joints)
                    .copy_from(&upper.torques);
                self.upper_mapping = Some(upper);
            }
            Mode::Position => {
                let positioning = position_step(
                    &self.config.target_angles,
                    &input.angles,
                    self.config.positioning_torque,
                    self.config.epsilon,
                );
                self.tau = positioning.torques;
                self.in_position = positioning.in_position;
            }
            Mode::None => {}
        }

        let frames = self.averager.frames_total();
        if let Some(average) = self.averager.update(&self.tau) {
            info!(
                "Average tau over {} iterations: {}",
                frames,
                Torques::from(average)
            );
            self.last_average = Some(average);
        }

        self.output = Torques::from(self.tau);
        Ok(self.output)
    }

    /// Zeroes the torques and stops running cycles.
    pub fn stop(&mut self) {
        self.tau = Vector7::zeros();
        self.output = Torques::default();
        if self.state == DriverState::Running {
            self.state = DriverState::Stopped;
        }
        info!("Test driver stopped");
    }

    /// Returns to the unconfigured state. The model stays loaded.
    pub fn cleanup(&mut self) {
        if self.state == DriverState::Running {
            warn!("Cleaning up a running test driver");
            self.stop();
        }
        self.state = DriverState::Unconfigured;
        info!("Test driver cleaned up");
    }

    /// Snapshot of the last cycle.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            upper: self.upper_mapping.clone(),
            torques: self.output,
            upper_segments: self
                .model
                .as_ref()
                .map_or(0, |model| model.upper().nr_of_segments()),
        }
    }

    /// Runs `command`.
    ///
    /// # Arguments
    /// * `command` - Command to run.
    /// * `now` - Current time, used as start time of ramps.
    /// # Errors
    /// * the error of the operation the command maps to. The driver state is unchanged then,
    /// except for a failed [`LoadModel`](`Command::LoadModel`) which drops the model.
    pub fn execute(&mut self, command: Command, now: Duration) -> LwrResult<()> {
        debug!("Executing {}", command);
        match command {
            Command::SetMode { mode } => self.set_mode(&mode),
            Command::SetHandForces { x, y, z } => self.set_hand_forces(x, y, z),
            Command::SetElbowForces { x, y, z } => self.set_elbow_forces(x, y, z),
            Command::SetHandTorques { x, y, z } => self.set_hand_torques(x, y, z),
            Command::SetElbowTorques { x, y, z } => self.set_elbow_torques(x, y, z),
            Command::RampHandForces {
                duration_secs,
                x,
                y,
                z,
            } => self.ramp_hand_forces(ramp_duration(duration_secs)?, x, y, z, now),
            Command::RampElbowForces {
                duration_secs,
                x,
                y,
                z,
            } => self.ramp_elbow_forces(ramp_duration(duration_secs)?, x, y, z, now),
            Command::AverageTau { frames } => {
                if frames == 0 {
                    return Err(create_configuration_exception(
                        "lwr: torques have to be averaged over at least one frame",
                    ));
                }
                self.average_tau(frames);
                Ok(())
            }
            Command::LoadModel {
                path,
                lower_tip_link,
                upper_root_link,
            } => self.load_model(&path, &lower_tip_link, &upper_root_link),
            Command::Print => {
                info!("\n{}", self.diagnostics());
                Ok(())
            }
            Command::SetPositioningTorque { torque } => self.set_positioning_torque(torque),
            Command::SetEpsilon { epsilon } => self.set_epsilon(epsilon),
            Command::SetTargetAngles { angles } => self.set_target_angles(angles),
            Command::SetPidGains { k_p, k_i, k_d } => self.set_pid_gains(k_p, k_i, k_d),
            Command::EnablePid { enable } => {
                self.enable_pid(enable);
                Ok(())
            }
            Command::EnableElbowToBase { enable } => {
                self.enable_elbow_to_base(enable);
                Ok(())
            }
            Command::ClampRamp { enable } => {
                self.clamp_ramp(enable);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for TestDriver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TestDriver")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("model", &self.model)
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::LwrException;
    use crate::model::tests::LWR_URDF;
    use crate::model::{ChainEndpoints, MockKinematicChain, Model};
    use crate::robot::command::Command;
    use crate::robot::config::DriverConfig;
    use crate::robot::control_types::{JointState, Mode, Torques};
    use crate::robot::driver::{DriverState, TestDriver};
    use crate::utils::Vector7;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, Isometry3, Translation3, UnitQuaternion, Vector3};
    use std::f64::consts::FRAC_PI_2;
    use std::time::Duration;

    fn lwr_model() -> Model {
        Model::from_urdf_str(LWR_URDF, &ChainEndpoints::new("lwr_arm_4_link", "lwr_arm_4_link"))
            .unwrap()
    }

    /// Chain whose Jacobian maps the force components one to one onto its joints.
    fn force_chain(joints: usize, tip: Isometry3<f64>) -> MockKinematicChain {
        let mut chain = MockKinematicChain::new();
        chain.expect_nr_of_joints().return_const(joints);
        chain.expect_nr_of_segments().return_const(joints);
        chain.expect_forward_kinematics().returning(move |_| Ok(tip));
        chain
            .expect_jacobian()
            .returning(move |_| {
                Ok(DMatrix::from_fn(6, joints, |r, c| if r == c { 1. } else { 0. }))
            });
        chain
    }

    fn mocked_model(lower_tip: Isometry3<f64>) -> Model {
        Model::new(
            Box::new(force_chain(4, lower_tip)),
            Box::new(force_chain(3, Isometry3::identity())),
        )
        .unwrap()
    }

    fn running_driver(model: Model) -> TestDriver {
        let mut driver = TestDriver::new(None).unwrap();
        driver.set_model(model);
        driver.configure().unwrap();
        driver.start().unwrap();
        driver
    }

    fn state(angles: [f64; 7], velocities: [f64; 7]) -> JointState {
        JointState::new(angles, velocities)
    }

    #[test]
    fn lifecycle_requires_model() {
        let mut driver = TestDriver::new(None).unwrap();
        assert_eq!(driver.state(), DriverState::Unconfigured);
        assert!(matches!(
            driver.configure(),
            Err(LwrException::NotConfiguredException { .. })
        ));
        assert!(driver.start().is_err());
        assert!(matches!(
            driver.update(Some(&JointState::default()), Duration::from_secs(0)),
            Err(LwrException::NotConfiguredException { .. })
        ));

        driver.set_model(lwr_model());
        driver.configure().unwrap();
        assert_eq!(driver.state(), DriverState::Stopped);
        driver.start().unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        driver.stop();
        assert_eq!(driver.state(), DriverState::Stopped);
        assert!(driver.update(Some(&JointState::default()), Duration::from_secs(0)).is_err());
        driver.cleanup();
        assert_eq!(driver.state(), DriverState::Unconfigured);
        assert!(driver.start().is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = DriverConfig::default();
        config.epsilon = f64::NAN;
        assert!(TestDriver::new(config).is_err());
    }

    #[test]
    fn invalid_mode_keeps_mode() {
        let mut driver = TestDriver::new(None).unwrap();
        driver.set_mode("position").unwrap();
        assert!(matches!(
            driver.set_mode("banana"),
            Err(LwrException::ConfigurationException { .. })
        ));
        assert_eq!(driver.mode(), Mode::Position);
    }

    #[test]
    fn missing_input_keeps_output() {
        let mut driver = running_driver(lwr_model());
        driver.set_mode("position").unwrap();
        let first = driver
            .update(Some(&JointState::default()), Duration::from_secs(0))
            .unwrap();
        assert!(matches!(
            driver.update(None, Duration::from_millis(1)),
            Err(LwrException::NoDataException { .. })
        ));
        assert_eq!(*driver.output(), first);
    }

    #[test]
    fn position_mode_drives_to_target() {
        let mut driver = running_driver(lwr_model());
        driver.set_target_angles([1.; 7]).unwrap();
        driver.set_mode("position").unwrap();
        let torques = driver
            .update(Some(&state([1.; 7], [0.; 7])), Duration::from_secs(0))
            .unwrap();
        assert_eq!(torques, Torques::new([0.; 7]));
        assert_eq!(driver.in_position(), 7);

        driver.set_positioning_torque(2.).unwrap();
        let torques = driver
            .update(
                Some(&state([0.9, 1., 1., 1., 1., 1., 1.2], [0.; 7])),
                Duration::from_secs(0),
            )
            .unwrap();
        assert_eq!(torques, Torques::new([2., 0., 0., 0., 0., 0., -2.]));
        assert_eq!(driver.in_position(), 5);
    }

    #[test]
    fn none_mode_keeps_previous_torques() {
        let mut driver = running_driver(lwr_model());
        driver.set_target_angles([1.; 7]).unwrap();
        driver.set_mode("position").unwrap();
        let positioned = driver
            .update(Some(&state([0.; 7], [0.; 7])), Duration::from_secs(0))
            .unwrap();
        assert_eq!(positioned, Torques::new([1.; 7]));
        driver.set_mode("none").unwrap();
        let torques = driver
            .update(Some(&state([1.; 7], [0.; 7])), Duration::from_secs(0))
            .unwrap();
        assert_eq!(torques, positioned);
        driver.stop();
        assert_eq!(*driver.output(), Torques::default());
    }

    #[test]
    fn torque_mode_with_zero_wrenches() {
        let mut driver = running_driver(lwr_model());
        driver.set_mode("torque").unwrap();
        for i in 0..5 {
            let angles = [0.1 * i as f64, -0.3, 0.5, 1.0, 0.2, -0.7, 0.4];
            let torques = driver
                .update(Some(&state(angles, [0.; 7])), Duration::from_millis(i))
                .unwrap();
            assert_relative_eq!(Vector7::from(torques), Vector7::zeros());
        }
    }

    #[test]
    fn torque_mode_without_upper_chain() {
        let partial = Model::from_urdf_str(
            LWR_URDF,
            &ChainEndpoints::new("lwr_arm_4_link", "gripper_link"),
        )
        .unwrap();
        assert_eq!(partial.upper().nr_of_joints(), 0);
        let mut driver = running_driver(partial);
        let mut reference = running_driver(lwr_model());
        let input = state([0.3, 0.2, 0., -0.4, 0.5, 0.6, 0.7], [0.; 7]);
        for configured in [&mut driver, &mut reference].iter_mut() {
            configured.set_mode("torque").unwrap();
            configured.set_elbow_forces(1., 0., 0.).unwrap();
            configured.set_hand_forces(0., 3., 0.).unwrap();
        }

        let torques = Vector7::from(driver.update(Some(&input), Duration::from_secs(0)).unwrap());
        let expected =
            Vector7::from(reference.update(Some(&input), Duration::from_secs(0)).unwrap());
        assert_relative_eq!(
            torques.fixed_rows::<4>(0).into_owned(),
            expected.fixed_rows::<4>(0).into_owned(),
            epsilon = 1e-12
        );
        assert!(torques.fixed_rows::<4>(0).norm() > 0.1);
        assert_eq!(torques.fixed_rows::<3>(4).norm(), 0.);
        assert_eq!(driver.diagnostics().upper_segments, 0);
    }

    #[test]
    fn failing_solver_keeps_output() {
        let mut broken = MockKinematicChain::new();
        broken.expect_nr_of_joints().return_const(3_usize);
        broken.expect_nr_of_segments().return_const(3_usize);
        broken.expect_forward_kinematics().returning(|_| {
            Err(LwrException::ModelException {
                message: "broken".to_string(),
            })
        });
        broken.expect_jacobian().returning(|_| Ok(DMatrix::zeros(6, 3)));
        let model = Model::new(
            Box::new(force_chain(4, Isometry3::identity())),
            Box::new(broken),
        )
        .unwrap();
        let mut driver = running_driver(model);
        driver.set_target_angles([1.; 7]).unwrap();
        driver.set_mode("position").unwrap();
        driver
            .update(Some(&JointState::default()), Duration::from_secs(0))
            .unwrap();
        driver.set_mode("torque").unwrap();
        let result = driver.update(Some(&JointState::default()), Duration::from_secs(0));
        assert!(matches!(result, Err(LwrException::ModelException { .. })));
        assert_eq!(*driver.output(), Torques::new([1.; 7]));
    }

    #[test]
    fn torque_mode_maps_wrenches_onto_chain_joints() {
        let mut driver = running_driver(mocked_model(Isometry3::identity()));
        driver.set_mode("torque").unwrap();
        driver.set_elbow_forces(1., 2., 3.).unwrap();
        driver.set_hand_forces(4., 5., 6.).unwrap();
        // the torque components are not mapped by the mocked Jacobians
        driver.set_hand_torques(9., 9., 9.).unwrap();
        let torques = driver
            .update(Some(&JointState::default()), Duration::from_secs(0))
            .unwrap();
        assert_relative_eq!(
            Vector7::from(torques),
            Vector7::from_row_slice(&[1., 2., 3., 0., 4., 5., 6.])
        );
    }

    #[test]
    fn elbow_frame_transform_is_optional() {
        let tip = Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let mut driver = running_driver(mocked_model(tip));
        driver.set_mode("torque").unwrap();
        driver.set_elbow_forces(1., 0., 0.).unwrap();
        let raw = driver
            .update(Some(&JointState::default()), Duration::from_secs(0))
            .unwrap();
        assert_relative_eq!(raw.torques[0], 1., epsilon = 1e-12);
        assert_relative_eq!(raw.torques[1], 0., epsilon = 1e-12);

        driver.enable_elbow_to_base(true);
        let transformed = driver
            .update(Some(&JointState::default()), Duration::from_secs(0))
            .unwrap();
        assert_relative_eq!(transformed.torques[0], 0., epsilon = 1e-12);
        assert_relative_eq!(transformed.torques[1], 1., epsilon = 1e-12);
    }

    #[test]
    fn hand_ramp_in_torque_mode() {
        let mut driver = running_driver(mocked_model(Isometry3::identity()));
        driver.set_mode("torque").unwrap();
        driver.set_hand_forces(2., 0., 0.).unwrap();
        driver
            .execute(
                Command::RampHandForces {
                    duration_secs: 2.,
                    x: 6.,
                    y: 0.,
                    z: -4.,
                },
                Duration::from_secs(10),
            )
            .unwrap();
        let at = |driver: &mut TestDriver, millis: u64| {
            driver
                .update(
                    Some(&JointState::default()),
                    Duration::from_secs(10) + Duration::from_millis(millis),
                )
                .unwrap()
        };
        let start = at(&mut driver, 0);
        assert_relative_eq!(start.torques[4], 2., epsilon = 1e-12);
        assert_relative_eq!(start.torques[6], 0., epsilon = 1e-12);
        let half = at(&mut driver, 1000);
        assert_relative_eq!(half.torques[4], 4., epsilon = 1e-12);
        assert_relative_eq!(half.torques[6], -2., epsilon = 1e-12);
        let end = at(&mut driver, 2000);
        assert_relative_eq!(end.torques[4], 6., epsilon = 1e-12);
        assert_relative_eq!(end.torques[6], -4., epsilon = 1e-12);
        // without clamping the ramp keeps going
        let late = at(&mut driver, 3000);
        assert_relative_eq!(late.torques[4], 8., epsilon = 1e-12);
        driver.clamp_ramp(true);
        let clamped = at(&mut driver, 3000);
        assert_relative_eq!(clamped.torques[4], 6., epsilon = 1e-12);
    }

    #[test]
    fn pid_replaces_elbow_wrench() {
        let mut driver = running_driver(lwr_model());
        driver.set_mode("torque").unwrap();
        driver.set_pid_gains(2., 0., 0.).unwrap();
        driver.enable_pid(true);
        driver.set_elbow_forces(100., 100., 100.).unwrap();
        for _ in 0..3 {
            let torques = driver
                .update(Some(&state([0.; 7], [1.; 7])), Duration::from_secs(0))
                .unwrap();
            assert_relative_eq!(
                Vector7::from(torques),
                Vector7::from_row_slice(&[-2., -2., -2., -2., 0., 0., 0.]),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn pid_history_resets_on_start() {
        let mut driver = running_driver(lwr_model());
        driver.set_mode("torque").unwrap();
        driver.set_pid_gains(0., 1., 0.).unwrap();
        driver.enable_pid(true);
        for _ in 0..3 {
            driver
                .update(Some(&state([0.; 7], [1.; 7])), Duration::from_secs(0))
                .unwrap();
        }
        assert_relative_eq!(driver.pid().accumulated_error()[0], -3.);
        driver.stop();
        driver.start().unwrap();
        assert_relative_eq!(driver.pid().accumulated_error().norm(), 0.);
    }

    #[test]
    fn average_over_cycles() {
        let mut driver = running_driver(lwr_model());
        driver.set_target_angles([1.; 7]).unwrap();
        driver.set_mode("position").unwrap();
        driver
            .execute(Command::AverageTau { frames: 3 }, Duration::from_secs(0))
            .unwrap();
        let input = state([0.; 7], [0.; 7]);
        for _ in 0..3 {
            driver.update(Some(&input), Duration::from_secs(0)).unwrap();
            assert!(driver.last_average().is_none());
        }
        driver.update(Some(&input), Duration::from_secs(0)).unwrap();
        assert_relative_eq!(*driver.last_average().unwrap(), Vector7::from_element(1.));
        assert!(driver
            .execute(Command::AverageTau { frames: 0 }, Duration::from_secs(0))
            .is_err());
    }

    #[test]
    fn failed_load_leaves_driver_without_model() {
        let mut driver = running_driver(lwr_model());
        assert!(matches!(
            driver.load_model("/no/such/lwr.urdf", "lwr_arm_4_link", "lwr_arm_4_link"),
            Err(LwrException::ModelException { .. })
        ));
        assert!(!driver.is_model_loaded());
        assert!(matches!(
            driver.update(Some(&JointState::default()), Duration::from_secs(0)),
            Err(LwrException::NotConfiguredException { .. })
        ));
    }

    #[test]
    fn commands_configure_driver() {
        let mut driver = TestDriver::new(None).unwrap();
        let now = Duration::from_secs(0);
        driver
            .execute(Command::SetMode { mode: "torque".to_string() }, now)
            .unwrap();
        driver.execute(Command::SetHandForces { x: 1., y: 2., z: 3. }, now).unwrap();
        driver.execute(Command::SetElbowTorques { x: 4., y: 5., z: 6. }, now).unwrap();
        driver.execute(Command::SetPositioningTorque { torque: 3. }, now).unwrap();
        driver.execute(Command::SetEpsilon { epsilon: 0.01 }, now).unwrap();
        driver.execute(Command::SetPidGains { k_p: 1., k_i: 2., k_d: 3. }, now).unwrap();
        driver.execute(Command::EnablePid { enable: true }, now).unwrap();
        driver.execute(Command::EnableElbowToBase { enable: true }, now).unwrap();
        driver.execute(Command::ClampRamp { enable: true }, now).unwrap();
        driver.execute(Command::Print, now).unwrap();

        assert_eq!(driver.mode(), Mode::Torque);
        assert_eq!(
            driver.hand_wrench().fixed_rows::<3>(0).into_owned(),
            Vector3::new(1., 2., 3.)
        );
        assert_eq!(
            driver.elbow_wrench().fixed_rows::<3>(3).into_owned(),
            Vector3::new(4., 5., 6.)
        );
        let config = driver.config();
        assert_eq!(config.positioning_torque, 3.);
        assert_eq!(config.epsilon, 0.01);
        assert_eq!((config.pid.k_p, config.pid.k_i, config.pid.k_d), (1., 2., 3.));
        assert!(config.enable_pid && config.enable_elbow_to_base && config.clamp_ramp);

        assert!(driver
            .execute(Command::SetEpsilon { epsilon: -1. }, now)
            .is_err());
        assert!(driver
            .execute(Command::SetHandForces { x: f64::NAN, y: 0., z: 0. }, now)
            .is_err());
        assert!(driver
            .execute(
                Command::RampElbowForces {
                    duration_secs: f64::INFINITY,
                    x: 0.,
                    y: 0.,
                    z: 0.
                },
                now
            )
            .is_err());
        assert_eq!(driver.config().epsilon, 0.01);
        assert_eq!(
            driver.hand_wrench().fixed_rows::<3>(0).into_owned(),
            Vector3::new(1., 2., 3.)
        );
    }

    #[test]
    fn diagnostics_after_torque_cycle() {
        let mut driver = running_driver(lwr_model());
        assert!(driver.diagnostics().upper.is_none());
        driver.set_mode("torque").unwrap();
        driver
            .update(Some(&JointState::default()), Duration::from_secs(0))
            .unwrap();
        let diagnostics = driver.diagnostics();
        let upper = diagnostics.upper.as_ref().unwrap();
        assert_eq!(upper.jacobian.ncols(), 3);
        assert_eq!(diagnostics.upper_segments, 3);
        let text = diagnostics.to_string();
        assert!(text.contains("HTB (upper chain)"));
        assert!(text.contains("Segments (upper chain)"));
    }
}
