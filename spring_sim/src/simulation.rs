//! Frame-driven host around one integrator session

use glam::Vec3;

use crate::analytic;
use crate::binding::{BindingPolicy, SceneBinding};
use crate::config::SimConfig;
use crate::error::{ConfigError, IntegrationError};
use crate::integrator::{Integrator, Sample, Stats};
use crate::model::{DampedOscillator, OscillatorParams};

/// Whether the physics still advances.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsStatus {
    Running,
    /// The last advance failed. The state shown is the last good one and stays
    /// put until the session is restarted.
    Frozen(IntegrationError),
}

impl PhysicsStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, PhysicsStatus::Running)
    }
}

pub struct SpringSimulation {
    config: SimConfig,
    session: Integrator<DampedOscillator>,
    binding: SceneBinding,
    /// Index of the next frame; its target time is `frame · time_per_frame`.
    frame: u64,
    sample: Sample,
    translation: Vec3,
    status: PhysicsStatus,
}

impl SpringSimulation {
    pub fn from_config(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let session = Integrator::new(
            config.system(),
            &config.initial_state,
            config.integrator,
        )?;
        let binding = SceneBinding::new(&config.binding)?;

        log::info!(
            "spring: c = {}, k = {}, M = {}, F = {} ({}), {} at {} s per frame",
            config.oscillator.damping,
            config.oscillator.stiffness,
            config.oscillator.mass,
            config.oscillator.forcing,
            config.oscillator.regime().label(),
            session.method().name(),
            config.frame.time_per_frame
        );

        Ok(Self {
            config: config.clone(),
            session,
            translation: binding.translation(),
            binding,
            frame: 1,
            sample: Sample {
                t: 0.0,
                y: config.initial_state.clone(),
            },
            status: PhysicsStatus::Running,
        })
    }

    /// Advance the physics by one frame and move the mass.
    ///
    /// Returns the translation to render. While frozen nothing advances and
    /// the last good translation is returned.
    pub fn step_frame(&mut self) -> Vec3 {
        if !self.status.is_running() {
            return self.translation;
        }

        let target = self.frame as f64 * self.config.frame.time_per_frame;
        match self.session.advance(target) {
            Ok(sample) => {
                self.translation = self.binding.apply(sample.y[0], sample.y[1]);
                self.sample = sample;
                self.frame += 1;
            }
            Err(err) => {
                log::error!(
                    "physics frozen at frame {} (t = {}): {}",
                    self.frame,
                    self.sample.t,
                    err
                );
                self.status = PhysicsStatus::Frozen(err);
            }
        }
        self.translation
    }

    /// Throw the session away and start again from the configured initial state.
    pub fn restart(&mut self) -> Result<(), ConfigError> {
        self.session = Integrator::new(
            self.config.system(),
            &self.config.initial_state,
            self.config.integrator,
        )?;
        self.binding.reset();
        self.translation = self.binding.translation();
        self.frame = 1;
        self.sample = Sample {
            t: 0.0,
            y: self.config.initial_state.clone(),
        };
        self.status = PhysicsStatus::Running;
        log::info!("physics restarted");
        Ok(())
    }

    pub fn set_policy(&mut self, policy: BindingPolicy) {
        log::info!("binding policy: {}", policy.label());
        self.binding.set_policy(policy);
    }

    pub fn toggle_policy(&mut self) {
        self.set_policy(self.binding.policy().toggled());
    }

    pub fn policy(&self) -> BindingPolicy {
        self.binding.policy()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time(&self) -> f64 {
        self.sample.t
    }

    pub fn position(&self) -> f64 {
        self.sample.y[0]
    }

    pub fn velocity(&self) -> f64 {
        self.sample.y[1]
    }

    pub fn energy(&self) -> f64 {
        self.params().energy(self.position(), self.velocity())
    }

    /// Closed-form `(position, velocity)` at the current time.
    pub fn exact_state(&self) -> (f64, f64) {
        let y0 = &self.config.initial_state;
        analytic::solution(self.params(), y0[0], y0[1], self.sample.t)
    }

    pub fn params(&self) -> &OscillatorParams {
        self.session.system().params()
    }

    pub fn stats(&self) -> Stats {
        self.session.stats()
    }

    pub fn status(&self) -> &PhysicsStatus {
        &self.status
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn anchor(&self) -> Vec3 {
        self.binding.anchor()
    }
}
