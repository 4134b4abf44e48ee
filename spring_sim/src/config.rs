//! Simulation configuration loaded from YAML
//!
//! Every field is optional; anything left out takes the value the
//! visualizer has always used. See `config/spring.yaml` for a complete file.

use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::binding::BindingConfig;
use crate::error::ConfigError;
use crate::integrator::IntegratorSettings;
use crate::model::{DampedOscillator, OscillatorParams};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub oscillator: OscillatorParams,
    /// `(position, velocity)` at `t = 0`.
    pub initial_state: Vec<f64>,
    pub integrator: IntegratorSettings,
    pub frame: FrameConfig,
    pub binding: BindingConfig,
    pub window: WindowConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            oscillator: OscillatorParams::default(),
            initial_state: vec![0.5, 0.0],
            integrator: IntegratorSettings::default(),
            frame: FrameConfig::default(),
            binding: BindingConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Simulated time per rendered frame; frame `n` integrates up to
    /// `n · time_per_frame`.
    pub time_per_frame: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { time_per_frame: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Damped Spring".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl SimConfig {
    /// Read and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        let config: SimConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything a session or the scene would otherwise reject later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.oscillator.validate()?;
        self.integrator.validate()?;
        self.binding.validate()?;

        if self.initial_state.len() != DampedOscillator::DIMENSION {
            return Err(ConfigError::DimensionMismatch {
                expected: DampedOscillator::DIMENSION,
                got: self.initial_state.len(),
            });
        }
        if let Some(index) = self.initial_state.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteInitialState(index));
        }

        let dt = self.frame.time_per_frame;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidSetting {
                name: "frame.time_per_frame",
                requirement: "positive",
                value: dt,
            });
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "window size",
                requirement: "non-zero",
                value: 0.0,
            });
        }
        Ok(())
    }

    pub fn system(&self) -> DampedOscillator {
        DampedOscillator::new(self.oscillator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingPolicy;
    use crate::integrator::Method;

    #[test]
    fn empty_document_gives_defaults() {
        let config = SimConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.oscillator.damping, 0.2);
        assert_eq!(config.oscillator.stiffness, 2.0);
        assert_eq!(config.oscillator.mass, 20.0);
        assert_eq!(config.oscillator.forcing, 5.0);
        assert_eq!(config.initial_state, vec![0.5, 0.0]);
        assert_eq!(config.integrator.abs_tol, 1e-6);
        assert_eq!(config.integrator.rel_tol, 1e-6);
        assert_eq!(config.frame.time_per_frame, 1.0);
    }

    #[test]
    fn parses_short_parameter_names() {
        let yaml = "
oscillator: { c: 0.5, k: 3.0, M: 2.0, F: 0.0 }
integrator:
  method: implicit_euler
  abs_tol: 1.0e-8
binding:
  policy: velocity_delta
window:
  title: test
";
        let config = SimConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.oscillator,
            OscillatorParams {
                damping: 0.5,
                stiffness: 3.0,
                mass: 2.0,
                forcing: 0.0,
            }
        );
        assert_eq!(config.integrator.method, Method::ImplicitEuler);
        assert_eq!(config.integrator.abs_tol, 1e-8);
        assert_eq!(config.integrator.rel_tol, 1e-6);
        assert_eq!(config.binding.policy, BindingPolicy::VelocityDelta);
        assert_eq!(config.window.title, "test");
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            SimConfig::from_yaml_str("oscillator: { mass: 0.0 }"),
            Err(ConfigError::InvalidMass(_))
        ));
        assert!(matches!(
            SimConfig::from_yaml_str("oscillator: { damping: -1.0 }"),
            Err(ConfigError::InvalidDamping(_))
        ));
        assert!(matches!(
            SimConfig::from_yaml_str("integrator: { rel_tol: -1.0 }"),
            Err(ConfigError::InvalidSetting { name: "rel_tol", .. })
        ));
        assert!(matches!(
            SimConfig::from_yaml_str("initial_state: [1.0, 2.0, 3.0]"),
            Err(ConfigError::DimensionMismatch { expected: 2, got: 3 })
        ));
        assert!(matches!(
            SimConfig::from_yaml_str("frame: { time_per_frame: 0.0 }"),
            Err(ConfigError::InvalidSetting { name: "frame.time_per_frame", .. })
        ));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_syntax() {
        assert!(matches!(
            SimConfig::from_yaml_str("oscillator: { spring: 1.0 }"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            SimConfig::from_yaml_str("integrator: { method: runge_kutta }"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = SimConfig::load("does/not/exist.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
