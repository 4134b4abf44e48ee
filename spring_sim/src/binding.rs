//! Mapping from oscillator state to the placement of the mass in the scene

use glam::Vec3;
use serde::Deserialize;

use crate::error::ConfigError;

/// How `(position, velocity)` moves the mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingPolicy {
    /// Every frame the translation is pushed by `velocity` along the direction
    /// from `reference` to `(0, 0, position)`. The velocity is treated as a
    /// per-frame displacement, so the picture drifts from the integrated
    /// position over time.
    VelocityDelta,
    /// The translation is `origin + axis · position`.
    #[default]
    Position,
}

impl BindingPolicy {
    pub fn toggled(self) -> Self {
        match self {
            BindingPolicy::VelocityDelta => BindingPolicy::Position,
            BindingPolicy::Position => BindingPolicy::VelocityDelta,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BindingPolicy::VelocityDelta => "velocity delta",
            BindingPolicy::Position => "position",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    pub policy: BindingPolicy,
    /// Point the displacement direction is measured from.
    pub reference: [f32; 3],
    /// Together with `reference`, fixes the spring axis of the position policy.
    pub target: [f32; 3],
    /// Translation of the mass at zero displacement.
    pub origin: [f32; 3],
    /// Fixed end of the drawn spring.
    pub anchor: [f32; 3],
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            policy: BindingPolicy::default(),
            reference: [0.0, 0.0, 3.0],
            target: [0.0, 0.0, 0.0],
            origin: [0.0, 0.0, 2.0],
            anchor: [0.0, 0.0, 2.0],
        }
    }
}

impl BindingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let points = [
            ("binding.reference", self.reference),
            ("binding.target", self.target),
            ("binding.origin", self.origin),
            ("binding.anchor", self.anchor),
        ];
        for (name, point) in points {
            if let Some(bad) = point.iter().find(|v| !v.is_finite()) {
                return Err(ConfigError::InvalidSetting {
                    name,
                    requirement: "finite",
                    value: f64::from(*bad),
                });
            }
        }
        let length = (Vec3::from(self.target) - Vec3::from(self.reference)).length();
        if length <= f32::EPSILON {
            return Err(ConfigError::InvalidSetting {
                name: "binding.target",
                requirement: "distinct from binding.reference",
                value: f64::from(length),
            });
        }
        Ok(())
    }
}

/// Current placement of the mass.
#[derive(Debug, Clone)]
pub struct SceneBinding {
    policy: BindingPolicy,
    reference: Vec3,
    axis: Vec3,
    origin: Vec3,
    anchor: Vec3,
    translation: Vec3,
}

impl SceneBinding {
    pub fn new(config: &BindingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let reference = Vec3::from(config.reference);
        let origin = Vec3::from(config.origin);
        Ok(Self {
            policy: config.policy,
            reference,
            axis: (Vec3::from(config.target) - reference).normalize(),
            origin,
            anchor: Vec3::from(config.anchor),
            translation: origin,
        })
    }

    /// Move the mass for one frame and return its new translation.
    pub fn apply(&mut self, position: f64, velocity: f64) -> Vec3 {
        match self.policy {
            BindingPolicy::VelocityDelta => {
                let towards = Vec3::new(0.0, 0.0, position as f32) - self.reference;
                if let Some(direction) = towards.try_normalize() {
                    self.translation += direction * velocity as f32;
                }
            }
            BindingPolicy::Position => {
                self.translation = self.origin + self.axis * position as f32;
            }
        }
        self.translation
    }

    /// Switch policy, keeping the current translation as the starting point.
    pub fn set_policy(&mut self, policy: BindingPolicy) {
        self.policy = policy;
    }

    /// Put the mass back at its rest placement.
    pub fn reset(&mut self) {
        self.translation = self.origin;
    }

    pub fn policy(&self) -> BindingPolicy {
        self.policy
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }
}
