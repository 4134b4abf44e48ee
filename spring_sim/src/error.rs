//! Error types for configuration and integration

use thiserror::Error;

/// Invalid configuration, detected before any integration happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("mass must be positive and finite (got {0})")]
    InvalidMass(f64),
    #[error("stiffness must be positive and finite (got {0})")]
    InvalidStiffness(f64),
    #[error("damping must be non-negative and finite (got {0})")]
    InvalidDamping(f64),
    #[error("forcing must be finite (got {0})")]
    InvalidForcing(f64),
    #[error("{name} must be {requirement} (got {value})")]
    InvalidSetting {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },
    #[error("initial state has {got} components, system dimension is {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("initial state component {0} is not finite")]
    NonFiniteInitialState(usize),
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The integrator could not produce a trustworthy state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvergenceFailure {
    #[error("step size {h:e} fell below the resolvable minimum {min:e} at t = {t}")]
    StepSizeTooSmall { t: f64, h: f64, min: f64 },
    #[error("exceeded {limit} sub-steps before reaching t = {target} (stopped at t = {t})")]
    StepLimitExceeded { limit: usize, target: f64, t: f64 },
    #[error("state component {index} became non-finite at t = {t}")]
    NonFiniteState { t: f64, index: usize },
}

/// Errors returned by [`crate::integrator::Integrator::advance`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("target time {0} is not finite")]
    InvalidTarget(f64),
    #[error("target time {target} precedes the session time {current}")]
    TargetBeforeCurrent { target: f64, current: f64 },
    #[error("convergence failure: {0}")]
    Convergence(#[from] ConvergenceFailure),
}

impl IntegrationError {
    /// True when the numerical procedure itself broke down, as opposed to the
    /// caller asking for an unsupported target.
    pub fn is_convergence_failure(&self) -> bool {
        matches!(self, IntegrationError::Convergence(_))
    }
}
