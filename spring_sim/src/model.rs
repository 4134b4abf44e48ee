//! Physical model: ODE systems and the damped forced oscillator

use nalgebra::DMatrix;
use serde::Deserialize;

use crate::error::ConfigError;

/// User-supplied ODE system `y' = f(t, y)` together with its Jacobian.
///
/// Implicit steppers call both functions many times per step while solving the
/// stage equations, so implementations must be pure and cheap. The Jacobian
/// has to be exact: the Newton iteration converges on it.
///
/// # Example
///
/// ```
/// use nalgebra::DMatrix;
/// use spring_sim::model::OdeSystem;
///
/// struct Decay { rate: f64 }
///
/// impl OdeSystem for Decay {
///     fn dimension(&self) -> usize { 1 }
///     fn derivative(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
///         dydt[0] = -self.rate * y[0];
///     }
///     fn jacobian(&self, _t: f64, _y: &[f64], dfdy: &mut DMatrix<f64>, dfdt: &mut [f64]) {
///         dfdy[(0, 0)] = -self.rate;
///         dfdt[0] = 0.0;
///     }
/// }
/// ```
pub trait OdeSystem {
    /// Number of state components.
    fn dimension(&self) -> usize;

    /// Fill `dydt` with `f(t, y)`.
    fn derivative(&self, t: f64, y: &[f64], dydt: &mut [f64]);

    /// Fill `dfdy` with `∂f/∂y` (dimension × dimension) and `dfdt` with `∂f/∂t`.
    fn jacobian(&self, t: f64, y: &[f64], dfdy: &mut DMatrix<f64>, dfdt: &mut [f64]);

    /// Reject parameter sets the right-hand side cannot be evaluated with.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Constants of `M·x'' + c·x' + k·x = F`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OscillatorParams {
    #[serde(alias = "c")]
    pub damping: f64,
    #[serde(alias = "k")]
    pub stiffness: f64,
    #[serde(alias = "M", alias = "m")]
    pub mass: f64,
    #[serde(alias = "F", alias = "f")]
    pub forcing: f64,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            damping: 0.2,
            stiffness: 2.0,
            mass: 20.0,
            forcing: 5.0,
        }
    }
}

/// Qualitative behaviour of the homogeneous solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Undamped,
    Underdamped,
    CriticallyDamped,
    Overdamped,
}

impl Regime {
    pub fn label(self) -> &'static str {
        match self {
            Regime::Undamped => "undamped",
            Regime::Underdamped => "underdamped",
            Regime::CriticallyDamped => "critically damped",
            Regime::Overdamped => "overdamped",
        }
    }
}

/// Relative band around ζ = 1 treated as critical damping.
const CRITICAL_BAND: f64 = 1e-9;

impl OscillatorParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(ConfigError::InvalidMass(self.mass));
        }
        if !(self.stiffness.is_finite() && self.stiffness > 0.0) {
            return Err(ConfigError::InvalidStiffness(self.stiffness));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(ConfigError::InvalidDamping(self.damping));
        }
        if !self.forcing.is_finite() {
            return Err(ConfigError::InvalidForcing(self.forcing));
        }
        Ok(())
    }

    /// Static equilibrium position `F / k`.
    pub fn equilibrium(&self) -> f64 {
        self.forcing / self.stiffness
    }

    /// Undamped angular frequency `√(k/M)`.
    pub fn natural_frequency(&self) -> f64 {
        (self.stiffness / self.mass).sqrt()
    }

    /// Damping ratio `ζ = c / (2√(kM))`.
    pub fn damping_ratio(&self) -> f64 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }

    pub fn regime(&self) -> Regime {
        let zeta = self.damping_ratio();
        if self.damping == 0.0 {
            Regime::Undamped
        } else if (zeta - 1.0).abs() <= CRITICAL_BAND {
            Regime::CriticallyDamped
        } else if zeta < 1.0 {
            Regime::Underdamped
        } else {
            Regime::Overdamped
        }
    }

    /// Kinetic plus spring energy, `½M·v² + ½k·x²`.
    pub fn energy(&self, position: f64, velocity: f64) -> f64 {
        0.5 * self.mass * velocity * velocity + 0.5 * self.stiffness * position * position
    }
}

/// Damped, constantly forced mass on a spring. State is `(position, velocity)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampedOscillator {
    params: OscillatorParams,
}

impl DampedOscillator {
    pub const DIMENSION: usize = 2;

    pub fn new(params: OscillatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &OscillatorParams {
        &self.params
    }
}

impl OdeSystem for DampedOscillator {
    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn derivative(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let OscillatorParams {
            damping: c,
            stiffness: k,
            mass: m,
            forcing: f,
        } = self.params;
        dydt[0] = y[1];
        dydt[1] = (f - c * y[1] - k * y[0]) / m;
    }

    fn jacobian(&self, _t: f64, _y: &[f64], dfdy: &mut DMatrix<f64>, dfdt: &mut [f64]) {
        let OscillatorParams {
            damping: c,
            stiffness: k,
            mass: m,
            ..
        } = self.params;
        dfdy[(0, 0)] = 0.0;
        dfdy[(0, 1)] = 1.0;
        dfdy[(1, 0)] = -k / m;
        dfdy[(1, 1)] = -c / m;
        dfdt[0] = 0.0;
        dfdt[1] = 0.0;
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()
    }
}
