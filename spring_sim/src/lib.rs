//! Damped spring simulation
//!
//! A mass on a damped spring under constant forcing,
//!
//! ```text
//! M·x'' + c·x' + k·x = F
//! ```
//!
//! integrated as the first-order system `(x, v)` by an adaptive implicit
//! Runge–Kutta session that is advanced once per rendered frame. The library
//! holds everything that is independent of the window: the model, the
//! integration driver, a closed-form reference solution, configuration loading
//! and the mapping from oscillator state to scene placement.

pub mod analytic;
pub mod binding;
pub mod config;
pub mod error;
pub mod integrator;
pub mod model;
pub mod simulation;

pub use config::SimConfig;
pub use error::{ConfigError, ConvergenceFailure, IntegrationError};
pub use integrator::{Integrator, IntegratorSettings, Method, Sample, Stats};
pub use model::{DampedOscillator, OdeSystem, OscillatorParams, Regime};
pub use simulation::{PhysicsStatus, SpringSimulation};
