//! Integration driver: a persistent, adaptive implicit integrator session.
//!
//! An [`Integrator`] owns the current time, the state vector and the step-size
//! history of one ODE system. The only way to move it forward is
//! [`Integrator::advance`], which integrates up to a requested target time with
//! as many internal sub-steps as the error tolerances demand and lands on the
//! target exactly.

mod control;
mod method;
mod stepper;

pub use method::{Method, Tableau};

use serde::Deserialize;

use crate::error::{ConfigError, ConvergenceFailure, IntegrationError};
use crate::model::OdeSystem;
use control::{StepController, StepDecision};
use stepper::{ImplicitRk, NewtonSettings};

/// Integrator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorSettings {
    pub method: Method,
    /// Absolute error tolerance per component.
    pub abs_tol: f64,
    /// Relative error tolerance per component.
    pub rel_tol: f64,
    /// First trial step size.
    pub initial_step: f64,
    /// Smallest admissible step; 0 lets the controller go down to the
    /// floating point resolution of `t`.
    pub min_step: f64,
    /// Sub-step budget for a single call to `advance`.
    pub max_steps: usize,
    pub newton_max_iter: usize,
    /// Convergence threshold on the error-weighted RMS of a Newton correction.
    pub newton_tol: f64,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            method: Method::default(),
            abs_tol: 1e-6,
            rel_tol: 1e-6,
            initial_step: 1e-6,
            min_step: 0.0,
            max_steps: 100_000,
            newton_max_iter: 7,
            newton_tol: 1e-3,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(
            name: &'static str,
            requirement: &'static str,
            value: f64,
            ok: bool,
        ) -> Result<(), ConfigError> {
            if ok && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::InvalidSetting {
                    name,
                    requirement,
                    value,
                })
            }
        }

        check("abs_tol", "positive", self.abs_tol, self.abs_tol > 0.0)?;
        check("rel_tol", "non-negative", self.rel_tol, self.rel_tol >= 0.0)?;
        check("initial_step", "positive", self.initial_step, self.initial_step > 0.0)?;
        check("min_step", "non-negative", self.min_step, self.min_step >= 0.0)?;
        check("max_steps", "at least 1", self.max_steps as f64, self.max_steps > 0)?;
        check(
            "newton_max_iter",
            "at least 1",
            self.newton_max_iter as f64,
            self.newton_max_iter > 0,
        )?;
        check("newton_tol", "positive", self.newton_tol, self.newton_tol > 0.0)?;
        Ok(())
    }
}

/// Counters accumulated over the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub rhs_evals: usize,
    pub jacobian_evals: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub newton_failures: usize,
}

/// State of the session after a successful advance.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub y: Vec<f64>,
}

/// Adaptive implicit Runge–Kutta session for one ODE system.
pub struct Integrator<S: OdeSystem> {
    system: S,
    settings: IntegratorSettings,
    stepper: ImplicitRk,
    controller: StepController,
    t: f64,
    y: Vec<f64>,
    h: f64,
    y_new: Vec<f64>,
    y_err: Vec<f64>,
    checkpoint: Vec<f64>,
    stats: Stats,
}

impl<S: OdeSystem> Integrator<S> {
    /// Start a session at `t = 0` from `y0`.
    ///
    /// Parameters, initial state and settings are all validated here; nothing
    /// is discovered later in the middle of an integration.
    pub fn new(system: S, y0: &[f64], settings: IntegratorSettings) -> Result<Self, ConfigError> {
        system.validate()?;
        settings.validate()?;

        let n = system.dimension();
        if y0.len() != n {
            return Err(ConfigError::DimensionMismatch {
                expected: n,
                got: y0.len(),
            });
        }
        if let Some(index) = y0.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteInitialState(index));
        }

        let newton = NewtonSettings {
            max_iter: settings.newton_max_iter,
            tol: settings.newton_tol,
            abs_tol: settings.abs_tol,
            rel_tol: settings.rel_tol,
        };

        log::debug!(
            "integrator session: {} (order {}), abs_tol = {:e}, rel_tol = {:e}, h0 = {:e}",
            settings.method.name(),
            settings.method.order(),
            settings.abs_tol,
            settings.rel_tol,
            settings.initial_step
        );

        Ok(Self {
            system,
            settings,
            stepper: ImplicitRk::new(settings.method, n, newton),
            controller: StepController::new(settings.abs_tol, settings.rel_tol),
            t: 0.0,
            y: y0.to_vec(),
            h: settings.initial_step,
            y_new: vec![0.0; n],
            y_err: vec![0.0; n],
            checkpoint: vec![0.0; n],
            stats: Stats::default(),
        })
    }

    /// Integrate forward so that the session time becomes exactly `target`.
    ///
    /// Targets must be non-decreasing across calls. A target equal to the
    /// current time returns the current state unchanged. A target earlier than
    /// the current time is refused with
    /// [`IntegrationError::TargetBeforeCurrent`] and leaves the session as it
    /// was; integrating backwards is not supported.
    ///
    /// On any failure the session is restored to the state it had before the
    /// call, so a caller never observes a partially advanced state.
    pub fn advance(&mut self, target: f64) -> Result<Sample, IntegrationError> {
        if !target.is_finite() {
            return Err(IntegrationError::InvalidTarget(target));
        }
        if target < self.t {
            return Err(IntegrationError::TargetBeforeCurrent {
                target,
                current: self.t,
            });
        }

        let (t0, h0) = (self.t, self.h);
        self.checkpoint.copy_from_slice(&self.y);

        if let Err(failure) = self.integrate_to(target) {
            self.t = t0;
            self.h = h0;
            self.y.copy_from_slice(&self.checkpoint);
            log::debug!("advance to t = {} failed: {}", target, failure);
            return Err(failure.into());
        }

        Ok(Sample {
            t: self.t,
            y: self.y.clone(),
        })
    }

    fn integrate_to(&mut self, target: f64) -> Result<(), ConvergenceFailure> {
        let order = self.stepper.order();
        let mut substeps = 0usize;

        while self.t < target {
            if substeps >= self.settings.max_steps {
                return Err(ConvergenceFailure::StepLimitExceeded {
                    limit: self.settings.max_steps,
                    target,
                    t: self.t,
                });
            }
            substeps += 1;

            let proposed = self.h;
            let remaining = target - self.t;
            let (h, last) = if proposed >= remaining {
                (remaining, true)
            } else {
                (proposed, false)
            };

            let min = self.settings.min_step.max(4.0 * f64::EPSILON * self.t.abs());
            if !last && h < min {
                return Err(ConvergenceFailure::StepSizeTooSmall { t: self.t, h, min });
            }

            let stepped = self.stepper.step(
                &self.system,
                self.t,
                &self.y,
                h,
                &mut self.y_new,
                &mut self.y_err,
                &mut self.stats,
            );
            if let Err(failure) = stepped {
                log::trace!("stage solve failed at t = {}, h = {:e}: {:?}", self.t, h, failure);
                self.stats.newton_failures += 1;
                self.h = 0.5 * h;
                continue;
            }

            let ratio = self.controller.error_ratio(&self.y_new, &self.y_err);
            match self.controller.decide(order, h, ratio) {
                StepDecision::Reject { retry_h } => {
                    self.stats.rejected += 1;
                    self.h = retry_h;
                }
                StepDecision::Accept { next_h } => {
                    if let Some(index) = self.y_new.iter().position(|v| !v.is_finite()) {
                        return Err(ConvergenceFailure::NonFiniteState {
                            t: self.t + h,
                            index,
                        });
                    }
                    std::mem::swap(&mut self.y, &mut self.y_new);
                    self.stats.accepted += 1;
                    if last {
                        // The clipped step says little about the step the
                        // solution tolerates; keep the larger proposal.
                        self.t = target;
                        self.h = next_h.max(proposed);
                    } else {
                        self.t = (self.t + h).min(target);
                        self.h = next_h;
                    }
                }
            }
        }

        Ok(())
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    pub fn method(&self) -> Method {
        self.stepper.method()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Step size the controller will try first on the next advance.
    pub fn proposed_step(&self) -> f64 {
        self.h
    }
}

impl<S: OdeSystem> Drop for Integrator<S> {
    fn drop(&mut self) {
        log::debug!(
            "integrator session released at t = {}: {} accepted, {} rejected, {} newton failures, {} f evals, {} J evals",
            self.t,
            self.stats.accepted,
            self.stats.rejected,
            self.stats.newton_failures,
            self.stats.rhs_evals,
            self.stats.jacobian_evals
        );
    }
}
