//! Implicit Runge–Kutta step with simplified Newton iterations.
//!
//! The stage derivatives `K_i` solve
//!
//! ```text
//! K_i = f(t + c_i h, y + h Σ_j a_ij K_j),   i = 1..s
//! ```
//!
//! The Newton matrix `I - h (A ⊗ J)` is built once per step from the analytic
//! Jacobian at `(t, y)` and LU-factorised; the iteration then only re-evaluates
//! the right-hand side. Local error is estimated by step doubling.

use nalgebra::{DMatrix, DVector};

use super::method::{Method, Tableau};
use super::Stats;
use crate::model::OdeSystem;

/// Why the stage equations could not be solved for a given step size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageFailure {
    SingularMatrix,
    Diverged,
    NotConverged,
}

/// Newton iteration budget and error-weighted convergence threshold.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NewtonSettings {
    pub max_iter: usize,
    pub tol: f64,
    pub abs_tol: f64,
    pub rel_tol: f64,
}

struct StageSolver {
    tableau: &'static Tableau,
    n: usize,
    newton: NewtonSettings,
    jac: DMatrix<f64>,
    dfdt: Vec<f64>,
    k: Vec<f64>,
    stage_y: Vec<f64>,
    f_eval: Vec<f64>,
    residual: DVector<f64>,
    weights: Vec<f64>,
}

impl StageSolver {
    fn new(tableau: &'static Tableau, n: usize, newton: NewtonSettings) -> Self {
        let s = tableau.stages();
        Self {
            tableau,
            n,
            newton,
            jac: DMatrix::zeros(n, n),
            dfdt: vec![0.0; n],
            k: vec![0.0; s * n],
            stage_y: vec![0.0; n],
            f_eval: vec![0.0; n],
            residual: DVector::zeros(s * n),
            weights: vec![0.0; n],
        }
    }

    /// One implicit step of size `h` from `(t, y)`, result in `y_out`.
    fn solve<S: OdeSystem>(
        &mut self,
        system: &S,
        t: f64,
        y: &[f64],
        h: f64,
        y_out: &mut [f64],
        stats: &mut Stats,
    ) -> Result<(), StageFailure> {
        let n = self.n;
        let tab = self.tableau;
        let s = tab.stages();

        system.jacobian(t, y, &mut self.jac, &mut self.dfdt);
        stats.jacobian_evals += 1;

        let mut newton_matrix = DMatrix::<f64>::identity(s * n, s * n);
        for i in 0..s {
            for j in 0..s {
                let ha = h * tab.a(i, j);
                if ha == 0.0 {
                    continue;
                }
                for r in 0..n {
                    for c in 0..n {
                        newton_matrix[(i * n + r, j * n + c)] -= ha * self.jac[(r, c)];
                    }
                }
            }
        }
        let lu = newton_matrix.lu();
        if !lu.is_invertible() {
            return Err(StageFailure::SingularMatrix);
        }

        // Start every stage from the derivative at the left end point.
        system.derivative(t, y, &mut self.f_eval);
        stats.rhs_evals += 1;
        for i in 0..s {
            self.k[i * n..(i + 1) * n].copy_from_slice(&self.f_eval);
        }
        for (w, yi) in self.weights.iter_mut().zip(y) {
            *w = self.newton.abs_tol + self.newton.rel_tol * yi.abs();
        }

        let mut previous_norm = f64::INFINITY;
        for iter in 0..self.newton.max_iter {
            for i in 0..s {
                for m in 0..n {
                    let mut acc = y[m];
                    for j in 0..s {
                        acc += h * tab.a(i, j) * self.k[j * n + m];
                    }
                    self.stage_y[m] = acc;
                }
                system.derivative(t + tab.c[i] * h, &self.stage_y, &mut self.f_eval);
                stats.rhs_evals += 1;
                for m in 0..n {
                    self.residual[i * n + m] = self.f_eval[m] - self.k[i * n + m];
                }
            }

            let delta = lu.solve(&self.residual).ok_or(StageFailure::SingularMatrix)?;

            let mut norm = 0.0;
            for i in 0..s {
                for m in 0..n {
                    let d = delta[i * n + m];
                    self.k[i * n + m] += d;
                    let scaled = h * d / self.weights[m];
                    norm += scaled * scaled;
                }
            }
            let norm = (norm / (s * n) as f64).sqrt();

            if !norm.is_finite() {
                return Err(StageFailure::Diverged);
            }
            if norm <= self.newton.tol {
                for m in 0..n {
                    let mut acc = y[m];
                    for i in 0..s {
                        acc += h * tab.b[i] * self.k[i * n + m];
                    }
                    y_out[m] = acc;
                }
                return Ok(());
            }
            if iter > 0 && norm > 2.0 * previous_norm {
                return Err(StageFailure::Diverged);
            }
            previous_norm = norm;
        }

        Err(StageFailure::NotConverged)
    }
}

/// Implicit Runge–Kutta stepper with a step-doubling error estimate.
pub(crate) struct ImplicitRk {
    method: Method,
    solver: StageSolver,
    full: Vec<f64>,
    midpoint: Vec<f64>,
}

impl ImplicitRk {
    pub fn new(method: Method, n: usize, newton: NewtonSettings) -> Self {
        Self {
            method,
            solver: StageSolver::new(method.tableau(), n, newton),
            full: vec![0.0; n],
            midpoint: vec![0.0; n],
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn order(&self) -> u32 {
        self.method.order()
    }

    /// Advance `(t, y)` by `h`.
    ///
    /// `y_out` receives the result of two half steps; `y_err` the Richardson
    /// estimate of its local error, `(y_half - y_full) / (2^p - 1)`.
    pub fn step<S: OdeSystem>(
        &mut self,
        system: &S,
        t: f64,
        y: &[f64],
        h: f64,
        y_out: &mut [f64],
        y_err: &mut [f64],
        stats: &mut Stats,
    ) -> Result<(), StageFailure> {
        self.solver.solve(system, t, y, h, &mut self.full, stats)?;

        let half = 0.5 * h;
        self.solver.solve(system, t, y, half, &mut self.midpoint, stats)?;
        self.solver
            .solve(system, t + half, &self.midpoint, half, y_out, stats)?;

        let scale = (2u32.pow(self.order()) - 1) as f64;
        for ((e, fine), coarse) in y_err.iter_mut().zip(y_out.iter()).zip(&self.full) {
            *e = (fine - coarse) / scale;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DampedOscillator, OscillatorParams};
    use approx::assert_relative_eq;

    const NEWTON: NewtonSettings = NewtonSettings {
        max_iter: 7,
        tol: 1e-3,
        abs_tol: 1e-6,
        rel_tol: 1e-6,
    };

    struct Decay;

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }
        fn derivative(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -y[0];
        }
        fn jacobian(&self, _t: f64, _y: &[f64], dfdy: &mut DMatrix<f64>, dfdt: &mut [f64]) {
            dfdy[(0, 0)] = -1.0;
            dfdt[0] = 0.0;
        }
    }

    #[test]
    fn backward_euler_on_linear_decay_is_exact_rational() {
        let mut stepper = ImplicitRk::new(Method::ImplicitEuler, 1, NEWTON);
        let mut stats = Stats::default();
        let (mut y, mut err) = ([0.0], [0.0]);
        stepper.step(&Decay, 0.0, &[1.0], 0.2, &mut y, &mut err, &mut stats).unwrap();
        // two half steps of y/(1 + h/2)
        assert_relative_eq!(y[0], 1.0 / (1.1 * 1.1), epsilon = 1e-12);
        assert_relative_eq!(err[0], 1.0 / (1.1 * 1.1) - 1.0 / 1.2, epsilon = 1e-12);
    }

    #[test]
    fn gauss_legendre_step_matches_exponential() {
        let mut stepper = ImplicitRk::new(Method::GaussLegendre4, 1, NEWTON);
        let mut stats = Stats::default();
        let (mut y, mut err) = ([0.0], [0.0]);
        stepper.step(&Decay, 0.0, &[1.0], 0.1, &mut y, &mut err, &mut stats).unwrap();
        let exact = (-0.1f64).exp();
        assert_relative_eq!(y[0], exact, epsilon = 1e-8);
        // Richardson estimate tracks the true error of the kept solution
        assert!((y[0] - exact + err[0]).abs() < 1e-11);
        assert!(stats.rhs_evals > 0);
        assert_eq!(stats.jacobian_evals, 3);
    }

    #[test]
    fn linear_system_converges_in_two_newton_passes() {
        let osc = DampedOscillator::new(OscillatorParams::default());
        let mut stepper = ImplicitRk::new(Method::GaussLegendre4, 2, NEWTON);
        let mut stats = Stats::default();
        let (mut y, mut err) = ([0.0; 2], [0.0; 2]);
        stepper
            .step(&osc, 0.0, &[0.5, 0.0], 0.5, &mut y, &mut err, &mut stats)
            .unwrap();
        // per solve: one initial evaluation plus two stages per Newton pass
        assert_eq!(stats.rhs_evals, 3 * (1 + 2 * 2));
    }

    #[test]
    fn exhausted_newton_budget_is_reported() {
        struct Stiff;
        impl OdeSystem for Stiff {
            fn dimension(&self) -> usize {
                1
            }
            fn derivative(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
                dydt[0] = -y[0] * y[0] * y[0];
            }
            fn jacobian(&self, _t: f64, _y: &[f64], dfdy: &mut DMatrix<f64>, dfdt: &mut [f64]) {
                // deliberately wrong: the iteration cannot settle in one pass
                dfdy[(0, 0)] = 0.0;
                dfdt[0] = 0.0;
            }
        }
        let newton = NewtonSettings { max_iter: 1, ..NEWTON };
        let mut stepper = ImplicitRk::new(Method::ImplicitEuler, 1, newton);
        let mut stats = Stats::default();
        let (mut y, mut err) = ([0.0], [0.0]);
        let result = stepper.step(&Stiff, 0.0, &[2.0], 0.5, &mut y, &mut err, &mut stats);
        assert_eq!(result, Err(StageFailure::NotConverged));
    }
}
