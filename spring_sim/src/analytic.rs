//! Closed-form solution of the constantly forced, damped oscillator.
//!
//! Used as the reference the integrator is checked against and by the
//! status panel to show the drift between numerical and exact state.

use crate::model::{OscillatorParams, Regime};

/// Exact `(position, velocity)` at time `t` for the initial state
/// `(x0, v0)` at `t = 0`.
///
/// The particular solution is the equilibrium `F/k`; the homogeneous part
/// depends on the damping regime. Parameters are assumed valid.
pub fn solution(params: &OscillatorParams, x0: f64, v0: f64, t: f64) -> (f64, f64) {
    let xe = params.equilibrium();
    let u0 = x0 - xe;
    let gamma = params.damping / (2.0 * params.mass);
    let w0 = params.natural_frequency();

    let (u, v) = match params.regime() {
        Regime::Undamped | Regime::Underdamped => {
            let wd = (w0 * w0 - gamma * gamma).sqrt();
            let a = u0;
            let b = (v0 + gamma * u0) / wd;
            let (sin, cos) = (wd * t).sin_cos();
            let decay = (-gamma * t).exp();
            let osc = a * cos + b * sin;
            let dosc = wd * (b * cos - a * sin);
            (decay * osc, decay * (dosc - gamma * osc))
        }
        Regime::CriticallyDamped => {
            let a = u0;
            let b = v0 + gamma * u0;
            let decay = (-gamma * t).exp();
            (decay * (a + b * t), decay * (b - gamma * (a + b * t)))
        }
        Regime::Overdamped => {
            let root = (gamma * gamma - w0 * w0).sqrt();
            let (r1, r2) = (-gamma + root, -gamma - root);
            let c2 = (v0 - r1 * u0) / (r2 - r1);
            let c1 = u0 - c2;
            let (e1, e2) = ((r1 * t).exp(), (r2 * t).exp());
            (c1 * e1 + c2 * e2, c1 * r1 * e1 + c2 * r2 * e2)
        }
    };

    (u + xe, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(damping: f64) -> OscillatorParams {
        OscillatorParams {
            damping,
            stiffness: 2.0,
            mass: 20.0,
            forcing: 5.0,
        }
    }

    #[test]
    fn starts_at_initial_state() {
        for c in [0.0, 0.2, 2.0 * 40.0f64.sqrt(), 40.0] {
            let (x, v) = solution(&params(c), 0.5, -0.3, 0.0);
            assert_relative_eq!(x, 0.5, epsilon = 1e-12);
            assert_relative_eq!(v, -0.3, epsilon = 1e-12);
        }
    }

    #[test]
    fn satisfies_equation_of_motion() {
        // central differences of the velocity against the acceleration
        let dt = 1e-5;
        for c in [0.0, 0.2, 2.0 * 40.0f64.sqrt(), 40.0] {
            let p = params(c);
            for t in [0.7, 3.0, 11.0] {
                let (x, v) = solution(&p, 0.5, 0.0, t);
                let (_, v_plus) = solution(&p, 0.5, 0.0, t + dt);
                let (_, v_minus) = solution(&p, 0.5, 0.0, t - dt);
                let accel = (v_plus - v_minus) / (2.0 * dt);
                let expected = (p.forcing - p.damping * v - p.stiffness * x) / p.mass;
                assert_relative_eq!(accel, expected, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn damped_solution_settles_at_equilibrium() {
        let (x, v) = solution(&params(4.0), 0.5, 0.0, 500.0);
        assert_relative_eq!(x, 2.5, epsilon = 1e-9);
        assert_relative_eq!(v, 0.0, epsilon = 1e-9);
    }
}
