use approx::{assert_abs_diff_eq, assert_relative_eq};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spring_sim::analytic;
use spring_sim::{
    DampedOscillator, Integrator, IntegrationError, IntegratorSettings, Method, OdeSystem,
    OscillatorParams, Regime,
};

const Y0: [f64; 2] = [0.5, 0.0];

fn params(damping: f64, forcing: f64) -> OscillatorParams {
    OscillatorParams {
        damping,
        stiffness: 2.0,
        mass: 20.0,
        forcing,
    }
}

fn session(params: OscillatorParams, settings: IntegratorSettings) -> Integrator<DampedOscillator> {
    Integrator::new(DampedOscillator::new(params), &Y0, settings).unwrap()
}

/// Largest deviation from the closed form over frames `1..=frames`.
fn max_error(params: OscillatorParams, settings: IntegratorSettings, frames: u32) -> f64 {
    let mut integrator = session(params, settings);
    let mut worst: f64 = 0.0;
    for frame in 1..=frames {
        let t = f64::from(frame);
        let sample = integrator.advance(t).unwrap();
        let (x, v) = analytic::solution(&params, Y0[0], Y0[1], t);
        worst = worst.max((sample.y[0] - x).abs()).max((sample.y[1] - v).abs());
    }
    worst
}

#[test]
fn matches_closed_form_in_every_damping_regime() {
    let critical = 2.0 * 40.0f64.sqrt();
    let cases = [
        (params(0.2, 5.0), Regime::Underdamped),
        (params(0.0, 0.0), Regime::Undamped),
        (params(critical, 5.0), Regime::CriticallyDamped),
        (params(40.0, 5.0), Regime::Overdamped),
    ];
    for (p, regime) in cases {
        assert_eq!(p.regime(), regime);
        let err = max_error(p, IntegratorSettings::default(), 60);
        assert!(err < 1e-4, "{}: max error {:e}", regime.label(), err);
    }
}

#[test]
fn lower_order_methods_stay_close_to_closed_form() {
    for (method, tolerance) in [(Method::ImplicitEuler, 1e-2), (Method::ImplicitMidpoint, 1e-3)] {
        let settings = IntegratorSettings {
            method,
            ..IntegratorSettings::default()
        };
        let err = max_error(params(0.2, 5.0), settings, 10);
        assert!(err < tolerance, "{}: max error {:e}", method.name(), err);
    }
}

#[test]
fn identical_sessions_produce_identical_trajectories() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut t = 0.0;
    let targets: Vec<f64> = (0..200)
        .map(|_| {
            t += rng.gen_range(0.01..2.0);
            t
        })
        .collect();

    let mut a = session(params(0.2, 5.0), IntegratorSettings::default());
    let mut b = session(params(0.2, 5.0), IntegratorSettings::default());
    for &target in &targets {
        let sa = a.advance(target).unwrap();
        let sb = b.advance(target).unwrap();
        assert_eq!(sa, sb);
        assert_eq!(sa.t, target);
    }
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn time_lands_exactly_on_irregular_targets() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut integrator = session(params(0.2, 5.0), IntegratorSettings::default());
    let mut target = 0.0;
    for _ in 0..100 {
        target += rng.gen_range(1e-9..3.0);
        let sample = integrator.advance(target).unwrap();
        assert_eq!(sample.t, target);
    }
}

#[test]
fn damped_motion_settles_at_equilibrium() {
    let p = OscillatorParams {
        damping: 4.0,
        stiffness: 2.0,
        mass: 20.0,
        forcing: 5.0,
    };
    let mut integrator = session(p, IntegratorSettings::default());
    let sample = integrator.advance(300.0).unwrap();
    assert_abs_diff_eq!(sample.y[0], p.equilibrium(), epsilon = 1e-5);
    assert_abs_diff_eq!(sample.y[1], 0.0, epsilon = 1e-5);
}

#[test]
fn undamped_free_motion_conserves_energy() {
    let p = params(0.0, 0.0);
    let e0 = p.energy(Y0[0], Y0[1]);
    let mut integrator = session(p, IntegratorSettings::default());
    for frame in 1..=200 {
        let sample = integrator.advance(f64::from(frame)).unwrap();
        assert_relative_eq!(p.energy(sample.y[0], sample.y[1]), e0, max_relative = 1e-6);
    }
}

#[test]
fn implicit_euler_dissipates_energy() {
    let p = params(0.0, 0.0);
    let e0 = p.energy(Y0[0], Y0[1]);
    let settings = IntegratorSettings {
        method: Method::ImplicitEuler,
        ..IntegratorSettings::default()
    };
    let mut integrator = session(p, settings);
    let sample = integrator.advance(10.0).unwrap();
    assert!(p.energy(sample.y[0], sample.y[1]) < e0);
}

#[test]
fn default_scenario_matches_tight_reference() {
    let tight = IntegratorSettings {
        abs_tol: 1e-9,
        rel_tol: 1e-9,
        ..IntegratorSettings::default()
    };
    let p = params(0.2, 5.0);
    let mut integrator = session(p, IntegratorSettings::default());
    let mut reference = session(p, tight);

    let mut last_t = 0.0;
    for target in [1.0, 2.0, 3.0] {
        let sample = integrator.advance(target).unwrap();
        let expected = reference.advance(target).unwrap();
        assert!(sample.t > last_t);
        last_t = sample.t;
        assert_abs_diff_eq!(sample.y[0], expected.y[0], epsilon = 1e-5);
        assert_abs_diff_eq!(sample.y[1], expected.y[1], epsilon = 1e-5);

        let (x, v) = analytic::solution(&p, Y0[0], Y0[1], target);
        assert_abs_diff_eq!(expected.y[0], x, epsilon = 1e-7);
        assert_abs_diff_eq!(expected.y[1], v, epsilon = 1e-7);
    }
    assert!(reference.stats().accepted > integrator.stats().accepted);
}

#[test]
fn backward_target_leaves_session_untouched() {
    let mut integrator = session(params(0.2, 5.0), IntegratorSettings::default());
    let at_five = integrator.advance(5.0).unwrap();
    assert!(matches!(
        integrator.advance(4.0),
        Err(IntegrationError::TargetBeforeCurrent { .. })
    ));
    assert_eq!(integrator.advance(5.0).unwrap(), at_five);
    // continuing forward is unaffected by the refused call
    let mut fresh = session(params(0.2, 5.0), IntegratorSettings::default());
    fresh.advance(5.0).unwrap();
    assert_eq!(integrator.advance(6.0).unwrap(), fresh.advance(6.0).unwrap());
}

/// Oscillator whose right-hand side blows up once `|x|` exceeds a threshold.
struct Fragile {
    inner: DampedOscillator,
    limit: f64,
}

impl OdeSystem for Fragile {
    fn dimension(&self) -> usize {
        2
    }

    fn derivative(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        self.inner.derivative(t, y, dydt);
        if y[0].abs() > self.limit {
            dydt[1] = f64::NAN;
        }
    }

    fn jacobian(&self, t: f64, y: &[f64], dfdy: &mut DMatrix<f64>, dfdt: &mut [f64]) {
        self.inner.jacobian(t, y, dfdy, dfdt);
    }
}

#[test]
fn breakdown_is_reported_and_rolled_back() {
    let system = Fragile {
        inner: DampedOscillator::new(params(0.2, 5.0)),
        limit: 1.0,
    };
    let mut integrator = Integrator::new(system, &Y0, IntegratorSettings::default()).unwrap();

    // x rises from 0.5 towards 2.5 + 2 and crosses 1 after a few seconds
    let good = integrator.advance(1.0).unwrap();
    let err = integrator.advance(30.0).unwrap_err();
    assert!(err.is_convergence_failure(), "unexpected error {:?}", err);
    assert_eq!(integrator.advance(1.0).unwrap(), good);
}

#[test]
fn step_budget_exhaustion_is_a_convergence_failure() {
    let settings = IntegratorSettings {
        max_steps: 3,
        ..IntegratorSettings::default()
    };
    let mut integrator = session(params(0.2, 5.0), settings);
    let err = integrator.advance(10.0).unwrap_err();
    assert!(err.is_convergence_failure());
    assert_eq!(integrator.advance(0.0).unwrap().y, Y0.to_vec());
}
