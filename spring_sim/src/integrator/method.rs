//! Implicit Runge–Kutta methods and their Butcher tableaux

use serde::Deserialize;

/// Implicit one-step methods available to the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Backward Euler, order 1.
    ImplicitEuler,
    /// Implicit midpoint rule, order 2.
    ImplicitMidpoint,
    /// Two-stage Gauss–Legendre collocation, order 4.
    #[default]
    GaussLegendre4,
}

impl Method {
    pub fn tableau(self) -> &'static Tableau {
        match self {
            Method::ImplicitEuler => &IMPLICIT_EULER,
            Method::ImplicitMidpoint => &IMPLICIT_MIDPOINT,
            Method::GaussLegendre4 => &GAUSS_LEGENDRE_4,
        }
    }

    pub fn order(self) -> u32 {
        self.tableau().order
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::ImplicitEuler => "implicit Euler",
            Method::ImplicitMidpoint => "implicit midpoint",
            Method::GaussLegendre4 => "Gauss-Legendre 4",
        }
    }
}

/// Butcher tableau. `a` is stored row-major, `stages × stages`.
#[derive(Debug)]
pub struct Tableau {
    pub order: u32,
    pub a: &'static [f64],
    pub b: &'static [f64],
    pub c: &'static [f64],
}

impl Tableau {
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    #[inline]
    pub fn a(&self, i: usize, j: usize) -> f64 {
        self.a[i * self.stages() + j]
    }
}

static IMPLICIT_EULER: Tableau = Tableau {
    order: 1,
    a: &[1.0],
    b: &[1.0],
    c: &[1.0],
};

static IMPLICIT_MIDPOINT: Tableau = Tableau {
    order: 2,
    a: &[0.5],
    b: &[1.0],
    c: &[0.5],
};

// √3/6 = 0.288_675_134_594_812_9
static GAUSS_LEGENDRE_4: Tableau = Tableau {
    order: 4,
    a: &[
        0.25,
        -0.038_675_134_594_812_87,
        0.538_675_134_594_812_9,
        0.25,
    ],
    b: &[0.5, 0.5],
    c: &[0.211_324_865_405_187_13, 0.788_675_134_594_812_9],
};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tableaux_are_consistent() {
        for method in [Method::ImplicitEuler, Method::ImplicitMidpoint, Method::GaussLegendre4] {
            let tab = method.tableau();
            let s = tab.stages();
            assert_eq!(tab.a.len(), s * s);
            assert_eq!(tab.c.len(), s);
            assert_relative_eq!(tab.b.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
            // row sums of A equal the nodes
            for i in 0..s {
                let row: f64 = (0..s).map(|j| tab.a(i, j)).sum();
                assert_relative_eq!(row, tab.c[i], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn gauss_legendre_satisfies_fourth_order_quadrature() {
        let tab = Method::GaussLegendre4.tableau();
        // Σ b_i c_i^(q-1) = 1/q for q = 1..=4
        for q in 1..=4 {
            let sum: f64 = (0..2).map(|i| tab.b[i] * tab.c[i].powi(q - 1)).sum();
            assert_relative_eq!(sum, 1.0 / q as f64, epsilon = 1e-14);
        }
    }

    #[test]
    fn default_method_is_gauss_legendre() {
        assert_eq!(Method::default(), Method::GaussLegendre4);
        assert_eq!(Method::default().order(), 4);
    }
}
