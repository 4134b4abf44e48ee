//! Step-size control on the local error estimate

const SAFETY: f64 = 0.9;
const MIN_SCALE: f64 = 0.2;
const MAX_SCALE: f64 = 5.0;
const REJECT_ABOVE: f64 = 1.1;
const GROW_BELOW: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum StepDecision {
    /// Keep the step; continue with `next_h`.
    Accept { next_h: f64 },
    /// Discard the step and retry with `retry_h`.
    Reject { retry_h: f64 },
}

/// Error control in the standard form: component `i` is allowed an error of
/// `abs_tol + rel_tol·|y_i|`, and the worst ratio drives the step size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepController {
    abs_tol: f64,
    rel_tol: f64,
}

impl StepController {
    pub fn new(abs_tol: f64, rel_tol: f64) -> Self {
        Self { abs_tol, rel_tol }
    }

    /// `max_i |err_i| / (abs_tol + rel_tol·|y_i|)`
    pub fn error_ratio(&self, y: &[f64], y_err: &[f64]) -> f64 {
        y.iter().zip(y_err).fold(0.0, |worst: f64, (yi, ei)| {
            let ratio = ei.abs() / (self.abs_tol + self.rel_tol * yi.abs());
            if ratio.is_nan() {
                f64::INFINITY
            } else {
                worst.max(ratio)
            }
        })
    }

    pub fn decide(&self, order: u32, h: f64, ratio: f64) -> StepDecision {
        let order = order as f64;
        if !ratio.is_finite() {
            return StepDecision::Reject {
                retry_h: h * MIN_SCALE,
            };
        }
        if ratio > REJECT_ABOVE {
            let scale = (SAFETY * ratio.powf(-1.0 / order)).max(MIN_SCALE);
            StepDecision::Reject { retry_h: h * scale }
        } else if ratio < GROW_BELOW {
            let scale = if ratio == 0.0 {
                MAX_SCALE
            } else {
                (SAFETY * ratio.powf(-1.0 / (order + 1.0))).clamp(1.0, MAX_SCALE)
            };
            StepDecision::Accept { next_h: h * scale }
        } else {
            StepDecision::Accept { next_h: h }
        }
    }
}
