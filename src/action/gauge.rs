//! `HubbardGaugeAction`: the Gaussian part of the action
//! coupling the auxiliary field to itself, `S = phi.phi / (2*Utilde)`.

use num_complex::Complex;

use super::Action;
use crate::error::CoreError;
use crate::types::CDVec;

/// `S(phi) = phi.dot(phi) / (2*Utilde)`, `F(phi) = -phi/Utilde`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HubbardGaugeAction {
    u_tilde: f64,
}

impl HubbardGaugeAction {
    pub fn new(u_tilde: f64) -> Self {
        Self { u_tilde }
    }

    pub fn u_tilde(&self) -> f64 {
        self.u_tilde
    }
}

impl Action for HubbardGaugeAction {
    fn eval(&self, phi: &CDVec) -> Result<Complex<f64>, CoreError> {
        let dot: Complex<f64> = phi.iter().map(|x| x * x).sum();
        Ok(dot / (2.0 * self.u_tilde))
    }

    fn force(&self, phi: &CDVec) -> Result<CDVec, CoreError> {
        Ok(phi.map(|x| -x / self.u_tilde))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn eval_matches_quadratic_form() {
        let action = HubbardGaugeAction::new(2.0);
        let phi = CDVec::from_vec(vec![Complex::new(1.0, 0.5), Complex::new(-2.0, 0.0)]);
        let s = action.eval(&phi).unwrap();
        let expected = (phi[0] * phi[0] + phi[1] * phi[1]) / 4.0;
        assert_relative_eq!(s.re, expected.re, epsilon = 1e-12);
        assert_relative_eq!(s.im, expected.im, epsilon = 1e-12);
    }

    #[test]
    fn force_is_linear_in_phi() {
        let action = HubbardGaugeAction::new(4.0);
        let phi = CDVec::from_vec(vec![Complex::new(2.0, 0.0), Complex::new(-1.0, 0.0)]);
        let f = action.force(&phi).unwrap();
        assert_relative_eq!(f[0].re, -0.5, epsilon = 1e-12);
        assert_relative_eq!(f[1].re, 0.25, epsilon = 1e-12);
    }
}
