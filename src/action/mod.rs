//! The `Action` trait and its two concrete families: the Gaussian gauge
//! action and the Hubbard fermion action, composed through [`SumAction`].

mod fermion;
mod gauge;
mod sum;

pub use fermion::{HubbardFermiAction, ShortcutReason, Variant};
pub use gauge::HubbardGaugeAction;
pub use sum::{combine, SumAction};

use std::rc::Rc;

use num_complex::Complex;

use crate::error::CoreError;
use crate::types::CDVec;

/// A term of the Monte-Carlo action: its value and the gradient of its
/// negative (the force) at a configuration `phi`.
pub trait Action: Send + Sync {
    /// `S(phi)`.
    fn eval(&self, phi: &CDVec) -> Result<Complex<f64>, CoreError>;

    /// `-dS/dphi(phi)`.
    fn force(&self, phi: &CDVec) -> Result<CDVec, CoreError>;

    /// `Some(terms)` iff `self` is a [`SumAction`]: lets `SumAction::push`
    /// flatten an added `SumAction` into its caller's list of terms without
    /// an orphan-rule-violating blanket `Add` impl or an `Any` downcast.
    /// Every other `Action` keeps the default `None`.
    fn as_sum_terms(&self) -> Option<&[Rc<dyn Action>]> {
        None
    }
}
