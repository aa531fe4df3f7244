//! `SumAction`: a flattening composite of action terms, so
//! `a + b + c` never nests three deep regardless of grouping.
//!
//! Terms are held as `Rc<dyn Action>` rather than owned `Box<dyn Action>`:
//! spec.md's SumAction "holds a list of non-owning references to Action
//! objects" and its `+` "keeps alive its operands (ownership stays with the
//! caller; SumAction stores references)" — a caller builds its action terms
//! behind `Rc`, keeps its own clone of each handle, and hands clones into one
//! or more `SumAction`s without ever losing the ability to reuse a term.

use std::ops::Add;
use std::rc::Rc;

use num_complex::Complex;

use super::Action;
use crate::error::CoreError;
use crate::types::CDVec;

/// A flat list of terms evaluated and differentiated independently, then
/// summed.
#[derive(Default)]
pub struct SumAction {
    terms: Vec<Rc<dyn Action>>,
}

impl SumAction {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    pub fn get(&self, index: usize) -> Option<&dyn Action> {
        self.terms.get(index).map(|b| b.as_ref())
    }

    /// Appends `rhs`, flattening it first if it is itself a `SumAction`.
    pub fn push(&mut self, rhs: Rc<dyn Action>) {
        if let Some(inner_terms) = rhs.as_sum_terms() {
            self.terms.extend(inner_terms.iter().cloned());
        } else {
            self.terms.push(rhs);
        }
    }
}

impl Action for SumAction {
    fn eval(&self, phi: &CDVec) -> Result<Complex<f64>, CoreError> {
        let mut sum = Complex::new(0.0, 0.0);
        for term in &self.terms {
            sum += term.eval(phi)?;
        }
        Ok(sum)
    }

    fn force(&self, phi: &CDVec) -> Result<CDVec, CoreError> {
        let mut sum = CDVec::zeros(phi.len());
        for term in &self.terms {
            sum += term.force(phi)?;
        }
        Ok(sum)
    }

    fn as_sum_terms(&self) -> Option<&[Rc<dyn Action>]> {
        Some(&self.terms)
    }
}

impl Add<Rc<dyn Action>> for SumAction {
    type Output = SumAction;

    fn add(mut self, rhs: Rc<dyn Action>) -> SumAction {
        self.push(rhs);
        self
    }
}

/// Combines two action terms into a (possibly flattened) `SumAction`,
/// the ergonomic entry point for `combine(a, b) + c`-style composition.
pub fn combine(a: Rc<dyn Action>, b: Rc<dyn Action>) -> SumAction {
    let mut sum = SumAction::new();
    sum.push(a);
    sum.push(b);
    sum
}
