//! The `DIA`/`EXP` discretisation trio and the `Species` boundary enum.
//!
//! `Hopping` is a sealed trait with two zero-sized marker implementations so
//! the DIA/EXP choice is resolved at compile time. The determinant-route
//! axis is instead a runtime field on `HubbardFermiAction`.

use crate::types::DMat;

mod private {
    pub trait Sealed {}
    impl Sealed for super::Dia {}
    impl Sealed for super::Exp {}
}

/// A discretisation of the hopping kernel on a time slice.
pub trait Hopping: private::Sealed + Copy + Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Human-readable discretisation name, used in log fields.
    fn name() -> &'static str;

    /// The dense matrix substituted for kappa in K/P/T formulas: kappa
    /// itself for DIA, its matrix exponential for EXP.
    fn effective_kappa(kappa: &DMat) -> DMat;

    /// The extra dense factor `F` is right-multiplied by on a time slice:
    /// identity for DIA (F stays the plain phase diagonal), `exp(kappa)` for
    /// EXP (spec: "EXP variant multiplies by an exponential hopping
    /// factor").
    fn f_hopping_factor(kappa: &DMat) -> DMat;

    /// `forceDirectSquare`'s two DIA/EXP term orderings differ only in which
    /// side of the `Q^-1` block the `T` factor sits on.
    const SWAPS_T_SIDES: bool;
}

/// Linear discretisation: the hopping kernel enters formulas as `kappa`
/// itself.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Dia;

impl Hopping for Dia {
    fn name() -> &'static str {
        "DIA"
    }

    fn effective_kappa(kappa: &DMat) -> DMat {
        kappa.clone()
    }

    fn f_hopping_factor(kappa: &DMat) -> DMat {
        DMat::identity(kappa.nrows(), kappa.ncols())
    }

    const SWAPS_T_SIDES: bool = false;
}

/// Exponential discretisation: the hopping kernel enters formulas as
/// `exp(kappa)`. kappa is real symmetric, so the
/// exponential is computed via a symmetric eigendecomposition rather than a
/// general Padé approximant.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Exp;

impl Hopping for Exp {
    fn name() -> &'static str {
        "EXP"
    }

    fn effective_kappa(kappa: &DMat) -> DMat {
        let eig = nalgebra::linalg::SymmetricEigen::new(kappa.clone());
        let exp_eigenvalues = eig.eigenvalues.map(|x| x.exp());
        &eig.eigenvectors * DMat::from_diagonal(&exp_eigenvalues) * eig.eigenvectors.transpose()
    }

    fn f_hopping_factor(kappa: &DMat) -> DMat {
        Self::effective_kappa(kappa)
    }

    const SWAPS_T_SIDES: bool = true;
}

/// Which fermion Green's function `M` represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Species {
    Particle,
    Hole,
}
