//! Runtime-enum boundary and factory functions for constructing a concrete
//! `HubbardFermiAction<HOP, BASIS>`, boxed behind the `Action` trait.

use crate::action::{Action, HubbardFermiAction, Variant};
use crate::basis::{ParticleHole, Spin};
use crate::error::CoreError;
use crate::kernel::{Dia, Exp};
use crate::lattice::{kappa_tilde, Lattice};
use crate::types::DSMat;

/// Discretisation selector at the runtime/library boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HfaHopping {
    #[default]
    Dia,
    Exp,
}

/// Determinant-route selector at the runtime/library boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HfaVariant {
    #[default]
    One,
    Two,
}

impl From<HfaVariant> for Variant {
    fn from(v: HfaVariant) -> Variant {
        match v {
            HfaVariant::One => Variant::One,
            HfaVariant::Two => Variant::Two,
        }
    }
}

/// Basis selector at the runtime/library boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HfaBasis {
    #[default]
    ParticleHole,
    Spin,
}

/// Builds the concrete `HubbardFermiAction<HOP, BASIS>` named by the three
/// runtime enums, boxed as `Action`. Defaults: `hop=DIA`, `basis=PARTICLE_HOLE`,
/// `variant=ONE`.
pub fn make_hubbard_fermi_action(
    kappa: DSMat,
    mu: f64,
    sigma_kappa: f64,
    hop: HfaHopping,
    basis: HfaBasis,
    variant: HfaVariant,
) -> Result<Box<dyn Action>, CoreError> {
    let variant = Variant::from(variant);
    match (hop, basis) {
        (HfaHopping::Dia, HfaBasis::ParticleHole) => Ok(Box::new(
            HubbardFermiAction::<Dia, ParticleHole>::new(kappa, mu, sigma_kappa, variant)?,
        )),
        (HfaHopping::Dia, HfaBasis::Spin) => Ok(Box::new(HubbardFermiAction::<Dia, Spin>::new(
            kappa,
            mu,
            sigma_kappa,
            variant,
        )?)),
        (HfaHopping::Exp, HfaBasis::ParticleHole) => Ok(Box::new(
            HubbardFermiAction::<Exp, ParticleHole>::new(kappa, mu, sigma_kappa, variant)?,
        )),
        (HfaHopping::Exp, HfaBasis::Spin) => Ok(Box::new(HubbardFermiAction::<Exp, Spin>::new(
            kappa,
            mu,
            sigma_kappa,
            variant,
        )?)),
    }
}

/// As [`make_hubbard_fermi_action`], but derives `kappa_tilde = kappa(lattice)
/// * beta / Nt(lattice)` from a lattice geometry.
pub fn make_hubbard_fermi_action_from_lattice<L: Lattice>(
    lattice: &L,
    beta: f64,
    mu: f64,
    sigma_kappa: f64,
    hop: HfaHopping,
    basis: HfaBasis,
    variant: HfaVariant,
) -> Result<Box<dyn Action>, CoreError> {
    let kappa = kappa_tilde(lattice, beta);
    make_hubbard_fermi_action(kappa, mu, sigma_kappa, hop, basis, variant)
}
