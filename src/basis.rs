//! The `PARTICLE_HOLE`/`SPIN` basis axis.

mod private {
    pub trait Sealed {}
    impl Sealed for super::ParticleHole {}
    impl Sealed for super::Spin {}
}

/// An analytic rewriting of the auxiliary field.
pub trait Basis: private::Sealed + Copy + Clone + std::fmt::Debug + Send + Sync + 'static {
    /// `true` for `PARTICLE_HOLE`. Gates the hole-determinant shortcut and
    /// picks which branch of `HubbardFermiAction::eval`/`force` runs.
    const IS_PARTICLE_HOLE: bool;

    fn name() -> &'static str;
}

/// The native particle/hole basis; eligible for the bipartite shortcut.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticleHole;

impl Basis for ParticleHole {
    const IS_PARTICLE_HOLE: bool = true;

    fn name() -> &'static str {
        "PARTICLE_HOLE"
    }
}

/// The spin basis: `phi` is analytically continued by `-i` before every use.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Spin;

impl Basis for Spin {
    const IS_PARTICLE_HOLE: bool = false;

    fn name() -> &'static str {
        "SPIN"
    }
}
