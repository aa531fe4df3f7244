//! Numerical core of a lattice Hubbard-model Monte Carlo engine: the fermion
//! matrix family `M`/`Q`, the block-cyclic `QLU` decomposition, and the
//! action layer (`HubbardFermiAction`, `HubbardGaugeAction`, `SumAction`)
//! that a Monte Carlo driver evaluates and differentiates each step.

pub mod action;
pub mod backend;
pub mod basis;
pub mod error;
pub mod factory;
pub mod fermion_matrix;
pub mod kernel;
pub mod lattice;
pub mod numeric;
pub mod qlu;
pub mod sparse;
pub mod types;

pub use action::{
    combine, Action, HubbardFermiAction, HubbardGaugeAction, ShortcutReason, SumAction, Variant,
};
pub use basis::{Basis, ParticleHole, Spin};
pub use error::CoreError;
pub use factory::{
    make_hubbard_fermi_action, make_hubbard_fermi_action_from_lattice, HfaBasis, HfaHopping,
    HfaVariant,
};
pub use fermion_matrix::HubbardFermiMatrix;
pub use kernel::{Dia, Exp, Hopping, Species};
pub use lattice::Lattice;
pub use qlu::Qlu;
pub use types::{CDMat, CDSMat, CDVec, DMat, DSMat, DVec};
