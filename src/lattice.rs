//! The lattice geometry boundary: a hopping matrix, an inverse temperature,
//! and a time-slice count. The lattice itself (sites, neighbour lists, I/O)
//! lives outside the core; this trait is the only surface the core depends
//! on.

use crate::types::DSMat;

/// A lattice geometry as seen by the core: just enough to build a
/// dimensionless `kappa_tilde = kappa * beta / Nt`.
pub trait Lattice {
    /// `Nx x Nx` real symmetric sparse hopping matrix, zero diagonal.
    fn hopping(&self) -> DSMat;

    /// Number of imaginary-time slices.
    fn nt(&self) -> usize;
}

/// Scales `hopping` by `beta / nt` to produce the dimensionless kappa used
/// by `HubbardFermiMatrix`.
pub fn kappa_tilde<L: Lattice>(lattice: &L, beta: f64) -> DSMat {
    let nt = lattice.nt();
    crate::sparse::scale_csr(&lattice.hopping(), beta / nt as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::{CooMatrix, CsrMatrix};

    struct TwoSiteChain;

    impl Lattice for TwoSiteChain {
        fn hopping(&self) -> DSMat {
            let mut coo = CooMatrix::new(2, 2);
            coo.push(0, 1, 1.0);
            coo.push(1, 0, 1.0);
            CsrMatrix::from(&coo)
        }

        fn nt(&self) -> usize {
            4
        }
    }

    #[test]
    fn kappa_tilde_scales_by_beta_over_nt() {
        let lattice = TwoSiteChain;
        let scaled = kappa_tilde(&lattice, 2.0);
        assert_eq!(scaled.get_entry(0, 1).unwrap().into_value(), 0.5);
    }
}
